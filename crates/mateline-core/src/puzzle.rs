//! The accepted puzzle record.

use shakmaty::uci::UciMove;
use shakmaty::{Chess, Color, Move, Position};

use crate::rules::{self, MateLine};

/// One move of a verified solution, as shown to the solver.
#[derive(Debug, Clone)]
pub struct SolutionStep {
    /// The move itself.
    pub mv: Move,
    /// Coordinate notation, e.g. `e7e8q`.
    pub uci: UciMove,
    /// Standard algebraic notation with check suffix, e.g. `Qh6#`.
    pub san: String,
    /// Side that plays this move.
    pub mover: Color,
    /// Whether the move gives check.
    pub is_check: bool,
    /// Whether the move delivers checkmate.
    pub is_checkmate: bool,
    /// Position after the move.
    pub after: Chess,
}

/// A puzzle whose mating line has been independently replayed.
///
/// Only built from a [`MateLine`], so the solution always ends in checkmate.
#[derive(Debug, Clone)]
pub struct PuzzleRecord {
    /// Sequential puzzle number, starting at 1.
    pub number: u32,
    /// The puzzle position.
    pub position: Chess,
    /// Side that delivers mate (the side to move in `position`).
    pub mating_side: Color,
    /// Mate length in full moves.
    pub mate_in: u32,
    /// The verified solution, one entry per ply.
    pub solution: Vec<SolutionStep>,
    /// Engine mate score at acceptance (`score mate N`).
    pub engine_score: i32,
}

impl PuzzleRecord {
    /// Build a record from a replayed mating line.
    pub fn new(number: u32, position: Chess, line: &MateLine, engine_score: i32) -> Self {
        let mut solution = Vec::with_capacity(line.moves.len());
        let mut pos = position.clone();
        for mv in &line.moves {
            let san = rules::san(&pos, mv);
            let mover = pos.turn();
            let Some(next) = rules::apply(&pos, mv) else {
                // MateLine moves were all legal when replayed
                break;
            };
            solution.push(SolutionStep {
                mv: mv.clone(),
                uci: rules::to_uci(mv),
                san,
                mover,
                is_check: next.is_check(),
                is_checkmate: next.is_checkmate(),
                after: next.clone(),
            });
            pos = next;
        }

        Self {
            number,
            mating_side: position.turn(),
            position,
            mate_in: line.mate_in(),
            solution,
            engine_score,
        }
    }

    /// FEN of the puzzle position.
    pub fn fen(&self) -> String {
        rules::to_fen(&self.position)
    }

    /// Solution in coordinate notation, space separated.
    pub fn uci_line(&self) -> String {
        self.solution
            .iter()
            .map(|s| s.uci.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Solution in algebraic notation, space separated.
    pub fn san_line(&self) -> String {
        self.solution
            .iter()
            .map(|s| s.san.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Puzzle title, e.g. "White to move and mate in 2".
    pub fn title(&self) -> String {
        format!("{} to move and mate in {}", color_name(self.mating_side), self.mate_in)
    }
}

/// Receiver of accepted puzzles, called once per record in ascending
/// puzzle-number order.
pub trait PuzzleSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn accept(&mut self, record: &PuzzleRecord) -> Result<(), Self::Error>;
}

/// Keeps records in memory.
impl PuzzleSink for Vec<PuzzleRecord> {
    type Error = std::convert::Infallible;

    fn accept(&mut self, record: &PuzzleRecord) -> Result<(), Self::Error> {
        self.push(record.clone());
        Ok(())
    }
}

/// "White" or "Black".
pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{parse_fen, parse_line, replay};

    fn promotion_mate() -> PuzzleRecord {
        let pos = parse_fen("1n3Qrk/4P3/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let pv = parse_line(&["e7e8q", "b8c6", "f8h6"]).unwrap();
        let line = replay(&pos, &pv).unwrap();
        PuzzleRecord::new(1, pos, &line, 2)
    }

    #[test]
    fn record_fields_follow_the_line() {
        let record = promotion_mate();
        assert_eq!(record.number, 1);
        assert_eq!(record.mate_in, 2);
        assert_eq!(record.mating_side, Color::White);
        assert_eq!(record.uci_line(), "e7e8q b8c6 f8h6");
        assert_eq!(record.san_line(), "e8=Q Nc6 Qh6#");
        assert_eq!(record.title(), "White to move and mate in 2");
    }

    #[test]
    fn only_last_step_is_mate() {
        let record = promotion_mate();
        let mates: Vec<bool> = record.solution.iter().map(|s| s.is_checkmate).collect();
        assert_eq!(mates, vec![false, false, true]);
        assert_eq!(record.solution[1].mover, Color::Black);
        assert!(rules::is_checkmate(&record.solution[2].after));
    }
}
