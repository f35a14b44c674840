//! Rules adapter: legality, successor positions, and terminal detection.
//!
//! Thin functions over [`shakmaty::Chess`]. Positions are never mutated in
//! place; every move produces a new value.

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, MoveList, Position};

use crate::error::{ReplayError, RulesError};

/// Standard starting position in FEN.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// All legal moves in `pos`.
pub fn legal_moves(pos: &Chess) -> MoveList {
    pos.legal_moves()
}

/// The position after playing `mv`, or `None` if `mv` is illegal in `pos`.
pub fn apply(pos: &Chess, mv: &Move) -> Option<Chess> {
    pos.clone().play(*mv).ok()
}

/// Whether the side to move is checkmated.
pub fn is_checkmate(pos: &Chess) -> bool {
    pos.is_checkmate()
}

/// Whether the game is over: checkmate, stalemate, or insufficient material.
pub fn is_terminal(pos: &Chess) -> bool {
    pos.is_game_over()
}

/// Parse a FEN string into a legal position.
pub fn parse_fen(fen: &str) -> Result<Chess, RulesError> {
    let parsed: Fen = fen.parse().map_err(|e| RulesError::InvalidFen {
        fen: fen.to_string(),
        reason: format!("{e}"),
    })?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| RulesError::IllegalPosition {
            fen: fen.to_string(),
            reason: format!("{e}"),
        })
}

/// Serialize a position to FEN. The en passant square is only written when a
/// capture is actually possible.
pub fn to_fen(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// Coordinate notation for a legal move.
pub fn to_uci(mv: &Move) -> UciMove {
    mv.to_uci(CastlingMode::Standard)
}

/// Standard algebraic notation (with `+`/`#` suffix) for `mv` played in `pos`.
pub fn san(pos: &Chess, mv: &Move) -> String {
    SanPlus::from_move(pos.clone(), *mv).to_string()
}

/// A principal line that was replayed and ends in checkmate.
#[derive(Debug, Clone)]
pub struct MateLine {
    /// Moves from the start position up to and including the mating move.
    pub moves: Vec<Move>,
    /// The checkmated final position.
    pub final_position: Chess,
}

impl MateLine {
    /// Number of half-moves in the line.
    pub fn plies(&self) -> usize {
        self.moves.len()
    }

    /// Mate length in full moves of the mating side.
    pub fn mate_in(&self) -> u32 {
        self.moves.len().div_ceil(2) as u32
    }
}

/// Replay `line` from `start`, stopping at the first checkmate.
///
/// Every move must be legal in the position it is played from, and the line
/// must reach checkmate. Moves listed after the mate are ignored. An empty line
/// succeeds only if `start` is already checkmate.
pub fn replay(start: &Chess, line: &[UciMove]) -> Result<MateLine, ReplayError> {
    let mut pos = start.clone();
    let mut moves = Vec::with_capacity(line.len());

    for (ply, uci) in line.iter().enumerate() {
        if pos.is_checkmate() {
            break;
        }
        let illegal = || ReplayError::IllegalMove {
            ply,
            uci: uci.to_string(),
            fen: to_fen(&pos),
        };
        let mv = uci.to_move(&pos).map_err(|_| illegal())?;
        let next = apply(&pos, &mv).ok_or_else(illegal)?;
        moves.push(mv);
        pos = next;
    }

    if !pos.is_checkmate() {
        return Err(ReplayError::NoCheckmate {
            plies: moves.len(),
            stalemate: pos.is_stalemate(),
        });
    }

    Ok(MateLine {
        moves,
        final_position: pos,
    })
}

/// Decode coordinate-notation tokens, tolerating a trailing `+` or `#`.
pub fn parse_line<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<UciMove>, ReplayError> {
    tokens
        .iter()
        .enumerate()
        .map(|(ply, token)| {
            let token = token.as_ref();
            token
                .trim_end_matches(['+', '#'])
                .parse::<UciMove>()
                .map_err(|_| ReplayError::Unparseable {
                    ply,
                    token: token.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHOLARS_MATE_FEN: &str =
        "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";

    const MATED_FEN: &str =
        "r1bqkb1r/pppp1Qpp/2n2n2/4p3/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 0 4";

    /// Promotion then a queen swing to h6: mate in 2.
    const PROMOTION_MATE_FEN: &str = "1n3Qrk/4P3/8/8/8/8/8/K7 w - - 0 1";

    /// Qc7 here stalemates the black king.
    const STALEMATE_TRAP_FEN: &str = "k7/8/1K6/8/8/8/8/2Q5 w - - 0 1";

    fn line(tokens: &[&str]) -> Vec<UciMove> {
        parse_line(tokens).unwrap()
    }

    #[test]
    fn startpos_has_twenty_moves() {
        let pos = parse_fen(STARTING_FEN).unwrap();
        assert_eq!(legal_moves(&pos).len(), 20);
        assert!(!is_terminal(&pos));
    }

    #[test]
    fn fen_round_trips_startpos() {
        let pos = Chess::default();
        assert_eq!(to_fen(&pos), STARTING_FEN);
    }

    #[test]
    fn invalid_fen_is_rejected() {
        assert!(matches!(
            parse_fen("not a fen"),
            Err(RulesError::InvalidFen { .. })
        ));
    }

    #[test]
    fn apply_rejects_move_from_other_position() {
        let pos = Chess::default();
        let mated = parse_fen(MATED_FEN).unwrap();
        assert!(is_checkmate(&mated));
        let mv = legal_moves(&pos)[0].clone();
        assert!(apply(&mated, &mv).is_none());
    }

    #[test]
    fn replay_scholars_mate_in_one() {
        let pos = parse_fen(SCHOLARS_MATE_FEN).unwrap();
        let mate = replay(&pos, &line(&["h5f7"])).unwrap();
        assert_eq!(mate.plies(), 1);
        assert_eq!(mate.mate_in(), 1);
        assert!(is_checkmate(&mate.final_position));
    }

    #[test]
    fn replay_promotion_mate_in_two() {
        let pos = parse_fen(PROMOTION_MATE_FEN).unwrap();
        let mate = replay(&pos, &line(&["e7e8q", "b8c6", "f8h6#"])).unwrap();
        assert_eq!(mate.plies(), 3);
        assert_eq!(mate.mate_in(), 2);
    }

    #[test]
    fn replay_is_idempotent() {
        let pos = parse_fen(PROMOTION_MATE_FEN).unwrap();
        let pv = line(&["e7e8q", "b8c6", "f8h6"]);
        let first = replay(&pos, &pv).unwrap();
        let second = replay(&pos, &pv).unwrap();
        assert_eq!(first.moves, second.moves);
        assert_eq!(
            to_fen(&first.final_position),
            to_fen(&second.final_position)
        );
    }

    #[test]
    fn replay_ignores_moves_after_mate() {
        let pos = parse_fen(SCHOLARS_MATE_FEN).unwrap();
        let mate = replay(&pos, &line(&["h5f7", "e8e7"])).unwrap();
        assert_eq!(mate.plies(), 1);
    }

    #[test]
    fn replay_reports_stalemate() {
        let pos = parse_fen(STALEMATE_TRAP_FEN).unwrap();
        let err = replay(&pos, &line(&["c1c7"])).unwrap_err();
        assert_eq!(
            err,
            ReplayError::NoCheckmate {
                plies: 1,
                stalemate: true
            }
        );
    }

    #[test]
    fn replay_reports_illegal_move() {
        let pos = Chess::default();
        let err = replay(&pos, &line(&["e2e4", "e2e4"])).unwrap_err();
        assert!(matches!(err, ReplayError::IllegalMove { ply: 1, .. }));
    }

    #[test]
    fn replay_empty_line_needs_existing_mate() {
        let mated = parse_fen(MATED_FEN).unwrap();
        let mate = replay(&mated, &[]).unwrap();
        assert_eq!(mate.mate_in(), 0);

        let err = replay(&Chess::default(), &[]).unwrap_err();
        assert!(matches!(err, ReplayError::NoCheckmate { plies: 0, .. }));
    }

    #[test]
    fn parse_line_rejects_garbage() {
        let err = parse_line(&["e2e4", "zz"]).unwrap_err();
        assert!(matches!(err, ReplayError::Unparseable { ply: 1, .. }));
    }

    #[test]
    fn san_marks_checkmate() {
        let pos = parse_fen(SCHOLARS_MATE_FEN).unwrap();
        let mv = line(&["h5f7"])[0].to_move(&pos).unwrap();
        assert_eq!(san(&pos, &mv), "Qxf7#");
    }
}
