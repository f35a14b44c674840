//! Plain-text companions of a puzzle: the data sheet and the social thread.

use std::fmt::Write;

use mateline_core::{PuzzleRecord, SolutionStep, color_name};

const RULE: &str = "============================================================";

/// Caption of the diagram after `step` (1-based).
pub fn step_title(index: usize, step: &SolutionStep) -> String {
    let mover = color_name(step.mover);
    if step.is_checkmate {
        format!("Step {index}: {mover} plays {} - Checkmate!", step.san)
    } else if step.is_check {
        format!("Step {index}: {mover} plays {} (check)", step.san)
    } else {
        format!("Step {index}: {mover} plays {}", step.san)
    }
}

/// `puzzle_data.txt`: FEN, mate length, and the solution in both notations.
pub fn puzzle_data(record: &PuzzleRecord) -> String {
    format!(
        "FEN: {}\nMate in: {}\nSolution (UCI): {}\nSolution (SAN): {}\nEngine score: mate {}\n",
        record.fen(),
        record.mate_in,
        record.uci_line(),
        record.san_line(),
        record.engine_score,
    )
}

/// `tweet.txt`: the puzzle post, a solution summary, and one post per move.
///
/// Attachments point at the diagram files with extension `image_ext`.
pub fn tweet(record: &PuzzleRecord, engine_name: &str, image_ext: &str) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "{RULE}\nTWEET 1: PUZZLE (Main Tweet)\n{RULE}");
    let _ = writeln!(out, "Attach: puzzle.{image_ext}\n");
    let _ = writeln!(out, "Daily Chess Puzzle #{}\n", record.number);
    let _ = writeln!(out, "{}", record.title());
    let _ = writeln!(out, "Generated with {engine_name}\n");
    let _ = writeln!(out, "Can you solve it?\n");
    let _ = writeln!(out, "#ChessPuzzle #Chess #Tactics\n");

    let _ = writeln!(out, "{RULE}\nTWEET 2: SOLUTION SUMMARY\n{RULE}");
    let _ = writeln!(out, "Solution: {}\n", record.san_line());
    let _ = writeln!(out, "See the step-by-step diagrams below.\n");

    let _ = writeln!(out, "{RULE}\nTWEETS 3+: STEP-BY-STEP THREAD\n{RULE}");
    for (i, step) in record.solution.iter().enumerate() {
        let index = i + 1;
        let mover = color_name(step.mover);
        let _ = writeln!(out, "\nTweet {}:", index + 2);
        if step.is_checkmate {
            let _ = writeln!(out, "{mover}: {} - Checkmate!", step.san);
        } else {
            let _ = writeln!(out, "{mover}: {}", step.san);
        }
        let _ = writeln!(out, "[Attach: solution_step{index}.{image_ext}]");
    }

    out
}

#[cfg(test)]
mod tests {
    use mateline_core::rules::{parse_fen, parse_line, replay};

    use super::*;

    fn promotion_mate() -> PuzzleRecord {
        let pos = parse_fen("1n3Qrk/4P3/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let line = replay(&pos, &parse_line(&["e7e8q", "b8c6", "f8h6"]).unwrap()).unwrap();
        PuzzleRecord::new(4, pos, &line, 2)
    }

    #[test]
    fn data_sheet_lists_fen_and_solution() {
        let data = puzzle_data(&promotion_mate());
        assert_eq!(
            data,
            "FEN: 1n3Qrk/4P3/8/8/8/8/8/K7 w - - 0 1\n\
             Mate in: 2\n\
             Solution (UCI): e7e8q b8c6 f8h6\n\
             Solution (SAN): e8=Q Nc6 Qh6#\n\
             Engine score: mate 2\n"
        );
    }

    #[test]
    fn step_titles() {
        let record = promotion_mate();
        let titles: Vec<String> = record
            .solution
            .iter()
            .enumerate()
            .map(|(i, s)| step_title(i + 1, s))
            .collect();
        assert_eq!(
            titles,
            vec![
                "Step 1: White plays e8=Q",
                "Step 2: Black plays Nc6",
                "Step 3: White plays Qh6# - Checkmate!",
            ]
        );
    }

    #[test]
    fn tweet_thread_has_one_post_per_move() {
        let text = tweet(&promotion_mate(), "Stockfish 16", "png");
        assert!(text.contains("Daily Chess Puzzle #4"));
        assert!(text.contains("White to move and mate in 2"));
        assert!(text.contains("Generated with Stockfish 16"));
        assert!(text.contains("Solution: e8=Q Nc6 Qh6#"));
        assert!(text.contains("Tweet 5:\nWhite: Qh6# - Checkmate!"));
        assert_eq!(text.matches("[Attach: solution_step").count(), 3);
        assert!(text.contains("Attach: puzzle.png\n"));
        assert!(text.contains("[Attach: solution_step3.png]"));
        assert!(!text.contains(".svg"));
    }
}
