//! The append-only master index, `puzzle_index.txt`.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use mateline_core::PuzzleRecord;
use mateline_gen::RunSummary;

use crate::error::ExportError;

const RULE: &str = "======================================================================";

/// Appends puzzle entries to the index, writing a header when the file is new.
pub struct PuzzleIndex {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl PuzzleIndex {
    /// Open `path` for appending.
    pub fn open(path: &Path, engine_name: &str) -> Result<Self, ExportError> {
        let existed = path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(ExportError::io(path))?;
        let mut index = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        };
        if !existed {
            index.write(&header(engine_name))?;
        }
        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one exported puzzle.
    pub fn append(&mut self, record: &PuzzleRecord, folder: &str) -> Result<(), ExportError> {
        self.write(&entry(record, folder))
    }

    /// Close the run with its totals.
    pub fn finish(&mut self, summary: &RunSummary) -> Result<(), ExportError> {
        self.write(&footer(summary))
    }

    fn write(&mut self, text: &str) -> Result<(), ExportError> {
        self.writer
            .write_all(text.as_bytes())
            .and_then(|()| self.writer.flush())
            .map_err(ExportError::io(&self.path))
    }
}

fn header(engine_name: &str) -> String {
    format!(
        "MATE PUZZLE COLLECTION\n{RULE}\n\nGenerated: {}\nEngine: {engine_name}\n\n{RULE}\nPUZZLE LIST:\n{RULE}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
    )
}

fn entry(record: &PuzzleRecord, folder: &str) -> String {
    format!(
        "Day {:03}:\n  Mate in: {}\n  Solution Moves: {}\n  Solution: {}\n  Folder: {folder}\n\n",
        record.number,
        record.mate_in,
        record.solution.len(),
        record.san_line(),
    )
}

fn footer(summary: &RunSummary) -> String {
    let r = &summary.rejections;
    format!(
        "{RULE}\nRUN SUMMARY ({})\n{RULE}\n\
         Total Puzzles: {} of {}\n\
         Trials: {}\n\
         Rejected: no mate {}, inconclusive {}, too long {}, verification failures {}, engine failures {}\n\
         Engine restarts: {}\n\
         Sampler restarts: {}\n\
         Elapsed: {:.1}s\n\
         Stopped: {}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        summary.accepted,
        summary.target,
        summary.trials,
        r.no_mate,
        r.inconclusive,
        r.too_long,
        r.verification_failures,
        r.engine_failures,
        summary.engine_restarts,
        summary.sampler_restarts,
        summary.elapsed.as_secs_f64(),
        summary.stop_reason,
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mateline_core::rules::{parse_fen, parse_line, replay};
    use mateline_gen::{Rejections, StopReason};

    use super::*;

    #[test]
    fn entry_format() {
        let pos = parse_fen("1n3Qrk/4P3/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let line = replay(&pos, &parse_line(&["e7e8q", "b8c6", "f8h6"]).unwrap()).unwrap();
        let record = PuzzleRecord::new(12, pos, &line, 2);
        assert_eq!(
            entry(&record, "day012_generated"),
            "Day 012:\n  Mate in: 2\n  Solution Moves: 3\n  Solution: e8=Q Nc6 Qh6#\n  Folder: day012_generated\n\n"
        );
    }

    #[test]
    fn footer_reports_partial_runs() {
        let summary = RunSummary {
            target: 5,
            accepted: 2,
            trials: 40,
            rejections: Rejections {
                no_mate: 35,
                inconclusive: 3,
                ..Rejections::default()
            },
            engine_restarts: 1,
            sampler_restarts: 4,
            elapsed: Duration::from_millis(12_340),
            stop_reason: StopReason::TrialBudgetExhausted,
        };
        let text = footer(&summary);
        assert!(text.contains("Total Puzzles: 2 of 5\n"));
        assert!(text.contains("Trials: 40\n"));
        assert!(text.contains("no mate 35, inconclusive 3,"));
        assert!(text.contains("Sampler restarts: 4\n"));
        assert!(text.contains("Elapsed: 12.3s\n"));
        assert!(text.contains("Stopped: trial budget exhausted\n"));
    }

    #[test]
    fn header_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("puzzle_index.txt");

        drop(PuzzleIndex::open(&path, "Fake 1.0").unwrap());
        drop(PuzzleIndex::open(&path, "Fake 1.0").unwrap());

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("PUZZLE LIST:").count(), 1);
        assert!(text.contains("Engine: Fake 1.0\n"));
    }
}
