//! Writes each accepted puzzle into its own directory.

use std::fs;
use std::path::{Path, PathBuf};

use mateline_core::{PuzzleRecord, PuzzleSink, color_name};
use mateline_gen::RunSummary;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ExportError;
use crate::index::PuzzleIndex;
use crate::png::Rasterizer;
use crate::svg::Diagram;
use crate::text;

/// Name of the master index inside the output directory.
pub const INDEX_FILE: &str = "puzzle_index.txt";

/// Where and how puzzles are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Root directory; created if missing.
    pub output_dir: PathBuf,
    /// Engine name shown in the index and social text.
    pub engine_name: String,
    /// Board edge of the diagrams, in pixels.
    pub board_size: u32,
    /// Also write a PNG next to every SVG.
    pub png: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated_puzzles"),
            engine_name: "unknown engine".to_string(),
            board_size: 400,
            png: true,
        }
    }
}

/// Machine-readable copy of a puzzle, written as `puzzle.json`.
#[derive(Serialize)]
struct PuzzleJson<'a> {
    number: u32,
    fen: String,
    side_to_move: &'static str,
    mate_in: u32,
    title: String,
    solution_uci: Vec<String>,
    solution_san: Vec<&'a str>,
    engine_score: i32,
}

impl<'a> From<&'a PuzzleRecord> for PuzzleJson<'a> {
    fn from(record: &'a PuzzleRecord) -> Self {
        Self {
            number: record.number,
            fen: record.fen(),
            side_to_move: color_name(record.mating_side),
            mate_in: record.mate_in,
            title: record.title(),
            solution_uci: record.solution.iter().map(|s| s.uci.to_string()).collect(),
            solution_san: record.solution.iter().map(|s| s.san.as_str()).collect(),
            engine_score: record.engine_score,
        }
    }
}

/// File-system [`PuzzleSink`].
///
/// Each puzzle gets `day{NNN}_generated/` with the diagram, one diagram per
/// solution move, `puzzle_data.txt`, `puzzle.json`, and `tweet.txt`; an entry
/// is appended to [`INDEX_FILE`]. Diagrams are SVG, plus PNG when enabled.
pub struct FileExporter {
    config: ExportConfig,
    index: PuzzleIndex,
    rasterizer: Option<Rasterizer>,
    written: u32,
}

impl FileExporter {
    /// Create the output directory and open the index.
    pub fn create(config: ExportConfig) -> Result<Self, ExportError> {
        fs::create_dir_all(&config.output_dir).map_err(ExportError::io(&config.output_dir))?;
        let index = PuzzleIndex::open(&config.output_dir.join(INDEX_FILE), &config.engine_name)?;
        let rasterizer = config.png.then(Rasterizer::default);
        Ok(Self {
            config,
            index,
            rasterizer,
            written: 0,
        })
    }

    /// Directory name for puzzle `number`.
    pub fn folder_name(number: u32) -> String {
        format!("day{number:03}_generated")
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Puzzles written so far.
    pub fn written(&self) -> u32 {
        self.written
    }

    /// Append the run summary to the index.
    pub fn finish(&mut self, summary: &RunSummary) -> Result<(), ExportError> {
        self.index.finish(summary)?;
        info!(
            written = self.written,
            index = %self.index.path().display(),
            "export finished"
        );
        Ok(())
    }

    fn write_puzzle(&self, record: &PuzzleRecord, dir: &Path) -> Result<(), ExportError> {
        fs::create_dir_all(dir).map_err(ExportError::io(dir))?;

        let orientation = record.mating_side;
        let title = record.title();
        let diagram = Diagram {
            position: &record.position,
            title: &title,
            orientation,
            last_move: None,
            size: self.config.board_size,
        };
        self.write_diagram(dir, "puzzle", &diagram)?;

        for (i, step) in record.solution.iter().enumerate() {
            let index = i + 1;
            let title = text::step_title(index, step);
            let diagram = Diagram {
                position: &step.after,
                title: &title,
                orientation,
                last_move: Some(&step.mv),
                size: self.config.board_size,
            };
            self.write_diagram(dir, &format!("solution_step{index}"), &diagram)?;
        }

        write_file(&dir.join("puzzle_data.txt"), &text::puzzle_data(record))?;
        let image_ext = if self.rasterizer.is_some() { "png" } else { "svg" };
        write_file(
            &dir.join("tweet.txt"),
            &text::tweet(record, &self.config.engine_name, image_ext),
        )?;

        let json_path = dir.join("puzzle.json");
        let json = serde_json::to_string_pretty(&PuzzleJson::from(record)).map_err(|source| {
            ExportError::Json {
                path: json_path.clone(),
                source,
            }
        })?;
        write_file(&json_path, &json)
    }

    /// Write `{stem}.svg`, and `{stem}.png` when rasterizing.
    fn write_diagram(&self, dir: &Path, stem: &str, diagram: &Diagram) -> Result<(), ExportError> {
        let svg = diagram.render();
        write_file(&dir.join(format!("{stem}.svg")), &svg)?;
        if let Some(rasterizer) = &self.rasterizer {
            rasterizer.write(&svg, &dir.join(format!("{stem}.png")))?;
        }
        Ok(())
    }
}

impl PuzzleSink for FileExporter {
    type Error = ExportError;

    fn accept(&mut self, record: &PuzzleRecord) -> Result<(), ExportError> {
        let folder = Self::folder_name(record.number);
        let dir = self.config.output_dir.join(&folder);
        self.write_puzzle(record, &dir)?;
        self.index.append(record, &folder)?;
        self.written += 1;
        debug!(number = record.number, dir = %dir.display(), "puzzle written");
        Ok(())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ExportError> {
    fs::write(path, contents).map_err(ExportError::io(path))
}
