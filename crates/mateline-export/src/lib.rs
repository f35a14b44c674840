//! Puzzle export: SVG and PNG diagrams, text companions, JSON, and the master index.

pub mod error;
pub mod exporter;
pub mod index;
pub mod png;
pub mod svg;
pub mod text;

pub use error::ExportError;
pub use exporter::{ExportConfig, FileExporter, INDEX_FILE};
pub use index::PuzzleIndex;
pub use png::Rasterizer;
pub use svg::Diagram;
