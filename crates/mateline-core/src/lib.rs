//! Core puzzle types: rules adapter over `shakmaty`, random position sampling,
//! principal-line replay, and the accepted puzzle record.

mod error;
mod puzzle;
pub mod rules;
mod sampler;

pub use error::{ReplayError, RulesError};
pub use puzzle::{PuzzleRecord, PuzzleSink, SolutionStep, color_name};
pub use rules::MateLine;
pub use sampler::{PositionSampler, PositionSource, SamplerConfig, WalkPolicy};

pub use shakmaty::uci::UciMove;
pub use shakmaty::{Chess, Color, Move};
