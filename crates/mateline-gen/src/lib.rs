//! Puzzle generation: mate verification and the accept/reject loop.

pub mod error;
pub mod generator;
pub mod verifier;

pub use error::GeneratorError;
pub use generator::{GeneratorConfig, Phase, PuzzleGenerator, Rejections, RunSummary, StopReason};
pub use verifier::{MateVerifier, TrialOutcome, VerifiedMate};
