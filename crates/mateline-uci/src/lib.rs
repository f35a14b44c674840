//! UCI client side for mateline: talks to an external analysis engine.

pub mod error;
pub mod protocol;
pub mod search;
pub mod session;

pub use error::EngineError;
pub use protocol::{Info, Response, Score, ScoreBound};
pub use search::{
    Analyzer, InconclusiveReason, SearchAccumulator, SearchBudget, SearchRequest, SearchStats,
    SearchVerdict,
};
pub use session::{EngineConfig, EngineSession, SessionState, StopHandle};
