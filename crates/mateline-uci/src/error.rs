//! Engine session errors.

use std::path::PathBuf;

/// Errors that can occur while driving an external UCI engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine process could not be started or never completed the handshake.
    #[error("engine unavailable at {path}: {reason}")]
    Unavailable {
        /// Path of the engine binary.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The engine did not answer within the allotted time while idle.
    #[error("engine did not answer \"{waiting_for}\" in time")]
    Timeout {
        /// The response being waited for.
        waiting_for: &'static str,
    },

    /// A response line could not be interpreted.
    #[error("protocol desync on \"{line}\": {reason}")]
    Desync {
        /// The offending line.
        line: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Too many consecutive desynced searches; the session should be recreated.
    #[error("{count} consecutive protocol desyncs")]
    DesyncLimit {
        /// Number of consecutive desyncs observed.
        count: u32,
    },

    /// A stopped search never delivered its `bestmove`.
    #[error("engine never finished the previous search")]
    Unresponsive,

    /// The engine closed its output stream.
    #[error("engine exited unexpectedly")]
    Disconnected,

    /// The session was used after `close()`.
    #[error("engine session is closed")]
    Closed,

    /// An I/O error occurred while writing to the engine.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Whether recreating the engine process may recover from this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::DesyncLimit { .. }
                | EngineError::Unresponsive
                | EngineError::Disconnected
                | EngineError::Timeout { .. }
                | EngineError::Io { .. }
        )
    }
}
