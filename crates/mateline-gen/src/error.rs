//! Errors that end a generation run.

use mateline_uci::EngineError;

/// Fatal conditions of a generation run. Everything else is absorbed as a
/// rejected trial.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The engine failed in a way a restart cannot fix.
    #[error("engine failure: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: EngineError,
    },

    /// The engine kept failing after the allowed number of restarts.
    #[error("engine failed after {restarts} restarts: {source}")]
    RestartsExhausted {
        /// Restarts already performed.
        restarts: u32,
        /// The failure that would have needed another restart.
        source: EngineError,
    },

    /// The export adapter could not store an accepted puzzle.
    #[error("failed to export puzzle {number}: {source}")]
    Export {
        /// Number of the puzzle being exported.
        number: u32,
        /// The sink's error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[cfg(test)]
mod tests {
    use super::GeneratorError;
    use mateline_uci::EngineError;

    #[test]
    fn restarts_exhausted_display() {
        let err = GeneratorError::RestartsExhausted {
            restarts: 2,
            source: EngineError::Unresponsive,
        };
        assert_eq!(
            format!("{err}"),
            "engine failed after 2 restarts: engine never finished the previous search"
        );
    }
}
