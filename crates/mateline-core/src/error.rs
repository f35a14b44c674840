//! Error types for position parsing and line replay.

/// Errors from loading a position into the rules adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    /// The FEN text could not be parsed.
    #[error("invalid FEN \"{fen}\": {reason}")]
    InvalidFen {
        /// The FEN string that failed to parse.
        fen: String,
        /// Parser message.
        reason: String,
    },

    /// The FEN parsed but does not describe a legal chess position.
    #[error("illegal position \"{fen}\": {reason}")]
    IllegalPosition {
        /// The offending FEN.
        fen: String,
        /// Validation message.
        reason: String,
    },
}

/// Reasons a principal line fails the independent replay check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// A token in the line is not coordinate notation.
    #[error("ply {ply}: unparseable move \"{token}\"")]
    Unparseable {
        /// Zero-based ply index within the line.
        ply: usize,
        /// The raw token.
        token: String,
    },

    /// A move is not legal in the position it is played from.
    #[error("ply {ply}: illegal move {uci} in {fen}")]
    IllegalMove {
        /// Zero-based ply index within the line.
        ply: usize,
        /// The move in coordinate notation.
        uci: String,
        /// The position the move was tried in.
        fen: String,
    },

    /// The line ran out without delivering checkmate.
    #[error("line of {plies} plies ends without checkmate (stalemate: {stalemate})")]
    NoCheckmate {
        /// Number of plies replayed.
        plies: usize,
        /// Whether the final position is a stalemate.
        stalemate: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::{ReplayError, RulesError};

    #[test]
    fn replay_error_display() {
        let err = ReplayError::NoCheckmate {
            plies: 5,
            stalemate: true,
        };
        assert_eq!(
            format!("{err}"),
            "line of 5 plies ends without checkmate (stalemate: true)"
        );
    }

    #[test]
    fn rules_error_display() {
        let err = RulesError::InvalidFen {
            fen: "x".to_string(),
            reason: "bad board".to_string(),
        };
        assert_eq!(format!("{err}"), "invalid FEN \"x\": bad board");
    }
}
