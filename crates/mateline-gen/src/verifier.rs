//! Mate verification: ask the engine, then replay its line independently.

use mateline_core::{MateLine, ReplayError, rules};
use mateline_uci::{
    Analyzer, EngineError, InconclusiveReason, SearchBudget, SearchRequest, SearchVerdict,
};
use shakmaty::Chess;
use tracing::{debug, warn};

/// A mate claim that survived the replay check.
#[derive(Debug, Clone)]
pub struct VerifiedMate {
    /// The replayed line, ending in checkmate.
    pub line: MateLine,
    /// Mate score the engine reported.
    pub engine_score: i32,
}

/// Result of verifying one candidate position.
#[derive(Debug, Clone)]
pub enum TrialOutcome {
    /// Mate within the bound, replayed to checkmate.
    Accepted(VerifiedMate),
    /// The engine found no mate for the side to move.
    NoMate,
    /// The engine gave no usable answer.
    Inconclusive(InconclusiveReason),
    /// A mate exists but is longer than the bound.
    TooLong {
        /// Mate length in full moves.
        mate_in: u32,
    },
    /// The engine claimed a mate its own line does not deliver.
    VerificationFailure(ReplayError),
}

impl TrialOutcome {
    /// The verified mate, if the trial was accepted.
    pub fn into_mate(self) -> Option<VerifiedMate> {
        match self {
            TrialOutcome::Accepted(mate) => Some(mate),
            _ => None,
        }
    }
}

/// Checks candidate positions for a forced mate within `max_mate` moves.
#[derive(Debug, Clone, Copy)]
pub struct MateVerifier {
    max_mate: u32,
    budget: SearchBudget,
}

impl MateVerifier {
    pub fn new(max_mate: u32, budget: SearchBudget) -> Self {
        Self { max_mate, budget }
    }

    pub fn max_mate(&self) -> u32 {
        self.max_mate
    }

    /// Search `pos` and, on a claimed mate, replay the principal line.
    ///
    /// The engine's claim is never trusted on its own: an illegal move, a
    /// line that does not end in checkmate, or a replayed mate longer than
    /// the bound all reject the position.
    pub fn verify<A: Analyzer>(
        &self,
        analyzer: &mut A,
        pos: &Chess,
    ) -> Result<TrialOutcome, EngineError> {
        let request = SearchRequest {
            position: pos.clone(),
            mate: self.max_mate,
            budget: self.budget,
        };

        let (claimed, line) = match analyzer.search(&request)? {
            SearchVerdict::NoMate => return Ok(TrialOutcome::NoMate),
            SearchVerdict::Inconclusive(reason) => return Ok(TrialOutcome::Inconclusive(reason)),
            SearchVerdict::MateFound { mate_in, .. } if mate_in > self.max_mate => {
                return Ok(TrialOutcome::TooLong { mate_in });
            }
            SearchVerdict::MateFound { mate_in, line } => (mate_in, line),
        };

        let replayed = match rules::replay(pos, &line) {
            Ok(replayed) => replayed,
            Err(e) => {
                warn!(fen = %rules::to_fen(pos), claimed, error = %e, "engine mate claim rejected");
                return Ok(TrialOutcome::VerificationFailure(e));
            }
        };

        let mate_in = replayed.mate_in();
        if mate_in > self.max_mate {
            return Ok(TrialOutcome::TooLong { mate_in });
        }
        if mate_in != claimed {
            debug!(claimed, replayed = mate_in, "replayed mate length differs from engine claim");
        }

        Ok(TrialOutcome::Accepted(VerifiedMate {
            line: replayed,
            engine_score: claimed as i32,
        }))
    }
}
