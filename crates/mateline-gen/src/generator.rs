//! The accept/reject loop that turns random positions into puzzles.

use std::fmt;
use std::time::{Duration, Instant};

use mateline_core::{PositionSource, PuzzleRecord, PuzzleSink, rules};
use mateline_uci::{Analyzer, EngineError, SearchBudget, StopHandle};
use tracing::{debug, info, warn};

use crate::error::GeneratorError;
use crate::verifier::{MateVerifier, TrialOutcome};

/// Settings for one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Number of puzzles to accept.
    pub target: u32,
    /// Upper bound on trials; the run ends with a partial result when reached.
    pub max_trials: u32,
    /// Longest mate accepted, in full moves.
    pub max_mate: u32,
    /// Limits for every engine search.
    pub budget: SearchBudget,
    /// Engine restarts tolerated before the run fails.
    pub max_engine_restarts: u32,
    /// Log progress after every this many accepted puzzles (0 disables).
    pub progress_every: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            target: 1,
            max_trials: 1_000,
            max_mate: 3,
            budget: SearchBudget::default(),
            max_engine_restarts: 2,
            progress_every: 10,
        }
    }
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Sampling,
    Verifying,
    Accepted,
    Rejected,
    Done,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The requested number of puzzles was accepted.
    TargetReached,
    /// `max_trials` trials were used up first.
    TrialBudgetExhausted,
    /// The stop handle fired.
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TargetReached => f.write_str("target reached"),
            StopReason::TrialBudgetExhausted => f.write_str("trial budget exhausted"),
            StopReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Rejected trials, by cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rejections {
    pub no_mate: u32,
    pub inconclusive: u32,
    pub too_long: u32,
    pub verification_failures: u32,
    /// Trials lost to an engine failure that required a restart.
    pub engine_failures: u32,
}

impl Rejections {
    pub fn total(&self) -> u32 {
        self.no_mate
            + self.inconclusive
            + self.too_long
            + self.verification_failures
            + self.engine_failures
    }
}

/// Totals of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Puzzles requested.
    pub target: u32,
    /// Puzzles accepted and exported.
    pub accepted: u32,
    /// Trials consumed, accepted or not.
    pub trials: u32,
    pub rejections: Rejections,
    pub engine_restarts: u32,
    /// Sampled positions the source threw away as game over.
    pub sampler_restarts: u64,
    pub elapsed: Duration,
    pub stop_reason: StopReason,
}

impl RunSummary {
    /// True when fewer puzzles than requested were produced.
    pub fn is_partial(&self) -> bool {
        self.accepted < self.target
    }
}

/// Samples positions, verifies them, and hands accepted puzzles to a sink.
pub struct PuzzleGenerator<S, A> {
    config: GeneratorConfig,
    source: S,
    analyzer: A,
    stop: StopHandle,
    phase: Phase,
}

impl<S: PositionSource, A: Analyzer> PuzzleGenerator<S, A> {
    pub fn new(config: GeneratorConfig, source: S, analyzer: A) -> Self {
        Self {
            config,
            source,
            analyzer,
            stop: StopHandle::new(),
            phase: Phase::Sampling,
        }
    }

    /// Use `stop` to end the run early; typically the engine session's handle
    /// so one signal aborts both the search and the loop.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Give back the analyzer, e.g. to close the engine explicitly.
    pub fn into_analyzer(self) -> A {
        self.analyzer
    }

    /// Run until the target is met, the trial budget is spent, or the stop
    /// handle fires. Running out of trials is not an error.
    pub fn run<K: PuzzleSink>(&mut self, sink: &mut K) -> Result<RunSummary, GeneratorError> {
        let started = Instant::now();
        let verifier = MateVerifier::new(self.config.max_mate, self.config.budget);
        let sampler_restarts_before = self.source.restarts();
        let mut summary = RunSummary {
            target: self.config.target,
            accepted: 0,
            trials: 0,
            rejections: Rejections::default(),
            engine_restarts: 0,
            sampler_restarts: 0,
            elapsed: Duration::ZERO,
            stop_reason: StopReason::TargetReached,
        };

        info!(
            target = self.config.target,
            max_trials = self.config.max_trials,
            max_mate = self.config.max_mate,
            "generation started"
        );

        let stop_reason = loop {
            if summary.accepted >= self.config.target {
                break StopReason::TargetReached;
            }
            if summary.trials >= self.config.max_trials {
                break StopReason::TrialBudgetExhausted;
            }
            if self.stop.is_stopped() {
                break StopReason::Cancelled;
            }

            self.phase = Phase::Sampling;
            let position = self.source.next_position();
            summary.trials += 1;
            let trial = summary.trials;

            self.phase = Phase::Verifying;
            let outcome = match verifier.verify(&mut self.analyzer, &position) {
                Ok(outcome) => outcome,
                Err(e) if e.is_recoverable() => {
                    self.phase = Phase::Rejected;
                    summary.rejections.engine_failures += 1;
                    self.recover(&mut summary, e)?;
                    continue;
                }
                Err(e) => {
                    self.phase = Phase::Done;
                    return Err(e.into());
                }
            };

            match outcome {
                TrialOutcome::Accepted(mate) => {
                    self.phase = Phase::Accepted;
                    let number = summary.accepted + 1;
                    let record = PuzzleRecord::new(number, position, &mate.line, mate.engine_score);
                    info!(
                        trial,
                        number,
                        mate_in = record.mate_in,
                        fen = %record.fen(),
                        solution = %record.san_line(),
                        "puzzle accepted"
                    );
                    if let Err(e) = sink.accept(&record) {
                        self.phase = Phase::Done;
                        return Err(GeneratorError::Export {
                            number,
                            source: Box::new(e),
                        });
                    }
                    summary.accepted = number;
                    self.report_progress(&summary, started.elapsed());
                }
                rejected => {
                    self.phase = Phase::Rejected;
                    let rejections = &mut summary.rejections;
                    match &rejected {
                        TrialOutcome::NoMate => rejections.no_mate += 1,
                        TrialOutcome::Inconclusive(_) => rejections.inconclusive += 1,
                        TrialOutcome::TooLong { .. } => rejections.too_long += 1,
                        TrialOutcome::VerificationFailure(_) => {
                            rejections.verification_failures += 1
                        }
                        TrialOutcome::Accepted(_) => {}
                    }
                    debug!(
                        trial,
                        fen = %rules::to_fen(&position),
                        outcome = ?rejected,
                        "trial rejected"
                    );
                }
            }
        };

        self.phase = Phase::Done;
        summary.stop_reason = stop_reason;
        summary.sampler_restarts = self.source.restarts().saturating_sub(sampler_restarts_before);
        summary.elapsed = started.elapsed();

        info!(
            accepted = summary.accepted,
            target = summary.target,
            trials = summary.trials,
            rejected = summary.rejections.total(),
            restarts = summary.engine_restarts,
            sampler_restarts = summary.sampler_restarts,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            reason = %stop_reason,
            "generation finished"
        );
        Ok(summary)
    }

    fn recover(
        &mut self,
        summary: &mut RunSummary,
        err: EngineError,
    ) -> Result<(), GeneratorError> {
        if summary.engine_restarts >= self.config.max_engine_restarts {
            self.phase = Phase::Done;
            return Err(GeneratorError::RestartsExhausted {
                restarts: summary.engine_restarts,
                source: err,
            });
        }
        summary.engine_restarts += 1;
        warn!(
            error = %err,
            restart = summary.engine_restarts,
            max = self.config.max_engine_restarts,
            "restarting engine"
        );
        self.analyzer.restart().map_err(|e| {
            self.phase = Phase::Done;
            GeneratorError::from(e)
        })
    }

    fn report_progress(&self, summary: &RunSummary, elapsed: Duration) {
        let every = self.config.progress_every;
        if every == 0 || summary.accepted % every != 0 {
            return;
        }
        let remaining = summary.target.saturating_sub(summary.accepted);
        let per_puzzle = elapsed / summary.accepted;
        info!(
            accepted = summary.accepted,
            target = summary.target,
            trials = summary.trials,
            elapsed_s = elapsed.as_secs(),
            eta_s = (per_puzzle * remaining).as_secs(),
            "progress"
        );
    }
}
