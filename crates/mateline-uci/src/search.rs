//! Search requests, verdicts, and the accumulator that turns a stream of
//! `info` lines into a verdict.

use std::fmt;
use std::time::Duration;

use shakmaty::Chess;
use shakmaty::uci::UciMove;

use crate::error::EngineError;
use crate::protocol::{GoParams, Info, Score, ScoreBound};

/// Limits applied to every search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBudget {
    /// Requested search depth in plies.
    pub depth: u32,
    /// Optional node limit passed to the engine.
    pub nodes: Option<u64>,
    /// Wall-clock limit enforced by the session with `stop`.
    pub time: Duration,
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            depth: 10,
            nodes: None,
            time: Duration::from_secs(2),
        }
    }
}

/// One question for the engine: is there a mate within `mate` moves here?
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Position to analyse.
    pub position: Chess,
    /// Mate-distance bound in full moves.
    pub mate: u32,
    /// Depth, node, and time limits.
    pub budget: SearchBudget,
}

impl SearchRequest {
    /// The `go` command for this request.
    pub fn go_params(&self) -> GoParams {
        GoParams {
            depth: Some(self.budget.depth),
            mate: Some(self.mate),
            nodes: self.budget.nodes,
        }
    }
}

/// Why a search produced no usable answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InconclusiveReason {
    /// The wall-clock budget ran out and the engine did not finish after `stop`.
    TimedOut,
    /// The engine finished below the requested depth without reporting a mate.
    DepthNotReached {
        /// Deepest depth reported, if any.
        reached: Option<u32>,
        /// Depth that was requested.
        requested: u32,
    },
    /// The engine finished without ever reporting an exact score.
    NoScore,
    /// A response line could not be parsed.
    Desync,
    /// The search was aborted through a [`StopHandle`](crate::StopHandle).
    Cancelled,
}

impl fmt::Display for InconclusiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InconclusiveReason::TimedOut => f.write_str("timed out"),
            InconclusiveReason::DepthNotReached { reached, requested } => match reached {
                Some(d) => write!(f, "stopped at depth {d} of {requested}"),
                None => write!(f, "no depth reported of {requested}"),
            },
            InconclusiveReason::NoScore => f.write_str("no score reported"),
            InconclusiveReason::Desync => f.write_str("protocol desync"),
            InconclusiveReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Outcome of one search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchVerdict {
    /// The engine reported no forced mate for the side to move.
    NoMate,
    /// The side to move mates in `mate_in` moves along `line` (unverified).
    MateFound {
        /// Mate distance in full moves, as reported by `score mate`.
        mate_in: u32,
        /// Principal variation from the request position.
        line: Vec<UciMove>,
    },
    /// No decision could be made.
    Inconclusive(InconclusiveReason),
}

/// Anything that can answer a [`SearchRequest`].
///
/// Implemented by [`EngineSession`](crate::EngineSession); tests substitute
/// scripted analyzers.
pub trait Analyzer {
    /// Run one search to completion or budget exhaustion.
    fn search(&mut self, request: &SearchRequest) -> Result<SearchVerdict, EngineError>;

    /// Tear down and recreate the underlying engine.
    fn restart(&mut self) -> Result<(), EngineError>;
}

/// Folds the `info` lines of one search into a verdict.
///
/// Later lines override earlier ones. A centipawn score never cancels a mate
/// that was already reported for the same request.
#[derive(Debug, Clone, Default)]
pub struct SearchAccumulator {
    max_depth: Option<u32>,
    cp: Option<i32>,
    mate: Option<i32>,
    mate_line: Vec<UciMove>,
    stats: SearchStats,
}

/// Effort counters from the latest `info` lines that carried them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub seldepth: Option<u32>,
    pub nodes: Option<u64>,
    pub time_ms: Option<u64>,
}

impl SearchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one `info` line. Secondary `multipv` lines are ignored, and
    /// bound scores only contribute their depth.
    pub fn update(&mut self, info: Info) {
        self.stats.seldepth = info.seldepth.or(self.stats.seldepth);
        self.stats.nodes = info.nodes.or(self.stats.nodes);
        self.stats.time_ms = info.time_ms.or(self.stats.time_ms);
        if info.multipv.is_some_and(|n| n != 1) {
            return;
        }
        if let Some(depth) = info.depth {
            self.max_depth = Some(self.max_depth.map_or(depth, |d| d.max(depth)));
        }
        if info.bound != ScoreBound::Exact {
            return;
        }
        match info.score {
            Some(Score::Mate(n)) => {
                match info.pv {
                    Some(pv) => self.mate_line = pv,
                    // keep the previous line only if it belongs to the same mate
                    None if self.mate != Some(n) => self.mate_line.clear(),
                    None => {}
                }
                self.mate = Some(n);
            }
            Some(Score::Cp(cp)) => self.cp = Some(cp),
            None => {}
        }
    }

    /// Latest mate score seen, if any.
    pub fn mate(&self) -> Option<i32> {
        self.mate
    }

    /// Deepest depth seen, if any.
    pub fn max_depth(&self) -> Option<u32> {
        self.max_depth
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Verdict once the engine has sent `bestmove`.
    ///
    /// A positive mate wins; `mate 0` yields an empty line (only valid if the
    /// position is already mate); a negative mate means the side to move is
    /// being mated, which is no puzzle. Without any mate the search must have
    /// reached `requested_depth` to count as `NoMate`.
    pub fn finish(self, requested_depth: u32) -> SearchVerdict {
        match self.mate {
            Some(n) if n > 0 => SearchVerdict::MateFound {
                mate_in: n.unsigned_abs(),
                line: self.mate_line,
            },
            Some(0) => SearchVerdict::MateFound {
                mate_in: 0,
                line: Vec::new(),
            },
            Some(_) => SearchVerdict::NoMate,
            None if self.cp.is_none() => SearchVerdict::Inconclusive(InconclusiveReason::NoScore),
            None if self.max_depth.is_none_or(|d| d < requested_depth) => {
                SearchVerdict::Inconclusive(InconclusiveReason::DepthNotReached {
                    reached: self.max_depth,
                    requested: requested_depth,
                })
            }
            None => SearchVerdict::NoMate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Response, parse_response};

    fn feed(acc: &mut SearchAccumulator, lines: &[&str]) {
        for line in lines {
            match parse_response(line).unwrap() {
                Response::Info(info) => acc.update(info),
                other => panic!("expected info, got {other:?}"),
            }
        }
    }

    fn moves(tokens: &[&str]) -> Vec<UciMove> {
        tokens.iter().map(|t| t.parse().unwrap()).collect()
    }

    #[test]
    fn mate_score_with_pv() {
        let mut acc = SearchAccumulator::new();
        feed(
            &mut acc,
            &[
                "info depth 1 score cp 300 pv e7e8q",
                "info depth 2 score mate 2 pv e7e8q b8c6 f8h6#",
            ],
        );
        assert_eq!(
            acc.finish(10),
            SearchVerdict::MateFound {
                mate_in: 2,
                line: moves(&["e7e8q", "b8c6", "f8h6"])
            }
        );
    }

    #[test]
    fn stats_keep_the_latest_counters() {
        let mut acc = SearchAccumulator::new();
        feed(
            &mut acc,
            &[
                "info depth 8 seldepth 12 score cp 20 nodes 4000 time 15 pv e2e4",
                "info depth 9 score cp 25 nodes 9000 pv e2e4",
                "info currmove d2d4 currmovenumber 2",
            ],
        );
        assert_eq!(
            acc.stats(),
            SearchStats {
                seldepth: Some(12),
                nodes: Some(9000),
                time_ms: Some(15),
            }
        );
    }

    #[test]
    fn cp_only_reaching_depth_is_no_mate() {
        let mut acc = SearchAccumulator::new();
        feed(
            &mut acc,
            &[
                "info depth 9 score cp 110 pv e2e4",
                "info depth 10 score cp 120 pv e2e4 e7e5",
            ],
        );
        assert_eq!(acc.finish(10), SearchVerdict::NoMate);
    }

    #[test]
    fn shallow_cp_is_inconclusive() {
        let mut acc = SearchAccumulator::new();
        feed(&mut acc, &["info depth 5 score cp 40 pv d2d4"]);
        assert_eq!(
            acc.finish(30),
            SearchVerdict::Inconclusive(InconclusiveReason::DepthNotReached {
                reached: Some(5),
                requested: 30
            })
        );
    }

    #[test]
    fn no_score_is_inconclusive() {
        let mut acc = SearchAccumulator::new();
        feed(&mut acc, &["info depth 12 currmove e2e4 currmovenumber 1"]);
        assert_eq!(
            acc.finish(10),
            SearchVerdict::Inconclusive(InconclusiveReason::NoScore)
        );
    }

    #[test]
    fn later_cp_does_not_cancel_mate() {
        let mut acc = SearchAccumulator::new();
        feed(
            &mut acc,
            &[
                "info depth 8 score mate 3 pv h5f7",
                "info depth 9 score cp 900 pv h5f7",
            ],
        );
        assert!(matches!(
            acc.finish(10),
            SearchVerdict::MateFound { mate_in: 3, .. }
        ));
    }

    #[test]
    fn later_mate_overrides_earlier() {
        let mut acc = SearchAccumulator::new();
        feed(
            &mut acc,
            &[
                "info depth 10 score mate 3 pv a1a2 a8a7 a2a3",
                "info depth 8 score mate 2 pv b1b2 b8b7 b2b3",
            ],
        );
        assert_eq!(
            acc.finish(10),
            SearchVerdict::MateFound {
                mate_in: 2,
                line: moves(&["b1b2", "b8b7", "b2b3"])
            }
        );
    }

    #[test]
    fn pv_less_mate_line_keeps_matching_pv() {
        let mut acc = SearchAccumulator::new();
        feed(
            &mut acc,
            &[
                "info depth 6 score mate 2 pv e7e8q b8c6 f8h6",
                "info depth 7 score mate 2 nodes 1000",
            ],
        );
        assert_eq!(
            acc.finish(10),
            SearchVerdict::MateFound {
                mate_in: 2,
                line: moves(&["e7e8q", "b8c6", "f8h6"])
            }
        );
    }

    #[test]
    fn pv_less_mate_line_drops_stale_pv() {
        let mut acc = SearchAccumulator::new();
        feed(
            &mut acc,
            &[
                "info depth 6 score mate 3 pv e7e8q b8c6 f8h6",
                "info depth 7 score mate 2",
            ],
        );
        assert_eq!(
            acc.finish(10),
            SearchVerdict::MateFound {
                mate_in: 2,
                line: Vec::new()
            }
        );
    }

    #[test]
    fn negative_mate_is_no_mate() {
        let mut acc = SearchAccumulator::new();
        feed(&mut acc, &["info depth 10 score mate -2 pv a2a3 h4e1"]);
        assert_eq!(acc.finish(10), SearchVerdict::NoMate);
    }

    #[test]
    fn mate_zero_has_empty_line() {
        let mut acc = SearchAccumulator::new();
        feed(&mut acc, &["info depth 0 score mate 0"]);
        assert_eq!(
            acc.finish(10),
            SearchVerdict::MateFound {
                mate_in: 0,
                line: Vec::new()
            }
        );
    }

    #[test]
    fn secondary_multipv_and_bounds_are_ignored() {
        let mut acc = SearchAccumulator::new();
        feed(
            &mut acc,
            &[
                "info depth 10 multipv 2 score mate 1 pv a1a8",
                "info depth 10 score mate 1 lowerbound pv a1a8",
                "info depth 10 multipv 1 score cp 15 pv e2e4",
            ],
        );
        assert_eq!(acc.mate(), None);
        assert_eq!(acc.max_depth(), Some(10));
        assert_eq!(acc.finish(10), SearchVerdict::NoMate);
    }

    #[test]
    fn go_params_from_request() {
        let request = SearchRequest {
            position: Chess::default(),
            mate: 3,
            budget: SearchBudget {
                depth: 30,
                nodes: Some(1_000),
                time: Duration::from_millis(100),
            },
        };
        assert_eq!(
            request.go_params().to_string(),
            "go depth 30 mate 3 nodes 1000"
        );
    }

    #[test]
    fn reason_display() {
        let reason = InconclusiveReason::DepthNotReached {
            reached: Some(5),
            requested: 30,
        };
        assert_eq!(reason.to_string(), "stopped at depth 5 of 30");
    }
}
