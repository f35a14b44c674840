//! Random-walk position sampling from the standard starting position.

use rand::Rng;
use rand::seq::IndexedRandom;
use shakmaty::{Chess, Move, Position, Square};
use tracing::trace;

use crate::rules;

/// How the next move of the walk is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkPolicy {
    /// Every legal move is equally likely.
    #[default]
    Uniform,
    /// Captures and early central moves are favored; one of the five
    /// best-scored moves is picked at random.
    Weighted,
}

/// Bounds on the length of a sampling walk, in plies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Shortest walk.
    pub plies_min: u32,
    /// Longest walk (inclusive).
    pub plies_max: u32,
    /// Move selection rule.
    pub policy: WalkPolicy,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            plies_min: 8,
            plies_max: 15,
            policy: WalkPolicy::Uniform,
        }
    }
}

/// Plies during which central squares earn a bonus under [`WalkPolicy::Weighted`].
const OPENING_PLIES: u32 = 10;
/// Size of the shortlist the weighted walk picks from.
const WEIGHTED_SHORTLIST: usize = 5;
const CAPTURE_BONUS: f64 = 1.0;
const CENTER_BONUS: f64 = 0.5;

/// Anything that hands out candidate puzzle positions.
pub trait PositionSource {
    /// Next candidate; never a terminal position.
    fn next_position(&mut self) -> Chess;

    /// Candidates discarded so far because they ended the game.
    fn restarts(&self) -> u64 {
        0
    }
}

/// Produces candidate puzzle positions by walking random legal moves.
///
/// The random source is owned by the sampler so a seeded generator gives a
/// reproducible sequence of positions.
pub struct PositionSampler<R> {
    config: SamplerConfig,
    rng: R,
    restarts: u64,
}

impl<R: Rng> PositionSampler<R> {
    /// Create a sampler. `plies_max` is raised to `plies_min` if smaller.
    pub fn new(config: SamplerConfig, rng: R) -> Self {
        let config = SamplerConfig {
            plies_max: config.plies_max.max(config.plies_min),
            ..config
        };
        Self {
            config,
            rng,
            restarts: 0,
        }
    }

    /// The effective configuration.
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Walk a random number of plies in `[plies_min, plies_max]` and return the
    /// final position, which always has at least one legal move.
    pub fn sample(&mut self) -> Chess {
        loop {
            let plies = self
                .rng
                .random_range(self.config.plies_min..=self.config.plies_max);
            if let Some(pos) = self.walk(plies) {
                return pos;
            }
            self.restarts += 1;
            trace!(
                plies,
                restarts = self.restarts,
                "walk hit a terminal position, restarting"
            );
        }
    }

    /// One walk of exactly `plies` moves; `None` on a dead end.
    fn walk(&mut self, plies: u32) -> Option<Chess> {
        let mut pos = Chess::default();
        for ply in 0..plies {
            let moves = rules::legal_moves(&pos);
            let mv = self.choose(&moves, ply)?;
            pos = rules::apply(&pos, &mv)?;
        }
        if rules::is_terminal(&pos) {
            return None;
        }
        Some(pos)
    }

    fn choose(&mut self, moves: &[Move], ply: u32) -> Option<Move> {
        match self.config.policy {
            WalkPolicy::Uniform => moves.choose(&mut self.rng).cloned(),
            WalkPolicy::Weighted => {
                let mut scored: Vec<(f64, &Move)> = moves
                    .iter()
                    .map(|mv| (self.weight(mv, ply), mv))
                    .collect();
                scored.sort_by(|a, b| b.0.total_cmp(&a.0));
                scored.truncate(WEIGHTED_SHORTLIST);
                scored.choose(&mut self.rng).map(|(_, mv)| (*mv).clone())
            }
        }
    }

    fn weight(&mut self, mv: &Move, ply: u32) -> f64 {
        let mut score: f64 = self.rng.random();
        if mv.is_capture() {
            score += CAPTURE_BONUS;
        }
        if ply < OPENING_PLIES && is_center(mv.to()) {
            score += CENTER_BONUS;
        }
        score
    }
}

impl<R: Rng> PositionSource for PositionSampler<R> {
    fn next_position(&mut self) -> Chess {
        self.sample()
    }

    fn restarts(&self) -> u64 {
        self.restarts
    }
}

fn is_center(sq: Square) -> bool {
    matches!(sq, Square::D4 | Square::E4 | Square::D5 | Square::E5)
}
