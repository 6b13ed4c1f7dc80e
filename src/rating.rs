//! Rating systems turning match outcomes into skill ratings.
//!
//! The trainer only needs ratings to be comparable scalars; how they move after a match is
//! delegated to a [`RatingSystem`]. [`Elo`] is used when nothing else is specified.

use crate::game_interface::Outcome;

/// How ratings are initialized and updated.
pub trait RatingSystem: Send + Sync + 'static {
    /// Rating given to a freshly created agent.
    fn initial_rating(&self) -> f64;

    /// New ratings of both players, given their ratings before the match and its outcome.
    fn rate(&self, first: f64, second: f64, outcome: Outcome) -> (f64, f64);
}

/// Classic Elo rating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elo {
    /// Maximum rating change for a single match.
    pub k_factor: f64,
    /// Rating of new agents.
    pub initial: f64,
}

impl Elo {
    pub fn new(k_factor: f64, initial: f64) -> Self {
        Self { k_factor, initial }
    }

    /// Probability that a player rated `rating` beats one rated `opponent`.
    pub fn expected_score(rating: f64, opponent: f64) -> f64 {
        1.0 / (1.0 + 10.0f64.powf((opponent - rating) / 400.0))
    }
}

impl Default for Elo {
    fn default() -> Self {
        Self::new(32.0, 1000.0)
    }
}

impl RatingSystem for Elo {
    fn initial_rating(&self) -> f64 {
        self.initial
    }

    fn rate(&self, first: f64, second: f64, outcome: Outcome) -> (f64, f64) {
        let expected_first = Self::expected_score(first, second);
        let expected_second = Self::expected_score(second, first);
        (
            first + self.k_factor * (outcome.first_score() - expected_first),
            second + self.k_factor * (outcome.swapped().first_score() - expected_second),
        )
    }
}
