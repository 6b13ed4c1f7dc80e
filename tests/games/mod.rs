use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::Duration,
};

use ai_trainer::prelude::*;
use rand::Rng;

/// A player whose whole policy is a strength: the stronger one always wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Strength(pub u32);

impl Player for Strength {
    fn fresh() -> Self {
        Strength(rand::rng().random_range(0..1000))
    }

    fn mutate<R: Rng + ?Sized>(&mut self, rate: f64, rng: &mut R) {
        let delta = (100.0 * rate) as i64;
        let mutated = i64::from(self.0) + rng.random_range(-delta..=delta);
        self.0 = mutated.clamp(0, 2000) as u32;
    }
}

fn compare(first: &Strength, second: &Strength) -> Outcome {
    match first.0.cmp(&second.0) {
        std::cmp::Ordering::Greater => Outcome::FirstWins,
        std::cmp::Ordering::Less => Outcome::SecondWins,
        std::cmp::Ordering::Equal => Outcome::Draw,
    }
}

/// Counts the matches it plays. With `fail_at`, the n-th match (1-based) fails; with
/// `panic_at`, it panics instead.
#[derive(Default)]
pub struct CountingEngine {
    pub played: AtomicUsize,
    pub delay: Duration,
    pub fail_at: Option<usize>,
    pub panic_at: Option<usize>,
}

impl CountingEngine {
    pub fn with_delay(delay: Duration) -> Self {
        CountingEngine {
            delay,
            ..Default::default()
        }
    }

    pub fn played(&self) -> usize {
        self.played.load(Ordering::SeqCst)
    }
}

impl MatchEngine<Strength> for CountingEngine {
    fn play(&self, first: &Strength, second: &Strength) -> anyhow::Result<Outcome> {
        let n = self.played.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.fail_at == Some(n) {
            anyhow::bail!("match {n} went wrong");
        }
        if self.panic_at == Some(n) {
            panic!("match {n} exploded");
        }
        Ok(compare(first, second))
    }
}

/// Lets a test keep reading the counter of an engine owned by the trainer.
pub struct Shared<E>(pub std::sync::Arc<E>);

impl<E: MatchEngine<Strength>> MatchEngine<Strength> for Shared<E> {
    fn play(&self, first: &Strength, second: &Strength) -> anyhow::Result<Outcome> {
        self.0.play(first, second)
    }
}

/// +1 for a win, -1 for a loss, starting at 0.
pub struct WinCount;

impl RatingSystem for WinCount {
    fn initial_rating(&self) -> f64 {
        0.0
    }

    fn rate(&self, first: f64, second: f64, outcome: Outcome) -> (f64, f64) {
        let delta = outcome.first_score() * 2.0 - 1.0;
        (first + delta, second - delta)
    }
}

/// Blows up on the first rated match.
pub struct BrokenRatings;

impl RatingSystem for BrokenRatings {
    fn initial_rating(&self) -> f64 {
        1000.0
    }

    fn rate(&self, _first: f64, _second: f64, _outcome: Outcome) -> (f64, f64) {
        panic!("rating diverged")
    }
}
