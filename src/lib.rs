//! # Ai Trainer
//!
//! A modular Rust crate for training game-playing agents with a genetic algorithm, playing
//! matches concurrently on a fixed pool of worker threads.
//!
//! It provides:
//! - The generation loop (`Trainer`): matches, rating updates, selection, reproduction
//! - A worker pool pairing agents two by two from a shared queue
//! - Ranked selection and mutation-or-fresh reproduction (`PopulationManager`)
//! - Elo ratings out of the box, or any `RatingSystem`
//!
//! Each generation is made of one or more sub-generations, in which every agent plays exactly
//! one match against a random opponent. Ratings are updated after every match. Then the
//! best-rated agents survive and the population is refilled with mutated copies of survivors
//! and fresh agents.
//!
//! # Documentation Overview
//!
//! - For details about the generation loop and shutdown, see the [`trainer`] module.
//! - For configuring population size, selection, mutation and threads, see
//!   [`Configuration`](crate::configuration::Configuration).
//! - For the genetic operators, see [`population`].
//! - For implementing your own agents and games, check out the [`Player`] and [`MatchEngine`]
//!   traits.
//!
//! # Usage Example
//!
//! ```no_run
//! use ai_trainer::prelude::*;
//! use rand::Rng;
//!
//! /// Tries to guess a secret number.
//! #[derive(Clone, Debug)]
//! struct Guesser {
//!     guess: f64,
//! }
//!
//! impl Player for Guesser {
//!     fn fresh() -> Self {
//!         Guesser {
//!             guess: rand::rng().random_range(0.0..100.0),
//!         }
//!     }
//!
//!     fn mutate<R: Rng + ?Sized>(&mut self, rate: f64, rng: &mut R) {
//!         self.guess += rng.random_range(-10.0..=10.0) * rate;
//!     }
//! }
//!
//! // The closest guess wins
//! fn contest(a: &Guesser, b: &Guesser) -> anyhow::Result<Outcome> {
//!     const SECRET: f64 = 42.0;
//!     let (da, db) = ((a.guess - SECRET).abs(), (b.guess - SECRET).abs());
//!     Ok(if da < db {
//!         Outcome::FirstWins
//!     } else if db < da {
//!         Outcome::SecondWins
//!     } else {
//!         Outcome::Draw
//!     })
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Configuration::new()
//!         .with_population_size(50)
//!         .with_fraction_kept(0.2)
//!         .with_generations(30)
//!         .with_sub_generations(4)
//!         .with_mutation_rate(0.3)
//!         .with_workers(8);
//!
//!     // Fails right away if the population size is odd
//!     let trainer: Trainer<Guesser, _> = Trainer::new(contest, config)?;
//!     let result = trainer.train()?;
//!
//!     for agent in result.champions() {
//!         println!("{agent}: {:.2}", agent.player().guess);
//!     }
//!     Ok(())
//! }
//! ```

pub use anyhow;
pub mod agent;
pub mod configuration;
pub mod game_interface;
mod logger;
pub mod match_queue;
pub mod match_runner;
mod match_scheduler;
pub mod population;
pub mod rating;
pub mod trainer;
pub mod worker_pool;

pub use game_interface::{MatchEngine, Player};

/// Commonly used types and traits for quick access.
///
/// Import this prelude to get started easily:
/// ```rust
/// use ai_trainer::prelude::*;
/// ```
///
/// Includes:
/// - [`Configuration`](crate::configuration::Configuration)
/// - [`Trainer`](crate::trainer::Trainer) and its [`TrainingResult`](crate::trainer::TrainingResult)
/// - the [`Player`] and [`MatchEngine`] traits with [`Outcome`](crate::game_interface::Outcome)
/// - [`Elo`](crate::rating::Elo) and the [`RatingSystem`](crate::rating::RatingSystem) trait
pub mod prelude {
    pub use crate::agent::{Agent, AgentId};
    pub use crate::configuration::{ConfigError, Configuration};
    pub use crate::game_interface::{MatchEngine, Outcome, Player};
    pub use crate::rating::{Elo, RatingSystem};
    pub use crate::trainer::{GenerationReport, StopHandle, Trainer, TrainingResult};
}
