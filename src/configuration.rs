//! Config for the trainer behaviors
//!
//! This module provides the parameters of a training run: the genetic algorithm knobs, the
//! size of the worker pool, and how much the trainer talks.
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! The following environment variables can be used to override configuration values. All
//! values are optional; unset or unparsable values fall back to the default. Boolean flags are
//! enabled by the (case-insensitive) value `"true"`.
//!
//! - `TRAIN_POPULATION_SIZE` — Number of agents, must be even (default: `100`)
//! - `TRAIN_FRACTION_KEPT` — Fraction of the population surviving selection (default: `0.2`)
//! - `TRAIN_GENERATIONS` — Number of generations (default: `100`)
//! - `TRAIN_SUB_GENERATIONS` — Matches per agent per generation (default: `2`)
//! - `TRAIN_MUTATION_RATE` — Mutation rate given to cloned survivors (default: `0.5`)
//! - `TRAIN_WORKERS` — Number of worker threads, or `auto` for one per CPU (default: `10`)
//! - `TRAIN_SEED` — Seed for shuffling and reproduction (default: random)
//! - `TRAIN_VERBOSE` — Print a summary line per generation (default: `false`)
//! - `TRAIN_LOG` — Enable logging to a file (default: `false`)

use std::str::FromStr;

/// Invalid [`Configuration`] value.
///
/// Returned by [`Configuration::validate`] and by [`Trainer::new`](crate::trainer::Trainer::new)
/// before any worker thread is started.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    /// Pairing needs an even number of agents so that every one of them gets a game.
    #[display(
        "population size must be even so every agent is guaranteed a game each sub-generation (got {size})"
    )]
    OddPopulation { size: usize },
    /// At least one pair of agents is needed.
    #[display("population size must be at least 2 (got {size})")]
    PopulationTooSmall { size: usize },
    /// A ratio outside of `[0, 1]`.
    #[display("{name} must be between 0 and 1 (got {value})")]
    OutOfRange { name: &'static str, value: f64 },
    /// A count that must be at least one.
    #[display("{name} must be at least 1")]
    Zero { name: &'static str },
}

/// Configuration for trainer behaviors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Configuration {
    pub(crate) population_size: usize,
    pub(crate) fraction_kept: f64,
    pub(crate) generations: usize,
    pub(crate) sub_generations: usize,
    pub(crate) mutation_rate: f64,
    pub(crate) workers: usize,
    pub(crate) seed: Option<u64>,
    pub(crate) verbose: bool,
    pub(crate) log: bool,
}

impl Configuration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - 100 agents, of which the best 20% survive each generation.
    /// - 100 generations of 2 sub-generations each.
    /// - Cloned survivors are mutated with a rate of 0.5.
    /// - 10 worker threads.
    /// - Random seed, no console output, no log file.
    pub fn new() -> Self {
        Self {
            population_size: 100,
            fraction_kept: 0.2,
            generations: 100,
            sub_generations: 2,
            mutation_rate: 0.5,
            workers: 10,
            seed: None,
            verbose: false,
            log: false,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// See the [module documentation](self) for the recognized variables. Any other value
    /// (including unset) will result in using the default value for each field.
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        fn get_env<T: FromStr>(var: &str) -> Option<T> {
            std::env::var(var).ok()?.trim().parse().ok()
        }

        let default = Self::new();
        let workers = match std::env::var("TRAIN_WORKERS") {
            Ok(val) if val.eq_ignore_ascii_case("auto") => num_cpus::get(),
            Ok(val) => val.trim().parse().unwrap_or(default.workers),
            Err(_) => default.workers,
        };

        Self {
            population_size: get_env("TRAIN_POPULATION_SIZE").unwrap_or(default.population_size),
            fraction_kept: get_env("TRAIN_FRACTION_KEPT").unwrap_or(default.fraction_kept),
            generations: get_env("TRAIN_GENERATIONS").unwrap_or(default.generations),
            sub_generations: get_env("TRAIN_SUB_GENERATIONS").unwrap_or(default.sub_generations),
            mutation_rate: get_env("TRAIN_MUTATION_RATE").unwrap_or(default.mutation_rate),
            workers,
            seed: get_env("TRAIN_SEED"),
            verbose: get_env_flag("TRAIN_VERBOSE", default.verbose),
            log: get_env_flag("TRAIN_LOG", default.log),
        }
    }

    /// Checks every value, reporting the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size % 2 != 0 {
            return Err(ConfigError::OddPopulation {
                size: self.population_size,
            });
        }
        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall {
                size: self.population_size,
            });
        }
        for (name, value) in [
            ("fraction_kept", self.fraction_kept),
            ("mutation_rate", self.mutation_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }
        for (name, value) in [
            ("generations", self.generations),
            ("sub_generations", self.sub_generations),
            ("workers", self.workers),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { name });
            }
        }
        Ok(())
    }

    /// Number of agents in every generation. Must be even.
    pub fn with_population_size(mut self, value: usize) -> Self {
        self.population_size = value;
        self
    }

    /// Fraction of the population kept by selection, rounded down.
    pub fn with_fraction_kept(mut self, value: f64) -> Self {
        self.fraction_kept = value;
        self
    }

    /// Number of generations to train for.
    pub fn with_generations(mut self, value: usize) -> Self {
        self.generations = value;
        self
    }

    /// Number of sub-generations (one match per agent each) before every selection.
    pub fn with_sub_generations(mut self, value: usize) -> Self {
        self.sub_generations = value;
        self
    }

    /// Mutation rate applied to cloned survivors. `0.0` disables mutation.
    pub fn with_mutation_rate(mut self, value: f64) -> Self {
        self.mutation_rate = value;
        self
    }

    /// Number of worker threads playing matches.
    pub fn with_workers(mut self, value: usize) -> Self {
        self.workers = value;
        self
    }

    /// One worker thread per logical CPU.
    pub fn with_auto_workers(self) -> Self {
        self.with_workers(num_cpus::get())
    }

    /// Seed shuffling and reproduction.
    ///
    /// Match scheduling across threads stays non-deterministic.
    pub fn with_seed(mut self, value: Option<u64>) -> Self {
        self.seed = value;
        self
    }

    /// Enable or disable the per-generation summary on stdout.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    pub fn population_size(&self) -> usize {
        self.population_size
    }

    pub fn fraction_kept(&self) -> f64 {
        self.fraction_kept
    }

    pub fn generations(&self) -> usize {
        self.generations
    }

    pub fn sub_generations(&self) -> usize {
        self.sub_generations
    }

    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}
