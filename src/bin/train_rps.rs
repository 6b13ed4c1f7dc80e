//! Trains mixed-strategy rock-paper-scissors players.
//!
//! Every option left unset falls back to the `TRAIN_*` environment variables, then to the
//! defaults of [`Configuration`].

use ai_trainer::prelude::*;
use clap::Parser;
use rand::{
    distr::{weighted::WeightedIndex, Distribution},
    Rng,
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of players, must be even
    #[arg(long)]
    population: Option<usize>,

    /// Number of generations to train for
    #[arg(long)]
    generations: Option<usize>,

    /// Matches per player per generation
    #[arg(long)]
    sub_generations: Option<usize>,

    /// Fraction of players surviving each generation (0.0-1.0)
    #[arg(long)]
    fraction_kept: Option<f64>,

    /// Mutation rate (0.0-1.0)
    #[arg(long)]
    mutation_rate: Option<f64>,

    /// Number of worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Seed for shuffling and reproduction
    #[arg(long)]
    seed: Option<u64>,

    /// Throws per match
    #[arg(long, default_value = "25")]
    throws: usize,

    /// Print a summary line per generation
    #[arg(long)]
    verbose: bool,

    /// Log to a timestamped file in the current directory
    #[arg(long)]
    log: bool,
}

impl Args {
    fn configuration(&self) -> Configuration {
        let mut config = Configuration::from_env();
        if let Some(value) = self.population {
            config = config.with_population_size(value);
        }
        if let Some(value) = self.generations {
            config = config.with_generations(value);
        }
        if let Some(value) = self.sub_generations {
            config = config.with_sub_generations(value);
        }
        if let Some(value) = self.fraction_kept {
            config = config.with_fraction_kept(value);
        }
        if let Some(value) = self.mutation_rate {
            config = config.with_mutation_rate(value);
        }
        if let Some(value) = self.workers {
            config = config.with_workers(value);
        }
        if self.seed.is_some() {
            config = config.with_seed(self.seed);
        }
        if self.verbose {
            config = config.with_verbose(true);
        }
        if self.log {
            config = config.with_log(true);
        }
        config
    }
}

const THROWS: [&str; 3] = ["rock", "paper", "scissors"];

/// Probability of each throw, rock, paper, scissors.
#[derive(Debug, Clone)]
struct MixedStrategy {
    weights: [f64; 3],
}

impl MixedStrategy {
    fn throw<R: Rng + ?Sized>(&self, rng: &mut R) -> anyhow::Result<usize> {
        Ok(WeightedIndex::new(self.weights)?.sample(rng))
    }
}

impl Player for MixedStrategy {
    fn fresh() -> Self {
        let mut rng = rand::rng();
        MixedStrategy {
            weights: [(); 3].map(|()| rng.random_range(0.01..1.0)),
        }
    }

    fn mutate<R: Rng + ?Sized>(&mut self, rate: f64, rng: &mut R) {
        for weight in &mut self.weights {
            if rng.random_bool(rate) {
                *weight = (*weight + rng.random_range(-0.2..0.2)).clamp(0.01, 1.0);
            }
        }
    }
}

impl std::fmt::Display for MixedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total: f64 = self.weights.iter().sum();
        let shares = THROWS
            .iter()
            .zip(self.weights)
            .map(|(name, w)| format!("{name} {:.0}%", 100.0 * w / total))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{shares}")
    }
}

/// Best of `throws`; a win over rock pays double, so the equilibrium is not uniform.
struct RockPaperScissors {
    throws: usize,
}

impl MatchEngine<MixedStrategy> for RockPaperScissors {
    fn play(&self, first: &MixedStrategy, second: &MixedStrategy) -> anyhow::Result<Outcome> {
        let mut rng = rand::rng();
        let mut balance = 0i64;
        for _ in 0..self.throws {
            let (a, b) = (first.throw(&mut rng)?, second.throw(&mut rng)?);
            let points = if b == 0 { 2 } else { 1 };
            if a == (b + 1) % 3 {
                balance += points;
            } else if b == (a + 1) % 3 {
                balance -= if a == 0 { 2 } else { 1 };
            }
        }
        Ok(match balance.signum() {
            1 => Outcome::FirstWins,
            -1 => Outcome::SecondWins,
            _ => Outcome::Draw,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.configuration();
    let engine = RockPaperScissors {
        throws: args.throws,
    };

    let trainer: Trainer<MixedStrategy, _> = Trainer::new(engine, config)?;
    let result = trainer.train()?;

    println!("\n\nTraining Complete\n");
    println!(
        "{} generations, {} matches",
        result.history().len(),
        result.matches_played()
    );
    for (rank, agent) in result.champions().take(5).enumerate() {
        println!("{:2}. {agent}: {}", rank + 1, agent.player());
    }
    Ok(())
}
