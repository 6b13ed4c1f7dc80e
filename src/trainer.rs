//! Core training logic.
//!
//! This module defines the [`Trainer`] type, which drives a training run on top of a
//! [`WorkerPool`]. Its responsibilities include:
//!
//! - Validating the [`Configuration`] before any thread is started
//! - Creating the initial population of fresh agents
//! - Running every sub-generation: shuffle, hand the agents to the workers, and wait until all
//!   of their matches have been played and rated
//! - Selection and reproduction between generations, through a [`PopulationManager`]
//! - Stopping and joining the workers before returning the final population
//!
//! # Generations
//!
//! A generation is `sub_generations` rounds in which every agent plays exactly one match,
//! followed by selection and reproduction. Rounds are strictly ordered: the agents of round
//! `k + 1` are only dispatched once all matches of round `k` are over.
//!
//! Selection and reproduction also run after the last generation, so the final population
//! contains unplayed newcomers. [`TrainingResult::champions`] gives the ranked survivors of the
//! last selection, which are the agents actually proven by matches.
//!
//! # Stopping early
//!
//! A [`StopHandle`] obtained with [`Trainer::stop_handle`] can be triggered from any thread. The
//! trainer notices it between two sub-generations, lets the current one finish, and returns the
//! population as it is.
//!
//! # Example
//!
//! See crate-level documentation for an example on how to use the `Trainer`.

use std::{
    fmt::Display,
    marker::PhantomData,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::Context;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::{debug, info, info_span, instrument, trace};

use crate::{
    agent::{sort_by_rank, Agent, AgentId},
    configuration::Configuration,
    game_interface::{MatchEngine, Player},
    logger::init_logger,
    match_scheduler::MatchScheduler,
    population::{PopulationManager, Renewal},
    rating::{Elo, RatingSystem},
    worker_pool::WorkerPool,
};

/// Cooperative cancellation of a training run.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Asks the trainer to stop after the sub-generation being played.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Summary of one generation, taken after its matches and before selection.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    /// Zero-based index of the generation.
    pub generation: usize,
    /// Matches played during this generation.
    pub matches_played: usize,
    /// Best agent of the generation.
    pub best: AgentId,
    pub best_rating: f64,
    pub mean_rating: f64,
    pub worst_rating: f64,
    /// What selection and reproduction did afterwards. `None` if the run was stopped before.
    pub renewal: Option<Renewal>,
    pub elapsed: Duration,
}

impl GenerationReport {
    fn new<P>(
        generation: usize,
        ranked: &[Agent<P>],
        matches_played: usize,
        elapsed: Duration,
    ) -> Option<Self> {
        let best = ranked.first()?;
        let worst = ranked.last()?;
        let mean_rating = ranked.iter().map(Agent::rating).sum::<f64>() / ranked.len() as f64;
        Some(GenerationReport {
            generation,
            matches_played,
            best: best.id(),
            best_rating: best.rating(),
            mean_rating,
            worst_rating: worst.rating(),
            renewal: None,
            elapsed,
        })
    }
}

impl Display for GenerationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "generation {}: {} matches, best {} ({:.1}), mean {:.1}, worst {:.1}",
            self.generation,
            self.matches_played,
            self.best,
            self.best_rating,
            self.mean_rating,
            self.worst_rating
        )?;
        if let Some(renewal) = &self.renewal {
            write!(
                f,
                ", kept {} + {} clones + {} fresh",
                renewal.kept, renewal.clones, renewal.fresh
            )?;
        }
        Ok(())
    }
}

/// What a training run produced.
#[derive(Debug)]
pub struct TrainingResult<P> {
    population: Vec<Agent<P>>,
    champions: Vec<AgentId>,
    history: Vec<GenerationReport>,
    stopped: bool,
}

impl<P> TrainingResult<P> {
    /// Final population, sorted by descending rating.
    pub fn population(&self) -> &[Agent<P>] {
        &self.population
    }

    pub fn into_population(self) -> Vec<Agent<P>> {
        self.population
    }

    /// Highest rated agent of the final population.
    pub fn best(&self) -> Option<&Agent<P>> {
        self.population.first()
    }

    /// Survivors of the last selection, best first.
    ///
    /// Empty when the run was stopped before any selection happened.
    pub fn champions(&self) -> impl Iterator<Item = &Agent<P>> + '_ {
        self.champions
            .iter()
            .filter_map(|id| self.population.iter().find(|a| a.id() == *id))
    }

    /// One report per generation started.
    pub fn history(&self) -> &[GenerationReport] {
        &self.history
    }

    /// Total number of matches played.
    pub fn matches_played(&self) -> usize {
        self.history.iter().map(|r| r.matches_played).sum()
    }

    /// Whether the run was cut short by a [`StopHandle`].
    pub fn was_stopped(&self) -> bool {
        self.stopped
    }
}

/// The main type for training agents.
///
/// It owns the match engine, the rating system, and the configuration. Each call to
/// [`train`](Trainer::train) is an independent run with its own worker pool.
///
/// # Type Parameters
/// - `P`: The trained policy, implementing [`Player`]
/// - `E`: The match engine implementing [`MatchEngine<P>`]
pub struct Trainer<P: Player, E: MatchEngine<P>> {
    engine: Arc<E>,
    ratings: Arc<dyn RatingSystem>,
    config: Configuration,
    stop: StopHandle,
    _player: PhantomData<fn() -> P>,
}

impl<P: Player, E: MatchEngine<P>> Trainer<P, E> {
    /// Create a [`Trainer`] with the given [`MatchEngine`] and [`Configuration`], rating agents
    /// with the default [`Elo`].
    ///
    /// # Errors
    /// Returned when the configuration is invalid (see
    /// [`ConfigError`](crate::configuration::ConfigError)), or when `config.log` is set and
    /// the log file cannot be installed. No thread is started.
    #[instrument(skip_all)]
    pub fn new(engine: E, config: Configuration) -> anyhow::Result<Trainer<P, E>> {
        config.validate()?;
        if config.log {
            let path = init_logger()?;
            info!("logging to {}", path.display());
        }
        trace!(?config);

        Ok(Trainer {
            engine: Arc::new(engine),
            ratings: Arc::new(Elo::default()),
            config,
            stop: StopHandle::default(),
            _player: PhantomData,
        })
    }

    /// Replace the rating system.
    pub fn with_rating_system(mut self, ratings: impl RatingSystem) -> Self {
        self.ratings = Arc::new(ratings);
        self
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Handle to stop the training run from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    fn population_manager(&self) -> PopulationManager {
        PopulationManager {
            fraction_kept: self.config.fraction_kept,
            mutation_rate: self.config.mutation_rate,
            initial_rating: self.ratings.initial_rating(),
        }
    }

    /// Trains a population of fresh agents for the configured number of generations.
    ///
    /// # Returns
    /// The final population sorted by descending rating, with the history of the run.
    ///
    /// # Errors
    /// Returned when a match fails (engine error or panic) or a worker dies. Every worker is
    /// joined before returning, in both cases.
    #[instrument(skip_all, fields(population = self.config.population_size, workers = self.config.workers))]
    pub fn train(&self) -> anyhow::Result<TrainingResult<P>> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let initial_rating = self.ratings.initial_rating();
        let population = (0..self.config.population_size)
            .map(|_| Agent::new(P::fresh(), initial_rating, 0))
            .collect();

        let pool = WorkerPool::spawn(
            self.config.workers,
            self.engine.clone(),
            self.ratings.clone(),
        )?;
        let result = self.run_generations(&pool, population, &mut rng);
        let joined = pool.shutdown();

        let result = result.context("training aborted")?;
        joined?;
        info!(
            "training over: {} generations, {} matches",
            result.history.len(),
            result.matches_played()
        );
        Ok(result)
    }

    fn run_generations(
        &self,
        pool: &WorkerPool<P>,
        mut population: Vec<Agent<P>>,
        rng: &mut StdRng,
    ) -> anyhow::Result<TrainingResult<P>> {
        let manager = self.population_manager();
        let mut scheduler = MatchScheduler::new();
        let mut history = vec![];
        let mut champions = vec![];
        let mut stopped = false;

        for generation in 0..self.config.generations {
            let _span = info_span!("generation", generation).entered();
            let start = Instant::now();
            let matches_before = scheduler.matches_played();

            for sub_generation in 0..self.config.sub_generations {
                if self.stop.is_stopped() {
                    stopped = true;
                    break;
                }
                debug!(sub_generation, "shuffle and enqueue");
                population.shuffle(rng);
                population = scheduler.play_round(pool, population)?;
                debug!(sub_generation, "drained");
            }

            sort_by_rank(&mut population);
            let matches_played = scheduler.matches_played() - matches_before;
            let Some(mut report) =
                GenerationReport::new(generation, &population, matches_played, start.elapsed())
            else {
                break;
            };
            if stopped {
                info!("training stopped");
                if matches_played > 0 {
                    self.print_report(&report);
                    history.push(report);
                }
                break;
            }

            let (next, renewal) = manager.renew(population, generation + 1, rng);
            champions = next[..renewal.kept].iter().map(Agent::id).collect();
            population = next;
            report.renewal = Some(renewal);
            self.print_report(&report);
            history.push(report);
        }

        sort_by_rank(&mut population);
        Ok(TrainingResult {
            population,
            champions,
            history,
            stopped,
        })
    }

    fn print_report(&self, report: &GenerationReport) {
        info!("{report}");
        if self.config.verbose {
            // clear line, green report, default
            println!("\x1b[2K\x1b[32m{report}\x1b[39m");
        }
    }
}
