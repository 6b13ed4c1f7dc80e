//! Selection and reproduction between two generations.
//!
//! Nothing here is concurrent: the trainer only calls the [`PopulationManager`] once every match
//! of the generation has reported back, so no agent is being played while ratings are read.
//!
//! # Selection
//!
//! Agents are ranked by rating (see [`Agent::cmp_rank`]) and the best
//! `floor(population_size * fraction_kept)` survive. The rest are dropped.
//!
//! # Reproduction
//!
//! Survivors are kept unchanged, then the population is refilled by alternating:
//! - a copy of a uniformly chosen survivor, mutated with `mutation_rate` (exploitation),
//! - a fresh player from [`Player::fresh`] (exploration).
//!
//! Copies inherit the rating of their parent. When nobody survives, every newcomer is fresh.

use rand::{seq::IndexedRandom, Rng};
use tracing::{debug, warn};

use crate::{
    agent::{sort_by_rank, Agent},
    game_interface::Player,
};

/// Genetic operators of the trainer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationManager {
    /// Fraction of the population surviving selection, in `[0, 1]`
    pub fraction_kept: f64,
    /// Rate given to [`Player::mutate`]; `0.0` leaves copies unchanged
    pub mutation_rate: f64,
    /// Rating of fresh agents
    pub initial_rating: f64,
}

/// What [`PopulationManager::renew`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Renewal {
    pub kept: usize,
    pub clones: usize,
    pub fresh: usize,
}

impl PopulationManager {
    /// Number of survivors for a population of `population_size` agents.
    pub fn kept_count(&self, population_size: usize) -> usize {
        let kept = (population_size as f64 * self.fraction_kept).floor() as usize;
        kept.min(population_size)
    }

    /// Keeps the best agents, sorted by descending rating.
    pub fn select<P>(&self, mut population: Vec<Agent<P>>) -> Vec<Agent<P>> {
        let kept = self.kept_count(population.len());
        sort_by_rank(&mut population);
        population.truncate(kept);
        population
    }

    /// Refills `survivors` up to `target` agents born in `generation`.
    ///
    /// Survivors stay in front, in their original order.
    pub fn reproduce<P, R>(
        &self,
        survivors: Vec<Agent<P>>,
        target: usize,
        generation: usize,
        rng: &mut R,
    ) -> (Vec<Agent<P>>, Renewal)
    where
        P: Player,
        R: Rng + ?Sized,
    {
        let kept = survivors.len();
        if kept == 0 && target > 0 {
            warn!("no survivor to clone, the whole population is fresh");
        }

        let mut renewal = Renewal {
            kept,
            ..Renewal::default()
        };
        let mut next = survivors;
        next.reserve(target.saturating_sub(kept));

        let mut step = 0usize;
        while next.len() < target {
            let parent = if step % 2 == 0 {
                next[..kept].choose(rng)
            } else {
                None
            };
            let child = match parent {
                Some(parent) => {
                    let mut child = parent.offspring(generation);
                    if self.mutation_rate > 0.0 {
                        child.player_mut().mutate(self.mutation_rate, rng);
                    }
                    renewal.clones += 1;
                    child
                }
                None => {
                    renewal.fresh += 1;
                    Agent::new(P::fresh(), self.initial_rating, generation)
                }
            };
            next.push(child);
            step += 1;
        }
        debug!(?renewal);
        (next, renewal)
    }

    /// Selection followed by reproduction back to the original size.
    pub fn renew<P, R>(
        &self,
        population: Vec<Agent<P>>,
        generation: usize,
        rng: &mut R,
    ) -> (Vec<Agent<P>>, Renewal)
    where
        P: Player,
        R: Rng + ?Sized,
    {
        let target = population.len();
        let survivors = self.select(population);
        self.reproduce(survivors, target, generation, rng)
    }
}
