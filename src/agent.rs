//! Agents: a [`Player`] together with its identity and skill rating.

use std::{
    cmp::Ordering,
    fmt::Display,
    sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
};

use crate::game_interface::Player;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of an agent, never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(u64);

impl AgentId {
    fn next() -> AgentId {
        AgentId(NEXT_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Raw value of the identifier.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A member of the population.
///
/// An agent is owned by exactly one place at a time (the population, the match queue, or the
/// match being played) and is moved between them, never shared.
#[derive(Debug)]
pub struct Agent<P> {
    id: AgentId,
    parent: Option<AgentId>,
    generation: usize,
    rating: f64,
    matches_played: usize,
    player: P,
}

impl<P: Player> Agent<P> {
    /// Wraps a freshly created player.
    pub fn new(player: P, rating: f64, generation: usize) -> Agent<P> {
        Agent {
            id: AgentId::next(),
            parent: None,
            generation,
            rating,
            matches_played: 0,
            player,
        }
    }

    /// Deep copy under a new identity.
    ///
    /// The rating is inherited from `self`, the match counter starts over, and `self` is left
    /// untouched.
    pub fn offspring(&self, generation: usize) -> Agent<P> {
        Agent {
            id: AgentId::next(),
            parent: Some(self.id),
            generation,
            rating: self.rating,
            matches_played: 0,
            player: self.player.clone(),
        }
    }
}

impl<P> Agent<P> {
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// The agent this one was cloned from, if any.
    pub fn parent(&self) -> Option<AgentId> {
        self.parent
    }

    /// Generation in which this agent was created.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    /// Number of rated matches played since creation.
    pub fn matches_played(&self) -> usize {
        self.matches_played
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub(crate) fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub(crate) fn record_match(&mut self, new_rating: f64) {
        self.rating = new_rating;
        self.matches_played += 1;
    }

    /// Consumes the agent, returning its player.
    pub fn into_player(self) -> P {
        self.player
    }

    /// Ranking order: higher rating first, then older (smaller) id first.
    pub fn cmp_rank(&self, other: &Agent<P>) -> Ordering {
        other
            .rating
            .total_cmp(&self.rating)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl<P> Display for Agent<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.1})", self.id, self.rating)
    }
}

/// Sorts agents by descending rating, see [`Agent::cmp_rank`].
pub fn sort_by_rank<P>(agents: &mut [Agent<P>]) {
    agents.sort_by(Agent::cmp_rank);
}
