//! Countdown of the matches of one sub-generation.

use std::mem;

use tracing::{debug, trace};

use crate::{
    agent::Agent,
    game_interface::Player,
    match_runner::{MatchError, RunnerResult},
    worker_pool::WorkerPool,
};

/// Bookkeeping of one sub-generation: how many matches are still running, and the agents
/// already back from their match.
///
/// Completion is counted, not observed: an empty queue only means every agent was *taken* by
/// a worker, not that every match has been played.
pub struct MatchScheduler<P> {
    finished: Vec<Agent<P>>,
    running_matches: usize,
    matches_played: usize,
}

impl<P: Player> MatchScheduler<P> {
    pub fn new() -> Self {
        MatchScheduler {
            finished: vec![],
            running_matches: 0,
            matches_played: 0,
        }
    }

    /// Dispatches every agent to the pool and blocks until all of their matches are over.
    ///
    /// Returns the same agents, with updated ratings, in completion order.
    ///
    /// # Errors
    /// Returned when a match failed or the workers are gone. The round is abandoned.
    pub fn play_round(
        &mut self,
        pool: &WorkerPool<P>,
        agents: Vec<Agent<P>>,
    ) -> anyhow::Result<Vec<Agent<P>>> {
        self.start_round(agents.len());
        pool.dispatch(agents);

        while !self.is_drained() {
            // not drained <=> match running <=> result to receive
            let result = pool.recv()?;
            if let Err(e) = self.on_result(result) {
                self.abandon_round();
                return Err(e.into());
            }
        }
        debug_assert_eq!(pool.pending(), 0);
        Ok(self.take_finished())
    }

    fn start_round(&mut self, agents: usize) {
        assert!(
            self.is_drained(),
            "previous sub-generation is still running"
        );
        assert!(agents % 2 == 0, "cannot pair an odd number of agents");
        trace!("next sub-generation: {} matches", agents / 2);
        self.running_matches = agents / 2;
        self.finished.reserve(agents);
    }

    fn on_result(&mut self, result: RunnerResult<P>) -> Result<(), MatchError> {
        let report = result?;
        self.finished.push(report.first);
        self.finished.push(report.second);
        self.running_matches -= 1;
        self.matches_played += 1;
        Ok(())
    }

    fn abandon_round(&mut self) {
        debug!(
            "sub-generation abandoned with {} matches running",
            self.running_matches
        );
        self.running_matches = 0;
        self.finished.clear();
    }

    fn take_finished(&mut self) -> Vec<Agent<P>> {
        mem::take(&mut self.finished)
    }

    /// Every match of the current sub-generation reported back.
    pub fn is_drained(&self) -> bool {
        self.running_matches == 0
    }

    /// Matches played through this scheduler so far.
    pub fn matches_played(&self) -> usize {
        self.matches_played
    }
}

impl<P: Player> Default for MatchScheduler<P> {
    fn default() -> Self {
        Self::new()
    }
}
