//! Long-lived worker threads playing the matches of the trainer.
//!
//! Every worker loops on the shared [`MatchQueue`]: take two agents, play them against each
//! other, send the [`RunnerResult`] back through a channel. The trainer dispatches agents with
//! [`WorkerPool::dispatch`] and collects results with [`WorkerPool::recv`].
//!
//! Stopping is cooperative: [`WorkerPool::shutdown`] raises a flag that workers check between
//! matches, never during one, then joins every thread. A match in flight at shutdown is played
//! to the end and its result is still delivered.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{bail, Context};
use tracing::{debug, error, info, trace};

use crate::{
    agent::Agent,
    game_interface::{MatchEngine, Player},
    match_queue::MatchQueue,
    match_runner::{run_match, RunnerResult},
    rating::RatingSystem,
};

/// How long an idle worker sleeps before checking the quit flag again.
const IDLE_WAIT: Duration = Duration::from_millis(50);

struct Shared<P> {
    queue: MatchQueue<Agent<P>>,
    quit: AtomicBool,
}

/// A fixed set of worker threads sharing one match queue.
pub struct WorkerPool<P: Player> {
    shared: Arc<Shared<P>>,
    rx_result: Receiver<RunnerResult<P>>,
    workers: Vec<JoinHandle<()>>,
}

impl<P: Player> WorkerPool<P> {
    /// Starts `workers` threads playing matches with `engine`, rated by `ratings`.
    pub fn spawn<E, R>(workers: usize, engine: Arc<E>, ratings: Arc<R>) -> anyhow::Result<Self>
    where
        E: MatchEngine<P> + ?Sized,
        R: RatingSystem + ?Sized,
    {
        let shared = Arc::new(Shared {
            queue: MatchQueue::new(),
            quit: AtomicBool::new(false),
        });
        let (tx_result, rx_result) = mpsc::channel();

        let mut pool = WorkerPool {
            shared,
            rx_result,
            workers: Vec::with_capacity(workers),
        };
        for worker_id in 0..workers {
            let shared = pool.shared.clone();
            let engine = engine.clone();
            let ratings = ratings.clone();
            let tx_result = tx_result.clone();
            let handle = thread::Builder::new()
                .name(format!("worker-{worker_id}"))
                .spawn(move || worker_loop(worker_id, &shared, &*engine, &*ratings, &tx_result))
                .with_context(|| format!("could not spawn worker {worker_id}"))?;
            pool.workers.push(handle);
        }
        info!("{workers} workers started");
        Ok(pool)
    }

    /// Number of worker threads still owned by the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Hands agents over to the workers.
    pub fn dispatch(&self, agents: impl IntoIterator<Item = Agent<P>>) {
        self.shared.queue.extend(agents);
    }

    /// Blocks until a worker reports a finished (or failed) match.
    ///
    /// # Errors
    /// Returned when a worker thread died, since its match will never report back, or when no
    /// worker is left to send anything.
    pub fn recv(&self) -> anyhow::Result<RunnerResult<P>> {
        loop {
            match self.rx_result.recv_timeout(IDLE_WAIT) {
                Ok(result) => return Ok(result),
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(dead) = self.workers.iter().position(JoinHandle::is_finished) {
                        error!("worker {dead} died");
                        bail!("worker {dead} stopped unexpectedly");
                    }
                }
                Err(RecvTimeoutError::Disconnected) => bail!("every worker has stopped"),
            }
        }
    }

    /// Number of agents dispatched but not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Stops and joins every worker, letting matches in flight finish first.
    ///
    /// Agents still waiting in the queue are dropped.
    ///
    /// # Errors
    /// Returned when a worker thread panicked.
    pub fn shutdown(mut self) -> anyhow::Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        if self.workers.is_empty() {
            return Ok(());
        }
        debug!("stopping {} workers", self.workers.len());
        self.shared.quit.store(true, Ordering::Release);
        self.shared.queue.wake_all();

        let mut panicked = 0;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                panicked += 1;
            }
        }
        let dropped = self.shared.queue.drain().len();
        if dropped > 0 {
            debug!("{dropped} queued agents dropped");
        }
        if panicked > 0 {
            error!("{panicked} workers panicked");
            bail!("{panicked} workers panicked");
        }
        info!("all workers joined");
        Ok(())
    }
}

impl<P: Player> Drop for WorkerPool<P> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("{e}");
        }
    }
}

fn worker_loop<P, E, R>(
    worker_id: usize,
    shared: &Shared<P>,
    engine: &E,
    ratings: &R,
    tx_result: &Sender<RunnerResult<P>>,
) where
    P: Player,
    E: MatchEngine<P> + ?Sized,
    R: RatingSystem + ?Sized,
{
    trace!("worker {worker_id} started");
    while !shared.quit.load(Ordering::Acquire) {
        let Some((first, second)) = shared.queue.wait_pair(IDLE_WAIT) else {
            continue;
        };
        let result = run_match(first, second, engine, ratings);
        if tx_result.send(result).is_err() {
            // the pool is gone, nobody will ever read another result
            break;
        }
    }
    trace!("worker {worker_id} quitting");
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::{atomic::AtomicUsize, mpsc::sync_channel, Mutex},
        time::Instant,
    };

    use rand::Rng;

    use super::*;
    use crate::{game_interface::Outcome, rating::Elo};

    #[derive(Clone, Debug)]
    struct Token;

    impl Player for Token {
        fn fresh() -> Self {
            Token
        }

        fn mutate<R: Rng + ?Sized>(&mut self, _rate: f64, _rng: &mut R) {}
    }

    struct CountingEngine {
        played: AtomicUsize,
    }

    impl MatchEngine<Token> for CountingEngine {
        fn play(&self, _: &Token, _: &Token) -> anyhow::Result<Outcome> {
            self.played.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_micros(200));
            Ok(Outcome::FirstWins)
        }
    }

    fn population(size: usize) -> Vec<Agent<Token>> {
        (0..size)
            .map(|_| Agent::new(Token, 1000.0, 0))
            .collect()
    }

    #[test]
    fn every_agent_plays_exactly_once() {
        for (size, workers) in [(2, 1), (4, 3), (10, 10), (64, 4), (100, 7), (20, 32)] {
            let engine = Arc::new(CountingEngine {
                played: AtomicUsize::new(0),
            });
            let pool = WorkerPool::spawn(workers, engine.clone(), Arc::new(Elo::default())).unwrap();
            let agents = population(size);
            let ids: HashSet<_> = agents.iter().map(Agent::id).collect();
            pool.dispatch(agents);

            let mut returned = vec![];
            for _ in 0..size / 2 {
                let report = pool.recv().unwrap().unwrap();
                returned.push(report.first);
                returned.push(report.second);
            }
            pool.shutdown().unwrap();

            assert_eq!(engine.played.load(Ordering::SeqCst), size / 2);
            assert_eq!(returned.len(), size);
            assert!(returned.iter().all(|a| a.matches_played() == 1));
            assert_eq!(returned.iter().map(Agent::id).collect::<HashSet<_>>(), ids);
        }
    }

    struct SlowEngine {
        started: Mutex<mpsc::SyncSender<()>>,
        finished: AtomicBool,
    }

    impl MatchEngine<Token> for SlowEngine {
        fn play(&self, _: &Token, _: &Token) -> anyhow::Result<Outcome> {
            self.started.lock().unwrap().send(()).unwrap();
            thread::sleep(Duration::from_millis(200));
            self.finished.store(true, Ordering::SeqCst);
            Ok(Outcome::Draw)
        }
    }

    #[test]
    fn shutdown_waits_for_match_in_flight() {
        let (tx_started, rx_started) = sync_channel(1);
        let engine = Arc::new(SlowEngine {
            started: Mutex::new(tx_started),
            finished: AtomicBool::new(false),
        });
        let pool = WorkerPool::spawn(2, engine.clone(), Arc::new(Elo::default())).unwrap();
        pool.dispatch(population(2));

        // the only match is now in flight
        rx_started.recv().unwrap();
        assert_eq!(pool.pending(), 0);

        let start = Instant::now();
        let results = shutdown_and_collect(pool);
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert!(engine.finished.load(Ordering::SeqCst));

        assert_eq!(results.len(), 1);
        let report = results.into_iter().next().unwrap().unwrap();
        assert_eq!(report.outcome, Outcome::Draw);
        assert_eq!(report.first.matches_played(), 1);
        assert_eq!(report.second.matches_played(), 1);
    }

    fn shutdown_and_collect(mut pool: WorkerPool<Token>) -> Vec<RunnerResult<Token>> {
        pool.stop().unwrap();
        pool.rx_result.try_iter().collect()
    }

    #[test]
    fn idle_workers_stop_promptly() {
        let engine = Arc::new(CountingEngine {
            played: AtomicUsize::new(0),
        });
        let pool = WorkerPool::spawn(8, engine, Arc::new(Elo::default())).unwrap();
        assert_eq!(pool.size(), 8);
        // a lone agent is never taken
        pool.dispatch(population(1));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(pool.pending(), 1);

        let start = Instant::now();
        pool.shutdown().unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn engine_failure_is_delivered() {
        let engine = Arc::new(|_: &Token, _: &Token| -> anyhow::Result<Outcome> {
            anyhow::bail!("no legal move")
        });
        let pool = WorkerPool::spawn(2, engine, Arc::new(Elo::default())).unwrap();
        pool.dispatch(population(2));
        let err = pool.recv().unwrap().unwrap_err();
        assert!(err.reason.contains("no legal move"));
        pool.shutdown().unwrap();
    }
}
