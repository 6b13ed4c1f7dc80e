//! Shared buffer of agents waiting for an opponent.

use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

/// A thread-safe queue handing out its items two at a time.
///
/// Taking a pair is atomic with respect to the size check: either two items leave the queue
/// together or none does. A worker can therefore never end up holding a lone agent.
#[derive(Debug)]
pub struct MatchQueue<T> {
    pending: Mutex<VecDeque<T>>,
    available: Condvar,
}

impl<T> MatchQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    // Nothing can panic while the lock is held, so a poisoned queue is still consistent.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, item: T) {
        let mut guard = self.lock();
        guard.push_back(item);
        if guard.len() >= 2 {
            self.available.notify_one();
        }
    }

    /// Pushes every item under a single lock, then wakes all waiting takers.
    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.lock().extend(items);
        self.available.notify_all();
    }

    /// Removes two items if at least two are queued, otherwise removes nothing.
    pub fn try_take_pair(&self) -> Option<(T, T)> {
        Self::take_pair_locked(&mut self.lock())
    }

    /// Like [`try_take_pair`](Self::try_take_pair), but sleeps up to `timeout` for a pair to
    /// become available.
    pub fn wait_pair(&self, timeout: Duration) -> Option<(T, T)> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock();
        loop {
            if let Some(pair) = Self::take_pair_locked(&mut guard) {
                return Some(pair);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            guard = self
                .available
                .wait_timeout(guard, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn take_pair_locked(pending: &mut VecDeque<T>) -> Option<(T, T)> {
        if pending.len() < 2 {
            return None;
        }
        let first = pending.pop_front()?;
        let second = pending.pop_front()?;
        Some((first, second))
    }

    /// Wakes every thread sleeping in [`wait_pair`](Self::wait_pair).
    pub fn wake_all(&self) {
        let _guard = self.lock();
        self.available.notify_all();
    }

    /// Removes and returns everything still queued.
    pub fn drain(&self) -> Vec<T> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T> Default for MatchQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
    };

    use super::*;

    #[test]
    fn pair_or_nothing() {
        let queue = MatchQueue::new();
        assert_eq!(queue.try_take_pair(), None);
        queue.push(1);
        assert_eq!(queue.try_take_pair(), None);
        assert_eq!(queue.len(), 1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.try_take_pair(), Some((1, 2)));
        assert_eq!(queue.try_take_pair(), None);
        assert_eq!(queue.drain(), vec![3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn wait_pair_times_out() {
        let queue = MatchQueue::<u32>::new();
        queue.push(1);
        let start = Instant::now();
        assert_eq!(queue.wait_pair(Duration::from_millis(30)), None);
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn wait_pair_wakes_on_push() {
        let queue = Arc::new(MatchQueue::new());
        queue.push(1);
        let waiter = {
            let queue = queue.clone();
            thread::spawn(move || queue.wait_pair(Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        queue.push(2);
        assert_eq!(waiter.join().unwrap(), Some((1, 2)));
    }

    /// Many producers and consumers race on a queue holding an even number of items. Every
    /// item must come out exactly once, always in a pair.
    #[test]
    fn concurrent_pair_take_never_splits() {
        const PRODUCERS: usize = 4;
        const CONSUMERS: usize = 8;
        const PER_PRODUCER: usize = 250;
        const TOTAL: usize = PRODUCERS * PER_PRODUCER;

        for _ in 0..20 {
            let queue = Arc::new(MatchQueue::new());
            let taken = Arc::new(AtomicUsize::new(0));

            let producers: Vec<_> = (0..PRODUCERS)
                .map(|p| {
                    let queue = queue.clone();
                    thread::spawn(move || {
                        for i in 0..PER_PRODUCER {
                            queue.push(p * PER_PRODUCER + i);
                        }
                    })
                })
                .collect();

            let consumers: Vec<_> = (0..CONSUMERS)
                .map(|_| {
                    let queue = queue.clone();
                    let taken = taken.clone();
                    thread::spawn(move || {
                        let mut pairs = vec![];
                        while taken.load(Ordering::SeqCst) < TOTAL {
                            if let Some((a, b)) = queue.wait_pair(Duration::from_millis(1)) {
                                taken.fetch_add(2, Ordering::SeqCst);
                                pairs.push((a, b));
                            }
                        }
                        pairs
                    })
                })
                .collect();

            for producer in producers {
                producer.join().unwrap();
            }
            let pairs: Vec<(usize, usize)> = consumers
                .into_iter()
                .flat_map(|c| c.join().unwrap())
                .collect();

            assert_eq!(pairs.len(), TOTAL / 2);
            let unique: HashSet<usize> = pairs.iter().flat_map(|&(a, b)| [a, b]).collect();
            assert_eq!(unique.len(), TOTAL);
            assert!(pairs.iter().all(|(a, b)| a != b));
            assert!(queue.is_empty());
        }
    }
}
