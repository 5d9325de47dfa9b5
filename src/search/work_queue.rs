//! Work-stealing job queues for the dynamic perft strategies.

use std::cell::Cell;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use crossbeam_deque::{Injector, Steal, Stealer, Worker};
use rand::Rng;

use crate::game_state::position::Position;

/// A subtree still to be counted.
#[derive(Debug, Clone)]
pub struct PerftJob {
    pub position: Position,
    pub depth: u8,
}

/// Global injector plus one stealer per worker deque.
#[derive(Clone)]
pub struct Queues {
    pub injector: Arc<Injector<PerftJob>>,
    pub stealers: Arc<[Stealer<PerftJob>]>,
    /// Jobs pushed but not yet finished.
    pub pending: Arc<AtomicU64>,
}

impl Queues {
    /// Fresh queues with one LIFO deque per worker.
    pub fn with_workers(count: usize) -> (Self, Vec<Worker<PerftJob>>) {
        let workers: Vec<Worker<PerftJob>> =
            (0..count.max(1)).map(|_| Worker::new_lifo()).collect();
        let stealers: Vec<Stealer<PerftJob>> = workers.iter().map(|w| w.stealer()).collect();
        let queues = Self {
            injector: Arc::new(Injector::new()),
            stealers: stealers.into(),
            pending: Arc::new(AtomicU64::new(0)),
        };
        (queues, workers)
    }

    pub fn inject(&self, job: PerftJob) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.injector.push(job);
    }

    pub fn push_local(&self, worker: &Worker<PerftJob>, job: PerftJob) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        worker.push(job);
    }

    /// Mark one popped job as finished.
    pub fn finish(&self) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn is_drained(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }
}

/// Next job for a worker: own deque first (LIFO keeps the walk depth
/// first), then random victims, then the injector. Backs off after repeated
/// misses.
pub fn get_job(
    my_worker: &Worker<PerftJob>,
    queues: &Queues,
    my_stealer_index: usize,
    steals: &AtomicU64,
) -> Option<PerftJob> {
    thread_local! {
        static CONSECUTIVE_STEAL_FAILS: Cell<u32> = const { Cell::new(0) };
    }

    if let Some(job) = my_worker.pop() {
        CONSECUTIVE_STEAL_FAILS.with(|f| f.set(0));
        return Some(job);
    }

    let num_stealers = queues.stealers.len();
    if num_stealers > 1 {
        let mut rng = rand::rng();
        let steal_attempts = 3.min(num_stealers - 1);
        for _ in 0..steal_attempts {
            let mut idx = rng.random_range(0..num_stealers - 1);
            if idx >= my_stealer_index {
                idx += 1;
            }
            loop {
                match queues.stealers[idx].steal() {
                    Steal::Success(job) => {
                        CONSECUTIVE_STEAL_FAILS.with(|f| f.set(0));
                        steals.fetch_add(1, Ordering::Relaxed);
                        return Some(job);
                    }
                    Steal::Empty => break,
                    Steal::Retry => continue,
                }
            }
        }
    }

    loop {
        match queues.injector.steal_batch_and_pop(my_worker) {
            Steal::Success(job) => {
                CONSECUTIVE_STEAL_FAILS.with(|f| f.set(0));
                return Some(job);
            }
            Steal::Empty => break,
            Steal::Retry => continue,
        }
    }

    CONSECUTIVE_STEAL_FAILS.with(|f| {
        let fails = f.get() + 1;
        f.set(fails);
        match fails {
            1..=5 => {}
            6..=15 => std::thread::yield_now(),
            16..=25 => std::thread::sleep(Duration::from_micros(10)),
            _ => std::thread::sleep(Duration::from_micros(100)),
        }
    });

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::variants::builtin_position;

    fn job(depth: u8) -> PerftJob {
        PerftJob {
            position: builtin_position("Very Small - Open").expect("variant"),
            depth,
        }
    }

    #[test]
    fn local_jobs_pop_lifo() {
        let (queues, workers) = Queues::with_workers(1);
        let steals = AtomicU64::new(0);
        queues.push_local(&workers[0], job(1));
        queues.push_local(&workers[0], job(2));

        let first = get_job(&workers[0], &queues, 0, &steals).expect("job");
        assert_eq!(first.depth, 2);
        queues.finish();
        assert!(!queues.is_drained());
        let second = get_job(&workers[0], &queues, 0, &steals).expect("job");
        assert_eq!(second.depth, 1);
        queues.finish();
        assert!(queues.is_drained());
        assert!(get_job(&workers[0], &queues, 0, &steals).is_none());
    }

    #[test]
    fn idle_worker_takes_injected_or_stolen_work() {
        let (queues, workers) = Queues::with_workers(2);
        let steals = AtomicU64::new(0);
        queues.inject(job(3));
        assert_eq!(get_job(&workers[1], &queues, 1, &steals).map(|j| j.depth), Some(3));

        queues.push_local(&workers[0], job(4));
        let stolen = get_job(&workers[1], &queues, 1, &steals).expect("steal");
        assert_eq!(stolen.depth, 4);
        assert_eq!(steals.load(Ordering::Relaxed), 1);
    }
}
