//! Multi-threaded perft strategies.
//!
//! Every strategy returns the same count as `perft` for a completed search.
//! - `perft_parallel`: root actions split into contiguous chunks, one scoped
//!   thread per chunk.
//! - `perft_dynamic`: work stealing over `crossbeam-deque`; jobs deeper than
//!   the split depth are expanded into child jobs, the rest are counted in
//!   place.
//! - `perft_with_tt`: `perft_dynamic` plus a sharded transposition table.
//! - `perft_timed`: `perft_dynamic` under a deadline; unfinished subtrees are
//!   left out and the result is flagged incomplete.

use std::ops::ControlFlow;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_deque::Worker;
use log::{debug, info};

use crate::errors::{ChessError, ChessResult};
use crate::game_state::position::Position;
use crate::move_generation::action_enumerator::{count_actions, for_each_action, legal_children};
use crate::move_generation::perft::perft_single_thread;
use crate::search::threading::{
    SearchConfig, SharedSearchState, SharedTranspositionTable, ThreadingConfig,
};
use crate::search::transposition_table::TTEntry;
use crate::search::work_queue::{get_job, PerftJob, Queues};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerftMode {
    Sequential,
    Parallel,
    Dynamic,
    Tt,
    Timed,
}

impl FromStr for PerftMode {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "single" => Ok(Self::Sequential),
            "parallel" | "static" => Ok(Self::Parallel),
            "dynamic" => Ok(Self::Dynamic),
            "tt" => Ok(Self::Tt),
            "timed" => Ok(Self::Timed),
            other => Err(ChessError::malformed(format!("unknown perft mode: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerftReport {
    pub nodes: u64,
    /// False when a deadline cut the search short.
    pub completed: bool,
    pub elapsed: Duration,
}

/// Shared, read-only context of a counting walk.
#[derive(Clone, Copy)]
struct CountContext<'a> {
    state: Option<&'a SharedSearchState>,
    tt: Option<&'a SharedTranspositionTable>,
}

impl CountContext<'_> {
    #[inline]
    fn should_stop(&self) -> bool {
        self.state.is_some_and(|s| s.should_stop())
    }
}

/// Perft with optional cancellation and table lookups; `None` when stopped.
fn perft_counted(pos: &Position, depth: u8, ctx: CountContext<'_>) -> Option<u64> {
    if ctx.should_stop() {
        return None;
    }
    if depth == 0 {
        return Some(1);
    }
    if ctx.state.is_none() && ctx.tt.is_none() {
        return Some(perft_single_thread(pos, depth));
    }

    let key = ctx.tt.map(|_| pos.key());
    if let (Some(tt), Some(key)) = (ctx.tt, key) {
        if let Some(count) = tt.probe(key, depth) {
            return Some(count);
        }
    }

    let total = if depth == 1 {
        count_actions(pos)
    } else {
        let mut total = 0u64;
        let flow = for_each_action(pos, |_, partial| {
            let mut child = partial.clone();
            if !child.submit() {
                return ControlFlow::Continue(());
            }
            match perft_counted(&child, depth - 1, ctx) {
                Some(n) => {
                    total += n;
                    ControlFlow::Continue(())
                }
                None => ControlFlow::Break(()),
            }
        });
        if flow.is_break() {
            return None;
        }
        total
    };

    if let (Some(tt), Some(key)) = (ctx.tt, key) {
        tt.store(TTEntry::new(key, depth, total));
    }
    Some(total)
}

/// Root actions split into contiguous chunks over scoped threads.
pub fn perft_parallel(pos: &Position, depth: u8, threads: usize) -> ChessResult<u64> {
    if depth == 0 {
        return Ok(1);
    }
    let threads = ThreadingConfig::new(threads).normalized_threads();
    let children: Vec<Position> = legal_children(pos).into_iter().map(|(_, p)| p).collect();
    if children.is_empty() {
        return Ok(0);
    }
    let chunk_size = children.len().div_ceil(threads);
    debug!(
        "perft_parallel: {} root actions in chunks of {chunk_size} over {threads} threads",
        children.len()
    );

    thread::scope(|s| {
        let handles: Vec<_> = children
            .chunks(chunk_size)
            .map(|chunk| {
                s.spawn(move || {
                    chunk
                        .iter()
                        .map(|child| perft_single_thread(child, depth - 1))
                        .sum::<u64>()
                })
            })
            .collect();

        let mut total = 0u64;
        for handle in handles {
            total += handle
                .join()
                .map_err(|_| {
                    ChessError::SearchPanicked("perft worker thread panicked".to_owned())
                })?;
        }
        Ok(total)
    })
}

/// Work-stealing walk shared by the dynamic, table and timed strategies.
fn run_dynamic(
    pos: &Position,
    depth: u8,
    threads: usize,
    split_depth: u8,
    state: &SharedSearchState,
    tt: Option<&SharedTranspositionTable>,
) -> ChessResult<(u64, bool)> {
    if state.should_stop() {
        return Ok((0, false));
    }
    if depth == 0 {
        return Ok((1, true));
    }

    let threads = ThreadingConfig::new(threads).normalized_threads();
    let (queues, workers) = Queues::with_workers(threads);
    queues.inject(PerftJob {
        position: pos.clone(),
        depth,
    });

    let total = AtomicU64::new(0);
    let dropped = AtomicBool::new(false);
    let steals = AtomicU64::new(0);
    // Splitting below depth 2 would only produce depth-0 leaves.
    let split_above = split_depth.max(1);

    let outcome: ChessResult<()> = thread::scope(|s| {
        let handles: Vec<_> = workers
            .into_iter()
            .enumerate()
            .map(|(worker_id, worker)| {
                let queues = queues.clone();
                let (total, dropped, steals) = (&total, &dropped, &steals);
                s.spawn(move || {
                    let ctx = CountContext {
                        state: Some(state),
                        tt,
                    };
                    let jobs = worker_loop(
                        worker_id,
                        &worker,
                        &queues,
                        ctx,
                        split_above,
                        total,
                        dropped,
                        steals,
                    );
                    debug!("perft worker {worker_id} finished after {jobs} jobs");
                })
            })
            .collect();

        for handle in handles {
            handle
                .join()
                .map_err(|_| {
                    ChessError::SearchPanicked("perft worker thread panicked".to_owned())
                })?;
        }
        Ok(())
    });
    outcome?;

    // A stop that lands after the last job still counts as complete.
    let completed = !dropped.load(Ordering::Relaxed) && queues.is_drained();
    debug!(
        "dynamic perft: {} steals, completed={completed}",
        steals.load(Ordering::Relaxed)
    );
    Ok((total.load(Ordering::Relaxed), completed))
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    worker_id: usize,
    worker: &Worker<PerftJob>,
    queues: &Queues,
    ctx: CountContext<'_>,
    split_above: u8,
    total: &AtomicU64,
    dropped: &AtomicBool,
    steals: &AtomicU64,
) -> u64 {
    let mut jobs = 0u64;
    loop {
        if ctx.should_stop() {
            break;
        }
        let Some(job) = get_job(worker, queues, worker_id, steals) else {
            if queues.is_drained() {
                break;
            }
            continue;
        };
        jobs += 1;

        if job.depth > split_above {
            for (_, child) in legal_children(&job.position) {
                queues.push_local(
                    worker,
                    PerftJob {
                        position: child,
                        depth: job.depth - 1,
                    },
                );
            }
        } else {
            match perft_counted(&job.position, job.depth, ctx) {
                Some(n) => {
                    total.fetch_add(n, Ordering::Relaxed);
                    if let Some(state) = ctx.state {
                        state.add_nodes(n);
                    }
                }
                None => dropped.store(true, Ordering::Relaxed),
            }
        }
        queues.finish();
    }
    jobs
}

pub fn perft_dynamic(
    pos: &Position,
    depth: u8,
    threads: usize,
    split_depth: u8,
) -> ChessResult<u64> {
    let state = SharedSearchState::new();
    let (nodes, _) = run_dynamic(pos, depth, threads, split_depth, &state, None)?;
    Ok(nodes)
}

pub fn perft_with_tt(pos: &Position, depth: u8, threads: usize, tt_mb: usize) -> ChessResult<u64> {
    let threads = ThreadingConfig::new(threads).normalized_threads();
    let tt = SharedTranspositionTable::new_with_mb(tt_mb, threads * 4);
    let state = SharedSearchState::new();
    let split_depth = SearchConfig::default().split_depth;
    let (nodes, _) = run_dynamic(pos, depth, threads, split_depth, &state, Some(&*tt))?;
    let stats = tt.stats();
    debug!(
        "perft tt: {} probes, {} hits, {} stores",
        stats.probes, stats.hits, stats.stores
    );
    Ok(nodes)
}

/// Count under a deadline. Returns the sum over finished subtrees and
/// whether the whole tree was counted.
pub fn perft_timed(
    pos: &Position,
    depth: u8,
    timeout: Duration,
    threads: usize,
) -> ChessResult<(u64, bool)> {
    let state = SharedSearchState::with_timeout(timeout);
    let split_depth = SearchConfig::default().split_depth;
    run_dynamic(pos, depth, threads, split_depth, &state, None)
}

/// Run `mode` with the tunables of `config`.
pub fn run_perft(
    pos: &Position,
    depth: u8,
    mode: PerftMode,
    config: &SearchConfig,
) -> ChessResult<PerftReport> {
    let threads = config.threading.requested_threads;
    info!("perft depth {depth} mode {mode:?} threads {}", config.threading.normalized_threads());
    let start = Instant::now();

    let (nodes, completed) = match mode {
        PerftMode::Sequential => (perft_single_thread(pos, depth), true),
        PerftMode::Parallel => (perft_parallel(pos, depth, threads)?, true),
        PerftMode::Dynamic => (perft_dynamic(pos, depth, threads, config.split_depth)?, true),
        PerftMode::Tt => (perft_with_tt(pos, depth, threads, config.tt_mb)?, true),
        PerftMode::Timed => {
            let state = match config.timeout {
                Some(timeout) => SharedSearchState::with_timeout(timeout),
                None => SharedSearchState::new(),
            };
            run_dynamic(pos, depth, threads, config.split_depth, &state, None)?
        }
    };

    let elapsed = start.elapsed();
    info!("perft depth {depth}: {nodes} nodes in {elapsed:?} (completed={completed})");
    Ok(PerftReport {
        nodes,
        completed,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::variants::builtin_position;
    use crate::move_generation::perft::perft;

    fn start() -> Position {
        builtin_position("Very Small - Open").expect("variant")
    }

    #[test]
    fn all_strategies_agree_with_sequential() {
        let pos = start();
        for depth in 0..=2u8 {
            let expected = perft(&pos, depth);
            assert_eq!(perft_parallel(&pos, depth, 3).expect("parallel"), expected);
            assert_eq!(perft_dynamic(&pos, depth, 3, 0).expect("dynamic"), expected);
            assert_eq!(perft_dynamic(&pos, depth, 2, 1).expect("dynamic"), expected);
            assert_eq!(perft_with_tt(&pos, depth, 2, 4).expect("tt"), expected);
            let (timed, completed) =
                perft_timed(&pos, depth, Duration::from_secs(3600), 2).expect("timed");
            assert!(completed);
            assert_eq!(timed, expected);
        }
    }

    #[test]
    fn counts_do_not_depend_on_thread_count() {
        let pos = start();
        let expected = perft(&pos, 2);
        for threads in [1, 2, 5, 0] {
            assert_eq!(perft_parallel(&pos, 2, threads).expect("parallel"), expected);
            assert_eq!(perft_dynamic(&pos, 2, threads, 1).expect("dynamic"), expected);
        }
    }

    #[test]
    fn zero_timeout_is_incomplete_and_bounded() {
        let pos = start();
        let full = perft(&pos, 2);
        let (partial, completed) = perft_timed(&pos, 2, Duration::ZERO, 2).expect("timed");
        assert!(!completed);
        assert!(partial <= full);
    }

    #[test]
    fn stop_after_last_job_keeps_search_complete() {
        let pos = start();
        let (queues, mut workers) = Queues::with_workers(1);
        let worker = workers.remove(0);
        queues.inject(PerftJob {
            position: pos.clone(),
            depth: 1,
        });
        let state = SharedSearchState::new();
        let ctx = CountContext {
            state: Some(&*state),
            tt: None,
        };
        let total = AtomicU64::new(0);
        let dropped = AtomicBool::new(false);
        let steals = AtomicU64::new(0);
        assert_eq!(worker_loop(0, &worker, &queues, ctx, 1, &total, &dropped, &steals), 1);

        // The deadline fires once every job is accounted for.
        state.request_stop();
        assert_eq!(worker_loop(0, &worker, &queues, ctx, 1, &total, &dropped, &steals), 0);
        assert!(!dropped.load(Ordering::Relaxed));
        assert!(queues.is_drained());
        assert_eq!(total.load(Ordering::Relaxed), perft(&pos, 1));
    }

    #[test]
    fn table_reuse_across_transpositions() {
        let pos = start();
        let tt = SharedTranspositionTable::new_with_mb(4, 2);
        let ctx = CountContext {
            state: None,
            tt: Some(&*tt),
        };
        let first = perft_counted(&pos, 2, ctx).expect("count");
        let second = perft_counted(&pos, 2, ctx).expect("count");
        assert_eq!(first, second);
        assert_eq!(first, perft(&pos, 2));
        assert!(tt.stats().hits >= 1);
    }

    #[test]
    fn mode_names_parse() {
        assert_eq!("tt".parse::<PerftMode>().expect("mode"), PerftMode::Tt);
        assert_eq!("Timed".parse::<PerftMode>().expect("mode"), PerftMode::Timed);
        assert!("fast".parse::<PerftMode>().is_err());
    }

    #[test]
    fn run_perft_reports_completion() {
        let pos = start();
        let config = SearchConfig {
            threading: ThreadingConfig::new(2),
            ..SearchConfig::default()
        };
        let report = run_perft(&pos, 1, PerftMode::Dynamic, &config).expect("perft");
        assert!(report.completed);
        assert_eq!(report.nodes, perft(&pos, 1));
    }
}
