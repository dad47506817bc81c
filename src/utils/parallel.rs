#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use std::sync::mpsc;

use crate::error::Result;

/// Number of workers to run: the requested count, or the host's available parallelism.
pub fn worker_count(requested: Option<usize>) -> usize {
    requested.filter(|&n| n > 0).unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

/// Bounded pool that evaluates tasks off the calling thread.
///
/// Without the `parallel` feature, or on wasm, tasks run inline on the calling thread with the
/// same contract.
pub struct WorkerPool {
    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
        {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("crossing-worker-{}", i))
                .build()?;
            Ok(Self { pool, workers })
        }
        #[cfg(any(not(feature = "parallel"), target_arch = "wasm32"))]
        {
            log::debug!("Parallel evaluation unavailable; ignoring {} requested workers", workers);
            Ok(Self { workers: 1 })
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `task` once per item and hands every output to `collect` on the calling thread.
    ///
    /// Outputs arrive in completion order, not item order. Returns once every task has finished
    /// and been collected.
    pub fn fan_out<T, O, F, C>(&self, items: &[T], task: F, mut collect: C)
    where
        T: Sync,
        O: Send,
        F: Fn(&T) -> O + Sync,
        C: FnMut(O),
    {
        #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
        {
            let task = &task;
            self.pool.in_place_scope(|scope| {
                let (tx, rx) = mpsc::channel();
                for item in items {
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        let _ = tx.send(task(item));
                    });
                }
                drop(tx);
                for output in rx {
                    collect(output);
                }
            });
        }
        #[cfg(any(not(feature = "parallel"), target_arch = "wasm32"))]
        {
            items.iter().map(task).for_each(collect);
        }
    }
}
