/*
This file is part of jxl-toolkit.

jxl-toolkit is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

jxl-toolkit is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with jxl-toolkit.  If not, see <https://www.gnu.org/licenses/>.
*/

//! Thread pool runner backed by rayon-core

use super::ParallelRunner;

/// A [`ParallelRunner`] over a dedicated rayon-core thread pool.
pub struct ThreadsRunner {
    pool: rayon_core::ThreadPool,
}

impl ThreadsRunner {
    /// Construct with a number of worker threads; `None` picks the available
    /// parallelism of the host.
    ///
    /// Returns `None` when the pool cannot be created.
    #[must_use]
    pub fn new(num_workers: Option<usize>) -> Option<Self> {
        let num_threads = match num_workers {
            Some(n) => n,
            None => match std::thread::available_parallelism() {
                Ok(n) => n.into(),
                Err(e) => {
                    tracing::warn!(%e, "Failed to query available parallelism");
                    return None;
                }
            },
        };

        rayon_core::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| tracing::warn!(%e, "Failed to initialize thread pool"))
            .ok()
            .map(|pool| Self { pool })
    }
}

impl Default for ThreadsRunner {
    /// A pool sized to the available parallelism; single worker when that
    /// cannot be determined.
    fn default() -> Self {
        Self::new(None)
            .or_else(|| Self::new(Some(1)))
            .expect("single-threaded pool creation cannot fail")
    }
}

impl ParallelRunner for ThreadsRunner {
    fn run(&self, num_tasks: u32, op: &(dyn Fn(u32) + Send + Sync)) {
        self.pool.scope(|scope| {
            for task in 0..num_tasks {
                scope.spawn(move |_| op(task));
            }
        });
    }

    fn num_worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_construction() {
        let runner = ThreadsRunner::new(Some(2)).unwrap();
        assert_eq!(runner.num_worker_threads(), 2);

        ThreadsRunner::default();
    }

    #[test]
    fn runs_every_task() {
        let runner = ThreadsRunner::new(Some(4)).unwrap();
        let sum = AtomicU32::new(0);
        runner.run(100, &|i| {
            sum.fetch_add(i, Ordering::Relaxed);
        });
        assert_eq!(sum.into_inner(), 99 * 100 / 2);
    }
}
