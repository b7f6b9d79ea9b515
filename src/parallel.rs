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

//! Parallel runner interface
//!
//! The codec session is the only place parallelism enters the toolkit: a
//! runner handed to the session parallelises pixel decoding within a single
//! frame. The facade itself stays single-threaded.
//!
//! # Example
//! ```no_run
//! # #[cfg(feature = "threads")]
//! # {
//! use std::sync::Arc;
//! use jxl_toolkit::ThreadsRunner;
//!
//! let runner = Arc::new(ThreadsRunner::default());
//! # }
//! ```

#[cfg(feature = "threads")]
pub mod threads_runner;

/// A worker pool the codec session may use to decode pixels of one frame in
/// parallel.
pub trait ParallelRunner: Send + Sync {
    /// Run `op` for every task index in `0..num_tasks`, possibly concurrently.
    /// Returns when every task has finished.
    fn run(&self, num_tasks: u32, op: &(dyn Fn(u32) + Send + Sync));

    /// Number of worker threads backing this runner.
    fn num_worker_threads(&self) -> usize;
}
