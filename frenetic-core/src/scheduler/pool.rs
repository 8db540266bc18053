// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Background pool for async tasks
//!
//! With the `parallel` feature, jobs run on a Rayon thread pool (a dedicated
//! one when a thread count is configured, the global one otherwise). Without
//! it, each job gets its own OS thread.

use crate::error::EngineError;

#[cfg(feature = "parallel")]
use rayon::ThreadPool;
#[cfg(feature = "parallel")]
use std::sync::Arc;

/// Handle to the pool that executes async task bodies
#[derive(Clone)]
pub(crate) struct TaskPool {
    #[cfg(feature = "parallel")]
    pool: Option<Arc<ThreadPool>>,
}

impl TaskPool {
    /// Use the default pool
    pub(crate) fn shared() -> Self {
        TaskPool {
            #[cfg(feature = "parallel")]
            pool: None,
        }
    }

    /// Build a dedicated pool with `threads` workers
    ///
    /// Without the `parallel` feature the count is ignored.
    #[cfg(feature = "parallel")]
    pub(crate) fn with_threads(threads: usize) -> Result<Self, EngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("frenetic-async-{}", i))
            .build()
            .map_err(|e| EngineError::Config(format!("failed to build async task pool: {}", e)))?;
        Ok(TaskPool {
            pool: Some(Arc::new(pool)),
        })
    }

    #[cfg(not(feature = "parallel"))]
    /// Build a pool (thread-per-job fallback when parallel feature disabled)
    pub(crate) fn with_threads(_threads: usize) -> Result<Self, EngineError> {
        Ok(Self::shared())
    }

    /// Number of worker threads backing this pool
    #[cfg(feature = "parallel")]
    pub(crate) fn thread_count(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    #[cfg(not(feature = "parallel"))]
    pub(crate) fn thread_count(&self) -> usize {
        1
    }

    /// Run `job` in the background
    #[cfg(feature = "parallel")]
    pub(crate) fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.pool {
            Some(pool) => pool.spawn(job),
            None => rayon::spawn(job),
        }
    }

    #[cfg(not(feature = "parallel"))]
    pub(crate) fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(e) = std::thread::Builder::new()
            .name("frenetic-async".to_string())
            .spawn(job)
        {
            log::error!("Failed to spawn async task thread: {}", e);
        }
    }
}
