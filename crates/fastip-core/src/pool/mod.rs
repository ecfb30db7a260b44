//! Bounded-concurrency worker pool
//!
//! Runs one task per candidate, admitting at most `concurrency_limit` tasks
//! at a time.
//!
//! ## Admission
//!
//! ```text
//! candidates ──► launcher ──acquire──► Semaphore(limit)
//!                   │                      ▲
//!                   ▼                      │ permit dropped
//!              JoinSet::spawn ─── task ────┘ when the task ends
//! ```
//!
//! The launcher blocks on the semaphore when the pool is saturated. Each
//! spawned task owns its permit as a [`Slot`], so the slot is returned when
//! the task finishes or panics. Tasks started through
//! [`WorkerPool::run_with_slots`] may hand the slot back earlier, once the
//! bounded part of their work is done. Blank entries are skipped before a
//! permit is requested.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::traits::Candidate;

/// What a pool run produced
#[derive(Debug)]
pub struct PoolReport<T> {
    /// Task outputs, in completion order
    pub results: Vec<T>,
    /// Number of tasks launched
    pub launched: usize,
    /// Number of blank entries skipped
    pub skipped: usize,
    /// Number of tasks that panicked
    pub panicked: usize,
}

/// Admission slot owned by one running task
#[derive(Debug)]
pub struct Slot(OwnedSemaphorePermit);

impl Slot {
    /// Let the launcher admit the next task now
    pub fn release(self) {
        drop(self.0);
    }
}

/// Semaphore-gated task spawner
#[derive(Debug, Clone)]
pub struct WorkerPool {
    concurrency_limit: usize,
}

impl WorkerPool {
    /// Create a pool admitting at most `concurrency_limit` tasks at once
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `concurrency_limit` is zero.
    pub fn new(concurrency_limit: usize) -> Result<Self> {
        if concurrency_limit == 0 {
            return Err(Error::config("Concurrency limit must be > 0"));
        }
        Ok(Self { concurrency_limit })
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Run `probe_fn` once per non-blank candidate and wait for all of them
    ///
    /// Each task keeps its slot until it ends. There is no partial-result
    /// path: this returns only after every launched task has completed.
    pub async fn run<I, S, F, Fut, T>(&self, candidates: I, mut probe_fn: F) -> PoolReport<T>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(Candidate) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.run_with_slots(candidates, move |candidate, slot| {
            let task = probe_fn(candidate);
            async move {
                let _slot = slot;
                task.await
            }
        })
        .await
    }

    /// Like [`WorkerPool::run`], but each task receives its [`Slot`]
    ///
    /// A task that calls [`Slot::release`] stops counting against the limit
    /// for the rest of its work.
    pub async fn run_with_slots<I, S, F, Fut, T>(
        &self,
        candidates: I,
        mut task_fn: F,
    ) -> PoolReport<T>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(Candidate, Slot) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let gate = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut set = JoinSet::new();
        let mut launched = 0;
        let mut skipped = 0;

        for raw in candidates {
            let Some(candidate) = Candidate::parse(raw.as_ref()) else {
                skipped += 1;
                continue;
            };

            // The semaphore is never closed, so acquisition only fails if that changes.
            let permit = match Arc::clone(&gate).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("Admission gate closed, stopping launches: {}", e);
                    break;
                }
            };

            debug!("Launching probe for {}", candidate);
            set.spawn(task_fn(candidate, Slot(permit)));
            launched += 1;
        }

        let mut results = Vec::with_capacity(launched);
        let mut panicked = 0;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(value) => results.push(value),
                Err(e) => {
                    error!("Probe task failed: {}", e);
                    panicked += 1;
                }
            }
        }

        PoolReport {
            results,
            launched,
            skipped,
            panicked,
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self {
            concurrency_limit: crate::config::default_concurrency(),
        }
    }
}
