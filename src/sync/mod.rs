//! Generic resource synchronization.
//!
//! # Architecture
//!
//! ```text
//! pull:  list remote -> cap -> [scan local + diff] -> plan -> gate
//!        -> mkdir -> delete local -> download (retried, per item) -> report
//!
//! push:  scan local -> list remote -> [diff] -> plan -> gate
//!        -> delete remote (retried) -> upload (retried, per item) -> report
//! ```
//!
//! Everything runs sequentially. Per-item failures are recorded in a
//! [`BatchResult`] and never abort the batch.

pub mod diff;
pub mod engine;
pub mod local;
pub mod plan;
pub mod retry;

pub use diff::prune_candidates;
pub use engine::{PullOptions, PushOptions, SyncEngine};
pub use local::{collect_local_files, Layout, LocalFile};
pub use plan::{DryRunPlanner, SyncDirection, SyncPlan};
pub use retry::{with_retry, RetryPolicy};

use std::time::Duration;

/// Outcome of one phase (transfer or delete) of a sync.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// Items that reached `Succeeded`
    pub processed: usize,

    /// Items that reached `Failed`
    pub failed: usize,

    /// One message per failed item, in execution order
    pub errors: Vec<String>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.processed += 1;
    }

    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(message.into());
    }

    pub fn total(&self) -> usize {
        self.processed + self.failed
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Result of a full pull or push invocation.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub plan: SyncPlan,

    /// True when the plan was only previewed
    pub dry_run: bool,

    /// Downloads (pull) or uploads (push)
    pub transferred: BatchResult,

    /// Mirror deletions
    pub deleted: BatchResult,

    pub duration: Duration,
}

impl SyncReport {
    pub fn direction(&self) -> SyncDirection {
        self.plan.direction
    }

    pub fn failed(&self) -> usize {
        self.transferred.failed + self.deleted.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// All per-item error messages, deletions first (execution order for push)
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.deleted
            .errors
            .iter()
            .chain(self.transferred.errors.iter())
            .map(String::as_str)
    }
}
