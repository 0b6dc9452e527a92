//! Sync plans and the dry-run gate.
//!
//! A plan is computed once, before any mutation, and drives both the preview
//! and the real run so the two cannot diverge.

use std::fmt;

/// Sync direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Remote -> local
    Pull,
    /// Local -> remote
    Push,
}

impl SyncDirection {
    /// Verb for the transfer phase
    pub fn transfer_verb(&self) -> &'static str {
        match self {
            SyncDirection::Pull => "download",
            SyncDirection::Push => "upload",
        }
    }

    /// Which side mirror deletions happen on
    pub fn delete_side(&self) -> &'static str {
        match self {
            SyncDirection::Pull => "local",
            SyncDirection::Push => "remote",
        }
    }
}

/// Items to transfer and items to delete, by handle, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub resource: String,
    pub direction: SyncDirection,
    pub transfer: Vec<String>,
    pub delete: Vec<String>,
}

impl SyncPlan {
    pub fn new(resource: impl Into<String>, direction: SyncDirection) -> Self {
        Self {
            resource: resource.into(),
            direction,
            transfer: Vec::new(),
            delete: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transfer.is_empty() && self.delete.is_empty()
    }
}

impl fmt::Display for SyncPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} to {}, {} to delete",
            self.resource,
            self.transfer.len(),
            self.direction.transfer_verb(),
            self.delete.len()
        )
    }
}

/// Decides whether a computed plan is executed or only previewed.
#[derive(Debug, Clone, Copy)]
pub struct DryRunPlanner {
    dry_run: bool,
}

impl DryRunPlanner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Deterministic preview lines, identical in both modes apart from the prefix.
    pub fn summary_lines(&self, plan: &SyncPlan) -> Vec<String> {
        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        let mut lines = Vec::with_capacity(plan.delete.len() + 1);
        lines.push(format!("{}{}", prefix, plan));
        for handle in &plan.delete {
            lines.push(format!(
                "{}  delete {} {}",
                prefix,
                plan.direction.delete_side(),
                handle
            ));
        }
        lines
    }

    pub fn log_summary(&self, plan: &SyncPlan) {
        for line in self.summary_lines(plan) {
            tracing::info!("{}", line);
        }
    }

    /// False for dry runs. Check once, after planning and before any side effect.
    pub fn should_execute(&self) -> bool {
        !self.dry_run
    }
}
