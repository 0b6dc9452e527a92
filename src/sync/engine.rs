//! Pull/push orchestration over a [`ResourceAdapter`].

use crate::error::{Result, SyncError};
use crate::resource::ResourceAdapter;
use crate::sync::diff::prune_candidates;
use crate::sync::local::{
    collect_local_files, list_local_handles, remove_with_sidecar, resource_path, write_sidecar,
    LocalFile,
};
use crate::sync::plan::{DryRunPlanner, SyncDirection, SyncPlan};
use crate::sync::retry::{with_retry, RetryPolicy};
use crate::sync::{BatchResult, SyncReport};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    /// Root output directory; files land in `<output>/<resource_name>/`
    pub output: PathBuf,
    /// Only pull the first N listed resources
    pub max_items: Option<usize>,
    pub dry_run: bool,
    /// Delete local files that no longer exist remotely
    pub mirror: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Root input directory; files are read from `<input>/<resource_name>/`
    pub input: PathBuf,
    pub dry_run: bool,
    /// Delete remote resources that have no local file
    pub mirror: bool,
}

/// Sequential sync engine for a single resource type.
pub struct SyncEngine<A> {
    adapter: A,
    retry: RetryPolicy,
    show_progress: bool,
}

impl<A: ResourceAdapter> SyncEngine<A> {
    pub fn new(adapter: A, retry: RetryPolicy) -> Self {
        Self {
            adapter,
            retry,
            show_progress: false,
        }
    }

    /// Show an indicatif progress bar while executing
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Remote -> local.
    pub async fn pull(&self, options: &PullOptions) -> Result<SyncReport> {
        let start = Instant::now();
        let adapter = &self.adapter;
        let name = adapter.resource_name();
        let layout = adapter.layout();
        let ext = adapter.file_extension();
        let dir = options.output.join(name);

        // 1. Remote state, needed even for a dry run
        info!("Fetching remote {}", name);
        let mut remote = adapter.list_remote().await?;
        debug!("Listed {} remote {}", remote.len(), name);

        // 2. Cap
        if let Some(max) = options.max_items {
            if remote.len() > max {
                info!("Limiting pull to the first {} of {} {}", max, remote.len(), name);
                remote.truncate(max);
                if options.mirror {
                    warn!("--mirror with a limit deletes local {} beyond the limit", name);
                }
            }
        }
        let remote_handles: Vec<String> = remote.iter().map(|r| adapter.handle_of(r)).collect();

        // 3. Local prune candidates
        let stale: Vec<(String, PathBuf)> = if options.mirror {
            let local = list_local_handles(&dir, layout, ext)?;
            prune_candidates(&remote_handles, &local, |(handle, _)| handle.clone())
                .into_iter()
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        // 4. Plan and gate
        let mut plan = SyncPlan::new(name, SyncDirection::Pull);
        plan.transfer = remote_handles.clone();
        plan.delete = stale.iter().map(|(handle, _)| handle.clone()).collect();

        let planner = DryRunPlanner::new(options.dry_run);
        planner.log_summary(&plan);
        if !planner.should_execute() {
            return Ok(preview_report(plan, start));
        }

        // 5. Output tree
        std::fs::create_dir_all(&dir).map_err(|e| SyncError::io(&dir, e))?;

        let progress = self.progress_bar(plan.transfer.len() + plan.delete.len());

        // 6. Local deletions (local I/O, not retried)
        let mut deleted = BatchResult::new();
        for (handle, path) in &stale {
            progress.set_message(format!("delete {}", handle));
            match remove_with_sidecar(path) {
                Ok(()) => {
                    debug!("Deleted local {}", path.display());
                    deleted.record_success();
                }
                Err(e) => {
                    warn!("Failed to delete local {}: {}", handle, e);
                    deleted.record_failure(format!("{}: {}", handle, e));
                }
            }
            progress.inc(1);
        }

        // 7. Downloads, one unit per resource; only transient errors are retried
        let mut transferred = BatchResult::new();
        for (resource, handle) in remote.iter().zip(&remote_handles) {
            progress.set_message(handle.clone());
            let handle = handle.as_str();
            let dir = dir.as_path();
            let outcome = retry_unit(&self.retry, || async move {
                let path = resource_path(dir, layout, handle, ext)?;
                adapter.download_one(resource, dir).await?;
                write_sidecar(&path, &adapter.extract_metadata(resource))
            })
            .await;
            record(&mut transferred, handle, "download", outcome);
            progress.inc(1);
        }
        progress.finish_and_clear();

        // 8. Report
        let report = SyncReport {
            plan,
            dry_run: false,
            transferred,
            deleted,
            duration: start.elapsed(),
        };
        info!(
            "Pulled {}: {} downloaded, {} deleted, {} failed",
            name,
            report.transferred.processed,
            report.deleted.processed,
            report.failed()
        );
        Ok(report)
    }

    /// Local -> remote.
    pub async fn push(&self, options: &PushOptions) -> Result<SyncReport> {
        let start = Instant::now();
        let adapter = &self.adapter;
        let name = adapter.resource_name();
        let dir = options.input.join(name);

        // 1. Local files are the source of truth
        let local: Vec<LocalFile<A::Metadata>> =
            collect_local_files(&dir, adapter.layout(), adapter.file_extension())?;
        debug!("Found {} local {} in {}", local.len(), name, dir.display());

        // 2. Remote state
        info!("Fetching remote {}", name);
        let remote = adapter.list_remote().await?;

        // 3. Remote prune candidates
        let stale: Vec<&A::Resource> = if options.mirror {
            prune_candidates(local.iter().map(|f| f.handle.as_str()), &remote, |r| {
                adapter.handle_of(r)
            })
        } else {
            Vec::new()
        };

        // 4. Plan and gate
        let mut plan = SyncPlan::new(name, SyncDirection::Push);
        plan.transfer = local.iter().map(|f| f.handle.clone()).collect();
        plan.delete = stale.iter().map(|r| adapter.handle_of(r)).collect();

        let planner = DryRunPlanner::new(options.dry_run);
        planner.log_summary(&plan);
        if !planner.should_execute() {
            return Ok(preview_report(plan, start));
        }

        let progress = self.progress_bar(plan.transfer.len() + plan.delete.len());

        // 5. Remote deletions strictly before uploads
        let mut deleted = BatchResult::new();
        for (resource, handle) in stale.iter().zip(&plan.delete) {
            progress.set_message(format!("delete {}", handle));
            let resource: &A::Resource = resource;
            let handle = handle.as_str();
            let outcome = retry_unit(&self.retry, || async move {
                match adapter.delete_one(resource).await {
                    Err(e) if e.is_not_found() => {
                        debug!("Remote {} already absent", handle);
                        Ok(())
                    }
                    other => other,
                }
            })
            .await;
            record(&mut deleted, handle, "delete", outcome);
            progress.inc(1);
        }

        // 6. Uploads, one retried unit per file
        let mut transferred = BatchResult::new();
        for file in &local {
            progress.set_message(file.handle.clone());
            let outcome = retry_unit(&self.retry, || adapter.upload_one(file)).await;
            record(&mut transferred, &file.handle, "upload", outcome);
            progress.inc(1);
        }
        progress.finish_and_clear();

        // 7. Report
        let report = SyncReport {
            plan,
            dry_run: false,
            transferred,
            deleted,
            duration: start.elapsed(),
        };
        info!(
            "Pushed {}: {} uploaded, {} deleted, {} failed",
            name,
            report.transferred.processed,
            report.deleted.processed,
            report.failed()
        );
        Ok(report)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar
    }
}

/// Run one per-item unit under `policy`, retrying transient errors only.
///
/// Permanent errors are smuggled out as `Ok(Err(_))` so the policy stops
/// after the first attempt. A `Retry-After` hint longer than the policy's
/// own backoff is waited out in full before the next attempt.
async fn retry_unit<F, Fut>(policy: &RetryPolicy, mut unit: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut attempt = 0u32;
    let outcome = with_retry(policy, || {
        attempt += 1;
        let current = attempt;
        let fut = unit();
        async move {
            match fut.await {
                Ok(()) => Ok(Ok(())),
                Err(e) if !e.is_transient() => Ok(Err(e)),
                Err(e) => {
                    if let Some(wait) = e.retry_after() {
                        let extra = wait.saturating_sub(policy.delay_after(current));
                        if current < policy.max_attempts() && !extra.is_zero() {
                            debug!("Remote asked to wait {:?} before retrying", wait);
                            tokio::time::sleep(extra).await;
                        }
                    }
                    Err(e)
                }
            }
        }
    })
    .await;
    outcome.and_then(|unit_result| unit_result)
}

fn record(batch: &mut BatchResult, handle: &str, action: &str, outcome: Result<()>) {
    match outcome {
        Ok(()) => batch.record_success(),
        Err(e) => {
            warn!("Failed to {} {}: {}", action, handle, e);
            batch.record_failure(format!("{}: {}", handle, e));
        }
    }
}

fn preview_report(plan: SyncPlan, start: Instant) -> SyncReport {
    SyncReport {
        plan,
        dry_run: true,
        transferred: BatchResult::new(),
        deleted: BatchResult::new(),
        duration: start.elapsed(),
    }
}
