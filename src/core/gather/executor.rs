//! Relocation Executor
//!
//! Carries out the planner's intent: copies source files into the target
//! child directory and commits the rewritten reference paths back to the
//! document. File copies for independent source files may run in parallel on
//! a bounded blocking-worker pool; every document commit happens on the
//! single controlling task, because the document collaborator is not assumed
//! safe for concurrent mutation.
//!
//! One item's failure never aborts the batch. The unit of atomicity is a
//! single plan's copy + rewrite: an interrupted run leaves every
//! already-rewritten reference pointing at a file that exists, so a re-run
//! resolves the remainder.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

use crate::core::document::ProjectDocument;
use crate::core::gather::planner::{PlanAction, RelocationPlan};
use crate::core::gather::report::{ItemReport, Outcome};
use crate::core::{fs, GatherError, GatherResult};

// =============================================================================
// Options
// =============================================================================

/// Execution tuning for a gather run
#[derive(Clone, Debug)]
pub struct GatherOptions {
    /// Upper bound on file copies in flight at once. Document commits are
    /// always serialized regardless of this value.
    pub max_concurrent_copies: usize,
}

impl Default for GatherOptions {
    fn default() -> Self {
        Self {
            max_concurrent_copies: num_cpus::get().max(2),
        }
    }
}

// =============================================================================
// Execution
// =============================================================================

struct CopyJob {
    identity: PathBuf,
    source: PathBuf,
    destination: PathBuf,
}

/// Executes a set of plans against the filesystem and the document.
///
/// Returns one [`ItemReport`] per plan, in plan order. Only infrastructure
/// failures (target directory creation, a panicked worker) are fatal;
/// per-item copy and commit failures are recorded and the batch continues.
pub async fn execute(
    plans: Vec<RelocationPlan>,
    document: &mut dyn ProjectDocument,
    base_dir: &Path,
    target_dir_name: &str,
    options: &GatherOptions,
) -> GatherResult<Vec<ItemReport>> {
    let jobs = collect_copy_jobs(&plans, base_dir);

    // The target child directory is created once per run, before any worker
    // starts, so concurrent copies never race on it.
    if !jobs.is_empty() {
        fs::ensure_dir(&base_dir.join(target_dir_name))?;
    }

    let copy_results = run_copies(jobs, options).await?;

    // Rewrites are serialized on this task.
    let mut items = Vec::with_capacity(plans.len());
    for plan in plans {
        items.push(finish_plan(&plan, document, &copy_results));
    }
    Ok(items)
}

/// One copy per distinct source identity; references sharing a file share
/// its copy.
fn collect_copy_jobs(plans: &[RelocationPlan], base_dir: &Path) -> Vec<CopyJob> {
    let mut seen: std::collections::HashSet<PathBuf> = std::collections::HashSet::new();
    let mut jobs = Vec::new();
    for plan in plans {
        if plan.action == PlanAction::AlreadyInPlace {
            continue;
        }
        if seen.insert(plan.source.identity.clone()) {
            jobs.push(CopyJob {
                identity: plan.source.identity.clone(),
                source: plan.source.absolute_path.clone(),
                destination: base_dir.join(&plan.destination),
            });
        }
    }
    jobs
}

/// Runs copy jobs on blocking workers, bounded by the options' limit.
async fn run_copies(
    jobs: Vec<CopyJob>,
    options: &GatherOptions,
) -> GatherResult<HashMap<PathBuf, Result<bool, String>>> {
    let semaphore = Arc::new(Semaphore::new(options.max_concurrent_copies.max(1)));
    let mut handles = Vec::with_capacity(jobs.len());

    for job in jobs {
        let semaphore = Arc::clone(&semaphore);
        handles.push(tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return (
                        job.identity,
                        Err("copy worker pool closed".to_string()),
                    )
                }
            };

            debug!(
                src = %job.source.display(),
                dest = %job.destination.display(),
                "copying resource"
            );

            let source = job.source.clone();
            let destination = job.destination.clone();
            let result =
                tokio::task::spawn_blocking(move || fs::copy_if_stale(&source, &destination))
                    .await;

            let result = match result {
                Ok(Ok(copied)) => Ok(copied),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("copy task aborted: {e}")),
            };
            (job.identity, result)
        }));
    }

    let mut results = HashMap::new();
    for handle in handles {
        let (identity, result) = handle
            .await
            .map_err(|e| GatherError::Internal(format!("copy worker join failed: {e}")))?;
        results.insert(identity, result);
    }
    Ok(results)
}

/// Applies the rewrite for one plan and produces its report entry.
fn finish_plan(
    plan: &RelocationPlan,
    document: &mut dyn ProjectDocument,
    copy_results: &HashMap<PathBuf, Result<bool, String>>,
) -> ItemReport {
    let copy_result = match plan.action {
        PlanAction::AlreadyInPlace => Ok(()),
        _ => match copy_results.get(&plan.source.identity) {
            Some(Ok(_)) => Ok(()),
            Some(Err(reason)) => Err(format!("copy failed: {reason}")),
            None => Err("copy result missing for source file".to_string()),
        },
    };

    if let Err(reason) = copy_result {
        return failed_item(plan, reason);
    }

    // The copy (if any) succeeded; a rejected commit leaves the file at the
    // destination on purpose, so a re-run only needs to repeat the rewrite.
    match document.commit_path(&plan.reference.id, &plan.destination) {
        Ok(()) => ItemReport {
            reference_id: plan.reference.id.clone(),
            current_path: plan.reference.current_path.clone(),
            destination: Some(plan.destination.clone()),
            outcome: match plan.action {
                PlanAction::AlreadyInPlace => Outcome::SkippedInPlace,
                _ => Outcome::Copied,
            },
            reason: None,
        },
        Err(e) => failed_item(plan, format!("commit rejected: {e}")),
    }
}

fn failed_item(plan: &RelocationPlan, reason: String) -> ItemReport {
    ItemReport {
        reference_id: plan.reference.id.clone(),
        current_path: plan.reference.current_path.clone(),
        destination: Some(plan.destination.clone()),
        outcome: Outcome::Failed,
        reason: Some(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::{MemoryDocument, ResourceReference};
    use crate::core::gather::planner::plan_relocations;
    use crate::core::ResourceKind;
    use tempfile::TempDir;

    fn setup_base(dir: &TempDir) -> std::path::PathBuf {
        let base = dir.path().join("proj");
        std::fs::create_dir_all(base.join("images")).unwrap();
        std::fs::write(base.join("images/tex.png"), b"pixels").unwrap();
        std::fs::canonicalize(&base).unwrap()
    }

    #[tokio::test]
    async fn test_execute_copies_and_commits() {
        let dir = TempDir::new().unwrap();
        let base = setup_base(&dir);

        let mut doc = MemoryDocument::new();
        let id = doc.insert(ResourceReference::new(ResourceKind::Image, "images/tex.png"));
        let refs = doc.enumerate_external_references().unwrap();
        let set = plan_relocations(refs, &base, "textures").unwrap();

        let items = execute(
            set.plans,
            &mut doc,
            &base,
            "textures",
            &GatherOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].outcome, Outcome::Copied);
        assert!(base.join("textures/tex.png").is_file());
        // Source untouched, reference rewritten
        assert!(base.join("images/tex.png").is_file());
        assert_eq!(doc.get(&id).unwrap().current_path, "textures/tex.png");
    }

    #[tokio::test]
    async fn test_execute_already_in_place_skips_copy() {
        let dir = TempDir::new().unwrap();
        let base = setup_base(&dir);
        std::fs::create_dir_all(base.join("textures")).unwrap();
        std::fs::write(base.join("textures/done.png"), b"gathered").unwrap();

        let mut doc = MemoryDocument::new();
        let abs = base.join("textures/done.png").to_string_lossy().to_string();
        let id = doc.insert(ResourceReference::new(ResourceKind::Image, abs));
        let refs = doc.enumerate_external_references().unwrap();
        let set = plan_relocations(refs, &base, "textures").unwrap();

        let items = execute(
            set.plans,
            &mut doc,
            &base,
            "textures",
            &GatherOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(items[0].outcome, Outcome::SkippedInPlace);
        // Stored path normalized to relative form even though nothing was copied
        assert_eq!(doc.get(&id).unwrap().current_path, "textures/done.png");
    }

    #[tokio::test]
    async fn test_execute_with_single_worker() {
        let dir = TempDir::new().unwrap();
        let base = setup_base(&dir);
        std::fs::write(base.join("images/more.png"), b"more").unwrap();

        let mut doc = MemoryDocument::new();
        doc.insert(ResourceReference::new(ResourceKind::Image, "images/tex.png"));
        doc.insert(ResourceReference::new(ResourceKind::Image, "images/more.png"));
        let refs = doc.enumerate_external_references().unwrap();
        let set = plan_relocations(refs, &base, "textures").unwrap();

        let options = GatherOptions {
            max_concurrent_copies: 1,
        };
        let items = execute(set.plans, &mut doc, &base, "textures", &options)
            .await
            .unwrap();

        assert!(items.iter().all(|i| i.outcome == Outcome::Copied));
        assert!(base.join("textures/tex.png").is_file());
        assert!(base.join("textures/more.png").is_file());
    }
}
