//! Resource Gathering Engine
//!
//! The single operation this crate exposes: enumerate a project's external
//! resource references, plan their relocation into a target child directory,
//! copy the files, and rewrite each reference to a project-relative path.
//! The pipeline runs strictly enumerate -> plan -> execute; fatal errors
//! unwind out of [`gather`], per-item failures accumulate into the
//! [`RunReport`].

pub mod executor;
pub mod planner;
pub mod report;

pub use executor::GatherOptions;
pub use report::{ItemReport, Outcome, RunReport};

use std::path::Path;

use tracing::info;

use crate::core::document::ProjectDocument;
use crate::core::{GatherError, GatherResult};

/// Gathers all external resources into `<base_dir>/<target_dir_name>` using
/// default options.
pub async fn gather(
    document: &mut dyn ProjectDocument,
    base_dir: &Path,
    target_dir_name: &str,
) -> GatherResult<RunReport> {
    gather_with(document, base_dir, target_dir_name, &GatherOptions::default()).await
}

/// Gathers all external resources into `<base_dir>/<target_dir_name>`.
///
/// Idempotent: a second run over an unchanged project copies nothing and
/// reports every previously gathered reference as already in place. Sources
/// are never deleted or modified; cleanup of originals is an explicit,
/// separate concern outside this engine.
pub async fn gather_with(
    document: &mut dyn ProjectDocument,
    base_dir: &Path,
    target_dir_name: &str,
    options: &GatherOptions,
) -> GatherResult<RunReport> {
    let started_at = chrono::Utc::now().to_rfc3339();

    let base_dir = std::fs::canonicalize(base_dir)
        .map_err(|_| GatherError::ProjectDirNotFound(base_dir.display().to_string()))?;

    info!(
        base = %base_dir.display(),
        target = target_dir_name,
        "starting resource gather"
    );

    let references = document.enumerate_external_references()?;
    let references: Vec<_> = references.into_iter().filter(|r| !r.is_packed).collect();

    let plan_set = planner::plan_relocations(references, &base_dir, target_dir_name)?;

    let mut items =
        executor::execute(plan_set.plans, document, &base_dir, target_dir_name, options).await?;

    // Broken links never reached the executor; they still belong in the report.
    for unresolved in plan_set.unresolved {
        items.push(ItemReport {
            reference_id: unresolved.reference.id,
            current_path: unresolved.reference.current_path,
            destination: None,
            outcome: Outcome::Failed,
            reason: Some(unresolved.reason),
        });
    }

    let report = RunReport::tally(items, started_at);
    info!(
        attempted = report.attempted,
        copied = report.copied,
        skipped = report.skipped,
        failed = report.failed,
        "resource gather complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::{MemoryDocument, ResourceReference};
    use crate::core::ResourceKind;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Lays out the reference scenario: a local texture, an external file
    /// colliding on filename, and a broken link.
    ///
    /// ```text
    /// <tmp>/proj/images/tex.png      (exists)
    /// <tmp>/shared/tex.png           (exists, different content, same name)
    /// <tmp>/proj/images/missing.png  (does not exist)
    /// ```
    fn scenario(dir: &TempDir) -> (PathBuf, MemoryDocument, [String; 3]) {
        let base = dir.path().join("proj");
        std::fs::create_dir_all(base.join("images")).unwrap();
        std::fs::create_dir_all(dir.path().join("shared")).unwrap();
        std::fs::write(base.join("images/tex.png"), b"local pixels").unwrap();
        std::fs::write(dir.path().join("shared/tex.png"), b"shared pixels").unwrap();

        let mut doc = MemoryDocument::new();
        let a = doc.insert(ResourceReference::new(ResourceKind::Image, "images/tex.png"));
        let b = doc.insert(ResourceReference::new(
            ResourceKind::Image,
            "../shared/tex.png",
        ));
        let c = doc.insert(ResourceReference::new(
            ResourceKind::Image,
            "images/missing.png",
        ));
        (base, doc, [a, b, c])
    }

    #[tokio::test]
    async fn test_gather_collision_and_missing_scenario() {
        let dir = TempDir::new().unwrap();
        let (base, mut doc, [a, b, c]) = scenario(&dir);

        let report = gather(&mut doc, &base, "textures").await.unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.copied, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.failed, 1);

        // A keeps the plain name
        assert_eq!(doc.get(&a).unwrap().current_path, "textures/tex.png");
        assert_eq!(
            std::fs::read(base.join("textures/tex.png")).unwrap(),
            b"local pixels"
        );

        // B is renamed, not silently overwritten onto A's destination
        let b_path = doc.get(&b).unwrap().current_path.clone();
        assert!(b_path.starts_with("textures/tex_"));
        assert!(b_path.ends_with(".png"));
        assert_eq!(std::fs::read(base.join(&b_path)).unwrap(), b"shared pixels");

        // C is reported, untouched
        assert_eq!(doc.get(&c).unwrap().current_path, "images/missing.png");
        let c_item = report.items.iter().find(|i| i.reference_id == c).unwrap();
        assert_eq!(c_item.outcome, Outcome::Failed);
        assert_eq!(c_item.reason.as_deref(), Some("source file missing"));

        // Non-destructive: originals still exist
        assert!(base.join("images/tex.png").is_file());
        assert!(dir.path().join("shared/tex.png").is_file());
    }

    #[tokio::test]
    async fn test_gather_preserves_inplace_file_on_name_collision() {
        // An external file colliding with one already inside the target
        // directory must rename, whichever is enumerated first: the in-place
        // file keeps its name and its bytes, and the external reference ends
        // up on its own content.
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("proj");
        std::fs::create_dir_all(base.join("images")).unwrap();
        std::fs::create_dir_all(base.join("textures")).unwrap();
        std::fs::write(base.join("images/tex.png"), b"external pixels").unwrap();
        std::fs::write(base.join("textures/tex.png"), b"in-place pixels").unwrap();

        let mut doc = MemoryDocument::new();
        let external = doc.insert(ResourceReference::new(ResourceKind::Image, "images/tex.png"));
        let in_place = doc.insert(ResourceReference::new(
            ResourceKind::Image,
            "textures/tex.png",
        ));

        let report = gather(&mut doc, &base, "textures").await.unwrap();
        assert_eq!(report.failed, 0);

        // The in-place file keeps its destination and its content
        assert_eq!(doc.get(&in_place).unwrap().current_path, "textures/tex.png");
        assert_eq!(
            std::fs::read(base.join("textures/tex.png")).unwrap(),
            b"in-place pixels"
        );

        // The external reference is rewritten onto a renamed copy of its own
        // bytes, not onto the in-place file
        let external_path = doc.get(&external).unwrap().current_path.clone();
        assert_ne!(external_path, "textures/tex.png");
        assert!(external_path.starts_with("textures/tex_"));
        assert_eq!(
            std::fs::read(base.join(&external_path)).unwrap(),
            b"external pixels"
        );
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (base, mut doc, [a, b, _c]) = scenario(&dir);

        gather(&mut doc, &base, "textures").await.unwrap();
        let a_path = doc.get(&a).unwrap().current_path.clone();
        let b_path = doc.get(&b).unwrap().current_path.clone();

        let second = gather(&mut doc, &base, "textures").await.unwrap();

        assert_eq!(second.copied, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(second.failed, 1);

        // Collision determinism: the disambiguated names survive the re-run
        assert_eq!(doc.get(&a).unwrap().current_path, a_path);
        assert_eq!(doc.get(&b).unwrap().current_path, b_path);
    }

    #[tokio::test]
    async fn test_gather_dedups_shared_source_file() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("proj");
        std::fs::create_dir_all(base.join("images")).unwrap();
        std::fs::write(base.join("images/tex.png"), b"pixels").unwrap();

        let mut doc = MemoryDocument::new();
        let rel = doc.insert(ResourceReference::new(ResourceKind::Image, "images/tex.png"));
        let abs_spelling = base.join("images/tex.png").to_string_lossy().to_string();
        let abs = doc.insert(ResourceReference::new(ResourceKind::Image, abs_spelling));

        let report = gather(&mut doc, &base, "textures").await.unwrap();

        // Both usage sites rewritten to the single shared destination
        assert_eq!(report.copied, 2);
        assert_eq!(doc.get(&rel).unwrap().current_path, "textures/tex.png");
        assert_eq!(doc.get(&abs).unwrap().current_path, "textures/tex.png");

        let gathered: Vec<_> = std::fs::read_dir(base.join("textures"))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(gathered.len(), 1);
    }

    #[tokio::test]
    async fn test_gather_skips_packed_references() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("proj");
        std::fs::create_dir_all(base.join("images")).unwrap();
        std::fs::write(base.join("images/tex.png"), b"pixels").unwrap();
        std::fs::write(base.join("images/embedded.png"), b"packed").unwrap();

        let mut doc = MemoryDocument::new();
        doc.insert(ResourceReference::new(ResourceKind::Image, "images/tex.png"));
        let packed = doc.insert(
            ResourceReference::new(ResourceKind::Image, "images/embedded.png").packed(),
        );

        let report = gather(&mut doc, &base, "textures").await.unwrap();

        // Packed references are neither attempts nor failures
        assert_eq!(report.attempted, 1);
        assert_eq!(
            doc.get(&packed).unwrap().current_path,
            "images/embedded.png"
        );
        assert!(!base.join("textures/embedded.png").exists());
    }

    #[tokio::test]
    async fn test_gather_missing_base_dir_is_fatal() {
        let mut doc = MemoryDocument::new();
        let result = gather(&mut doc, Path::new("/nonexistent/project"), "textures").await;
        assert!(matches!(result, Err(GatherError::ProjectDirNotFound(_))));
    }

    #[tokio::test]
    async fn test_gather_invalid_target_name_is_fatal() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("proj");
        std::fs::create_dir_all(&base).unwrap();

        let mut doc = MemoryDocument::new();
        let result = gather(&mut doc, &base, "../escape").await;
        assert!(matches!(result, Err(GatherError::InvalidTargetDir { .. })));
    }

    struct UnreadableDocument;

    impl crate::core::document::ProjectDocument for UnreadableDocument {
        fn enumerate_external_references(
            &self,
        ) -> GatherResult<Vec<ResourceReference>> {
            Err(GatherError::DocumentUnreadable(
                "node tree cycle detected".to_string(),
            ))
        }

        fn commit_path(&mut self, _id: &str, _new_relative_path: &str) -> GatherResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unreadable_document_aborts_run() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("proj");
        std::fs::create_dir_all(&base).unwrap();

        let mut doc = UnreadableDocument;
        let result = gather(&mut doc, &base, "textures").await;
        assert!(matches!(result, Err(GatherError::DocumentUnreadable(_))));
        // Fatal before any filesystem work
        assert!(!base.join("textures").exists());
    }

    // A document whose commits fail for selected references, as a host might
    // reject writes to locked parts of a scene.
    struct RejectingDocument {
        inner: MemoryDocument,
        reject: String,
    }

    impl crate::core::document::ProjectDocument for RejectingDocument {
        fn enumerate_external_references(
            &self,
        ) -> GatherResult<Vec<ResourceReference>> {
            self.inner.enumerate_external_references()
        }

        fn commit_path(&mut self, id: &str, new_relative_path: &str) -> GatherResult<()> {
            if id == self.reject {
                return Err(GatherError::CommitRejected(
                    id.to_string(),
                    "reference is locked".to_string(),
                ));
            }
            self.inner.commit_path(id, new_relative_path)
        }
    }

    #[tokio::test]
    async fn test_commit_failure_keeps_copied_file_for_resume() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("proj");
        std::fs::create_dir_all(base.join("images")).unwrap();
        std::fs::write(base.join("images/tex.png"), b"pixels").unwrap();
        std::fs::write(base.join("images/other.png"), b"other").unwrap();

        let mut inner = MemoryDocument::new();
        let locked = inner.insert(ResourceReference::new(ResourceKind::Image, "images/tex.png"));
        let free = inner.insert(ResourceReference::new(ResourceKind::Image, "images/other.png"));
        let mut doc = RejectingDocument {
            inner,
            reject: locked.clone(),
        };

        let report = gather(&mut doc, &base, "textures").await.unwrap();

        // The locked reference fails, the other still goes through
        assert_eq!(report.copied, 1);
        assert_eq!(report.failed, 1);
        let failed = report
            .items
            .iter()
            .find(|i| i.reference_id == locked)
            .unwrap();
        assert!(failed.reason.as_deref().unwrap().contains("commit rejected"));
        assert_eq!(doc.inner.get(&free).unwrap().current_path, "textures/other.png");

        // The copy stays at the destination so a later run can finish with a
        // rewrite only
        assert!(base.join("textures/tex.png").is_file());

        // A later run completes the rewrite; the fresh destination means the
        // bytes are not copied again.
        let mut recovered = doc.inner;
        let resumed = gather(&mut recovered, &base, "textures").await.unwrap();
        assert_eq!(resumed.failed, 0);
        assert_eq!(resumed.copied, 1);
        assert_eq!(resumed.skipped, 1);
        assert_eq!(
            recovered.get(&locked).unwrap().current_path,
            "textures/tex.png"
        );
    }
}
