//! Document Model Capability
//!
//! The host application owns the project document (scene graph, timeline,
//! node tree — whatever shape it takes). The engine consumes it through two
//! capabilities only: a read-only enumeration of external resource
//! references, and a single-path write used to commit rewrites. One concrete
//! adapter exists per host document format.

pub mod manifest;
pub mod memory;

pub use manifest::ManifestDocument;
pub use memory::MemoryDocument;

use serde::{Deserialize, Serialize};

use crate::core::{GatherResult, ReferenceId, ResourceKind};

// =============================================================================
// Resource Reference
// =============================================================================

/// One place in the document where a file path is stored.
///
/// Multiple references may point at the same underlying file; deduplication
/// happens later in the planner, keyed by resolved file identity. References
/// are discovered fresh on every run and never persisted by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    /// Unique identifier (ULID)
    pub id: ReferenceId,
    /// Kind of resource the path points at
    pub kind: ResourceKind,
    /// The path exactly as the document stores it; absolute or relative to
    /// the project base directory, possibly stale or broken
    pub current_path: String,
    /// Packed resources carry their bytes inside the document and are
    /// excluded from relocation
    pub is_packed: bool,
}

impl ResourceReference {
    /// Creates a new external (non-packed) reference
    pub fn new(kind: ResourceKind, current_path: impl Into<String>) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            kind,
            current_path: current_path.into(),
            is_packed: false,
        }
    }

    /// Marks the reference as packed/embedded
    pub fn packed(mut self) -> Self {
        self.is_packed = true;
        self
    }
}

// =============================================================================
// Project Document Capability
// =============================================================================

/// The capability set the engine consumes from the host document model.
///
/// Implementations must enumerate in a stable order so that collision
/// disambiguation (first file encountered keeps the plain name) is
/// deterministic across runs.
pub trait ProjectDocument {
    /// Produce every external-resource usage site in the document, in a
    /// stable order. Packed references should be excluded here; the engine
    /// skips any that slip through.
    ///
    /// This is a pure read. A document that cannot be traversed surfaces
    /// [`crate::core::GatherError::DocumentUnreadable`], which is fatal for
    /// the whole run.
    fn enumerate_external_references(&self) -> GatherResult<Vec<ResourceReference>>;

    /// Rewrite the stored path of one reference to a forward-slash path
    /// relative to the project base directory.
    ///
    /// This is the only mutation the engine performs on the document.
    fn commit_path(&mut self, id: &str, new_relative_path: &str) -> GatherResult<()>;
}
