//! JSON Manifest Document Adapter
//!
//! A [`ProjectDocument`] backed by a `project.json`-style manifest on disk:
//! project metadata plus a flat list of resource entries. Commits mutate the
//! in-memory manifest; [`ManifestDocument::save`] persists it with an atomic
//! replace so a crash mid-write never leaves a corrupt manifest behind.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::document::{ProjectDocument, ResourceReference};
use crate::core::{fs, GatherError, GatherResult, ReferenceId, ResourceKind};

// =============================================================================
// Manifest Models
// =============================================================================

/// One resource entry in the manifest
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Unique identifier (ULID)
    pub id: ReferenceId,
    /// Kind of resource
    pub kind: ResourceKind,
    /// Stored path, absolute or relative to the manifest's directory
    pub path: String,
    /// Packed resources are stored inside the project, not referenced
    #[serde(default)]
    pub packed: bool,
}

/// Manifest file contents
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManifest {
    /// Project name
    pub name: String,
    /// Manifest format version (for migrations)
    pub version: String,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
    /// Last modified timestamp (ISO 8601)
    pub modified_at: String,
    /// External resource entries
    #[serde(default)]
    pub resources: Vec<ManifestEntry>,
}

impl ProjectManifest {
    /// Creates a new empty manifest
    pub fn new(name: &str) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            created_at: now.clone(),
            modified_at: now,
            resources: Vec::new(),
        }
    }

    /// Updates the modified timestamp
    pub fn touch(&mut self) {
        self.modified_at = chrono::Utc::now().to_rfc3339();
    }
}

// =============================================================================
// Manifest Document
// =============================================================================

/// Manifest-backed project document
#[derive(Clone, Debug)]
pub struct ManifestDocument {
    /// Path of the manifest file on disk
    path: PathBuf,
    manifest: ProjectManifest,
    dirty: bool,
}

impl ManifestDocument {
    /// Creates a new manifest document (not yet saved to disk)
    pub fn create(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            manifest: ProjectManifest::new(name),
            dirty: true,
        }
    }

    /// Loads a manifest from disk
    pub fn load(path: impl Into<PathBuf>) -> GatherResult<Self> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)?;
        let manifest: ProjectManifest = serde_json::from_str(&contents)
            .map_err(|e| GatherError::ManifestCorrupted(format!("{}: {e}", path.display())))?;
        Ok(Self {
            path,
            manifest,
            dirty: false,
        })
    }

    /// Adds a resource entry, inferring its kind from the path's extension.
    /// Returns the new entry's ID.
    pub fn add_resource(&mut self, stored_path: impl Into<String>) -> ReferenceId {
        let stored_path = stored_path.into();
        let kind = ResourceKind::from_path(Path::new(&stored_path));
        self.add_resource_with_kind(kind, stored_path)
    }

    /// Adds a resource entry with an explicit kind. Returns the new entry's ID.
    pub fn add_resource_with_kind(
        &mut self,
        kind: ResourceKind,
        stored_path: impl Into<String>,
    ) -> ReferenceId {
        let id = ulid::Ulid::new().to_string();
        self.manifest.resources.push(ManifestEntry {
            id: id.clone(),
            kind,
            path: stored_path.into(),
            packed: false,
        });
        self.manifest.touch();
        self.dirty = true;
        id
    }

    /// Looks up an entry by ID
    pub fn get(&self, id: &str) -> Option<&ManifestEntry> {
        self.manifest.resources.iter().find(|e| e.id == id)
    }

    /// Whether in-memory changes have not yet been saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The manifest file's location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists the manifest atomically
    pub fn save(&mut self) -> GatherResult<()> {
        fs::atomic_write_json_pretty(&self.path, &self.manifest)?;
        self.dirty = false;
        Ok(())
    }
}

impl ProjectDocument for ManifestDocument {
    fn enumerate_external_references(&self) -> GatherResult<Vec<ResourceReference>> {
        Ok(self
            .manifest
            .resources
            .iter()
            .filter(|e| !e.packed)
            .map(|e| ResourceReference {
                id: e.id.clone(),
                kind: e.kind,
                current_path: e.path.clone(),
                is_packed: false,
            })
            .collect())
    }

    fn commit_path(&mut self, id: &str, new_relative_path: &str) -> GatherResult<()> {
        let entry = self
            .manifest
            .resources
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| GatherError::ReferenceNotFound(id.to_string()))?;
        entry.path = new_relative_path.to_string();
        self.manifest.touch();
        self.dirty = true;
        Ok(())
    }
}
