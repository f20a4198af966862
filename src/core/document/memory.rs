//! In-Memory Document Adapter
//!
//! A [`ProjectDocument`] backed by a plain vector, for hosts that hold their
//! reference table in memory and for engine tests. Enumeration preserves
//! insertion order, which keeps collision tie-breaking deterministic.

use crate::core::document::{ProjectDocument, ResourceReference};
use crate::core::{GatherError, GatherResult};

/// In-memory reference table
#[derive(Clone, Debug, Default)]
pub struct MemoryDocument {
    references: Vec<ResourceReference>,
    /// Whether any commit has been applied since construction
    dirty: bool,
}

impl MemoryDocument {
    /// Creates an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reference, returning its ID
    pub fn insert(&mut self, reference: ResourceReference) -> String {
        let id = reference.id.clone();
        self.references.push(reference);
        id
    }

    /// Looks up a reference by ID
    pub fn get(&self, id: &str) -> Option<&ResourceReference> {
        self.references.iter().find(|r| r.id == id)
    }

    /// Whether any reference path has been rewritten
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl ProjectDocument for MemoryDocument {
    fn enumerate_external_references(&self) -> GatherResult<Vec<ResourceReference>> {
        Ok(self
            .references
            .iter()
            .filter(|r| !r.is_packed)
            .cloned()
            .collect())
    }

    fn commit_path(&mut self, id: &str, new_relative_path: &str) -> GatherResult<()> {
        let reference = self
            .references
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| GatherError::ReferenceNotFound(id.to_string()))?;
        reference.current_path = new_relative_path.to_string();
        self.dirty = true;
        Ok(())
    }
}
