//! Relocation Planner
//!
//! The algorithmic heart of the engine. For each enumerated reference the
//! planner resolves the stored path to a file on disk (or flags it as
//! unresolvable), deduplicates references by resolved file identity, computes
//! a collision-safe destination inside the target child directory, and
//! decides whether the executor must copy at all.
//!
//! Planning is a pure function of the reference list and the filesystem; it
//! performs no writes.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::core::document::ResourceReference;
use crate::core::{fs, paths, GatherError, GatherResult};

// =============================================================================
// Plan Models
// =============================================================================

/// What the executor must do for one plan
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanAction {
    /// Copy the source to a fresh destination
    CopyNew,
    /// Source already sits at its destination; rewrite the path only
    AlreadyInPlace,
    /// Copy under a disambiguated name because an unrelated file claimed the
    /// plain one
    CollisionRenamed,
}

/// The resolved, existing file backing one or more references
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// The stored path resolved against the project base directory
    pub absolute_path: PathBuf,
    /// Canonical identity used for deduplication; references that spell the
    /// same file differently share this
    pub identity: PathBuf,
}

/// The computed intent for one reference
#[derive(Clone, Debug)]
pub struct RelocationPlan {
    /// The usage site to rewrite
    pub reference: ResourceReference,
    /// The file backing it
    pub source: SourceFile,
    /// Destination path relative to the project base directory, forward
    /// slashes (e.g. `textures/tex.png`)
    pub destination: String,
    /// What the executor must do
    pub action: PlanAction,
}

/// A reference whose source file could not be resolved
#[derive(Clone, Debug)]
pub struct Unresolved {
    pub reference: ResourceReference,
    pub reason: String,
}

/// Planner output: plans plus broken links
#[derive(Clone, Debug, Default)]
pub struct PlanSet {
    pub plans: Vec<RelocationPlan>,
    pub unresolved: Vec<Unresolved>,
}

// =============================================================================
// Planning
// =============================================================================

/// Computes relocation plans for a run.
///
/// References are processed in enumeration order; the first file encountered
/// with a given name keeps the plain destination, later unrelated files with
/// the same name are renamed deterministically. A file already sitting inside
/// the target directory owns its name outright, whatever the enumeration
/// order. Destinations are unique per distinct source identity within a run.
pub fn plan_relocations(
    references: Vec<ResourceReference>,
    base_dir: &Path,
    target_dir_name: &str,
) -> GatherResult<PlanSet> {
    fs::validate_target_dir_name(target_dir_name).map_err(|reason| {
        GatherError::InvalidTargetDir {
            name: target_dir_name.to_string(),
            reason,
        }
    })?;

    let mut set = PlanSet::default();
    // Identity -> destination decided at first encounter
    let mut assigned: HashMap<PathBuf, (String, PlanAction)> = HashMap::new();
    let mut taken: HashSet<String> = HashSet::new();

    for reference in references {
        // Packed references carry their bytes inside the document; adapters
        // exclude them at enumeration, this is the backstop.
        if reference.is_packed {
            continue;
        }

        let absolute = paths::resolve_stored_path(base_dir, &reference.current_path);
        if !absolute.is_file() {
            warn!(
                path = %absolute.display(),
                reference = %reference.id,
                "source file missing"
            );
            set.unresolved.push(Unresolved {
                reference,
                reason: "source file missing".to_string(),
            });
            continue;
        }

        let identity = paths::canonical_identity(&absolute);
        let (destination, action) = match assigned.get(&identity).cloned() {
            // Another reference to the same file: share its destination
            Some((destination, action)) => (destination, action),
            None => {
                let file_name = absolute
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .ok_or_else(|| {
                        GatherError::Internal(format!(
                            "resolved path has no file name: {}",
                            absolute.display()
                        ))
                    })?;

                let plain = format!("{target_dir_name}/{file_name}");
                let plain_taken =
                    taken.contains(&plain) || occupied_by_other(base_dir, &plain, &identity);
                let (destination, renamed) = if plain_taken {
                    (
                        disambiguated_destination(
                            base_dir,
                            target_dir_name,
                            &file_name,
                            &identity,
                            &taken,
                        ),
                        true,
                    )
                } else {
                    (plain, false)
                };

                let at_destination = paths::to_project_relative(base_dir, &identity).as_deref()
                    == Some(destination.as_str());
                let action = if at_destination {
                    PlanAction::AlreadyInPlace
                } else if renamed {
                    PlanAction::CollisionRenamed
                } else {
                    PlanAction::CopyNew
                };

                taken.insert(destination.clone());
                assigned.insert(identity.clone(), (destination.clone(), action));
                (destination, action)
            }
        };

        set.plans.push(RelocationPlan {
            reference,
            source: SourceFile {
                absolute_path: absolute,
                identity,
            },
            destination,
            action,
        });
    }

    Ok(set)
}

// =============================================================================
// Collision Disambiguation
// =============================================================================

/// Whether a candidate destination is already occupied on disk by a file
/// other than the one being planned.
///
/// A file gathered by an earlier run occupies its own destination, and a
/// byte-identical copy left behind by an interrupted run may be reclaimed.
/// Any other occupant forces disambiguation, because copying over it would
/// clobber its bytes (or, when the occupant is fresher, the reference would
/// be rewritten onto the wrong content without a copy at all).
fn occupied_by_other(base_dir: &Path, candidate: &str, identity: &Path) -> bool {
    let on_disk = base_dir.join(candidate);
    if !on_disk.is_file() {
        return false;
    }
    if paths::canonical_identity(&on_disk) == identity {
        return false;
    }
    !same_contents(identity, &on_disk)
}

/// Byte equality, sizes compared first so unrelated files rarely cost a full
/// read. Unreadable files count as different.
fn same_contents(a: &Path, b: &Path) -> bool {
    match (std::fs::metadata(a), std::fs::metadata(b)) {
        (Ok(meta_a), Ok(meta_b)) if meta_a.len() == meta_b.len() => {}
        _ => return false,
    }
    match (std::fs::read(a), std::fs::read(b)) {
        (Ok(bytes_a), Ok(bytes_b)) => bytes_a == bytes_b,
        _ => false,
    }
}

/// Computes a unique destination for a filename already claimed by a
/// different source file.
///
/// The suffix is derived from a stable hash of the source's canonical
/// absolute path, so an unchanged project maps the same file to the same
/// disambiguated name on every run. Should the suffixed name itself be
/// claimed, a numeric counter is appended until the name is free.
fn disambiguated_destination(
    base_dir: &Path,
    target_dir_name: &str,
    file_name: &str,
    identity: &Path,
    taken: &HashSet<String>,
) -> String {
    let (stem, ext) = split_file_name(file_name);
    let tag = path_hash_tag(identity);

    let candidate = format!("{target_dir_name}/{stem}_{tag}{ext}");
    if !taken.contains(&candidate) && !occupied_by_other(base_dir, &candidate, identity) {
        return candidate;
    }

    let mut counter: u32 = 2;
    loop {
        let candidate = format!("{target_dir_name}/{stem}_{tag}_{counter}{ext}");
        if !taken.contains(&candidate) && !occupied_by_other(base_dir, &candidate, identity) {
            return candidate;
        }
        counter += 1;
    }
}

/// Splits `tex.png` into (`tex`, `.png`); names without an extension keep an
/// empty suffix so `fluid` becomes `fluid_<tag>`.
fn split_file_name(file_name: &str) -> (&str, String) {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
        _ => (file_name, String::new()),
    }
}

/// First 8 hex chars of the sha256 of the canonical source path
fn path_hash_tag(identity: &Path) -> String {
    let digest = Sha256::digest(identity.to_string_lossy().as_bytes());
    digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
}
