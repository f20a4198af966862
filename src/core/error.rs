//! Mediagather Error Definitions
//!
//! Defines error types used throughout the engine.
//!
//! Only conditions that abort a whole run are raised as errors. Per-item
//! conditions (missing source file, copy failure, rejected commit) are
//! accumulated into the run report by the executor and never propagate
//! past it.

use thiserror::Error;

use super::ReferenceId;

/// Core engine error types
#[derive(Error, Debug)]
pub enum GatherError {
    // =========================================================================
    // Fatal Run Errors
    // =========================================================================
    #[error("Document model unreadable: {0}")]
    DocumentUnreadable(String),

    #[error("Invalid target directory name '{name}': {reason}")]
    InvalidTargetDir { name: String, reason: String },

    #[error("Project base directory not found: {0}")]
    ProjectDirNotFound(String),

    // =========================================================================
    // Document Adapter Errors
    // =========================================================================
    #[error("Reference not found: {0}")]
    ReferenceNotFound(ReferenceId),

    #[error("Commit rejected for reference {0}: {1}")]
    CommitRejected(ReferenceId, String),

    #[error("Manifest corrupted: {0}")]
    ManifestCorrupted(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type GatherResult<T> = Result<T, GatherError>;
