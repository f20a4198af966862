//! Mediagather Core Type Definitions
//!
//! Defines fundamental types used throughout the engine.

use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Reference unique identifier (ULID)
pub type ReferenceId = String;

// =============================================================================
// Resource Kinds
// =============================================================================

/// Kind of external resource a reference points at
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Image,
    Video,
    Audio,
    GeometryCache,
    #[default]
    Other,
}

impl ResourceKind {
    /// Infers a resource kind from a file extension (lowercase comparison).
    ///
    /// Used by document adapters when importing path entries that carry no
    /// explicit kind of their own.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "exr" | "tif" | "tiff" | "tga" | "bmp" | "webp" | "hdr" => {
                Self::Image
            }
            "mp4" | "mov" | "mkv" | "avi" | "webm" | "mxf" => Self::Video,
            "wav" | "mp3" | "flac" | "ogg" | "aac" | "aiff" => Self::Audio,
            "abc" | "vdb" | "usd" | "usdc" | "bgeo" => Self::GeometryCache,
            _ => Self::Other,
        }
    }

    /// Infers a resource kind from a file path's extension.
    pub fn from_path(path: &std::path::Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Other)
    }
}
