//! Mediagather Core Engine
//!
//! Core resource-gathering module.
//! Handles reference enumeration, relocation planning, and execution.

pub mod document;
pub mod fs;
pub mod gather;
pub mod paths;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
