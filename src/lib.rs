//! Mediagather Core Library
//!
//! A resource-gathering engine for content projects: relocates every
//! externally-referenced media file (images, video, audio, geometry caches)
//! into a single child directory of the project, then rewrites each reference
//! to a forward-slash path relative to the project base directory.
//!
//! The host application's document model is consumed through the
//! [`core::document::ProjectDocument`] trait; the engine itself performs no
//! UI, no persistence of its own, and exactly one kind of mutation on the
//! document (reference path rewrites).
//!
//! ## Usage
//!
//! ```no_run
//! use mediagather::core::document::MemoryDocument;
//! use mediagather::core::gather::gather;
//!
//! # async fn run() -> mediagather::core::GatherResult<()> {
//! let mut document = MemoryDocument::new();
//! let report = gather(&mut document, std::path::Path::new("/proj"), "textures").await?;
//! println!("copied {} of {}", report.copied, report.attempted);
//! # Ok(())
//! # }
//! ```

pub mod core;

pub use crate::core::document::{ProjectDocument, ResourceReference};
pub use crate::core::gather::{gather, gather_with, GatherOptions, RunReport};
pub use crate::core::{GatherError, GatherResult, ResourceKind};

/// Initializes stdout logging for hosts that have no subscriber of their own.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`. Safe to call more than
/// once; only the first subscriber wins.
pub fn init_logging() {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(cfg!(debug_assertions));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    // Avoid panics if already initialized (tests, embedding hosts).
    let _ = tracing::subscriber::set_global_default(subscriber);
}
