//! ClipCut Core - timeline export engine for the ClipCut video cutter.
//!
//! This crate contains the export backend with zero UI dependencies:
//! segment planning, lossless fast-path analysis, the general re-encode
//! path, and external transcoder process management. A GUI or CLI
//! collaborator supplies an [`models::ExportJob`] plus a progress sink and
//! receives either the strategy that produced the output file or a
//! diagnostic failure.

pub mod encoder;
pub mod export;
pub mod models;
pub mod probe;
pub mod process;
pub mod tools;

pub use export::{
    spawn_export, ExportEngine, ExportError, ExportOptions, ExportOutcome, ExportStrategy,
    FastPathFailure, ProgressSink,
};
pub use models::{ExportJob, MediaInfo, Resolution, Segment};
pub use tools::ToolPaths;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
