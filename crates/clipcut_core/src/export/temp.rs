//! Scoped temp-file lifecycle for fast-path intermediates.

use std::path::PathBuf;

use tempfile::TempPath;

/// Owns the intermediate files one fast-path invocation creates and
/// deletes every one of them when the invocation ends, however it ends.
///
/// Only files created through [`TempFileArena::create`] are tracked;
/// caller inputs and the final output file are never touched.
#[derive(Default)]
pub struct TempFileArena {
    paths: Vec<TempPath>,
}

impl TempFileArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh empty temp file and track it for cleanup.
    pub fn create(&mut self, prefix: &str, suffix: &str) -> std::io::Result<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile()?;
        let path = file.into_temp_path();
        let buf = path.to_path_buf();
        self.paths.push(path);
        Ok(buf)
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Delete all tracked files now. Failures are logged and swallowed so
    /// cleanup never masks the error that got us here.
    pub fn cleanup(&mut self) {
        for path in self.paths.drain(..) {
            let path_buf = path.to_path_buf();
            if let Err(e) = path.close() {
                tracing::warn!("Failed to remove temp file {}: {}", path_buf.display(), e);
            }
        }
    }
}

impl Drop for TempFileArena {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_unique_tracked_files() {
        let mut arena = TempFileArena::new();
        let a = arena.create("seg-copy-0-", ".mp4").unwrap();
        let b = arena.create("seg-copy-1-", ".mp4").unwrap();
        assert_ne!(a, b);
        assert!(a.exists());
        assert!(b.exists());
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn cleanup_removes_everything() {
        let mut arena = TempFileArena::new();
        let path = arena.create("seg-copy-0-", ".mp4").unwrap();
        assert!(path.exists());
        arena.cleanup();
        assert!(!path.exists());
        assert!(arena.is_empty());
    }

    #[test]
    fn drop_removes_everything() {
        let path = {
            let mut arena = TempFileArena::new();
            arena.create("concat-", ".txt").unwrap()
        };
        assert!(!path.exists());
    }

    #[test]
    fn cleanup_is_idempotent() {
        let mut arena = TempFileArena::new();
        arena.create("seg-copy-0-", ".mp4").unwrap();
        arena.cleanup();
        arena.cleanup();
        assert!(arena.is_empty());
    }
}
