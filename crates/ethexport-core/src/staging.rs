//! Scoped staging workspace for step execution.
//!
//! Every step invocation works inside a private directory: fetched inputs,
//! intermediate files, and outputs all live there until the step publishes.
//! The directory is removed when the handle drops, on success and failure
//! alike, so an aborted or cancelled step leaves nothing behind.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A fresh, exclusively owned working directory for one step invocation.
///
/// Two concurrently running steps never observe the same workspace; each
/// `acquire` yields a distinct directory.
#[derive(Debug)]
pub struct StagingWorkspace {
    dir: TempDir,
}

impl StagingWorkspace {
    /// Create a workspace under the system temporary directory.
    pub fn acquire() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("ethexport-").tempdir()?;
        Ok(Self { dir })
    }

    /// Create a workspace under `root` instead of the system default.
    pub fn acquire_in(root: &Path) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("ethexport-")
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    /// The workspace directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path for a named file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
