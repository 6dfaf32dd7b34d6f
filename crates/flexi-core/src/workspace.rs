//! Per-invocation workspaces
//!
//! Every handled request gets its own freshly created, uniquely named
//! directory. The returned [`ScopedDir`] owns the directory and everything
//! under it; dropping or releasing it deletes the tree. Deletion failures are
//! logged and swallowed so they never replace the execution outcome.

use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use uuid::Uuid;

const WORKSPACE_PREFIX: &str = "flexi-exec-";

/// Directory shape requested by a build/run strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceLayout {
    /// Single flat directory for interpreted sources.
    Flat,
    /// Adds `src/` and `bin/` for compiled sources and their output.
    Compiled,
}

#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: Option<PathBuf>,
}

impl WorkspaceManager {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Creates a fresh workspace. Filesystem work runs on the blocking pool.
    pub async fn acquire(&self, layout: WorkspaceLayout) -> std::io::Result<ScopedDir> {
        let root = self.root();
        let dir = tokio::task::spawn_blocking(move || create_workspace(&root, layout))
            .await
            .map_err(std::io::Error::other)??;

        log::debug!("Acquired workspace {}", dir.path().display());
        Ok(ScopedDir {
            dir: Some(dir),
            layout,
        })
    }

    /// Lists workspace directories currently present under the root.
    pub fn live_workspaces(&self) -> std::io::Result<Vec<PathBuf>> {
        let root = self.root();
        if !root.exists() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            let is_workspace = entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(WORKSPACE_PREFIX))
                .unwrap_or(false);
            if is_workspace && entry.file_type()?.is_dir() {
                found.push(entry.path());
            }
        }
        Ok(found)
    }
}

fn create_workspace(root: &Path, layout: WorkspaceLayout) -> std::io::Result<TempDir> {
    std::fs::create_dir_all(root)?;

    let prefix = format!("{}{}-", WORKSPACE_PREFIX, Uuid::new_v4().simple());
    let dir = Builder::new().prefix(&prefix).tempdir_in(root)?;

    if layout == WorkspaceLayout::Compiled {
        std::fs::create_dir_all(dir.path().join("src"))?;
        std::fs::create_dir_all(dir.path().join("bin"))?;
    }
    Ok(dir)
}

/// Exclusively owned workspace directory, deleted on release or drop.
#[derive(Debug)]
pub struct ScopedDir {
    dir: Option<TempDir>,
    layout: WorkspaceLayout,
}

impl ScopedDir {
    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }

    pub fn layout(&self) -> WorkspaceLayout {
        self.layout
    }

    pub fn src_dir(&self) -> PathBuf {
        self.path().join("src")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.path().join("bin")
    }

    /// Deletes the directory tree now, on the blocking pool.
    pub async fn release(mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        let path = dir.path().to_path_buf();
        match tokio::task::spawn_blocking(move || dir.close()).await {
            Ok(Ok(())) => log::debug!("Released workspace {}", path.display()),
            Ok(Err(e)) => log::warn!("Failed to remove workspace {}: {}", path.display(), e),
            Err(e) => log::warn!("Workspace cleanup task for {} failed: {}", path.display(), e),
        }
    }

    // Synchronous fallback for workspaces dropped without release.
    fn release_inner(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => log::debug!("Released workspace {}", path.display()),
                Err(e) => log::warn!("Failed to remove workspace {}: {}", path.display(), e),
            }
        }
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        self.release_inner();
    }
}
