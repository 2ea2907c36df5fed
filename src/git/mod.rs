//! Git integration
//!
//! The hook manager normally hands us the changed-file list. When gatehouse
//! is invoked directly, this layer derives the same list from the index.

use anyhow::{Context, Result};
use git2::{Repository, Status, StatusOptions};
use std::path::PathBuf;

pub struct GitOperations {
    repo: Repository,
}

impl GitOperations {
    /// Discover and open the repository containing the current directory
    pub fn discover() -> Result<Self> {
        let repo = Repository::discover(".").context("no git repository found")?;
        Ok(Self { repo })
    }

    /// Root of the working tree
    pub fn workdir(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(|p| p.to_path_buf())
            .context("repository has no working directory")
    }

    /// Files staged for commit, as paths relative to the working tree
    pub fn staged_files(&self) -> Result<Vec<PathBuf>> {
        let mut status_opts = StatusOptions::new();
        status_opts.include_ignored(false);
        status_opts.include_untracked(false);

        let statuses = self
            .repo
            .statuses(Some(&mut status_opts))
            .context("failed to read repository status")?;

        let mut files = Vec::new();
        for entry in statuses.iter() {
            let status = entry.status();
            let staged = status.intersects(
                Status::INDEX_NEW
                    | Status::INDEX_MODIFIED
                    | Status::INDEX_RENAMED
                    | Status::INDEX_TYPECHANGE,
            );
            if staged {
                if let Some(path) = entry.path() {
                    files.push(PathBuf::from(path));
                }
            }
        }

        Ok(files)
    }
}
