//! Directory listing
//!
//! The scanner only needs "give me the files under this root", expressed as
//! the [`FileLister`] trait. [`WalkLister`] is the filesystem implementation.

use anyhow::Result;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::config::ScanConfig;

/// Source of candidate paths for a scan
///
/// Order of the returned paths is unspecified.
pub trait FileLister {
    fn list(&self, root: &Path) -> Result<Vec<PathBuf>>;
}

/// Lists regular files under a root by walking the filesystem
#[derive(Debug, Clone)]
pub struct WalkLister {
    max_depth: Option<usize>,
    follow_symlinks: bool,
    include_hidden: bool,
    respect_ignore: bool,
}

impl WalkLister {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            follow_symlinks: config.follow_symlinks,
            include_hidden: config.include_hidden,
            respect_ignore: config.respect_ignore,
        }
    }
}

impl FileLister for WalkLister {
    fn list(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            anyhow::bail!("Scan root not found or not a directory: {}", root.display());
        }

        log::info!("Listing files under {}", root.display());

        let mut builder = WalkBuilder::new(root);
        builder
            .standard_filters(self.respect_ignore)
            .hidden(!self.include_hidden)
            .follow_links(self.follow_symlinks)
            .max_depth(self.max_depth);
        if self.respect_ignore {
            // Honor .gitignore even when the root is not inside a git checkout
            builder.require_git(false);
        }

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            // Only list files (not directories)
            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }

            files.push(entry.into_path());
        }

        log::debug!("Listed {} files under {}", files.len(), root.display());
        Ok(files)
    }
}
