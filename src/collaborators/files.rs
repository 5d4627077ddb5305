//! Filesystem search over a fixed set of roots

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ignore::WalkBuilder;

use super::{FileEntry, FileSearch};

const MAX_DEPTH: usize = 4;

/// Case-insensitive substring match on file names, walking each root in order
pub struct WalkFileSearch {
    roots: Vec<PathBuf>,
}

impl WalkFileSearch {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    fn walk(roots: &[PathBuf], query: &str, max_results: usize, folders_only: bool) -> Vec<FileEntry> {
        let needle = query.to_lowercase();
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for root in roots.iter().filter(|root| root.is_dir()) {
            let walker = WalkBuilder::new(root)
                .hidden(false)
                .git_ignore(false)
                .max_depth(Some(MAX_DEPTH))
                .build();

            for entry in walker.filter_map(|e| e.ok()) {
                if results.len() >= max_results {
                    return results;
                }
                // The root itself is never a hit
                if entry.depth() == 0 {
                    continue;
                }

                let path = entry.path();
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if folders_only && !is_dir {
                    continue;
                }
                let Some(name) = file_name(path) else {
                    continue;
                };
                if !name.to_lowercase().contains(&needle) {
                    continue;
                }
                // Roots may nest (home contains Documents)
                if !seen.insert(path.to_path_buf()) {
                    continue;
                }

                results.push(FileEntry {
                    name,
                    path: path.to_path_buf(),
                    is_dir,
                });
            }
        }

        results
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

#[async_trait]
impl FileSearch for WalkFileSearch {
    async fn search_files(
        &self,
        query: &str,
        max_results: usize,
        folders_only: bool,
    ) -> Result<Vec<FileEntry>> {
        if query.is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let roots = self.roots.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || Self::walk(&roots, &query, max_results, folders_only))
            .await
            .context("File search task failed")
    }
}
