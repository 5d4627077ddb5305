//! Capability collaborators
//!
//! Narrow contracts to the native side (app index, filesystem, clipboard).
//! Command handlers only see these traits; the launcher shell supplies the
//! platform implementations.

mod clipboard;
mod files;

pub use clipboard::MemoryClipboard;
pub use files::WalkFileSearch;

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An installed application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A filesystem hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// One clipboard history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipItem {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait AppSearch: Send + Sync {
    async fn search_apps(&self, query: &str) -> Result<Vec<AppEntry>>;
}

#[async_trait]
pub trait FileSearch: Send + Sync {
    /// Case-insensitive name search, at most `max_results` entries
    async fn search_files(
        &self,
        query: &str,
        max_results: usize,
        folders_only: bool,
    ) -> Result<Vec<FileEntry>>;
}

#[async_trait]
pub trait ClipboardHistory: Send + Sync {
    /// Most recent first
    async fn history(&self) -> Result<Vec<ClipItem>>;
}
