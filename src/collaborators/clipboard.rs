//! In-process clipboard history

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use super::{ClipItem, ClipboardHistory};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Bounded clipboard history, most recent first
///
/// Copying text that is already present moves it to the front instead of
/// duplicating it. Blank text is ignored.
#[derive(Debug)]
pub struct MemoryClipboard {
    items: Mutex<VecDeque<ClipItem>>,
    limit: usize,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(limit)),
            limit,
        }
    }

    fn items(&self) -> MutexGuard<'_, VecDeque<ClipItem>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a copy; returns false when the text was ignored
    pub fn record(&self, content: impl Into<String>) -> bool {
        let content = content.into();
        if content.trim().is_empty() || self.limit == 0 {
            return false;
        }

        let mut items = self.items();
        if let Some(pos) = items.iter().position(|item| item.content == content) {
            items.remove(pos);
        }
        items.push_front(ClipItem {
            content,
            timestamp: Utc::now(),
        });
        items.truncate(self.limit);
        true
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

impl Default for MemoryClipboard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClipboardHistory for MemoryClipboard {
    async fn history(&self) -> Result<Vec<ClipItem>> {
        Ok(self.items().iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_most_recent_first() {
        let clipboard = MemoryClipboard::new();
        clipboard.record("first");
        clipboard.record("second");

        let history = clipboard.history().await.unwrap();
        let contents: Vec<_> = history.iter().map(|i| i.content.as_str()).collect();
        assert_eq!(contents, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_recopy_moves_to_front() {
        let clipboard = MemoryClipboard::new();
        clipboard.record("a");
        clipboard.record("b");
        clipboard.record("a");

        let history = clipboard.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "a");
    }

    #[test]
    fn test_blank_text_ignored() {
        let clipboard = MemoryClipboard::new();
        assert!(!clipboard.record("   \n"));
        assert!(clipboard.is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let clipboard = MemoryClipboard::with_limit(3);
        for i in 0..10 {
            clipboard.record(format!("item {i}"));
        }
        assert_eq!(clipboard.len(), 3);
    }
}
