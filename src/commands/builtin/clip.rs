//! `/clip`

use std::sync::Arc;

use async_trait::async_trait;

use crate::collaborators::ClipboardHistory;
use crate::commands::CommandHandler;
use crate::core::{ActionIntent, CommandError, CommandResult, ResultKind};

/// Single-line preview of at most `max_chars` characters
pub fn preview(content: &str, max_chars: usize) -> String {
    content
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .take(max_chars)
        .collect()
}

/// Clipboard history with substring filtering
pub struct ClipCommand {
    clipboard: Option<Arc<dyn ClipboardHistory>>,
    preview_chars: usize,
}

impl ClipCommand {
    pub fn new(clipboard: Option<Arc<dyn ClipboardHistory>>, preview_chars: usize) -> Self {
        Self {
            clipboard,
            preview_chars,
        }
    }
}

#[async_trait]
impl CommandHandler for ClipCommand {
    fn name(&self) -> &str {
        "clip"
    }

    fn description(&self) -> &str {
        "Clipboard history"
    }

    fn kind(&self) -> ResultKind {
        ResultKind::Clipboard
    }

    async fn results(&self, args: &str) -> Result<Vec<CommandResult>, CommandError> {
        let clipboard = self.clipboard.as_ref().ok_or_else(|| {
            CommandError::Unavailable("Clipboard history is not available".to_string())
        })?;

        let history = clipboard
            .history()
            .await
            .map_err(CommandError::collaborator)?;
        let needle = args.to_lowercase();
        let results: Vec<CommandResult> = history
            .into_iter()
            .filter(|item| needle.is_empty() || item.content.to_lowercase().contains(&needle))
            .enumerate()
            .map(|(i, item)| {
                let copied = item.timestamp.with_timezone(&chrono::Local);
                CommandResult::new(
                    format!("clip-{i}"),
                    preview(&item.content, self.preview_chars),
                    format!("Copied {}", copied.format("%Y-%m-%d %H:%M")),
                    ResultKind::Clipboard,
                )
                .with_intent(ActionIntent::CopyToClipboard {
                    content: item.content,
                })
            })
            .collect();

        if results.is_empty() {
            let title = if needle.is_empty() {
                "Clipboard history is empty".to_string()
            } else {
                format!("No clipboard entries matching \"{args}\"")
            };
            return Ok(vec![CommandResult::new(
                "clip-empty",
                title,
                "Copy something to fill the history",
                ResultKind::Clipboard,
            )]);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::MemoryClipboard;

    fn command_with(items: &[&str]) -> ClipCommand {
        let clipboard = MemoryClipboard::new();
        for item in items {
            clipboard.record(*item);
        }
        ClipCommand::new(Some(Arc::new(clipboard)), 50)
    }

    #[test]
    fn test_preview_flattens_and_truncates() {
        assert_eq!(preview("a\nb\r\nc", 50), "a b  c");
        let long = "x".repeat(80);
        assert_eq!(preview(&long, 50).chars().count(), 50);
        assert_eq!(preview("héllo wörld", 4), "héll");
    }

    #[tokio::test]
    async fn test_filter_is_case_insensitive() {
        let command = command_with(&["Meeting notes", "git push origin", "NOTES.md"]);

        let results = command.results("notes").await.unwrap();
        let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["NOTES.md", "Meeting notes"]);
    }

    #[tokio::test]
    async fn test_copy_intent_keeps_full_content() {
        let long = format!("{}\n{}", "a".repeat(40), "b".repeat(40));
        let command = command_with(&[long.as_str()]);

        let results = command.results("").await.unwrap();
        assert_eq!(results[0].title.chars().count(), 50);
        assert!(!results[0].title.contains('\n'));
        assert_eq!(
            results[0].action.as_ref().unwrap().invoke().await,
            ActionIntent::CopyToClipboard { content: long }
        );
    }

    #[tokio::test]
    async fn test_empty_history() {
        let command = command_with(&[]);
        let results = command.results("").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "clip-empty");
        assert!(results[0].action.is_none());
    }
}
