//! `/app`, `/file` and `/folder`

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::collaborators::{AppSearch, FileSearch};
use crate::commands::CommandHandler;
use crate::config::SearchConfig;
use crate::core::{ActionIntent, CommandError, CommandResult, ResultKind};

fn require_length(args: &str, min_chars: usize, what: &str) -> Result<(), CommandError> {
    if args.chars().count() < min_chars {
        return Err(CommandError::Validation(format!(
            "Type at least {min_chars} characters to search {what}"
        )));
    }
    Ok(())
}

/// Search and launch installed applications
pub struct AppCommand {
    apps: Option<Arc<dyn AppSearch>>,
    min_chars: usize,
}

impl AppCommand {
    pub fn new(apps: Option<Arc<dyn AppSearch>>, min_chars: usize) -> Self {
        Self { apps, min_chars }
    }
}

#[async_trait]
impl CommandHandler for AppCommand {
    fn name(&self) -> &str {
        "app"
    }

    fn description(&self) -> &str {
        "Search and launch applications"
    }

    fn kind(&self) -> ResultKind {
        ResultKind::App
    }

    async fn results(&self, args: &str) -> Result<Vec<CommandResult>, CommandError> {
        let apps = self
            .apps
            .as_ref()
            .ok_or_else(|| CommandError::Unavailable("App search is not available".to_string()))?;
        require_length(args, self.min_chars, "apps")?;

        let found = apps
            .search_apps(args)
            .await
            .map_err(CommandError::collaborator)?;
        tracing::debug!(query = args, count = found.len(), "App search");

        if found.is_empty() {
            return Ok(vec![CommandResult::new(
                "app-empty",
                format!("No apps matching \"{args}\""),
                "Try a different name",
                ResultKind::App,
            )]);
        }

        Ok(found
            .into_iter()
            .map(|app| {
                let subtitle = app
                    .description
                    .clone()
                    .unwrap_or_else(|| "Application".to_string());
                CommandResult::new(format!("app-{}", app.id), app.name, subtitle, ResultKind::App)
                    .with_data(json!({ "appId": app.id }))
                    .with_intent(ActionIntent::LaunchApp { app_id: app.id })
            })
            .collect())
    }
}

/// Filesystem search, optionally restricted to directories
pub struct FileCommand {
    files: Option<Arc<dyn FileSearch>>,
    folders_only: bool,
    min_chars: usize,
    max_results: usize,
}

impl FileCommand {
    pub fn files(files: Option<Arc<dyn FileSearch>>, search: &SearchConfig) -> Self {
        Self {
            files,
            folders_only: false,
            min_chars: search.min_query_chars,
            max_results: search.max_file_results,
        }
    }

    pub fn folders(files: Option<Arc<dyn FileSearch>>, search: &SearchConfig) -> Self {
        Self {
            folders_only: true,
            ..Self::files(files, search)
        }
    }

    fn what(&self) -> &'static str {
        if self.folders_only {
            "folders"
        } else {
            "files"
        }
    }
}

#[async_trait]
impl CommandHandler for FileCommand {
    fn name(&self) -> &str {
        if self.folders_only {
            "folder"
        } else {
            "file"
        }
    }

    fn description(&self) -> &str {
        if self.folders_only {
            "Search folders"
        } else {
            "Search files"
        }
    }

    fn kind(&self) -> ResultKind {
        ResultKind::File
    }

    async fn results(&self, args: &str) -> Result<Vec<CommandResult>, CommandError> {
        let files = self
            .files
            .as_ref()
            .ok_or_else(|| CommandError::Unavailable("File search is not available".to_string()))?;
        require_length(args, self.min_chars, self.what())?;

        let found = files
            .search_files(args, self.max_results, self.folders_only)
            .await
            .map_err(CommandError::collaborator)?;

        if found.is_empty() {
            return Ok(vec![CommandResult::new(
                format!("{}-empty", self.name()),
                format!("No {} matching \"{args}\"", self.what()),
                "Try a different name",
                ResultKind::File,
            )]);
        }

        Ok(found
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                CommandResult::new(
                    format!("{}-{i}", self.name()),
                    entry.name,
                    entry.path.display().to_string(),
                    ResultKind::File,
                )
                .with_data(json!({ "isDir": entry.is_dir }))
                .with_intent(ActionIntent::OpenFile { path: entry.path })
            })
            .collect())
    }
}
