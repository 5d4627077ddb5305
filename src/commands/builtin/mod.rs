//! Built-in slash commands

mod clip;
mod context;
mod providers;
mod search;

pub use clip::ClipCommand;
pub use context::{ClearCommand, ContextCommand};
pub use providers::ProvidersCommand;
pub use search::{AppCommand, FileCommand};

use std::sync::Arc;

use async_trait::async_trait;

use super::{CommandHandler, CommandRegistry};
use crate::backend::Backend;
use crate::collaborators::{AppSearch, ClipboardHistory, FileSearch};
use crate::config::SearchConfig;
use crate::core::{ActionIntent, CommandError, CommandResult, RegistryError, ResultKind};

/// Everything the built-in commands need from the outside
///
/// Native capabilities are optional; commands that need a missing one answer
/// with an informational result.
#[derive(Clone)]
pub struct Capabilities {
    pub backend: Arc<dyn Backend>,
    pub session_id: String,
    pub apps: Option<Arc<dyn AppSearch>>,
    pub files: Option<Arc<dyn FileSearch>>,
    pub clipboard: Option<Arc<dyn ClipboardHistory>>,
    pub search: SearchConfig,
}

/// Register the built-in commands in their display order
pub fn register_all(registry: &mut CommandRegistry, caps: &Capabilities) -> Result<(), RegistryError> {
    let handlers: Vec<Arc<dyn CommandHandler>> = vec![
        Arc::new(ContextCommand::new(
            Arc::clone(&caps.backend),
            caps.session_id.clone(),
        )),
        Arc::new(ClearCommand::new(
            Arc::clone(&caps.backend),
            caps.session_id.clone(),
        )),
        Arc::new(AppCommand::new(caps.apps.clone(), caps.search.min_query_chars)),
        Arc::new(FileCommand::files(caps.files.clone(), &caps.search)),
        Arc::new(FileCommand::folders(caps.files.clone(), &caps.search)),
        Arc::new(ClipCommand::new(
            caps.clipboard.clone(),
            caps.search.clipboard_preview_chars,
        )),
        Arc::new(ProvidersCommand::new(Arc::clone(&caps.backend))),
        Arc::new(QuitCommand),
    ];

    for handler in handlers {
        registry.register(handler)?;
    }
    Ok(())
}

pub struct QuitCommand;

#[async_trait]
impl CommandHandler for QuitCommand {
    fn name(&self) -> &str {
        "quit"
    }

    fn description(&self) -> &str {
        "Quit the launcher"
    }

    fn kind(&self) -> ResultKind {
        ResultKind::System
    }

    async fn results(&self, _args: &str) -> Result<Vec<CommandResult>, CommandError> {
        Ok(vec![CommandResult::new(
            "quit",
            "Quit Ruty",
            "Close the launcher",
            ResultKind::System,
        )
        .with_intent(ActionIntent::Quit)])
    }
}
