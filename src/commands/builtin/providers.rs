//! `/providers`

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::json;

use crate::backend::Backend;
use crate::commands::CommandHandler;
use crate::core::{Action, ActionIntent, CommandError, CommandResult, Outcome, ResultKind};

/// List the backend's providers and switch between them
pub struct ProvidersCommand {
    backend: Arc<dyn Backend>,
}

impl ProvidersCommand {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    fn switch_action(&self, provider: String, name: String) -> Action {
        let backend = Arc::clone(&self.backend);
        Action::deferred(move || {
            let backend = Arc::clone(&backend);
            let provider = provider.clone();
            let name = name.clone();
            async move {
                let outcome = match backend.update_provider(&provider).await {
                    Ok(()) => {
                        tracing::info!(provider = %provider, "Provider switched");
                        Outcome::Ok(format!("Switched to {name}"))
                    }
                    Err(err) => Outcome::Failed(err.to_string()),
                };
                ActionIntent::Provider { provider, outcome }
            }
            .boxed()
        })
    }
}

#[async_trait]
impl CommandHandler for ProvidersCommand {
    fn name(&self) -> &str {
        "providers"
    }

    fn description(&self) -> &str {
        "Show and switch AI providers"
    }

    fn kind(&self) -> ResultKind {
        ResultKind::System
    }

    async fn results(&self, args: &str) -> Result<Vec<CommandResult>, CommandError> {
        let listing = self
            .backend
            .providers()
            .await
            .map_err(CommandError::collaborator)?;
        let filter = args.to_lowercase();

        Ok(listing
            .providers
            .iter()
            .filter(|(id, entry)| {
                filter.is_empty()
                    || id.to_lowercase().contains(&filter)
                    || entry.name.to_lowercase().contains(&filter)
            })
            .map(|(id, entry)| {
                let current = listing.is_current(id);
                let subtitle = if current {
                    "Current provider".to_string()
                } else {
                    format!("Switch to {}", entry.name)
                };
                CommandResult::new(
                    format!("provider-{id}"),
                    entry.name.clone(),
                    subtitle,
                    ResultKind::System,
                )
                .with_data(json!({ "provider": id, "current": current }))
                .with_action(self.switch_action(id.clone(), entry.name.clone()))
            })
            .collect())
    }
}
