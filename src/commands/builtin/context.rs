//! `/context` and `/clear`

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use crate::backend::Backend;
use crate::commands::CommandHandler;
use crate::core::{Action, ActionIntent, CommandError, CommandResult, Outcome, ResultKind};

/// Load a file or folder as assistant context
pub struct ContextCommand {
    backend: Arc<dyn Backend>,
    session_id: String,
}

impl ContextCommand {
    pub fn new(backend: Arc<dyn Backend>, session_id: String) -> Self {
        Self {
            backend,
            session_id,
        }
    }

    fn load_action(&self, path: &str) -> Action {
        let backend = Arc::clone(&self.backend);
        let session_id = self.session_id.clone();
        let path = path.to_string();
        Action::deferred(move || {
            let backend = Arc::clone(&backend);
            let session_id = session_id.clone();
            let path = path.clone();
            async move {
                let outcome = match backend.load_context(&path, &session_id).await {
                    Ok(reply) if reply.success => {
                        let loaded = reply.loaded.unwrap_or_else(|| path.clone());
                        Outcome::Ok(format!("Loaded {loaded} as context"))
                    }
                    Ok(reply) => Outcome::Failed(
                        reply
                            .error
                            .unwrap_or_else(|| "Context could not be loaded".to_string()),
                    ),
                    Err(err) => {
                        tracing::warn!(error = %err, path = %path, "Context load failed");
                        Outcome::Failed(err.to_string())
                    }
                };
                ActionIntent::Context { path, outcome }
            }
            .boxed()
        })
    }
}

#[async_trait]
impl CommandHandler for ContextCommand {
    fn name(&self) -> &str {
        "context"
    }

    fn description(&self) -> &str {
        "Load a file or folder as assistant context"
    }

    fn kind(&self) -> ResultKind {
        ResultKind::Action
    }

    async fn results(&self, args: &str) -> Result<Vec<CommandResult>, CommandError> {
        if args.is_empty() {
            return Err(CommandError::Validation(
                "Usage: /context <path>".to_string(),
            ));
        }

        Ok(vec![CommandResult::new(
            "context-load",
            format!("Load context: {args}"),
            "Send the file or folder to the assistant",
            ResultKind::Action,
        )
        .with_data(serde_json::json!({ "path": args }))
        .with_action(self.load_action(args))])
    }
}

/// Clear the displayed response or the session's context
pub struct ClearCommand {
    backend: Arc<dyn Backend>,
    session_id: String,
}

impl ClearCommand {
    pub fn new(backend: Arc<dyn Backend>, session_id: String) -> Self {
        Self {
            backend,
            session_id,
        }
    }

    fn clear_context_action(&self) -> Action {
        let backend = Arc::clone(&self.backend);
        let session_id = self.session_id.clone();
        Action::deferred(move || {
            let backend = Arc::clone(&backend);
            let session_id = session_id.clone();
            async move {
                let cleared = match backend.clear_context(&session_id).await {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::warn!(error = %err, "Context clear failed");
                        false
                    }
                };
                ActionIntent::ClearContext { cleared }
            }
            .boxed()
        })
    }
}

#[async_trait]
impl CommandHandler for ClearCommand {
    fn name(&self) -> &str {
        "clear"
    }

    fn description(&self) -> &str {
        "Clear the response or the assistant context"
    }

    fn kind(&self) -> ResultKind {
        ResultKind::Action
    }

    async fn results(&self, _args: &str) -> Result<Vec<CommandResult>, CommandError> {
        Ok(vec![
            CommandResult::new(
                "clear-response",
                "Clear response",
                "Remove the displayed answer",
                ResultKind::Action,
            )
            .with_intent(ActionIntent::Clear),
            CommandResult::new(
                "clear-context",
                "Clear context",
                "Forget files loaded for this session",
                ResultKind::Action,
            )
            .with_action(self.clear_context_action()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    #[tokio::test]
    async fn test_context_without_path_is_hint() {
        let backend = Arc::new(MemoryBackend::new());
        let command = ContextCommand::new(backend.clone(), "s1".to_string());

        let err = command.results("").await.unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_context_load_only_on_invoke() {
        let backend = Arc::new(MemoryBackend::new());
        let command = ContextCommand::new(backend.clone(), "s1".to_string());

        let results = command.results("~/src").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(backend.count("load_context"), 0);

        let intent = results[0].action.as_ref().unwrap().invoke().await;
        assert_eq!(
            intent,
            ActionIntent::Context {
                path: "~/src".to_string(),
                outcome: Outcome::Ok("Loaded src as context".to_string()),
            }
        );
        assert_eq!(backend.calls(), vec!["load_context:~/src"]);
    }

    #[tokio::test]
    async fn test_context_transport_failure_is_outcome() {
        let backend = Arc::new(MemoryBackend::new().with_context_error("refused"));
        let command = ContextCommand::new(backend, "s1".to_string());

        let results = command.results("/tmp").await.unwrap();
        let intent = results[0].action.as_ref().unwrap().invoke().await;
        match intent {
            ActionIntent::Context { outcome, .. } => assert!(!outcome.is_ok()),
            other => panic!("unexpected intent {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_clear_offers_response_and_context() {
        let backend = Arc::new(MemoryBackend::new().with_clear_failure());
        let command = ClearCommand::new(backend.clone(), "s1".to_string());

        let results = command.results("").await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["clear-response", "clear-context"]);

        assert_eq!(results[0].action.as_ref().unwrap().invoke().await, ActionIntent::Clear);
        assert_eq!(
            results[1].action.as_ref().unwrap().invoke().await,
            ActionIntent::ClearContext { cleared: false }
        );
        assert_eq!(backend.calls(), vec!["clear_context:s1"]);
    }
}
