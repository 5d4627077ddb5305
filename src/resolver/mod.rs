//! Query resolution
//!
//! Maps the text in the launcher input to an ordered list of candidate
//! actions. Dispatch is decided by the first character:
//!
//! - empty input shows the quick actions
//! - `/` dispatches to a registered slash command
//! - `>` asks the assistant explicitly
//! - anything else runs universal search (detectors plus an AI fallback)
//!
//! Resolution never fails. Handler errors become a single result.

pub mod calculator;

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::commands::{parse_command, CommandRegistry};
use crate::core::{ActionIntent, CommandError, CommandResult, ResultKind};

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:https?://\S+|(?:www\.)?[a-z0-9-]+(?:\.[a-z0-9-]+)*\.(?:com|org|net|io|dev|app|ai|co|me|edu|gov|info|xyz|uk|de)(?::\d+)?(?:/\S*)?)$",
    )
    .expect("URL pattern is valid")
});

static ARITHMETIC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d+\-*/%().\s]+$").expect("arithmetic pattern is valid"));

pub struct QueryResolver {
    registry: Arc<CommandRegistry>,
}

impl QueryResolver {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    pub async fn resolve(&self, query: &str) -> Vec<CommandResult> {
        let query = query.trim();
        if query.is_empty() {
            return quick_actions();
        }
        if let Some((name, args)) = parse_command(query) {
            return self.resolve_command(&name, args).await;
        }
        if let Some(rest) = query.strip_prefix('>') {
            return vec![explicit_ai(rest.trim())];
        }
        universal_search(query)
    }

    async fn resolve_command(&self, name: &str, args: &str) -> Vec<CommandResult> {
        if name.is_empty() {
            return self
                .registry
                .iter()
                .map(|(name, handler)| {
                    command_hint(name, handler.description(), handler.kind())
                })
                .collect();
        }

        if let Some(handler) = self.registry.get(name) {
            return match handler.results(args).await {
                Ok(results) => results,
                Err(err) => {
                    if let CommandError::Collaborator(cause) = &err {
                        tracing::warn!(command = name, error = %cause, "Command failed");
                    }
                    vec![err.into_result(name, handler.kind())]
                }
            };
        }

        self.registry
            .matching(name)
            .into_iter()
            .map(|handler| {
                command_hint(
                    &handler.name().to_lowercase(),
                    handler.description(),
                    handler.kind(),
                )
            })
            .collect()
    }
}

/// Fixed result set for an empty query
pub fn quick_actions() -> Vec<CommandResult> {
    vec![
        CommandResult::new("ask-ai", "Ask AI", "Type > followed by a question", ResultKind::Ai)
            .with_shortcut(">")
            .with_intent(ActionIntent::Insert {
                text: "> ".to_string(),
            }),
        CommandResult::new("search-apps", "Search Apps", "/app <name>", ResultKind::App)
            .with_shortcut("/app")
            .with_intent(ActionIntent::Insert {
                text: "/app ".to_string(),
            }),
        CommandResult::new("search-files", "Search Files", "/file <name>", ResultKind::File)
            .with_shortcut("/file")
            .with_intent(ActionIntent::Insert {
                text: "/file ".to_string(),
            }),
        CommandResult::new(
            "clipboard-history",
            "Clipboard History",
            "/clip [filter]",
            ResultKind::Clipboard,
        )
        .with_shortcut("/clip")
        .with_intent(ActionIntent::Insert {
            text: "/clip ".to_string(),
        }),
        CommandResult::new(
            "settings",
            "Settings",
            "Providers and API keys",
            ResultKind::System,
        )
        .with_intent(ActionIntent::Navigate {
            view: "settings".to_string(),
        }),
    ]
}

fn command_hint(name: &str, description: &str, kind: ResultKind) -> CommandResult {
    CommandResult::new(format!("cmd-{name}"), format!("/{name}"), description, kind).with_intent(
        ActionIntent::Insert {
            text: format!("/{name} "),
        },
    )
}

fn explicit_ai(question: &str) -> CommandResult {
    if question.is_empty() {
        return CommandResult::new(
            "ai-explicit",
            "Ask AI",
            "Type a question after >",
            ResultKind::Ai,
        );
    }
    CommandResult::new("ai-explicit", question, "Ask AI", ResultKind::Ai).with_intent(
        ActionIntent::Ai {
            query: question.to_string(),
        },
    )
}

/// Detectors are prepended in evaluation order, so the last one to match
/// ends up first and the AI fallback always stays last.
fn universal_search(query: &str) -> Vec<CommandResult> {
    let mut results = vec![CommandResult::new("ai-fallback", query, "Ask AI", ResultKind::Ai)
        .with_intent(ActionIntent::Ai {
            query: query.to_string(),
        })];

    if let Some(url) = detect_url(query) {
        results.insert(0, url);
    }
    if let Some(calc) = detect_arithmetic(query) {
        results.insert(0, calc);
    }

    results
}

/// "Open <query>" when the text looks like a URL
pub fn detect_url(query: &str) -> Option<CommandResult> {
    if !URL_PATTERN.is_match(query) {
        return None;
    }
    let lowered = query.to_lowercase();
    let target = if lowered.starts_with("http://") || lowered.starts_with("https://") {
        query.to_string()
    } else {
        format!("https://{query}")
    };
    url::Url::parse(&target).ok()?;

    Some(
        CommandResult::new(
            "url-open",
            format!("Open {query}"),
            target.clone(),
            ResultKind::Action,
        )
        .with_intent(ActionIntent::Url { url: target }),
    )
}

/// "= <value>" when the text is a finite arithmetic expression
pub fn detect_arithmetic(query: &str) -> Option<CommandResult> {
    if !ARITHMETIC_PATTERN.is_match(query) {
        return None;
    }
    let value = match calculator::evaluate(query) {
        Ok(value) => value,
        Err(err) => {
            tracing::trace!(query, error = %err, "Not an arithmetic expression");
            return None;
        }
    };

    let text = value.to_string();
    Some(
        CommandResult::new(
            "calc-result",
            format!("= {text}"),
            "Copy result",
            ResultKind::Action,
        )
        .with_intent(ActionIntent::Copy { text }),
    )
}
