//! Canonical type definitions for the launcher core
//!
//! The resolver, selection state, session channel and pipeline all speak
//! these types. Other modules should `pub use` them rather than defining
//! their own.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Category tag of a candidate action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Ai,
    App,
    File,
    System,
    Clipboard,
    Action,
}

impl ResultKind {
    /// Get the lowercase tag used on the wire and in logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::App => "app",
            Self::File => "file",
            Self::System => "system",
            Self::Clipboard => "clipboard",
            Self::Action => "action",
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of an action that talked to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum Outcome {
    Ok(String),
    Failed(String),
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Human readable text for either branch
    pub fn message(&self) -> &str {
        match self {
            Self::Ok(msg) | Self::Failed(msg) => msg,
        }
    }
}

/// The effect produced by executing a [`CommandResult`]
///
/// Exactly one variant is produced per invocation. The pipeline applies
/// `Ai`, `Insert` and `Clear` itself and hands every other variant to the
/// surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActionIntent {
    /// Send the query to the assistant
    Ai { query: String },
    /// Replace the input text
    Insert { text: String },
    /// Switch the surface to a named view (e.g. "settings")
    Navigate { view: String },
    /// Open text the user typed that looked like a URL
    Url { url: String },
    /// Copy a computed value
    Copy { text: String },
    /// Result of loading local files as assistant context
    Context { path: String, outcome: Outcome },
    /// Clear the displayed response
    Clear,
    /// Result of clearing the assistant context
    #[serde(rename_all = "camelCase")]
    ClearContext { cleared: bool },
    /// Result of switching the backend provider
    Provider { provider: String, outcome: Outcome },
    #[serde(rename_all = "camelCase")]
    LaunchApp { app_id: String },
    Quit,
    OpenFile { path: PathBuf },
    CopyToClipboard { content: String },
    OpenUrl { url: String },
}

impl ActionIntent {
    /// Variant tag, mostly for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ai { .. } => "ai",
            Self::Insert { .. } => "insert",
            Self::Navigate { .. } => "navigate",
            Self::Url { .. } => "url",
            Self::Copy { .. } => "copy",
            Self::Context { .. } => "context",
            Self::Clear => "clear",
            Self::ClearContext { .. } => "clearContext",
            Self::Provider { .. } => "provider",
            Self::LaunchApp { .. } => "launchApp",
            Self::Quit => "quit",
            Self::OpenFile { .. } => "openFile",
            Self::CopyToClipboard { .. } => "copyToClipboard",
            Self::OpenUrl { .. } => "openUrl",
        }
    }
}

type IntentProducer = dyn Fn() -> BoxFuture<'static, ActionIntent> + Send + Sync;

/// A nullary producer of an [`ActionIntent`]
#[derive(Clone)]
pub enum Action {
    /// The intent is known up front
    Ready(ActionIntent),
    /// The intent is produced by async work (backend calls)
    Deferred(Arc<IntentProducer>),
}

impl Action {
    pub fn ready(intent: ActionIntent) -> Self {
        Self::Ready(intent)
    }

    pub fn deferred<F>(producer: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, ActionIntent> + Send + Sync + 'static,
    {
        Self::Deferred(Arc::new(producer))
    }

    /// Run the action and return the intent it produced
    pub async fn invoke(&self) -> ActionIntent {
        match self {
            Self::Ready(intent) => intent.clone(),
            Self::Deferred(producer) => producer().await,
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(intent) => f.debug_tuple("Ready").field(intent).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// One candidate action surfaced to the user
///
/// `id` is unique within one resolved list only; lists are replaced
/// wholesale on every resolve.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    #[serde(rename = "type")]
    pub kind: ResultKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Absent for label-only / hint entries
    #[serde(skip)]
    pub action: Option<Action>,
}

impl CommandResult {
    /// Create a label-only entry (no action)
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        subtitle: impl Into<String>,
        kind: ResultKind,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subtitle: subtitle.into(),
            kind,
            shortcut: None,
            data: None,
            action: None,
        }
    }

    /// Attach an intent that is known up front
    pub fn with_intent(mut self, intent: ActionIntent) -> Self {
        self.action = Some(Action::Ready(intent));
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_shortcut(mut self, shortcut: impl Into<String>) -> Self {
        self.shortcut = Some(shortcut.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_executable(&self) -> bool {
        self.action.is_some()
    }
}

/// Connection state of a session's streaming channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Per-process assistant session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Generated once at startup, stable for the process lifetime
    pub id: String,
    /// Single-flight guard
    pub busy: bool,
    pub state: ChannelState,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            busy: false,
            state: ChannelState::Disconnected,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload of a channel frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    /// One tool invocation, by name
    Tool { name: String },
    /// Terminal: final content
    Response { content: String },
    /// Terminal: failure message
    Error { message: String },
    /// Idempotent completion marker
    Done,
    /// Anything else; ignored by the channel
    Unknown(String),
}

/// One message received over the streaming channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    /// Set when the terminal frame also carries the completion marker
    pub done: bool,
}

#[derive(Deserialize)]
struct WireFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    done: bool,
}

impl Frame {
    pub fn new(kind: FrameKind) -> Self {
        Self { kind, done: false }
    }

    /// Parse a JSON text frame
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let wire: WireFrame = serde_json::from_str(text)?;
        let kind = match wire.kind.as_str() {
            "tool" => FrameKind::Tool {
                name: wire.name.unwrap_or_default(),
            },
            "response" => FrameKind::Response {
                content: wire.content.unwrap_or_default(),
            },
            "error" => FrameKind::Error {
                message: wire.message.unwrap_or_else(|| "Unknown error".to_string()),
            },
            "done" => FrameKind::Done,
            _ => FrameKind::Unknown(wire.kind),
        };
        Ok(Self {
            kind,
            done: wire.done,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            FrameKind::Response { .. } | FrameKind::Error { .. }
        )
    }
}
