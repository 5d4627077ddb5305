//! Events in and out of the input pipeline

use crossterm::event::KeyEvent;
use serde::Serialize;

use crate::core::{ActionIntent, ChannelState, CommandResult};
use crate::session::ChannelEvent;

/// Everything the pipeline reacts to, delivered through one dispatch function
#[derive(Debug)]
pub enum AppEvent {
    /// The input text changed
    Input(String),
    Key(KeyEvent),
    /// Pointer hover over a result
    Hover(usize),
    /// Pointer click on a result
    Pick(usize),
    /// Debounce timer fired; stale generations are ignored
    DebounceElapsed { generation: u64 },
    Channel(ChannelEvent),
    /// Stop once no query is outstanding
    Shutdown,
}

/// What the surrounding application should render or perform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum UiEvent {
    Results {
        query: String,
        results: Vec<ResultView>,
    },
    Hidden,
    SelectionMoved {
        index: usize,
    },
    /// The input text was replaced by an `insert` intent
    InputReplaced {
        text: String,
    },
    /// An intent the application has to carry out
    Intent {
        intent: ActionIntent,
    },
    ToolUsed {
        name: String,
    },
    Response {
        content: String,
        tools_used: Vec<String>,
    },
    AssistantError {
        message: String,
    },
    ConnectionChanged {
        state: ChannelState,
    },
    /// The backend could not be reached at startup; answers use the fallback
    Degraded,
    VisibilityChanged {
        visible: bool,
    },
    ResponseCleared,
}

/// Serializable projection of a [`CommandResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultView {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
    pub executable: bool,
}

impl From<&CommandResult> for ResultView {
    fn from(result: &CommandResult) -> Self {
        Self {
            id: result.id.clone(),
            title: result.title.clone(),
            subtitle: result.subtitle.clone(),
            kind: result.kind.label().to_string(),
            shortcut: result.shortcut.clone(),
            executable: result.is_executable(),
        }
    }
}
