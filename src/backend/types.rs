//! Request and response bodies of the assistant backend

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthInfo {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
}

/// `POST /chat`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    pub api_keys: HashMap<String, String>,
}

/// Collapsed one-shot answer; tool names arrive as a list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub tools_used: Vec<String>,
}

/// Payload written to the streaming channel
#[derive(Debug, Clone, Serialize)]
pub struct StreamRequest {
    pub message: String,
    pub api_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ContextLoadRequest<'a> {
    pub path: &'a str,
    pub session_id: &'a str,
}

/// `POST /context/load`
///
/// `success == false` is an application-level failure described by `error`,
/// not a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContextLoadResponse {
    pub success: bool,
    /// Name of the loaded file or directory
    #[serde(default)]
    pub loaded: Option<String>,
    /// "file" or "directory"
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderEntry {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CurrentProvider {
    pub provider: String,
}

/// `GET /providers`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProvidersResponse {
    pub providers: BTreeMap<String, ProviderEntry>,
    pub current: CurrentProvider,
}

impl ProvidersResponse {
    pub fn is_current(&self, id: &str) -> bool {
        self.current.provider == id
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UpdateProviderRequest<'a> {
    pub provider: &'a str,
}
