//! Scriptable in-memory backend
//!
//! Answers from canned replies and records every call, so sessions and
//! commands can be driven without a server.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::stream::{StreamConnection, StreamPeer};
use super::types::{
    ChatRequest, ChatResponse, ContextLoadResponse, CurrentProvider, HealthInfo, ProviderEntry,
    ProvidersResponse,
};
use super::Backend;
use crate::core::TransportError;

struct Inner {
    /// Failing probes before the first success; `None` never succeeds
    health_failures: Option<u32>,
    stream_enabled: bool,
    chat: Result<ChatResponse, String>,
    context: Result<ContextLoadResponse, String>,
    clear_ok: bool,
    providers: ProvidersResponse,
    calls: Vec<String>,
    peers: VecDeque<StreamPeer>,
}

pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Healthy backend with a working stream
    pub fn new() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(
            "groq".to_string(),
            ProviderEntry {
                name: "Groq".to_string(),
            },
        );
        providers.insert(
            "ollama".to_string(),
            ProviderEntry {
                name: "Ollama".to_string(),
            },
        );

        Self {
            inner: Mutex::new(Inner {
                health_failures: Some(0),
                stream_enabled: true,
                chat: Ok(ChatResponse {
                    response: "ok".to_string(),
                    tools_used: Vec::new(),
                }),
                context: Ok(ContextLoadResponse {
                    success: true,
                    loaded: Some("src".to_string()),
                    kind: Some("directory".to_string()),
                    error: None,
                }),
                clear_ok: true,
                providers: ProvidersResponse {
                    providers,
                    current: CurrentProvider {
                        provider: "groq".to_string(),
                    },
                },
                calls: Vec::new(),
                peers: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Liveness probe fails `n` times before succeeding
    pub fn with_health_failures(self, n: u32) -> Self {
        self.lock().health_failures = Some(n);
        self
    }

    /// Nothing answers: probes and stream connects fail
    pub fn unreachable(self) -> Self {
        {
            let mut inner = self.lock();
            inner.health_failures = None;
            inner.stream_enabled = false;
        }
        self
    }

    /// Probes succeed but the stream endpoint refuses connections
    pub fn without_stream(self) -> Self {
        self.lock().stream_enabled = false;
        self
    }

    pub fn with_chat_reply(self, response: &str, tools: &[&str]) -> Self {
        self.lock().chat = Ok(ChatResponse {
            response: response.to_string(),
            tools_used: tools.iter().map(|t| t.to_string()).collect(),
        });
        self
    }

    pub fn with_chat_error(self, message: &str) -> Self {
        self.lock().chat = Err(message.to_string());
        self
    }

    pub fn with_context_reply(self, reply: ContextLoadResponse) -> Self {
        self.lock().context = Ok(reply);
        self
    }

    pub fn with_context_error(self, message: &str) -> Self {
        self.lock().context = Err(message.to_string());
        self
    }

    pub fn with_clear_failure(self) -> Self {
        self.lock().clear_ok = false;
        self
    }

    /// Toggle stream availability on a shared instance
    pub fn set_stream_enabled(&self, enabled: bool) {
        self.lock().stream_enabled = enabled;
    }

    /// Every call so far, e.g. `health`, `chat:hello`, `connect:<session>`
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls whose label starts with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// Far side of the oldest stream opened and not yet taken
    pub fn take_peer(&self) -> Option<StreamPeer> {
        self.lock().peers.pop_front()
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn health(&self) -> Result<HealthInfo, TransportError> {
        let mut inner = self.lock();
        inner.calls.push("health".to_string());
        match inner.health_failures {
            Some(0) => Ok(HealthInfo {
                provider: inner.providers.current.provider.clone(),
                model: "memory".to_string(),
            }),
            Some(n) => {
                inner.health_failures = Some(n - 1);
                Err(TransportError::Connect("connection refused".to_string()))
            }
            None => Err(TransportError::Connect("connection refused".to_string())),
        }
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let mut inner = self.lock();
        inner.calls.push(format!("chat:{}", request.message));
        inner.chat.clone().map_err(TransportError::Connect)
    }

    async fn connect_stream(&self, session_id: &str) -> Result<StreamConnection, TransportError> {
        let mut inner = self.lock();
        inner.calls.push(format!("connect:{session_id}"));
        if !inner.stream_enabled {
            return Err(TransportError::Connect("stream refused".to_string()));
        }
        let (conn, peer) = StreamConnection::pair();
        inner.peers.push_back(peer);
        Ok(conn)
    }

    async fn load_context(
        &self,
        path: &str,
        _session_id: &str,
    ) -> Result<ContextLoadResponse, TransportError> {
        self.record(format!("load_context:{path}"));
        self.lock().context.clone().map_err(TransportError::Connect)
    }

    async fn clear_context(&self, session_id: &str) -> Result<(), TransportError> {
        self.record(format!("clear_context:{session_id}"));
        if self.lock().clear_ok {
            Ok(())
        } else {
            Err(TransportError::Http {
                status: 500,
                body: "clear failed".to_string(),
            })
        }
    }

    async fn providers(&self) -> Result<ProvidersResponse, TransportError> {
        self.record("providers".to_string());
        Ok(self.lock().providers.clone())
    }

    async fn update_provider(&self, provider: &str) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.calls.push(format!("update_provider:{provider}"));
        if !inner.providers.providers.contains_key(provider) {
            return Err(TransportError::Http {
                status: 400,
                body: format!("Unknown provider: {provider}"),
            });
        }
        inner.providers.current.provider = provider.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_failures_then_success() {
        let backend = MemoryBackend::new().with_health_failures(2);
        assert!(backend.health().await.is_err());
        assert!(backend.health().await.is_err());
        assert!(backend.health().await.is_ok());
        assert_eq!(backend.count("health"), 3);
    }

    #[tokio::test]
    async fn test_update_provider_switches_current() {
        let backend = MemoryBackend::new();
        backend.update_provider("ollama").await.unwrap();
        assert!(backend.providers().await.unwrap().is_current("ollama"));
        assert!(backend.update_provider("nope").await.is_err());
    }
}
