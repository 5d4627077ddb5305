//! Assistant backend access
//!
//! The [`Backend`] trait covers every endpoint the launcher core consumes.
//! [`HttpBackend`] talks to the local server over HTTP and a websocket;
//! [`MemoryBackend`] answers from canned replies.

mod client;
mod memory;
mod stream;
pub mod types;

pub use client::HttpBackend;
pub use memory::MemoryBackend;
pub use stream::{StreamConnection, StreamMessage, StreamPeer};
pub use types::{
    ChatRequest, ChatResponse, ContextLoadResponse, HealthInfo, ProvidersResponse, StreamRequest,
};

use async_trait::async_trait;

use crate::core::TransportError;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Liveness probe
    async fn health(&self) -> Result<HealthInfo, TransportError>;

    /// One-shot chat, used when the stream is unavailable
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError>;

    /// Open the duplex channel for a session
    async fn connect_stream(&self, session_id: &str) -> Result<StreamConnection, TransportError>;

    async fn load_context(
        &self,
        path: &str,
        session_id: &str,
    ) -> Result<ContextLoadResponse, TransportError>;

    async fn clear_context(&self, session_id: &str) -> Result<(), TransportError>;

    async fn providers(&self) -> Result<ProvidersResponse, TransportError>;

    async fn update_provider(&self, provider: &str) -> Result<(), TransportError>;
}
