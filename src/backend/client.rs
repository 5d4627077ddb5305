//! HTTP implementation of [`Backend`]

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use super::stream::{self, StreamConnection};
use super::types::{
    ChatRequest, ChatResponse, ContextLoadRequest, ContextLoadResponse, HealthInfo,
    ProvidersResponse, UpdateProviderRequest,
};
use super::Backend;
use crate::config::BackendConfig;
use crate::core::TransportError;

/// Client for the local assistant server
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    stream_base: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            stream_base: config.stream_base(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Websocket URL for a session
    pub fn stream_url(&self, session_id: &str) -> String {
        format!("{}/ws/{}", self.stream_base, session_id)
    }

    async fn check(response: Response) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Http {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
        let response = Self::check(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn health(&self) -> Result<HealthInfo, TransportError> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        Self::decode(response).await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        tracing::debug!(session_id = %request.session_id, "POST /chat");
        let response = self
            .client
            .post(self.url("/chat"))
            .json(request)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        Self::decode(response).await
    }

    async fn connect_stream(&self, session_id: &str) -> Result<StreamConnection, TransportError> {
        stream::open(&self.stream_url(session_id)).await
    }

    async fn load_context(
        &self,
        path: &str,
        session_id: &str,
    ) -> Result<ContextLoadResponse, TransportError> {
        let response = self
            .client
            .post(self.url("/context/load"))
            .json(&ContextLoadRequest { path, session_id })
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        Self::decode(response).await
    }

    async fn clear_context(&self, session_id: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.url("/context/clear"))
            .query(&[("session_id", session_id)])
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        Self::check(response).await.map(|_| ())
    }

    async fn providers(&self) -> Result<ProvidersResponse, TransportError> {
        let response = self
            .client
            .get(self.url("/providers"))
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        Self::decode(response).await
    }

    async fn update_provider(&self, provider: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.url("/providers/update"))
            .json(&UpdateProviderRequest { provider })
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        Self::check(response).await.map(|_| ())
    }
}
