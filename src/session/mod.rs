//! Session channel
//!
//! Owns one session's link to the assistant: the streaming channel, the
//! one-shot fallback, the single-flight guard and both retry policies.
//!
//! All I/O runs in spawned tasks that report back as [`ChannelEvent`]s. The
//! owner feeds those into [`SessionChannel::handle`] one at a time and drains
//! the resulting [`SessionEvent`]s, so every state change happens on the
//! owner's task.

pub mod policy;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::backend::{
    Backend, ChatRequest, ChatResponse, HealthInfo, StreamConnection, StreamMessage, StreamRequest,
};
use crate::config::SessionConfig;
use crate::core::{ChannelState, Frame, FrameKind, Session, TransportError};

pub use policy::{ProbeBackoff, ReconnectPolicy};

/// Shown for transport failures; details go to the log
pub const TRANSPORT_FAILURE: &str = "Could not reach the assistant. Please try again.";

/// Messages from the channel's background tasks
#[derive(Debug)]
pub enum ChannelEvent {
    /// A scheduled retry timer fired
    RetryDue(RetryKind),
    ProbeFinished {
        attempt: u32,
        result: Result<HealthInfo, TransportError>,
    },
    ConnectFinished(Result<StreamConnection, TransportError>),
    /// Something arrived on the stream identified by `link`
    Inbound { link: u64, message: StreamMessage },
    FallbackFinished(Result<ChatResponse, TransportError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryKind {
    /// Liveness probe number `attempt` of the initial acquisition
    Probe { attempt: u32 },
    /// Re-open after an established channel dropped
    Reconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRetry {
    pub kind: RetryKind,
    pub delay: Duration,
}

/// What the channel reports to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged(ChannelState),
    /// Initial acquisition gave up; only the fallback path remains
    Degraded,
    ToolUsed(String),
    Response {
        content: String,
        tools_used: Vec<String>,
    },
    Failed(String),
}

/// How a submission was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// A query was already outstanding; nothing happened
    Ignored,
    Streamed,
    Fallback,
    /// The stream write failed; reported as [`SessionEvent::Failed`]
    Failed,
}

struct PendingRetry {
    retry: ScheduledRetry,
    task: JoinHandle<()>,
}

pub struct SessionChannel {
    session: Session,
    backend: Arc<dyn Backend>,
    api_keys: HashMap<String, String>,
    backoff: ProbeBackoff,
    reconnect: ReconnectPolicy,
    events: mpsc::UnboundedSender<ChannelEvent>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    link: Option<u64>,
    next_link: u64,
    ever_connected: bool,
    degraded: bool,
    /// Probe attempt whose stream connect is in flight
    acquiring: Option<u32>,
    /// The outstanding query went over the stream (not the fallback)
    streamed: bool,
    tools: Vec<String>,
    pending: Option<PendingRetry>,
    outbox: Vec<SessionEvent>,
}

impl SessionChannel {
    /// Create a channel and the receiver its background tasks report to
    pub fn new(
        session: Session,
        backend: Arc<dyn Backend>,
        config: &SessionConfig,
        api_keys: HashMap<String, String>,
    ) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let channel = Self {
            session,
            backend,
            api_keys,
            backoff: ProbeBackoff::from_config(config),
            reconnect: ReconnectPolicy::from_config(config),
            events,
            outbound: None,
            link: None,
            next_link: 0,
            ever_connected: false,
            degraded: false,
            acquiring: None,
            streamed: false,
            tools: Vec::new(),
            pending: None,
            outbox: Vec::new(),
        };
        (channel, rx)
    }

    pub fn session_id(&self) -> &str {
        &self.session.id
    }

    pub fn state(&self) -> ChannelState {
        self.session.state
    }

    pub fn is_busy(&self) -> bool {
        self.session.busy
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn ever_connected(&self) -> bool {
        self.ever_connected
    }

    /// The retry timer currently armed, if any
    pub fn pending_retry(&self) -> Option<ScheduledRetry> {
        self.pending.as_ref().map(|p| p.retry)
    }

    /// Take the events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Begin initial acquisition with the first liveness probe
    pub fn start(&mut self) {
        if self.ever_connected
            || self.degraded
            || self.pending.is_some()
            || self.session.state != ChannelState::Disconnected
        {
            return;
        }
        tracing::info!(session_id = %self.session.id, "Starting session channel");
        self.probe(0);
    }

    /// Submit a query
    ///
    /// A no-op while another query is outstanding. Uses the stream when it
    /// is connected and the one-shot fallback otherwise.
    pub fn send_query(&mut self, message: &str) -> Submission {
        if self.session.busy {
            tracing::debug!(session_id = %self.session.id, "Query ignored, session busy");
            return Submission::Ignored;
        }
        self.session.busy = true;
        self.tools.clear();

        if self.session.state == ChannelState::Connected {
            if let Some(outbound) = &self.outbound {
                let payload = StreamRequest {
                    message: message.to_string(),
                    api_keys: self.api_keys.clone(),
                };
                let sent = serde_json::to_string(&payload)
                    .map_err(|e| TransportError::Send(e.to_string()))
                    .and_then(|text| {
                        outbound
                            .send(text)
                            .map_err(|_| TransportError::Closed("stream pump stopped".to_string()))
                    });
                return match sent {
                    Ok(()) => {
                        self.streamed = true;
                        Submission::Streamed
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Stream write failed");
                        self.session.busy = false;
                        self.outbox.push(SessionEvent::Failed(TRANSPORT_FAILURE.to_string()));
                        self.link_lost();
                        Submission::Failed
                    }
                };
            }
        }

        self.streamed = false;
        let backend = Arc::clone(&self.backend);
        let tx = self.events.clone();
        let request = ChatRequest {
            message: message.to_string(),
            session_id: self.session.id.clone(),
            api_keys: self.api_keys.clone(),
        };
        tokio::spawn(async move {
            let result = backend.chat(&request).await;
            let _ = tx.send(ChannelEvent::FallbackFinished(result));
        });
        Submission::Fallback
    }

    pub fn handle(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::RetryDue(kind) => {
                self.pending = None;
                match kind {
                    RetryKind::Probe { attempt } => self.probe(attempt),
                    RetryKind::Reconnect => self.connect(None),
                }
            }
            ChannelEvent::ProbeFinished { attempt, result } => match result {
                Ok(health) => {
                    tracing::info!(
                        attempt,
                        provider = %health.provider,
                        model = %health.model,
                        "Backend is up"
                    );
                    self.connect(Some(attempt));
                }
                Err(err) => {
                    tracing::debug!(attempt, error = %err, "Liveness probe failed");
                    self.acquisition_failed(attempt);
                }
            },
            ChannelEvent::ConnectFinished(result) => self.connect_finished(result),
            ChannelEvent::Inbound { link, message } => {
                if self.link != Some(link) {
                    return;
                }
                match message {
                    StreamMessage::Text(text) => match Frame::parse(&text) {
                        Ok(frame) => self.handle_frame(frame),
                        Err(err) => tracing::debug!(error = %err, "Ignoring malformed frame"),
                    },
                    StreamMessage::Closed(reason) => {
                        tracing::warn!(session_id = %self.session.id, reason = %reason, "Stream dropped");
                        if self.session.busy && self.streamed {
                            self.session.busy = false;
                            self.outbox.push(SessionEvent::Failed(TRANSPORT_FAILURE.to_string()));
                        }
                        self.link_lost();
                    }
                }
            }
            ChannelEvent::FallbackFinished(result) => {
                self.session.busy = false;
                match result {
                    Ok(reply) => {
                        for tool in &reply.tools_used {
                            tracing::debug!(tool = %tool, "Tool used");
                        }
                        self.outbox.push(SessionEvent::Response {
                            content: reply.response,
                            tools_used: reply.tools_used,
                        });
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Fallback chat failed");
                        self.outbox.push(SessionEvent::Failed(TRANSPORT_FAILURE.to_string()));
                    }
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: Frame) {
        if frame.is_terminal() {
            tracing::debug!(session_id = %self.session.id, "Query finished");
        }
        match frame.kind {
            FrameKind::Tool { name } => {
                self.tools.push(name.clone());
                self.outbox.push(SessionEvent::ToolUsed(name));
            }
            FrameKind::Response { content } => {
                self.session.busy = false;
                self.outbox.push(SessionEvent::Response {
                    content,
                    tools_used: std::mem::take(&mut self.tools),
                });
            }
            FrameKind::Error { message } => {
                self.session.busy = false;
                self.tools.clear();
                self.outbox.push(SessionEvent::Failed(message));
            }
            // Only response and error end a query; a trailing done may
            // arrive after the next query was already sent
            FrameKind::Done => {}
            FrameKind::Unknown(kind) => {
                tracing::debug!(frame_type = %kind, "Ignoring unknown frame");
            }
        }
    }

    fn set_state(&mut self, state: ChannelState) {
        if self.session.state != state {
            self.session.state = state;
            self.outbox.push(SessionEvent::StateChanged(state));
        }
    }

    fn probe(&mut self, attempt: u32) {
        self.set_state(ChannelState::Connecting);
        let backend = Arc::clone(&self.backend);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = backend.health().await;
            let _ = tx.send(ChannelEvent::ProbeFinished { attempt, result });
        });
    }

    /// Open the stream; `attempt` is set during initial acquisition
    fn connect(&mut self, attempt: Option<u32>) {
        self.set_state(ChannelState::Connecting);
        self.acquiring = attempt;
        let backend = Arc::clone(&self.backend);
        let tx = self.events.clone();
        let session_id = self.session.id.clone();
        tokio::spawn(async move {
            let result = backend.connect_stream(&session_id).await;
            let _ = tx.send(ChannelEvent::ConnectFinished(result));
        });
    }

    fn connect_finished(&mut self, result: Result<StreamConnection, TransportError>) {
        match result {
            Ok(conn) => {
                let link = self.next_link;
                self.next_link += 1;
                let (outbound, mut inbound) = conn.split();
                let tx = self.events.clone();
                tokio::spawn(async move {
                    while let Some(message) = inbound.recv().await {
                        if tx.send(ChannelEvent::Inbound { link, message }).is_err() {
                            return;
                        }
                    }
                    let _ = tx.send(ChannelEvent::Inbound {
                        link,
                        message: StreamMessage::Closed("stream ended".to_string()),
                    });
                });

                self.outbound = Some(outbound);
                self.link = Some(link);
                self.ever_connected = true;
                self.acquiring = None;
                tracing::info!(session_id = %self.session.id, link, "Stream connected");
                self.set_state(ChannelState::Connected);
            }
            Err(err) => {
                tracing::warn!(error = %err, "Stream connect failed");
                match self.acquiring.take() {
                    Some(attempt) if !self.ever_connected => self.acquisition_failed(attempt),
                    _ => {
                        self.set_state(ChannelState::Disconnected);
                        self.schedule(RetryKind::Reconnect, self.reconnect.delay);
                    }
                }
            }
        }
    }

    /// Initial acquisition attempt failed: back off or give up
    fn acquisition_failed(&mut self, attempt: u32) {
        self.set_state(ChannelState::Disconnected);
        match self.backoff.next_delay(attempt) {
            Some(delay) => self.schedule(RetryKind::Probe { attempt: attempt + 1 }, delay),
            None => {
                tracing::warn!(
                    session_id = %self.session.id,
                    attempts = attempt + 1,
                    "Backend unreachable, using fallback only"
                );
                self.degraded = true;
                self.outbox.push(SessionEvent::Degraded);
            }
        }
    }

    /// The established stream is gone; schedule the fixed-delay reconnect
    fn link_lost(&mut self) {
        self.outbound = None;
        self.link = None;
        self.set_state(ChannelState::Disconnected);
        if self.ever_connected {
            self.schedule(RetryKind::Reconnect, self.reconnect.delay);
        }
    }

    /// Arm a retry timer unless one is already pending
    fn schedule(&mut self, kind: RetryKind, delay: Duration) {
        if self.pending.is_some() {
            return;
        }
        tracing::debug!(?kind, delay_ms = delay.as_millis() as u64, "Retry scheduled");
        let tx = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ChannelEvent::RetryDue(kind));
        });
        self.pending = Some(PendingRetry {
            retry: ScheduledRetry { kind, delay },
            task,
        });
    }
}

impl Drop for SessionChannel {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
    }
}
