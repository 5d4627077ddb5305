//! Input pipeline
//!
//! Turns raw input events into debounced resolver calls, drives the
//! selection and submits queries to the session channel. Every input goes
//! through [`InputPipeline::dispatch`]; every output leaves as a [`UiEvent`].

pub mod events;

pub use events::{AppEvent, ResultView, UiEvent};

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::InputConfig;
use crate::core::{ActionIntent, CommandResult};
use crate::resolver::QueryResolver;
use crate::selection::{ExecutedSelection, KeyOutcome, SelectionState};
use crate::session::{ChannelEvent, SessionChannel, SessionEvent};

pub struct InputPipeline {
    resolver: QueryResolver,
    selection: SelectionState,
    channel: SessionChannel,
    ui: mpsc::UnboundedSender<UiEvent>,
    events: mpsc::UnboundedSender<AppEvent>,
    debounce: Duration,
    query: String,
    generation: u64,
    timer: Option<JoinHandle<()>>,
    visible: bool,
    response: Option<String>,
    closing: bool,
    quit: bool,
}

impl InputPipeline {
    /// Wire a pipeline around a resolver and a session channel
    ///
    /// Channel events are forwarded into the returned receiver, so one loop
    /// over it sees every input in arrival order.
    pub fn new(
        resolver: QueryResolver,
        channel: SessionChannel,
        mut channel_events: mpsc::UnboundedReceiver<ChannelEvent>,
        config: &InputConfig,
        ui: mpsc::UnboundedSender<UiEvent>,
    ) -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (events, rx) = mpsc::unbounded_channel();

        let forward = events.clone();
        tokio::spawn(async move {
            while let Some(event) = channel_events.recv().await {
                if forward.send(AppEvent::Channel(event)).is_err() {
                    break;
                }
            }
        });

        let pipeline = Self {
            resolver,
            selection: SelectionState::new(),
            channel,
            ui,
            events,
            debounce: config.debounce(),
            query: String::new(),
            generation: 0,
            timer: None,
            visible: true,
            response: None,
            closing: false,
            quit: false,
        };
        (pipeline, rx)
    }

    /// Sender for input producers (key reader, pointer, tests)
    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.events.clone()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn channel(&self) -> &SessionChannel {
        &self.channel
    }

    /// Last terminal response still on display
    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the loop in [`run`](Self::run) would stop now
    pub fn is_finished(&self) -> bool {
        self.quit || (self.closing && !self.channel.is_busy())
    }

    /// Start the session and process events until quit or shutdown
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<AppEvent>) {
        self.channel.start();
        self.flush_session();
        while let Some(event) = events.recv().await {
            self.dispatch(event).await;
            if self.is_finished() {
                break;
            }
        }
        tracing::debug!("Input pipeline stopped");
    }

    pub async fn dispatch(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input(text) => self.input_changed(text),
            AppEvent::Key(key) => self.key(key).await,
            AppEvent::Hover(index) => {
                if self.selection.set_selected(index) {
                    self.emit(UiEvent::SelectionMoved { index });
                }
            }
            AppEvent::Pick(index) => {
                if self.selection.set_selected(index) {
                    self.emit(UiEvent::SelectionMoved { index });
                }
                if self.selection.index() == Some(index) {
                    self.submit().await;
                }
            }
            AppEvent::DebounceElapsed { generation } => {
                if generation == self.generation {
                    self.timer = None;
                    self.resolve().await;
                }
            }
            AppEvent::Channel(event) => {
                self.channel.handle(event);
                self.flush_session();
            }
            AppEvent::Shutdown => self.closing = true,
        }
    }

    /// Reschedule the trailing-edge debounce timer
    fn input_changed(&mut self, text: String) {
        self.query = text;
        self.generation += 1;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        let generation = self.generation;
        let delay = self.debounce;
        let tx = self.events.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(AppEvent::DebounceElapsed { generation });
        }));
    }

    async fn resolve(&mut self) {
        if self.query.trim().is_empty() {
            self.selection.hide();
            self.emit(UiEvent::Hidden);
            return;
        }
        let results = self.resolver.resolve(&self.query).await;
        self.show(results);
    }

    fn show(&mut self, results: Vec<CommandResult>) {
        if results.is_empty() {
            self.selection.hide();
            self.emit(UiEvent::Hidden);
            return;
        }
        self.selection.show(results);
        let views = self.selection.results().iter().map(ResultView::from).collect();
        self.emit(UiEvent::Results {
            query: self.query.clone(),
            results: views,
        });
    }

    async fn key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            self.visible = !self.visible;
            self.emit(UiEvent::VisibilityChanged {
                visible: self.visible,
            });
            if self.visible && self.query.trim().is_empty() {
                let quick = self.resolver.resolve("").await;
                self.show(quick);
            }
            return;
        }

        let outcome = self.selection.handle_key(key);
        match outcome {
            KeyOutcome::Moved(index) => self.emit(UiEvent::SelectionMoved { index }),
            KeyOutcome::Execute => self.submit().await,
            KeyOutcome::Ignored => {}
        }

        // Enter falls through to free-text submit when no list took it
        let plain_enter =
            key.code == KeyCode::Enter && !key.modifiers.contains(KeyModifiers::SHIFT);
        if plain_enter && !outcome.consumed() {
            self.submit().await;
        }
    }

    /// An executable selection wins over sending the raw text
    async fn submit(&mut self) {
        let executable = self
            .selection
            .selected()
            .is_some_and(|item| item.is_executable());
        if executable {
            if let Some(executed) = self.selection.execute_selected().await {
                self.apply(executed).await;
            }
            return;
        }

        let text = self.query.trim().to_string();
        if text.is_empty() || self.channel.is_busy() {
            return;
        }
        self.channel.send_query(&text);
        self.flush_session();
    }

    async fn apply(&mut self, executed: ExecutedSelection) {
        tracing::debug!(id = %executed.item.id, intent = executed.intent.name(), "Applying intent");
        match executed.intent {
            ActionIntent::Ai { query } => {
                self.channel.send_query(&query);
                self.flush_session();
            }
            ActionIntent::Insert { text } => {
                if let Some(timer) = self.timer.take() {
                    timer.abort();
                }
                self.generation += 1;
                self.query = text.clone();
                self.emit(UiEvent::InputReplaced { text });
                self.resolve().await;
            }
            ActionIntent::Clear => {
                self.response = None;
                self.emit(UiEvent::ResponseCleared);
            }
            ActionIntent::Quit => {
                self.quit = true;
                self.emit(UiEvent::Intent {
                    intent: ActionIntent::Quit,
                });
            }
            intent => self.emit(UiEvent::Intent { intent }),
        }
    }

    fn flush_session(&mut self) {
        for event in self.channel.drain_events() {
            let ui = match event {
                SessionEvent::StateChanged(state) => UiEvent::ConnectionChanged { state },
                SessionEvent::Degraded => UiEvent::Degraded,
                SessionEvent::ToolUsed(name) => UiEvent::ToolUsed { name },
                SessionEvent::Response {
                    content,
                    tools_used,
                } => {
                    self.response = Some(content.clone());
                    UiEvent::Response {
                        content,
                        tools_used,
                    }
                }
                SessionEvent::Failed(message) => UiEvent::AssistantError { message },
            };
            self.emit(ui);
        }
    }

    fn emit(&self, event: UiEvent) {
        if self.ui.send(event).is_err() {
            tracing::trace!("UI receiver dropped");
        }
    }
}

impl Drop for InputPipeline {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
