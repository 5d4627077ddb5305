//! Input pipeline: debounce, selection and submission

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ruty_cli::backend::MemoryBackend;
use ruty_cli::commands::builtin::{register_all, Capabilities};
use ruty_cli::commands::CommandRegistry;
use ruty_cli::config::{Config, InputConfig};
use ruty_cli::core::{ActionIntent, Session};
use ruty_cli::pipeline::{AppEvent, InputPipeline, UiEvent};
use ruty_cli::resolver::QueryResolver;
use ruty_cli::session::SessionChannel;
use tokio::sync::mpsc::UnboundedReceiver;

struct Harness {
    pipeline: InputPipeline,
    events: UnboundedReceiver<AppEvent>,
    ui: UnboundedReceiver<UiEvent>,
    backend: Arc<MemoryBackend>,
}

impl Harness {
    fn new(backend: MemoryBackend) -> Self {
        let backend = Arc::new(backend);
        let config = Config::default();
        let session = Session::with_id("pipeline-test");

        let caps = Capabilities {
            backend: backend.clone(),
            session_id: session.id.clone(),
            apps: None,
            files: None,
            clipboard: None,
            search: config.search.clone(),
        };
        let mut registry = CommandRegistry::new();
        register_all(&mut registry, &caps).unwrap();
        let resolver = QueryResolver::new(Arc::new(registry));

        let (channel, channel_events) =
            SessionChannel::new(session, backend.clone(), &config.session, HashMap::new());
        let (ui_tx, ui) = tokio::sync::mpsc::unbounded_channel();
        let (pipeline, events) =
            InputPipeline::new(resolver, channel, channel_events, &InputConfig::default(), ui_tx);

        Self {
            pipeline,
            events,
            ui,
            backend,
        }
    }

    async fn send(&mut self, event: AppEvent) {
        self.pipeline.dispatch(event).await;
    }

    async fn key(&mut self, code: KeyCode) {
        self.send(AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))).await;
    }

    /// Dispatch the next internally produced event
    async fn step(&mut self) {
        let event = self.events.recv().await.expect("pipeline event");
        self.pipeline.dispatch(event).await;
    }

    /// Type text and let the debounce fire
    async fn type_and_settle(&mut self, text: &str) {
        self.send(AppEvent::Input(text.to_string())).await;
        self.step().await;
    }

    fn ui_events(&mut self) -> Vec<UiEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.ui.try_recv() {
            out.push(event);
        }
        out
    }
}

fn result_ids(event: &UiEvent) -> Vec<String> {
    match event {
        UiEvent::Results { results, .. } => results.iter().map(|r| r.id.clone()).collect(),
        other => panic!("expected results, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_only_last_keystroke_is_resolved() {
    let mut h = Harness::new(MemoryBackend::new());
    let started = tokio::time::Instant::now();

    for text in ["2", "2+", "2+2"] {
        h.send(AppEvent::Input(text.to_string())).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
    h.step().await;

    assert!(started.elapsed() >= Duration::from_millis(160));
    let events = h.ui_events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        UiEvent::Results { query, results } => {
            assert_eq!(query, "2+2");
            assert_eq!(results[0].title, "= 4");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(h.events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_clearing_input_hides_results() {
    let mut h = Harness::new(MemoryBackend::new());
    h.type_and_settle("example.com").await;
    assert!(h.pipeline.selection().is_visible());

    h.type_and_settle("").await;
    assert!(!h.pipeline.selection().is_visible());
    assert_eq!(h.ui_events().last(), Some(&UiEvent::Hidden));
}

#[tokio::test(start_paused = true)]
async fn test_enter_executes_selection_instead_of_sending() {
    let mut h = Harness::new(MemoryBackend::new());
    h.type_and_settle("2+2").await;
    h.ui_events();

    h.key(KeyCode::Enter).await;
    assert_eq!(
        h.ui_events(),
        vec![UiEvent::Intent {
            intent: ActionIntent::Copy {
                text: "4".to_string()
            }
        }]
    );
    assert_eq!(h.backend.count("chat"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_then_execute() {
    let mut h = Harness::new(MemoryBackend::new());
    h.type_and_settle("example.com").await;
    let results = h.ui_events();
    assert_eq!(result_ids(&results[0]), vec!["url-open", "ai-fallback"]);

    h.key(KeyCode::Down).await;
    h.key(KeyCode::Down).await;
    assert_eq!(h.ui_events(), vec![
        UiEvent::SelectionMoved { index: 1 },
        UiEvent::SelectionMoved { index: 1 },
    ]);

    // The AI fallback sends the query through the session
    h.key(KeyCode::Enter).await;
    assert!(h.pipeline.channel().is_busy());
    h.step().await;
    assert_eq!(h.backend.calls(), vec!["chat:example.com"]);
    assert_eq!(
        h.ui_events(),
        vec![UiEvent::Response {
            content: "ok".to_string(),
            tools_used: Vec::new(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_free_text_submit_and_busy_guard() {
    let mut h = Harness::new(MemoryBackend::new().with_chat_reply("Hi there", &[]));

    // Enter before the debounce fired: no selection, raw text goes out
    h.send(AppEvent::Input("hello".to_string())).await;
    h.key(KeyCode::Enter).await;
    assert!(h.pipeline.channel().is_busy());
    h.key(KeyCode::Enter).await;

    h.step().await;
    assert_eq!(h.backend.calls(), vec!["chat:hello"]);
    assert!(!h.pipeline.channel().is_busy());
    assert_eq!(h.pipeline.response(), Some("Hi there"));
}

#[tokio::test(start_paused = true)]
async fn test_response_survives_typing_until_cleared() {
    let mut h = Harness::new(MemoryBackend::new().with_chat_reply("Answer", &[]));
    h.send(AppEvent::Input("question".to_string())).await;
    h.key(KeyCode::Enter).await;
    h.step().await;
    assert_eq!(h.pipeline.response(), Some("Answer"));

    // Pending debounce from "question", then a new query
    h.step().await;
    h.type_and_settle("something else").await;
    assert_eq!(h.pipeline.response(), Some("Answer"));

    h.type_and_settle("/clear").await;
    h.ui_events();
    h.key(KeyCode::Enter).await;
    assert_eq!(h.ui_events(), vec![UiEvent::ResponseCleared]);
    assert_eq!(h.pipeline.response(), None);
}

#[tokio::test(start_paused = true)]
async fn test_escape_toggles_visibility_without_cancelling() {
    let mut h = Harness::new(MemoryBackend::new());
    h.send(AppEvent::Input("slow question".to_string())).await;
    h.key(KeyCode::Enter).await;
    assert!(h.pipeline.channel().is_busy());

    h.key(KeyCode::Esc).await;
    assert!(!h.pipeline.is_visible());
    assert!(h.pipeline.channel().is_busy());
    assert_eq!(h.ui_events(), vec![UiEvent::VisibilityChanged { visible: false }]);
}

#[tokio::test(start_paused = true)]
async fn test_quick_action_inserts_prefix() {
    let mut h = Harness::new(MemoryBackend::new());
    h.key(KeyCode::Esc).await;
    h.key(KeyCode::Esc).await;
    let events = h.ui_events();
    assert_eq!(
        result_ids(events.last().unwrap()),
        vec!["ask-ai", "search-apps", "search-files", "clipboard-history", "settings"]
    );

    h.key(KeyCode::Tab).await;
    h.key(KeyCode::Enter).await;
    assert_eq!(h.pipeline.query(), "/app ");
    let events = h.ui_events();
    assert_eq!(events[1], UiEvent::InputReplaced { text: "/app ".to_string() });
    assert_eq!(result_ids(&events[2]), vec!["app-unavailable"]);
}

#[tokio::test(start_paused = true)]
async fn test_run_stops_after_shutdown_once_idle() {
    let h = Harness::new(MemoryBackend::new().unreachable().with_chat_reply("bye", &[]));
    let sender = h.pipeline.sender();
    let mut ui = h.ui;

    sender.send(AppEvent::Input("last words".to_string())).unwrap();
    sender
        .send(AppEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)))
        .unwrap();
    sender.send(AppEvent::Shutdown).unwrap();
    h.pipeline.run(h.events).await;

    let mut saw_response = false;
    while let Ok(event) = ui.try_recv() {
        if event == (UiEvent::Response { content: "bye".to_string(), tools_used: Vec::new() }) {
            saw_response = true;
        }
    }
    assert!(saw_response);
}
