//! CLI transport: one-shot commands and the line-oriented pipe driver

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::backend::{Backend, HttpBackend};
use crate::collaborators::{ClipboardHistory, FileSearch, MemoryClipboard, WalkFileSearch};
use crate::commands::builtin::{register_all, Capabilities};
use crate::commands::CommandRegistry;
use crate::config::Config;
use crate::core::{ActionIntent, ChannelState, Session};
use crate::pipeline::{AppEvent, InputPipeline, ResultView, UiEvent};
use crate::resolver::QueryResolver;
use crate::session::{ChannelEvent, SessionChannel, SessionEvent};

/// Resolver over the built-in commands with local collaborators
fn build_resolver(
    config: &Config,
    backend: Arc<dyn Backend>,
    session_id: &str,
    clipboard: Arc<MemoryClipboard>,
) -> Result<QueryResolver> {
    let files: Arc<dyn FileSearch> = Arc::new(WalkFileSearch::new(config.search.file_roots.clone()));
    let clipboard: Arc<dyn ClipboardHistory> = clipboard;
    let caps = Capabilities {
        backend,
        session_id: session_id.to_string(),
        // No portable application index; /app reports itself unavailable
        apps: None,
        files: Some(files),
        clipboard: Some(clipboard),
        search: config.search.clone(),
    };

    let mut registry = CommandRegistry::new();
    register_all(&mut registry, &caps)?;
    Ok(QueryResolver::new(Arc::new(registry)))
}

fn http_backend(config: &Config) -> Result<Arc<HttpBackend>> {
    let backend = HttpBackend::new(&config.backend).context("Failed to create HTTP client")?;
    Ok(Arc::new(backend))
}

/// Resolve one query and print the candidate list as JSON
pub async fn run_resolve(config: &Config, query: &str) -> Result<()> {
    let backend = http_backend(config)?;
    let session = Session::new();
    let resolver = build_resolver(config, backend, &session.id, Arc::new(MemoryClipboard::new()))?;

    let results = resolver.resolve(query).await;
    let views: Vec<ResultView> = results.iter().map(ResultView::from).collect();
    println!("{}", serde_json::to_string_pretty(&views)?);
    Ok(())
}

/// Probe the backend once
pub async fn run_health(config: &Config) -> Result<()> {
    let backend = http_backend(config)?;
    match backend.health().await {
        Ok(health) => {
            println!("Backend:  {}", config.backend.base_url);
            println!("Provider: {}", health.provider);
            println!("Model:    {}", health.model);
            Ok(())
        }
        Err(e) => bail!("Backend at {} is not reachable: {}", config.backend.base_url, e),
    }
}

/// Print the effective configuration as TOML
pub fn run_config_show(config: &Config) -> Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Ask the assistant one question through a fresh session
///
/// Waits for the first acquisition outcome so a healthy backend answers over
/// the stream; otherwise the one-shot fallback is used.
pub async fn run_ask(config: &Config, message: &str) -> Result<()> {
    let backend = http_backend(config)?;
    let (mut channel, mut rx) = SessionChannel::new(
        Session::new(),
        backend,
        &config.session,
        config.api_keys.clone(),
    );

    channel.start();
    report(&mut channel);
    while channel.state() != ChannelState::Connected
        && channel.pending_retry().is_none()
        && !channel.is_degraded()
    {
        pump(&mut channel, &mut rx).await?;
    }

    channel.send_query(message);
    let mut outcome = report(&mut channel);
    let wait = async {
        while channel.is_busy() {
            pump(&mut channel, &mut rx).await?;
            if let Some(done) = report(&mut channel) {
                outcome = Some(done);
            }
        }
        Ok::<_, anyhow::Error>(())
    };
    tokio::time::timeout(config.backend.request_timeout(), wait)
        .await
        .context("Timed out waiting for the assistant")??;

    match outcome {
        Some(Ok(content)) => {
            println!("{}", content);
            Ok(())
        }
        Some(Err(message)) => bail!(message),
        None => bail!("The assistant finished without a response"),
    }
}

async fn pump(
    channel: &mut SessionChannel,
    rx: &mut mpsc::UnboundedReceiver<ChannelEvent>,
) -> Result<()> {
    let event = rx.recv().await.context("Session channel closed")?;
    channel.handle(event);
    Ok(())
}

/// Log session events; returns the terminal outcome if one arrived
fn report(channel: &mut SessionChannel) -> Option<Result<String, String>> {
    let mut outcome = None;
    for event in channel.drain_events() {
        match event {
            SessionEvent::StateChanged(state) => tracing::debug!(?state, "Connection state"),
            SessionEvent::Degraded => {
                tracing::warn!("Backend unreachable, answering without the stream")
            }
            SessionEvent::ToolUsed(name) => eprintln!("(using {})", name),
            SessionEvent::Response {
                content,
                tools_used,
            } => {
                if !tools_used.is_empty() {
                    eprintln!("(used {})", tools_used.join(", "));
                }
                outcome = Some(Ok(content));
            }
            SessionEvent::Failed(message) => outcome = Some(Err(message)),
        }
    }
    outcome
}

/// One line of pipe input
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
enum PipeInput {
    Input { text: String },
    Key { key: String },
    Hover { index: usize },
    Pick { index: usize },
}

fn parse_key(name: &str) -> Option<KeyEvent> {
    let (code, modifiers) = match name.to_lowercase().as_str() {
        "up" => (KeyCode::Up, KeyModifiers::NONE),
        "down" => (KeyCode::Down, KeyModifiers::NONE),
        "tab" => (KeyCode::Tab, KeyModifiers::NONE),
        "shift+tab" | "backtab" => (KeyCode::BackTab, KeyModifiers::SHIFT),
        "enter" => (KeyCode::Enter, KeyModifiers::NONE),
        "shift+enter" => (KeyCode::Enter, KeyModifiers::SHIFT),
        "esc" | "escape" => (KeyCode::Esc, KeyModifiers::NONE),
        _ => return None,
    };
    Some(KeyEvent::new(code, modifiers))
}

fn to_app_event(line: &str) -> Result<AppEvent> {
    let input: PipeInput = serde_json::from_str(line).context("Invalid input event")?;
    Ok(match input {
        PipeInput::Input { text } => AppEvent::Input(text),
        PipeInput::Key { key } => match parse_key(&key) {
            Some(key) => AppEvent::Key(key),
            None => bail!("Unknown key: {}", key),
        },
        PipeInput::Hover { index } => AppEvent::Hover(index),
        PipeInput::Pick { index } => AppEvent::Pick(index),
    })
}

/// Drive the input pipeline from JSON lines on stdin
///
/// Every UI event is written to stdout as one JSON line. End of input
/// shuts down once the outstanding query (if any) has finished.
pub async fn run_pipe(config: &Config) -> Result<()> {
    let backend = http_backend(config)?;
    let session = Session::new();
    tracing::info!(session_id = %session.id, backend = %config.backend.base_url, "Starting pipe session");

    let clipboard = Arc::new(MemoryClipboard::new());
    let resolver = build_resolver(config, backend.clone(), &session.id, Arc::clone(&clipboard))?;
    let api_keys: HashMap<String, String> = config.api_keys.clone();
    let (channel, channel_events) = SessionChannel::new(session, backend, &config.session, api_keys);

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let (pipeline, events) =
        InputPipeline::new(resolver, channel, channel_events, &config.input, ui_tx);

    // A plain thread: a blocked stdin read must not hold up shutdown
    let input = pipeline.sender();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!("Failed to read stdin: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match to_app_event(&line) {
                Ok(event) => {
                    if input.send(event).is_err() {
                        return;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Skipping input line"),
            }
        }
        let _ = input.send(AppEvent::Shutdown);
    });

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(event) = ui_rx.recv().await {
            // Copied values feed /clip
            if let UiEvent::Intent { intent } = &event {
                match intent {
                    ActionIntent::Copy { text } => {
                        clipboard.record(text.clone());
                    }
                    ActionIntent::CopyToClipboard { content } => {
                        clipboard.record(content.clone());
                    }
                    _ => {}
                }
            }
            let Ok(mut line) = serde_json::to_string(&event) else {
                continue;
            };
            line.push('\n');
            if stdout.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    pipeline.run(events).await;
    writer.await.context("Output task failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_names() {
        assert_eq!(
            parse_key("Down"),
            Some(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE))
        );
        assert_eq!(
            parse_key("shift+enter"),
            Some(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT))
        );
        assert!(parse_key("f13").is_none());
    }

    #[test]
    fn test_pipe_lines() {
        assert!(matches!(
            to_app_event(r#"{"event":"input","text":"2+2"}"#).unwrap(),
            AppEvent::Input(text) if text == "2+2"
        ));
        assert!(matches!(
            to_app_event(r#"{"event":"pick","index":1}"#).unwrap(),
            AppEvent::Pick(1)
        ));
        assert!(to_app_event(r#"{"event":"key","key":"f13"}"#).is_err());
        assert!(to_app_event("not json").is_err());
    }
}
