//! ruty: client core of an AI-assisted launcher
//!
//! This library provides:
//! - Query resolution from launcher input to ranked, executable results
//! - Slash commands backed by pluggable search collaborators
//! - Keyboard selection over the resolved list
//! - A session channel to the assistant backend with stream, fallback and retry
//! - A debounced input pipeline tying the pieces together

pub mod backend;
pub mod collaborators;
pub mod commands;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod resolver;
pub mod selection;
pub mod session;
pub mod transport;

pub use config::Config;
pub use pipeline::{AppEvent, InputPipeline, UiEvent};
pub use resolver::QueryResolver;
pub use session::SessionChannel;
