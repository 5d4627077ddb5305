//! Configuration management for ruty

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub input: InputConfig,
    pub search: SearchConfig,
    /// Provider id -> API key, forwarded with every chat request
    pub api_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// Streaming endpoint root; derived from `base_url` when unset
    pub ws_url: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3847".to_string(),
            ws_url: None,
            request_timeout_secs: 60,
        }
    }
}

impl BackendConfig {
    /// Root URL of the streaming endpoint (`ws://` or `wss://`)
    pub fn stream_base(&self) -> String {
        if let Some(ws) = &self.ws_url {
            return ws.trim_end_matches('/').to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Retry policies of the session channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// First delay of the liveness probe backoff
    pub probe_base_delay_ms: u64,
    pub probe_growth: f64,
    pub probe_max_delay_ms: u64,
    /// Probe attempts before the session is marked degraded
    pub probe_max_attempts: u32,
    /// Fixed delay between reconnects after an established channel dropped
    pub reconnect_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            probe_base_delay_ms: 500,
            probe_growth: 1.5,
            probe_max_delay_ms: 5000,
            probe_max_attempts: 10,
            reconnect_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub debounce_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

impl InputConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Shortest argument accepted by /app, /file and /folder
    pub min_query_chars: usize,
    pub max_file_results: usize,
    pub clipboard_preview_chars: usize,
    /// Directories searched by the filesystem collaborator
    pub file_roots: Vec<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_chars: 2,
            max_file_results: 20,
            clipboard_preview_chars: 50,
            file_roots: default_file_roots(),
        }
    }
}

fn default_file_roots() -> Vec<PathBuf> {
    let Some(dirs) = directories::UserDirs::new() else {
        return Vec::new();
    };
    let home = dirs.home_dir().to_path_buf();
    let mut roots: Vec<PathBuf> = ["Documents", "Downloads", "Desktop", "Projects"]
        .iter()
        .map(|sub| home.join(sub))
        .collect();
    roots.push(home);
    roots
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid config {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "ruty") {
            let config_dir = proj_dirs.config_dir();
            std::fs::create_dir_all(config_dir)?;
            Ok(config_dir.join("config.toml"))
        } else {
            Ok(PathBuf::from("config.toml"))
        }
    }

    /// Save configuration to default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
