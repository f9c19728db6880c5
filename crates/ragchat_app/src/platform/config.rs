use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::LevelFilter;
use ragchat_engine::{
    AskMode, BackendSettings, EngineSettings, PollSettings, RevealSettings, StatusEndpoint,
};
use serde::Deserialize;

use super::logging::LogDestination;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub reveal: RevealConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusRoute {
    #[default]
    Status,
    Process,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub status_endpoint: StatusRoute,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            status_endpoint: StatusRoute::default(),
            connect_timeout_secs: None,
            request_timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_ticks: default_max_ticks(),
        }
    }
}

fn default_interval_ms() -> u64 {
    2000
}
fn default_max_ticks() -> u32 {
    900
}

#[derive(Debug, Deserialize, Clone)]
pub struct RevealConfig {
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            chunk_chars: default_chunk_chars(),
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_chunk_chars() -> usize {
    3
}
fn default_delay_ms() -> u64 {
    3
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AskModeConfig {
    #[default]
    Buffered,
    Streaming,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChatConfig {
    #[serde(default)]
    pub ask_mode: AskModeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    #[serde(default = "default_success_display_secs")]
    pub success_display_secs: u64,
    /// Reprint finished answers with terminal Markdown styling.
    #[serde(default = "default_render_markdown")]
    pub render_markdown: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            success_display_secs: default_success_display_secs(),
            render_markdown: default_render_markdown(),
        }
    }
}

fn default_success_display_secs() -> u64 {
    5
}
fn default_render_markdown() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default)]
    pub destination: LogDestination,
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            destination: LogDestination::default(),
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    pub fn level_filter(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::Info)
    }
}

impl AppConfig {
    pub fn success_display(&self) -> Duration {
        Duration::from_secs(self.ui.success_display_secs)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            backend: BackendSettings {
                base_url: self.backend.base_url.clone(),
                status_endpoint: match self.backend.status_endpoint {
                    StatusRoute::Status => StatusEndpoint::Status,
                    StatusRoute::Process => StatusEndpoint::Process,
                },
                connect_timeout: self.backend.connect_timeout_secs.map(Duration::from_secs),
                request_timeout: self.backend.request_timeout_secs.map(Duration::from_secs),
                ..BackendSettings::default()
            },
            poll: PollSettings {
                interval: Duration::from_millis(self.polling.interval_ms),
                max_ticks: self.polling.max_ticks,
            },
            reveal: RevealSettings {
                chunk_chars: self.reveal.chunk_chars,
                chunk_delay: Duration::from_millis(self.reveal.delay_ms),
            },
            ask_mode: match self.chat.ask_mode {
                AskModeConfig::Buffered => AskMode::Buffered,
                AskModeConfig::Streaming => AskMode::Streaming,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            anyhow::bail!("backend.base_url must not be empty");
        }
        if self.polling.interval_ms == 0 {
            anyhow::bail!("polling.interval_ms must be > 0");
        }
        if self.polling.max_ticks == 0 {
            anyhow::bail!("polling.max_ticks must be > 0");
        }
        if self.reveal.chunk_chars == 0 {
            anyhow::bail!("reveal.chunk_chars must be > 0");
        }
        if self.logging.level.parse::<LevelFilter>().is_err() {
            anyhow::bail!(
                "logging.level '{}' is not one of off, error, warn, info, debug, trace",
                self.logging.level
            );
        }
        Ok(())
    }
}

/// Reads the TOML config at `path`; a missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?
    } else {
        AppConfig {
            state_dir: default_state_dir(),
            ..AppConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

fn parse_config(content: &str) -> Result<AppConfig> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}
