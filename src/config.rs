//! Runtime configuration for ollama-chat-relay.
//!
//! Configuration is loaded once at startup from a JSON file (or defaults),
//! then patched with command-line / environment overrides and passed
//! explicitly to the components that need it.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Command-line arguments.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ollama-chat-relay", about = "Chat relay in front of an Ollama-style API")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address.
    #[arg(long, default_value = "0.0.0.0:8000")]
    pub listen: String,

    /// Upstream chat endpoint, overrides `upstream.url`.
    #[arg(long, env = "OLLAMA_API")]
    pub upstream_url: Option<String>,

    /// Upstream model identifier, overrides `upstream.model`.
    #[arg(long, env = "OLLAMA_MODEL")]
    pub model: Option<String>,

    /// Serve canned replies instead of calling the upstream.
    #[arg(long, env = "MOCK_MODE")]
    pub mock: Option<bool>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid upstream URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Upstream model must not be empty")]
    EmptyModel,

    #[error("Upstream timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Mock mode is enabled but no mock responses are configured")]
    NoMockResponses,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inbound HTTP settings.
    pub server: ServerConfig,

    /// Upstream chat API settings.
    pub upstream: UpstreamConfig,

    /// Demo responder settings.
    pub mock: MockConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Origins allowed by CORS. `"*"` allows any origin.
    pub cors_origins: Vec<String>,

    /// Directory holding the browser frontend, served at `/` when set.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cors_origins: vec!["http://localhost:5500".to_string()],
            static_dir: None,
        }
    }
}

/// How the upstream body is consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Newline-delimited JSON; malformed lines are skipped.
    #[default]
    Streaming,
    /// One JSON object for the whole body.
    Single,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Chat endpoint URL, e.g. `http://localhost:11434/api/chat`.
    pub url: String,

    /// Model identifier sent with every request.
    pub model: String,

    /// Whole-request timeout in seconds (headers and body).
    pub timeout_secs: u64,

    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,

    pub mode: ResponseMode,

    /// Send `"stream": true` explicitly in streaming mode.
    pub force_stream_flag: bool,

    /// Honour `HTTP_PROXY`-style environment variables for upstream calls.
    pub use_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434/api/chat".to_string(),
            model: "nexus".to_string(),
            timeout_secs: 120,
            connect_timeout_secs: 5,
            mode: ResponseMode::Streaming,
            force_stream_flag: false,
            use_proxy: false,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Parse `url`, accepting only http and https.
    pub fn parsed_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme {other:?}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    pub enabled: bool,

    /// Fixed delay before each canned reply, in milliseconds.
    pub delay_ms: u64,

    /// Canned replies, one picked at random per request.
    pub responses: Vec<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_ms: 1000,
            responses: vec![
                "This is a demo reply. The model server is not connected.".to_string(),
                "I'm running in mock mode, so this answer is canned.".to_string(),
                "Mock mode is on. Start the model server to get real answers.".to_string(),
            ],
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Apply command-line / environment overrides on top of the loaded file.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.upstream_url {
            self.upstream.url = url.clone();
        }
        if let Some(model) = &cli.model {
            self.upstream.model = model.clone();
        }
        if let Some(mock) = cli.mock {
            self.mock.enabled = mock;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.upstream.parsed_url()?;
        if self.upstream.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.mock.enabled && self.mock.responses.is_empty() {
            return Err(ConfigError::NoMockResponses);
        }
        Ok(())
    }
}
