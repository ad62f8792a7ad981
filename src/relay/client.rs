//! HTTP client for the upstream chat API.

use reqwest::Url;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, ResponseMode, UpstreamConfig};
use crate::relay::chunk::{assemble_single, assemble_stream, Assembled};
use crate::relay::error::RelayError;

/// Body posted to the upstream chat endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamRequest {
    pub model: String,
    pub messages: Vec<UpstreamMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamMessage {
    pub role: String,
    pub content: String,
}

impl UpstreamRequest {
    /// A single-turn request carrying one user message.
    pub fn user(model: &str, prompt: &str, stream: Option<bool>) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![UpstreamMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream,
        }
    }
}

/// Relay to one upstream endpoint. Cheap to share: the inner reqwest
/// client pools connections and holds no per-request state.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    endpoint: Url,
    model: String,
    mode: ResponseMode,
    force_stream_flag: bool,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ConfigError> {
        let endpoint = config.parsed_url()?;
        if config.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout());
        if !config.use_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            http: builder.build()?,
            endpoint,
            model: config.model.clone(),
            mode: config.mode,
            force_stream_flag: config.force_stream_flag,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// Build the payload for `prompt` under the configured response mode.
    pub fn request_for(&self, prompt: &str) -> UpstreamRequest {
        let stream = match self.mode {
            ResponseMode::Single => Some(false),
            ResponseMode::Streaming if self.force_stream_flag => Some(true),
            ResponseMode::Streaming => None,
        };
        UpstreamRequest::user(&self.model, prompt, stream)
    }

    /// Send `prompt` upstream and assemble the reply.
    ///
    /// One POST, no retries. On any whole-call failure the partial text is
    /// discarded.
    pub async fn assemble(&self, prompt: &str) -> Result<Assembled, RelayError> {
        let body = self.request_for(prompt);

        debug!(endpoint = %self.endpoint, model = %self.model, mode = ?self.mode, "Posting to upstream");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(RelayError::classify)?;

        let status = response.status();
        info!(status = status.as_u16(), "Upstream API status");

        if !status.is_success() {
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to read upstream error body");
                    String::new()
                }
            };
            error!(status = status.as_u16(), body = %text, "Upstream API error");
            return Err(RelayError::UpstreamRejected(status, text));
        }

        let assembled = match self.mode {
            ResponseMode::Streaming => assemble_stream(response.bytes_stream())
                .await
                .map_err(RelayError::classify)?,
            ResponseMode::Single => {
                let bytes = response.bytes().await.map_err(RelayError::classify)?;
                assemble_single(&bytes)?
            }
        };

        info!(
            fragments = assembled.fragments,
            skipped = assembled.skipped,
            chars = assembled.text.chars().count(),
            "Assembled upstream response"
        );

        Ok(assembled)
    }
}

/// One-shot relay: POST `prompt` to `endpoint` for `model` with default
/// settings and return the assembled text.
pub async fn assemble(endpoint: &str, model: &str, prompt: &str) -> Result<String, RelayError> {
    let config = UpstreamConfig {
        url: endpoint.to_string(),
        model: model.to_string(),
        ..Default::default()
    };
    let client = UpstreamClient::new(&config).map_err(|e| RelayError::Transport(e.to_string()))?;
    Ok(client.assemble(prompt).await?.text)
}
