//! Canned replies for demos without a model server.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::backend::ChatBackend;
use crate::config::MockConfig;
use crate::relay::chunk::Assembled;
use crate::relay::error::RelayError;

const GREETINGS: &[&str] = &["hello", "hi", "hey"];

pub struct MockResponder {
    responses: Vec<String>,
    delay: Duration,
}

impl MockResponder {
    pub fn new(config: &MockConfig) -> Self {
        Self {
            responses: config.responses.clone(),
            delay: Duration::from_millis(config.delay_ms),
        }
    }

    /// Pick a canned reply and prefix it according to keywords in `prompt`.
    pub fn compose(&self, prompt: &str) -> String {
        let body = self
            .responses
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or_default();
        format!("{}{}", prefix_for(prompt), body)
    }
}

fn prefix_for(prompt: &str) -> &'static str {
    let lower = prompt.to_lowercase();
    let is_greeting = lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| GREETINGS.contains(&word));

    if lower.contains("translate") {
        "Translation mode: "
    } else if is_greeting {
        "Hello! "
    } else if lower.trim_end().ends_with('?') {
        "Good question. "
    } else {
        ""
    }
}

#[async_trait]
impl ChatBackend for MockResponder {
    async fn reply(&self, prompt: &str) -> Result<Assembled, RelayError> {
        tokio::time::sleep(self.delay).await;
        let text = self.compose(prompt);
        debug!(reply = %text, "Mock reply");
        Ok(Assembled {
            text,
            fragments: 1,
            skipped: 0,
        })
    }

    fn describe(&self) -> String {
        format!("mock ({} canned replies)", self.responses.len())
    }

    fn is_mock(&self) -> bool {
        true
    }
}
