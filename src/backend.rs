//! The seam between the HTTP layer and whatever produces a reply.

use async_trait::async_trait;

use crate::relay::chunk::Assembled;
use crate::relay::client::UpstreamClient;
use crate::relay::error::RelayError;

/// Something that turns a prompt into a reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn reply(&self, prompt: &str) -> Result<Assembled, RelayError>;

    /// Short human-readable description for logs and `/health`.
    fn describe(&self) -> String;

    fn is_mock(&self) -> bool {
        false
    }
}

#[async_trait]
impl ChatBackend for UpstreamClient {
    async fn reply(&self, prompt: &str) -> Result<Assembled, RelayError> {
        self.assemble(prompt).await
    }

    fn describe(&self) -> String {
        format!("{} ({}, {:?})", self.endpoint(), self.model(), self.mode())
    }
}
