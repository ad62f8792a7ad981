//! Incremental assembly of an upstream chat reply.
//!
//! The upstream answers with newline-delimited JSON objects, each carrying a
//! text fragment under `message.content`. Transport reads do not line up with
//! object boundaries, so bytes are buffered until a full line is available.
//! A line that fails to parse, or lacks the content field, is skipped and
//! assembly carries on with the next one.

use bytes::{Bytes, BytesMut};
use futures::Stream;
use serde_json::Value;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::relay::error::RelayError;

/// Why a chunk contributed nothing to the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Not valid JSON.
    InvalidJson(String),
    /// Valid JSON without a string at `message.content`.
    MissingContent,
    /// The upstream reported an error in-band (`{"error": "..."}`).
    UpstreamError(String),
}

/// Result of looking at a single line of the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Fragment(String),
    Skipped(SkipReason),
    Blank,
}

/// Parse one line of the upstream body.
pub fn parse_chunk(line: &[u8]) -> ChunkOutcome {
    let line = line.trim_ascii();
    if line.is_empty() {
        return ChunkOutcome::Blank;
    }

    match serde_json::from_slice::<Value>(line) {
        Ok(value) => extract_fragment(&value),
        Err(e) => ChunkOutcome::Skipped(SkipReason::InvalidJson(e.to_string())),
    }
}

fn extract_fragment(value: &Value) -> ChunkOutcome {
    let content = value
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str);

    match content {
        Some(text) => ChunkOutcome::Fragment(text.to_string()),
        None => match value.get("error").and_then(Value::as_str) {
            Some(err) => ChunkOutcome::Skipped(SkipReason::UpstreamError(err.to_string())),
            None => ChunkOutcome::Skipped(SkipReason::MissingContent),
        },
    }
}

/// Final product of one assembly run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembled {
    /// Fragments concatenated in arrival order.
    pub text: String,
    /// Number of chunks that contributed a fragment.
    pub fragments: usize,
    /// Number of chunks skipped as malformed or field-less.
    pub skipped: usize,
}

/// Line-buffering accumulator for a streamed reply.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    buf: BytesMut,
    /// Prefix of `buf` already known to hold no newline.
    scanned: usize,
    out: Assembled,
}

impl ChunkAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw body bytes. Every complete line is parsed immediately;
    /// a trailing partial line waits for more data or [`finish`](Self::finish).
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        while let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            let pos = self.scanned + offset;
            let line = self.buf.split_to(pos + 1);
            self.scanned = 0;
            self.accept(&line[..pos]);
        }
        self.scanned = self.buf.len();
    }

    /// Flush an unterminated final line and return the assembled reply.
    pub fn finish(mut self) -> Assembled {
        if !self.buf.is_empty() {
            let rest = self.buf.split();
            self.scanned = 0;
            self.accept(&rest);
        }
        self.out
    }

    /// Text assembled so far.
    pub fn text(&self) -> &str {
        &self.out.text
    }

    fn accept(&mut self, line: &[u8]) {
        match parse_chunk(line) {
            ChunkOutcome::Fragment(text) => {
                self.out.text.push_str(&text);
                self.out.fragments += 1;
            }
            ChunkOutcome::Skipped(reason) => {
                self.out.skipped += 1;
                match reason {
                    SkipReason::InvalidJson(e) => warn!(error = %e, "Skipping chunk due to error"),
                    SkipReason::UpstreamError(e) => warn!(upstream_error = %e, "Skipping upstream error chunk"),
                    SkipReason::MissingContent => debug!("Skipping chunk without message.content"),
                }
            }
            ChunkOutcome::Blank => {}
        }
    }
}

/// Drive a [`ChunkAssembler`] over a byte stream until it closes.
///
/// A stream error aborts assembly; the partial text is dropped with it.
pub async fn assemble_stream<S, E>(stream: S) -> Result<Assembled, E>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    tokio::pin!(stream);
    let mut assembler = ChunkAssembler::new();
    while let Some(bytes) = stream.next().await {
        assembler.feed(&bytes?);
    }
    Ok(assembler.finish())
}

/// Parse a non-streaming body: exactly one JSON object.
///
/// An unparseable body is a whole-call failure; a valid object without
/// `message.content` yields an empty reply.
pub fn assemble_single(body: &[u8]) -> Result<Assembled, RelayError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| RelayError::MalformedResponse(e.to_string()))?;

    let mut out = Assembled::default();
    match extract_fragment(&value) {
        ChunkOutcome::Fragment(text) => {
            out.text = text;
            out.fragments = 1;
        }
        ChunkOutcome::Skipped(reason) => {
            warn!(?reason, "Upstream body has no message.content");
            out.skipped = 1;
        }
        ChunkOutcome::Blank => {}
    }
    Ok(out)
}
