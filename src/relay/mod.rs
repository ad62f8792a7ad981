//! Relay of a single prompt to the upstream chat API.
//!
//! - [`chunk`]: line buffering and per-chunk fragment extraction
//! - [`client`]: the outbound POST and response-mode handling
//! - [`error`]: classification of whole-call failures

pub mod chunk;
pub mod client;
pub mod error;

pub use chunk::{Assembled, ChunkAssembler};
pub use client::{assemble, UpstreamClient, UpstreamRequest};
pub use error::RelayError;
