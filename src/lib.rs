//! ollama-chat-relay: forwards chat prompts to an Ollama-style API.
//!
//! The upstream answers with newline-delimited JSON chunks; the relay
//! concatenates each chunk's `message.content` into one reply and hands it
//! back to the browser as `{"response": "..."}`.

pub mod backend;
pub mod config;
pub mod metrics;
pub mod mock;
pub mod relay;
pub mod server;
