//! HTTP server for the chat frontend.
//!
//! - [`chat_api`]: request/response types, route handlers and error mapping

pub mod chat_api;
