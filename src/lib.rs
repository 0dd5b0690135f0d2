//! Slack MCP bridge
//!
//! Exposes Slack capabilities (search, channel listing, message history,
//! posting, user listing) to AI assistants through an MCP-style JSON-RPC
//! surface, with a browser-mediated credential handoff:
//!
//! - **User registry**: validates a user's Slack token and mints an opaque
//!   bridge api key (`smcp_…`) that wraps it
//! - **OAuth exchange**: a short-lived, single-use authorization code bridges
//!   the human connect step and the machine token-exchange step, so the raw
//!   Slack secret never appears in a URL or reaches the assistant
//! - **Tool surface**: five schema-described Slack tools behind bearer-key
//!   auth, each one outbound API call rendered as display text

pub mod config;
pub mod constants;
pub mod error;
pub mod http;
pub mod oauth;
pub mod registry;
pub mod slack;
pub mod store;
pub mod tools;

pub use error::{BridgeError, Result};
