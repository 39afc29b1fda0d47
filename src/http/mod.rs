//! Streamable HTTP transport
//!
//! JSON-RPC messages are POSTed to `/mcp`; health and discovery metadata are served alongside.

pub mod handlers;
