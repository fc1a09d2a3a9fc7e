//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `ws` - WebSocket conversation session handling

pub mod api;
pub mod ws;
