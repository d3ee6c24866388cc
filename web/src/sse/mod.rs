//! SSE HTTP handler for the web layer.
//!
//! This module contains only the Axum handler for the stream endpoint.
//! The session core (Manager, SessionRegistry, event loop) lives in the `sse`
//! crate so it can be exercised without an HTTP stack.

pub mod handler;
