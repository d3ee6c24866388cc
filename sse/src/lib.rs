//! Server-Sent Events (SSE) session core for the push relay.
//!
//! Clients open a long-lived stream tagged with a user key; any caller can then
//! push a value to every stream currently open for that key.
//!
//! # Architecture
//!
//! - **Session**: one live connection: identity, user key and the sending half of
//!   a bounded delivery queue. Dropping the session closes its queue.
//! - **Session registry**: a single mutex-guarded collection of live sessions.
//!   Add, remove, close-all and dispatch enumeration share the same lock, which is
//!   never held across an await point.
//! - **Best-effort dispatch**: values are offered with a non-blocking enqueue.
//!   A full queue (slow consumer) drops the value for that session and the drop is
//!   counted; one stalled client never stalls a dispatcher.
//! - **Ephemeral messages**: nothing is stored. A client that is not connected
//!   misses the value.
//!
//! # Message Flow
//!
//! 1. A client opens `/sse?userID=...`
//! 2. `Manager::open_session` registers a session and returns a `Subscription`
//! 3. `stream::event_stream` drives the connection: it waits on the subscription
//!    and a keep-alive timer and formats each value as a `current-value` event
//! 4. `Manager::dispatch` offers a value to each session of the target user
//! 5. On disconnect the stream is dropped, dropping the subscription, which
//!    removes the session. On shutdown `Manager::close_all` closes every queue and
//!    each stream ends after draining what was already buffered.
//!
//! # Modules
//!
//! - `session`: Session and its type-safe SessionId
//! - `registry`: SessionRegistry and the per-dispatch Delivery outcome
//! - `manager`: High-level facade and the RAII Subscription
//! - `message`: Payload type and event record formatting
//! - `stream`: The per-connection event loop

pub mod error;
pub mod manager;
pub mod message;
pub mod registry;
pub mod session;
pub mod stream;

pub use manager::{Manager, Subscription};
pub use registry::Delivery;
