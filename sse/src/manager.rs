use crate::error::Result;
use crate::message::Payload;
use crate::registry::{Delivery, SessionRegistry};
use crate::session::{Session, SessionId, UserId};
use log::*;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;

/// Delivery queue slots per session when no capacity is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

pub struct Manager {
    registry: Arc<SessionRegistry<Payload>>,
    queue_capacity: usize,
}

impl Manager {
    /// Create a manager whose sessions buffer up to `queue_capacity` undelivered values.
    /// A capacity of zero is raised to one.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Open and register a new session for `user_id`.
    ///
    /// The returned subscription owns the receiving end of the session's delivery
    /// queue and unregisters the session when dropped.
    pub fn open_session(&self, user_id: UserId) -> Result<Subscription<Payload>> {
        let subscription = Subscription::register(&self.registry, user_id, self.queue_capacity)?;
        info!(
            "Registered new SSE session {} for user {}",
            subscription.id(),
            subscription.user_id()
        );
        Ok(subscription)
    }

    /// Unregister a session by ID. Safe to call for an already removed session.
    pub fn close_session(&self, id: &SessionId) -> bool {
        self.registry.remove(id)
    }

    /// Push `value` to every session currently open for `user_id`.
    pub fn dispatch(&self, user_id: &str, value: Payload) -> Delivery {
        let delivery = self.registry.send_to_user(user_id, &value);
        debug!(
            "Dispatched value to user {}: sent={} matched={}",
            user_id, delivery.sent, delivery.matched
        );
        delivery
    }

    /// Close every session and refuse new ones. Each stream loop observes its closed
    /// queue after draining what was already buffered, then exits.
    pub fn close_all(&self) -> usize {
        let closed = self.registry.close_all();
        info!("Closed {closed} SSE session(s)");
        closed
    }

    pub fn session_count(&self) -> usize {
        self.registry.count()
    }

    pub fn dropped_total(&self) -> u64 {
        self.registry.dropped_total()
    }

    pub fn is_closed(&self) -> bool {
        self.registry.is_closed()
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

/// Receiving side of one registered session.
///
/// Dropping the subscription removes its session from the registry. This runs
/// exactly once on every exit path of the owning stream: queue closed, client
/// disconnect or transport write failure.
pub struct Subscription<T> {
    id: SessionId,
    user_id: UserId,
    receiver: Receiver<T>,
    registry: Arc<SessionRegistry<T>>,
}

impl<T> Subscription<T> {
    /// Create a session with a fresh delivery queue and add it to `registry`.
    pub(crate) fn register(
        registry: &Arc<SessionRegistry<T>>,
        user_id: UserId,
        capacity: usize,
    ) -> Result<Self> {
        let (session, receiver) = Session::new(user_id.clone(), capacity);
        let id = registry.add(session)?;

        Ok(Self {
            id,
            user_id,
            receiver,
            registry: Arc::clone(registry),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Wait for the next delivered value. `None` means the queue was closed.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        // Already gone when a shutdown closed every session first
        if self.registry.remove(&self.id) {
            debug!("Unregistered SSE session {}", self.id);
        }
        info!("SSE disconnected: user_id={}", self.user_id);
    }
}
