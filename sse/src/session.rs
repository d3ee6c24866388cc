use std::fmt;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};

// Type alias for user keys supplied by clients when opening a stream
pub type UserId = String;

/// Unique identifier for a session (server-generated)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One live streaming connection for a user.
///
/// The session owns the only sender of its delivery queue, so the queue is closed
/// exactly when the session is dropped. The registry drops a session only after
/// removing it from its collection, which keeps closing and removal atomic.
#[derive(Debug)]
pub struct Session<T> {
    id: SessionId,
    user_id: UserId,
    sender: Sender<T>,
}

impl<T> Session<T> {
    /// Creates a session with a fresh bounded delivery queue of `capacity` slots and
    /// returns the receiving half for the stream loop.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero, like `tokio::sync::mpsc::channel`.
    pub fn new(user_id: UserId, capacity: usize) -> (Self, Receiver<T>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let session = Self {
            id: SessionId::new(),
            user_id,
            sender,
        };
        (session, receiver)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Attempts a non-blocking enqueue. Never waits for queue capacity.
    pub(crate) fn try_deliver(&self, value: T) -> Result<(), TrySendError<T>> {
        self.sender.try_send(value)
    }

    #[cfg(test)]
    pub(crate) fn set_id_for_test(&mut self, id: SessionId) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        let (a, _rx_a) = Session::<u32>::new("123".to_string(), 1);
        let (b, _rx_b) = Session::<u32>::new("123".to_string(), 1);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.user_id(), "123");
    }

    #[tokio::test]
    async fn dropping_session_closes_queue() {
        let (session, mut rx) = Session::new("123".to_string(), 2);
        session.try_deliver(7u32).unwrap();
        drop(session);

        // Buffered values are still drained before the close is observed
        assert_eq!(rx.recv().await, Some(7));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn try_deliver_reports_full_queue() {
        let (session, _rx) = Session::new("123".to_string(), 1);
        assert!(session.try_deliver(1u32).is_ok());
        assert!(matches!(session.try_deliver(2), Err(TrySendError::Full(2))));
    }
}
