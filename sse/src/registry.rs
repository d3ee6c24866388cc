use crate::error::{Error, ErrorKind, Result};
use crate::session::{Session, SessionId};
use log::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::error::TrySendError;

/// Outcome of one dispatch to a user key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Sessions whose user key matched the target.
    pub matched: usize,
    /// Sessions that accepted the value into their delivery queue.
    pub sent: usize,
    /// Matching sessions that could not take the value (full or closing queue).
    pub dropped: usize,
}

struct RegistryState<T> {
    sessions: Vec<Session<T>>,
    closed: bool,
}

/// Mutex-guarded collection of every live session.
///
/// A single lock covers mutation (add/remove/close_all) and enumeration
/// (send_to_user/count). It is only held for the collection operation itself,
/// never across an await point or transport write. Removing a session from the
/// collection drops it, which closes its delivery queue under the same lock
/// acquisition, so enumeration never observes a closed queue.
pub struct SessionRegistry<T> {
    state: Mutex<RegistryState<T>>,
    dropped: AtomicU64,
}

impl<T> SessionRegistry<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                sessions: Vec::new(),
                closed: false,
            }),
            dropped: AtomicU64::new(0),
        }
    }

    // Every critical section leaves the state consistent, so a panic elsewhere
    // while holding the lock does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, RegistryState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a session, making it visible to subsequent dispatches and counts.
    ///
    /// Rejected once `close_all` has run, since a session added afterwards would
    /// never be drained. The rejected session is dropped, closing its queue.
    pub fn add(&self, session: Session<T>) -> Result<SessionId> {
        let mut state = self.lock();

        if state.closed {
            return Err(Error::new(ErrorKind::RegistryClosed));
        }

        let id = session.id();
        if state.sessions.iter().any(|s| s.id() == id) {
            return Err(Error::new(ErrorKind::DuplicateSession));
        }

        state.sessions.push(session);
        Ok(id)
    }

    /// Remove a session by identity and close its delivery queue.
    ///
    /// Returns `false` when the session is not registered, which happens when a
    /// client disconnect races a forced shutdown. The queue is never closed twice.
    pub fn remove(&self, id: &SessionId) -> bool {
        let mut state = self.lock();

        match state.sessions.iter().position(|s| s.id() == *id) {
            Some(index) => {
                // Dropping the session closes its queue while the lock is held
                drop(state.sessions.swap_remove(index));
                true
            }
            None => false,
        }
    }

    /// Close every open delivery queue, clear the collection and refuse further
    /// registrations. Returns the number of sessions that were closed.
    pub fn close_all(&self) -> usize {
        let mut state = self.lock();
        state.closed = true;

        let closed = state.sessions.len();
        state.sessions.clear();
        closed
    }

    /// Number of currently registered sessions.
    pub fn count(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Total number of deliveries dropped since the registry was created.
    pub fn dropped_total(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<T: Clone> SessionRegistry<T> {
    /// Offer `value` to every session registered for `user_id` without blocking.
    ///
    /// A session whose queue is full does not receive the value. Delivery is best
    /// effort: one stalled consumer never stalls the caller or other sessions.
    pub fn send_to_user(&self, user_id: &str, value: &T) -> Delivery {
        let mut delivery = Delivery::default();
        let mut full = 0usize;

        {
            let state = self.lock();
            for session in state.sessions.iter().filter(|s| s.user_id() == user_id) {
                delivery.matched += 1;
                match session.try_deliver(value.clone()) {
                    Ok(()) => delivery.sent += 1,
                    Err(TrySendError::Full(_)) => {
                        full += 1;
                        delivery.dropped += 1;
                    }
                    // Receiver already gone; its stream is tearing the session down
                    Err(TrySendError::Closed(_)) => delivery.dropped += 1,
                }
            }
        }

        if delivery.dropped > 0 {
            self.dropped
                .fetch_add(delivery.dropped as u64, Ordering::Relaxed);
            warn!(
                "Dropped delivery to {} of {} session(s) for user {} ({} full queue(s))",
                delivery.dropped, delivery.matched, user_id, full
            );
        }

        delivery
    }
}

impl<T> Default for SessionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(user_id: &str) -> (Session<u32>, tokio::sync::mpsc::Receiver<u32>) {
        Session::new(user_id.to_string(), 1)
    }

    #[test]
    fn count_tracks_adds_minus_successful_removes() {
        let registry = SessionRegistry::new();
        let mut ids = Vec::new();
        let mut receivers = Vec::new();

        for user in ["a", "b", "a", "c"] {
            let (s, rx) = session(user);
            ids.push(registry.add(s).unwrap());
            receivers.push(rx);
        }
        assert_eq!(registry.count(), 4);

        assert!(registry.remove(&ids[1]));
        assert!(!registry.remove(&ids[1]));
        assert!(registry.remove(&ids[3]));
        assert_eq!(registry.count(), 2);

        let (s, _rx) = session("d");
        registry.add(s).unwrap();
        assert_eq!(registry.count(), 3);
    }

    #[tokio::test]
    async fn remove_closes_queue_once_and_tolerates_repeats() {
        let registry = SessionRegistry::new();
        let (s, mut rx) = session("a");
        let id = registry.add(s).unwrap();

        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert_eq!(rx.recv().await, None);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn remove_of_unknown_session_is_noop() {
        let registry = SessionRegistry::<u32>::new();
        assert!(!registry.remove(&SessionId::new()));
    }

    #[test]
    fn add_rejects_duplicate_identity() {
        let registry = SessionRegistry::new();
        let (s, _rx) = session("a");
        let id = registry.add(s).unwrap();

        // Forge a second session sharing the first one's identity
        let (mut dup, _dup_rx) = session("a");
        dup.set_id_for_test(id);
        let err = registry.add(dup).unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::DuplicateSession);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn send_to_user_with_no_matching_session_sends_nothing() {
        let registry = SessionRegistry::new();
        let (s, mut rx) = session("a");
        registry.add(s).unwrap();

        let delivery = registry.send_to_user("b", &1);
        assert_eq!(delivery, Delivery::default());
        assert!(rx.try_recv().is_err());
        assert_eq!(registry.dropped_total(), 0);
    }

    #[tokio::test]
    async fn send_to_user_reaches_every_matching_session() {
        let registry = SessionRegistry::new();
        let (a1, mut rx1) = session("a");
        let (a2, mut rx2) = session("a");
        let (b, mut rx3) = session("b");
        registry.add(a1).unwrap();
        registry.add(a2).unwrap();
        registry.add(b).unwrap();

        let delivery = registry.send_to_user("a", &42);
        assert_eq!(delivery.matched, 2);
        assert_eq!(delivery.sent, 2);
        assert_eq!(rx1.recv().await, Some(42));
        assert_eq!(rx2.recv().await, Some(42));
        assert!(rx3.try_recv().is_err());
    }

    #[test]
    fn send_to_user_drops_for_full_queue_without_blocking() {
        let registry = SessionRegistry::new();
        let (slow, _slow_rx) = session("a");
        let (fast, mut fast_rx) = session("a");
        registry.add(slow).unwrap();
        registry.add(fast).unwrap();

        assert_eq!(registry.send_to_user("a", &1).sent, 2);
        // Drain only one consumer; the other queue stays full
        assert_eq!(fast_rx.try_recv().unwrap(), 1);

        let delivery = registry.send_to_user("a", &2);
        assert_eq!(delivery.matched, 2);
        assert_eq!(delivery.sent, 1);
        assert_eq!(delivery.dropped, 1);
        assert_eq!(registry.dropped_total(), 1);
    }

    #[tokio::test]
    async fn close_all_closes_every_queue_and_rejects_new_sessions() {
        let registry = SessionRegistry::new();
        let (a, mut rx_a) = session("a");
        let (b, mut rx_b) = session("b");
        let id_a = registry.add(a).unwrap();
        registry.add(b).unwrap();

        assert_eq!(registry.close_all(), 2);
        assert_eq!(registry.count(), 0);
        assert!(registry.is_closed());
        assert_eq!(rx_a.recv().await, None);
        assert_eq!(rx_b.recv().await, None);

        // A teardown racing the shutdown finds nothing left to remove
        assert!(!registry.remove(&id_a));

        let (late, mut late_rx) = session("c");
        let err = registry.add(late).unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::RegistryClosed);
        assert_eq!(late_rx.recv().await, None);
        assert_eq!(registry.count(), 0);
    }
}
