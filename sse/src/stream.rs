use crate::manager::Subscription;
use crate::message::{CurrentValue, DEFAULT_RETRY};
use async_stream::stream;
use axum::response::sse::Event;
use futures::Stream;
use log::*;
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Interval between keep-alive ticks when none is configured.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Tuning for one connection's event loop.
#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    /// Period of the keep-alive timer.
    pub keep_alive: Duration,
    /// Reconnect hint written into every event record.
    pub retry: Duration,
    /// Emit a comment frame on every keep-alive tick.
    pub heartbeat: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            keep_alive: DEFAULT_KEEP_ALIVE,
            retry: DEFAULT_RETRY,
            heartbeat: true,
        }
    }
}

enum Wake<T> {
    Delivered(Option<T>),
    KeepAlive,
}

/// Turn a subscription into the event stream for its connection.
///
/// The loop waits on the delivery queue and the keep-alive timer, whichever is
/// ready first. It ends when the queue is closed. When the transport fails to
/// write, the server drops the stream instead; either way the subscription is
/// dropped with it and the session is unregistered.
pub fn event_stream<T>(
    mut subscription: Subscription<T>,
    options: StreamOptions,
) -> impl Stream<Item = Result<Event, Infallible>>
where
    T: Serialize + Send + 'static,
{
    let period = options.keep_alive.max(Duration::from_millis(1));

    stream! {
        let mut keep_alive = interval_at(Instant::now() + period, period);
        keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let wake = tokio::select! {
                value = subscription.recv() => Wake::Delivered(value),
                _ = keep_alive.tick() => Wake::KeepAlive,
            };

            match wake {
                Wake::Delivered(Some(value)) => {
                    let formatted = CurrentValue::new(&value).to_event(options.retry);
                    match formatted {
                        Ok(event) => yield Ok(event),
                        Err(e) => error!("SSE format error for user {}: {e}", subscription.user_id()),
                    }
                }
                Wake::Delivered(None) => {
                    debug!("SSE session {} closed", subscription.id());
                    break;
                }
                Wake::KeepAlive => {
                    trace!("SSE keep-alive for session {}", subscription.id());
                    if options.heartbeat {
                        yield Ok(Event::default().comment("keep-alive"));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SessionRegistry;
    use crate::Manager;
    use axum::body::Bytes;
    use axum::response::{IntoResponse, Sse};
    use futures::StreamExt;
    use serde::Serializer;
    use serde_json::json;
    use std::sync::Arc;

    fn quiet() -> StreamOptions {
        StreamOptions {
            keep_alive: Duration::from_secs(3600),
            retry: DEFAULT_RETRY,
            heartbeat: false,
        }
    }

    /// Render the stream the way the HTTP layer does and return its body frames.
    fn frames<S>(stream: S) -> impl Stream<Item = Bytes>
    where
        S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
    {
        Sse::new(stream)
            .into_response()
            .into_body()
            .into_data_stream()
            .map(|frame| frame.unwrap())
    }

    #[tokio::test]
    async fn delivered_value_is_written_as_event_record() {
        let manager = Manager::default();
        let subscription = manager.open_session("123".to_string()).unwrap();
        let mut body = Box::pin(frames(event_stream(subscription, quiet())));

        assert_eq!(
            manager.dispatch("123", json!({"message": "Hello world!"})).sent,
            1
        );

        let frame = body.next().await.unwrap();
        assert_eq!(
            frame,
            "event: current-value\nretry: 15000\ndata: {\"data\":{\"message\":\"Hello world!\"}}\n\n"
        );
    }

    #[tokio::test]
    async fn values_arrive_in_enqueue_order() {
        let manager = Manager::default();
        let subscription = manager.open_session("123".to_string()).unwrap();
        let mut body = Box::pin(frames(event_stream(subscription, quiet())));

        for n in 1..=3 {
            manager.dispatch("123", json!(n));
        }

        for n in 1..=3 {
            let frame = body.next().await.unwrap();
            let expected = format!("data: {{\"data\":{n}}}\n\n");
            assert!(String::from_utf8_lossy(&frame).ends_with(&expected));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn one_dispatch_writes_exactly_one_record_per_session() {
        let manager = Manager::default();
        let mut bodies = Vec::new();
        for _ in 0..2 {
            let subscription = manager.open_session("123".to_string()).unwrap();
            bodies.push(Box::pin(frames(event_stream(subscription, quiet()))));
        }

        assert_eq!(manager.dispatch("123", json!({"n": 1})).sent, 2);

        for body in bodies.iter_mut() {
            let frame = body.next().await.unwrap();
            assert!(String::from_utf8_lossy(&frame).ends_with("data: {\"data\":{\"n\":1}}\n\n"));

            // Nothing else is written until the next dispatch
            let extra = tokio::time::timeout(Duration::from_secs(60), body.next()).await;
            assert!(extra.is_err());
        }
        assert_eq!(manager.session_count(), 2);
    }

    #[tokio::test]
    async fn close_all_ends_stream_and_unregisters() {
        let manager = Manager::default();
        let subscription = manager.open_session("123".to_string()).unwrap();
        let mut stream = Box::pin(event_stream(subscription, quiet()));

        manager.close_all();
        assert!(stream.next().await.is_none());
        assert_eq!(manager.session_count(), 0);
    }

    #[tokio::test]
    async fn dropping_stream_unregisters_session() {
        let manager = Manager::default();
        let subscription = manager.open_session("123".to_string()).unwrap();
        let stream = event_stream(subscription, quiet());
        assert_eq!(manager.session_count(), 1);

        // A client disconnect drops the response body before it is finished
        drop(stream);
        assert_eq!(manager.session_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn keep_alive_tick_emits_comment_when_enabled() {
        let manager = Manager::default();
        let subscription = manager.open_session("123".to_string()).unwrap();
        let options = StreamOptions {
            heartbeat: true,
            ..StreamOptions::default()
        };
        let mut body = Box::pin(frames(event_stream(subscription, options)));

        let frame = body.next().await.unwrap();
        assert!(frame.starts_with(b":"));
        assert_eq!(manager.session_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn keep_alive_tick_without_heartbeat_writes_nothing() {
        let manager = Manager::default();
        let subscription = manager.open_session("123".to_string()).unwrap();
        let options = StreamOptions {
            keep_alive: Duration::from_secs(1),
            heartbeat: false,
            ..StreamOptions::default()
        };
        let mut stream = Box::pin(event_stream(subscription, options));

        // Several ticks pass without output; the loop is still alive afterwards
        let idle = tokio::time::timeout(Duration::from_secs(5), stream.next()).await;
        assert!(idle.is_err());

        manager.dispatch("123", json!("after ticks"));
        assert!(stream.next().await.is_some());
    }

    #[derive(Clone)]
    enum Item {
        Good(u32),
        Bad,
    }

    impl Serialize for Item {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Item::Good(n) => serializer.serialize_u32(*n),
                Item::Bad => Err(serde::ser::Error::custom("unserializable item")),
            }
        }
    }

    #[tokio::test]
    async fn formatting_failure_is_skipped() {
        let registry = Arc::new(SessionRegistry::new());
        let subscription = Subscription::register(&registry, "123".to_string(), 4).unwrap();
        let mut body = Box::pin(frames(event_stream(subscription, quiet())));

        registry.send_to_user("123", &Item::Bad);
        registry.send_to_user("123", &Item::Good(5));

        let frame = body.next().await.unwrap();
        assert!(String::from_utf8_lossy(&frame).ends_with("data: {\"data\":5}\n\n"));
        assert_eq!(registry.count(), 1);
    }
}
