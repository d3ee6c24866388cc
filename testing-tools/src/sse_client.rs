use anyhow::Result;
use eventsource_client::{self as es, Client};
use futures_util::stream::StreamExt;
use log::*;
use reqwest::Url;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Stream endpoint URL for `user_id`, with the key percent-encoded into the query.
pub fn stream_url(base_url: &str, user_id: &str) -> Result<Url> {
    let url = Url::parse_with_params(&format!("{}/sse", base_url), &[("userID", user_id)])?;
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub data: Value,
    pub timestamp: Instant,
}

/// A live event stream for one user, read on a background task.
pub struct Connection {
    pub user_label: String,
    event_rx: mpsc::UnboundedReceiver<Event>,
    handle: tokio::task::JoinHandle<()>,
}

impl Connection {
    pub async fn establish(base_url: &str, user_id: &str, user_label: String) -> Result<Self> {
        let url = stream_url(base_url, user_id)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let client = es::ClientBuilder::for_url(url.as_str())?
            .header("Accept", "text/event-stream")?
            .build();

        let label = user_label.clone();
        let handle = tokio::spawn(async move {
            let mut stream = client.stream();

            loop {
                match stream.next().await {
                    Some(Ok(es::SSE::Event(event))) => match serde_json::from_str(&event.data) {
                        Ok(data) => {
                            let sse_event = Event {
                                event_type: event.event_type,
                                data,
                                timestamp: Instant::now(),
                            };

                            if tx.send(sse_event).is_err() {
                                debug!("SSE receiver dropped for {}", label);
                                break;
                            }
                        }
                        Err(e) => warn!("Unparseable event data for {}: {}", label, e),
                    },
                    Some(Ok(es::SSE::Comment(comment))) => {
                        trace!("Comment for {}: {}", label, comment);
                    }
                    Some(Err(e)) => {
                        warn!("SSE error for {}: {}", label, e);
                    }
                    None => {
                        debug!("SSE stream ended for {}", label);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            user_label,
            event_rx: rx,
            handle,
        })
    }

    pub async fn wait_for_event(&mut self, event_type: &str, timeout: Duration) -> Result<Event> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                anyhow::bail!("Timeout waiting for event: {}", event_type);
            }

            match tokio::time::timeout(remaining, self.event_rx.recv()).await {
                Ok(Some(event)) if event.event_type == event_type => {
                    return Ok(event);
                }
                Ok(Some(_)) => {
                    // Wrong event type, keep waiting
                    continue;
                }
                Ok(None) => {
                    anyhow::bail!("SSE connection closed");
                }
                Err(_) => {
                    anyhow::bail!("Timeout waiting for event: {}", event_type);
                }
            }
        }
    }

    /// Drop the stream, which closes the session on the relay.
    pub fn close(self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_carries_plain_user_key() {
        let url = stream_url("http://localhost:8080", "123").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/sse?userID=123");
    }

    #[test]
    fn stream_url_encodes_reserved_characters() {
        let url = stream_url("http://localhost:8080", "a&b=c #d").unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs, vec![("userID".to_string(), "a&b=c #d".to_string())]);
        assert_eq!(url.fragment(), None);
    }
}
