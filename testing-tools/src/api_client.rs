use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

/// Plain HTTP calls against the relay's non-streaming endpoints.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// POST /send-to-user; `user_id` of `None` leaves the field out of the body.
    pub async fn send_to_user(&self, user_id: Option<&str>, value: Value) -> Result<(StatusCode, Value)> {
        let body = match user_id {
            Some(user_id) => json!({ "userID": user_id, "value": value }),
            None => json!({ "value": value }),
        };

        let response = self
            .client
            .post(format!("{}/send-to-user", self.base_url))
            .json(&body)
            .send()
            .await
            .context("Failed to send value")?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .context("Failed to parse send-to-user response")?;
        Ok((status, body))
    }

    pub async fn connections(&self) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/connections", self.base_url))
            .send()
            .await
            .context("Failed to fetch connections")?;

        if !response.status().is_success() {
            anyhow::bail!("Fetching connections failed: {}", response.status());
        }

        Ok(response.json().await?)
    }

    /// Status of a stream request that is expected to be rejected before streaming starts.
    pub async fn open_stream_status(&self, query: &str) -> Result<StatusCode> {
        let response = self
            .client
            .get(format!("{}/sse{}", self.base_url, query))
            .send()
            .await
            .context("Failed to request stream")?;
        Ok(response.status())
    }
}
