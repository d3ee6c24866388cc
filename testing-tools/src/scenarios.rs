use anyhow::Result;
use colored::*;
use reqwest::StatusCode;
use serde_json::json;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::api_client::ApiClient;
use crate::output::{print_event, TestResult};
use crate::sse_client::Connection;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn test_connection(
    user_id: &str,
    api_client: &ApiClient,
    sse: &mut Connection,
) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Connection Test ===".bright_cyan().bold());
    println!(
        "{} {} ({}) SSE connection: established",
        "✓".green(),
        sse.user_label,
        user_id
    );

    println!(
        "{} Waiting 2 seconds to verify the connection stays alive...",
        "→".blue()
    );
    tokio::time::sleep(Duration::from_secs(2)).await;

    let connections = api_client.connections().await?;
    let sessions = connections["sessions"].as_u64().unwrap_or(0);

    if sessions >= 1 {
        println!("{} Relay reports {} open session(s)", "✓".green(), sessions);
        Ok(TestResult::pass("connection_test", start))
    } else {
        println!("{} Relay reports no open sessions", "✗".red());
        Ok(TestResult::fail(
            "connection_test",
            start,
            format!("Expected at least one session, got {}", connections),
        ))
    }
}

pub async fn test_dispatch(
    user_id: &str,
    api_client: &ApiClient,
    sse: &mut Connection,
) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Dispatch ===".bright_cyan().bold());

    let value = json!({ "message": "Hello world!", "nonce": Uuid::new_v4().to_string() });
    println!("{} Sending value to {}...", "→".blue(), user_id);

    let (status, body) = api_client.send_to_user(Some(user_id), value.clone()).await?;
    if status != StatusCode::OK || body["sent"].as_u64().unwrap_or(0) == 0 {
        return Ok(TestResult::fail(
            "dispatch",
            start,
            format!("Expected at least one delivery, got {} {}", status, body),
        ));
    }
    println!("{} Relay delivered to {} stream(s)", "✓".green(), body["sent"]);

    println!(
        "{} Waiting for {} to receive current-value event...",
        "→".blue(),
        sse.user_label
    );

    match sse.wait_for_event("current-value", EVENT_TIMEOUT).await {
        Ok(event) => {
            print_event(&sse.user_label, &event);

            if event.data["data"] == value {
                println!("{} Event data verified correctly", "✓".green());
                Ok(TestResult::pass("dispatch", start))
            } else {
                println!("{} Event data mismatch!", "✗".red());
                Ok(TestResult::fail(
                    "dispatch",
                    start,
                    format!("Expected {}, got {}", value, event.data["data"]),
                ))
            }
        }
        Err(e) => {
            println!("{} Timeout waiting for event: {}", "✗".red(), e);
            Ok(TestResult::fail("dispatch", start, format!("Timeout: {}", e)))
        }
    }
}

pub async fn test_no_session(api_client: &ApiClient) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: No Session ===".bright_cyan().bold());

    let absent_user = Uuid::new_v4().to_string();
    println!("{} Sending value to unconnected user {}...", "→".blue(), absent_user);

    let (status, body) = api_client
        .send_to_user(Some(&absent_user), json!({ "message": "nobody home" }))
        .await?;

    if status == StatusCode::OK && body == json!({ "sent": 0 }) {
        println!("{} Relay reported zero deliveries", "✓".green());
        Ok(TestResult::pass("no_session", start))
    } else {
        Ok(TestResult::fail(
            "no_session",
            start,
            format!("Expected 200 {{\"sent\":0}}, got {} {}", status, body),
        ))
    }
}

pub async fn test_missing_user(api_client: &ApiClient) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Missing User ===".bright_cyan().bold());

    let stream_status = api_client.open_stream_status("").await?;
    if stream_status != StatusCode::BAD_REQUEST {
        return Ok(TestResult::fail(
            "missing_user",
            start,
            format!("Stream without userID returned {}", stream_status),
        ));
    }
    println!("{} Stream without userID rejected", "✓".green());

    let (status, body) = api_client.send_to_user(None, json!(1)).await?;
    if status != StatusCode::BAD_REQUEST || body["error"] != "userID is required" {
        return Ok(TestResult::fail(
            "missing_user",
            start,
            format!("Send without userID returned {} {}", status, body),
        ));
    }
    println!("{} Send without userID rejected", "✓".green());

    Ok(TestResult::pass("missing_user", start))
}
