use anyhow::Result;
use clap::Parser;
use colored::*;
use uuid::Uuid;

use testing_tools::api_client::ApiClient;
use testing_tools::output::print_test_summary;
use testing_tools::scenarios;
use testing_tools::sse_client::Connection;

#[derive(Parser)]
#[command(name = "sse-test-client")]
#[command(about = "Push relay SSE integration testing tool")]
struct Cli {
    /// Base URL of the relay (e.g., http://localhost:8080)
    #[arg(long)]
    base_url: String,

    /// User key to stream as; a random one is used when omitted
    #[arg(long)]
    user_id: Option<String>,

    /// Test scenario to run
    #[arg(long, value_enum)]
    scenario: ScenarioChoice,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, PartialEq)]
enum ScenarioChoice {
    /// Open a stream and check the relay keeps it registered
    ConnectionTest,
    /// Send a value and check it arrives on the open stream
    DispatchTest,
    /// Send to a user without streams and expect zero deliveries
    NoSessionTest,
    /// Check requests without a user key are rejected
    MissingUserTest,
    /// Run every scenario
    All,
}

impl ScenarioChoice {
    fn needs_stream(&self) -> bool {
        matches!(
            self,
            ScenarioChoice::ConnectionTest | ScenarioChoice::DispatchTest | ScenarioChoice::All
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    println!("{}", "=== SETUP PHASE ===".bright_white().bold());

    let user_id = cli
        .user_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let api_client = ApiClient::new(reqwest::Client::new(), cli.base_url.clone());

    let mut sse = if cli.scenario.needs_stream() {
        println!("\n{} Establishing SSE connection for {}...", "→".blue(), user_id);
        let connection =
            Connection::establish(&cli.base_url, &user_id, format!("User {}", user_id)).await?;

        // Sessions register when the relay answers the request
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        println!("{} SSE connection established", "✓".green());
        Some(connection)
    } else {
        println!(
            "\n{} Skipping SSE connection (not needed for this test)",
            "→".blue()
        );
        None
    };

    println!("\n{}", "=== TEST PHASE ===".bright_white().bold());

    let mut results = Vec::new();

    match (&cli.scenario, sse.as_mut()) {
        (ScenarioChoice::ConnectionTest, Some(sse)) => {
            results.push(scenarios::test_connection(&user_id, &api_client, sse).await?);
        }
        (ScenarioChoice::DispatchTest, Some(sse)) => {
            results.push(scenarios::test_dispatch(&user_id, &api_client, sse).await?);
        }
        (ScenarioChoice::NoSessionTest, _) => {
            results.push(scenarios::test_no_session(&api_client).await?);
        }
        (ScenarioChoice::MissingUserTest, _) => {
            results.push(scenarios::test_missing_user(&api_client).await?);
        }
        (ScenarioChoice::All, Some(sse)) => {
            results.push(scenarios::test_connection(&user_id, &api_client, sse).await?);
            results.push(scenarios::test_dispatch(&user_id, &api_client, sse).await?);
            results.push(scenarios::test_no_session(&api_client).await?);
            results.push(scenarios::test_missing_user(&api_client).await?);
        }
        (_, None) => anyhow::bail!("Scenario requires an SSE connection"),
    }

    if let Some(sse) = sse {
        sse.close();
    }

    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}
