use clap::builder::{RangedU64ValueParser, TypedValueParser as _};
use clap::{ArgAction, Parser};
use dotenvy::dotenv;
use log::LevelFilter;
use sse::stream::StreamOptions;
use std::time::Duration;

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that are allowed to receive server responses.
    /// Use "*" to allow any origin.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "*"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 8080)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Seconds between keep-alive ticks on every open stream
    #[arg(long, env, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..))]
    pub sse_keep_alive_secs: u64,

    /// Reconnect delay in milliseconds advertised to clients in every event record
    #[arg(long, env, default_value_t = 15000)]
    pub sse_retry_millis: u64,

    /// Number of undelivered values buffered per stream before new values are dropped
    #[arg(long, env, default_value_t = sse::manager::DEFAULT_QUEUE_CAPACITY,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub sse_queue_capacity: usize,

    /// Write a comment frame on every keep-alive tick
    #[arg(long, env, default_value_t = true, action = ArgAction::Set)]
    pub sse_heartbeat: bool,

    /// Seconds allowed for open connections to finish once shutdown has begun
    #[arg(long, env, default_value_t = 5)]
    pub shutdown_grace_secs: u64,
}

impl Default for Config {
    /// Configuration built from defaults and environment variables only, ignoring
    /// command line arguments.
    fn default() -> Self {
        Config::parse_from([clap::crate_name!()])
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("127.0.0.1")
    }

    /// The `interface:port` socket address to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.interface(), self.port)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.sse_keep_alive_secs)
    }

    pub fn retry(&self) -> Duration {
        Duration::from_millis(self.sse_retry_millis)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Event loop tuning handed to every stream.
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            keep_alive: self.keep_alive(),
            retry: self.retry(),
            heartbeat: self.sse_heartbeat,
        }
    }

    /// True when any origin may receive responses.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o.trim() == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("push_relay_rs").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_match_stream_protocol() {
        let config = parse(&["--interface", "127.0.0.1", "--port", "8080"]);
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.retry(), Duration::from_millis(15000));
        assert_eq!(config.keep_alive(), Duration::from_secs(15));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(5));
    }

    #[test]
    fn stream_options_follow_flags() {
        let config = parse(&[
            "--sse-keep-alive-secs",
            "30",
            "--sse-retry-millis",
            "2000",
            "--sse-heartbeat",
            "false",
        ]);
        let options = config.stream_options();
        assert_eq!(options.keep_alive, Duration::from_secs(30));
        assert_eq!(options.retry, Duration::from_millis(2000));
        assert!(!options.heartbeat);
    }

    #[test]
    fn zero_queue_capacity_is_rejected() {
        let result = Config::try_parse_from(["push_relay_rs", "--sse-queue-capacity", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_keep_alive_is_rejected() {
        let result = Config::try_parse_from(["push_relay_rs", "--sse-keep-alive-secs", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn origin_list_is_split_on_commas() {
        let config = parse(&[
            "--allowed-origins",
            "http://localhost:3000,https://app.example.com",
        ]);
        assert_eq!(config.allowed_origins.len(), 2);
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn wildcard_origin_allows_any() {
        let config = parse(&["--allowed-origins", "*"]);
        assert!(config.allows_any_origin());
    }
}
