use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{self, ConfigBuilder};

/// HTTP stack modules that are filtered out of the log unless running at Trace level.
/// Every accepted connection and streamed frame would otherwise be logged.
const FILTERED_MODULES: &[&str] = &["hyper", "hyper_util", "h2", "tower", "tower_http", "axum", "mio"];

pub struct Logger {}

impl Logger {
    /// Initializes the global terminal logger at the level set in `config`.
    ///
    /// Fails if a global logger has already been installed.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        let log_config = Self::build_log_config(Self::should_filter_dependencies(
            config.log_level_filter,
        ));

        simplelog::TermLogger::init(
            config.log_level_filter,
            log_config,
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        )
    }

    fn should_filter_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    /// Builds a simplelog Config with RFC3339 timestamps and, when `apply_filters`
    /// is set, the HTTP stack modules suppressed.
    fn build_log_config(apply_filters: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if apply_filters {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_modules_cover_http_stack() {
        for module in ["hyper", "tower", "axum"] {
            assert!(
                FILTERED_MODULES.contains(&module),
                "{module} should be filtered"
            );
        }
    }

    #[test]
    fn test_trace_level_disables_filtering() {
        assert!(!Logger::should_filter_dependencies(LevelFilter::Trace));
    }

    #[test]
    fn test_other_levels_enable_filtering() {
        for level in [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
        ] {
            assert!(
                Logger::should_filter_dependencies(level),
                "{level} should enable filtering"
            );
        }
    }

    #[test]
    fn test_build_log_config_does_not_panic() {
        let _filtered = Logger::build_log_config(true);
        let _unfiltered = Logger::build_log_config(false);
    }
}
