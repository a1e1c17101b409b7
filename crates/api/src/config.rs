//! Application configuration loaded from environment variables.

use std::time::Duration;

use notes::{Backoff, RetryPolicy, WriterConfig};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory stores when unset
/// - `NOTE_WRITE_MAX_ATTEMPTS`: status note write attempts (default: `3`)
/// - `NOTE_WRITE_BACKOFF_MS`: first retry delay in milliseconds (default: `1000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub note_write_max_attempts: u32,
    pub note_write_backoff_ms: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT").unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            note_write_max_attempts: parse_var("NOTE_WRITE_MAX_ATTEMPTS")
                .unwrap_or(defaults.note_write_max_attempts),
            note_write_backoff_ms: parse_var("NOTE_WRITE_BACKOFF_MS")
                .unwrap_or(defaults.note_write_backoff_ms),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Retry budget for status note writes.
    ///
    /// Delays double from the configured backoff and cap at eight times it.
    pub fn writer_config(&self) -> WriterConfig {
        let initial = Duration::from_millis(self.note_write_backoff_ms);
        WriterConfig {
            retry: RetryPolicy::new(
                self.note_write_max_attempts,
                Backoff::new(initial, initial.saturating_mul(8)),
            ),
            ..WriterConfig::default()
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            note_write_max_attempts: 3,
            note_write_backoff_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.is_none());
        assert_eq!(config.note_write_max_attempts, 3);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_default_writer_config_matches_library_default() {
        assert_eq!(Config::default().writer_config(), WriterConfig::default());
    }

    #[test]
    fn test_writer_config_uses_configured_backoff() {
        let config = Config {
            note_write_max_attempts: 5,
            note_write_backoff_ms: 250,
            ..Config::default()
        };
        let writer = config.writer_config();
        assert_eq!(writer.retry.max_attempts, 5);
        assert_eq!(writer.retry.backoff.initial, Duration::from_millis(250));
        assert_eq!(writer.retry.backoff.max, Duration::from_secs(2));
    }
}
