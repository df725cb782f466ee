//! Configuration schema definitions.
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "compact"
//!
//! [socket]
//! url = "wss://dev.api.fuelrats.com"
//! bearer = "..."
//! application_id = "0xDEADBEEF"
//!
//! [socket.retry]
//! initial_delay = "1s"
//! max_delay = "1m"
//! multiplier = 2.0
//!
//! [api]
//! url = "https://dev.api.fuelrats.com"
//! token = "..."
//! timeout = "30s"
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use ratrelay_core::{Credentials, RetryConfig};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelayConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Tracker stream connection settings.
    #[serde(default)]
    pub socket: SocketConfig,

    /// Rescue API settings.
    #[serde(default)]
    pub api: ApiConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything.
    Trace,
    /// Debugging detail.
    Debug,
    /// Normal operation.
    #[default]
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// Returns the level name as used in filter directives.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line, abbreviated.
    #[default]
    Compact,
    /// Single-line with all fields.
    Full,
    /// Multi-line, human friendly.
    Pretty,
    /// Newline-delimited JSON (requires the `json-log` feature).
    Json,
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output.
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
    /// A file, see [`LoggingConfig::file_path`].
    File,
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// One file forever.
    #[default]
    Never,
    /// A new file every hour.
    Hourly,
    /// A new file every day.
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    /// Span created.
    #[serde(default)]
    pub new: bool,
    /// Span entered.
    #[serde(default)]
    pub enter: bool,
    /// Span exited.
    #[serde(default)]
    pub exit: bool,
    /// Span closed.
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Global level; `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    /// Line format.
    #[serde(default)]
    pub format: LogFormat,

    /// Destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file, used when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Log file rotation.
    #[serde(default)]
    pub rotation: LogRotation,

    /// Span lifecycle events.
    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Per-target levels, e.g. `ratrelay_transport = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

// =============================================================================
// Socket
// =============================================================================

/// Tracker stream connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Websocket URL. A bare host is treated as `ws://`.
    #[serde(default = "default_socket_url")]
    pub url: String,

    /// Port override; the URL's port (or the scheme default) otherwise.
    #[serde(default)]
    pub port: Option<u16>,

    /// Bearer token for the authorization frame.
    #[serde(default)]
    pub bearer: String,

    /// Application id for the subscribe frame.
    #[serde(default = "default_application_id")]
    pub application_id: String,

    /// Reconnection backoff.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Number of inbound frames kept for inspection.
    #[serde(default = "default_recent_log_capacity")]
    pub recent_log_capacity: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            url: default_socket_url(),
            port: None,
            bearer: String::new(),
            application_id: default_application_id(),
            retry: RetryConfig::default(),
            recent_log_capacity: default_recent_log_capacity(),
        }
    }
}

impl SocketConfig {
    /// Handshake credentials.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            bearer: self.bearer.clone(),
            application_id: self.application_id.clone(),
        }
    }
}

fn default_socket_url() -> String {
    "wss://dev.api.fuelrats.com".to_string()
}

fn default_application_id() -> String {
    "0xDEADBEEF".to_string()
}

fn default_recent_log_capacity() -> usize {
    ratrelay_core::recent::DEFAULT_CAPACITY
}

// =============================================================================
// API
// =============================================================================

/// Rescue API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL. Without it, case saves and name lookups are disabled.
    #[serde(default)]
    pub url: Option<String>,

    /// Bearer token for API requests.
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout.
    #[serde(with = "humantime_serde", default = "default_api_timeout")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            timeout: default_api_timeout(),
        }
    }
}

impl ApiConfig {
    /// Returns true if a base URL is configured.
    pub fn is_enabled(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}

fn default_api_timeout() -> Duration {
    Duration::from_secs(30)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.socket.application_id, "0xDEADBEEF");
        assert_eq!(config.socket.retry.max_delay, Duration::from_secs(60));
        assert_eq!(config.api.timeout, Duration::from_secs(30));
        assert!(!config.api.is_enabled());
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let config: RelayConfig = serde_json::from_value(serde_json::json!({
            "socket": { "bearer": "sekret", "retry": { "max_delay": "10s" } },
            "api": { "url": "https://api.example", "timeout": "5s" },
        }))
        .unwrap();

        assert_eq!(config.socket.bearer, "sekret");
        assert_eq!(config.socket.retry.max_delay, Duration::from_secs(10));
        assert_eq!(config.socket.retry.initial_delay, Duration::from_secs(1));
        assert_eq!(config.socket.recent_log_capacity, 50);
        assert_eq!(config.api.timeout, Duration::from_secs(5));
        assert!(config.api.is_enabled());
    }

    #[test]
    fn test_credentials_from_socket() {
        let socket = SocketConfig {
            bearer: "sekret".into(),
            ..Default::default()
        };
        let credentials = socket.credentials();
        assert_eq!(credentials.bearer, "sekret");
        assert_eq!(credentials.application_id, "0xDEADBEEF");
    }
}
