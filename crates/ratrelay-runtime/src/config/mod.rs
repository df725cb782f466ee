//! Configuration for the relay runtime.
//!
//! Layered figment loading (defaults, files, `RATRELAY_*` environment
//! variables) into a [`RelayConfig`], plus validation of the result.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ApiConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, RelayConfig,
    SocketConfig, SpanEventConfig,
};
pub use validation::validate_config;
