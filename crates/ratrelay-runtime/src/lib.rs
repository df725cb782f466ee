//! # ratrelay runtime
//!
//! Everything between a configuration file and a running relay:
//!
//! - [`config`]: figment-based loading and validation of [`RelayConfig`]
//! - [`logging`]: `tracing-subscriber` setup driven by that configuration
//! - [`RelayRuntime`]: builds the collaborators, seeds the case board and
//!   drives the reconnecting stream loop
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use ratrelay_core::TracingSink;
//! use ratrelay_runtime::RelayRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = RelayRuntime::builder().build()?;
//!     runtime.run(Arc::new(TracingSink)).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    ApiConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, RelayConfig, SocketConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RelayRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
