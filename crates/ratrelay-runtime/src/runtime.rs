//! Relay orchestration.
//!
//! [`RelayRuntime`] turns a [`RelayConfig`] into a running stream client:
//! it resolves the target, builds the API collaborators, seeds the case
//! board and spawns the websocket loop.
//!
//! ```rust,ignore
//! use ratrelay_core::TracingSink;
//! use ratrelay_runtime::RelayRuntime;
//!
//! let runtime = RelayRuntime::builder()
//!     .config_file("ratrelay.toml")
//!     .profile("production")
//!     .build()?;
//! runtime.run(Arc::new(TracingSink)).await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use ratrelay_core::{
    BoxedCaseStore, BoxedNameResolver, BoxedSink, CaseBoard, NoNames, RecentEntry, RecentLog,
    Target,
};
use ratrelay_framework::{CasePersister, ClientStatus, HandlerContext, Router, StreamClient};
use ratrelay_transport::{ApiClient, HttpCaseStore, HttpNameResolver, StreamControl, WsClient};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, ConfigResult, RelayConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// A spawned stream loop.
struct Running {
    client: Arc<StreamClient>,
    control: StreamControl,
    task: JoinHandle<()>,
    persister: CasePersister,
}

/// The relay: configuration, collaborators and, once started, the stream
/// loop.
pub struct RelayRuntime {
    config: RelayConfig,
    target: Target,
    board: Arc<CaseBoard>,
    recent: Arc<RecentLog>,
    store: Option<BoxedCaseStore>,
    names: BoxedNameResolver,
    running: Mutex<Option<Running>>,
}

impl RelayRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from a loaded configuration.
    ///
    /// Validates the configuration, initializes logging and builds the
    /// HTTP collaborators when an API URL is configured.
    pub fn from_config(config: RelayConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;
        logging::init_from_config(&config.logging);

        let target = Target::from_url(&config.socket.url, config.socket.port)?;

        let (store, names): (Option<BoxedCaseStore>, BoxedNameResolver) =
            match config.api.url.as_deref().filter(|_| config.api.is_enabled()) {
                Some(url) => {
                    let api = ApiClient::new(url, config.api.token.clone(), config.api.timeout)?;
                    info!(api_url = %api.base_url(), "Rescue API enabled");
                    (
                        Some(Arc::new(HttpCaseStore::new(api.clone()))),
                        Arc::new(HttpNameResolver::new(api)),
                    )
                }
                None => {
                    warn!("No API URL configured, case saves and name lookups are disabled");
                    (None, Arc::new(NoNames))
                }
            };

        info!(
            url = %target,
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Ok(Self {
            recent: Arc::new(RecentLog::new(config.socket.recent_log_capacity)),
            config,
            target,
            board: Arc::new(CaseBoard::new()),
            store,
            names,
            running: Mutex::new(None),
        })
    }

    /// Replaces the case store. Takes effect on the next [`start`](Self::start).
    pub fn with_case_store(mut self, store: BoxedCaseStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces the name resolver. Takes effect on the next [`start`](Self::start).
    pub fn with_name_resolver(mut self, names: BoxedNameResolver) -> Self {
        self.names = names;
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// The resolved stream target.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The shared board of open cases.
    pub fn board(&self) -> &Arc<CaseBoard> {
        &self.board
    }

    /// Recently received frames, oldest first.
    pub fn recent_messages(&self) -> Vec<RecentEntry> {
        self.recent.snapshot()
    }

    /// Returns whether the stream loop is running.
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Connection state, or `None` before [`start`](Self::start).
    pub fn status(&self) -> Option<ClientStatus> {
        self.running.lock().as_ref().map(|r| r.client.status())
    }

    /// Loads the open cases onto the board.
    ///
    /// An API failure is logged and leaves the board as it was.
    pub async fn seed_board(&self) -> usize {
        let Some(store) = self.store.as_ref() else {
            debug!("No case store, not seeding the board");
            return 0;
        };
        match store.open_cases().await {
            Ok(cases) => {
                let count = cases.len();
                self.board.replace_all(cases);
                info!(count, "Seeded case board with open cases");
                count
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch open cases, starting with an empty board");
                0
            }
        }
    }

    /// Seeds the board and spawns the stream loop posting notices to `sink`.
    ///
    /// Returns once the loop is spawned; connecting happens in the
    /// background.
    pub async fn start(&self, sink: BoxedSink) -> RuntimeResult<()> {
        if self.is_running() {
            warn!("Runtime is already running");
            return Ok(());
        }

        self.seed_board().await;

        let persister = match self.store.clone() {
            Some(store) => CasePersister::new(store, Arc::clone(&self.board)),
            None => CasePersister::disabled(Arc::clone(&self.board)),
        };
        let ctx = HandlerContext::new(
            sink,
            Arc::clone(&self.board),
            Arc::clone(&self.names),
            persister.clone(),
        );
        let client = Arc::new(
            StreamClient::new(
                self.config.socket.credentials(),
                self.config.socket.retry.clone(),
                Router::standard(),
                ctx,
            )
            .with_recent_log(Arc::clone(&self.recent)),
        );

        let (task, control) = WsClient::new(self.target.clone(), client.clone()).spawn();

        let mut running = self.running.lock();
        if running.is_some() {
            warn!("Runtime was started concurrently, stopping the extra stream loop");
            control.shutdown();
            return Ok(());
        }
        *running = Some(Running {
            client,
            control,
            task,
            persister,
        });
        info!(url = %self.target, "Stream client started");

        Ok(())
    }

    /// Drops the current connection and connects again without waiting.
    ///
    /// Returns `false` if the runtime is not running.
    pub fn reconnect(&self) -> bool {
        let running = self.running.lock();
        let Some(running) = running.as_ref() else {
            warn!("Reconnect requested while not running");
            return false;
        };
        info!("Manual reconnect requested");
        self.names.flush();
        running.control.reconnect();
        true
    }

    /// Stops the stream loop and waits for pending case saves.
    pub async fn shutdown(&self) {
        let Some(running) = self.running.lock().take() else {
            debug!("Runtime is not running");
            return;
        };

        info!("Stopping stream client");
        running.control.shutdown();
        if let Err(e) = running.task.await {
            error!(error = %e, "Stream task ended abnormally");
        }
        running.persister.drain().await;
        info!("Stream client stopped");
    }

    /// Starts, runs until Ctrl+C or SIGTERM, then shuts down.
    pub async fn run(&self, sink: BoxedSink) -> RuntimeResult<()> {
        self.start(sink).await?;
        info!("Relay is running. Press Ctrl+C to stop.");

        let waited = wait_for_shutdown().await;
        self.shutdown().await;
        waited
    }

    /// Starts, runs until `shutdown` completes, then shuts down.
    pub async fn run_until<F>(&self, sink: BoxedSink, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start(sink).await?;
        shutdown.await;
        self.shutdown().await;
        Ok(())
    }
}

impl std::fmt::Debug for RelayRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayRuntime")
            .field("target", &self.target)
            .field("api_enabled", &self.store.is_some())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder loading configuration for a [`RelayRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a builder searching the current and user config directories.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new()
                .with_current_dir()
                .with_user_config_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: RelayConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads the configuration without building a runtime.
    pub fn load(self) -> ConfigResult<RelayConfig> {
        self.config_loader.load()
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> RuntimeResult<RelayRuntime> {
        let config = self.config_loader.load()?;
        RelayRuntime::from_config(config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use ratrelay_core::{Case, CaseStore, ChannelSink, PersistError, PersistResult, Phase};
    use tokio_test::assert_ok;

    use super::*;
    use crate::error::RuntimeError;

    struct FixedStore(PersistResult<Vec<Case>>);

    #[async_trait]
    impl CaseStore for FixedStore {
        async fn save(&self, case: Case) -> PersistResult<Case> {
            Ok(case)
        }

        async fn open_cases(&self) -> PersistResult<Vec<Case>> {
            self.0.clone()
        }
    }

    fn config() -> RelayConfig {
        let mut config = RelayConfig::default();
        // Nothing listens on port 1, so every attempt is refused quickly.
        config.socket.url = "ws://127.0.0.1:1/".into();
        config.socket.bearer = "sekret".into();
        config.socket.retry.initial_delay = Duration::from_millis(20);
        config.socket.retry.max_delay = Duration::from_millis(20);
        config.socket.recent_log_capacity = 5;
        config
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = config();
        config.socket.bearer.clear();
        assert!(matches!(
            RelayRuntime::from_config(config),
            Err(RuntimeError::Config(_))
        ));
    }

    #[test]
    fn test_from_config_without_api() {
        let runtime = assert_ok!(RelayRuntime::from_config(config()));
        assert_eq!(runtime.target().port(), 1);
        assert!(!runtime.is_running());
        assert!(runtime.status().is_none());
        assert!(runtime.recent_messages().is_empty());
    }

    #[tokio::test]
    async fn test_seed_board_tolerates_api_failure() {
        let runtime = RelayRuntime::from_config(config())
            .unwrap()
            .with_case_store(Arc::new(FixedStore(Err(PersistError::Request(
                "connection refused".into(),
            )))));
        assert_eq!(runtime.seed_board().await, 0);
        assert!(runtime.board().is_empty());

        let runtime = runtime.with_case_store(Arc::new(FixedStore(Ok(vec![
            Case::new("Ada").with_id("c1"),
            Case::new("Bob").with_id("c2"),
        ]))));
        assert_eq!(runtime.seed_board().await, 2);
        assert_eq!(runtime.board().client_name("c2").as_deref(), Some("Bob"));
    }

    #[tokio::test]
    async fn test_start_retries_then_shuts_down() {
        let runtime = RelayRuntime::from_config(config()).unwrap();
        let (sink, mut notices) = ChannelSink::new();

        runtime.start(Arc::new(sink)).await.unwrap();
        assert!(runtime.is_running());

        let first = tokio::time::timeout(Duration::from_secs(5), notices.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, "[Websocket] Connecting to ws://127.0.0.1:1/...");

        let refused = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match notices.recv().await {
                    Some(n) if n.starts_with("Connection to Websocket refused") => break n,
                    Some(_) => continue,
                    None => panic!("sink closed"),
                }
            }
        })
        .await
        .unwrap();
        assert!(refused.starts_with("Connection to Websocket refused. reason: "));

        let status = runtime.status().unwrap();
        assert_ne!(status.phase, Phase::Subscribed);
        assert!(runtime.reconnect());

        runtime.shutdown().await;
        assert!(!runtime.is_running());
        assert!(runtime.status().is_none());
        assert!(!runtime.reconnect());
    }

    #[tokio::test]
    async fn test_run_until() {
        let runtime = RelayRuntime::from_config(config()).unwrap();
        let (sink, _notices) = ChannelSink::new();
        runtime
            .run_until(Arc::new(sink), tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(!runtime.is_running());
    }
}
