//! Gateway server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use prompt_gateway_core::{ExposureEntry, PromptStore};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinHandle;
use tracing::debug;

use super::exposure::ExposureMap;
use super::logs::{LogEntry, STATUS_LOG_COUNT};
use super::router::{AppState, create_router};
use crate::config::{LogLevel, ServerConfig, ServerConfigPatch};
use crate::{Error, Result};

/// Handle to a listener that is currently serving
struct RunningServer {
    port: u16,
    shutdown_tx: broadcast::Sender<()>,
    server: JoinHandle<std::io::Result<()>>,
    sweeper: JoinHandle<()>,
}

/// Point-in-time view of the gateway for the embedding application
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    /// Whether the listener is up
    pub running: bool,
    /// Bound port while running, configured port otherwise
    pub port: u16,
    /// Size of the exposure set
    pub exposed_prompt_count: usize,
    /// Requests in flight
    pub active_connections: u64,
    /// Seconds since start, 0 when stopped
    pub uptime_seconds: u64,
    /// Requests since start
    pub total_requests: u64,
    /// Responses with status >= 400 since start
    pub total_errors: u64,
    /// Responses with status >= 500 since start
    pub total_faults: u64,
    /// Most recent log entries, newest first
    pub recent_logs: Vec<LogEntry>,
    /// Current configuration
    pub config: ServerConfig,
}

/// Local prompt gateway.
///
/// Constructed once by the embedding application; every mutation goes through
/// these methods. Configuration and exposure changes apply to the next request
/// without restarting the listener.
pub struct Gateway {
    state: Arc<AppState>,
    running: Mutex<Option<RunningServer>>,
}

impl Gateway {
    /// Create a stopped gateway
    pub fn new(config: ServerConfig, store: Arc<dyn PromptStore>) -> Self {
        Self {
            state: Arc::new(AppState::new(config, store)),
            running: Mutex::new(None),
        }
    }

    /// Merge `patch` into the current configuration
    pub fn configure(&self, patch: ServerConfigPatch) {
        self.state.config.write().apply(patch);
        self.state.log(LogLevel::Info, "Configuration updated", None);
    }

    /// Current configuration
    pub fn config(&self) -> ServerConfig {
        self.state.config()
    }

    /// Replace the exposure set with the exposed subset of `entries`
    pub fn set_exposed_prompts(&self, entries: &[ExposureEntry]) {
        let map = ExposureMap::from_entries(entries);
        let requested = entries.iter().filter(|e| e.exposed).count();
        let count = map.len();

        *self.state.exposure.write() = Arc::new(map);

        if count != requested {
            self.state.log(
                LogLevel::Warn,
                "Duplicate exposure entries collapsed",
                Some(json!({ "requested": requested, "kept": count })),
            );
        }
        self.state.log(
            LogLevel::Info,
            format!("Exposed prompts updated: {count}"),
            Some(json!({ "count": count })),
        );
    }

    /// Bind the listener and start serving. Returns the bound port.
    pub async fn start(&self) -> Result<u16> {
        if self.is_running() {
            return Err(Error::AlreadyRunning);
        }

        let config = self.state.config();
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|e| {
                let err = Error::from_bind(&e, &config.host, config.port);
                self.state.log(
                    LogLevel::Error,
                    err.to_string(),
                    Some(json!({ "host": config.host, "port": config.port })),
                );
                err
            })?;
        let port = listener.local_addr()?.port();

        let mut running = self.running.lock();
        if running.is_some() {
            return Err(Error::AlreadyRunning);
        }

        self.state.metrics.reset();
        *self.state.inflight.write() = Arc::new(Semaphore::new(config.max_connections.max(1)));

        let (shutdown_tx, _) = broadcast::channel(1);
        let app = create_router(Arc::clone(&self.state));

        let mut server_shutdown = shutdown_tx.subscribe();
        let server = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
            })
            .await
        });

        let sweeper = spawn_rate_limit_sweeper(Arc::clone(&self.state), shutdown_tx.subscribe());

        *running = Some(RunningServer {
            port,
            shutdown_tx,
            server,
            sweeper,
        });
        drop(running);

        self.state.log(
            LogLevel::Info,
            format!("Server started on http://{}:{port}", config.host),
            Some(json!({ "host": config.host, "port": port, "auth": config.enable_auth })),
        );
        if !config.enable_auth {
            self.state.log(
                LogLevel::Warn,
                "Authentication disabled - gateway is open to all local requests",
                None,
            );
        }

        Ok(port)
    }

    /// Stop accepting connections and wait for in-flight requests to drain
    pub async fn stop(&self) -> Result<()> {
        let Some(running) = self.running.lock().take() else {
            return Err(Error::NotRunning);
        };

        let _ = running.shutdown_tx.send(());

        let served = running
            .server
            .await
            .map_err(|e| Error::Internal(format!("Server task failed: {e}")))?;
        if let Err(e) = running.sweeper.await {
            debug!(error = %e, "Rate limit sweeper ended abnormally");
        }

        match served {
            Ok(()) => {
                self.state.log(
                    LogLevel::Info,
                    "Server stopped",
                    Some(json!({ "port": running.port })),
                );
                Ok(())
            }
            Err(e) => {
                self.state.log(
                    LogLevel::Error,
                    "Server stopped with error",
                    Some(json!({ "error": e.to_string() })),
                );
                Err(Error::Io(e))
            }
        }
    }

    /// Whether the listener is up
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Bound port while running
    pub fn port(&self) -> Option<u16> {
        self.running.lock().as_ref().map(|r| r.port)
    }

    /// Snapshot for the embedding application
    pub fn status(&self) -> GatewayStatus {
        let config = self.state.config();
        let running_port = self.port();
        let metrics = &self.state.metrics;

        GatewayStatus {
            running: running_port.is_some(),
            port: running_port.unwrap_or(config.port),
            exposed_prompt_count: self.state.exposure().len(),
            active_connections: metrics.active_connections(),
            uptime_seconds: if running_port.is_some() {
                metrics.uptime_seconds()
            } else {
                0
            },
            total_requests: metrics.total_requests(),
            total_errors: metrics.total_errors(),
            total_faults: metrics.total_faults(),
            recent_logs: self.state.logs.recent(STATUS_LOG_COUNT),
            config,
        }
    }

    /// Empty the log buffer
    pub fn clear_logs(&self) {
        self.state.logs.clear();
        self.state.log(LogLevel::Info, "Logs cleared", None);
    }
}

/// Periodically evict rate-limit records whose window has passed
fn spawn_rate_limit_sweeper(
    state: Arc<AppState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = state.config().rate_limit_sweep_interval;
        if period.is_zero() {
            let _ = shutdown_rx.recv().await;
            return;
        }

        let mut interval = tokio::time::interval(period);
        // first tick completes immediately
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let removed = state.rate_limiter.sweep_expired(Instant::now());
                    if removed > 0 {
                        state.log(
                            LogLevel::Debug,
                            "Evicted expired rate limit records",
                            Some(json!({ "removed": removed })),
                        );
                    }
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use prompt_gateway_core::{InMemoryPromptStore, PromptRecord};

    use super::*;

    fn gateway() -> Gateway {
        let store =
            InMemoryPromptStore::from_records([PromptRecord::new(5, "Test", "Hi {{name}}")]);
        Gateway::new(
            ServerConfig {
                port: 0,
                ..ServerConfig::default()
            },
            Arc::new(store),
        )
    }

    #[tokio::test]
    async fn start_stop_lifecycle() {
        let gateway = gateway();
        assert!(!gateway.is_running());
        assert!(matches!(gateway.stop().await, Err(Error::NotRunning)));

        let port = gateway.start().await.unwrap();
        assert_ne!(port, 0);
        assert!(gateway.is_running());
        assert_eq!(gateway.port(), Some(port));
        assert!(matches!(gateway.start().await, Err(Error::AlreadyRunning)));

        gateway.stop().await.unwrap();
        assert!(!gateway.is_running());
        assert_eq!(gateway.status().uptime_seconds, 0);
    }

    #[tokio::test]
    async fn port_in_use_is_reported() {
        let first = gateway();
        let port = first.start().await.unwrap();

        let second = gateway();
        second.configure(ServerConfigPatch {
            port: Some(port),
            ..ServerConfigPatch::default()
        });
        let err = second.start().await.unwrap_err();
        assert!(matches!(err, Error::AddressInUse { .. }), "{err}");
        assert!(!second.is_running());

        first.stop().await.unwrap();
    }

    #[tokio::test]
    async fn restart_after_stop() {
        let gateway = gateway();
        gateway.start().await.unwrap();
        gateway.stop().await.unwrap();
        gateway.start().await.unwrap();
        assert!(gateway.is_running());
        gateway.stop().await.unwrap();
    }

    #[test]
    fn exposure_updates_are_counted_and_logged() {
        let gateway = gateway();
        gateway.set_exposed_prompts(&[
            ExposureEntry::new(5, "abc123", true),
            ExposureEntry::new(6, "def456", false),
        ]);

        let status = gateway.status();
        assert_eq!(status.exposed_prompt_count, 1);
        assert_eq!(status.recent_logs[0].message, "Exposed prompts updated: 1");
    }

    #[test]
    fn status_when_stopped() {
        let gateway = gateway();
        let status = gateway.status();
        assert!(!status.running);
        assert_eq!(status.port, 0);
        assert_eq!(status.uptime_seconds, 0);
        assert_eq!(status.total_requests, 0);
    }

    #[test]
    fn clear_logs_leaves_only_cleared_entry() {
        let gateway = gateway();
        gateway.configure(ServerConfigPatch::default());
        gateway.set_exposed_prompts(&[]);
        gateway.clear_logs();

        let logs = gateway.status().recent_logs;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "Logs cleared");
    }

    #[test]
    fn status_returns_at_most_ten_logs_newest_first() {
        let gateway = gateway();
        for n in 0..15 {
            gateway.set_exposed_prompts(&vec![ExposureEntry::new(1, "h", true); n % 2]);
        }
        let logs = gateway.status().recent_logs;
        assert_eq!(logs.len(), STATUS_LOG_COUNT);
        assert!(logs.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn configure_merges_fields() {
        let gateway = gateway();
        gateway.configure(ServerConfigPatch {
            rate_limit: Some(9),
            enable_cors: Some(false),
            ..ServerConfigPatch::default()
        });
        let config = gateway.config();
        assert_eq!(config.rate_limit, 9);
        assert!(!config.enable_cors);
        assert_eq!(config.host, "127.0.0.1");
    }
}
