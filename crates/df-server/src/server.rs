//! Server implementation

use crate::config::ServerConfig;
use crate::http_server::{self, AppState};
use axum::Router;
use df_core::{Error, Result};
use df_graph::Database;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A bound service and its serving task
struct Listener {
    service: &'static str,
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

/// DataFoundation Server
pub struct Server {
    /// Server configuration
    config: ServerConfig,

    /// Database instance
    database: Database,

    /// Running state
    running: AtomicBool,

    /// Update and query listeners while running
    listeners: Mutex<Vec<Listener>>,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: ServerConfig) -> Result<Self> {
        let database = config.open_database()?;

        Ok(Self {
            config,
            database,
            running: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the database
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Check if server is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Address a service is bound to, once started
    pub fn local_addr(&self, service: &str) -> Option<SocketAddr> {
        self.listeners
            .lock()
            .iter()
            .find(|listener| listener.service == service)
            .map(|listener| listener.addr)
    }

    /// Start the update and query services
    pub async fn start(&self) -> Result<()> {
        if self.is_running() {
            return Err(Error::Configuration("Server already running".to_string()));
        }

        info!("Starting DataFoundation server...");
        info!(
            "Storage backend: {} (data directory {:?})",
            self.config.storage, self.config.data_dir
        );
        info!("Duplicate create policy: {}", self.config.duplicate_policy);

        let state = AppState::new(&self.database, &self.config);
        let update_router = http_server::update_router(state.clone());
        let update = self
            .spawn_service("update", &self.config.update_addr(), update_router)
            .await?;
        let query_router = http_server::query_router(state);
        let query = match self
            .spawn_service("query", &self.config.query_addr(), query_router)
            .await
        {
            Ok(query) => query,
            Err(e) => {
                update.handle.abort();
                return Err(e);
            }
        };

        if let Some(ref url) = self.config.query_base_url {
            info!("Query service advertised at {}", url);
        }

        self.listeners.lock().extend([update, query]);
        self.running.store(true, Ordering::SeqCst);

        info!("DataFoundation server started successfully");
        Ok(())
    }

    async fn spawn_service(
        &self,
        service: &'static str,
        addr: &str,
        router: Router,
    ) -> Result<Listener> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        info!("{} service listening on {}", service, addr);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                warn!("{} service error: {}", service, e);
            }
        });

        Ok(Listener {
            service,
            addr,
            handle,
        })
    }

    /// Stop the server
    pub async fn stop(&self) -> Result<()> {
        if !self.is_running() {
            return Err(Error::Configuration("Server not running".to_string()));
        }

        info!("Stopping DataFoundation server...");

        for listener in self.listeners.lock().drain(..) {
            listener.handle.abort();
        }

        // Flush data
        self.database.flush()?;

        self.running.store(false, Ordering::SeqCst);

        info!("DataFoundation server stopped");
        Ok(())
    }

    /// Get server version
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
