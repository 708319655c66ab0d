//! API Server
//!
//! Binds the REST router and serves it until shutdown is requested.

use crate::error::{Error, Result};
use crate::inventory::processor::InventoryProcessor;
use crate::metrics::IngestMetrics;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use super::rest::{RestRouter, DEFAULT_MAX_BODY_SIZE};

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// REST API bind address
    pub rest_addr: SocketAddr,
    /// Max request body size
    pub max_body_size: usize,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            rest_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8090),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ApiServerConfig {
    /// Config bound to `addr`, e.g. `127.0.0.1:8090`
    pub fn with_addr(addr: &str) -> Result<Self> {
        let rest_addr = addr
            .parse()
            .map_err(|e| Error::Configuration(format!("invalid API address '{}': {}", addr, e)))?;

        Ok(Self {
            rest_addr,
            ..Default::default()
        })
    }
}

// =============================================================================
// API Server
// =============================================================================

/// REST API server with broadcast shutdown
pub struct ApiServer {
    config: ApiServerConfig,
    processor: Arc<InventoryProcessor>,
    metrics: Arc<IngestMetrics>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    pub fn new(
        config: ApiServerConfig,
        processor: Arc<InventoryProcessor>,
        metrics: Arc<IngestMetrics>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            processor,
            metrics,
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &ApiServerConfig {
        &self.config
    }

    /// Serve until [`shutdown`](Self::shutdown) is called
    pub async fn run(&self) -> Result<()> {
        let app = RestRouter::new(self.processor.clone(), self.metrics.clone())
            .with_max_body_size(self.config.max_body_size)
            .build();

        let listener = tokio::net::TcpListener::bind(self.config.rest_addr)
            .await
            .map_err(|e| Error::Internal(format!("Failed to bind REST server: {}", e)))?;

        info!(
            addr = %self.config.rest_addr,
            backend = self.processor.backend_name(),
            "REST API listening"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("REST server shutting down");
            })
            .await
            .map_err(|e| Error::Internal(format!("REST server error: {}", e)))?;

        Ok(())
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
