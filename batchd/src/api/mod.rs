//! HTTP API for batchd
//!
//! Thin transport over the scheduler: request validation, routing and
//! error-to-status mapping.

mod error;
mod health;
mod ingest;

use axum::Router;
use eyre::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::scheduler::Scheduler;

pub use error::{ApiError, ApiResult};
pub use health::health_routes;
pub use ingest::{IngestRequest, IngestResponse, ingest_routes, parse_ingest_request};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Scheduler,
    pub max_item_id: u64,
}

impl AppState {
    pub fn new(scheduler: Scheduler, server: &ServerConfig) -> Self {
        Self {
            scheduler,
            max_item_id: server.max_item_id,
        }
    }
}

/// Build the full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(ingest_routes())
        .merge(health_routes())
        .with_state(state)
}

/// Serve the API until `shutdown` resolves, then stop the scheduler
pub async fn serve<F>(state: AppState, server: &ServerConfig, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr = server.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind {}", addr))?;
    info!(%addr, "batchd listening");

    let scheduler = state.scheduler.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    scheduler.shutdown();
    info!("batchd stopped");
    Ok(())
}
