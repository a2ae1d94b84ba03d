//! HTTP surface exposing the tool registry to remote agents.

mod error;
mod routes;

pub use error::ServerError;
pub use routes::{CallToolRequest, ToolInventoryResponse};

use axum::Router;
use axum::routing::{get, post};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::tool::ToolRegistry;

/// Routes: `POST /tools/{name}`, `GET /tools`, `GET /health`.
pub fn router(registry: Arc<ToolRegistry>) -> Router {
    Router::new()
        .route("/tools", get(routes::list_tools))
        .route("/tools/{name}", post(routes::call_tool))
        .route("/health", get(routes::health))
        .with_state(registry)
}

/// Binds `addr` and serves until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    registry: Arc<ToolRegistry>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    info!(%addr, tools = registry.len(), "Binding tool server");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    serve_on(listener, registry, shutdown).await
}

/// Serves on an already bound listener.
pub async fn serve_on(
    listener: TcpListener,
    registry: Arc<ToolRegistry>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Tool server ready to accept connections");
    }
    axum::serve(listener, router(registry))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)
}
