//! HTTP listener for the action protocol.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{ActionResponse, ApiService};
use crate::error::Result;

/// Router with the single action endpoint.
pub fn router(api: ApiService) -> Router {
    Router::new().route("/", post(action)).with_state(api)
}

async fn action(
    State(api): State<ApiService>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Json<ActionResponse> {
    match body {
        Ok(body) => Json(api.handle(&body).await),
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            Json(ApiService::read_failure())
        }
    }
}

/// Serves until `shutdown` is cancelled.
pub async fn serve(addr: SocketAddr, api: ApiService, shutdown: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "fwdd: HTTP listener started");
    axum::serve(listener, router(api))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("fwdd: HTTP listener stopped");
    Ok(())
}
