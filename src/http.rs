//! Read-only HTTP surface over the tracking state.

use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::reconcile::{RecordTracker, SharedState};

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/statusz", get(statusz))
        .route("/cnames", get(cnames))
        .fallback(hello)
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: SharedState) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "listening for status requests");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// One line per record with a target, ordered by hostname.
pub fn render_cnames(tracker: &RecordTracker) -> String {
    tracker
        .snapshot()
        .into_iter()
        .filter(|record| !record.target.is_empty())
        .map(|record| {
            format!(
                "service={} cname={} elb={} state={}\n",
                record.owning_service, record.hostname, record.target, record.state
            )
        })
        .collect()
}

async fn healthz() -> impl IntoResponse {
    ([("Server-Status", "OK")], "OK")
}

async fn statusz(State(state): State<SharedState>) -> String {
    let summary = state.read().await.summary();

    format!("OK\n{summary}\n")
}

async fn cnames(State(state): State<SharedState>) -> String {
    render_cnames(&state.read().await.records)
}

async fn hello() -> &'static str {
    "Hello!"
}
