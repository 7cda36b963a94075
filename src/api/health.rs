//! Liveness and readiness probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode};
use serde::Serialize;

use crate::api::types::Json;

use super::state::AppState;

const STORE_UNAVAILABLE: &str = "User store is unavailable";

/// Body of `/health` and `/ready`
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub ready: bool,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_store: Option<StoreStatus>,
}

/// Result of a round-trip to the user store
#[derive(Debug, Serialize)]
pub struct StoreStatus {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: u64,
}

impl StoreStatus {
    /// Failure details stay in the logs
    fn unreachable(latency_ms: u64) -> Self {
        Self {
            reachable: false,
            users: None,
            error: Some(STORE_UNAVAILABLE.to_string()),
            latency_ms,
        }
    }
}

impl ProbeReport {
    fn new(user_store: Option<StoreStatus>) -> Self {
        let ready = user_store.as_ref().is_none_or(|store| store.reachable);

        Self {
            ready,
            version: env!("CARGO_PKG_VERSION"),
            user_store,
        }
    }

    fn status_code(&self) -> StatusCode {
        if self.ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// GET /health
pub async fn health_check() -> Json<ProbeReport> {
    Json(ProbeReport::new(None))
}

/// GET /ready
///
/// 503 until the user store answers a count query.
pub async fn ready_check(State(state): State<AppState>) -> (StatusCode, Json<ProbeReport>) {
    let report = ProbeReport::new(Some(probe_user_store(&state).await));
    (report.status_code(), Json(report))
}

/// GET /live
pub async fn live_check() -> StatusCode {
    StatusCode::OK
}

async fn probe_user_store(state: &AppState) -> StoreStatus {
    let started = Instant::now();
    let counted = state.user_service.count().await;
    let latency_ms = started.elapsed().as_millis() as u64;

    match counted {
        Ok(users) => StoreStatus {
            reachable: true,
            users: Some(users),
            error: None,
            latency_ms,
        },
        Err(e) => {
            tracing::warn!(error = %e, "User store failed readiness probe");
            StoreStatus::unreachable(latency_ms)
        }
    }
}
