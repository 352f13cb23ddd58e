//! Health check endpoints
//!
//! Kubernetes-style probes:
//! - /health, /healthz - liveness (is the service running?)
//! - /ready, /readyz - readiness (can it serve traffic?)
//!
//! Liveness always returns 200. Readiness requires a persistent ledger store,
//! unless dev mode is enabled (the memory ledger is acceptable there).

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::helpers::{json_response, BoxBody};
use crate::server::AppState;

/// Health response body
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall health status (true if service is running)
    pub healthy: bool,
    /// Service version
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    /// Current timestamp
    pub timestamp: String,
    /// Operating mode
    pub mode: String,
    /// Node identifier
    pub node_id: String,
    /// Ledger store status
    pub ledger: LedgerHealth,
}

/// Ledger store status details
#[derive(Serialize)]
pub struct LedgerHealth {
    /// Backing store ("mongodb" or "memory")
    pub backend: &'static str,
    /// Whether ledger state survives a restart
    pub persistent: bool,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let persistent = state.ledger.is_persistent();

    HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.uptime_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        node_id: state.args.node_id.to_string(),
        ledger: LedgerHealth {
            backend: if persistent { "mongodb" } else { "memory" },
            persistent,
        },
    }
}

/// Handle liveness probe (/health, /healthz)
pub fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    json_response(StatusCode::OK, &build_health_response(&state))
}

/// Handle readiness probe (/ready, /readyz)
///
/// Ready when the ledger is persistent; in dev mode the memory ledger counts.
pub fn readiness_check(state: Arc<AppState>) -> Response<BoxBody> {
    let response = build_health_response(&state);
    let is_ready = response.ledger.persistent || state.args.dev_mode;

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    json_response(status, &response)
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    /// Cargo package version
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    /// Git commit hash (full)
    pub commit_full: &'static str,
    /// Build timestamp
    pub build_time: &'static str,
    /// Service name
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            version: env!("CARGO_PKG_VERSION"),
            commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
            commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
            build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
            service: "bursar",
        },
    )
}
