//! Health check endpoints for Kubernetes probes

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use super::state::AppState;
use crate::api::types::Json;
use crate::domain::RetrievalOrigin;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceCheck>>,
}

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// A configured retrieval source
#[derive(Serialize)]
pub struct SourceCheck {
    pub name: String,
    pub origin: RetrievalOrigin,
    pub weight: f64,
}

/// Returns 200 while the process is serving
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        sources: None,
    };

    (StatusCode::OK, Json(response))
}

/// Ready once at least one retrieval source is configured
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let sources: Vec<SourceCheck> = state
        .sources
        .iter()
        .map(|weighted| SourceCheck {
            name: weighted.source.name().to_string(),
            origin: weighted.source.origin(),
            weight: weighted.weight,
        })
        .collect();

    let (status, code) = if sources.is_empty() {
        (HealthStatus::Unhealthy, StatusCode::SERVICE_UNAVAILABLE)
    } else {
        (HealthStatus::Healthy, StatusCode::OK)
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        sources: Some(sources),
    };

    (code, Json(response))
}

pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}
