use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use carmarket_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::{AppState, SERVICE_NAME};

/// Liveness plus a round trip to the storage backend.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let storage = match state.storage.ping().await {
        Ok(()) => HealthCheck {
            name: format!("storage:{}", state.storage.name()),
            status: HealthStatus::Healthy,
            message: None,
        },
        Err(e) => HealthCheck {
            name: format!("storage:{}", state.storage.name()),
            status: HealthStatus::Unhealthy,
            message: Some(e.to_string()),
        },
    };

    let favorites = state.favorites.status();
    let favorites = HealthCheck {
        name: "favorites".to_string(),
        status: if favorites.error.is_some() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        },
        message: favorites.error,
    };

    let response = HealthResponse::healthy(SERVICE_NAME, env!("CARGO_PKG_VERSION"))
        .with_checks(vec![storage, favorites]);

    let status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

/// Returns Prometheus metrics.
pub async fn metrics(State(state): State<AppState>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|h| h.render())
        .unwrap_or_default()
}
