//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseHealth,
    pub storage: StorageHealth,
    pub email_enabled: bool,
}

/// Database health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// Upload directory status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageHealth {
    pub root: String,
    pub available: bool,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

impl HealthResponse {
    fn healthy(&self) -> bool {
        self.database.connected && self.storage.available
    }
}

async fn database_ping(state: &AppState) -> bool {
    sqlx::query("SELECT 1").execute(&state.pool).await.is_ok()
}

/// Full health check endpoint.
///
/// Reports database connectivity, whether the upload directory exists and
/// whether outgoing mail is enabled.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let start = std::time::Instant::now();
    let db_connected = database_ping(&state).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let root = state.storage.root();
    let storage_available = tokio::fs::metadata(root)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    let mut response = HealthResponse {
        status: String::new(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            connected: db_connected,
            latency_ms: if db_connected { Some(latency_ms) } else { None },
        },
        storage: StorageHealth {
            root: root.display().to_string(),
            available: storage_available,
        },
        email_enabled: state.email.is_enabled(),
    };

    if response.healthy() {
        response.status = "healthy".to_string();
        Ok(Json(response))
    } else {
        response.status = "unhealthy".to_string();
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

/// Liveness probe endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 OK if the service can accept traffic (database connected).
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    if database_ping(&state).await {
        Ok(Json(StatusResponse {
            status: "ready".to_string(),
        }))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(connected: bool, storage: bool) -> HealthResponse {
        HealthResponse {
            status: String::new(),
            version: "0.1.0".to_string(),
            database: DatabaseHealth {
                connected,
                latency_ms: connected.then_some(5),
            },
            storage: StorageHealth {
                root: "/tmp/uploads".to_string(),
                available: storage,
            },
            email_enabled: false,
        }
    }

    #[test]
    fn test_healthy_requires_database_and_storage() {
        assert!(response(true, true).healthy());
        assert!(!response(false, true).healthy());
        assert!(!response(true, false).healthy());
    }

    #[test]
    fn test_health_response_serialization() {
        let json = serde_json::to_value(response(true, true)).unwrap();
        assert_eq!(json["database"]["connected"], true);
        assert_eq!(json["database"]["latency_ms"], 5);
        assert_eq!(json["storage"]["root"], "/tmp/uploads");
        assert_eq!(json["email_enabled"], false);
    }

    #[test]
    fn test_status_response() {
        let response = StatusResponse {
            status: "alive".to_string(),
        };
        assert_eq!(response.status, "alive");
    }
}
