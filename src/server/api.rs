use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use super::auth::ManagerSession;
use crate::error::Error;
use crate::stats::{self, ManagerStats};
use crate::storage::Database;

pub const PRODUCTION: &str = "production";

pub struct AppState {
    pub db: Database,
    /// Deployment environment name. Anything but `production` exposes error
    /// detail in 500 responses.
    pub environment: String,
}

impl AppState {
    pub fn new(db: Database, environment: impl Into<String>) -> Self {
        Self {
            db,
            environment: environment.into(),
        }
    }

    pub fn expose_errors(&self) -> bool {
        self.environment != PRODUCTION
    }
}

pub type SharedState = Arc<AppState>;

// ── Envelope ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Unauthorized".to_string(),
            detail: None,
        }
    }

    /// Map a library error onto a response. Infrastructure failures are
    /// logged here and only carry their detail when `expose_detail` is set.
    pub fn from_error(err: Error, expose_detail: bool) -> Self {
        match err {
            Error::Unauthorized(_) => Self::unauthorized(),
            Error::NotFound(msg) => Self {
                status: StatusCode::NOT_FOUND,
                message: msg,
                detail: None,
            },
            other => {
                log::error!("Request failed: {other}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Failed to fetch manager statistics".to_string(),
                    detail: expose_detail.then(|| other.to_string()),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: self.message,
            error: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}

// ── Handlers ──────────────────────────────────────────────────────────

pub async fn health() -> &'static str {
    "OK"
}

pub async fn manager_stats(
    State(state): State<SharedState>,
    session: ManagerSession,
) -> Result<Json<ApiResponse<ManagerStats>>, ApiError> {
    let stats = stats::compute_manager_stats(&state.db, &session.manager_id, Utc::now())
        .await
        .map_err(|e| ApiError::from_error(e, state.expose_errors()))?;
    Ok(Json(ApiResponse::ok(
        "Manager statistics retrieved successfully",
        stats,
    )))
}
