use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;

use super::api::{ApiError, SharedState};
use crate::model::Role;
use crate::session::{self, Session, SESSION_COOKIE};

/// A request made by an authenticated manager. Extraction fails with 401
/// before the handler body runs.
#[derive(Debug, Clone)]
pub struct ManagerSession {
    pub manager_id: String,
}

/// Session token from the `session_token` cookie, else from a bearer header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<SharedState> for ManagerSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Err(ApiError::unauthorized());
        };

        let resolved = session::resolve_session(&state.db, &token, Utc::now())
            .await
            .map_err(|e| ApiError::from_error(e, state.expose_errors()))?;

        match resolved {
            Some(Session {
                user_id,
                role: Role::Manager,
            }) => Ok(ManagerSession {
                manager_id: user_id,
            }),
            Some(Session { user_id, role }) => {
                log::debug!("Rejecting {role} session for {user_id} on a manager route");
                Err(ApiError::unauthorized())
            }
            None => Err(ApiError::unauthorized()),
        }
    }
}
