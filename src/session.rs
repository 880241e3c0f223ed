//! Session tokens: issuance for the CLI, resolution for the HTTP layer.

use chrono::{DateTime, Duration, Utc};

use crate::date_util::format_timestamp;
use crate::error::{Error, Result};
use crate::model::Role;
use crate::storage::repository::{self, SessionRow};
use crate::storage::Database;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session_token";

pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Identity behind an active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub role: Role,
}

/// Resolve `token` to the identity it belongs to as of `now`.
///
/// Unknown and expired tokens resolve to `None`, as do sessions whose stored
/// role is not one of the known roles.
pub async fn resolve_session(
    db: &Database,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<Session>> {
    let token = token.to_string();
    let now = format_timestamp(now);
    let row = db
        .reader()
        .call(move |conn| repository::find_active_session(conn, &token, &now))
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    match row.role.parse::<Role>() {
        Ok(role) => Ok(Some(Session {
            user_id: row.user_id,
            role,
        })),
        Err(e) => {
            log::warn!("Ignoring session for {}: {e}", row.user_id);
            Ok(None)
        }
    }
}

/// Issue a new token for `user_id` valid for `ttl` from `now`.
pub async fn create_session(
    db: &Database,
    user_id: &str,
    role: Role,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<SessionRow> {
    if ttl <= Duration::zero() {
        return Err(Error::InvalidValue {
            field: "session ttl",
            value: format!("{}h", ttl.num_hours()),
        });
    }

    let session = SessionRow {
        token: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        role: role.as_str().to_string(),
        created_at: format_timestamp(now),
        expires_at: format_timestamp(now + ttl),
    };

    let row = session.clone();
    let created = db
        .writer()
        .call(move |conn| {
            if !repository::user_exists(conn, &row.user_id, role)? {
                return Ok(false);
            }
            repository::insert_session(conn, &row)?;
            Ok::<bool, rusqlite::Error>(true)
        })
        .await?;

    if !created {
        return Err(Error::NotFound(format!("{role} {user_id}")));
    }
    log::info!("Created {role} session for {user_id}, expires {}", session.expires_at);
    Ok(session)
}

/// Delete a session. Returns whether a session was removed.
pub async fn revoke_session(db: &Database, token: &str) -> Result<bool> {
    let token = token.to_string();
    let removed = db
        .writer()
        .call(move |conn| repository::delete_session(conn, &token))
        .await?;
    Ok(removed)
}

pub async fn purge_expired_sessions(db: &Database, now: DateTime<Utc>) -> Result<usize> {
    let now = format_timestamp(now);
    let purged = db
        .writer()
        .call(move |conn| repository::purge_expired_sessions(conn, &now))
        .await?;
    if purged > 0 {
        log::info!("Purged {purged} expired session(s)");
    }
    Ok(purged)
}
