//! Bearer token resolution
//!
//! Both endpoints accept an optional bearer token. A valid token binds the
//! request to a user; an absent token means an anonymous request. A token
//! that is present but unknown or expired is an authentication error - the
//! request is never silently downgraded to anonymous, since that would file
//! the client's telemetry under the wrong identity.

use axum::http::HeaderMap;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use artpulse_common::{Error, Result};

/// Identity resolved from a bearer token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub person_id: Option<String>,
}

/// Resolve the optional Authorization header to a user identity.
///
/// Returns `Ok(None)` for anonymous requests, `Err(Error::Auth)` when a
/// token is present but invalid or expired.
pub async fn resolve_bearer(pool: &SqlitePool, headers: &HeaderMap) -> Result<Option<AuthUser>> {
    let header = match headers.get(axum::http::header::AUTHORIZATION) {
        Some(value) => value,
        None => return Ok(None),
    };

    let raw = header
        .to_str()
        .map_err(|_| Error::Auth("malformed authorization header".to_string()))?;

    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    if token.is_empty() {
        return Err(Error::Auth("empty bearer token".to_string()));
    }

    let row = sqlx::query(
        "SELECT user_id, person_id, expires_at FROM auth_tokens WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let row = row.ok_or_else(|| Error::Auth("unknown token".to_string()))?;

    let expires_at: Option<String> = row.get("expires_at");
    if let Some(expires_at) = expires_at {
        if expires_at <= Utc::now().to_rfc3339() {
            return Err(Error::Auth("expired token".to_string()));
        }
    }

    Ok(Some(AuthUser {
        user_id: row.get("user_id"),
        person_id: row.get("person_id"),
    }))
}
