//! Session upsert and lookup
//!
//! Sessions are keyed by the client-generated `session_id` and never deleted.
//! `last_active` keeps the newest timestamp seen, not the last arrival, so
//! out-of-order batch delivery cannot move a session backwards in time.

use sqlx::SqlitePool;

use artpulse_common::db::models::SessionRow;
use artpulse_common::Result;

/// Fields written by a session upsert
#[derive(Debug, Clone, Default)]
pub struct SessionUpsert<'a> {
    pub session_id: &'a str,
    pub user_id: Option<&'a str>,
    pub person_id: Option<&'a str>,
    pub last_active: &'a str,
    pub device_info: Option<&'a serde_json::Value>,
    pub app_version: Option<&'a str>,
    pub os_version: Option<&'a str>,
}

/// Upsert a session row.
///
/// Identity and device fields only move from NULL to a value or value to
/// newer value; they are never cleared by a sparser later batch.
pub async fn upsert_session(pool: &SqlitePool, upsert: SessionUpsert<'_>) -> Result<()> {
    let device_info = upsert.device_info.map(|v| v.to_string());

    sqlx::query(
        r#"
        INSERT INTO sessions (
            session_id, user_id, person_id, last_active,
            device_info, app_version, os_version
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(session_id) DO UPDATE SET
            last_active = MAX(last_active, excluded.last_active),
            user_id = COALESCE(excluded.user_id, user_id),
            person_id = COALESCE(excluded.person_id, person_id),
            device_info = COALESCE(excluded.device_info, device_info),
            app_version = COALESCE(excluded.app_version, app_version),
            os_version = COALESCE(excluded.os_version, os_version)
        "#,
    )
    .bind(upsert.session_id)
    .bind(upsert.user_id)
    .bind(upsert.person_id)
    .bind(upsert.last_active)
    .bind(device_info)
    .bind(upsert.app_version)
    .bind(upsert.os_version)
    .execute(pool)
    .await?;

    Ok(())
}

/// Bind a resolved user identity to an existing session (feed requests)
pub async fn attach_user(
    pool: &SqlitePool,
    session_id: &str,
    user_id: &str,
    person_id: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE sessions SET user_id = ?, person_id = ? WHERE session_id = ?")
        .bind(user_id)
        .bind(person_id)
        .bind(session_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn get_session(pool: &SqlitePool, session_id: &str) -> Result<Option<SessionRow>> {
    let session = sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT session_id, user_id, person_id, started_at, last_active,
               device_info, app_version, os_version
        FROM sessions
        WHERE session_id = ?
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(session)
}

/// Most recent device_info for a user, for the geo_aware segment check
pub async fn latest_device_info_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<String>> {
    let device_info: Option<Option<String>> = sqlx::query_scalar(
        r#"
        SELECT device_info FROM sessions
        WHERE user_id = ?
        ORDER BY last_active DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(device_info.flatten())
}
