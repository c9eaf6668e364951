//! User segment derivation
//!
//! Segments are derived on demand from the engagement and profile stores,
//! never cached or stored. A failing sub-check logs and is skipped; segment
//! tagging is telemetry, not a correctness boundary.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tracing::warn;

use crate::auth::AuthUser;
use crate::db;

/// More than this many engagement events in the window => `active`
pub const ACTIVE_EVENT_THRESHOLD: i64 = 10;
/// More than this many engagement events in the window => `power_user`
pub const POWER_USER_EVENT_THRESHOLD: i64 = 50;
/// Trailing engagement window, in days
pub const ENGAGEMENT_WINDOW_DAYS: i64 = 7;

/// Derive segment tags for the requesting user
pub async fn derive_segments(pool: &SqlitePool, user: Option<&AuthUser>) -> Vec<String> {
    let Some(user) = user else {
        return vec!["anonymous".to_string()];
    };

    let mut segments = vec!["authenticated".to_string()];

    let since = (Utc::now() - Duration::days(ENGAGEMENT_WINDOW_DAYS)).to_rfc3339();
    match db::engagement::count_for_user_since(pool, &user.user_id, &since).await {
        Ok(count) => {
            if count > ACTIVE_EVENT_THRESHOLD {
                segments.push("active".to_string());
            }
            if count > POWER_USER_EVENT_THRESHOLD {
                segments.push("power_user".to_string());
            }
        }
        Err(e) => warn!(user_id = %user.user_id, error = %e, "Engagement count failed during segmentation"),
    }

    match db::profiles::get_profile(pool, &user.user_id).await {
        Ok(Some(profile)) => {
            if !profile.liked_category_list().is_empty() {
                segments.push("personalized".to_string());
            }
        }
        Ok(None) => {}
        Err(e) => warn!(user_id = %user.user_id, error = %e, "Profile read failed during segmentation"),
    }

    if let Some(person_id) = &user.person_id {
        match db::profiles::has_artist_profile(pool, person_id).await {
            Ok(true) => segments.push("artist".to_string()),
            Ok(false) => {}
            Err(e) => warn!(person_id = %person_id, error = %e, "Artist check failed during segmentation"),
        }
    }

    match db::sessions::latest_device_info_for_user(pool, &user.user_id).await {
        Ok(Some(raw)) => {
            let has_location = serde_json::from_str::<serde_json::Value>(&raw)
                .ok()
                .map(|info| !info["location"].is_null())
                .unwrap_or(false);
            if has_location {
                segments.push("geo_aware".to_string());
            }
        }
        Ok(None) => {}
        Err(e) => warn!(user_id = %user.user_id, error = %e, "Device info read failed during segmentation"),
    }

    segments
}
