//! Personalization profile persistence
//!
//! Profiles are read-modify-upserted by the ingestion pipeline only. The
//! upsert is a deliberate last-write-wins overwrite: concurrent batches for
//! the same user may race and drop each other's additions. That trade-off is
//! accepted; do not add locking here.

use sqlx::SqlitePool;

use artpulse_common::db::models::ProfileRow;
use artpulse_common::Result;

pub async fn get_profile(pool: &SqlitePool, user_id: &str) -> Result<Option<ProfileRow>> {
    let profile = sqlx::query_as::<_, ProfileRow>(
        r#"
        SELECT user_id, person_id, liked_categories, liked_artists, liked_styles,
               avg_dwell_time_ms, primary_usage_time, last_updated
        FROM personalization_profiles
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(profile)
}

/// Overwrite the profile row for a user (last-write-wins)
pub async fn upsert_profile(pool: &SqlitePool, profile: &ProfileRow) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO personalization_profiles (
            user_id, person_id, liked_categories, liked_artists, liked_styles,
            avg_dwell_time_ms, primary_usage_time, last_updated
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            person_id = excluded.person_id,
            liked_categories = excluded.liked_categories,
            liked_artists = excluded.liked_artists,
            liked_styles = excluded.liked_styles,
            avg_dwell_time_ms = excluded.avg_dwell_time_ms,
            primary_usage_time = excluded.primary_usage_time,
            last_updated = excluded.last_updated
        "#,
    )
    .bind(&profile.user_id)
    .bind(&profile.person_id)
    .bind(&profile.liked_categories)
    .bind(&profile.liked_artists)
    .bind(&profile.liked_styles)
    .bind(profile.avg_dwell_time_ms)
    .bind(&profile.primary_usage_time)
    .bind(&profile.last_updated)
    .execute(pool)
    .await?;

    Ok(())
}

/// Whether a person has an artist profile (artist segment check)
pub async fn has_artist_profile(pool: &SqlitePool, person_id: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM artist_profiles WHERE person_id = ?")
            .bind(person_id)
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}
