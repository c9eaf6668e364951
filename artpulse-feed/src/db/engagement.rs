//! Engagement event and exposure log persistence
//!
//! Engagement events are append-only; a whole batch is inserted inside one
//! transaction so a mid-batch failure leaves no partial batch behind.

use std::collections::HashMap;

use sqlx::SqlitePool;

use artpulse_common::Result;

use crate::models::EngagementEventPayload;

/// Insert all engagement events of a batch in one transaction.
///
/// Returns the number of rows inserted.
pub async fn insert_events(
    pool: &SqlitePool,
    session_id: &str,
    user_id: Option<&str>,
    person_id: Option<&str>,
    events: &[EngagementEventPayload],
    fallback_timestamp: &str,
) -> Result<u64> {
    if events.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;

    for event in events {
        let actions = serde_json::to_string(&event.actions)
            .map_err(|e| artpulse_common::Error::Internal(format!("serialize actions: {}", e)))?;
        let gestures = serde_json::to_string(&event.gestures)
            .map_err(|e| artpulse_common::Error::Internal(format!("serialize gestures: {}", e)))?;
        let timestamp = event.timestamp.as_deref().unwrap_or(fallback_timestamp);

        sqlx::query(
            r#"
            INSERT INTO engagement_events (
                session_id, user_id, person_id, item_id, content_id, content_type,
                timestamp, dwell_time_ms, viewport_percentage, video_watch_percentage,
                actions, gestures, exit_action, swipe_velocity
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(person_id)
        .bind(&event.item_id)
        .bind(&event.content_id)
        .bind(&event.content_type)
        .bind(timestamp)
        .bind(event.dwell_time_ms)
        .bind(event.viewport_percentage)
        .bind(event.video_watch_percentage)
        .bind(actions)
        .bind(gestures)
        .bind(&event.exit_action)
        .bind(event.swipe_velocity)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(events.len() as u64)
}

/// One qualifying exposure (or a `shown` record from the feed side)
#[derive(Debug, Clone)]
pub struct ExposureRecord {
    pub session_id: String,
    pub user_id: Option<String>,
    pub item_id: Option<String>,
    pub content_id: String,
    pub interaction_type: String,
    pub timestamp: String,
    pub dwell_time_ms: Option<i64>,
    pub action_count: i64,
}

pub async fn insert_exposures(pool: &SqlitePool, exposures: &[ExposureRecord]) -> Result<u64> {
    if exposures.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;

    for exposure in exposures {
        sqlx::query(
            r#"
            INSERT INTO exposure_log (
                session_id, user_id, item_id, content_id,
                interaction_type, timestamp, dwell_time_ms, action_count
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&exposure.session_id)
        .bind(&exposure.user_id)
        .bind(&exposure.item_id)
        .bind(&exposure.content_id)
        .bind(&exposure.interaction_type)
        .bind(&exposure.timestamp)
        .bind(exposure.dwell_time_ms)
        .bind(exposure.action_count)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(exposures.len() as u64)
}

/// Positive dwell samples grouped by content id, for the feed quality filter
pub async fn dwell_samples(
    pool: &SqlitePool,
    content_ids: &[String],
) -> Result<HashMap<String, Vec<i64>>> {
    if content_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; content_ids.len()].join(", ");
    let sql = format!(
        "SELECT content_id, dwell_time_ms FROM engagement_events \
         WHERE content_id IN ({}) AND dwell_time_ms > 0",
        placeholders
    );

    let mut query = sqlx::query_as::<_, (String, i64)>(&sql);
    for content_id in content_ids {
        query = query.bind(content_id);
    }

    let rows = query.fetch_all(pool).await?;

    let mut samples: HashMap<String, Vec<i64>> = HashMap::new();
    for (content_id, dwell_ms) in rows {
        samples.entry(content_id).or_default().push(dwell_ms);
    }

    Ok(samples)
}

/// Number of engagement events for a user since the given timestamp
pub async fn count_for_user_since(
    pool: &SqlitePool,
    user_id: &str,
    since: &str,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM engagement_events WHERE user_id = ? AND timestamp >= ?",
    )
    .bind(user_id)
    .bind(since)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Content already shown to or engaged by a session (repeat suppression)
pub async fn exposed_content_for_session(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Vec<String>> {
    let rows: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT content_id FROM exposure_log \
         WHERE session_id = ? AND interaction_type IN ('shown', 'engaged')",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionPayload;

    async fn test_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        artpulse_common::db::create_schema(&pool).await.unwrap();
        pool
    }

    fn event(content_id: &str, dwell_ms: i64) -> EngagementEventPayload {
        EngagementEventPayload {
            item_id: Some("slot-1".to_string()),
            content_id: content_id.to_string(),
            content_type: Some("artwork".to_string()),
            timestamp: None,
            dwell_time_ms: Some(dwell_ms),
            viewport_percentage: Some(100.0),
            video_watch_percentage: None,
            actions: vec![ActionPayload {
                action_type: "like".to_string(),
                metadata: None,
            }],
            gestures: vec![],
            exit_action: None,
            swipe_velocity: None,
        }
    }

    #[tokio::test]
    async fn batch_insert_persists_all_events() {
        let pool = test_pool().await;
        let events = vec![event("c1", 2500), event("c2", 0)];

        let inserted = insert_events(
            &pool,
            "s1",
            Some("user-1"),
            None,
            &events,
            "2026-02-01T10:00:00+00:00",
        )
        .await
        .unwrap();
        assert_eq!(inserted, 2);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM engagement_events")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn dwell_samples_ignore_zero_dwell() {
        let pool = test_pool().await;
        let events = vec![event("c1", 2500), event("c1", 4000), event("c1", 0)];
        insert_events(&pool, "s1", None, None, &events, "2026-02-01T10:00:00+00:00")
            .await
            .unwrap();

        let samples = dwell_samples(&pool, &["c1".to_string()]).await.unwrap();
        assert_eq!(samples["c1"], vec![2500, 4000]);
    }

    #[tokio::test]
    async fn recent_count_honors_window_boundary() {
        let pool = test_pool().await;
        let mut old_event = event("c1", 100);
        old_event.timestamp = Some("2026-01-01T00:00:00+00:00".to_string());
        let mut new_event = event("c2", 100);
        new_event.timestamp = Some("2026-02-01T00:00:00+00:00".to_string());

        insert_events(
            &pool,
            "s1",
            Some("user-1"),
            None,
            &[old_event, new_event],
            "2026-02-01T10:00:00+00:00",
        )
        .await
        .unwrap();

        let count = count_for_user_since(&pool, "user-1", "2026-01-15T00:00:00+00:00")
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
