//! Telemetry batch processing
//!
//! One call processes one client batch through its stages:
//!
//! 1. session upsert              (hard failure)
//! 2. engagement insert           (hard failure)
//! 3. stat increments + exposures (fire-and-forget)
//! 4. performance/error inserts   (soft failure, count stays 0)
//! 5. preference recomputation    (spawned, best-effort)
//! 6. segment derivation
//!
//! Hard failures abort the batch with the failing stage in the error; soft
//! failures are logged and visible to the client only through the processed
//! counts.

use chrono::Utc;
use tracing::warn;

use crate::auth::AuthUser;
use crate::db;
use crate::db::engagement::ExposureRecord;
use crate::db::sessions::SessionUpsert;
use crate::db::stats::StatKind;
use crate::error::{ApiError, ApiResult};
use crate::models::{BatchRequest, EngagementEventPayload, ProcessedCounts};
use crate::AppState;

/// Dwell beyond this makes an engagement a qualifying exposure
pub const EXPOSURE_DWELL_MS: i64 = 1000;

/// Result of one processed batch, echoed to the client
#[derive(Debug)]
pub struct BatchOutcome {
    pub batch_id: String,
    pub processed: ProcessedCounts,
    pub recommendations_updated: bool,
    pub user_segments: Vec<String>,
}

/// Process one telemetry batch for a validated session id.
pub async fn process_batch(
    state: &AppState,
    session_id: &str,
    batch: BatchRequest,
    user: Option<&AuthUser>,
) -> ApiResult<BatchOutcome> {
    let now = Utc::now().to_rfc3339();
    let last_active = batch.timestamp.clone().unwrap_or_else(|| now.clone());

    let device_info = batch.device_info.clone();
    let app_version = device_info
        .as_ref()
        .and_then(|d| d["app_version"].as_str().map(String::from));
    let os_version = device_info
        .as_ref()
        .and_then(|d| d["os_version"].as_str().map(String::from));

    // Stage 1: session upsert (hard)
    db::sessions::upsert_session(
        &state.db,
        SessionUpsert {
            session_id,
            user_id: user.map(|u| u.user_id.as_str()),
            person_id: user.and_then(|u| u.person_id.as_deref()),
            last_active: &last_active,
            device_info: device_info.as_ref(),
            app_version: app_version.as_deref(),
            os_version: os_version.as_deref(),
        },
    )
    .await
    .map_err(|e| ApiError::store("session_upsert", e))?;

    let mut processed = ProcessedCounts::default();

    // Stage 2: engagement insert (hard)
    let engagement = &batch.events.engagement;
    if !engagement.is_empty() {
        processed.engagement = db::engagement::insert_events(
            &state.db,
            session_id,
            user.map(|u| u.user_id.as_str()),
            user.and_then(|u| u.person_id.as_deref()),
            engagement,
            &now,
        )
        .await
        .map_err(|e| ApiError::store("engagement_insert", e))?;

        // Stage 3: counters and exposures, fire-and-forget
        spawn_stat_increments(state, engagement);
        spawn_exposure_tracking(state, session_id, user, engagement, &now);
    }

    // Stage 4: performance and error inserts (soft)
    match db::telemetry::insert_performance(&state.db, session_id, &batch.events.performance, &now)
        .await
    {
        Ok(count) => processed.performance = count,
        Err(e) => warn!(session_id, error = %e, "Performance insert failed"),
    }
    match db::telemetry::insert_errors(&state.db, session_id, &batch.events.errors, &now).await {
        Ok(count) => processed.errors = count,
        Err(e) => warn!(session_id, error = %e, "Error-event insert failed"),
    }

    // Navigation events are counted only, not persisted
    processed.navigation = batch.events.navigation.len() as u64;

    // Stage 5: preference recomputation, spawned so it never delays the
    // response; failures are logged and swallowed
    let recommendations_updated = user.is_some();
    if let Some(user) = user {
        if !engagement.is_empty() {
            let pool = state.db.clone();
            let user_id = user.user_id.clone();
            let person_id = user.person_id.clone();
            let events = engagement.clone();
            tokio::spawn(async move {
                if let Err(e) = super::preferences::update_profile_for_batch(
                    &pool,
                    &user_id,
                    person_id.as_deref(),
                    &events,
                )
                .await
                {
                    warn!(user_id = %user_id, error = %e, "Preference update failed");
                }
            });
        }
    }

    // Stage 6: segment derivation for client-side telemetry tagging
    let user_segments = super::segments::derive_segments(&state.db, user).await;

    let batch_id = batch
        .batch_id
        .clone()
        .unwrap_or_else(|| format!("batch_{}", Utc::now().timestamp_millis()));

    Ok(BatchOutcome {
        batch_id,
        processed,
        recommendations_updated,
        user_segments,
    })
}

/// One view increment per event, plus one per qualifying action
fn spawn_stat_increments(state: &AppState, events: &[EngagementEventPayload]) {
    for event in events {
        let pool = state.db.clone();
        let content_id = event.content_id.clone();
        let content_type = event.content_type.clone();
        let action_kinds: Vec<StatKind> = event
            .actions
            .iter()
            .filter_map(|a| StatKind::from_action(&a.action_type))
            .collect();

        tokio::spawn(async move {
            let increments = std::iter::once(StatKind::View).chain(action_kinds);
            for kind in increments {
                if let Err(e) =
                    db::stats::increment_stat(&pool, &content_id, content_type.as_deref(), kind)
                        .await
                {
                    warn!(content_id = %content_id, error = %e, "Stat increment failed");
                }
            }
        });
    }
}

/// Record qualifying exposures (dwell above threshold) for repeat suppression
fn spawn_exposure_tracking(
    state: &AppState,
    session_id: &str,
    user: Option<&AuthUser>,
    events: &[EngagementEventPayload],
    fallback_timestamp: &str,
) {
    let exposures: Vec<ExposureRecord> = events
        .iter()
        .filter(|e| e.dwell_ms() > EXPOSURE_DWELL_MS)
        .map(|e| ExposureRecord {
            session_id: session_id.to_string(),
            user_id: user.map(|u| u.user_id.clone()),
            item_id: e.item_id.clone(),
            content_id: e.content_id.clone(),
            interaction_type: "engaged".to_string(),
            timestamp: e
                .timestamp
                .clone()
                .unwrap_or_else(|| fallback_timestamp.to_string()),
            dwell_time_ms: e.dwell_time_ms,
            action_count: e.actions.len() as i64,
        })
        .collect();

    if exposures.is_empty() {
        return;
    }

    let pool = state.db.clone();
    tokio::spawn(async move {
        if let Err(e) = db::engagement::insert_exposures(&pool, &exposures).await {
            warn!(error = %e, "Exposure tracking failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionPayload, BatchEvents};

    async fn test_state() -> AppState {
        // One connection so every spawned task sees the same in-memory database
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        artpulse_common::db::create_schema(&pool).await.unwrap();
        AppState::new(pool)
    }

    fn engagement_event(content_id: &str, dwell_ms: i64, actions: &[&str]) -> EngagementEventPayload {
        EngagementEventPayload {
            item_id: Some("slot-1".to_string()),
            content_id: content_id.to_string(),
            content_type: Some("artwork".to_string()),
            timestamp: None,
            dwell_time_ms: Some(dwell_ms),
            viewport_percentage: None,
            video_watch_percentage: None,
            actions: actions
                .iter()
                .map(|a| ActionPayload {
                    action_type: a.to_string(),
                    metadata: None,
                })
                .collect(),
            gestures: vec![],
            exit_action: None,
            swipe_velocity: None,
        }
    }

    #[tokio::test]
    async fn batch_reports_per_category_counts() {
        let state = test_state().await;
        let batch = BatchRequest {
            session_id: Some("s1".to_string()),
            events: BatchEvents {
                engagement: vec![engagement_event("c1", 6000, &["like"])],
                navigation: vec![serde_json::json!({"screen": "feed"})],
                ..Default::default()
            },
            ..Default::default()
        };

        let outcome = process_batch(&state, "s1", batch, None).await.unwrap();
        assert_eq!(outcome.processed.engagement, 1);
        assert_eq!(outcome.processed.navigation, 1);
        assert_eq!(outcome.processed.performance, 0);
        assert!(!outcome.recommendations_updated);
        assert_eq!(outcome.user_segments, vec!["anonymous"]);
    }

    #[tokio::test]
    async fn generated_batch_id_when_absent() {
        let state = test_state().await;
        let outcome = process_batch(&state, "s1", BatchRequest::default(), None)
            .await
            .unwrap();
        assert!(outcome.batch_id.starts_with("batch_"));
    }

    #[tokio::test]
    async fn echoed_batch_id_when_present() {
        let state = test_state().await;
        let batch = BatchRequest {
            batch_id: Some("client-batch-9".to_string()),
            ..Default::default()
        };
        let outcome = process_batch(&state, "s1", batch, None).await.unwrap();
        assert_eq!(outcome.batch_id, "client-batch-9");
    }

    #[tokio::test]
    async fn qualifying_exposures_are_recorded() {
        let state = test_state().await;
        let batch = BatchRequest {
            events: BatchEvents {
                engagement: vec![
                    engagement_event("c1", 2000, &[]),
                    engagement_event("c2", 500, &[]),
                ],
                ..Default::default()
            },
            ..Default::default()
        };

        process_batch(&state, "s1", batch, None).await.unwrap();

        // Exposure insert is spawned; give it a moment to land
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let exposed: Vec<String> =
            sqlx::query_scalar("SELECT content_id FROM exposure_log WHERE session_id = 's1'")
                .fetch_all(&state.db)
                .await
                .unwrap();
        assert_eq!(exposed, vec!["c1".to_string()]);
    }

    #[tokio::test]
    async fn stat_increments_land_for_views_and_actions() {
        let state = test_state().await;
        let batch = BatchRequest {
            events: BatchEvents {
                engagement: vec![engagement_event("c1", 2000, &["like", "share", "tap"])],
                ..Default::default()
            },
            ..Default::default()
        };

        process_batch(&state, "s1", batch, None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let stats = db::stats::get_stats(&state.db, "c1").await.unwrap().unwrap();
        assert_eq!(stats.view_count, 1);
        assert_eq!(stats.like_count, 1);
        assert_eq!(stats.share_count, 1);
        assert_eq!(stats.save_count, 0);
    }
}
