//! Personalized feed endpoint
//!
//! `POST /app/feed/personalized` - retrieves candidates, filters, scores,
//! selects and shuffles a feed page for a session.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use chrono::{Local, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use artpulse_common::db::models::ProfileRow;

use crate::auth;
use crate::db;
use crate::db::engagement::ExposureRecord;
use crate::db::sessions::SessionUpsert;
use crate::error::{ApiError, ApiResult};
use crate::services::ranking::{FeedRanker, Reasoning, ScoredContent};
use crate::AppState;

/// Feed algorithm version reported to clients
pub const ALGORITHM_VERSION: &str = "1.0.0";
/// Candidate pool multiplier: retrieve this many times the page size
pub const CANDIDATE_POOL_FACTOR: usize = 3;
/// Reported personalization strength when a profile is attached
pub const PERSONALIZATION_STRENGTH: f64 = 0.75;

fn default_count() -> usize {
    20
}

fn default_context() -> String {
    "default".to_string()
}

fn default_content_types() -> Vec<String> {
    ["artwork", "event", "artist_spotlight", "artist_application"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Feed page request
#[derive(Debug, Clone, Deserialize)]
pub struct FeedRequest {
    pub session_id: Option<String>,
    #[serde(default)]
    pub exclude_ids: Vec<String>,
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default = "default_context")]
    pub context: String,
    #[serde(default = "default_content_types")]
    pub content_types: Vec<String>,
}

/// One feed item with its flattened content payload
#[derive(Debug, Serialize)]
pub struct FeedItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub content_id: String,
    pub score: f64,
    pub reasoning: &'static str,
    pub data: serde_json::Value,
}

/// Reasoning-label distribution over the returned page
#[derive(Debug, Serialize)]
pub struct Distribution {
    pub exploitation: f64,
    pub exploration: f64,
    pub trending: f64,
}

/// Algorithm metadata attached to every feed response
#[derive(Debug, Serialize)]
pub struct AlgorithmInfo {
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Distribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personalization_strength: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub session_id: String,
    pub items: Vec<FeedItem>,
    pub algorithm: AlgorithmInfo,
}

fn empty_response(session_id: &str) -> FeedResponse {
    FeedResponse {
        session_id: session_id.to_string(),
        items: Vec::new(),
        algorithm: AlgorithmInfo {
            version: ALGORITHM_VERSION,
            message: Some("No available content".to_string()),
            distribution: None,
            personalization_strength: None,
            context: None,
            excluded_count: None,
        },
    }
}

/// POST /app/feed/personalized
pub async fn personalized_feed(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<FeedRequest>, JsonRejection>,
) -> ApiResult<Json<FeedResponse>> {
    let Json(request) = payload
        .map_err(|e| ApiError::Validation(format!("Invalid JSON in request body: {}", e)))?;

    let session_id = request
        .session_id
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("session_id is required".to_string()))?;

    let now = Utc::now().to_rfc3339();
    db::sessions::upsert_session(
        &state.db,
        SessionUpsert {
            session_id: &session_id,
            last_active: &now,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| ApiError::store("session_upsert", e))?;

    let user = auth::resolve_bearer(&state.db, &headers).await?;

    let mut profile: Option<ProfileRow> = None;
    if let Some(user) = &user {
        db::sessions::attach_user(&state.db, &session_id, &user.user_id, user.person_id.as_deref())
            .await
            .map_err(|e| ApiError::store("session_upsert", e))?;
        profile = db::profiles::get_profile(&state.db, &user.user_id)
            .await
            .map_err(|e| ApiError::store("profile_read", e))?;
    }

    let mut excluded = request.exclude_ids.clone();
    if state.flags.exposure_tracking {
        match db::engagement::exposed_content_for_session(&state.db, &session_id).await {
            Ok(seen) => excluded.extend(seen),
            Err(e) => warn!(session_id, error = %e, "Exposure lookup failed"),
        }
    }

    let candidates = db::content::fetch_candidates(
        &state.db,
        &request.content_types,
        &excluded,
        &now,
        (request.count * CANDIDATE_POOL_FACTOR) as i64,
    )
    .await
    .map_err(|e| ApiError::store("candidate_retrieval", e))?;

    if candidates.is_empty() {
        return Ok(Json(empty_response(&session_id)));
    }

    let candidate_ids: Vec<String> = candidates.iter().map(|c| c.content_id.clone()).collect();
    let dwell = db::engagement::dwell_samples(&state.db, &candidate_ids)
        .await
        .map_err(|e| ApiError::store("dwell_stats", e))?;

    let ranker = FeedRanker::default();
    let pool = ranker.apply_quality_filter(candidates, &dwell);
    if pool.is_empty() {
        return Ok(Json(empty_response(&session_id)));
    }

    let scored = ranker.score_candidates(&pool, profile.as_ref(), &request.context, Local::now().hour());
    let mut selected = if state.flags.diversity_pass {
        ranker.select_diverse(scored, request.count)
    } else {
        ranker.select(scored, request.count)
    };
    ranker.shuffle(&mut selected);

    if state.flags.exposure_tracking {
        spawn_shown_tracking(&state, &session_id, user.as_ref().map(|u| u.user_id.clone()), &selected, &now);
    }

    let total = selected.len();
    let count_with = |reason: Reasoning| {
        selected.iter().filter(|s| s.reasoning == reason).count() as f64
    };
    let fraction = |n: f64| if total > 0 { n / total as f64 } else { 0.0 };

    let distribution = Distribution {
        exploitation: fraction(count_with(Reasoning::Personalized)),
        exploration: fraction(count_with(Reasoning::Exploration)),
        trending: fraction(count_with(Reasoning::Trending)),
    };

    let items = selected.iter().map(feed_item).collect();

    Ok(Json(FeedResponse {
        session_id,
        items,
        algorithm: AlgorithmInfo {
            version: ALGORITHM_VERSION,
            message: None,
            distribution: Some(distribution),
            personalization_strength: Some(if profile.is_some() {
                PERSONALIZATION_STRENGTH
            } else {
                0.0
            }),
            context: Some(request.context),
            excluded_count: Some(excluded.len()),
        },
    }))
}

/// Flatten a scored content row into the client item contract.
///
/// The type-specific `data` payload merges last, so it may override the base
/// fields for its content type.
fn feed_item(scored: &ScoredContent) -> FeedItem {
    let content = &scored.content;

    let mut data = serde_json::Map::new();
    data.insert("title".to_string(), json!(content.title));
    data.insert("description".to_string(), json!(content.description));
    data.insert("imageUrl".to_string(), json!(content.image_url));
    data.insert("videoUrl".to_string(), json!(content.video_url));
    data.insert("thumbnailUrl".to_string(), json!(content.thumbnail_url));
    data.insert("imageUrls".to_string(), json!(content.image_url_list()));
    data.insert("thumbnailUrls".to_string(), json!(content.thumbnail_url_list()));
    data.insert("tags".to_string(), json!(content.tag_list()));
    data.insert("colorPalette".to_string(), json!(content.color_palette_list()));
    data.insert("moodTags".to_string(), json!(content.mood_tag_list()));
    data.insert("engagementScore".to_string(), json!(content.engagement_score));
    data.insert("trendingScore".to_string(), json!(content.trending_score));
    data.insert("qualityScore".to_string(), json!(content.quality_score));
    for (key, value) in content.data_object() {
        data.insert(key, value);
    }

    FeedItem {
        id: format!("feed_{}", content.id),
        item_type: content.content_type.clone(),
        content_id: content.content_id.clone(),
        score: scored.score,
        reasoning: scored.reasoning.as_str(),
        data: serde_json::Value::Object(data),
    }
}

/// Record `shown` exposures for a returned page, fire-and-forget
fn spawn_shown_tracking(
    state: &AppState,
    session_id: &str,
    user_id: Option<String>,
    selected: &[ScoredContent],
    now: &str,
) {
    let exposures: Vec<ExposureRecord> = selected
        .iter()
        .map(|s| ExposureRecord {
            session_id: session_id.to_string(),
            user_id: user_id.clone(),
            item_id: Some(s.content.id.to_string()),
            content_id: s.content.content_id.clone(),
            interaction_type: "shown".to_string(),
            timestamp: now.to_string(),
            dwell_time_ms: None,
            action_count: 0,
        })
        .collect();

    let pool = state.db.clone();
    tokio::spawn(async move {
        if let Err(e) = db::engagement::insert_exposures(&pool, &exposures).await {
            warn!(error = %e, "Shown-exposure tracking failed");
        }
    });
}

/// Build feed routes
pub fn feed_routes() -> Router<AppState> {
    Router::new().route("/app/feed/personalized", post(personalized_feed))
}
