//! Personalization profile recomputation
//!
//! The profile update is a pure function over `(old profile, batch events,
//! content metadata)` so the math is testable in isolation and the
//! last-write-wins upsert race stays an explicit, documented property of the
//! persistence layer rather than an accident of interleaved mutation.

use std::collections::HashMap;

use chrono::{Local, Timelike, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use artpulse_common::db::models::ProfileRow;
use artpulse_common::Result;

use crate::db;
use crate::models::EngagementEventPayload;

/// EMA weight on the previous average dwell time
pub const DWELL_EMA_OLD_WEIGHT: f64 = 0.8;
/// EMA weight on the current batch's mean dwell time
pub const DWELL_EMA_NEW_WEIGHT: f64 = 0.2;
/// Dwell beyond this signals interest even without an explicit action
pub const LONG_DWELL_MS: i64 = 5000;

/// Liked-set caps. At cap, further additions are ignored (no eviction).
pub const MAX_LIKED_CATEGORIES: usize = 50;
pub const MAX_LIKED_ARTISTS: usize = 100;
pub const MAX_LIKED_STYLES: usize = 30;

/// Content metadata consulted during taste extraction
#[derive(Debug, Clone, Default)]
pub struct TasteSource {
    pub tags: Vec<String>,
    pub mood_tags: Vec<String>,
    pub artist_id: Option<String>,
}

/// Whether an event carries a taste signal worth extracting
pub fn signals_interest(event: &EngagementEventPayload) -> bool {
    event.has_action("like") || event.has_action("share") || event.dwell_ms() > LONG_DWELL_MS
}

/// Map a wall-clock hour to a usage-time bucket
pub fn usage_time_bucket(hour: u32) -> &'static str {
    match hour {
        6..=11 => "morning",
        12..=17 => "afternoon",
        18..=23 => "evening",
        _ => "night",
    }
}

fn push_capped(list: &mut Vec<String>, value: String, cap: usize) {
    if list.len() < cap && !list.contains(&value) {
        list.push(value);
    }
}

/// Compute the next profile from the previous one and a batch of events.
///
/// `taste_sources` maps content ids to catalog metadata for the events that
/// signal interest; events without a source entry contribute only dwell time.
pub fn recompute_profile(
    old: Option<&ProfileRow>,
    user_id: &str,
    person_id: Option<&str>,
    events: &[EngagementEventPayload],
    taste_sources: &HashMap<String, TasteSource>,
    hour: u32,
    now: &str,
) -> ProfileRow {
    let mut categories = old.map(|p| p.liked_category_list()).unwrap_or_default();
    let mut artists = old.map(|p| p.liked_artist_list()).unwrap_or_default();
    let mut styles = old.map(|p| p.liked_style_list()).unwrap_or_default();

    let mut dwell_total: i64 = 0;
    let mut dwell_count: i64 = 0;

    for event in events {
        if event.dwell_ms() > 0 {
            dwell_total += event.dwell_ms();
            dwell_count += 1;
        }

        if !signals_interest(event) {
            continue;
        }
        let Some(source) = taste_sources.get(&event.content_id) else {
            continue;
        };

        for tag in &source.tags {
            push_capped(&mut categories, tag.clone(), MAX_LIKED_CATEGORIES);
        }
        for mood in &source.mood_tags {
            push_capped(&mut styles, mood.clone(), MAX_LIKED_STYLES);
        }
        // Artist taste only applies to artworks
        if event.content_type.as_deref() == Some("artwork") {
            if let Some(artist_id) = &source.artist_id {
                push_capped(&mut artists, artist_id.clone(), MAX_LIKED_ARTISTS);
            }
        }
    }

    let old_avg = old.map(|p| p.avg_dwell_time_ms).unwrap_or(0);
    let avg_dwell_time_ms = if dwell_count > 0 {
        let batch_mean = dwell_total as f64 / dwell_count as f64;
        (old_avg as f64 * DWELL_EMA_OLD_WEIGHT + batch_mean * DWELL_EMA_NEW_WEIGHT).round() as i64
    } else {
        old_avg
    };

    ProfileRow {
        user_id: user_id.to_string(),
        person_id: person_id
            .map(String::from)
            .or_else(|| old.and_then(|p| p.person_id.clone())),
        liked_categories: serde_json::to_string(&categories).unwrap_or_else(|_| "[]".to_string()),
        liked_artists: serde_json::to_string(&artists).unwrap_or_else(|_| "[]".to_string()),
        liked_styles: serde_json::to_string(&styles).unwrap_or_else(|_| "[]".to_string()),
        avg_dwell_time_ms,
        primary_usage_time: usage_time_bucket(hour).to_string(),
        last_updated: now.to_string(),
    }
}

/// Recompute and persist the profile for one user after a batch.
///
/// Best-effort: the caller runs this in a spawned task and only logs
/// failures. A content row that cannot be fetched simply contributes no
/// taste signal.
pub async fn update_profile_for_batch(
    pool: &SqlitePool,
    user_id: &str,
    person_id: Option<&str>,
    events: &[EngagementEventPayload],
) -> Result<()> {
    let old = db::profiles::get_profile(pool, user_id).await?;

    let mut taste_sources: HashMap<String, TasteSource> = HashMap::new();
    for event in events.iter().filter(|e| signals_interest(e)) {
        if taste_sources.contains_key(&event.content_id) {
            continue;
        }
        match db::content::fetch_by_content_id(pool, &event.content_id).await {
            Ok(Some(row)) => {
                taste_sources.insert(
                    event.content_id.clone(),
                    TasteSource {
                        tags: row.tag_list(),
                        mood_tags: row.mood_tag_list(),
                        artist_id: row.artist_id(),
                    },
                );
            }
            Ok(None) => {
                debug!(content_id = %event.content_id, "No catalog row for engaged content");
            }
            Err(e) => {
                // Metadata lookup failure must not sink the whole update
                warn!(content_id = %event.content_id, error = %e, "Content lookup failed during preference update");
            }
        }
    }

    let profile = recompute_profile(
        old.as_ref(),
        user_id,
        person_id,
        events,
        &taste_sources,
        Local::now().hour(),
        &Utc::now().to_rfc3339(),
    );

    db::profiles::upsert_profile(pool, &profile).await
}
