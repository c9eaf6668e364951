//! Shared row models
//!
//! List- and object-valued columns are stored as JSON text in SQLite; the
//! accessor methods parse them, treating malformed stored JSON as empty
//! rather than failing the read.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One client session (analytics correlation key, not an auth session)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRow {
    pub session_id: String,
    pub user_id: Option<String>,
    pub person_id: Option<String>,
    pub started_at: String,
    pub last_active: String,
    pub device_info: Option<String>,
    pub app_version: Option<String>,
    pub os_version: Option<String>,
}

impl SessionRow {
    /// Parsed device_info payload, empty object when absent or malformed
    pub fn device_info_json(&self) -> serde_json::Value {
        self.device_info
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()))
    }
}

/// One curated content item (catalog row, read-only to the feed core)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentRow {
    pub id: i64,
    pub content_id: String,
    pub content_type: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub image_urls: Option<String>,
    pub thumbnail_urls: Option<String>,
    pub tags: String,
    pub color_palette: String,
    pub mood_tags: String,
    pub engagement_score: f64,
    pub trending_score: f64,
    pub quality_score: f64,
    pub data: String,
    pub status: String,
    pub available_until: Option<String>,
}

fn parse_string_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

impl ContentRow {
    pub fn tag_list(&self) -> Vec<String> {
        parse_string_list(&self.tags)
    }

    pub fn mood_tag_list(&self) -> Vec<String> {
        parse_string_list(&self.mood_tags)
    }

    pub fn color_palette_list(&self) -> Vec<String> {
        parse_string_list(&self.color_palette)
    }

    /// Multi-image URL list; falls back to the single image_url column
    pub fn image_url_list(&self) -> Vec<String> {
        self.image_urls
            .as_deref()
            .map(parse_string_list)
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| self.image_url.iter().cloned().collect())
    }

    /// Multi-thumbnail URL list; falls back to the single thumbnail_url column
    pub fn thumbnail_url_list(&self) -> Vec<String> {
        self.thumbnail_urls
            .as_deref()
            .map(parse_string_list)
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| self.thumbnail_url.iter().cloned().collect())
    }

    /// Type-specific payload (carries artistId for artworks)
    pub fn data_object(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::from_str(&self.data).unwrap_or_default()
    }

    /// Artist id from the type-specific payload, if present
    pub fn artist_id(&self) -> Option<String> {
        self.data_object()
            .get("artistId")
            .and_then(|v| v.as_str())
            .map(String::from)
    }
}

/// Per-user derived taste model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileRow {
    pub user_id: String,
    pub person_id: Option<String>,
    pub liked_categories: String,
    pub liked_artists: String,
    pub liked_styles: String,
    pub avg_dwell_time_ms: i64,
    pub primary_usage_time: String,
    pub last_updated: String,
}

impl ProfileRow {
    pub fn liked_category_list(&self) -> Vec<String> {
        parse_string_list(&self.liked_categories)
    }

    pub fn liked_artist_list(&self) -> Vec<String> {
        parse_string_list(&self.liked_artists)
    }

    pub fn liked_style_list(&self) -> Vec<String> {
        parse_string_list(&self.liked_styles)
    }
}

/// Rolling per-content counters
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentStatRow {
    pub content_id: String,
    pub content_type: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub share_count: i64,
    pub save_count: i64,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_row() -> ContentRow {
        ContentRow {
            id: 1,
            content_id: "c1".to_string(),
            content_type: "artwork".to_string(),
            title: Some("Title".to_string()),
            description: None,
            image_url: Some("https://img/1.jpg".to_string()),
            video_url: None,
            thumbnail_url: None,
            image_urls: None,
            thumbnail_urls: None,
            tags: r#"["abstract","bold"]"#.to_string(),
            color_palette: "[]".to_string(),
            mood_tags: r#"["energetic"]"#.to_string(),
            engagement_score: 0.5,
            trending_score: 0.2,
            quality_score: 0.7,
            data: r#"{"artistId":"artist-9"}"#.to_string(),
            status: "active".to_string(),
            available_until: None,
        }
    }

    #[test]
    fn tag_lists_parse_from_json_text() {
        let row = content_row();
        assert_eq!(row.tag_list(), vec!["abstract", "bold"]);
        assert_eq!(row.mood_tag_list(), vec!["energetic"]);
        assert_eq!(row.artist_id().as_deref(), Some("artist-9"));
    }

    #[test]
    fn image_urls_fall_back_to_single_column() {
        let row = content_row();
        assert_eq!(row.image_url_list(), vec!["https://img/1.jpg"]);

        let mut multi = content_row();
        multi.image_urls = Some(r#"["a.jpg","b.jpg"]"#.to_string());
        assert_eq!(multi.image_url_list(), vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn malformed_json_reads_as_empty() {
        let mut row = content_row();
        row.tags = "not json".to_string();
        assert!(row.tag_list().is_empty());
    }
}
