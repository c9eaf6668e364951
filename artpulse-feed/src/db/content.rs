//! Curated content catalog queries
//!
//! The catalog is owned by the external curation process; this module only
//! reads it. Candidate retrieval applies the eligibility invariant: status
//! must be active and availability must not have lapsed.

use sqlx::SqlitePool;

use artpulse_common::db::models::ContentRow;
use artpulse_common::Result;

const CONTENT_COLUMNS: &str = "id, content_id, content_type, title, description, \
     image_url, video_url, thumbnail_url, image_urls, thumbnail_urls, \
     tags, color_palette, mood_tags, engagement_score, trending_score, \
     quality_score, data, status, available_until";

/// Fetch eligible feed candidates.
///
/// Retrieval order is arbitrary (rowid order); the ranking engine treats the
/// index only as an exploration signal.
pub async fn fetch_candidates(
    pool: &SqlitePool,
    content_types: &[String],
    exclude_ids: &[String],
    now: &str,
    limit: i64,
) -> Result<Vec<ContentRow>> {
    if content_types.is_empty() {
        return Ok(Vec::new());
    }

    let type_placeholders = vec!["?"; content_types.len()].join(", ");
    let mut sql = format!(
        "SELECT {} FROM curated_content \
         WHERE status = 'active' \
           AND content_type IN ({}) \
           AND (available_until IS NULL OR available_until > ?)",
        CONTENT_COLUMNS, type_placeholders
    );

    if !exclude_ids.is_empty() {
        let exclude_placeholders = vec!["?"; exclude_ids.len()].join(", ");
        sql.push_str(&format!(" AND content_id NOT IN ({})", exclude_placeholders));
    }
    sql.push_str(" LIMIT ?");

    let mut query = sqlx::query_as::<_, ContentRow>(&sql);
    for content_type in content_types {
        query = query.bind(content_type);
    }
    query = query.bind(now);
    for exclude_id in exclude_ids {
        query = query.bind(exclude_id);
    }
    query = query.bind(limit);

    let rows = query.fetch_all(pool).await?;
    Ok(rows)
}

/// Fetch one content row by its stable content id (preference extraction)
pub async fn fetch_by_content_id(
    pool: &SqlitePool,
    content_id: &str,
) -> Result<Option<ContentRow>> {
    let sql = format!(
        "SELECT {} FROM curated_content WHERE content_id = ?",
        CONTENT_COLUMNS
    );

    let row = sqlx::query_as::<_, ContentRow>(&sql)
        .bind(content_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        artpulse_common::db::create_schema(&pool).await.unwrap();
        pool
    }

    async fn seed_content(
        pool: &SqlitePool,
        content_id: &str,
        content_type: &str,
        status: &str,
        available_until: Option<&str>,
    ) {
        sqlx::query(
            "INSERT INTO curated_content (content_id, content_type, title, status, available_until) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(content_id)
        .bind(content_type)
        .bind(format!("Title {}", content_id))
        .bind(status)
        .bind(available_until)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn candidates_respect_status_and_availability() {
        let pool = test_pool().await;
        seed_content(&pool, "c1", "artwork", "active", None).await;
        seed_content(&pool, "c2", "artwork", "inactive", None).await;
        seed_content(&pool, "c3", "artwork", "active", Some("2020-01-01T00:00:00+00:00")).await;
        seed_content(&pool, "c4", "artwork", "active", Some("2099-01-01T00:00:00+00:00")).await;

        let rows = fetch_candidates(
            &pool,
            &["artwork".to_string()],
            &[],
            "2026-02-01T00:00:00+00:00",
            60,
        )
        .await
        .unwrap();

        let ids: Vec<_> = rows.iter().map(|r| r.content_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c4"]);
    }

    #[tokio::test]
    async fn excluded_ids_are_never_returned() {
        let pool = test_pool().await;
        seed_content(&pool, "c1", "event", "active", None).await;
        seed_content(&pool, "c2", "event", "active", None).await;

        let rows = fetch_candidates(
            &pool,
            &["event".to_string()],
            &["c1".to_string()],
            "2026-02-01T00:00:00+00:00",
            60,
        )
        .await
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content_id, "c2");
    }

    #[tokio::test]
    async fn type_restriction_applies() {
        let pool = test_pool().await;
        seed_content(&pool, "c1", "event", "active", None).await;
        seed_content(&pool, "c2", "artwork", "active", None).await;

        let rows = fetch_candidates(
            &pool,
            &["artwork".to_string()],
            &[],
            "2026-02-01T00:00:00+00:00",
            60,
        )
        .await
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content_type, "artwork");
    }
}
