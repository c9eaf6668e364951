//! Content stat counters
//!
//! Counters are mutated exclusively through an atomic upsert-increment
//! (`INSERT .. ON CONFLICT DO UPDATE SET x = x + 1`). Read-modify-write is
//! forbidden here: concurrent batches touching the same content item would
//! lose increments.

use chrono::Utc;
use sqlx::SqlitePool;

use artpulse_common::db::models::ContentStatRow;
use artpulse_common::Result;

/// Counter kinds tracked per content item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    View,
    Like,
    Share,
    Save,
}

impl StatKind {
    /// Counter for a user action type, if that action is counted
    pub fn from_action(action_type: &str) -> Option<Self> {
        match action_type {
            "like" => Some(StatKind::Like),
            "share" => Some(StatKind::Share),
            "save" => Some(StatKind::Save),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            StatKind::View => "view_count",
            StatKind::Like => "like_count",
            StatKind::Share => "share_count",
            StatKind::Save => "save_count",
        }
    }
}

/// Atomically increment one counter for a content item
pub async fn increment_stat(
    pool: &SqlitePool,
    content_id: &str,
    content_type: Option<&str>,
    kind: StatKind,
) -> Result<()> {
    let column = kind.column();
    let sql = format!(
        "INSERT INTO content_stats (content_id, content_type, {col}, updated_at) \
         VALUES (?, ?, 1, ?) \
         ON CONFLICT(content_id) DO UPDATE SET \
             {col} = {col} + 1, \
             content_type = COALESCE(excluded.content_type, content_type), \
             updated_at = excluded.updated_at",
        col = column
    );

    sqlx::query(&sql)
        .bind(content_id)
        .bind(content_type)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn get_stats(pool: &SqlitePool, content_id: &str) -> Result<Option<ContentStatRow>> {
    let row = sqlx::query_as::<_, ContentStatRow>(
        r#"
        SELECT content_id, content_type, view_count, like_count,
               share_count, save_count, updated_at
        FROM content_stats
        WHERE content_id = ?
        "#,
    )
    .bind(content_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        // One connection so concurrent tasks share the same in-memory database
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        artpulse_common::db::create_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn first_increment_creates_row() {
        let pool = test_pool().await;
        increment_stat(&pool, "c1", Some("artwork"), StatKind::View)
            .await
            .unwrap();

        let stats = get_stats(&pool, "c1").await.unwrap().unwrap();
        assert_eq!(stats.view_count, 1);
        assert_eq!(stats.like_count, 0);
    }

    #[tokio::test]
    async fn increments_accumulate_per_counter() {
        let pool = test_pool().await;
        for _ in 0..3 {
            increment_stat(&pool, "c1", None, StatKind::Like).await.unwrap();
        }
        increment_stat(&pool, "c1", None, StatKind::Share).await.unwrap();

        let stats = get_stats(&pool, "c1").await.unwrap().unwrap();
        assert_eq!(stats.like_count, 3);
        assert_eq!(stats.share_count, 1);
        assert_eq!(stats.view_count, 0);
    }

    #[tokio::test]
    async fn concurrent_likes_are_not_lost() {
        let pool = test_pool().await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                increment_stat(&pool, "c1", None, StatKind::Like).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stats = get_stats(&pool, "c1").await.unwrap().unwrap();
        assert_eq!(stats.like_count, 20);
    }

    #[test]
    fn action_mapping_ignores_uncounted_actions() {
        assert_eq!(StatKind::from_action("like"), Some(StatKind::Like));
        assert_eq!(StatKind::from_action("save"), Some(StatKind::Save));
        assert_eq!(StatKind::from_action("tap"), None);
    }
}
