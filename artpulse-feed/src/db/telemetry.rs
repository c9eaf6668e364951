//! Performance metric and error event persistence
//!
//! Both categories are stored verbatim with no further processing. Their
//! insert failures are soft: the ingestion pipeline logs and carries on.

use sqlx::SqlitePool;

use artpulse_common::Result;

use crate::models::{ErrorEventPayload, PerfMetricPayload};

pub async fn insert_performance(
    pool: &SqlitePool,
    session_id: &str,
    metrics: &[PerfMetricPayload],
    fallback_timestamp: &str,
) -> Result<u64> {
    if metrics.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;

    for metric in metrics {
        let metadata = metric
            .metadata
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "{}".to_string());
        let timestamp = metric.timestamp.as_deref().unwrap_or(fallback_timestamp);

        sqlx::query(
            "INSERT INTO performance_metrics (session_id, metric_type, value, metadata, timestamp) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(&metric.metric_type)
        .bind(metric.value)
        .bind(metadata)
        .bind(timestamp)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(metrics.len() as u64)
}

pub async fn insert_errors(
    pool: &SqlitePool,
    session_id: &str,
    errors: &[ErrorEventPayload],
    fallback_timestamp: &str,
) -> Result<u64> {
    if errors.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;

    for error in errors {
        let metadata = error
            .metadata
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "{}".to_string());
        let timestamp = error.timestamp.as_deref().unwrap_or(fallback_timestamp);

        sqlx::query(
            "INSERT INTO error_events (session_id, error_type, message, stack_trace, metadata, timestamp) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(&error.error_type)
        .bind(&error.message)
        .bind(&error.stack_trace)
        .bind(metadata)
        .bind(timestamp)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(errors.len() as u64)
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

    #[tokio::test]
    async fn performance_metrics_stored_verbatim() {
        let pool = test_pool().await;
        let metrics = vec![PerfMetricPayload {
            metric_type: Some("frame_drop".to_string()),
            value: Some(3.0),
            metadata: Some(serde_json::json!({"screen": "feed"})),
            timestamp: None,
        }];

        let inserted = insert_performance(&pool, "s1", &metrics, "2026-02-01T10:00:00+00:00")
            .await
            .unwrap();
        assert_eq!(inserted, 1);

        let (metric_type, timestamp): (String, String) =
            sqlx::query_as("SELECT metric_type, timestamp FROM performance_metrics")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(metric_type, "frame_drop");
        assert_eq!(timestamp, "2026-02-01T10:00:00+00:00");
    }

    #[tokio::test]
    async fn error_events_keep_stack_traces() {
        let pool = test_pool().await;
        let errors = vec![ErrorEventPayload {
            error_type: Some("js_exception".to_string()),
            message: Some("undefined is not a function".to_string()),
            stack_trace: Some("at feed.tsx:42".to_string()),
            metadata: None,
            timestamp: Some("2026-02-01T09:00:00+00:00".to_string()),
        }];

        let inserted = insert_errors(&pool, "s1", &errors, "2026-02-01T10:00:00+00:00")
            .await
            .unwrap();
        assert_eq!(inserted, 1);

        let stack: Option<String> = sqlx::query_scalar("SELECT stack_trace FROM error_events")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stack.as_deref(), Some("at feed.tsx:42"));
    }
}
