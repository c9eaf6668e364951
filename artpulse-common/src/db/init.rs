//! Database initialization
//!
//! Opens (or creates) the SQLite database, applies connection pragmas and
//! creates any missing tables. Schema creation is idempotent - every statement
//! is `CREATE TABLE IF NOT EXISTS`, so startup is safe against existing data.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Current schema version, recorded in the schema_version table
const SCHEMA_VERSION: i64 = 1;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // mode=rwc creates the database file on first run
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer; ingestion batches and
    // feed requests hit the same tables from many handlers at once
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables if missing (idempotent - safe to call multiple times)
///
/// Exposed separately so integration tests can apply the schema to an
/// in-memory database without touching the filesystem.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_sessions_table(pool).await?;
    create_engagement_events_table(pool).await?;
    create_exposure_log_table(pool).await?;
    create_performance_metrics_table(pool).await?;
    create_error_events_table(pool).await?;
    create_curated_content_table(pool).await?;
    create_personalization_profiles_table(pool).await?;
    create_content_stats_table(pool).await?;
    create_auth_tokens_table(pool).await?;
    create_artist_profiles_table(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

/// Client sessions, one row per client-generated session token.
///
/// Upsert-only: sessions are never deleted, `last_active` is last-write-wins.
async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            session_id TEXT PRIMARY KEY,
            user_id TEXT,
            person_id TEXT,
            started_at TEXT NOT NULL DEFAULT (datetime('now')),
            last_active TEXT NOT NULL,
            device_info TEXT,
            app_version TEXT,
            os_version TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Append-only log of per-slot interaction events
async fn create_engagement_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS engagement_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            user_id TEXT,
            person_id TEXT,
            item_id TEXT,
            content_id TEXT NOT NULL,
            content_type TEXT,
            timestamp TEXT NOT NULL,
            dwell_time_ms INTEGER,
            viewport_percentage REAL,
            video_watch_percentage REAL,
            actions TEXT NOT NULL DEFAULT '[]',
            gestures TEXT NOT NULL DEFAULT '[]',
            exit_action TEXT,
            swipe_velocity REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_engagement_content ON engagement_events (content_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_engagement_user_ts ON engagement_events (user_id, timestamp)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Qualifying exposures, used for repeat suppression
async fn create_exposure_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS exposure_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            user_id TEXT,
            item_id TEXT,
            content_id TEXT NOT NULL,
            interaction_type TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            dwell_time_ms INTEGER,
            action_count INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_exposure_session ON exposure_log (session_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_performance_metrics_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS performance_metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            metric_type TEXT NOT NULL,
            value REAL,
            metadata TEXT NOT NULL DEFAULT '{}',
            timestamp TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_error_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS error_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            error_type TEXT,
            message TEXT,
            stack_trace TEXT,
            metadata TEXT NOT NULL DEFAULT '{}',
            timestamp TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Curated content catalog. Owned by an external curation process;
/// this core only reads it.
async fn create_curated_content_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS curated_content (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content_id TEXT NOT NULL UNIQUE,
            content_type TEXT NOT NULL,
            title TEXT,
            description TEXT,
            image_url TEXT,
            video_url TEXT,
            thumbnail_url TEXT,
            image_urls TEXT,
            thumbnail_urls TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            color_palette TEXT NOT NULL DEFAULT '[]',
            mood_tags TEXT NOT NULL DEFAULT '[]',
            engagement_score REAL NOT NULL DEFAULT 0,
            trending_score REAL NOT NULL DEFAULT 0,
            quality_score REAL NOT NULL DEFAULT 0,
            data TEXT NOT NULL DEFAULT '{}',
            status TEXT NOT NULL DEFAULT 'active',
            available_until TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_content_status_type ON curated_content (status, content_type)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Per-user derived taste model, recomputed by the ingestion pipeline
async fn create_personalization_profiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS personalization_profiles (
            user_id TEXT PRIMARY KEY,
            person_id TEXT,
            liked_categories TEXT NOT NULL DEFAULT '[]',
            liked_artists TEXT NOT NULL DEFAULT '[]',
            liked_styles TEXT NOT NULL DEFAULT '[]',
            avg_dwell_time_ms INTEGER NOT NULL DEFAULT 0,
            primary_usage_time TEXT NOT NULL DEFAULT 'day',
            last_updated TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Rolling per-content counters. Mutated only through atomic increments.
async fn create_content_stats_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_stats (
            content_id TEXT PRIMARY KEY,
            content_type TEXT,
            view_count INTEGER NOT NULL DEFAULT 0,
            like_count INTEGER NOT NULL DEFAULT 0,
            share_count INTEGER NOT NULL DEFAULT 0,
            save_count INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Bearer token resolution table. Rows are written by the auth service;
/// this core only reads them to bind requests to a user.
async fn create_auth_tokens_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS auth_tokens (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            person_id TEXT,
            expires_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Artist profiles, owned by the artist workflow service; read here only
/// for the `artist` segment check.
async fn create_artist_profiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artist_profiles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            person_id TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_artist_person ON artist_profiles (person_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
