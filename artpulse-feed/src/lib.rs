//! artpulse-feed library interface
//!
//! Exposes application state and router construction for the binary and for
//! integration tests.

pub mod api;
pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Feature switches for ranking passes the product has not enabled yet.
///
/// Both passes exist in the ranking engine but ship disabled; enabling them
/// changes observable feed behavior and is a product decision, not a default.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedFlags {
    /// Post-selection diversity pass: at most two consecutive items of the
    /// same content type, applied before the final shuffle.
    pub diversity_pass: bool,
    /// Exposure tracking: record `shown` rows for returned items and exclude
    /// previously shown/engaged content from candidate retrieval.
    pub exposure_tracking: bool,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Ranking feature switches
    pub flags: FeedFlags,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self::with_flags(db, FeedFlags::default())
    }

    pub fn with_flags(db: SqlitePool, flags: FeedFlags) -> Self {
        Self {
            db,
            flags,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Both feed endpoints are consumed cross-origin by the mobile/web client, so
/// CORS is fully permissive (including preflight OPTIONS).
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::ingest_routes())
        .merge(api::feed_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
