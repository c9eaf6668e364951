//! HTTP API handlers for artpulse-feed

pub mod feed;
pub mod health;
pub mod ingest;

pub use feed::feed_routes;
pub use health::health_routes;
pub use ingest::ingest_routes;
