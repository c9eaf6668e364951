//! # ArtPulse Common Library
//!
//! Shared code for the ArtPulse feed services including:
//! - Error types
//! - Configuration loading
//! - Database initialization and schema
//! - Shared row models

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
