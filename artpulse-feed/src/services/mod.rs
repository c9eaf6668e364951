//! Core feed services
//!
//! - `batch`: staged processing of one telemetry batch
//! - `preferences`: personalization profile recomputation
//! - `segments`: on-demand user segment derivation
//! - `ranking`: candidate filtering, scoring and selection

pub mod batch;
pub mod preferences;
pub mod ranking;
pub mod segments;
