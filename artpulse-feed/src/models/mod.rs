//! Request payload models shared between API handlers and services

pub mod batch;

pub use batch::{
    ActionPayload, BatchEvents, BatchRequest, EngagementEventPayload, ErrorEventPayload,
    PerfMetricPayload, ProcessedCounts,
};
