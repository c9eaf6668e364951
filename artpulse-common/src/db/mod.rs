//! Database access layer
//!
//! Initialization, schema creation and shared row models.

pub mod init;
pub mod models;

pub use init::{create_schema, init_database};
