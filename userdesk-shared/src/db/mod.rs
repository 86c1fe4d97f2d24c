//! Database layer
//!
//! - `pool`: PostgreSQL connection pool with health checks
//! - `migrations`: embedded sqlx migration runner
//!
//! Queries themselves live in [`crate::repository`].

pub mod migrations;
pub mod pool;
