//! Data models shared by the API and the repositories
//!
//! - `user`: user records, projections and the list query builder
//! - `task`: tasks owned by a user (read-only from the API)

pub mod task;
pub mod user;
