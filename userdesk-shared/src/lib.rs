//! # Userdesk Shared Library
//!
//! Types and persistence used by the Userdesk API server.
//!
//! ## Module Organization
//!
//! - `models`: user and task records, projections, list query builder
//! - `repository`: the `UserRepository` trait with Postgres and in-memory backends
//! - `auth`: password hashing
//! - `db`: connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod repository;

/// Current version of the Userdesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
