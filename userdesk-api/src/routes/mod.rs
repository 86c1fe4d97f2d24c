//! API route handlers
//!
//! - `health`: Health check endpoint
//! - `users`: User resource (CRUD, status, tasks, paginated listing)

pub mod health;
pub mod users;
