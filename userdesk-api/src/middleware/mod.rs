//! Custom tower middleware
//!
//! - `security`: Security response headers

pub mod security;
