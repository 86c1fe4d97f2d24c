//! Authentication utilities
//!
//! - `password`: Argon2id hashing for stored user passwords

pub mod password;
