//! User model, projections and list query builder
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE user_status AS ENUM ('ACTIVE', 'INACTIVE');
//!
//! CREATE TABLE users (
//!     id BIGSERIAL PRIMARY KEY,
//!     username VARCHAR(255) NOT NULL UNIQUE,
//!     password VARCHAR(255) NOT NULL,
//!     status user_status NOT NULL DEFAULT 'ACTIVE'
//! );
//! ```
//!
//! Persistence lives behind [`crate::repository::UserRepository`]; this
//! module only defines the data shapes that cross that boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default page size for the filtered user list
pub const DEFAULT_LIMIT: i64 = 10;

/// Upper bound on the page size for the filtered user list
pub const MAX_LIMIT: i64 = 100;

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    /// Account can be used
    #[default]
    Active,

    /// Account has been switched off
    Inactive,
}

impl UserStatus {
    /// Wire and database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known [`UserStatus`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid status, must be ACTIVE or INACTIVE")]
pub struct InvalidStatus(pub String);

impl FromStr for UserStatus {
    type Err = InvalidStatus;

    /// Parses the exact upper-case names used on the wire
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(UserStatus::Active),
            "INACTIVE" => Ok(UserStatus::Inactive),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// Full user record
///
/// `password` always holds an Argon2id hash, never the plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Database identity, assigned on insert and never changed
    pub id: i64,

    /// Unique login name
    pub username: String,

    /// Argon2id password hash
    pub password: String,

    /// Current account status
    pub status: UserStatus,
}

/// User projection without the password hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub status: UserStatus,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            status: user.status,
        }
    }
}

/// Input for creating a new user
///
/// New users always start out [`UserStatus::Active`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,

    /// Argon2id password hash (NOT the plaintext password!)
    pub password_hash: String,
}

/// Partial update for an existing user
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    /// New username
    pub username: Option<String>,

    /// New password hash
    pub password_hash: Option<String>,
}

impl UserChanges {
    /// True when there is nothing to write
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password_hash.is_none()
    }
}

/// Columns the filtered list may be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserOrderColumn {
    #[default]
    Id,
    Username,
    Status,
}

impl UserOrderColumn {
    /// Sort expression as it appears in SQL
    ///
    /// Usernames sort case-insensitively, byte-wise on the lowercased value,
    /// independent of the database locale.
    pub fn as_sql(&self) -> &'static str {
        match self {
            UserOrderColumn::Id => "id",
            UserOrderColumn::Username => "LOWER(username) COLLATE \"C\"",
            UserOrderColumn::Status => "status",
        }
    }
}

impl FromStr for UserOrderColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(UserOrderColumn::Id),
            "username" => Ok(UserOrderColumn::Username),
            "status" => Ok(UserOrderColumn::Status),
            other => Err(format!(
                "Invalid orderBy '{}', must be one of id, username, status",
                other
            )),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    /// Case-insensitive, so `asc` and `ASC` are both accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(format!("Invalid orderDir '{}', must be ASC or DESC", s)),
        }
    }
}

/// Typed filter for the paginated user list
///
/// Every predicate is optional; an empty query lists all users. Build it with
/// the chained setters, then hand it to
/// [`crate::repository::UserRepository::list`].
///
/// # Example
///
/// ```
/// use userdesk_shared::models::user::{SortDirection, UserListQuery, UserOrderColumn, UserStatus};
///
/// let query = UserListQuery::new()
///     .search("ann")
///     .status(UserStatus::Active)
///     .order(UserOrderColumn::Username, SortDirection::Asc)
///     .page(2, 10);
///
/// assert_eq!(query.offset, 10);
/// assert_eq!(query.limit, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListQuery {
    /// Case-insensitive substring of the username
    pub search: Option<String>,

    /// Exact status match
    pub status: Option<UserStatus>,

    pub order_by: UserOrderColumn,
    pub order_dir: SortDirection,

    /// Page size, always within `1..=MAX_LIMIT`
    pub limit: i64,

    /// Rows skipped before the page starts
    pub offset: i64,
}

impl Default for UserListQuery {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            order_by: UserOrderColumn::default(),
            order_dir: SortDirection::default(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl UserListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a username substring predicate; blank input is ignored
    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.search = if term.is_empty() { None } else { Some(term) };
        self
    }

    pub fn status(mut self, status: UserStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn order(mut self, column: UserOrderColumn, direction: SortDirection) -> Self {
        self.order_by = column;
        self.order_dir = direction;
        self
    }

    /// Selects a 1-based page. `limit` is clamped to `1..=MAX_LIMIT` and
    /// `page` to at least 1, then `offset = (page - 1) * limit`.
    pub fn page(mut self, page: i64, limit: i64) -> Self {
        let page = page.max(1);
        self.limit = limit.clamp(1, MAX_LIMIT);
        self.offset = (page - 1).saturating_mul(self.limit);
        self
    }

    /// 1-based page number this query addresses
    pub fn page_number(&self) -> i64 {
        self.offset / self.limit + 1
    }
}

/// Number of pages needed for `total` rows at `limit` rows per page
pub fn page_count(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}
