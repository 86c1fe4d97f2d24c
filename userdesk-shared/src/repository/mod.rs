//! User persistence
//!
//! [`UserRepository`] is the only way handlers touch stored users. Two
//! implementations are provided:
//!
//! - `postgres`: [`PgUserRepository`], backed by a sqlx `PgPool`
//! - `in_memory`: [`InMemoryUserRepository`], used by tests and the
//!   `DATABASE_URL=memory` development mode
//!
//! Both enforce the same rules: unique usernames, new users start `ACTIVE`,
//! and deleting a user deletes their tasks.

use crate::models::{
    task::UserTasks,
    user::{NewUser, User, UserChanges, UserListQuery, UserStatus, UserSummary},
};
use async_trait::async_trait;

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryUserRepository;
pub use postgres::PgUserRepository;

/// Repository result type alias
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors raised by a [`UserRepository`]
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Another user already holds this username
    #[error("Username already exists: {0}")]
    UsernameTaken(String),

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage operations for the user resource
///
/// Every method is a single logical query. Methods returning `Option`
/// use `None` for "no such user" so callers decide how to report it.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Users with status `ACTIVE`, newest id first
    async fn list_active(&self) -> RepositoryResult<Vec<User>>;

    /// Inserts a user with status `ACTIVE`
    ///
    /// # Errors
    ///
    /// `RepositoryError::UsernameTaken` if the username is already in use.
    async fn create(&self, data: NewUser) -> RepositoryResult<User>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>>;

    /// Applies a partial update and returns the resulting summary
    ///
    /// An empty change set writes nothing and returns the current record.
    /// `None` if the user does not exist.
    async fn update(&self, id: i64, changes: UserChanges) -> RepositoryResult<Option<UserSummary>>;

    /// Hard-deletes a user and their tasks. Returns false if nothing was deleted.
    async fn delete(&self, id: i64) -> RepositoryResult<bool>;

    /// Writes a new status. `None` if the user does not exist.
    async fn set_status(&self, id: i64, status: UserStatus) -> RepositoryResult<Option<UserSummary>>;

    /// Username plus tasks ordered by task id. `None` if the user does not exist.
    async fn find_with_tasks(&self, id: i64) -> RepositoryResult<Option<UserTasks>>;

    /// One page of users matching `query`, plus the total number of matches
    async fn list(&self, query: &UserListQuery) -> RepositoryResult<(i64, Vec<UserSummary>)>;

    /// Connectivity check used by the health endpoint
    async fn ping(&self) -> RepositoryResult<()>;
}

/// Escapes `%`, `_` and `\` so a search term matches literally inside LIKE
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
