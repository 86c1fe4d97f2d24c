//! PostgreSQL user repository
//!
//! Fixed statements use `sqlx::query_as`; the partial update and the
//! filtered list are composed with `sqlx::QueryBuilder` so that every piece
//! of user input is a bound parameter. Sort columns come from a closed enum
//! and are the only values pushed into SQL text.
//!
//! # Example
//!
//! ```no_run
//! use userdesk_shared::db::pool::{create_pool, DatabaseConfig};
//! use userdesk_shared::models::user::UserListQuery;
//! use userdesk_shared::repository::{PgUserRepository, UserRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//! let users = PgUserRepository::new(pool);
//!
//! let (total, page) = users.list(&UserListQuery::new().page(1, 10)).await?;
//! println!("{} users, {} on this page", total, page.len());
//! # Ok(())
//! # }
//! ```

use super::{escape_like, RepositoryError, RepositoryResult, UserRepository};
use crate::db::pool::health_check;
use crate::models::{
    task::UserTasks,
    user::{NewUser, User, UserChanges, UserListQuery, UserOrderColumn, UserStatus, UserSummary},
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};

const USER_COLUMNS: &str = "id, username, password, status";
const SUMMARY_COLUMNS: &str = "id, username, status";

/// [`UserRepository`] over a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, e.g. for closing it on shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn find_summary(&self, id: i64) -> RepositoryResult<Option<UserSummary>> {
        let user = sqlx::query_as::<_, UserSummary>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            SUMMARY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

/// Maps a unique violation on `users.username` to `UsernameTaken`
fn map_write_error(err: sqlx::Error, username: Option<&str>) -> RepositoryError {
    if let (sqlx::Error::Database(db_err), Some(username)) = (&err, username) {
        if db_err.is_unique_violation() {
            return RepositoryError::UsernameTaken(username.to_string());
        }
    }
    RepositoryError::Database(err)
}

/// Appends the WHERE clause shared by the count and page statements
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &UserListQuery) {
    builder.push(" WHERE 1=1");

    if let Some(search) = &query.search {
        builder
            .push(" AND username ILIKE ")
            .push_bind(format!("%{}%", escape_like(search)));
    }

    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status);
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self), err)]
    async fn list_active(&self) -> RepositoryResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE status = $1 ORDER BY id DESC",
            USER_COLUMNS
        ))
        .bind(UserStatus::Active)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    #[instrument(skip(self, data), fields(username = %data.username), err)]
    async fn create(&self, data: NewUser) -> RepositoryResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password) VALUES ($1, $2) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&data.username)
        .bind(&data.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, Some(&data.username)))?;

        debug!(user_id = user.id, "Inserted user");
        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self, changes), err)]
    async fn update(&self, id: i64, changes: UserChanges) -> RepositoryResult<Option<UserSummary>> {
        if changes.is_empty() {
            return self.find_summary(id).await;
        }

        let username = changes.username.clone();

        let mut query = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        let mut set = query.separated(", ");
        if let Some(new_username) = changes.username {
            set.push("username = ").push_bind_unseparated(new_username);
        }
        if let Some(password_hash) = changes.password_hash {
            set.push("password = ").push_bind_unseparated(password_hash);
        }
        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(SUMMARY_COLUMNS);

        let user = query
            .build_query_as::<UserSummary>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, username.as_deref()))?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        // tasks.user_id cascades
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn set_status(&self, id: i64, status: UserStatus) -> RepositoryResult<Option<UserSummary>> {
        let user = sqlx::query_as::<_, UserSummary>(&format!(
            "UPDATE users SET status = $2 WHERE id = $1 RETURNING {}",
            SUMMARY_COLUMNS
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn find_with_tasks(&self, id: i64) -> RepositoryResult<Option<UserTasks>> {
        let rows = sqlx::query_as::<_, (String, Option<String>, Option<bool>)>(
            r#"
            SELECT u.username, t.name, t.done
            FROM users u
            LEFT JOIN tasks t ON t.user_id = u.id
            WHERE u.id = $1
            ORDER BY t.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(UserTasks::from_joined_rows(rows))
    }

    #[instrument(skip(self, query), fields(limit = query.limit, offset = query.offset), err)]
    async fn list(&self, query: &UserListQuery) -> RepositoryResult<(i64, Vec<UserSummary>)> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_filters(&mut count_query, query);
        let total: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut page_query = QueryBuilder::<Postgres>::new("SELECT ");
        page_query.push(SUMMARY_COLUMNS).push(" FROM users");
        push_filters(&mut page_query, query);

        let direction = query.order_dir.as_sql();
        page_query
            .push(" ORDER BY ")
            .push(query.order_by.as_sql())
            .push(" ")
            .push(direction);
        // Stable pages when sorting by a non-unique column
        if query.order_by != UserOrderColumn::Id {
            page_query.push(", id ").push(direction);
        }
        page_query
            .push(" LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        debug!(sql = page_query.sql(), "Listing users");

        let users = page_query
            .build_query_as::<UserSummary>()
            .fetch_all(&self.pool)
            .await?;

        Ok((total, users))
    }

    async fn ping(&self) -> RepositoryResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }
}
