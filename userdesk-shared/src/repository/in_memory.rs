//! In-memory user repository
//!
//! Mirrors [`super::PgUserRepository`] semantics on top of a `RwLock`ed
//! map. Used by the API test suite and when the server runs with
//! `DATABASE_URL=memory`.

use super::{RepositoryError, RepositoryResult, UserRepository};
use crate::models::{
    task::{Task, TaskSummary, UserTasks},
    user::{
        NewUser, SortDirection, User, UserChanges, UserListQuery, UserOrderColumn, UserStatus,
        UserSummary,
    },
};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, Task>,
    next_user_id: i64,
    next_task_id: i64,
}

impl Tables {
    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }
}

/// [`UserRepository`] kept entirely in process memory
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    tables: RwLock<Tables>,
    queries: AtomicUsize,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task for `user_id`. Returns `None` if the user does not exist.
    ///
    /// The HTTP surface never creates tasks; this is for seeding.
    pub async fn insert_task(&self, user_id: i64, name: &str, done: bool) -> Option<Task> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return None;
        }

        tables.next_task_id += 1;
        let task = Task {
            id: tables.next_task_id,
            name: name.to_string(),
            done,
            user_id,
        };
        tables.tasks.insert(task.id, task.clone());
        Some(task)
    }

    /// Number of repository operations served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(AtomicOrdering::SeqCst)
    }

    fn record_query(&self) {
        self.queries.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

fn compare(a: &User, b: &User, column: UserOrderColumn) -> Ordering {
    let primary = match column {
        UserOrderColumn::Id => Ordering::Equal,
        // Same rule as LOWER(username) COLLATE "C"
        UserOrderColumn::Username => a.username.to_lowercase().cmp(&b.username.to_lowercase()),
        // Postgres orders enum values by declaration order
        UserOrderColumn::Status => status_rank(a.status).cmp(&status_rank(b.status)),
    };
    primary.then(a.id.cmp(&b.id))
}

fn status_rank(status: UserStatus) -> u8 {
    match status {
        UserStatus::Active => 0,
        UserStatus::Inactive => 1,
    }
}

fn matches_filter(user: &User, query: &UserListQuery) -> bool {
    let search_ok = query.search.as_ref().map_or(true, |term| {
        user.username.to_lowercase().contains(&term.to_lowercase())
    });
    let status_ok = query.status.map_or(true, |status| user.status == status);
    search_ok && status_ok
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn list_active(&self) -> RepositoryResult<Vec<User>> {
        self.record_query();
        let tables = self.tables.read().await;

        Ok(tables
            .users
            .values()
            .rev()
            .filter(|u| u.status == UserStatus::Active)
            .cloned()
            .collect())
    }

    async fn create(&self, data: NewUser) -> RepositoryResult<User> {
        self.record_query();
        let mut tables = self.tables.write().await;

        if tables.username_taken(&data.username, None) {
            return Err(RepositoryError::UsernameTaken(data.username));
        }

        tables.next_user_id += 1;
        let user = User {
            id: tables.next_user_id,
            username: data.username,
            password: data.password_hash,
            status: UserStatus::Active,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        self.record_query();
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn update(&self, id: i64, changes: UserChanges) -> RepositoryResult<Option<UserSummary>> {
        self.record_query();
        let mut tables = self.tables.write().await;

        if let Some(username) = &changes.username {
            if tables.username_taken(username, Some(id)) {
                return Err(RepositoryError::UsernameTaken(username.clone()));
            }
        }

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password = password_hash;
        }
        Ok(Some(UserSummary::from(user.clone())))
    }

    async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        self.record_query();
        let mut tables = self.tables.write().await;

        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.tasks.retain(|_, task| task.user_id != id);
        Ok(true)
    }

    async fn set_status(&self, id: i64, status: UserStatus) -> RepositoryResult<Option<UserSummary>> {
        self.record_query();
        let mut tables = self.tables.write().await;

        Ok(tables.users.get_mut(&id).map(|user| {
            user.status = status;
            UserSummary::from(user.clone())
        }))
    }

    async fn find_with_tasks(&self, id: i64) -> RepositoryResult<Option<UserTasks>> {
        self.record_query();
        let tables = self.tables.read().await;

        Ok(tables.users.get(&id).map(|user| UserTasks {
            username: user.username.clone(),
            tasks: tables
                .tasks
                .values()
                .filter(|task| task.user_id == id)
                .cloned()
                .map(TaskSummary::from)
                .collect(),
        }))
    }

    async fn list(&self, query: &UserListQuery) -> RepositoryResult<(i64, Vec<UserSummary>)> {
        self.record_query();
        let tables = self.tables.read().await;

        let mut rows: Vec<&User> = tables.users.values().filter(|u| matches_filter(u, query)).collect();
        rows.sort_by(|a, b| {
            let ordering = compare(a, b, query.order_by);
            match query.order_dir {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .cloned()
            .map(UserSummary::from)
            .collect();

        Ok((total, page))
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}
