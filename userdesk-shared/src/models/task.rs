//! Task model
//!
//! Tasks belong to exactly one user and are removed with it. The API only
//! reads them, through [`crate::repository::UserRepository::find_with_tasks`].
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE tasks (
//!     id BIGSERIAL PRIMARY KEY,
//!     name VARCHAR(255) NOT NULL,
//!     done BOOLEAN NOT NULL DEFAULT FALSE,
//!     user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE
//! );
//! ```

use serde::{Deserialize, Serialize};

/// Task row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub done: bool,

    /// Owning user
    pub user_id: i64,
}

/// Task projection returned alongside its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskSummary {
    pub name: String,
    pub done: bool,
}

impl From<Task> for TaskSummary {
    fn from(task: Task) -> Self {
        Self {
            name: task.name,
            done: task.done,
        }
    }
}

/// A user's name together with their tasks, ordered by task id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTasks {
    pub username: String,
    pub tasks: Vec<TaskSummary>,
}

impl UserTasks {
    /// Folds `(username, task name, task done)` rows from a
    /// `users LEFT JOIN tasks` query. Returns `None` when there are no rows,
    /// meaning the user does not exist.
    pub fn from_joined_rows<I>(rows: I) -> Option<Self>
    where
        I: IntoIterator<Item = (String, Option<String>, Option<bool>)>,
    {
        let mut rows = rows.into_iter().peekable();
        let username = rows.peek()?.0.clone();

        let tasks = rows
            .filter_map(|(_, name, done)| {
                name.map(|name| TaskSummary {
                    name,
                    done: done.unwrap_or(false),
                })
            })
            .collect();

        Some(Self { username, tasks })
    }
}
