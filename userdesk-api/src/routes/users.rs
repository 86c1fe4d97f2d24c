//! User resource endpoints
//!
//! # Endpoints
//!
//! - `GET    /users?filter=active` - All active users, newest first
//! - `GET    /users?page&limit&orderBy&orderDir&search&status` - Paginated list
//! - `POST   /users` - Create user
//! - `GET    /users/:id` - Get user
//! - `PATCH  /users/:id` - Update username and/or password
//! - `DELETE /users/:id` - Delete user
//! - `PATCH  /users/:id/status` - Switch between ACTIVE and INACTIVE
//! - `GET    /users/:id/tasks` - User's tasks
//!
//! Each handler performs one repository call (the status switch reads the
//! current row first). Unexpected failures propagate as `ApiError`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use userdesk_shared::{
    auth::password,
    models::{
        task::UserTasks,
        user::{
            page_count, NewUser, SortDirection, User, UserChanges, UserListQuery,
            UserOrderColumn, UserStatus, UserSummary, DEFAULT_LIMIT, MAX_LIMIT,
        },
    },
};
use validator::Validate;

/// Query string for `GET /users`
///
/// All values arrive as strings so that malformed input is reported as a
/// 400 with a readable message instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersParams {
    /// `active` selects the unpaginated active-user listing
    pub filter: Option<String>,

    /// 1-based page number (default 1)
    pub page: Option<String>,

    /// Page size (default 10, at most 100)
    pub limit: Option<String>,

    /// `id`, `username` or `status` (default `id`)
    pub order_by: Option<String>,

    /// `ASC` or `DESC`, case-insensitive (default `DESC`)
    pub order_dir: Option<String>,

    /// Case-insensitive substring of the username
    pub search: Option<String>,

    /// `ACTIVE` or `INACTIVE`
    pub status: Option<String>,
}

fn parse_positive(name: &str, value: Option<&str>, default: i64) -> ApiResult<i64> {
    match value.map(str::trim) {
        None | Some("") => Ok(default),
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(ApiError::BadRequest(format!(
                "{} must be a positive integer",
                name
            ))),
        },
    }
}

impl ListUsersParams {
    /// Validates the parameters and builds the repository query
    ///
    /// Nothing touches the repository until this has succeeded.
    pub fn to_list_query(&self) -> ApiResult<UserListQuery> {
        let page = parse_positive("page", self.page.as_deref(), 1)?;
        let limit = parse_positive("limit", self.limit.as_deref(), DEFAULT_LIMIT)?;

        // The offset must be representable or the echoed page would drift
        if (page - 1).checked_mul(limit.min(MAX_LIMIT)).is_none() {
            return Err(ApiError::BadRequest("page is out of range".to_string()));
        }

        let order_by = match self.order_by.as_deref() {
            None | Some("") => UserOrderColumn::default(),
            Some(raw) => raw.parse().map_err(ApiError::BadRequest)?,
        };
        let order_dir = match self.order_dir.as_deref() {
            None | Some("") => SortDirection::default(),
            Some(raw) => raw.parse().map_err(ApiError::BadRequest)?,
        };

        let mut query = UserListQuery::new()
            .order(order_by, order_dir)
            .page(page, limit);

        if let Some(search) = &self.search {
            query = query.search(search.as_str());
        }

        if let Some(raw) = self.status.as_deref().filter(|s| !s.is_empty()) {
            let status = raw
                .parse::<UserStatus>()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            query = query.status(status);
        }

        Ok(query)
    }
}

/// One page of the filtered user list
#[derive(Debug, Serialize, Deserialize)]
pub struct UserPage {
    /// Rows matching the filters, across all pages
    pub total: i64,

    /// Page returned
    pub page: i64,

    /// `ceil(total / limit)`
    pub pages: i64,

    pub data: Vec<UserSummary>,
}

/// Body of `GET /users`, shaped by the `filter` parameter
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ListUsersResponse {
    /// `?filter=active`
    Active(Vec<User>),

    /// Paginated listing
    Page(UserPage),
}

/// Create user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(max = 255, message = "Username must be at most 255 characters"))]
    pub username: Option<String>,

    #[validate(length(max = 1024, message = "Password must be at most 1024 characters"))]
    pub password: Option<String>,
}

/// Update user request; at least one field must be present
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(max = 255, message = "Username must be at most 255 characters"))]
    pub username: Option<String>,

    #[validate(length(max = 1024, message = "Password must be at most 1024 characters"))]
    pub password: Option<String>,
}

/// Status change request
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

/// Argon2 is CPU-bound; keep it off the async worker threads
async fn hash_password(plaintext: String) -> ApiResult<String> {
    let hash = tokio::task::spawn_blocking(move || password::hash_password(&plaintext))
        .await
        .map_err(|e| ApiError::InternalError(format!("Password hashing task failed: {}", e)))??;
    Ok(hash)
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn reject_blank_username(username: &str) -> ApiResult<()> {
    if username.trim().is_empty() {
        return Err(ApiError::BadRequest("Username cannot be blank".to_string()));
    }
    Ok(())
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

/// List users
///
/// # Endpoint
///
/// ```text
/// GET /users?filter=active
/// GET /users?page=2&limit=10&orderBy=username&orderDir=asc&search=an&status=ACTIVE
/// ```
///
/// # Response
///
/// `filter=active` returns an array of full user records (including the
/// password hash). Otherwise:
///
/// ```json
/// {
///   "total": 25,
///   "page": 2,
///   "pages": 3,
///   "data": [{ "id": 15, "username": "ann", "status": "ACTIVE" }]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: unknown `filter`, invalid `status`, `orderBy`,
///   `orderDir`, `page` or `limit`
pub async fn list_users(
    State(state): State<AppState>,
    params: Result<Query<ListUsersParams>, QueryRejection>,
) -> ApiResult<Json<ListUsersResponse>> {
    let Query(params) = params?;

    match params.filter.as_deref() {
        Some("active") => {
            let users = state.users.list_active().await?;
            return Ok(Json(ListUsersResponse::Active(users)));
        }
        None | Some("") => {}
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "Unknown filter '{}', expected 'active'",
                other
            )));
        }
    }

    let query = params.to_list_query()?;
    let (total, data) = state.users.list(&query).await?;

    Ok(Json(ListUsersResponse::Page(UserPage {
        total,
        page: query.page_number(),
        pages: page_count(total, query.limit),
        data,
    })))
}

/// Create a user
///
/// # Endpoint
///
/// ```text
/// POST /users
/// Content-Type: application/json
///
/// { "username": "ann", "password": "s3cret" }
/// ```
///
/// # Response
///
/// The stored record, with the password replaced by its Argon2id hash.
///
/// # Errors
///
/// - `400 Bad Request`: username or password missing, or too long
/// - `409 Conflict`: username already exists
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(req) = payload?;
    req.validate()?;

    let (Some(username), Some(plaintext)) = (present(req.username), present(req.password)) else {
        return Err(ApiError::BadRequest(
            "Username and password are required".to_string(),
        ));
    };
    reject_blank_username(&username)?;

    let password_hash = hash_password(plaintext).await?;

    let user = state
        .users
        .create(NewUser {
            username,
            password_hash,
        })
        .await?;

    info!(user_id = user.id, "User created");
    Ok(Json(user))
}

/// Get a user by id
///
/// # Errors
///
/// - `404 Not Found`: no such user
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<User>> {
    let Path(id) = id?;

    let user = state.users.find_by_id(id).await?.ok_or_else(user_not_found)?;

    Ok(Json(user))
}

/// Update username and/or password
///
/// A password that is blank after trimming is ignored, so sending only
/// `{"password": "   "}` leaves the stored hash untouched.
///
/// # Endpoint
///
/// ```text
/// PATCH /users/:id
/// Content-Type: application/json
///
/// { "username": "anna" }
/// ```
///
/// # Response
///
/// ```json
/// { "id": 1, "username": "anna", "status": "ACTIVE" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: neither username nor password given
/// - `404 Not Found`: no such user
/// - `409 Conflict`: username already exists
pub async fn update_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<UserSummary>> {
    let Path(id) = id?;
    let Json(req) = payload?;
    req.validate()?;

    let username = present(req.username);
    let plaintext = present(req.password);
    if username.is_none() && plaintext.is_none() {
        return Err(ApiError::BadRequest(
            "Username or password is required".to_string(),
        ));
    }
    if let Some(username) = &username {
        reject_blank_username(username)?;
    }

    let password_hash = match plaintext.filter(|p| !p.trim().is_empty()) {
        Some(plaintext) => Some(hash_password(plaintext).await?),
        None => None,
    };

    let user = state
        .users
        .update(
            id,
            UserChanges {
                username,
                password_hash,
            },
        )
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user))
}

/// Delete a user and their tasks
///
/// # Response
///
/// `204 No Content`
///
/// # Errors
///
/// - `404 Not Found`: no such user
pub async fn delete_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;

    if !state.users.delete(id).await? {
        return Err(user_not_found());
    }

    info!(user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Switch a user between ACTIVE and INACTIVE
///
/// # Endpoint
///
/// ```text
/// PATCH /users/:id/status
/// Content-Type: application/json
///
/// { "status": "INACTIVE" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: status missing or not ACTIVE/INACTIVE
/// - `404 Not Found`: no such user
/// - `409 Conflict`: user already has that status
pub async fn toggle_status(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Json<UserSummary>> {
    let Path(id) = id?;
    let Json(req) = payload?;

    let status = present(req.status)
        .ok_or_else(|| ApiError::BadRequest("Status is required".to_string()))?
        .parse::<UserStatus>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let current = state.users.find_by_id(id).await?.ok_or_else(user_not_found)?;
    if current.status == status {
        return Err(ApiError::Conflict("Same status".to_string()));
    }

    let user = state
        .users
        .set_status(id, status)
        .await?
        .ok_or_else(user_not_found)?;

    info!(user_id = id, from = %current.status, to = %status, "User status changed");
    Ok(Json(user))
}

/// List a user's tasks
///
/// # Response
///
/// ```json
/// {
///   "username": "ann",
///   "tasks": [{ "name": "write report", "done": false }]
/// }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: no such user
pub async fn list_user_tasks(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<UserTasks>> {
    let Path(id) = id?;

    let user_tasks = state
        .users
        .find_with_tasks(id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user_tasks))
}
