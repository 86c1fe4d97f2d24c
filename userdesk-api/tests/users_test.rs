/// HTTP tests for the user resource
///
/// Every test drives the full router (middleware included) against the
/// in-memory repository:
/// - Create / read / update / delete
/// - Status switching
/// - Task listing
/// - Filtered, sorted, paginated listing and its input validation

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;
use userdesk_shared::models::user::{NewUser, UserStatus};
use userdesk_shared::repository::UserRepository;

/// Seeds users straight into the repository, skipping password hashing
async fn seed(ctx: &TestContext, usernames: &[&str]) -> Vec<i64> {
    let mut ids = Vec::new();
    for username in usernames {
        let user = ctx
            .repo
            .create(NewUser {
                username: username.to_string(),
                password_hash: format!("$argon2id$seeded-{}", username),
            })
            .await
            .unwrap();
        ids.push(user.id);
    }
    ids
}

fn ids(body: &serde_json::Value) -> Vec<i64> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_create_user_stores_hash() {
    let ctx = TestContext::new();

    let response = ctx
        .post("/users", json!({ "username": "ann", "password": "s3cret" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["username"], "ann");
    assert_eq!(response.body["status"], "ACTIVE");
    assert!(response.body["id"].is_i64());

    let password = response.body["password"].as_str().unwrap();
    assert_ne!(password, "s3cret");
    assert!(password.starts_with("$argon2id$"));
}

#[tokio::test]
async fn test_create_user_requires_both_fields() {
    let ctx = TestContext::new();

    for body in [
        json!({ "username": "ann" }),
        json!({ "password": "s3cret" }),
        json!({ "username": "", "password": "s3cret" }),
        json!({}),
    ] {
        let response = ctx.post("/users", body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["error"], "bad_request");
        assert_eq!(response.body["message"], "Username and password are required");
    }

    assert_eq!(ctx.repo.query_count(), 0);
}

#[tokio::test]
async fn test_create_user_rejects_overlong_username() {
    let ctx = TestContext::new();

    let response = ctx
        .post("/users", json!({ "username": "a".repeat(256), "password": "pw" }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "validation_error");
    assert_eq!(response.body["details"][0]["field"], "username");
}

#[tokio::test]
async fn test_create_user_rejects_malformed_json() {
    let ctx = TestContext::new();

    let response = ctx
        .send(
            axum::http::Method::POST,
            "/users",
            Some(json!(["not", "an", "object"])),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "bad_request");
}

#[tokio::test]
async fn test_create_duplicate_username_conflicts() {
    let ctx = TestContext::new();
    ctx.create_user("ann", "first").await;

    let response = ctx
        .post("/users", json!({ "username": "ann", "password": "second" }))
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["message"], "Username already exists");
}

#[tokio::test]
async fn test_get_user() {
    let ctx = TestContext::new();
    let id = ctx.create_user("ann", "s3cret").await;

    let response = ctx.get(&format!("/users/{}", id)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], id);
    assert_eq!(response.body["username"], "ann");

    let response = ctx.get("/users/999").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "User not found");

    let response = ctx.get("/users/abc").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_active_users_newest_first() {
    let ctx = TestContext::new();
    let ids_seeded = seed(&ctx, &["ann", "bob", "cid"]).await;
    ctx.repo
        .set_status(ids_seeded[1], UserStatus::Inactive)
        .await
        .unwrap();

    let response = ctx.get("/users?filter=active").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(ids(&response.body), vec![ids_seeded[2], ids_seeded[0]]);
    assert!(response.body[0]["password"].is_string());
}

#[tokio::test]
async fn test_list_unknown_filter_rejected() {
    let ctx = TestContext::new();

    let response = ctx.get("/users?filter=inactive").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(ctx.repo.query_count(), 0);
}

#[tokio::test]
async fn test_list_pagination() {
    let ctx = TestContext::new();
    let names: Vec<String> = (1..=25).map(|i| format!("user{:02}", i)).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    seed(&ctx, &names).await;

    let response = ctx.get("/users?limit=10&page=2").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 25);
    assert_eq!(response.body["page"], 2);
    assert_eq!(response.body["pages"], 3);

    // Default order is id DESC: page 2 holds ids 15..=6
    let page = ids(&response.body["data"]);
    assert_eq!(page, (6..=15).rev().collect::<Vec<i64>>());

    // Summaries never expose the password
    assert!(response.body["data"][0].get("password").is_none());

    let response = ctx.get("/users?limit=10&page=3").await;
    assert_eq!(response.body["data"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_list_defaults_and_limit_clamp() {
    let ctx = TestContext::new();
    let names: Vec<String> = (1..=12).map(|i| format!("user{:02}", i)).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    seed(&ctx, &names).await;

    let response = ctx.get("/users").await;
    assert_eq!(response.body["page"], 1);
    assert_eq!(response.body["pages"], 2);
    assert_eq!(response.body["data"].as_array().unwrap().len(), 10);

    let response = ctx.get("/users?limit=5000").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["pages"], 1);
    assert_eq!(response.body["data"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn test_list_search_status_and_order() {
    let ctx = TestContext::new();
    let seeded = seed(&ctx, &["Anna", "bob", "hannah", "joanne"]).await;
    ctx.repo
        .set_status(seeded[3], UserStatus::Inactive)
        .await
        .unwrap();

    let response = ctx
        .get("/users?search=ANN&status=ACTIVE&orderBy=username&orderDir=asc")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 2);
    let usernames: Vec<&str> = response.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(usernames, vec!["Anna", "hannah"]);
}

#[tokio::test]
async fn test_list_username_order_ignores_case() {
    let ctx = TestContext::new();
    seed(&ctx, &["Anna", "alice", "bob"]).await;

    let response = ctx.get("/users?orderBy=username&orderDir=asc").await;

    assert_eq!(response.status, StatusCode::OK);
    let usernames: Vec<&str> = response.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(usernames, vec!["alice", "Anna", "bob"]);
}

#[tokio::test]
async fn test_list_empty_page() {
    let ctx = TestContext::new();
    seed(&ctx, &["ann"]).await;

    let response = ctx.get("/users?page=5").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 1);
    assert_eq!(response.body["pages"], 1);
    assert_eq!(response.body["data"], json!([]));
}

#[tokio::test]
async fn test_list_invalid_parameters_never_reach_repository() {
    let ctx = TestContext::new();

    for uri in [
        "/users?status=DELETED",
        "/users?orderBy=password",
        "/users?orderBy=id%3BDROP%20TABLE%20users",
        "/users?orderDir=sideways",
        "/users?page=0",
        "/users?limit=abc",
        "/users?page=922337203685477582&limit=10",
    ] {
        let response = ctx.get(uri).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", uri);
    }

    assert_eq!(ctx.repo.query_count(), 0);
}

#[tokio::test]
async fn test_update_username() {
    let ctx = TestContext::new();
    let id = ctx.create_user("ann", "s3cret").await;

    let response = ctx
        .patch(&format!("/users/{}", id), json!({ "username": "anna" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({ "id": id, "username": "anna", "status": "ACTIVE" })
    );
}

#[tokio::test]
async fn test_update_password_rehashes() {
    let ctx = TestContext::new();
    let id = ctx.create_user("ann", "old").await;
    let before = ctx.repo.find_by_id(id).await.unwrap().unwrap().password;

    let response = ctx
        .patch(&format!("/users/{}", id), json!({ "password": "new" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let after = ctx.repo.find_by_id(id).await.unwrap().unwrap().password;
    assert_ne!(before, after);
    assert!(after.starts_with("$argon2id$"));
}

#[tokio::test]
async fn test_update_blank_password_is_ignored() {
    let ctx = TestContext::new();
    let id = seed(&ctx, &["ann"]).await[0];
    let before = ctx.repo.find_by_id(id).await.unwrap().unwrap().password;

    let response = ctx
        .patch(&format!("/users/{}", id), json!({ "password": "   " }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["username"], "ann");
    let after = ctx.repo.find_by_id(id).await.unwrap().unwrap().password;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_update_requires_a_field() {
    let ctx = TestContext::new();
    let id = seed(&ctx, &["ann"]).await[0];

    let response = ctx.patch(&format!("/users/{}", id), json!({})).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Username or password is required");
}

#[tokio::test]
async fn test_update_taken_username_and_missing_user() {
    let ctx = TestContext::new();
    let seeded = seed(&ctx, &["ann", "bob"]).await;

    let response = ctx
        .patch(&format!("/users/{}", seeded[1]), json!({ "username": "ann" }))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = ctx.patch("/users/999", json!({ "username": "zed" })).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_user_and_tasks() {
    let ctx = TestContext::new();
    let id = seed(&ctx, &["ann"]).await[0];
    ctx.repo.insert_task(id, "write report", false).await.unwrap();

    let response = ctx.delete(&format!("/users/{}", id)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(response.body.is_null());

    assert_eq!(ctx.get(&format!("/users/{}", id)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        ctx.get(&format!("/users/{}/tasks", id)).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        ctx.delete(&format!("/users/{}", id)).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_toggle_status() {
    let ctx = TestContext::new();
    let id = seed(&ctx, &["ann"]).await[0];
    let uri = format!("/users/{}/status", id);

    let response = ctx.patch(&uri, json!({ "status": "INACTIVE" })).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({ "id": id, "username": "ann", "status": "INACTIVE" })
    );

    let response = ctx.patch(&uri, json!({ "status": "INACTIVE" })).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["message"], "Same status");

    let response = ctx.patch(&uri, json!({ "status": "ACTIVE" })).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ACTIVE");
}

#[tokio::test]
async fn test_toggle_status_rejects_bad_input() {
    let ctx = TestContext::new();
    let id = seed(&ctx, &["ann"]).await[0];
    let uri = format!("/users/{}/status", id);

    let response = ctx.patch(&uri, json!({})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Status is required");

    for status in ["DELETED", "active"] {
        let response = ctx.patch(&uri, json!({ "status": status })).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", status);
    }

    let response = ctx
        .patch("/users/999/status", json!({ "status": "INACTIVE" }))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_user_tasks() {
    let ctx = TestContext::new();
    let seeded = seed(&ctx, &["ann", "bob"]).await;
    ctx.repo.insert_task(seeded[0], "write report", false).await.unwrap();
    ctx.repo.insert_task(seeded[1], "not mine", false).await.unwrap();
    ctx.repo.insert_task(seeded[0], "file taxes", true).await.unwrap();

    let response = ctx.get(&format!("/users/{}/tasks", seeded[0])).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({
            "username": "ann",
            "tasks": [
                { "name": "write report", "done": false },
                { "name": "file taxes", "done": true }
            ]
        })
    );
}

#[tokio::test]
async fn test_list_user_tasks_empty_and_missing() {
    let ctx = TestContext::new();
    let id = seed(&ctx, &["ann"]).await[0];

    let response = ctx.get(&format!("/users/{}/tasks", id)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "username": "ann", "tasks": [] }));

    let response = ctx.get("/users/999/tasks").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();

    let response = ctx.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["database"], "connected");
}
