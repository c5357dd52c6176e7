mod common;

use common::{order_payload, spawn_app};
use serde_json::{Value, json};

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_register_returns_token_and_never_the_password() {
    let app = spawn_app().await;

    let body = app.register("Asha Patel", "asha@example.com", "secret123").await;

    assert_eq!(body["name"], "Asha Patel");
    assert_eq!(body["email"], "asha@example.com");
    assert_eq!(body["isAdmin"], false);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    // Password material must never appear in any response shape.
    assert!(body.get("password").is_none());
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_register_normalizes_email_and_rejects_duplicates() {
    let app = spawn_app().await;

    let body = app.register("Asha Patel", "  Asha@Example.COM ", "secret123").await;
    assert_eq!(body["email"], "asha@example.com");

    // Same address in a different case is still a duplicate.
    let response = app
        .client
        .post(format!("{}/auth/register", app.address))
        .json(&json!({ "name": "Imposter", "email": "ASHA@example.com", "password": "other1234" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn test_register_validates_payload() {
    let app = spawn_app().await;

    let cases = [
        json!({ "name": "A", "email": "a@example.com", "password": "secret123" }),
        json!({ "name": "Asha", "email": "not-an-email", "password": "secret123" }),
        json!({ "name": "Asha", "email": "a@example.com", "password": "short" }),
    ];

    for payload in cases {
        let response = app
            .client
            .post(format!("{}/auth/register", app.address))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "payload should be rejected: {payload}");
    }
}

#[tokio::test]
async fn test_login_collapses_unknown_email_and_wrong_password() {
    let app = spawn_app().await;
    app.register("Asha Patel", "asha@example.com", "secret123").await;

    let unknown = app.login("nobody@example.com", "secret123").await;
    assert_eq!(unknown.status(), 401);
    let unknown_body: Value = unknown.json().await.unwrap();

    let wrong = app.login("asha@example.com", "wrongpassword").await;
    assert_eq!(wrong.status(), 401);
    let wrong_body: Value = wrong.json().await.unwrap();

    // The two failure modes must be indistinguishable to the caller.
    assert_eq!(unknown_body["message"], wrong_body["message"]);
}

#[tokio::test]
async fn test_login_issues_a_working_token() {
    let app = spawn_app().await;
    app.register("Asha Patel", "asha@example.com", "secret123").await;

    let response = app.login("asha@example.com", "secret123").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let token = body["token"].as_str().unwrap();

    let orders = app
        .client
        .get(format!("{}/orders/my-orders", app.address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(orders.status(), 200);
    assert_eq!(orders.json::<Value>().await.unwrap(), json!([]));
}

#[tokio::test]
async fn test_protected_route_rejects_missing_and_garbage_tokens() {
    let app = spawn_app().await;

    let missing = app
        .client
        .get(format!("{}/orders/my-orders", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 401);

    let garbage = app
        .client
        .get(format!("{}/orders/my-orders", app.address))
        .bearer_auth("not.a.token")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), 401);
}

#[tokio::test]
async fn test_profile_update_changes_own_record() {
    let app = spawn_app().await;
    let body = app.register("Asha Patel", "asha@example.com", "secret123").await;
    let token = body["token"].as_str().unwrap();

    let response = app
        .client
        .put(format!("{}/auth/profile", app.address))
        .bearer_auth(token)
        .json(&json!({ "name": "Asha P." }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["name"], "Asha P.");
    assert_eq!(updated["email"], "asha@example.com");

    // An update with no fields is a client error.
    let empty = app
        .client
        .put(format!("{}/auth/profile", app.address))
        .bearer_auth(token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), 400);
}

#[tokio::test]
async fn test_profile_email_change_is_normalized_and_keeps_login_working() {
    let app = spawn_app().await;
    let body = app.register("Asha Patel", "asha@example.com", "secret123").await;
    let token = body["token"].as_str().unwrap();

    // Padded, mixed-case address: stored form must be trimmed and lowercased,
    // or the next login lookup would never match.
    let response = app
        .client
        .put(format!("{}/auth/profile", app.address))
        .bearer_auth(token)
        .json(&json!({ "email": "  New@Example.COM " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["email"], "new@example.com");

    let login = app.login("new@example.com", "secret123").await;
    assert_eq!(login.status(), 200);
}

#[tokio::test]
async fn test_user_listing_is_admin_only() {
    let app = spawn_app().await;
    let body = app.register("Regular User", "user@example.com", "secret123").await;
    let user_token = body["token"].as_str().unwrap();

    // Authenticated but not an admin: forbidden, not unauthorized.
    let forbidden = app
        .client
        .get(format!("{}/auth", app.address))
        .bearer_auth(user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), 403);

    let admin_token = app.register_admin("admin@example.com").await;
    let response = app
        .client
        .get(format!("{}/auth", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["page"], 1);
    assert_eq!(body["totalUsers"], 2);
    assert_eq!(body["totalPages"], 1);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
    // The listing exposes identity records, never credential material.
    for user in body["users"].as_array().unwrap() {
        assert!(user.get("passwordHash").is_none());
    }
}

#[tokio::test]
async fn test_admin_password_change_revokes_outstanding_tokens() {
    let app = spawn_app().await;
    let body = app.register("Asha Patel", "asha@example.com", "secret123").await;
    let old_token = body["token"].as_str().unwrap().to_string();
    let user_id = body["id"].as_str().unwrap().to_string();

    let admin_token = app.register_admin("admin@example.com").await;

    let response = app
        .client
        .put(format!("{}/auth/{user_id}", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({ "password": "rotated456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // The pre-rotation token no longer verifies.
    let revoked = app
        .client
        .get(format!("{}/orders/my-orders", app.address))
        .bearer_auth(&old_token)
        .send()
        .await
        .unwrap();
    assert_eq!(revoked.status(), 401);

    // Logging in with the new password yields a fresh, working token.
    let login = app.login("asha@example.com", "rotated456").await;
    assert_eq!(login.status(), 200);
    let fresh: Value = login.json().await.unwrap();
    let orders = app
        .client
        .get(format!("{}/orders/my-orders", app.address))
        .bearer_auth(fresh["token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(orders.status(), 200);
}

#[tokio::test]
async fn test_admin_name_edit_does_not_revoke_tokens() {
    let app = spawn_app().await;
    let body = app.register("Asha Patel", "asha@example.com", "secret123").await;
    let token = body["token"].as_str().unwrap().to_string();
    let user_id = body["id"].as_str().unwrap().to_string();

    let admin_token = app.register_admin("admin@example.com").await;
    let response = app
        .client
        .put(format!("{}/auth/{user_id}", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({ "name": "Asha Renamed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Neither password nor role changed, so the session survives.
    let still_valid = app
        .client
        .get(format!("{}/orders/my-orders", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(still_valid.status(), 200);
}

#[tokio::test]
async fn test_delete_user_blocked_by_purchase_history() {
    let app = spawn_app().await;
    let body = app.register("Buyer", "buyer@example.com", "secret123").await;
    let buyer_token = body["token"].as_str().unwrap().to_string();
    let buyer_id = body["id"].as_str().unwrap().to_string();

    let order = app
        .client
        .post(format!("{}/orders", app.address))
        .bearer_auth(&buyer_token)
        .json(&order_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(order.status(), 201);

    let admin_token = app.register_admin("admin@example.com").await;
    let blocked = app
        .client
        .delete(format!("{}/auth/{buyer_id}", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(blocked.status(), 409);

    // A user without orders deletes cleanly and then resolves to 404.
    let other = app.register("Ghost", "ghost@example.com", "secret123").await;
    let other_id = other["id"].as_str().unwrap().to_string();
    let deleted = app
        .client
        .delete(format!("{}/auth/{other_id}", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 204);

    let gone = app
        .client
        .get(format!("{}/auth/{other_id}", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), 404);
}

#[tokio::test]
async fn test_malformed_user_id_is_a_client_error() {
    let app = spawn_app().await;
    let admin_token = app.register_admin("admin@example.com").await;

    let response = app
        .client
        .get(format!("{}/auth/not-a-uuid", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
