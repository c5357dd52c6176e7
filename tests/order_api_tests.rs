mod common;

use common::{order_payload, spawn_app};
use serde_json::{Value, json};

#[tokio::test]
async fn test_checkout_requires_authentication() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(format!("{}/orders", app.address))
        .json(&order_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_checkout_rejects_empty_cart() {
    let app = spawn_app().await;
    let body = app.register("Buyer", "buyer@example.com", "secret123").await;

    let mut payload = order_payload();
    payload["items"] = json!([]);
    payload["totalAmount"] = json!(0.0);

    let response = app
        .client
        .post(format!("{}/orders", app.address))
        .bearer_auth(body["token"].as_str().unwrap())
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_checkout_rejects_total_that_disagrees_with_items() {
    let app = spawn_app().await;
    let body = app.register("Buyer", "buyer@example.com", "secret123").await;

    // Items sum to 35.0; the client claims 20.0.
    let mut payload = order_payload();
    payload["totalAmount"] = json!(20.0);

    let response = app
        .client
        .post(format!("{}/orders", app.address))
        .bearer_auth(body["token"].as_str().unwrap())
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_checkout_validates_contact_details() {
    let app = spawn_app().await;
    let body = app.register("Buyer", "buyer@example.com", "secret123").await;
    let token = body["token"].as_str().unwrap();

    let mut short_phone = order_payload();
    short_phone["phoneNumber"] = json!("12345");
    let response = app
        .client
        .post(format!("{}/orders", app.address))
        .bearer_auth(token)
        .json(&short_phone)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let mut blank_address = order_payload();
    blank_address["shippingAddress"] = json!("   ");
    let response = app
        .client
        .post(format!("{}/orders", app.address))
        .bearer_auth(token)
        .json(&blank_address)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_checkout_creates_pending_order_owned_by_caller() {
    let app = spawn_app().await;
    let body = app.register("Buyer", "buyer@example.com", "secret123").await;
    let token = body["token"].as_str().unwrap();

    let response = app
        .client
        .post(format!("{}/orders", app.address))
        .bearer_auth(token)
        .json(&order_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let order: Value = response.json().await.unwrap();
    assert_eq!(order["status"], "Pending");
    assert_eq!(order["totalAmount"], 35.0);
    assert_eq!(order["userId"], body["id"]);
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(order["items"][0]["name"], "Wireless Mouse");

    // The order shows up in the owner's history with its line items intact.
    let history: Value = app
        .client
        .get(format!("{}/orders/my-orders", app.address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["id"], order["id"]);
    assert_eq!(history[0]["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_order_snapshot_survives_product_soft_delete() {
    let app = spawn_app().await;
    let admin_token = app.register_admin("admin@example.com").await;

    let product: Value = app
        .client
        .post(format!("{}/products/add", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({
            "name": "Laptop",
            "category": "electronics",
            "originalPrice": 100.0,
            "newPrice": 80.0,
            "stock": 5
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let product_id = product["id"].as_str().unwrap().to_string();

    let buyer = app.register("Buyer", "buyer@example.com", "secret123").await;
    let buyer_token = buyer["token"].as_str().unwrap();
    let checkout = app
        .client
        .post(format!("{}/orders", app.address))
        .bearer_auth(buyer_token)
        .json(&json!({
            "items": [{ "productId": product_id, "name": "Laptop", "qty": 1, "price": 80.0 }],
            "totalAmount": 80.0,
            "shippingAddress": "42 Market Street, Springfield",
            "phoneNumber": "0123456789"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(checkout.status(), 201);

    let deleted = app
        .client
        .delete(format!("{}/products/{product_id}", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 204);

    // The catalog no longer resolves the product...
    let detail = app
        .client
        .get(format!("{}/products/{product_id}", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(detail.status(), 404);

    // ...but the buyer's history still carries the frozen snapshot.
    let history: Value = app
        .client
        .get(format!("{}/orders/my-orders", app.address))
        .bearer_auth(buyer_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let item = &history[0]["items"][0];
    assert_eq!(item["productId"], product_id.as_str());
    assert_eq!(item["name"], "Laptop");
    assert_eq!(item["price"], 80.0);
    assert_eq!(history[0]["totalAmount"], 80.0);
}

#[tokio::test]
async fn test_order_history_is_scoped_to_the_owner() {
    let app = spawn_app().await;
    let buyer = app.register("Buyer", "buyer@example.com", "secret123").await;
    let other = app.register("Other", "other@example.com", "secret123").await;

    let response = app
        .client
        .post(format!("{}/orders", app.address))
        .bearer_auth(buyer["token"].as_str().unwrap())
        .json(&order_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let other_history: Value = app
        .client
        .get(format!("{}/orders/my-orders", app.address))
        .bearer_auth(other["token"].as_str().unwrap())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(other_history, json!([]));
}

#[tokio::test]
async fn test_order_oversight_is_admin_only() {
    let app = spawn_app().await;
    let buyer = app.register("Buyer", "buyer@example.com", "secret123").await;
    let buyer_token = buyer["token"].as_str().unwrap();

    app.client
        .post(format!("{}/orders", app.address))
        .bearer_auth(buyer_token)
        .json(&order_payload())
        .send()
        .await
        .unwrap();

    let forbidden = app
        .client
        .get(format!("{}/orders", app.address))
        .bearer_auth(buyer_token)
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), 403);

    let admin_token = app.register_admin("admin@example.com").await;
    let body: Value = app
        .client
        .get(format!("{}/orders", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["totalOrders"], 1);
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_status_update_accepts_known_statuses_only() {
    let app = spawn_app().await;
    let buyer = app.register("Buyer", "buyer@example.com", "secret123").await;

    let order: Value = app
        .client
        .post(format!("{}/orders", app.address))
        .bearer_auth(buyer["token"].as_str().unwrap())
        .json(&order_payload())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_id = order["id"].as_str().unwrap();

    let admin_token = app.register_admin("admin@example.com").await;

    // Non-admin callers cannot move an order along.
    let forbidden = app
        .client
        .put(format!("{}/orders/{order_id}/status", app.address))
        .bearer_auth(buyer["token"].as_str().unwrap())
        .json(&json!({ "status": "Shipped" }))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), 403);

    // Unknown statuses are rejected before any write.
    let invalid = app
        .client
        .put(format!("{}/orders/{order_id}/status", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({ "status": "Lost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), 400);

    let shipped = app
        .client
        .put(format!("{}/orders/{order_id}/status", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({ "status": "Shipped" }))
        .send()
        .await
        .unwrap();
    assert_eq!(shipped.status(), 200);
    let updated: Value = shipped.json().await.unwrap();
    assert_eq!(updated["status"], "Shipped");

    // Unknown order id resolves to 404 after passing status validation.
    let missing = app
        .client
        .put(format!("{}/orders/{}/status", app.address, uuid::Uuid::new_v4()))
        .bearer_auth(&admin_token)
        .json(&json!({ "status": "Cancelled" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}
