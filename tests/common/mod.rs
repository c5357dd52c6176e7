#![allow(dead_code)]

use std::sync::Arc;

use dukaan_api::{AppConfig, AppState, MockRepository, create_router};
use serde_json::{Value, json};

/// TestApp
///
/// Holds the running test server's address plus direct handles to the in-memory
/// repository (for seeding state no public endpoint exposes, like the admin flag)
/// and a reusable HTTP client.
pub struct TestApp {
    pub address: String,
    pub repo: Arc<MockRepository>,
    pub client: reqwest::Client,
}

/// spawn_app
///
/// Boots the full application router against the in-memory repository on an
/// OS-assigned port and returns a handle for driving it over real HTTP. Every
/// test gets its own isolated server and store.
pub async fn spawn_app() -> TestApp {
    let repo = Arc::new(MockRepository::new());
    let state = AppState {
        repo: repo.clone(),
        config: AppConfig::default(),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let address = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server error");
    });

    TestApp {
        address,
        repo,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    /// Registers a user and returns the response body (id, token, ...).
    /// Panics if registration does not succeed, since callers depend on it.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Value {
        let response = self
            .client
            .post(format!("{}/auth/register", self.address))
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await
            .expect("register request failed");
        assert_eq!(response.status(), 201, "registration should succeed");
        response.json().await.expect("register body not json")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/auth/login", self.address))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request failed")
    }

    /// Registers a user and grants them the admin flag through the repository
    /// seed hook. Returns the bearer token, which stays valid because seeding
    /// does not bump the token version.
    pub async fn register_admin(&self, email: &str) -> String {
        let body = self.register("Admin User", email, "adminpass123").await;
        self.repo.promote_to_admin(email);
        body["token"].as_str().expect("token missing").to_string()
    }
}

/// A syntactically valid checkout payload whose total reconciles with its line
/// items. Tests mutate individual fields to probe validation.
pub fn order_payload() -> Value {
    json!({
        "items": [
            { "productId": uuid::Uuid::new_v4(), "name": "Wireless Mouse", "qty": 2, "price": 15.5 },
            { "productId": uuid::Uuid::new_v4(), "name": "USB Cable", "qty": 1, "price": 4.0 }
        ],
        "totalAmount": 35.0,
        "shippingAddress": "42 Market Street, Springfield",
        "phoneNumber": "0123456789"
    })
}

/// A valid catalog entry payload.
pub fn product_payload(name: &str) -> Value {
    json!({
        "name": name,
        "category": "electronics",
        "originalPrice": 100.0,
        "newPrice": 80.0,
        "stock": 5
    })
}
