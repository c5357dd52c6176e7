use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client
/// (anonymous or logged-in): the catalog read surface, the identity gateway
/// (register/login), and contact-message submission.
///
/// Security Mandate:
/// The catalog handlers in this module must enforce `is_active=true` at the
/// Repository level. This prevents anonymous viewing of soft-deleted products.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        // Returns "ok" immediately to verify the service is running and responsive.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/register
        // Creates a new identity with a bcrypt-hashed password and returns a bearer
        // token, so registration doubles as the first login.
        .route("/auth/register", post(handlers::register_user))
        // POST /auth/login
        // Verifies credentials. Unknown email and wrong password collapse into a
        // single generic 401 to avoid account enumeration.
        .route("/auth/login", post(handlers::login_user))
        // GET /products?page=&limit=
        // Paginated listing of active catalog entries, newest first.
        .route("/products", get(handlers::get_products))
        // GET /products/{id}
        // Detail view for a single active product. Malformed ids yield 400,
        // missing or soft-deleted products 404.
        .route("/products/{id}", get(handlers::get_product_details))
        // POST /contact
        // Accepts a visitor message for later admin review.
        .route("/contact", post(handlers::send_contact_message))
}
