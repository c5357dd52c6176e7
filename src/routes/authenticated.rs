use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has passed the authentication
/// layer: profile self-service and the checkout/order-history surface.
///
/// Access Control Strategy:
/// Every handler in this module relies on the `AuthUser` extractor middleware
/// being present on the router layer above this module. This guarantees that all
/// handlers receive a validated `AuthUser` containing the caller's id, which is
/// then used for all owner-scoped operations (a user sees and mutates only their
/// own profile and orders).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // PUT /auth/profile
        // Partial update of the caller's own name/email.
        .route("/auth/profile", put(handlers::update_profile))
        // POST /orders
        // Checkout: creates an order owned by the caller. The server recomputes
        // the total from the submitted line items before persisting.
        .route("/orders", post(handlers::create_order))
        // GET /orders/my-orders
        // The caller's own purchase history, newest first.
        .route("/orders/my-orders", get(handlers::get_my_orders))
}
