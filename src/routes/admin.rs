use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to users with the admin flag:
/// catalog management, order oversight, user administration, and the contact
/// inbox.
///
/// Access Control:
/// Every handler here takes the `AdminUser` guard extractor, which first runs
/// the full authentication pipeline (401 on failure) and then requires the
/// admin flag (403 otherwise). The admin check therefore never executes
/// without a resolved identity.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- User Administration ---
        // GET /auth?page=&limit=
        // Paginated listing of all identity records.
        .route("/auth", get(handlers::get_users))
        // GET/PUT/DELETE /auth/{id}
        // Inspect, edit, or remove a single user. Password or role edits bump the
        // token version, revoking previously issued tokens. Users with purchase
        // history cannot be deleted (orders are never destroyed).
        .route(
            "/auth/{id}",
            get(handlers::get_user_by_id)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        // --- Catalog Management ---
        // POST /products/add
        // Creates a catalog entry; the price invariant is validated up front.
        .route("/products/add", post(handlers::create_product))
        // PUT/DELETE /products/{id}
        // Partial edit or soft delete. Deletion flips the active flag so historical
        // orders keep a resolvable product reference.
        .route(
            "/products/{id}",
            put(handlers::update_product).delete(handlers::delete_product),
        )
        // --- Order Oversight ---
        // GET /orders?page=&limit=
        // Paginated listing of every order in the system.
        .route("/orders", get(handlers::get_all_orders))
        // PUT /orders/{id}/status
        // Moves an order along the Pending → Processing → Shipped → Delivered
        // progression (or to the terminal Cancelled).
        .route("/orders/{id}/status", put(handlers::update_order_status))
        // --- Contact Inbox ---
        // GET /contact?page=&limit=
        // Paginated listing of visitor messages.
        .route("/contact", get(handlers::get_contact_messages))
}
