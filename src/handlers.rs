use crate::{
    AppState,
    auth::{AdminUser, AuthUser, issue_token},
    error::ApiError,
    models::{
        AdminUpdateUserRequest, AuthResponse, ContactListResponse, ContactMessage, ContactRequest,
        CreateOrderRequest, CreateProductRequest, LoginRequest, Order, OrderListResponse, Product,
        ProductListResponse, RegisterRequest, UpdateOrderStatusRequest, UpdateProductRequest,
        UpdateProfileRequest, User, UserListResponse,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use bcrypt::DEFAULT_COST;
use serde::Deserialize;
use uuid::Uuid;

// --- Query Parameters & Helpers ---

/// Pagination
///
/// The accepted query parameters for every paginated listing endpoint. Both values
/// are caller-supplied positive integers; invalid or missing values fall back to
/// page 1 and the endpoint's default limit.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct Pagination {
    /// 1-based page number.
    pub page: Option<i64>,
    /// Page size; capped to prevent unbounded scans.
    pub limit: Option<i64>,
}

impl Pagination {
    /// Hard ceiling for the page size. A client asking for more still gets at
    /// most this many rows per page.
    pub const MAX_LIMIT: i64 = 100;

    /// Hard ceiling for the page number, chosen so that the repository's
    /// `(page - 1) * limit` offset can never overflow an i64. Pages past the
    /// data simply come back empty.
    pub const MAX_PAGE: i64 = i64::MAX / Self::MAX_LIMIT;

    /// Resolves the raw query values into a sanitized `(page, limit)` pair.
    pub fn resolve(&self, default_limit: i64) -> (i64, i64) {
        let page = self
            .page
            .filter(|p| *p >= 1)
            .unwrap_or(1)
            .min(Self::MAX_PAGE);
        let limit = self
            .limit
            .filter(|l| *l >= 1)
            .unwrap_or(default_limit)
            .min(Self::MAX_LIMIT);
        (page, limit)
    }
}

/// totalPages = ceil(totalCount / limit); zero rows means zero pages.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    (total + limit - 1) / limit
}

/// Parses a path segment into a UUID, mapping failures to the InvalidId taxonomy
/// entry (400) rather than the framework's default rejection.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidId(format!("Invalid id: {raw}")))
}

// --- Auth Handlers ---

/// register_user
///
/// [Public Route] Creates a new identity. The password is hashed with bcrypt before
/// it reaches the repository; a duplicate email yields 409. The response carries a
/// freshly issued bearer token so the client is logged in immediately.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    let password_hash = bcrypt::hash(&payload.password, DEFAULT_COST)?;

    let user = state
        .repo
        .create_user(payload.name.trim(), &email, &password_hash)
        .await?;

    let token = issue_token(user.id, user.token_version, &state.config)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
            token,
        }),
    ))
}

/// login_user
///
/// [Public Route] Verifies credentials and issues a token.
///
/// *Hardening*: unknown email and wrong password collapse into one generic 401, and
/// the unknown-email path still performs a full-cost bcrypt operation, so neither
/// the response content nor gross timing reveals whether an address is registered.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let Some(creds) = state.repo.find_credentials(&email).await? else {
        // Burn the same hashing cost as the found-user path.
        let _ = bcrypt::hash(&payload.password, DEFAULT_COST);
        return Err(invalid());
    };

    if !bcrypt::verify(&payload.password, &creds.password_hash)? {
        return Err(invalid());
    }

    let token = issue_token(creds.id, creds.token_version, &state.config)?;

    Ok(Json(AuthResponse {
        id: creds.id,
        name: creds.name,
        email: creds.email,
        is_admin: creds.is_admin,
        token,
    }))
}

/// update_profile
///
/// [Authenticated Route] Partial self-service edit of name/email. The identity is
/// resolved by the `AuthUser` extractor; a user can only ever touch their own row.
#[utoipa::path(
    put,
    path = "/auth/profile",
    request_body = UpdateProfileRequest,
    responses((status = 200, description = "Updated", body = User))
)]
pub async fn update_profile(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    payload.validate()?;
    let user = state.repo.update_profile(id, payload).await?;
    Ok(Json(user))
}

/// get_users
///
/// [Admin Route] Paginated listing of all identity records, newest first.
#[utoipa::path(
    get,
    path = "/auth",
    params(Pagination),
    responses((status = 200, description = "Users", body = UserListResponse))
)]
pub async fn get_users(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<UserListResponse>, ApiError> {
    let (page, limit) = pagination.resolve(10);
    let (users, total) = state.repo.list_users(page, limit).await?;

    Ok(Json(UserListResponse {
        users,
        page,
        total_pages: total_pages(total, limit),
        total_users: total,
    }))
}

/// get_user_by_id
///
/// [Admin Route] Single identity record by id.
#[utoipa::path(
    get,
    path = "/auth/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses((status = 200, description = "User", body = User))
)]
pub async fn get_user_by_id(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&id)?;
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

/// update_user
///
/// [Admin Route] Partial edit of any identity record. Supplying a new password or
/// flipping the admin flag bumps the stored token version, which revokes every
/// previously issued token for that user on its next verification.
#[utoipa::path(
    put,
    path = "/auth/{id}",
    params(("id" = String, Path, description = "User ID")),
    request_body = AdminUpdateUserRequest,
    responses((status = 200, description = "Updated", body = User))
)]
pub async fn update_user(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&id)?;
    payload.validate()?;

    let password_hash = match &payload.password {
        Some(password) => Some(bcrypt::hash(password, DEFAULT_COST)?),
        None => None,
    };
    let revoke = payload.revokes_tokens();

    let user = state
        .repo
        .admin_update_user(id, &payload, password_hash, revoke)
        .await?;
    Ok(Json(user))
}

/// delete_user
///
/// [Admin Route] Removes an identity record. Users with purchase history cannot be
/// deleted (409): orders are never deleted, and their owner reference must stay
/// resolvable.
#[utoipa::path(
    delete,
    path = "/auth/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "User has orders")
    )
)]
pub async fn delete_user(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.repo.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Product Handlers ---

/// get_products
///
/// [Public Route] Paginated catalog listing. Soft-deleted products are filtered at
/// the repository layer, so this endpoint can never leak an inactive entry.
#[utoipa::path(
    get,
    path = "/products",
    params(Pagination),
    responses((status = 200, description = "Products", body = ProductListResponse))
)]
pub async fn get_products(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let (page, limit) = pagination.resolve(12);
    let (products, total) = state.repo.list_products(page, limit).await?;

    Ok(Json(ProductListResponse {
        products,
        page,
        total_pages: total_pages(total, limit),
        total_products: total,
    }))
}

/// get_product_details
///
/// [Public Route] Single catalog entry by id: 400 on a malformed identifier, 404
/// when the product is missing or soft-deleted.
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Found", body = Product),
        (status = 400, description = "Malformed ID"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_product_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_id(&id)?;
    let product = state
        .repo
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    Ok(Json(product))
}

/// create_product
///
/// [Admin Route] Adds a catalog entry. The `newPrice <= originalPrice` invariant is
/// validated before the repository is touched.
#[utoipa::path(
    post,
    path = "/products/add",
    request_body = CreateProductRequest,
    responses((status = 201, description = "Created", body = Product))
)]
pub async fn create_product(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    payload.validate()?;
    let product = state.repo.create_product(&payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// update_product
///
/// [Admin Route] Partial edit of a catalog entry. The repository re-checks the
/// price invariant against the merged row, so a violating write is rejected and
/// the prior state is left unchanged.
#[utoipa::path(
    put,
    path = "/products/{id}",
    params(("id" = String, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses((status = 200, description = "Updated", body = Product))
)]
pub async fn update_product(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_id(&id)?;
    payload.validate()?;
    let product = state.repo.update_product(id, &payload).await?;
    Ok(Json(product))
}

/// delete_product
///
/// [Admin Route] Soft delete: flips the active flag. The row stays in place so
/// historical order items keep a resolvable product reference.
#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(("id" = String, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_product(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.repo.soft_delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Order Handlers ---

/// create_order
///
/// [Authenticated Route] Places an order for the authenticated user. Validation
/// requires at least one line item, a deliverable address, a 10–15 digit phone
/// number, and a submitted total that reconciles with the line items — the server
/// never trusts the client's arithmetic.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses((status = 201, description = "Created", body = Order))
)]
pub async fn create_order(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    payload.validate()?;
    let order = state.repo.create_order(id, &payload).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// get_my_orders
///
/// [Authenticated Route] All orders owned by the requesting user, newest first,
/// including their frozen line-item snapshots.
#[utoipa::path(
    get,
    path = "/orders/my-orders",
    responses((status = 200, description = "My Orders", body = [Order]))
)]
pub async fn get_my_orders(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = state.repo.orders_for_user(id).await?;
    Ok(Json(orders))
}

/// get_all_orders
///
/// [Admin Route] Paginated listing of every order in the system.
#[utoipa::path(
    get,
    path = "/orders",
    params(Pagination),
    responses((status = 200, description = "Orders", body = OrderListResponse))
)]
pub async fn get_all_orders(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let (page, limit) = pagination.resolve(20);
    let (orders, total) = state.repo.list_orders(page, limit).await?;

    Ok(Json(OrderListResponse {
        orders,
        page,
        total_pages: total_pages(total, limit),
        total_orders: total,
    }))
}

/// update_order_status
///
/// [Admin Route] Moves an order along the delivery progression. The status value
/// is validated against the fixed set before the write.
#[utoipa::path(
    put,
    path = "/orders/{id}/status",
    params(("id" = String, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Order),
        (status = 400, description = "Invalid status or ID"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_order_status(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let id = parse_id(&id)?;
    payload.validate()?;
    let order = state.repo.update_order_status(id, &payload.status).await?;
    Ok(Json(order))
}

// --- Contact Handlers ---

/// send_contact_message
///
/// [Public Route] Accepts a visitor message. No authentication required.
#[utoipa::path(
    post,
    path = "/contact",
    request_body = ContactRequest,
    responses((status = 201, description = "Received", body = ContactMessage))
)]
pub async fn send_contact_message(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ContactMessage>), ApiError> {
    payload.validate()?;
    let message = state.repo.create_contact_message(&payload).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// get_contact_messages
///
/// [Admin Route] Paginated listing of visitor messages, newest first.
#[utoipa::path(
    get,
    path = "/contact",
    params(Pagination),
    responses((status = 200, description = "Messages", body = ContactListResponse))
)]
pub async fn get_contact_messages(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ContactListResponse>, ApiError> {
    let (page, limit) = pagination.resolve(20);
    let (messages, total) = state.repo.list_contact_messages(page, limit).await?;

    Ok(Json(ContactListResponse {
        messages,
        page,
        total_pages: total_pages(total, limit),
        total_messages: total,
    }))
}
