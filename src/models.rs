use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;

// --- Enumerated Value Sets ---

/// The fixed category set for catalog entries. Stored lowercase in the database,
/// mirroring the storefront's navigation taxonomy.
pub const PRODUCT_CATEGORIES: [&str; 8] = [
    "electronics",
    "fashion",
    "grocery",
    "home",
    "beauty",
    "sports",
    "books",
    "other",
];

/// The delivery status progression for an order. `Pending` is the creation default;
/// `Cancelled` is terminal. Status is mutated only by admins.
pub const ORDER_STATUSES: [&str; 5] = ["Pending", "Processing", "Shipped", "Delivered", "Cancelled"];

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The caller-facing identity record stored in the `users` table. The password hash
/// is deliberately absent from this struct: it lives only in [`Credentials`], which
/// does not implement `Serialize`, so a hash can never reach an API response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    // Stored lowercase; uniqueness is enforced by the database.
    pub email: String,
    // The RBAC flag checked by the Admin guard.
    pub is_admin: bool,
    // Incremented to invalidate all previously issued tokens for this user.
    pub token_version: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Credentials
///
/// Internal row used exclusively by the login path. Carries the bcrypt hash needed
/// for verification. **Never** derives `Serialize`.
#[derive(Debug, Clone, FromRow)]
pub struct Credentials {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub token_version: i32,
}

/// Product
///
/// A catalog entry from the `products` table. Deletion is soft: flipping `is_active`
/// removes the product from public listings while historical orders keep their
/// frozen line-item snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    // Image URL; may be empty when no asset has been attached yet.
    pub image: String,
    // One of PRODUCT_CATEGORIES, lowercase.
    pub category: String,
    pub original_price: f64,
    // Invariant: new_price <= original_price, enforced before any write.
    pub new_price: f64,
    pub stock: i32,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// OrderItem
///
/// A frozen snapshot of a purchased product. Name and price are copied at checkout
/// time and intentionally decoupled from the live `Product` row, so historical
/// totals remain stable even after the product changes or is soft-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub qty: i32,
    // Unit price at time of purchase.
    pub price: f64,
}

/// Order
///
/// A purchase record from the `orders` table, exclusively owned by its creator and
/// visible to admins. Orders are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    // Line items live in the `order_items` table and are attached by the repository
    // after the order rows are fetched.
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    // One of ORDER_STATUSES.
    pub status: String,
    pub shipping_address: String,
    pub phone_number: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// ContactMessage
///
/// A visitor-submitted message from the `contact_messages` table. Created by anyone,
/// read-only afterward, listed only to admins.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for POST /auth/register. The password is hashed before it ever
/// touches the repository layer and is never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_person_name(&self.name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

/// LoginRequest
///
/// Input payload for POST /auth/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ApiError::Validation(
                "Email and password are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// AuthResponse
///
/// Output schema for successful registration and login: the identity (minus any
/// credential secret) plus a freshly issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuthResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub token: String,
}

/// UpdateProfileRequest
///
/// Partial update payload for PUT /auth/profile. Only provided fields are changed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.is_none() && self.email.is_none() {
            return Err(ApiError::Validation("Nothing to update".to_string()));
        }
        if let Some(name) = &self.name {
            validate_person_name(name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

/// AdminUpdateUserRequest
///
/// Admin-only partial update for PUT /auth/{id}. Supplying `password` or `isAdmin`
/// bumps the user's token version, invalidating every previously issued token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminUpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

impl AdminUpdateUserRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.is_admin.is_none()
        {
            return Err(ApiError::Validation("Nothing to update".to_string()));
        }
        if let Some(name) = &self.name {
            validate_person_name(name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }

    /// True when the edit must invalidate previously issued tokens.
    pub fn revokes_tokens(&self) -> bool {
        self.password.is_some() || self.is_admin.is_some()
    }
}

/// CreateProductRequest
///
/// Admin input payload for POST /products/add. `image` defaults to empty and
/// `stock` to zero, matching the catalog schema defaults.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub category: String,
    pub original_price: f64,
    pub new_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i32>,
}

impl CreateProductRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_product_name(&self.name)?;
        validate_category(&self.category)?;
        if let Some(image) = &self.image {
            validate_image_url(image)?;
        }
        validate_prices(self.original_price, self.new_price)?;
        if self.stock.is_some_and(|s| s < 0) {
            return Err(ApiError::Validation("Stock cannot be negative".to_string()));
        }
        Ok(())
    }
}

/// UpdateProductRequest
///
/// Admin partial update for PUT /products/{id}. All fields optional; the price
/// invariant is re-checked against the merged row by the repository, so a write
/// that would leave `newPrice > originalPrice` fails before persistence.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateProductRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i32>,
}

impl UpdateProductRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = &self.name {
            validate_product_name(name)?;
        }
        if let Some(category) = &self.category {
            validate_category(category)?;
        }
        if let Some(image) = &self.image {
            validate_image_url(image)?;
        }
        if self.original_price.is_some_and(|p| p < 0.0)
            || self.new_price.is_some_and(|p| p < 0.0)
        {
            return Err(ApiError::Validation(
                "Prices cannot be negative".to_string(),
            ));
        }
        if self.stock.is_some_and(|s| s < 0) {
            return Err(ApiError::Validation("Stock cannot be negative".to_string()));
        }
        Ok(())
    }
}

/// OrderItemInput
///
/// A single line item submitted at checkout. The name and price are the client's
/// snapshot of the product at purchase time.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub name: String,
    pub qty: i32,
    pub price: f64,
}

/// CreateOrderRequest
///
/// Input payload for POST /orders. The server recomputes the total from the line
/// items and rejects a submitted `totalAmount` that does not reconcile, so a
/// tampering client cannot buy at an arbitrary price.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemInput>,
    pub total_amount: f64,
    pub shipping_address: String,
    pub phone_number: String,
}

impl CreateOrderRequest {
    /// Tolerance for comparing the client-submitted total against the recomputed
    /// sum of line items. Covers floating-point rounding, not price drift.
    const TOTAL_EPSILON: f64 = 0.005;

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.items.is_empty() {
            return Err(ApiError::Validation(
                "Order must contain at least one item".to_string(),
            ));
        }
        for item in &self.items {
            if item.name.trim().is_empty() {
                return Err(ApiError::Validation(
                    "Order item name is required".to_string(),
                ));
            }
            if item.qty < 1 {
                return Err(ApiError::Validation(
                    "Order item quantity must be at least 1".to_string(),
                ));
            }
            if item.price < 0.0 {
                return Err(ApiError::Validation(
                    "Order item price cannot be negative".to_string(),
                ));
            }
        }
        if self.total_amount <= 0.0 {
            return Err(ApiError::Validation("Invalid total amount".to_string()));
        }
        if self.shipping_address.trim().is_empty() {
            return Err(ApiError::Validation(
                "Shipping address is required".to_string(),
            ));
        }
        if self.shipping_address.len() > 500 {
            return Err(ApiError::Validation(
                "Shipping address is too long".to_string(),
            ));
        }
        validate_phone(&self.phone_number)?;

        // Hardened total check: the order total must reconcile to the sum of its
        // line items. The submitted value is advisory, never trusted.
        let computed: f64 = self.items.iter().map(|i| i.price * f64::from(i.qty)).sum();
        if (computed - self.total_amount).abs() > Self::TOTAL_EPSILON {
            return Err(ApiError::Validation(
                "Order total does not match line items".to_string(),
            ));
        }
        Ok(())
    }
}

/// UpdateOrderStatusRequest
///
/// Admin input payload for PUT /orders/{id}/status.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

impl UpdateOrderStatusRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !ORDER_STATUSES.contains(&self.status.as_str()) {
            return Err(ApiError::Validation("Invalid order status".to_string()));
        }
        Ok(())
    }
}

/// ContactRequest
///
/// Input payload for the public POST /contact endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() || self.message.trim().is_empty() {
            return Err(ApiError::Validation("All fields are required".to_string()));
        }
        validate_email(&self.email)
    }
}

// --- Paginated List Envelopes (Output) ---

/// UserListResponse
///
/// Output schema for the admin user listing (GET /auth).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub page: i64,
    pub total_pages: i64,
    pub total_users: i64,
}

/// ProductListResponse
///
/// Output schema for the public product listing (GET /products). Contains only
/// active products.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub page: i64,
    pub total_pages: i64,
    pub total_products: i64,
}

/// OrderListResponse
///
/// Output schema for the admin order listing (GET /orders).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderListResponse {
    pub orders: Vec<Order>,
    pub page: i64,
    pub total_pages: i64,
    pub total_orders: i64,
}

/// ContactListResponse
///
/// Output schema for the admin contact-message listing (GET /contact).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ContactListResponse {
    pub messages: Vec<ContactMessage>,
    pub page: i64,
    pub total_pages: i64,
    pub total_messages: i64,
}

// --- Field Validators ---

fn validate_person_name(name: &str) -> Result<(), ApiError> {
    let len = name.trim().chars().count();
    if !(2..=50).contains(&len) {
        return Err(ApiError::Validation(
            "Name must be between 2 and 50 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_product_name(name: &str) -> Result<(), ApiError> {
    let len = name.trim().chars().count();
    if !(2..=100).contains(&len) {
        return Err(ApiError::Validation(
            "Product name must be between 2 and 100 characters".to_string(),
        ));
    }
    Ok(())
}

/// Shape check equivalent to `\S+@\S+\.\S+`: one '@', a dot in the domain part,
/// no whitespace.
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let email = email.trim();
    let invalid = || ApiError::Validation("Please use a valid email address".to_string());

    if email.contains(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err(invalid()),
    }
}

/// Phone numbers are 10 to 15 digits, nothing else.
pub fn validate_phone(phone: &str) -> Result<(), ApiError> {
    if !(10..=15).contains(&phone.len()) || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::Validation("Invalid phone number".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_category(category: &str) -> Result<(), ApiError> {
    if !PRODUCT_CATEGORIES.contains(&category.to_lowercase().as_str()) {
        return Err(ApiError::Validation("Invalid product category".to_string()));
    }
    Ok(())
}

/// Image references are http(s) URLs ending in a known raster/vector extension.
/// Empty is allowed: a product may be created before its asset exists.
pub fn validate_image_url(url: &str) -> Result<(), ApiError> {
    if url.is_empty() {
        return Ok(());
    }
    let lower = url.to_lowercase();
    let scheme_ok = lower.starts_with("http://") || lower.starts_with("https://");
    let ext_ok = [".png", ".jpg", ".jpeg", ".webp", ".svg"]
        .iter()
        .any(|ext| lower.ends_with(ext));
    if scheme_ok && ext_ok {
        Ok(())
    } else {
        Err(ApiError::Validation("Invalid image URL".to_string()))
    }
}

/// Cross-field price invariant shared by the create path and the repository's
/// merged-row check on update.
pub fn validate_prices(original_price: f64, new_price: f64) -> Result<(), ApiError> {
    if original_price < 0.0 || new_price < 0.0 {
        return Err(ApiError::Validation("Prices cannot be negative".to_string()));
    }
    if new_price > original_price {
        return Err(ApiError::Validation(
            "New price cannot be greater than original price".to_string(),
        ));
    }
    Ok(())
}
