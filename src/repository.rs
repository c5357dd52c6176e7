use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{
    AdminUpdateUserRequest, ContactMessage, ContactRequest, CreateOrderRequest,
    CreateProductRequest, Credentials, Order, OrderItem, Product, UpdateProductRequest,
    UpdateProfileRequest, User, validate_prices,
};

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations: the Credential
/// Store plus the Product, Order, and Contact-message repositories. Handlers
/// interact with the data layer through this trait without knowing the concrete
/// implementation (Postgres in production, the in-memory Mock in tests).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's asynchronous task
/// boundaries.
///
/// Pagination contract: `page` and `limit` arrive pre-clamped from the HTTP
/// surface; listings are ordered by `created_at DESC, id DESC` so consecutive
/// pages are stable and disjoint, and each list call returns the total row count
/// alongside the page.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---

    /// Inserts a new identity. The email must already be lowercased; uniqueness
    /// violations surface as `Conflict`.
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ApiError>;

    /// Fetches the credential row (including the bcrypt hash) for login. The only
    /// code path that ever reads the hash back out of the store.
    async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>, ApiError>;

    /// Fetches the identity record without the hash. Used by the auth guard on
    /// every request.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError>;

    /// Partial self-service profile update (name/email).
    async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> Result<User, ApiError>;

    /// Admin listing, newest first.
    async fn list_users(&self, page: i64, limit: i64) -> Result<(Vec<User>, i64), ApiError>;

    /// Admin edit. `password_hash` is the pre-hashed replacement when the admin
    /// supplied a new password. When `revoke_tokens` is set (password or role
    /// changed), the stored token version is bumped so previously issued tokens
    /// stop verifying.
    async fn admin_update_user(
        &self,
        id: Uuid,
        req: &AdminUpdateUserRequest,
        password_hash: Option<String>,
        revoke_tokens: bool,
    ) -> Result<User, ApiError>;

    /// Admin delete. Fails with `Conflict` when historical orders still reference
    /// the user, so deletion can never silently break referential integrity.
    async fn delete_user(&self, id: Uuid) -> Result<(), ApiError>;

    // --- Product Repository ---

    /// Public listing: active products only, newest first.
    async fn list_products(&self, page: i64, limit: i64) -> Result<(Vec<Product>, i64), ApiError>;

    /// Public detail fetch: returns only active products. Soft-deleted entries are
    /// invisible here while remaining referenced by historical order items.
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, ApiError>;

    async fn create_product(&self, req: &CreateProductRequest) -> Result<Product, ApiError>;

    /// Partial update with COALESCE semantics. The `new_price <= original_price`
    /// invariant is re-checked against the merged row before the write, so a
    /// violating update fails validation and leaves the prior state unchanged.
    async fn update_product(
        &self,
        id: Uuid,
        req: &UpdateProductRequest,
    ) -> Result<Product, ApiError>;

    /// Soft delete: flips `is_active` instead of removing the row.
    async fn soft_delete_product(&self, id: Uuid) -> Result<(), ApiError>;

    // --- Order Repository ---

    /// Inserts the order and its line items in a single transaction. Stock is not
    /// decremented here (see DESIGN.md).
    async fn create_order(&self, user_id: Uuid, req: &CreateOrderRequest)
    -> Result<Order, ApiError>;

    /// All orders owned by the user, newest first, with line items attached.
    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, ApiError>;

    /// Admin listing across all users, newest first.
    async fn list_orders(&self, page: i64, limit: i64) -> Result<(Vec<Order>, i64), ApiError>;

    /// Admin status transition. `status` is already validated against the fixed
    /// status set by the handler.
    async fn update_order_status(&self, id: Uuid, status: &str) -> Result<Order, ApiError>;

    // --- Contact Repository ---

    async fn create_contact_message(&self, req: &ContactRequest)
    -> Result<ContactMessage, ApiError>;

    /// Admin listing, newest first.
    async fn list_contact_messages(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<ContactMessage>, i64), ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str = "id, name, email, is_admin, token_version, created_at, updated_at";
const PRODUCT_COLUMNS: &str =
    "id, name, image, category, original_price, new_price, stock, is_active, created_at, updated_at";
const ORDER_COLUMNS: &str =
    "id, user_id, total_amount, status, shipping_address, phone_number, created_at, updated_at";

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation))
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::ForeignKeyViolation))
}

/// Private row shape for loading line items across a batch of orders.
#[derive(FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    product_id: Uuid,
    name: String,
    qty: i32,
    price: f64,
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the line items for a batch of orders in one query and attaches them
    /// to their owning orders, avoiding an N+1 fetch on the listing endpoints.
    /// Items come back in insertion (cart) order via the sequential item id.
    async fn attach_items(&self, orders: &mut [Order]) -> Result<(), ApiError> {
        if orders.is_empty() {
            return Ok(());
        }

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT order_id, product_id, name, qty, price \
             FROM order_items WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            by_order.entry(row.order_id).or_default().push(OrderItem {
                product_id: row.product_id,
                name: row.name,
                qty: row.qty,
                price: row.price,
            });
        }

        for order in orders.iter_mut() {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ApiError> {
        let query = format!(
            "INSERT INTO users (id, name, email, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::Conflict("Email is already registered".to_string())
                } else {
                    e.into()
                }
            })
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>, ApiError> {
        let creds = sqlx::query_as::<_, Credentials>(
            "SELECT id, name, email, password_hash, is_admin, token_version \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(creds)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> Result<User, ApiError> {
        let query = format!(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                email = COALESCE($3, email), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(req.name)
            .bind(req.email.map(|e| e.trim().to_lowercase()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::Conflict("Email is already registered".to_string())
                } else {
                    e.into()
                }
            })?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    async fn list_users(&self, page: i64, limit: i64) -> Result<(Vec<User>, i64), ApiError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        let users = sqlx::query_as::<_, User>(&query)
            .bind(limit)
            .bind((page - 1) * limit)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok((users, total))
    }

    async fn admin_update_user(
        &self,
        id: Uuid,
        req: &AdminUpdateUserRequest,
        password_hash: Option<String>,
        revoke_tokens: bool,
    ) -> Result<User, ApiError> {
        let query = format!(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                email = COALESCE($3, email), \
                password_hash = COALESCE($4, password_hash), \
                is_admin = COALESCE($5, is_admin), \
                token_version = token_version + CASE WHEN $6 THEN 1 ELSE 0 END, \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(req.name.clone())
            .bind(req.email.clone().map(|e| e.trim().to_lowercase()))
            .bind(password_hash)
            .bind(req.is_admin)
            .bind(revoke_tokens)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::Conflict("Email is already registered".to_string())
                } else {
                    e.into()
                }
            })?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    // Orders are never deleted, so a user with purchase history
                    // cannot be removed without orphaning it.
                    ApiError::Conflict("User has existing orders and cannot be deleted".to_string())
                } else {
                    e.into()
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn list_products(&self, page: i64, limit: i64) -> Result<(Vec<Product>, i64), ApiError> {
        let query = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = true \
             ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        let products = sqlx::query_as::<_, Product>(&query)
            .bind(limit)
            .bind((page - 1) * limit)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = true")
            .fetch_one(&self.pool)
            .await?;

        Ok((products, total))
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, ApiError> {
        let query = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND is_active = true"
        );
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn create_product(&self, req: &CreateProductRequest) -> Result<Product, ApiError> {
        let query = format!(
            "INSERT INTO products (id, name, image, category, original_price, new_price, stock) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PRODUCT_COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(Uuid::new_v4())
            .bind(req.name.trim())
            .bind(req.image.clone().unwrap_or_default())
            .bind(req.category.to_lowercase())
            .bind(req.original_price)
            .bind(req.new_price)
            .bind(req.stock.unwrap_or(0))
            .fetch_one(&self.pool)
            .await?;
        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        req: &UpdateProductRequest,
    ) -> Result<Product, ApiError> {
        let mut tx = self.pool.begin().await?;

        // The price invariant spans two columns, so the merged row must be checked
        // before the write. The row lock keeps a concurrent update from slipping a
        // violating combination in between.
        let select = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE");
        let current = sqlx::query_as::<_, Product>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

        let merged_original = req.original_price.unwrap_or(current.original_price);
        let merged_new = req.new_price.unwrap_or(current.new_price);
        validate_prices(merged_original, merged_new)?;

        let update = format!(
            "UPDATE products SET \
                name = COALESCE($2, name), \
                image = COALESCE($3, image), \
                category = COALESCE($4, category), \
                original_price = COALESCE($5, original_price), \
                new_price = COALESCE($6, new_price), \
                stock = COALESCE($7, stock), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&update)
            .bind(id)
            .bind(req.name.clone())
            .bind(req.image.clone())
            .bind(req.category.clone().map(|c| c.to_lowercase()))
            .bind(req.original_price)
            .bind(req.new_price)
            .bind(req.stock)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(product)
    }

    async fn soft_delete_product(&self, id: Uuid) -> Result<(), ApiError> {
        let result =
            sqlx::query("UPDATE products SET is_active = false, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Product not found".to_string()));
        }
        Ok(())
    }

    async fn create_order(
        &self,
        user_id: Uuid,
        req: &CreateOrderRequest,
    ) -> Result<Order, ApiError> {
        let mut tx = self.pool.begin().await?;

        let insert_order = format!(
            "INSERT INTO orders (id, user_id, total_amount, status, shipping_address, phone_number) \
             VALUES ($1, $2, $3, 'Pending', $4, $5) RETURNING {ORDER_COLUMNS}"
        );
        let mut order = sqlx::query_as::<_, Order>(&insert_order)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(req.total_amount)
            .bind(req.shipping_address.trim())
            .bind(&req.phone_number)
            .fetch_one(&mut *tx)
            .await?;

        for item in &req.items {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, name, qty, price) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(order.id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.qty)
            .bind(item.price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        order.items = req
            .items
            .iter()
            .map(|i| OrderItem {
                product_id: i.product_id,
                name: i.name.clone(),
                qty: i.qty,
                price: i.price,
            })
            .collect();
        Ok(order)
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, ApiError> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let mut orders = sqlx::query_as::<_, Order>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        self.attach_items(&mut orders).await?;
        Ok(orders)
    }

    async fn list_orders(&self, page: i64, limit: i64) -> Result<(Vec<Order>, i64), ApiError> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        let mut orders = sqlx::query_as::<_, Order>(&query)
            .bind(limit)
            .bind((page - 1) * limit)
            .fetch_all(&self.pool)
            .await?;

        self.attach_items(&mut orders).await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok((orders, total))
    }

    async fn update_order_status(&self, id: Uuid, status: &str) -> Result<Order, ApiError> {
        let query = format!(
            "UPDATE orders SET status = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        );
        let mut order = sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

        self.attach_items(std::slice::from_mut(&mut order)).await?;
        Ok(order)
    }

    async fn create_contact_message(
        &self,
        req: &ContactRequest,
    ) -> Result<ContactMessage, ApiError> {
        let message = sqlx::query_as::<_, ContactMessage>(
            "INSERT INTO contact_messages (id, name, email, message) \
             VALUES ($1, $2, $3, $4) RETURNING id, name, email, message, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(req.name.trim())
        .bind(req.email.trim().to_lowercase())
        .bind(&req.message)
        .fetch_one(&self.pool)
        .await?;
        Ok(message)
    }

    async fn list_contact_messages(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<ContactMessage>, i64), ApiError> {
        let messages = sqlx::query_as::<_, ContactMessage>(
            "SELECT id, name, email, message, created_at FROM contact_messages \
             ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_messages")
            .fetch_one(&self.pool)
            .await?;

        Ok((messages, total))
    }
}

// --- In-Memory Mock (Test Double) ---

struct MockUser {
    user: User,
    password_hash: String,
}

#[derive(Default)]
struct MockStore {
    users: Vec<MockUser>,
    products: Vec<Product>,
    orders: Vec<Order>,
    messages: Vec<ContactMessage>,
}

/// MockRepository
///
/// An in-memory implementation of the `Repository` trait for integration tests.
/// Mirrors the Postgres implementation's observable behavior — uniqueness
/// conflicts, soft deletes, `created_at DESC` ordering, token-version bumps —
/// without requiring a database.
pub struct MockRepository {
    store: Mutex<MockStore>,
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRepository {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(MockStore::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockStore> {
        self.store.lock().expect("mock store poisoned")
    }

    /// Test helper: grants the admin flag directly, without touching the token
    /// version, so tokens issued before the promotion keep working. Equivalent to
    /// seeding the role column in a database-backed test.
    pub fn promote_to_admin(&self, email: &str) {
        let mut store = self.lock();
        if let Some(entry) = store.users.iter_mut().find(|u| u.user.email == email) {
            entry.user.is_admin = true;
        }
    }

    fn paginate<T: Clone>(rows: &[T], page: i64, limit: i64) -> Vec<T> {
        let offset = ((page - 1) * limit) as usize;
        rows.iter().skip(offset).take(limit as usize).cloned().collect()
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ApiError> {
        let mut store = self.lock();
        if store.users.iter().any(|u| u.user.email == email) {
            return Err(ApiError::Conflict("Email is already registered".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            is_admin: false,
            token_version: 0,
            created_at: now,
            updated_at: now,
        };
        store.users.push(MockUser {
            user: user.clone(),
            password_hash: password_hash.to_string(),
        });
        Ok(user)
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>, ApiError> {
        let store = self.lock();
        Ok(store
            .users
            .iter()
            .find(|u| u.user.email == email)
            .map(|u| Credentials {
                id: u.user.id,
                name: u.user.name.clone(),
                email: u.user.email.clone(),
                password_hash: u.password_hash.clone(),
                is_admin: u.user.is_admin,
                token_version: u.user.token_version,
            }))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let store = self.lock();
        Ok(store
            .users
            .iter()
            .find(|u| u.user.id == id)
            .map(|u| u.user.clone()))
    }

    async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> Result<User, ApiError> {
        let mut store = self.lock();

        if let Some(email) = &req.email {
            let email = email.trim().to_lowercase();
            if store
                .users
                .iter()
                .any(|u| u.user.email == email && u.user.id != id)
            {
                return Err(ApiError::Conflict("Email is already registered".to_string()));
            }
        }

        let entry = store
            .users
            .iter_mut()
            .find(|u| u.user.id == id)
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        if let Some(name) = req.name {
            entry.user.name = name;
        }
        if let Some(email) = req.email {
            entry.user.email = email.trim().to_lowercase();
        }
        entry.user.updated_at = Utc::now();
        Ok(entry.user.clone())
    }

    async fn list_users(&self, page: i64, limit: i64) -> Result<(Vec<User>, i64), ApiError> {
        let store = self.lock();
        let mut users: Vec<User> = store.users.iter().map(|u| u.user.clone()).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = users.len() as i64;
        Ok((Self::paginate(&users, page, limit), total))
    }

    async fn admin_update_user(
        &self,
        id: Uuid,
        req: &AdminUpdateUserRequest,
        password_hash: Option<String>,
        revoke_tokens: bool,
    ) -> Result<User, ApiError> {
        let mut store = self.lock();

        if let Some(email) = &req.email {
            let email = email.trim().to_lowercase();
            if store
                .users
                .iter()
                .any(|u| u.user.email == email && u.user.id != id)
            {
                return Err(ApiError::Conflict("Email is already registered".to_string()));
            }
        }

        let entry = store
            .users
            .iter_mut()
            .find(|u| u.user.id == id)
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        if let Some(name) = &req.name {
            entry.user.name = name.clone();
        }
        if let Some(email) = &req.email {
            entry.user.email = email.trim().to_lowercase();
        }
        if let Some(hash) = password_hash {
            entry.password_hash = hash;
        }
        if let Some(is_admin) = req.is_admin {
            entry.user.is_admin = is_admin;
        }
        if revoke_tokens {
            entry.user.token_version += 1;
        }
        entry.user.updated_at = Utc::now();
        Ok(entry.user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), ApiError> {
        let mut store = self.lock();
        if store.orders.iter().any(|o| o.user_id == id) {
            return Err(ApiError::Conflict(
                "User has existing orders and cannot be deleted".to_string(),
            ));
        }
        let before = store.users.len();
        store.users.retain(|u| u.user.id != id);
        if store.users.len() == before {
            return Err(ApiError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn list_products(&self, page: i64, limit: i64) -> Result<(Vec<Product>, i64), ApiError> {
        let store = self.lock();
        let mut products: Vec<Product> = store
            .products
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = products.len() as i64;
        Ok((Self::paginate(&products, page, limit), total))
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, ApiError> {
        let store = self.lock();
        Ok(store
            .products
            .iter()
            .find(|p| p.id == id && p.is_active)
            .cloned())
    }

    async fn create_product(&self, req: &CreateProductRequest) -> Result<Product, ApiError> {
        let mut store = self.lock();
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            image: req.image.clone().unwrap_or_default(),
            category: req.category.to_lowercase(),
            original_price: req.original_price,
            new_price: req.new_price,
            stock: req.stock.unwrap_or(0),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        store.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        req: &UpdateProductRequest,
    ) -> Result<Product, ApiError> {
        let mut store = self.lock();
        let product = store
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

        // Same merged-row invariant check the Postgres implementation performs.
        let merged_original = req.original_price.unwrap_or(product.original_price);
        let merged_new = req.new_price.unwrap_or(product.new_price);
        validate_prices(merged_original, merged_new)?;

        if let Some(name) = &req.name {
            product.name = name.clone();
        }
        if let Some(image) = &req.image {
            product.image = image.clone();
        }
        if let Some(category) = &req.category {
            product.category = category.to_lowercase();
        }
        if let Some(price) = req.original_price {
            product.original_price = price;
        }
        if let Some(price) = req.new_price {
            product.new_price = price;
        }
        if let Some(stock) = req.stock {
            product.stock = stock;
        }
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn soft_delete_product(&self, id: Uuid) -> Result<(), ApiError> {
        let mut store = self.lock();
        let product = store
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
        product.is_active = false;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn create_order(
        &self,
        user_id: Uuid,
        req: &CreateOrderRequest,
    ) -> Result<Order, ApiError> {
        let mut store = self.lock();
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            user_id,
            items: req
                .items
                .iter()
                .map(|i| OrderItem {
                    product_id: i.product_id,
                    name: i.name.clone(),
                    qty: i.qty,
                    price: i.price,
                })
                .collect(),
            total_amount: req.total_amount,
            status: "Pending".to_string(),
            shipping_address: req.shipping_address.trim().to_string(),
            phone_number: req.phone_number.clone(),
            created_at: now,
            updated_at: now,
        };
        store.orders.push(order.clone());
        Ok(order)
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, ApiError> {
        let store = self.lock();
        let mut orders: Vec<Order> = store
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn list_orders(&self, page: i64, limit: i64) -> Result<(Vec<Order>, i64), ApiError> {
        let store = self.lock();
        let mut orders: Vec<Order> = store.orders.to_vec();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = orders.len() as i64;
        Ok((Self::paginate(&orders, page, limit), total))
    }

    async fn update_order_status(&self, id: Uuid, status: &str) -> Result<Order, ApiError> {
        let mut store = self.lock();
        let order = store
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
        order.status = status.to_string();
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn create_contact_message(
        &self,
        req: &ContactRequest,
    ) -> Result<ContactMessage, ApiError> {
        let mut store = self.lock();
        let message = ContactMessage {
            id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            message: req.message.clone(),
            created_at: Utc::now(),
        };
        store.messages.push(message.clone());
        Ok(message)
    }

    async fn list_contact_messages(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<ContactMessage>, i64), ApiError> {
        let store = self.lock();
        let mut messages: Vec<ContactMessage> = store.messages.to_vec();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = messages.len() as i64;
        Ok((Self::paginate(&messages, page, limit), total))
    }
}
