use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    models::User,
    repository::RepositoryState,
};

/// Claims
///
/// The payload structure embedded inside every issued JSON Web Token. Claims are
/// signed with the server's secret and validated on every authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the user, used to re-fetch the identity record.
    pub sub: Uuid,
    /// The user's token version at issue time. Verification rejects the token when
    /// the stored version has moved on — the only pre-expiry revocation mechanism.
    pub token_version: i32,
    /// Expiration time (exp): timestamp after which the token must not be accepted.
    pub exp: usize,
    /// Issued at (iat): timestamp when the token was minted.
    pub iat: usize,
}

/// issue_token
///
/// Mints a signed bearer token for the given identity, embedding the subject id and
/// the identity's *current* token version, with the configured fixed expiry.
pub fn issue_token(
    user_id: Uuid,
    token_version: i32,
    config: &AppConfig,
) -> Result<String, ApiError> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(chrono::Duration::hours(config.jwt_expires_in_hours))
        .ok_or_else(|| ApiError::Internal("invalid token expiry timestamp".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        token_version,
        exp,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
}

/// verify_token
///
/// Decodes and validates a bearer token against the signing secret. Expiry is always
/// enforced. The token-version (revocation) check happens in the `AuthUser` extractor,
/// which has access to the current stored record.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => match e.kind() {
            // Token expired: the most common failure for a valid-but-old token.
            ErrorKind::ExpiredSignature => Err(ApiError::Unauthorized(
                "Not authorized, token expired".to_string(),
            )),
            // Catch all other failure types (bad signature, malformed token, etc.).
            _ => Err(ApiError::Unauthorized(
                "Not authorized, invalid token".to_string(),
            )),
        },
    }
}

/// AuthUser — the Authenticated guard
///
/// The resolved identity of an authenticated request, with the password hash
/// excluded by construction. Handlers take this as a function argument; the
/// extractor performs the full pipeline:
/// 1. Dependency resolution: Repository and AppConfig from the application state.
/// 2. Local bypass: development-time access via the 'x-user-id' header.
/// 3. Token validation: Bearer extraction and JWT decoding.
/// 4. Store lookup: re-fetch of the identity, rejecting deleted users and tokens
///    whose embedded version no longer matches the stored token version.
///
/// Rejection: 401 Unauthorized (via ApiError) on any failure.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Local Development Bypass Check
        // When running in Env::Local, a known user id in the 'x-user-id' header
        // authenticates the request. The id must still resolve to a stored user,
        // so roles are loaded correctly. Never active in production.
        if config.env == Env::Local {
            if let Some(user_id_header) = parts.headers.get("x-user-id") {
                if let Ok(id_str) = user_id_header.to_str() {
                    if let Ok(user_id) = Uuid::parse_str(id_str) {
                        if let Some(user) = repo.get_user(user_id).await? {
                            return Ok(AuthUser::from(user));
                        }
                    }
                }
            }
        }
        // If Env is Production, or if the bypass failed, execution falls through
        // to the standard JWT validation flow.

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                ApiError::Unauthorized("Not authorized, no token provided".to_string())
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("Not authorized, no token provided".to_string())
        })?;

        let claims = verify_token(token, &config.jwt_secret)?;

        // Store Lookup (Final Verification)
        // Rejects tokens for users deleted after issuance.
        let user = repo
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Not authorized".to_string()))?;

        // Revocation check: an admin edit to the password or role bumps the stored
        // token version, so every token minted before the edit stops matching here.
        if user.token_version != claims.token_version {
            return Err(ApiError::Unauthorized(
                "Not authorized, token revoked".to_string(),
            ));
        }

        Ok(AuthUser::from(user))
    }
}

/// AdminUser — the Admin guard
///
/// Composed strictly on top of `AuthUser`: the extractor first resolves the
/// authenticated identity (401 on failure), then requires the admin flag (403
/// otherwise). Admin therefore never runs without Authenticated having populated
/// the identity.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;

        if !auth_user.is_admin {
            return Err(ApiError::Forbidden(
                "Access denied. Admin privileges required.".to_string(),
            ));
        }

        Ok(AdminUser(auth_user))
    }
}
