/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules,
/// enforcing a Defense-in-Depth strategy. Access control is applied explicitly
/// at the module level (via Axum layers and guard extractors), preventing
/// accidental exposure of protected endpoints.
///
/// The three modules map directly to the defined access roles.

/// Routes accessible to all callers (anonymous, read-only plus registration,
/// login, and contact submission). Listing handlers must enforce visibility
/// (`is_active=true`) at the Repository level.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Requires a valid, unexpired, unrevoked bearer token.
pub mod authenticated;

/// Routes restricted exclusively to users with the admin flag.
/// Every handler takes the `AdminUser` guard, which composes the admin check
/// strictly on top of authentication.
pub mod admin;
