//! Storefront auth constants
//!
//! Endpoint paths are relative to the configured auth base URL. Storage key
//! names match what the web storefront writes so a session file can be
//! shared between the two.

/// Refresh endpoint, relative to the auth base URL
pub const REFRESH_PATH: &str = "refresh-token";

/// Login endpoint, relative to the auth base URL
pub const LOGIN_PATH: &str = "login";

/// Logout endpoint, relative to the auth base URL
pub const LOGOUT_PATH: &str = "logout";

/// Query parameter marking a request as not requiring authentication.
/// Stripped before the request leaves the client.
pub const PUBLIC_MARKER: &str = "isPublic";

/// Query parameter carrying the path to return to after signing in
pub const RETURN_URL_PARAM: &str = "returnUrl";
