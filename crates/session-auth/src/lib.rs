//! Session credentials for the storefront API
//!
//! Owns everything the client knows about the signed-in user: the durable
//! key-value session file, JWT claim decoding for expiry checks, and the
//! auth endpoints (login, refresh, logout). The refresh gate builds on top of
//! this crate; nothing here knows about request interception.
//!
//! Session flow:
//! 1. `AuthApi::login()` returns tokens and the user profile
//! 2. `SessionStore::establish()` persists them (remember-me picks the keys)
//! 3. `claims::is_live()` decides per request whether a token is still usable
//! 4. `AuthApi::refresh_access_token()` trades the refresh token for a new access token
//! 5. `SessionStore::clear_session()` drops everything on logout

pub mod api;
pub mod claims;
pub mod constants;
pub mod error;
pub mod store;

pub use api::{AuthApi, LoginResponse, TokenRefresher};
pub use claims::{Claims, DecodeError, decode_claims, is_live};
pub use constants::*;
pub use error::{Error, Result};
pub use store::{ActiveToken, CredentialSet, Role, SessionStore, StorageKey, TokenKind, UserData};
