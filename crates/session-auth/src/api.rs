//! Auth endpoint calls
//!
//! Three interactions with the auth service, all under one base URL:
//! 1. Login (email/password → token pair and profile)
//! 2. Token refresh (refresh token as bearer → new access token)
//! 3. Logout (best-effort server-side invalidation)
//!
//! Every response is wrapped in a `{ "data": ... }` envelope.

use std::future::Future;
use std::pin::Pin;

use common::Secret;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::constants::{LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH};
use crate::error::{Error, Result};
use crate::store::UserData;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct RefreshData {
    #[serde(default)]
    access_token: Option<Secret<String>>,
}

/// Successful login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: Secret<String>,
    pub refresh_token: Secret<String>,
    pub user: UserData,
}

/// Trades a refresh token for a new access token.
///
/// Uses `Pin<Box<dyn Future>>` so the gate can hold an `Arc<dyn TokenRefresher>`.
pub trait TokenRefresher: Send + Sync {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a Secret<String>,
    ) -> Pin<Box<dyn Future<Output = Result<Secret<String>>> + Send + 'a>>;
}

/// Client for the auth endpoints.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: reqwest::Client,
    base_url: String,
}

impl AuthApi {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Sign in with email and password.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn login(&self, email: &str, password: &Secret<String>) -> Result<LoginResponse> {
        let response = self
            .client
            .post(self.endpoint(LOGIN_PATH))
            .json(&serde_json::json!({ "email": email, "password": password.expose() }))
            .send()
            .await
            .map_err(|e| Error::Http(format!("login request failed: {e}")))?;

        let response = check_status(response, "login").await?;
        let envelope: Envelope<LoginResponse> = response
            .json()
            .await
            .map_err(|e| Error::TokenExchange(format!("invalid login response: {e}")))?;
        debug!(user_id = %envelope.data.user.id, "login succeeded");
        Ok(envelope.data)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token travels as the bearer credential with an empty
    /// body. A 2xx without `data.access_token` is a failure.
    pub async fn refresh_access_token(&self, refresh: &Secret<String>) -> Result<Secret<String>> {
        let response = self
            .client
            .post(self.endpoint(REFRESH_PATH))
            .header(reqwest::header::AUTHORIZATION, refresh.bearer())
            .send()
            .await
            .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

        let response = check_status(response, "token refresh").await?;
        let envelope: Envelope<RefreshData> = response
            .json()
            .await
            .map_err(|e| Error::TokenExchange(format!("invalid refresh response: {e}")))?;

        envelope
            .data
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::TokenExchange("refresh response carried no access_token".into()))
    }

    /// Tell the server the session is over. Callers clear local state
    /// whatever this returns.
    pub async fn logout(&self, access: &Secret<String>) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(LOGOUT_PATH))
            .header(reqwest::header::AUTHORIZATION, access.bearer())
            .send()
            .await
            .map_err(|e| Error::Http(format!("logout request failed: {e}")))?;
        check_status(response, "logout").await?;
        Ok(())
    }
}

impl TokenRefresher for AuthApi {
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a Secret<String>,
    ) -> Pin<Box<dyn Future<Output = Result<Secret<String>>> + Send + 'a>> {
        Box::pin(self.refresh_access_token(refresh_token))
    }
}

/// Map non-success statuses: 401/403 mean the credential was rejected.
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));

    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(Error::InvalidCredentials(format!(
            "{what} rejected ({status}): {body}"
        )));
    }
    Err(Error::TokenExchange(format!("{what} returned {status}: {body}")))
}
