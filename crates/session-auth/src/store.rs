//! Durable session storage
//!
//! A flat JSON object of string keys to string values, mirroring the browser
//! storage the web storefront uses. All writes go through a temp file and a
//! rename so a crash never leaves a half-written session. A tokio Mutex
//! serializes writers (login, refresh, logout can race).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use common::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::api::LoginResponse;
use crate::error::{Error, Result};

/// Fixed keys in the session file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    UserData,
    AccessToken,
    RefreshToken,
    TemporaryToken,
    PreAuthGoogleToken,
    PreAuthFacebookToken,
    RememberAuth,
    DeviceToken,
}

impl StorageKey {
    pub const ALL: [StorageKey; 8] = [
        StorageKey::UserData,
        StorageKey::AccessToken,
        StorageKey::RefreshToken,
        StorageKey::TemporaryToken,
        StorageKey::PreAuthGoogleToken,
        StorageKey::PreAuthFacebookToken,
        StorageKey::RememberAuth,
        StorageKey::DeviceToken,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StorageKey::UserData => "userData",
            StorageKey::AccessToken => "accessToken",
            StorageKey::RefreshToken => "refreshToken",
            StorageKey::TemporaryToken => "temporaryToken",
            StorageKey::PreAuthGoogleToken => "preAuthGoogleToken",
            StorageKey::PreAuthFacebookToken => "preAuthFacebookToken",
            StorageKey::RememberAuth => "rememberAuth",
            StorageKey::DeviceToken => "deviceToken",
        }
    }
}

/// Keys removed when a session ends. Device token and pre-auth social
/// tokens outlive a sign-out.
const SESSION_KEYS: [StorageKey; 4] = [
    StorageKey::AccessToken,
    StorageKey::RefreshToken,
    StorageKey::TemporaryToken,
    StorageKey::UserData,
];

/// Role attached to a signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Cached identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl UserData {
    /// Granted permission strings; empty when the user has no role.
    pub fn permissions(&self) -> &[String] {
        self.role
            .as_ref()
            .map(|r| r.permissions.as_slice())
            .unwrap_or_default()
    }
}

/// Which credential is carrying the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Remembered session, refreshed tokens are persisted
    Access,
    /// Non-remembered session, refreshed tokens live only in memory
    Temporary,
}

/// The token a request would be sent with.
#[derive(Debug, Clone)]
pub struct ActiveToken {
    pub kind: TokenKind,
    pub token: Secret<String>,
}

/// Snapshot of the stored bearer credentials.
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    pub access_token: Option<Secret<String>>,
    pub refresh_token: Option<Secret<String>>,
    pub temporary_token: Option<Secret<String>>,
}

impl CredentialSet {
    /// The access token if present, else the temporary token.
    pub fn active(&self) -> Option<ActiveToken> {
        if let Some(token) = &self.access_token {
            return Some(ActiveToken {
                kind: TokenKind::Access,
                token: token.clone(),
            });
        }
        self.temporary_token.as_ref().map(|token| ActiveToken {
            kind: TokenKind::Temporary,
            token: token.clone(),
        })
    }
}

/// Thread-safe session file manager.
pub struct SessionStore {
    path: PathBuf,
    state: Mutex<HashMap<String, String>>,
}

impl SessionStore {
    /// Load the session file, creating an empty one if missing.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            let entries: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::SessionParse(format!("parsing session file: {e}")))?;
            info!(path = %path.display(), keys = entries.len(), "loaded session");
            entries
        } else {
            info!(path = %path.display(), "session file not found, starting signed out");
            let entries = HashMap::new();
            write_atomic(&path, &entries).await?;
            entries
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub async fn get(&self, key: StorageKey) -> Option<String> {
        self.state.lock().await.get(key.as_str()).cloned()
    }

    pub async fn set(&self, key: StorageKey, value: impl Into<String>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.insert(key.as_str().to_owned(), value.into());
        debug!(key = key.as_str(), "stored session value");
        write_atomic(&self.path, &state).await
    }

    /// Remove one key. Missing keys are not an error and skip the write.
    pub async fn clear(&self, key: StorageKey) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.remove(key.as_str()).is_some() {
            debug!(key = key.as_str(), "cleared session value");
            write_atomic(&self.path, &state).await?;
        }
        Ok(())
    }

    pub async fn credentials(&self) -> CredentialSet {
        let state = self.state.lock().await;
        let secret = |key: StorageKey| {
            state
                .get(key.as_str())
                .filter(|v| !v.is_empty())
                .map(|v| Secret::new(v.clone()))
        };
        CredentialSet {
            access_token: secret(StorageKey::AccessToken),
            refresh_token: secret(StorageKey::RefreshToken),
            temporary_token: secret(StorageKey::TemporaryToken),
        }
    }

    /// Cached user, if any. A corrupt entry reads as signed out.
    pub async fn user_data(&self) -> Option<UserData> {
        let raw = self.get(StorageKey::UserData).await?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable userData entry");
                None
            }
        }
    }

    pub async fn set_user_data(&self, user: &UserData) -> Result<()> {
        let json = serde_json::to_string(user)
            .map_err(|e| Error::SessionParse(format!("serializing userData: {e}")))?;
        self.set(StorageKey::UserData, json).await
    }

    /// Drop the credential set and cached user in a single write.
    pub async fn clear_session(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut removed = false;
        for key in SESSION_KEYS {
            removed |= state.remove(key.as_str()).is_some();
        }
        if removed {
            info!("session cleared");
            write_atomic(&self.path, &state).await?;
        }
        Ok(())
    }

    /// Persist a fresh login.
    ///
    /// Remembered sessions keep an access token; the rest get a temporary
    /// token that is never re-persisted after refresh. The user profile is
    /// stored either way, since a process has no other place to keep it.
    pub async fn establish(&self, login: &LoginResponse, remember: bool) -> Result<()> {
        let user = serde_json::to_string(&login.user)
            .map_err(|e| Error::SessionParse(format!("serializing userData: {e}")))?;

        let mut state = self.state.lock().await;
        for key in SESSION_KEYS {
            state.remove(key.as_str());
        }
        state.insert(StorageKey::UserData.as_str().to_owned(), user);
        let access = login.access_token.expose().clone();
        if remember {
            state.insert(StorageKey::AccessToken.as_str().to_owned(), access);
            state.insert(StorageKey::RememberAuth.as_str().to_owned(), "true".to_owned());
        } else {
            state.insert(StorageKey::TemporaryToken.as_str().to_owned(), access);
            state.remove(StorageKey::RememberAuth.as_str());
        }
        state.insert(
            StorageKey::RefreshToken.as_str().to_owned(),
            login.refresh_token.expose().clone(),
        );
        info!(user_id = %login.user.id, remember, "session established");
        write_atomic(&self.path, &state).await
    }
}

/// Write the session atomically: temp file in the same directory, chmod
/// 0600, rename over the target.
async fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::SessionParse(format!("serializing session: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("session path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".session.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted session");
    Ok(())
}
