//! Session sink for a terminal client
//!
//! There is no router in a CLI. "Current path" is the route configured (or
//! passed with `--route`), and a login redirect is recorded so the command
//! can tell the user where to sign in once it finishes.

use std::sync::{Mutex, PoisonError};

use refresh_gate::{LoginRedirect, SessionSink};
use tracing::{info, warn};

pub struct CliSession {
    current_route: String,
    redirect: Mutex<Option<LoginRedirect>>,
}

impl CliSession {
    pub fn new(current_route: impl Into<String>) -> Self {
        Self {
            current_route: current_route.into(),
            redirect: Mutex::new(None),
        }
    }

    /// The login redirect issued during this run, if any.
    pub fn take_redirect(&self) -> Option<LoginRedirect> {
        self.redirect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl SessionSink for CliSession {
    fn invalidate(&self) {
        info!("cached user cleared");
    }

    fn current_path(&self) -> String {
        self.current_route.clone()
    }

    fn redirect_to_login(&self, redirect: LoginRedirect) {
        warn!(login = %redirect.path, return_url = ?redirect.return_url, "session ended");
        *self.redirect.lock().unwrap_or_else(PoisonError::into_inner) = Some(redirect);
    }
}

/// Render a redirect as a location string, `returnUrl` query included.
pub fn location(redirect: &LoginRedirect) -> String {
    let Some((param, value)) = redirect.query() else {
        return redirect.path.clone();
    };
    let query: String = reqwest::Url::parse_with_params("http://localhost/", &[(param, value)])
        .ok()
        .and_then(|url| url.query().map(str::to_owned))
        .unwrap_or_else(|| format!("{param}={value}"));
    format!("{}?{query}", redirect.path)
}
