//! Request authorization with single-flight token refresh
//!
//! The gate reads the stored credential set for every request. A live token
//! is attached as-is. An expired one is refreshed through a `SingleFlight`,
//! so however many requests discover the expiry together, only the first one
//! calls the refresh endpoint; the rest queue and reuse its result. Refresh
//! tokens may be single-use server side, so a second concurrent refresh
//! would invalidate the first.
//!
//! Refreshed tokens are written back only for remembered (access token)
//! sessions. Temporary sessions get the new token attached to the waiting
//! requests and nothing else.

use std::sync::Arc;

use common::Secret;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use session_auth::{PUBLIC_MARKER, SessionStore, StorageKey, TokenKind, TokenRefresher, is_live};
use tracing::{debug, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{GateError, Result};
use crate::metrics;
use crate::session::{Routes, SessionSink};
use crate::singleflight::{FlightError, Role, SingleFlight};

pub struct RefreshGate {
    store: Arc<SessionStore>,
    refresher: Arc<dyn TokenRefresher>,
    sink: Arc<dyn SessionSink>,
    clock: Arc<dyn Clock>,
    routes: Routes,
    flight: SingleFlight<Secret<String>, session_auth::Error>,
}

impl RefreshGate {
    pub fn new(
        store: Arc<SessionStore>,
        refresher: Arc<dyn TokenRefresher>,
        sink: Arc<dyn SessionSink>,
        routes: Routes,
    ) -> Self {
        Self {
            store,
            refresher,
            sink,
            clock: Arc::new(SystemClock),
            routes,
            flight: SingleFlight::new(),
        }
    }

    /// Replace the wall clock used for expiry checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn is_refreshing(&self) -> bool {
        self.flight.is_in_flight()
    }

    /// Requests currently waiting on an in-flight refresh.
    pub fn queued(&self) -> usize {
        self.flight.waiting()
    }

    /// Prepare `request` for dispatch.
    ///
    /// On `Ok` the request carries a bearer token (or is public and carries
    /// none) and no `isPublic` marker. On `Err` it must not be sent; for
    /// session-ending errors the sink has already been redirected.
    #[instrument(skip_all, fields(method = %request.method(), path = %request.url().path()))]
    pub async fn authorize(&self, request: &mut reqwest::Request) -> Result<()> {
        let public = strip_public_marker(request.url_mut());
        let credentials = self.store.credentials().await;

        let Some(active) = credentials.active() else {
            if public {
                debug!("public request without credentials");
                return Ok(());
            }
            return Err(self.end_session(GateError::NoCredential).await);
        };

        let now = self.clock.now_secs();
        if is_live(active.token.expose(), now) {
            return attach(request, &active.token);
        }

        let Some(refresh) = credentials.refresh_token else {
            return Err(self.end_session(GateError::ExpiredAccessNoRefresh).await);
        };
        if !is_live(refresh.expose(), now) {
            return Err(self.end_session(GateError::ExpiredRefresh).await);
        }

        let token = self.refresh(refresh, active.kind).await?;
        attach(request, &token)
    }

    async fn refresh(&self, refresh: Secret<String>, kind: TokenKind) -> Result<Secret<String>> {
        let (role, outcome) = self
            .flight
            .run(|| self.lead_refresh(refresh, kind))
            .await;
        if role == Role::Follower {
            metrics::record_queued();
            debug!("request resumed after queued refresh");
        }
        match outcome {
            Ok(token) => Ok(token),
            Err(FlightError::Failed(e)) => Err(GateError::RefreshFailed(e)),
            Err(FlightError::Abandoned) => Err(GateError::RefreshAbandoned),
        }
    }

    /// Body of the refresh flight. Persisting and ending the session both
    /// happen here so they run once per flight, before waiters are released.
    async fn lead_refresh(
        &self,
        refresh: Secret<String>,
        kind: TokenKind,
    ) -> session_auth::Result<Secret<String>> {
        // The caller's credential snapshot predates joining the flight. A
        // flight that settled in between may already have stored a live
        // token, and the refresh token it used may be spent.
        let current = self.store.credentials().await;
        if let Some(active) = current.active() {
            if is_live(active.token.expose(), self.clock.now_secs()) {
                debug!(kind = ?active.kind, "token refreshed since snapshot, reusing it");
                return Ok(active.token);
            }
        }
        let refresh = current.refresh_token.unwrap_or(refresh);

        info!(?kind, "token expired, refreshing");
        match self.refresher.refresh(&refresh).await {
            Ok(token) => {
                metrics::record_refresh(true);
                match kind {
                    TokenKind::Access => {
                        if let Err(e) = self
                            .store
                            .set(StorageKey::AccessToken, token.expose().as_str())
                            .await
                        {
                            warn!(error = %e, "failed to persist refreshed access token");
                        }
                    }
                    TokenKind::Temporary => {
                        debug!("temporary session, refreshed token not persisted");
                    }
                }
                info!("token refresh succeeded");
                Ok(token)
            }
            Err(e) => {
                metrics::record_refresh(false);
                warn!(error = %e, "token refresh failed, ending session");
                self.end_session(GateError::RefreshFailed(e.clone())).await;
                Err(e)
            }
        }
    }

    /// Clear the session and send the user to login. Returns `reason` so
    /// callers can propagate it.
    async fn end_session(&self, reason: GateError) -> GateError {
        metrics::record_login_redirect(reason.reason());
        if let Err(e) = self.store.clear_session().await {
            warn!(error = %e, "failed to clear stored session");
        }
        self.sink.invalidate();

        let redirect = self.routes.redirect_from(&self.sink.current_path());
        info!(
            reason = reason.reason(),
            return_url = ?redirect.return_url,
            "redirecting to login"
        );
        self.sink.redirect_to_login(redirect);
        reason
    }
}

fn attach(request: &mut reqwest::Request, token: &Secret<String>) -> Result<()> {
    let mut value = HeaderValue::from_str(&token.bearer()).map_err(|_| GateError::InvalidHeader)?;
    value.set_sensitive(true);
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}

/// Remove every `isPublic` query pair and report whether one was truthy.
fn strip_public_marker(url: &mut reqwest::Url) -> bool {
    if !url.query_pairs().any(|(k, _)| k == PUBLIC_MARKER) {
        return false;
    }

    let mut public = false;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(k, v)| {
            if k == PUBLIC_MARKER {
                public |= v == "true" || v == "1";
                None
            } else {
                Some((k.into_owned(), v.into_owned()))
            }
        })
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&kept);
    }
    public
}
