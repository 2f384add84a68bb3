//! REST client
//!
//! Builds a request against the configured API base, marks it public when
//! asked, lets the refresh gate authorize it, then sends it. Each call gets a
//! `req_<uuid>` id, sent as `x-request-id` and recorded on the span.

use std::sync::Arc;
use std::time::{Duration, Instant};

use refresh_gate::RefreshGate;
use reqwest::{Method, StatusCode, Url};
use session_auth::PUBLIC_MARKER;
use tracing::{info, instrument, warn};

use crate::error::{Error, Result};
use crate::metrics;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Response returned to the caller regardless of status.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// Parsed JSON, or the raw text as a JSON string when the body isn't JSON
    pub body: serde_json::Value,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    gate: Arc<RefreshGate>,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        gate: Arc<RefreshGate>,
        timeout: Duration,
    ) -> Result<Self> {
        // A trailing slash makes `join` append to the base path instead of
        // replacing its last segment.
        let base = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&base).map_err(|e| Error::Path {
            path: base,
            reason: e.to_string(),
        })?;
        Ok(Self {
            http,
            base_url,
            gate,
            timeout,
        })
    }

    pub fn gate(&self) -> &Arc<RefreshGate> {
        &self.gate
    }

    fn url(&self, path: &str, public: bool) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Path {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        if public {
            url.query_pairs_mut().append_pair(PUBLIC_MARKER, "true");
        }
        Ok(url)
    }

    /// Send one API call through the gate.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        public: bool,
    ) -> Result<ApiResponse> {
        let request_id = format!("req_{}", uuid::Uuid::new_v4().simple());
        self.send_with_id(method, path, body, public, request_id)
            .await
    }

    #[instrument(skip_all, fields(request_id = %request_id, method = %method, path = %path))]
    async fn send_with_id(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        public: bool,
        request_id: String,
    ) -> Result<ApiResponse> {
        let url = self.url(path, public)?;
        let mut builder = self
            .http
            .request(method.clone(), url)
            .timeout(self.timeout)
            .header(REQUEST_ID_HEADER, &request_id);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let mut request = builder.build()?;

        if let Err(e) = self.gate.authorize(&mut request).await {
            warn!(error = %e, "request not sent");
            return Err(e.into());
        }

        let started = Instant::now();
        let response = self.http.execute(request).await?;
        let status = response.status();
        let text = response.text().await?;
        let elapsed = started.elapsed();

        metrics::record_request(status.as_u16(), method.as_str(), elapsed.as_secs_f64());
        info!(
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "request completed"
        );

        let body = if text.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
        };
        Ok(ApiResponse { status, body })
    }
}
