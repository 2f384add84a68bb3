//! Gate counters
//!
//! Recorded through the `metrics` facade; whichever recorder the host
//! process installs picks them up. With none installed they are no-ops.
//!
//! - `gate_refresh_total` (counter): label `outcome` (`success`, `failure`)
//! - `gate_login_redirects_total` (counter): label `reason`
//! - `gate_queued_requests_total` (counter): requests that waited on a refresh

pub fn record_refresh(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    ::metrics::counter!("gate_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_login_redirect(reason: &'static str) {
    ::metrics::counter!("gate_login_redirects_total", "reason" => reason).increment(1);
}

pub fn record_queued() {
    ::metrics::counter!("gate_queued_requests_total").increment(1);
}
