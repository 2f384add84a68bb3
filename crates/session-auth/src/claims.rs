//! JWT claim decoding for expiry checks
//!
//! Tokens are decoded, not verified: the server checks signatures, the
//! client only reads `exp` to decide whether a token is worth sending.
//! Anything that fails to decode is treated as expired.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

/// Claims read from a token's payload segment.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Expiry as unix seconds
    pub exp: u64,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Why a token could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("token has {0} segments, expected 3")]
    Segments(usize),

    #[error("payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not a claims object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode the payload segment of a compact JWT.
///
/// Padding is tolerated even though JWTs should not carry it.
pub fn decode_claims(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::Segments(segments.len()));
    }
    let payload = URL_SAFE_NO_PAD.decode(segments[1].trim_end_matches('='))?;
    Ok(serde_json::from_slice(&payload)?)
}

/// Whether `token` expires strictly after `now` (unix seconds).
pub fn is_live(token: &str, now: u64) -> bool {
    match decode_claims(token) {
        Ok(claims) => claims.exp > now,
        Err(e) => {
            tracing::debug!(error = %e, "undecodable token treated as expired");
            false
        }
    }
}

#[cfg(test)]
fn unsigned_token(exp: u64, subject: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload =
        URL_SAFE_NO_PAD.encode(serde_json::json!({ "exp": exp, "sub": subject }).to_string());
    format!("{header}.{payload}.sig")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_exp_and_keeps_other_claims() {
        let token = unsigned_token(1_700_000_000, "user-7");
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, 1_700_000_000);
        assert_eq!(claims.extra["sub"], "user-7");
    }

    #[test]
    fn live_means_strictly_after_now() {
        let token = unsigned_token(100, "u");
        assert!(is_live(&token, 99));
        assert!(!is_live(&token, 100));
        assert!(!is_live(&token, 101));
    }

    #[test]
    fn wrong_segment_count_is_rejected() {
        let err = decode_claims("only.two").unwrap_err();
        assert!(matches!(err, DecodeError::Segments(2)));
        assert!(!is_live("only.two", 0));
    }

    #[test]
    fn garbage_payload_counts_as_expired() {
        assert!(matches!(
            decode_claims("a.!!!.c").unwrap_err(),
            DecodeError::Base64(_)
        ));
        // valid base64 of "not json"
        let token = format!("h.{}.s", URL_SAFE_NO_PAD.encode("not json"));
        assert!(matches!(
            decode_claims(&token).unwrap_err(),
            DecodeError::Json(_)
        ));
        assert!(!is_live(&token, 0));
    }

    #[test]
    fn missing_exp_is_malformed() {
        let token = format!("h.{}.s", URL_SAFE_NO_PAD.encode(r#"{"sub":"u"}"#));
        assert!(decode_claims(&token).is_err());
        assert!(!is_live(&token, 0));
    }

    #[test]
    fn padded_payload_is_accepted() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"exp":5}"#);
        let token = format!("h.{payload}.s");
        assert_eq!(decode_claims(&token).unwrap().exp, 5);
    }
}
