//! Bearer-token expiry inspection.
//!
//! Tokens are three dot-delimited segments; the middle segment,
//! base64-decoded, is a JSON object carrying an `exp` claim in unix
//! seconds. Every helper here is total: any malformation reads as
//! "no expiry" rather than an error.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TokenClaims {
    exp: i64,
}

/// Extracts the expiry claim from a token, or `None` when the token does
/// not have the expected three-segment shape, the payload is not valid
/// base64/JSON, or the `exp` claim is missing or out of range.
#[must_use]
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    let _signature = segments.next()?;
    if segments.next().is_some() {
        return None;
    }

    let bytes = decode_segment(payload)?;
    let claims: TokenClaims = serde_json::from_slice(&bytes).ok()?;
    DateTime::<Utc>::from_timestamp(claims.exp, 0)
}

/// True iff the token carries an expiry strictly in the future of `now`.
#[must_use]
pub fn is_token_live(token: &str, now: DateTime<Utc>) -> bool {
    token_expiry(token).is_some_and(|expiry| expiry > now)
}

// JWT payloads are base64url without padding, but the backend historically
// minted standard-alphabet payloads as well; accept both.
fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| STANDARD_NO_PAD.decode(segment))
        .or_else(|_| STANDARD.decode(segment))
        .ok()
}
