//! Bearer-token claim decoding for display purposes.
//!
//! TRUST
//! =====
//! Nothing here checks a signature. The decoded claims drive labels and
//! in-page conditionals only; access decisions belong to the backend and, at
//! the UI level, to [`crate::policy`].

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};

use crate::state::Role;

/// Username claim identifier used by the issuing identity system.
pub const NAME_CLAIM: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name";
/// Email claim identifier.
pub const EMAIL_CLAIM: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress";
/// Role claim identifier.
pub const ROLE_CLAIM: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";

/// Claim mapping decoded from a token payload segment.
pub type Claims = Map<String, Value>;

/// Decode the payload segment of `token` into a claim mapping.
///
/// Returns `None` for anything other than a three-segment token whose middle
/// segment is base64url-encoded JSON object text.
#[must_use]
pub fn decode_claims(token: &str) -> Option<Claims> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return None;
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Username carried by `token`, if any.
#[must_use]
pub fn username(token: Option<&str>) -> Option<String> {
    string_claim(&decode_claims(token?)?, NAME_CLAIM)
}

/// Email carried by `token`, if any.
#[must_use]
pub fn email(token: Option<&str>) -> Option<String> {
    string_claim(&decode_claims(token?)?, EMAIL_CLAIM)
}

/// Role carried by `token`, if any.
///
/// Multi-role tokens encode the claim as an array; the first value that names
/// a known role wins.
#[must_use]
pub fn role(token: Option<&str>) -> Option<Role> {
    let claims = decode_claims(token?)?;
    match claims.get(ROLE_CLAIM)? {
        Value::String(raw) => raw.parse().ok(),
        Value::Array(values) => values
            .iter()
            .filter_map(Value::as_str)
            .find_map(|raw| raw.parse().ok()),
        _ => None,
    }
}

fn string_claim(claims: &Claims, key: &str) -> Option<String> {
    claims
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[path = "claims_test.rs"]
mod tests;
