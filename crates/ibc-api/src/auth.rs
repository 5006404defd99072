//! Caller identification
//!
//! The CMS proves itself to [`crate::constants::CLIENT_CONFIG_PATH`] with a
//! bearer access key and receives a session cookie. Upload nonces are bound
//! to that session, so a nonce is only accepted together with the cookie it
//! was issued for.

use axum::http::{header, HeaderMap};
use ibc_infra::SESSION_COOKIE;
use subtle::ConstantTimeEq;

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Whether the `Authorization: Bearer` header carries `access_key`
pub fn has_access_key(headers: &HeaderMap, access_key: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .is_some_and(|token| secure_compare(token.trim(), access_key))
}

/// Session id from the request's cookies
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value for `session`; `Secure` in production
pub fn session_set_cookie(session: &str, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; Path=/; SameSite=Strict; HttpOnly{}",
        SESSION_COOKIE, session, secure_flag
    )
}
