//! Auth gate: shared-secret verification and the session cookie.
//!
//! Trust is binary. The cookie is a fixed marker, not a signed token, so the
//! gate only ever distinguishes "logged in" from "not logged in"; revocation
//! means changing the password and waiting out cookie expiry.

use axum::http::{header, HeaderMap};

use crate::config::Config;
use crate::error::Result;

pub const AUTH_COOKIE: &str = "daka_auth";
const AUTH_COOKIE_VALUE: &str = "1";
const ONE_YEAR_SECS: u64 = 60 * 60 * 24 * 365;

/// Compare a login attempt against the configured secret. Errors when no
/// secret is configured at all; that is a deployment problem, not a denial.
pub fn verify_password(config: &Config, candidate: &str) -> Result<bool> {
    let expected = config.require_password()?;
    Ok(candidate == expected)
}

/// `Set-Cookie` value establishing a session. HttpOnly and SameSite=Lax
/// always; Secure only in production so plain-http development still works.
pub fn session_cookie(config: &Config) -> String {
    let mut cookie = format!(
        "{AUTH_COOKIE}={AUTH_COOKIE_VALUE}; Path=/; Max-Age={ONE_YEAR_SECS}; HttpOnly; SameSite=Lax"
    );
    if config.is_production() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value clearing the session.
pub fn expired_cookie() -> String {
    format!("{AUTH_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

/// Whether the request carries a valid session cookie.
pub fn is_authed(headers: &HeaderMap) -> bool {
    let Some(cookies) = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };
    cookies.split(';').any(|pair| {
        let mut parts = pair.trim().splitn(2, '=');
        parts.next() == Some(AUTH_COOKIE) && parts.next() == Some(AUTH_COOKIE_VALUE)
    })
}
