//! Session cookie helpers.
//!
//! The session lives entirely in one HttpOnly cookie holding the signed
//! session token.

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use chrono::{DateTime, Utc};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "podcast_club_session";

/// Builds `Set-Cookie` values for the session cookie.
#[derive(Debug, Clone)]
pub struct CookieHelper {
    secure: bool,
}

impl CookieHelper {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Cookie carrying `token` that expires at `expires_at`.
    pub fn build_session_cookie(&self, token: &str, expires_at: DateTime<Utc>) -> String {
        let max_age = (expires_at - Utc::now()).num_seconds().max(0);
        self.build_cookie(
            token,
            max_age,
            &expires_at.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        )
    }

    /// Cookie that makes the browser drop the session.
    pub fn build_clear_cookie(&self) -> String {
        self.build_cookie("", 0, "Thu, 01 Jan 1970 00:00:00 GMT")
    }

    pub fn set_session(&self, headers: &mut HeaderMap, token: &str, expires_at: DateTime<Utc>) {
        if let Ok(value) = HeaderValue::from_str(&self.build_session_cookie(token, expires_at)) {
            headers.append(SET_COOKIE, value);
        }
    }

    pub fn clear_session(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.build_clear_cookie()) {
            headers.append(SET_COOKIE, value);
        }
    }

    fn build_cookie(&self, value: &str, max_age: i64, expires: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; Expires={}; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, value, max_age, expires
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Extract a cookie value from request headers by name.
pub fn extract_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|header| header.split(';'))
        .map(str::trim)
        .find_map(|cookie| {
            let (cookie_name, cookie_value) = cookie.split_once('=')?;
            (cookie_name == name).then_some(cookie_value)
        })
}

/// The session token sent by the browser, if any.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    extract_cookie(headers, SESSION_COOKIE).filter(|token| !token.is_empty())
}
