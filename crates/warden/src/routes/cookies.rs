//! Authentication cookie construction.
//!
//! Set-Cookie headers are appended by hand: the challenge page clears the
//! same cookie name under two scopes, which a name-keyed jar would collapse.

use axum::http::{HeaderMap, HeaderValue, header};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use time::OffsetDateTime;

use warden_common::{Reason, Scheme};

use super::error::GateError;

/// Expired, empty cookies for both the derived domain and the host-only scope
pub fn clearing_cookies(name: &str, domain: &str) -> [Cookie<'static>; 2] {
    let mut scoped = Cookie::new(name.to_string(), "");
    if !domain.is_empty() {
        scoped.set_domain(domain.to_string());
    }
    scoped.set_expires(OffsetDateTime::UNIX_EPOCH);

    let mut unscoped = Cookie::new(name.to_string(), "");
    unscoped.set_expires(OffsetDateTime::UNIX_EPOCH);

    [scoped, unscoped]
}

/// Cookie carrying a freshly minted authentication id.
///
/// Wildcard domains must reach every subdomain, so they get an explicit
/// `Domain`, are readable from scripts and use `SameSite=None`. Exact hosts
/// stay host-only, `HttpOnly` and `SameSite=Strict`.
pub fn auth_cookie(
    name: &str,
    id: &str,
    domain: &str,
    scheme: Scheme,
    expires: DateTime<Utc>,
    max_age_secs: u64,
) -> Result<Cookie<'static>, GateError> {
    let expires = OffsetDateTime::from_unix_timestamp(expires.timestamp())
        .map_err(|_| GateError::Internal(Reason::HttpResponseFailure))?;
    let max_age = i64::try_from(max_age_secs)
        .map_err(|_| GateError::Internal(Reason::HttpResponseFailure))?;

    let mut cookie = Cookie::new(name.to_string(), id.to_string());
    if domain.starts_with('.') {
        cookie.set_domain(domain.to_string());
        cookie.set_http_only(false);
        cookie.set_same_site(SameSite::None);
    } else {
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Strict);
    }
    cookie.set_secure(scheme.is_https());
    cookie.set_expires(expires);
    cookie.set_max_age(time::Duration::seconds(max_age));

    Ok(cookie)
}

pub fn append_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) -> Result<(), GateError> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|_| GateError::Internal(Reason::HttpResponseFailure))?;
    headers.append(header::SET_COOKIE, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clearing_cookies() {
        let [scoped, unscoped] = clearing_cookies("gate", "example.com");

        let scoped = scoped.to_string();
        assert!(scoped.starts_with("gate=;"));
        assert!(scoped.contains("Domain=example.com"));
        assert!(scoped.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));

        let unscoped = unscoped.to_string();
        assert!(!unscoped.contains("Domain="));
        assert!(unscoped.contains("Expires=Thu, 01 Jan 1970"));
    }

    #[test]
    fn test_exact_host_cookie() {
        let expires = Utc::now() + chrono::Duration::seconds(600);
        let cookie = auth_cookie("gate", "id", "example.com", Scheme::Http, expires, 600)
            .unwrap()
            .to_string();

        assert!(cookie.starts_with("gate=id"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=600"));
        assert!(!cookie.contains("Domain="));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_wildcard_cookie_over_https() {
        let expires = Utc::now() + chrono::Duration::seconds(600);
        let cookie = auth_cookie("gate", "id", ".example.co.uk", Scheme::Https, expires, 600)
            .unwrap()
            .to_string();

        assert!(cookie.contains("Domain="));
        assert!(cookie.contains("example.co.uk"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Secure"));
        assert!(!cookie.contains("HttpOnly"));
    }

    #[test]
    fn test_append_keeps_duplicates() {
        let mut headers = HeaderMap::new();
        for cookie in clearing_cookies("gate", "example.com") {
            append_cookie(&mut headers, &cookie).unwrap();
        }
        assert_eq!(headers.get_all(header::SET_COOKIE).iter().count(), 2);
    }
}
