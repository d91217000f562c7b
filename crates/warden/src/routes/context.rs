//! Per-request view of the headers the reverse proxy forwards.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use std::convert::Infallible;

use warden_common::Scheme;
use warden_common::constants::{WEB_FONT_EXTENSIONS, headers};

/// Values derived once per request from proxy headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// X-Real-IP
    pub client_addr: String,
    /// X-Original-URI, logged and checked for web fonts
    pub original_uri: String,
    /// X-Forwarded-Host
    pub forwarded_host: String,
    pub user_agent: String,
    pub scheme: Scheme,
    /// Cookie domain: the forwarded host, or `.` + eTLD+1 in wildcard mode
    pub domain: String,
    pub lite_template: bool,
    pub allow_options: bool,
    /// Web-font fetch the operator lets through without a cookie
    pub allow_web_font: bool,
}

impl RequestContext {
    pub fn from_headers(map: &HeaderMap) -> Self {
        let forwarded_host = header_str(map, headers::X_FORWARDED_HOST).to_string();
        let original_uri = header_str(map, headers::X_ORIGINAL_URI).to_string();

        let domain = if is_true(map, headers::X_TLD_PLUS_ONE) {
            wildcard_domain(&forwarded_host).unwrap_or_else(|| forwarded_host.clone())
        } else {
            forwarded_host.clone()
        };

        let allow_web_font =
            is_true(map, headers::X_ALLOW_WEB_FONT) && is_web_font(&original_uri);

        Self {
            client_addr: header_str(map, headers::X_REAL_IP).to_string(),
            user_agent: header_str(map, header::USER_AGENT.as_str()).to_string(),
            scheme: Scheme::from_header(header_str(map, headers::X_SCHEME)),
            lite_template: is_true(map, headers::X_LITE_TEMPLATE),
            allow_options: is_true(map, headers::X_ALLOW_OPTIONS),
            allow_web_font,
            original_uri,
            forwarded_host,
            domain,
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Log one request outcome with the standard context fields.
///
/// `request_log!(info, ctx, StatusCode::OK, challenge = %hash, "{}", reason)`;
/// the `bot` level writes to the `bot` target at INFO.
macro_rules! request_log {
    (bot, $ctx:ident, $status:expr, $($rest:tt)+) => {
        tracing::info!(
            target: "bot",
            status = $status.as_u16(),
            addr = %$ctx.client_addr,
            host = %$ctx.forwarded_host,
            uri = %$ctx.original_uri,
            domain = %$ctx.domain,
            ua = %$ctx.user_agent,
            $($rest)+
        )
    };
    ($level:ident, $ctx:ident, $status:expr, $($rest:tt)+) => {
        tracing::$level!(
            status = $status.as_u16(),
            addr = %$ctx.client_addr,
            host = %$ctx.forwarded_host,
            uri = %$ctx.original_uri,
            domain = %$ctx.domain,
            ua = %$ctx.user_agent,
            $($rest)+
        )
    };
}

pub(crate) use request_log;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

fn is_true(headers: &HeaderMap, name: &str) -> bool {
    header_str(headers, name).eq_ignore_ascii_case("TRUE")
}

/// `.` + eTLD+1 of `host`, or None when the host is itself a public suffix
fn wildcard_domain(host: &str) -> Option<String> {
    let host = host.to_ascii_lowercase();
    psl::domain_str(&host).map(|registrable| format!(".{registrable}"))
}

fn is_web_font(uri: &str) -> bool {
    let path = uri.split(['?', '#']).next().unwrap_or("").to_ascii_lowercase();
    WEB_FONT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_plain_context() {
        let ctx = RequestContext::from_headers(&headers(&[
            ("x-real-ip", "10.0.0.1"),
            ("x-forwarded-host", "example.com"),
            ("x-original-uri", "/index.html"),
            ("user-agent", "curl/8"),
        ]));

        assert_eq!(ctx.client_addr, "10.0.0.1");
        assert_eq!(ctx.domain, "example.com");
        assert_eq!(ctx.user_agent, "curl/8");
        assert_eq!(ctx.scheme, Scheme::Http);
        assert!(!ctx.lite_template);
        assert!(!ctx.allow_options);
        assert!(!ctx.allow_web_font);
    }

    #[test]
    fn test_wildcard_domain() {
        let ctx = RequestContext::from_headers(&headers(&[
            ("x-forwarded-host", "a.b.Example.co.uk"),
            ("x-tldplusone", "true"),
        ]));
        assert_eq!(ctx.domain, ".example.co.uk");

        let ctx = RequestContext::from_headers(&headers(&[
            ("x-forwarded-host", "www.example.com"),
            ("x-tldplusone", "TRUE"),
        ]));
        assert_eq!(ctx.domain, ".example.com");
    }

    #[test]
    fn test_wildcard_falls_back_to_host() {
        // A bare public suffix has no registrable domain
        let ctx = RequestContext::from_headers(&headers(&[
            ("x-forwarded-host", "co.uk"),
            ("x-tldplusone", "TRUE"),
        ]));
        assert_eq!(ctx.domain, "co.uk");

        let ctx = RequestContext::from_headers(&headers(&[
            ("x-forwarded-host", "www.example.com"),
            ("x-tldplusone", "no"),
        ]));
        assert_eq!(ctx.domain, "www.example.com");
    }

    #[test]
    fn test_toggles_are_case_insensitive() {
        let ctx = RequestContext::from_headers(&headers(&[
            ("x-scheme", "HTTPS"),
            ("x-litetemplate", "True"),
            ("x-allow-options", "tRuE"),
        ]));
        assert!(ctx.scheme.is_https());
        assert!(ctx.lite_template);
        assert!(ctx.allow_options);
    }

    #[test]
    fn test_web_font_detection() {
        let font = |uri: &'static str| {
            RequestContext::from_headers(&headers(&[
                ("x-allow-web-font", "TRUE"),
                ("x-original-uri", uri),
            ]))
            .allow_web_font
        };

        assert!(font("/static/font.woff2"));
        assert!(font("/static/FONT.TTF?v=3"));
        assert!(font("/static/font.eot#iefix"));
        assert!(!font("/static/font.woff2.html"));
        assert!(!font("/index.html?f=a.woff"));

        let disabled = RequestContext::from_headers(&headers(&[(
            "x-original-uri",
            "/static/font.woff",
        )]));
        assert!(!disabled.allow_web_font);
    }
}
