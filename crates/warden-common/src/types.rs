//! Core types shared across Warden components.

use std::fmt;

/// Short reason token attached to every response and log line.
///
/// The string forms are a fixed vocabulary that operators grep for,
/// so they must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    EmptyAuthentication,
    ExpiredAuthentication,
    InvalidAuthenticationDomain,
    InvalidUserAgent,
    UnknownAuthentication,
    ValidAuthentication,
    ExpiredChallenge,
    InvalidChallenge,
    InvalidResponse,
    UnknownChallenge,
    ValidChallenge,
    EntropyFailure,
    HtmlRenderFailure,
    HttpResponseFailure,
    OnlyGetMethod,
    OnlyPostMethod,
    OnlyGetOrPostMethod,
    AllowOptionsMethod,
    AllowWebFont,
    ExpiredRecord,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyAuthentication => "empty authentication",
            Self::ExpiredAuthentication => "authentication expired",
            Self::InvalidAuthenticationDomain => "invalid authentication domain",
            Self::InvalidUserAgent => "invalid authentication user-agent",
            Self::UnknownAuthentication => "unknown authentication",
            Self::ValidAuthentication => "valid authentication",
            Self::ExpiredChallenge => "expired challenge",
            Self::InvalidChallenge => "invalid challenge",
            Self::InvalidResponse => "invalid response",
            Self::UnknownChallenge => "unknown challenge",
            Self::ValidChallenge => "valid challenge",
            Self::EntropyFailure => "entropy failure",
            Self::HtmlRenderFailure => "HTML render failure",
            Self::HttpResponseFailure => "HTTP response failure",
            Self::OnlyGetMethod => "only GET method",
            Self::OnlyPostMethod => "only POST method",
            Self::OnlyGetOrPostMethod => "only GET or POST method",
            Self::AllowOptionsMethod => "allow OPTIONS method",
            Self::AllowWebFont => "allow web font",
            Self::ExpiredRecord => "expired record",
        }
    }

    /// Failed challenge answers are also reported on the `bot` log target
    pub fn is_bot_signal(&self) -> bool {
        matches!(
            self,
            Self::UnknownChallenge
                | Self::InvalidChallenge
                | Self::ExpiredChallenge
                | Self::InvalidResponse
        )
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request scheme as reported by the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    /// Case-insensitive parse of the `X-Scheme` header value
    pub fn from_header(value: &str) -> Self {
        if value.eq_ignore_ascii_case("https") {
            Self::Https
        } else {
            Self::Http
        }
    }

    pub fn is_https(&self) -> bool {
        matches!(self, Self::Https)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_vocabulary() {
        assert_eq!(Reason::EmptyAuthentication.to_string(), "empty authentication");
        assert_eq!(
            Reason::InvalidUserAgent.as_str(),
            "invalid authentication user-agent"
        );
        assert_eq!(Reason::OnlyGetOrPostMethod.as_str(), "only GET or POST method");
    }

    #[test]
    fn test_bot_signals() {
        assert!(Reason::InvalidResponse.is_bot_signal());
        assert!(!Reason::ValidAuthentication.is_bot_signal());
        assert!(!Reason::EntropyFailure.is_bot_signal());
    }

    #[test]
    fn test_scheme_from_header() {
        assert_eq!(Scheme::from_header("HTTPS"), Scheme::Https);
        assert_eq!(Scheme::from_header("https"), Scheme::Https);
        assert_eq!(Scheme::from_header("http"), Scheme::Http);
        assert_eq!(Scheme::from_header(""), Scheme::Http);
        assert!(!Scheme::default().is_https());
    }
}
