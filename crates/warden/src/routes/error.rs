//! Handler error taxonomy and its HTTP mapping.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};

use warden_common::Reason;

/// Every way a gate request can end short of success
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// 405 with an `Allow` header
    MethodNotAllowed { allow: &'static str, reason: Reason },
    /// Failed challenge answer: `303 See Other` back to the challenge page
    SoftFailure(Reason),
    /// Missing or rejected authentication cookie
    Unauthorized(Reason),
    Internal(Reason),
}

impl GateError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::SoftFailure(_) => StatusCode::SEE_OTHER,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn reason(&self) -> Reason {
        match self {
            Self::MethodNotAllowed { reason, .. }
            | Self::SoftFailure(reason)
            | Self::Unauthorized(reason)
            | Self::Internal(reason) => *reason,
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = format!("{}\n", self.reason());
        match self {
            Self::MethodNotAllowed { allow, .. } => {
                (status, [(header::ALLOW, allow)], body).into_response()
            }
            Self::SoftFailure(_) => Redirect::to("/").into_response(),
            Self::Unauthorized(_) | Self::Internal(_) => (status, body).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let redirect = GateError::SoftFailure(Reason::InvalidResponse).into_response();
        assert_eq!(redirect.status(), StatusCode::SEE_OTHER);
        assert_eq!(redirect.headers()[header::LOCATION], "/");

        let denied = GateError::Unauthorized(Reason::EmptyAuthentication).into_response();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let method = GateError::MethodNotAllowed {
            allow: "GET, POST",
            reason: Reason::OnlyGetOrPostMethod,
        }
        .into_response();
        assert_eq!(method.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(method.headers()[header::ALLOW], "GET, POST");

        assert_eq!(
            GateError::Internal(Reason::EntropyFailure).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
