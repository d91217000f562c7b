//! Cookie check called by the reverse proxy on every protected request.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;

use warden_common::Reason;
use warden_common::crypto::is_uuid_v4;

use super::context::{RequestContext, request_log};
use super::error::GateError;
use crate::state::AppState;
use crate::store::Record;

/// `/auth`, any method
pub async fn auth(State(state): State<AppState>, ctx: RequestContext, jar: CookieJar) -> Response {
    if ctx.allow_web_font {
        request_log!(debug, ctx, StatusCode::OK, "{}", Reason::AllowWebFont);
        return StatusCode::OK.into_response();
    }

    let Some(cookie) = jar.get(&state.config.names.cookie) else {
        let err = GateError::Unauthorized(Reason::EmptyAuthentication);
        request_log!(debug, ctx, err.status(), "{}", err.reason());
        return err.into_response();
    };
    let id = cookie.value();

    match check(&state, &ctx, id) {
        Ok(()) => {
            request_log!(debug, ctx, StatusCode::OK, authentication = id, "{}", Reason::ValidAuthentication);
            StatusCode::OK.into_response()
        }
        // Cookie replayed from another host or browser
        Err(err @ GateError::Unauthorized(
            Reason::InvalidAuthenticationDomain | Reason::InvalidUserAgent,
        )) => {
            request_log!(info, ctx, err.status(), authentication = id, "{}", err.reason());
            err.into_response()
        }
        Err(err) => {
            request_log!(debug, ctx, err.status(), authentication = id, "{}", err.reason());
            err.into_response()
        }
    }
}

fn check(state: &AppState, ctx: &RequestContext, id: &str) -> Result<(), GateError> {
    if !is_uuid_v4(id) {
        return Err(GateError::Unauthorized(Reason::UnknownAuthentication));
    }

    let record = match state.records.load(id) {
        Some(Record::Authentication(record)) => record,
        Some(Record::Challenge(_)) | None => {
            return Err(GateError::Unauthorized(Reason::UnknownAuthentication));
        }
    };

    if !record.domain.eq_ignore_ascii_case(&ctx.domain) {
        // Wildcard scope was toggled; the old binding must not come back
        if same_site_scope(&record.domain, &ctx.domain) {
            state.records.delete(id);
        }
        return Err(GateError::Unauthorized(Reason::InvalidAuthenticationDomain));
    }

    if !record.user_agent.eq_ignore_ascii_case(&ctx.user_agent) {
        return Err(GateError::Unauthorized(Reason::InvalidUserAgent));
    }

    if record.expires <= Utc::now() {
        return Err(GateError::Unauthorized(Reason::ExpiredAuthentication));
    }

    Ok(())
}

/// True when two cookie domains differ only by a leading dot
fn same_site_scope(a: &str, b: &str) -> bool {
    a.trim_start_matches('.')
        .eq_ignore_ascii_case(b.trim_start_matches('.'))
}
