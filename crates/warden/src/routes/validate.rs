//! Answer check: trade a solved challenge for an authentication cookie.

use axum::{
    extract::{Form, State, rejection::FormRejection},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use std::collections::HashMap;

use warden_common::constants::headers::CLEAR_SITE_DATA;
use warden_common::crypto::hash;
use warden_common::Reason;

use super::context::{RequestContext, request_log};
use super::cookies::{append_cookie, auth_cookie};
use super::error::GateError;
use crate::state::AppState;
use crate::store::{Record, RecordData};

/// `POST /`
pub async fn validate(
    State(state): State<AppState>,
    ctx: RequestContext,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Response {
    // An unreadable body is treated as an empty form
    let form = form.map(|Form(fields)| fields).unwrap_or_default();
    let names = &state.config.names;

    let challenge = form
        .get(&names.challenge_key)
        .map(String::as_str)
        .unwrap_or("");
    let response = form
        .get(&names.response_key)
        .map(|value| value.to_uppercase())
        .unwrap_or_default();

    request_log!(debug, ctx, StatusCode::OK, challenge, response = %response, "answer received");

    let mut reply = match redeem(&state, &ctx, challenge, &response) {
        Ok(reply) => reply,
        Err(err) => {
            let reason = err.reason();
            if reason.is_bot_signal() {
                request_log!(info, ctx, err.status(), challenge, "{}", reason);
                request_log!(bot, ctx, err.status(), challenge, "{}", reason);
            } else {
                request_log!(error, ctx, err.status(), challenge, "{}", reason);
            }
            err.into_response()
        }
    };

    reply
        .headers_mut()
        .insert(CLEAR_SITE_DATA, HeaderValue::from_static("\"cache\""));
    reply
}

fn redeem(
    state: &AppState,
    ctx: &RequestContext,
    challenge: &str,
    response: &str,
) -> Result<Response, GateError> {
    let record = match state.records.load(challenge) {
        None => return Err(GateError::SoftFailure(Reason::UnknownChallenge)),
        Some(Record::Authentication(_)) => {
            return Err(GateError::Internal(Reason::UnknownChallenge));
        }
        Some(Record::Challenge(record)) => record,
    };

    let now = Utc::now();
    if !record.domain.eq_ignore_ascii_case(&ctx.domain) {
        return Err(GateError::SoftFailure(Reason::InvalidChallenge));
    }
    if record.is_expired_at(now) {
        return Err(GateError::SoftFailure(Reason::ExpiredChallenge));
    }
    if hash(&[response]) != challenge {
        return Err(GateError::SoftFailure(Reason::InvalidResponse));
    }

    let id = (state.tokens)().map_err(|e| {
        tracing::error!(error = %e, "Token generation failed");
        GateError::Internal(Reason::EntropyFailure)
    })?;

    // A concurrent submission may have consumed the challenge since the lookup
    if state.records.take_challenge(challenge).is_none() {
        return Err(GateError::SoftFailure(Reason::UnknownChallenge));
    }

    let expires = state.config.auth_expiry(now);
    let cookie = auth_cookie(
        &state.config.names.cookie,
        &id,
        &ctx.domain,
        ctx.scheme,
        expires,
        state.config.auth_ttl_secs,
    )?;

    state.records.store(
        id.as_str(),
        Record::Authentication(RecordData {
            domain: ctx.domain.clone(),
            user_agent: ctx.user_agent.clone(),
            client_addr: ctx.client_addr.clone(),
            expires,
        }),
    );

    request_log!(
        info,
        ctx,
        StatusCode::SEE_OTHER,
        challenge,
        authentication = %id,
        "{}",
        Reason::ValidChallenge
    );

    let mut reply = Redirect::to("/").into_response();
    append_cookie(reply.headers_mut(), &cookie)?;
    Ok(reply)
}
