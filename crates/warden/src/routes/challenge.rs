//! Challenge page: hand out a pooled CAPTCHA and remember its hash.

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;

use warden_common::Reason;
use warden_common::constants::headers::CLEAR_SITE_DATA;

use super::context::{RequestContext, request_log};
use super::cookies::{append_cookie, clearing_cookies};
use super::error::GateError;
use crate::render::PageData;
use crate::state::AppState;
use crate::store::{Record, RecordData};

/// `GET /`
pub async fn challenge(State(state): State<AppState>, ctx: RequestContext) -> Response {
    match issue_challenge(&state, &ctx) {
        Ok(response) => response,
        Err(err) => {
            request_log!(error, ctx, err.status(), "{}", err.reason());
            err.into_response()
        }
    }
}

fn issue_challenge(state: &AppState, ctx: &RequestContext) -> Result<Response, GateError> {
    let names = &state.config.names;
    let (challenge, image) = state.pool.sample_random();

    let expires = state.config.challenge_expiry(Utc::now());
    state.records.store(
        challenge,
        Record::Challenge(RecordData {
            domain: ctx.domain.clone(),
            user_agent: ctx.user_agent.clone(),
            client_addr: ctx.client_addr.clone(),
            expires,
        }),
    );

    request_log!(
        info,
        ctx,
        StatusCode::OK,
        challenge,
        ttl = state.config.challenge_ttl_secs,
        "challenge issued"
    );

    let page = state
        .pages
        .render(
            ctx.lite_template,
            &PageData {
                base64: image,
                text_hash: challenge,
                challenge_key: &names.challenge_key,
                response_key: &names.response_key,
                image_id: &names.image_id,
            },
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Template render failed");
            GateError::Internal(Reason::HtmlRenderFailure)
        })?;

    let mut response = Html(page).into_response();
    let headers = response.headers_mut();
    for cookie in clearing_cookies(&names.cookie, &ctx.domain) {
        append_cookie(headers, &cookie)?;
    }
    headers.insert(CLEAR_SITE_DATA, HeaderValue::from_static("\"cache\""));

    Ok(response)
}
