//! HTTP route handlers for Warden.

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get},
};
use tower_http::trace::TraceLayer;

use warden_common::Reason;

use crate::state::AppState;
use context::{RequestContext, request_log};
use error::GateError;

mod auth;
mod challenge;
mod context;
mod cookies;
mod error;
mod favicon;
mod validate;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Challenge page and answer submission
        .route(
            "/",
            get(challenge::challenge)
                .post(validate::validate)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        // Subrequest target for nginx auth_request
        .route("/auth", any(auth::auth))
        .route("/favicon.ico", get(favicon::favicon))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS preflight, accepted only when the proxy opts in
async fn preflight(ctx: RequestContext) -> Response {
    if ctx.allow_options {
        request_log!(debug, ctx, StatusCode::ACCEPTED, "{}", Reason::AllowOptionsMethod);
        return StatusCode::ACCEPTED.into_response();
    }
    method_not_allowed(ctx).await
}

async fn method_not_allowed(ctx: RequestContext) -> Response {
    let allow = if ctx.allow_options {
        "GET, POST, OPTIONS"
    } else {
        "GET, POST"
    };
    let err = GateError::MethodNotAllowed {
        allow,
        reason: Reason::OnlyGetOrPostMethod,
    };
    request_log!(debug, ctx, err.status(), "{}", err.reason());
    err.into_response()
}
