//! Authentication boundary.
//!
//! Credential verification is owned by an external collaborator; by the time
//! a request reaches this middleware the session cookie (or bearer token)
//! carries an already-verified user identity. This middleware only extracts
//! that identity into the [`RequestContext`] and rejects requests without
//! one — it gates every core entry point but performs no credential checks
//! of its own.

use axum::{
    body::Body,
    extract::Request,
    http::{self, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cookie::Cookie;
use shared::config::server::Config;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::middleware::request_context::RequestContext;

pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Result<Response, Response> {
    let cookie_name = req
        .extensions()
        .get::<Arc<Config>>()
        .map_or_else(|| "quickchat_session".to_string(), |config| {
            config.session.cookie_name.clone()
        });

    let identity = extract_session_cookie(req.headers(), &cookie_name)
        .or_else(|| extract_bearer_token(req.headers()));

    let user_id = identity
        .as_deref()
        .and_then(|token| Uuid::parse_str(token).ok())
        .ok_or_else(|| {
            ApiError::unauthorized("missing or invalid session identity").into_response()
        })?;

    if let Some(context) = req.extensions_mut().get_mut::<RequestContext>() {
        context.user_id = Some(user_id);
    } else {
        req.extensions_mut().insert(RequestContext {
            request_id: String::new(),
            user_id: Some(user_id),
        });
    }

    debug!(%user_id, path = %req.uri().path(), "authenticated request");
    Ok(next.run(req).await)
}

fn extract_session_cookie(headers: &http::HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(header::COOKIE)?.to_str().ok()?;
    Cookie::split_parse(value)
        .flatten()
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

fn extract_bearer_token(headers: &http::HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}
