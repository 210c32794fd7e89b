// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase session authentication middleware.

use crate::error::AppError;
use crate::services::firebase_auth::{extract_bearer_token, TokenError};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Cookie carrying the Firebase ID token (the only cookie Firebase Hosting forwards).
pub const SESSION_COOKIE: &str = "__session";

/// Authenticated user extracted from a Firebase ID token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
}

/// Middleware that requires a valid Firebase ID token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try cookie first, then header
    let token = match jar.get(SESSION_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
        _ => request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(extract_bearer_token)
            .map(String::from)
            .ok_or(AppError::Unauthorized)?,
    };

    let user = state
        .auth
        .verify_id_token(&token)
        .await
        .map_err(|e| match e {
            TokenError::Rejected(reason) => {
                tracing::debug!(reason = %reason, "Rejected session token");
                AppError::InvalidToken
            }
            TokenError::Transient(reason) => AppError::upstream_transport("firebase_auth", reason),
        })?;

    request.extensions_mut().insert(AuthUser {
        uid: user.uid,
        email: user.email,
    });

    Ok(next.run(request).await)
}
