// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! `/api/jtfetch`: forward a caller-built Pave query to JobTread.
//!
//! The caller supplies its own grant key in `query.$.grantKey`; the
//! upstream JSON is returned unchanged.

use crate::error::{AppError, Result};
use crate::services::pave::grant_key_of;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/jtfetch", post(jtfetch))
}

#[derive(Debug, Deserialize)]
struct GatewayRequest {
    #[serde(default)]
    query: Value,
}

async fn jtfetch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GatewayRequest>,
) -> Result<Json<Value>> {
    if !request.query.is_object() {
        return Err(AppError::BadRequest("query must be an object".to_string()));
    }
    if grant_key_of(&request.query).is_none() {
        return Err(AppError::MissingCredentials(
            AppError::MISSING_CREDENTIALS.to_string(),
        ));
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        let roots: Vec<&str> = request
            .query
            .as_object()
            .map(|q| q.keys().map(String::as_str).filter(|k| *k != "$").collect())
            .unwrap_or_default();
        tracing::debug!(roots = ?roots, "Forwarding Pave query");
    }

    let response = state.pave.query(&request.query).await?;
    Ok(Json(response))
}
