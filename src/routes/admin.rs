// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin-only routes.

use super::settings::SubscriptionSummary;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_USER_LIMIT: u32 = 100;
const MAX_USER_LIMIT: u32 = 500;
/// Concurrent subscription lookups.
const STRIPE_CONCURRENCY: usize = 8;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/admin/users", get(list_users))
}

#[derive(Debug, Deserialize)]
pub struct UserListParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AdminUserRow {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub org: Option<String>,
    pub admin: bool,
    pub created_at: Option<String>,
    pub subscription: Option<SubscriptionSummary>,
}

async fn require_admin(state: &AppState, uid: &str) -> Result<()> {
    match state.db.get_user(uid).await? {
        Some(user) if user.admin => Ok(()),
        _ => {
            tracing::warn!(uid, "Non-admin attempted admin access");
            Err(AppError::Forbidden("admin access required".to_string()))
        }
    }
}

async fn row_for(state: &AppState, user: User) -> Result<AdminUserRow> {
    let subscription = match user.stripe_customer_id.as_deref() {
        Some(customer_id) if !customer_id.is_empty() => state
            .db
            .get_stripe_data(customer_id)
            .await?
            .map(SubscriptionSummary::from),
        _ => None,
    };

    Ok(AdminUserRow {
        uid: user.id.unwrap_or_default(),
        email: user.email,
        display_name: user.display_name,
        org: user.org,
        admin: user.admin,
        created_at: user.created_at,
        subscription,
    })
}

/// Every user with their subscription state.
async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<UserListParams>,
) -> Result<Json<Vec<AdminUserRow>>> {
    require_admin(&state, &user.uid).await?;

    let limit = params
        .limit
        .unwrap_or(DEFAULT_USER_LIMIT)
        .clamp(1, MAX_USER_LIMIT);
    let users = state.db.list_users(limit).await?;

    let mut rows: Vec<(usize, AdminUserRow)> = stream::iter(users.into_iter().enumerate())
        .map(|(i, u)| {
            let state = &state;
            async move { row_for(state, u).await.map(|row| (i, row)) }
        })
        .buffer_unordered(STRIPE_CONCURRENCY)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<_>>()?;

    rows.sort_by_key(|(i, _)| *i);
    Ok(Json(rows.into_iter().map(|(_, row)| row).collect()))
}
