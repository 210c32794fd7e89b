// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account, organization settings and automation log routes.

use crate::db::collections;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{AutomationLog, NotificationPreferences, Organization, StripeData, User};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

const DEFAULT_LOG_LIMIT: u32 = 25;
const MAX_LOG_LIMIT: u32 = 100;

/// Settings routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/settings/profile", put(update_profile))
        .route("/api/settings/org", put(update_org))
        .route("/api/logs/coverphoto", get(cover_photo_logs))
        .route("/api/logs/aiabilling", get(aia_billing_logs))
}

/// Show only the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

async fn load_user(state: &AppState, uid: &str) -> Result<User> {
    state
        .db
        .get_user(uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))
}

fn linked_org(user: &User) -> Result<&str> {
    user.org
        .as_deref()
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .ok_or_else(|| AppError::BadRequest("User is not linked to an organization".to_string()))
}

// ─── Current User ────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SubscriptionSummary {
    pub status: Option<String>,
    pub tier: Option<String>,
    pub current_period_end: Option<String>,
    pub active: bool,
}

impl From<StripeData> for SubscriptionSummary {
    fn from(data: StripeData) -> Self {
        let active = data.is_active();
        Self {
            status: data.status,
            tier: data.tier,
            current_period_end: data.current_period_end,
            active,
        }
    }
}

/// Organization settings as shown to members. The grant key is masked.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OrgSettings {
    pub id: String,
    pub name: Option<String>,
    pub grant_key: Option<String>,
    #[serde(rename = "orgID")]
    pub jobtread_org_id: Option<String>,
    pub credentials_configured: bool,
    pub lead_source_field: Option<String>,
    pub sales_rep_field: Option<String>,
    pub marketing_budget: Option<f64>,
    pub zestimate_field: Option<String>,
    pub zestimate_url_field: Option<String>,
    pub cover_photo_enabled: bool,
    pub aia_retainage_percent: f64,
}

impl OrgSettings {
    fn new(id: &str, org: Organization) -> Self {
        Self {
            id: id.to_string(),
            credentials_configured: org.grant_key().is_some() && org.jobtread_org_id().is_some(),
            grant_key: org.grant_key().map(mask_secret),
            jobtread_org_id: org.jobtread_org_id().map(String::from),
            aia_retainage_percent: org.retainage_percent(),
            name: org.name,
            lead_source_field: org.lead_source_field,
            sales_rep_field: org.sales_rep_field,
            marketing_budget: org.marketing_budget,
            zestimate_field: org.zestimate_field,
            zestimate_url_field: org.zestimate_url_field,
            cover_photo_enabled: org.cover_photo_enabled,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeResponse {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub admin: bool,
    pub notifications: NotificationPreferences,
    pub organization: Option<OrgSettings>,
    pub subscription: Option<SubscriptionSummary>,
}

/// Get the signed-in user's profile, organization, and subscription.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let profile = load_user(&state, &user.uid).await?;

    let organization = match linked_org(&profile) {
        Ok(org_id) => state
            .db
            .get_org(org_id)
            .await?
            .map(|org| OrgSettings::new(org_id, org)),
        Err(_) => None,
    };

    let subscription = match profile.stripe_customer_id.as_deref() {
        Some(customer_id) if !customer_id.is_empty() => state
            .db
            .get_stripe_data(customer_id)
            .await?
            .map(SubscriptionSummary::from),
        _ => None,
    };

    Ok(Json(MeResponse {
        uid: user.uid,
        email: profile.email.or(user.email),
        display_name: profile.display_name,
        admin: profile.admin,
        notifications: profile.notifications,
        organization,
        subscription,
    }))
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 100, message = "display name must be 1-100 characters"))]
    pub display_name: Option<String>,
    pub notifications: Option<NotificationPreferences>,
}

/// Update display name and notification preferences.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<MeResponse>> {
    update.validate()?;

    let mut profile = state.db.get_user(&user.uid).await?.unwrap_or_else(|| User {
        email: user.email.clone(),
        created_at: Some(now_rfc3339()),
        ..Default::default()
    });

    if let Some(name) = update.display_name {
        profile.display_name = Some(name.trim().to_string());
    }
    if let Some(notifications) = update.notifications {
        profile.notifications = notifications;
    }

    state.db.upsert_user(&user.uid, &profile).await?;
    tracing::info!(uid = %user.uid, "Updated profile");

    get_me(State(state), Extension(user)).await
}

// ─── Organization ────────────────────────────────────────────

fn validate_retainage(value: f64) -> std::result::Result<(), validator::ValidationError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("range");
        err.message = Some("retainage must be between 0 and 100".into());
        Err(err)
    }
}

fn validate_budget(value: f64) -> std::result::Result<(), validator::ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("range");
        err.message = Some("marketing budget must not be negative".into());
        Err(err)
    }
}

/// Partial organization update; absent fields are left alone, empty
/// strings clear a field.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrgUpdate {
    #[validate(length(max = 200))]
    pub name: Option<String>,
    pub grant_key: Option<String>,
    #[serde(rename = "orgID")]
    pub jobtread_org_id: Option<String>,
    pub lead_source_field: Option<String>,
    pub sales_rep_field: Option<String>,
    #[validate(custom(function = "validate_budget"))]
    pub marketing_budget: Option<f64>,
    pub zestimate_field: Option<String>,
    /// Sent as `zestimateUrlField` by the settings page.
    #[serde(alias = "zillowUrlField")]
    pub zestimate_url_field: Option<String>,
    pub cover_photo_enabled: Option<bool>,
    #[validate(custom(function = "validate_retainage"))]
    pub aia_retainage_percent: Option<f64>,
}

fn apply(target: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        let value = value.trim().to_string();
        *target = (!value.is_empty()).then_some(value);
    }
}

impl OrgUpdate {
    fn apply_to(self, org: &mut Organization) {
        apply(&mut org.name, self.name);
        apply(&mut org.grant_key, self.grant_key);
        apply(&mut org.jobtread_org_id, self.jobtread_org_id);
        apply(&mut org.lead_source_field, self.lead_source_field);
        apply(&mut org.sales_rep_field, self.sales_rep_field);
        apply(&mut org.zestimate_field, self.zestimate_field);
        apply(&mut org.zestimate_url_field, self.zestimate_url_field);
        if let Some(budget) = self.marketing_budget {
            org.marketing_budget = Some(budget);
        }
        if let Some(enabled) = self.cover_photo_enabled {
            org.cover_photo_enabled = enabled;
        }
        if let Some(percent) = self.aia_retainage_percent {
            org.aia_retainage_percent = Some(percent);
        }
    }
}

/// Update the signed-in user's organization settings.
async fn update_org(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(update): Json<OrgUpdate>,
) -> Result<Json<OrgSettings>> {
    update.validate()?;

    let profile = load_user(&state, &user.uid).await?;
    let org_id = linked_org(&profile)?;

    let mut org = state.db.get_org(org_id).await?.unwrap_or_default();
    update.apply_to(&mut org);
    state.db.upsert_org(org_id, &org).await?;

    tracing::info!(uid = %user.uid, org_id, "Updated organization settings");
    Ok(Json(OrgSettings::new(org_id, org)))
}

// ─── Automation Logs ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LogParams {
    pub limit: Option<u32>,
}

async fn list_logs(
    state: &AppState,
    uid: &str,
    collection: &str,
    params: &LogParams,
) -> Result<Json<Vec<AutomationLog>>> {
    let profile = load_user(state, uid).await?;
    let org_id = linked_org(&profile)?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LOG_LIMIT)
        .clamp(1, MAX_LOG_LIMIT);

    Ok(Json(state.db.list_logs(collection, org_id, limit).await?))
}

async fn cover_photo_logs(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<LogParams>,
) -> Result<Json<Vec<AutomationLog>>> {
    list_logs(&state, &user.uid, collections::COVER_PHOTO_LOGS, &params).await
}

async fn aia_billing_logs(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<LogParams>,
) -> Result<Json<Vec<AutomationLog>>> {
    list_logs(&state, &user.uid, collections::AIA_BILLING_LOGS, &params).await
}
