// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use super::ExtraFields;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User profile stored in Firestore at `users/{uid}`.
///
/// Field names match what the web app writes (camelCase).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Firebase uid (document ID; not stored in the document body)
    #[serde(alias = "_firestore_id", skip_serializing)]
    pub id: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Organization document ID (`orgs/{org}`)
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub notifications: NotificationPreferences,
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    /// Grants access to the admin screens
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Fields written by the web app that this service does not read.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Notification toggles on the settings screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NotificationPreferences {
    #[serde(default)]
    pub email: bool,
    #[serde(default)]
    pub weekly_report: bool,
}
