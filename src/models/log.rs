// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Append-only audit records for toolbox automations.

use serde::{Deserialize, Serialize};

/// Outcome of one automation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Error,
}

/// One run of the cover photo or AIA billing automation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationLog {
    #[serde(alias = "_firestore_id", skip_serializing)]
    pub id: Option<String>,
    /// Firestore organization document ID
    pub org_id: String,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub status: LogStatus,
    #[serde(default)]
    pub message: Option<String>,
    /// RFC 3339 timestamp
    pub created_at: String,
}

/// Marker written once per webhook delivery to suppress replays.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEventClaim {
    pub route: String,
    pub event_id: String,
    pub entity_id: String,
    pub created_at: String,
}
