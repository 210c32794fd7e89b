// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Plumbing shared by the JobTread webhook routes.
//!
//! Each automation accepts either a JobTread webhook envelope
//! (`createdEvent.{id, organization.id, data.next}`) or a manual "single run"
//! body from the dashboard, and answers `{ success, debug }` or
//! `{ error, debug }`.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::AutomationLog;
use crate::services::idempotency::{self, Claim};
use crate::AppState;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use subtle::ConstantTimeEq;

/// Error answer for a webhook run, carrying what was known when it failed.
#[derive(Debug)]
pub struct WebhookFailure {
    pub error: AppError,
    pub debug: Value,
}

impl WebhookFailure {
    pub fn new(error: AppError, debug: Value) -> Self {
        Self { error, debug }
    }

    pub fn bad_request(message: &str, debug: Value) -> Self {
        Self::new(AppError::BadRequest(message.to_string()), debug)
    }

    fn status(&self) -> StatusCode {
        match &self.error {
            AppError::BadRequest(_) | AppError::Validation(_) | AppError::MissingCredentials(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match &self.error {
            AppError::BadRequest(msg) | AppError::MissingCredentials(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for WebhookFailure {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.error, debug = %self.debug, "Webhook run failed");
        } else {
            tracing::warn!(error = %self.error, "Webhook request rejected");
        }
        (status, Json(json!({ "error": self.message(), "debug": self.debug }))).into_response()
    }
}

impl From<AppError> for WebhookFailure {
    fn from(error: AppError) -> Self {
        Self::new(error, Value::Null)
    }
}

/// Attach debug context to a failing step.
pub trait WithDebug<T> {
    fn debug(self, debug: &Value) -> Result<T, WebhookFailure>;
}

impl<T, E: Into<AppError>> WithDebug<T> for Result<T, E> {
    fn debug(self, debug: &Value) -> Result<T, WebhookFailure> {
        self.map_err(|e| WebhookFailure::new(e.into(), debug.clone()))
    }
}

/// Optional `?secret=` on webhook URLs.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookAuth {
    #[serde(default)]
    pub secret: Option<String>,
}

/// Enforce the shared webhook secret when one is configured.
pub fn check_secret(state: &AppState, auth: &WebhookAuth) -> Result<(), WebhookFailure> {
    let Some(expected) = state.config.webhook_secret.as_deref() else {
        return Ok(());
    };

    let provided = auth.secret.as_deref().unwrap_or("");
    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        tracing::warn!("Security Alert: webhook secret mismatch");
        Err(WebhookFailure::new(
            AppError::Forbidden("invalid webhook secret".to_string()),
            Value::Null,
        ))
    }
}

/// Parse a webhook body, answering malformed JSON in the webhook error shape.
pub fn parse_body(raw: &[u8]) -> Result<Value, WebhookFailure> {
    serde_json::from_slice(raw).map_err(|e| {
        WebhookFailure::bad_request("Invalid JSON body", json!({ "parseError": e.to_string() }))
    })
}

/// Trimmed, non-empty string at a JSON pointer.
pub fn str_at<'a>(body: &'a Value, pointer: &str) -> Option<&'a str> {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Whether a body is a manual run (it carries its own grant key).
pub fn is_manual(body: &Value) -> bool {
    body.get("grantKey").is_some()
}

/// Fields common to every JobTread webhook envelope.
#[derive(Debug, Clone)]
pub struct WebhookEvent<'a> {
    pub event_id: Option<&'a str>,
    pub jobtread_org_id: &'a str,
    pub entity_id: &'a str,
    /// `createdEvent.data.next`
    pub next: &'a Value,
}

/// Parse the common envelope; `None` if any required piece is missing.
pub fn parse_event(body: &Value) -> Option<WebhookEvent<'_>> {
    Some(WebhookEvent {
        event_id: str_at(body, "/createdEvent/id"),
        jobtread_org_id: str_at(body, "/createdEvent/organization/id")?,
        entity_id: str_at(body, "/createdEvent/data/next/id")?,
        next: body.pointer("/createdEvent/data/next")?,
    })
}

/// Replay guard state for one run.
#[derive(Debug)]
pub enum Delivery {
    /// Manual runs are never deduplicated.
    Manual,
    /// First delivery of an event; released if the run fails.
    Claimed(String),
    /// Webhook without an event ID to key on.
    Unkeyed,
    Replay,
}

impl Delivery {
    pub async fn claim(
        db: &FirestoreDb,
        route: &str,
        event_id: Option<&str>,
        entity_id: &str,
    ) -> Result<Self, AppError> {
        let Some(event_id) = event_id else {
            tracing::debug!(route, entity_id, "Webhook has no event ID; not deduplicated");
            return Ok(Delivery::Unkeyed);
        };
        Ok(match idempotency::claim(db, route, event_id, entity_id).await? {
            Claim::Fresh(key) => Delivery::Claimed(key),
            Claim::Duplicate => Delivery::Replay,
        })
    }

    pub async fn release(&self, db: &FirestoreDb) {
        if let Delivery::Claimed(key) = self {
            idempotency::release(db, key).await;
        }
    }
}

/// Answer for a suppressed replay.
pub fn duplicate_response() -> Response {
    Json(json!({ "success": true, "duplicate": true })).into_response()
}

/// Answer for a run that did nothing by design.
pub fn skipped_response(reason: &str, debug: Value) -> Response {
    Json(json!({ "success": true, "skipped": reason, "debug": debug })).into_response()
}

/// Append an automation log; failures are logged, not surfaced.
pub async fn record_log(db: &FirestoreDb, collection: &str, log: &AutomationLog) {
    if let Err(e) = db.add_log(collection, log).await {
        tracing::error!(collection, error = %e, "Failed to write automation log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_webhook_envelope() {
        let body = json!({
            "createdEvent": {
                "id": "evt1",
                "organization": {"id": "jt1"},
                "data": {"next": {"id": "loc1", "formattedAddress": "1 Main St"}}
            }
        });
        let event = parse_event(&body).unwrap();
        assert_eq!(event.event_id, Some("evt1"));
        assert_eq!(event.jobtread_org_id, "jt1");
        assert_eq!(event.entity_id, "loc1");
        assert_eq!(event.next["formattedAddress"], "1 Main St");
        assert!(!is_manual(&body));
    }

    #[test]
    fn malformed_body_is_bad_request() {
        let failure = parse_body(b"{\"grantKey\": ").unwrap_err();
        assert_eq!(failure.status(), StatusCode::BAD_REQUEST);
        assert_eq!(failure.message(), "Invalid JSON body");
        assert!(failure.debug["parseError"].is_string());

        assert!(parse_body(b"").is_err());
        assert_eq!(parse_body(br#"{"a": 1}"#).unwrap()["a"], 1);
    }

    #[test]
    fn envelope_requires_org_and_entity() {
        assert!(parse_event(&json!({"createdEvent": {"data": {"next": {"id": "x"}}}})).is_none());
        assert!(parse_event(&json!({"createdEvent": {"organization": {"id": " "}}})).is_none());
        assert!(parse_event(&json!({})).is_none());
    }

    #[test]
    fn failure_statuses() {
        assert_eq!(
            WebhookFailure::bad_request("Missing required fields", Value::Null).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookFailure::from(AppError::upstream_transport("bridge", "timeout")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            WebhookFailure::from(AppError::NotFound("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
