// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Replay suppression for webhook deliveries.
//!
//! JobTread retries deliveries, so each `(route, event, entity)` triple is
//! claimed once in `webhookEvents` before any side effect runs. A failed
//! run releases its claim so the retry can proceed.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::WebhookEventClaim;
use crate::time_utils::now_rfc3339;
use sha2::{Digest, Sha256};

/// Outcome of claiming a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// First delivery; holds the document key to release on failure.
    Fresh(String),
    /// Already processed (or in flight).
    Duplicate,
}

/// Document key for a delivery: hex SHA-256 of `route:event:entity`.
pub fn idempotency_key(route: &str, event_id: &str, entity_id: &str) -> String {
    let digest = Sha256::digest(format!("{route}:{event_id}:{entity_id}").as_bytes());
    hex::encode(digest)
}

pub async fn claim(
    db: &FirestoreDb,
    route: &str,
    event_id: &str,
    entity_id: &str,
) -> Result<Claim, AppError> {
    let key = idempotency_key(route, event_id, entity_id);
    let record = WebhookEventClaim {
        route: route.to_string(),
        event_id: event_id.to_string(),
        entity_id: entity_id.to_string(),
        created_at: now_rfc3339(),
    };

    if db.claim_webhook_event(&key, &record).await? {
        Ok(Claim::Fresh(key))
    } else {
        tracing::info!(route, event_id, entity_id, "Duplicate webhook delivery");
        Ok(Claim::Duplicate)
    }
}

/// Release a claim after a failed run. Errors are logged, not returned.
pub async fn release(db: &FirestoreDb, key: &str) {
    if let Err(e) = db.release_webhook_event(key).await {
        tracing::warn!(key, error = %e, "Failed to release webhook claim");
    }
}
