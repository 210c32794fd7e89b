// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users and organizations (credentials + dashboard preferences)
//! - Stripe subscription mirror (read-only)
//! - Automation logs (cover photo, AIA billing)
//! - Webhook replay guard

use crate::db::collections;
use crate::db::memory::MemoryStore;
use crate::error::AppError;
use crate::models::{
    AutomationLog, ExtraFields, Organization, StripeData, User, WebhookEventClaim,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryStore>),
    Offline,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create an in-memory database (tests and local demos).
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Offline,
        }
    }

    fn offline() -> AppError {
        AppError::Database("Database not connected (offline mode)".to_string())
    }

    // ─── Generic Document Operations ─────────────────────────────

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collection)
                .obj()
                .one(id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => store
                .get(collection, id)
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Write a document. Firestore updates only the `fields` named and leaves
    /// the rest of the stored document alone.
    async fn set_doc<T>(
        &self,
        collection: &str,
        id: &str,
        doc: &T,
        fields: Vec<String>,
    ) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .fields(fields)
                    .in_col(collection)
                    .document_id(id)
                    .object(doc)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(store) => {
                store.set(collection, id, to_value(doc)?);
                Ok(())
            }
            Backend::Offline => Err(Self::offline()),
        }
    }

    async fn insert_generated<T>(&self, collection: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .insert()
                    .into(collection)
                    .generate_document_id()
                    .object(doc)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(store) => {
                store.insert_generated(collection, to_value(doc)?);
                Ok(())
            }
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Documents whose `field` equals `value`, at most `limit`.
    async fn find_by_field<T>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        limit: u32,
    ) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => {
                let value = value.to_string();
                client
                    .fluent()
                    .select()
                    .from(collection)
                    .filter(move |q| q.for_all([q.field(field).eq(value.clone())]))
                    .limit(limit)
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            }
            Backend::Memory(store) => store
                .find(collection, field, value)
                .into_iter()
                .take(limit as usize)
                .map(serde_json::from_value)
                .collect::<Result<Vec<T>, _>>()
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Offline => Err(Self::offline()),
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by Firebase uid.
    pub async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        let user: Option<User> = self.get_doc(collections::USERS, uid).await?;
        Ok(user.map(|mut u| {
            u.id.get_or_insert_with(|| uid.to_string());
            u
        }))
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, uid: &str, user: &User) -> Result<(), AppError> {
        let fields = owned_fields(user, &user.extra)?;
        self.set_doc(collections::USERS, uid, user, fields).await
    }

    /// List users (admin screen).
    pub async fn list_users(&self, limit: u32) -> Result<Vec<User>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .from(collections::USERS)
                .limit(limit)
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => store
                .all(collections::USERS)
                .into_iter()
                .take(limit as usize)
                .map(serde_json::from_value)
                .collect::<Result<Vec<User>, _>>()
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Offline => Err(Self::offline()),
        }
    }

    // ─── Organization Operations ─────────────────────────────────

    pub async fn get_org(&self, org_id: &str) -> Result<Option<Organization>, AppError> {
        let org: Option<Organization> = self.get_doc(collections::ORGS, org_id).await?;
        Ok(org.map(|mut o| {
            o.id.get_or_insert_with(|| org_id.to_string());
            o
        }))
    }

    pub async fn upsert_org(&self, org_id: &str, org: &Organization) -> Result<(), AppError> {
        let fields = owned_fields(org, &org.extra)?;
        self.set_doc(collections::ORGS, org_id, org, fields).await
    }

    /// Find the organization document linked to a JobTread organization ID.
    ///
    /// Webhooks only carry the JobTread-side ID.
    pub async fn find_org_by_jobtread_id(
        &self,
        jobtread_org_id: &str,
    ) -> Result<Option<Organization>, AppError> {
        let mut orgs: Vec<Organization> = self
            .find_by_field(collections::ORGS, "orgID", jobtread_org_id, 1)
            .await?;
        Ok(orgs.pop())
    }

    // ─── Subscription Operations ─────────────────────────────────

    pub async fn get_stripe_data(&self, customer_id: &str) -> Result<Option<StripeData>, AppError> {
        self.get_doc(collections::STRIPE_DATA, customer_id).await
    }

    // ─── Automation Logs ─────────────────────────────────────────

    /// Append a log record to `collection` (cover photo or AIA billing).
    pub async fn add_log(&self, collection: &str, log: &AutomationLog) -> Result<(), AppError> {
        self.insert_generated(collection, log).await
    }

    /// Most recent logs for an organization, newest first.
    pub async fn list_logs(
        &self,
        collection: &str,
        org_id: &str,
        limit: u32,
    ) -> Result<Vec<AutomationLog>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .from(collection)
                .filter(|q| q.for_all([q.field("orgId").eq(org_id)]))
                .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
                .limit(limit)
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => {
                let mut logs = store
                    .find(collection, "orgId", org_id)
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<Vec<AutomationLog>, _>>()
                    .map_err(|e| AppError::Database(e.to_string()))?;
                logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                logs.truncate(limit as usize);
                Ok(logs)
            }
            Backend::Offline => Err(Self::offline()),
        }
    }

    // ─── Webhook Replay Guard ────────────────────────────────────

    /// Record a webhook delivery. Returns `false` if the key was already claimed.
    pub async fn claim_webhook_event(
        &self,
        key: &str,
        claim: &WebhookEventClaim,
    ) -> Result<bool, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let result: Result<(), _> = client
                    .fluent()
                    .insert()
                    .into(collections::WEBHOOK_EVENTS)
                    .document_id(key)
                    .object(claim)
                    .execute()
                    .await;
                match result {
                    Ok(()) => Ok(true),
                    Err(firestore::errors::FirestoreError::DataConflictError(_)) => Ok(false),
                    Err(e) => Err(AppError::Database(e.to_string())),
                }
            }
            Backend::Memory(store) => {
                Ok(store.insert_if_absent(collections::WEBHOOK_EVENTS, key, to_value(claim)?))
            }
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Drop a claim so a failed delivery can be retried.
    pub async fn release_webhook_event(&self, key: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                client
                    .fluent()
                    .delete()
                    .from(collections::WEBHOOK_EVENTS)
                    .document_id(key)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(store) => {
                store.delete(collections::WEBHOOK_EVENTS, key);
                Ok(())
            }
            Backend::Offline => Err(Self::offline()),
        }
    }
}

fn to_value<T: Serialize>(doc: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(doc).map_err(|e| AppError::Database(e.to_string()))
}

/// Top-level fields a model writes, excluding the ones it only carries through.
fn owned_fields<T: Serialize>(doc: &T, extra: &ExtraFields) -> Result<Vec<String>, AppError> {
    let serde_json::Value::Object(map) = to_value(doc)? else {
        return Err(AppError::Database("document must serialize to a map".to_string()));
    };
    Ok(map
        .into_iter()
        .map(|(key, _)| key)
        .filter(|key| !extra.contains_key(key))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogStatus;

    fn log(org: &str, created_at: &str) -> AutomationLog {
        AutomationLog {
            id: None,
            org_id: org.to_string(),
            job_id: Some("job1".to_string()),
            document_id: None,
            address: None,
            status: LogStatus::Success,
            message: None,
            created_at: created_at.to_string(),
        }
    }

    #[tokio::test]
    async fn offline_mode_reports_database_error() {
        let db = FirestoreDb::new_mock();
        assert!(matches!(db.get_user("u1").await, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn user_round_trip_keeps_document_id() {
        let db = FirestoreDb::new_in_memory();
        let user = User {
            email: Some("owner@example.com".to_string()),
            org: Some("org1".to_string()),
            ..Default::default()
        };
        db.upsert_user("uid1", &user).await.unwrap();

        let loaded = db.get_user("uid1").await.unwrap().unwrap();
        assert_eq!(loaded.id.as_deref(), Some("uid1"));
        assert_eq!(loaded.org.as_deref(), Some("org1"));
    }

    #[tokio::test]
    async fn org_update_keeps_web_app_fields() {
        let db = FirestoreDb::new_in_memory();
        let Backend::Memory(store) = &db.backend else {
            unreachable!()
        };
        store.set(
            collections::ORGS,
            "o1",
            serde_json::json!({
                "grantKey": "gk",
                "orgID": "jt",
                "billingEmail": "ap@example.com",
                "stripeCustomerId": "cus_1"
            }),
        );

        let mut org = db.get_org("o1").await.unwrap().unwrap();
        org.lead_source_field = Some("cf1".to_string());
        db.upsert_org("o1", &org).await.unwrap();

        let stored = store.get(collections::ORGS, "o1").unwrap();
        assert_eq!(stored["billingEmail"], "ap@example.com");
        assert_eq!(stored["stripeCustomerId"], "cus_1");
        assert_eq!(stored["leadSourceField"], "cf1");
        assert_eq!(stored["grantKey"], "gk");
    }

    #[test]
    fn owned_fields_exclude_carried_fields() {
        let mut org = Organization {
            grant_key: Some("gk".to_string()),
            ..Default::default()
        };
        org.extra
            .insert("billingEmail".to_string(), serde_json::json!("ap@example.com"));

        let fields = owned_fields(&org, &org.extra).unwrap();
        assert!(fields.contains(&"grantKey".to_string()));
        assert!(fields.contains(&"zillowUrlField".to_string()));
        assert!(!fields.contains(&"billingEmail".to_string()));
        assert!(!fields.contains(&"id".to_string()));
    }

    #[tokio::test]
    async fn org_lookup_by_jobtread_id() {
        let db = FirestoreDb::new_in_memory();
        let org = Organization {
            grant_key: Some("gk".to_string()),
            jobtread_org_id: Some("22NjT".to_string()),
            ..Default::default()
        };
        db.upsert_org("org1", &org).await.unwrap();

        let found = db.find_org_by_jobtread_id("22NjT").await.unwrap().unwrap();
        assert_eq!(found.id.as_deref(), Some("org1"));
        assert!(db.find_org_by_jobtread_id("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn logs_are_scoped_and_newest_first() {
        let db = FirestoreDb::new_in_memory();
        let col = collections::COVER_PHOTO_LOGS;
        db.add_log(col, &log("org1", "2024-01-01T00:00:00Z")).await.unwrap();
        db.add_log(col, &log("org1", "2024-03-01T00:00:00Z")).await.unwrap();
        db.add_log(col, &log("org2", "2024-02-01T00:00:00Z")).await.unwrap();

        let logs = db.list_logs(col, "org1", 10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].created_at, "2024-03-01T00:00:00Z");
        assert!(logs.iter().all(|l| l.id.is_some()));
    }

    #[tokio::test]
    async fn webhook_claims_are_exclusive_until_released() {
        let db = FirestoreDb::new_in_memory();
        let claim = WebhookEventClaim {
            route: "zillow".to_string(),
            event_id: "evt1".to_string(),
            entity_id: "loc1".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };

        assert!(db.claim_webhook_event("k1", &claim).await.unwrap());
        assert!(!db.claim_webhook_event("k1", &claim).await.unwrap());
        db.release_webhook_event("k1").await.unwrap();
        assert!(db.claim_webhook_event("k1", &claim).await.unwrap());
    }
}
