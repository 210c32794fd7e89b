// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Resolve JobTread credentials for a signed-in user or a webhook sender.
//!
//! The chain is `users/{uid}.org` -> `orgs/{orgId}.{grantKey, orgID}`. Any
//! missing link is reported as missing credentials.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::Organization;

/// Credentials for calling Pave on behalf of one organization.
#[derive(Debug, Clone)]
pub struct OrgCredentials {
    /// Firestore organization document ID
    pub org_id: String,
    pub grant_key: String,
    /// JobTread organization ID
    pub jobtread_org_id: String,
    /// The organization's settings as loaded
    pub org: Organization,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("user is not linked to an organization")]
    NoOrganization,
    #[error("organization {0} not found")]
    OrgNotFound(String),
    #[error("organization has no grant key")]
    MissingGrantKey,
    #[error("organization has no JobTread org ID")]
    MissingOrgId,
    #[error(transparent)]
    Database(AppError),
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Database(e) => e,
            other => {
                tracing::debug!(reason = %other, "Credential resolution failed");
                AppError::MissingCredentials(AppError::MISSING_CREDENTIALS.to_string())
            }
        }
    }
}

/// Extract usable credentials from a loaded organization.
pub fn credentials_for(org_id: &str, org: Organization) -> Result<OrgCredentials, CredentialError> {
    let grant_key = org
        .grant_key()
        .ok_or(CredentialError::MissingGrantKey)?
        .to_string();
    let jobtread_org_id = org
        .jobtread_org_id()
        .ok_or(CredentialError::MissingOrgId)?
        .to_string();

    Ok(OrgCredentials {
        org_id: org_id.to_string(),
        grant_key,
        jobtread_org_id,
        org,
    })
}

/// Resolve credentials for a signed-in user.
pub async fn resolve_credentials(
    db: &FirestoreDb,
    uid: &str,
) -> Result<OrgCredentials, CredentialError> {
    let user = db
        .get_user(uid)
        .await
        .map_err(CredentialError::Database)?
        .ok_or_else(|| CredentialError::UserNotFound(uid.to_string()))?;

    let org_id = user
        .org
        .as_deref()
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .ok_or(CredentialError::NoOrganization)?;

    let org = db
        .get_org(org_id)
        .await
        .map_err(CredentialError::Database)?
        .ok_or_else(|| CredentialError::OrgNotFound(org_id.to_string()))?;

    credentials_for(org_id, org)
}

/// Resolve credentials for a webhook, which only knows the JobTread org ID.
pub async fn resolve_by_jobtread_org(
    db: &FirestoreDb,
    jobtread_org_id: &str,
) -> Result<OrgCredentials, CredentialError> {
    let org = db
        .find_org_by_jobtread_id(jobtread_org_id)
        .await
        .map_err(CredentialError::Database)?
        .ok_or_else(|| CredentialError::OrgNotFound(jobtread_org_id.to_string()))?;

    let org_id = org.id.clone().unwrap_or_default();
    credentials_for(&org_id, org)
}
