// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! `/api/coverphoto`: set a job's cover photo to a satellite view of its site.

use super::webhook::{
    check_secret, duplicate_response, is_manual, parse_body, parse_event, record_log,
    skipped_response, str_at, Delivery, WebhookAuth, WebhookFailure, WithDebug,
};
use crate::db::collections;
use crate::error::AppError;
use crate::models::{AutomationLog, LogStatus};
use crate::queries::coverphoto::{job_address_query, set_cover_photo_mutation};
use crate::services::credentials::resolve_by_jobtread_org;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

const ROUTE: &str = "coverphoto";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/coverphoto", post(handle))
}

#[derive(Debug)]
struct CoverPhotoJob {
    grant_key: String,
    job_id: String,
    address: Option<String>,
    /// Firestore org to log against; manual runs may omit it.
    org_id: Option<String>,
}

async fn handle(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<WebhookAuth>,
    body: Bytes,
) -> Response {
    match run(&state, &auth, &body).await {
        Ok(response) => response,
        Err(failure) => failure.into_response(),
    }
}

async fn run(state: &AppState, auth: &WebhookAuth, raw: &[u8]) -> Result<Response, WebhookFailure> {
    check_secret(state, auth)?;
    let body = &parse_body(raw)?;

    let (job, delivery) = if is_manual(body) {
        let job = CoverPhotoJob {
            grant_key: str_at(body, "/grantKey").map(String::from).unwrap_or_default(),
            job_id: str_at(body, "/jobId").map(String::from).unwrap_or_default(),
            address: str_at(body, "/address").map(String::from),
            org_id: str_at(body, "/orgId").map(String::from),
        };
        if job.grant_key.is_empty() || job.job_id.is_empty() {
            return Err(WebhookFailure::bad_request(
                "Missing required fields",
                json!({ "mode": "manual", "jobId": body.get("jobId") }),
            ));
        }
        (job, Delivery::Manual)
    } else {
        let event = parse_event(body).ok_or_else(|| {
            WebhookFailure::bad_request("Missing required webhook data", json!({ "mode": "webhook" }))
        })?;
        let debug = json!({
            "mode": "webhook",
            "organizationId": event.jobtread_org_id,
            "jobId": event.entity_id,
        });

        let creds = resolve_by_jobtread_org(&state.db, event.jobtread_org_id)
            .await
            .debug(&debug)?;
        if !creds.org.cover_photo_enabled {
            tracing::info!(org_id = %creds.org_id, "Cover photos disabled for organization");
            return Ok(skipped_response("disabled", debug));
        }

        let delivery = Delivery::claim(&state.db, ROUTE, event.event_id, event.entity_id)
            .await
            .debug(&debug)?;
        if matches!(delivery, Delivery::Replay) {
            return Ok(duplicate_response());
        }

        (
            CoverPhotoJob {
                grant_key: creds.grant_key,
                job_id: event.entity_id.to_string(),
                address: str_at(event.next, "/location/formattedAddress").map(String::from),
                org_id: Some(creds.org_id),
            },
            delivery,
        )
    };

    let result = set_cover_photo(state, &job).await;

    if let Some(org_id) = &job.org_id {
        let (status, message, address) = match &result {
            Ok(debug) => (
                LogStatus::Success,
                None,
                debug["address"].as_str().map(String::from),
            ),
            Err(failure) => (
                LogStatus::Error,
                Some(failure.error.to_string()),
                failure.debug["address"].as_str().map(String::from),
            ),
        };
        let log = AutomationLog {
            id: None,
            org_id: org_id.clone(),
            job_id: Some(job.job_id.clone()),
            document_id: None,
            address,
            status,
            message,
            created_at: now_rfc3339(),
        };
        record_log(&state.db, collections::COVER_PHOTO_LOGS, &log).await;
    }

    if result.is_err() {
        delivery.release(&state.db).await;
    }
    result.map(|debug| Json(json!({ "success": true, "debug": debug })).into_response())
}

async fn set_cover_photo(state: &AppState, job: &CoverPhotoJob) -> Result<Value, WebhookFailure> {
    let mut debug = json!({ "jobId": job.job_id });

    let address = match &job.address {
        Some(address) => address.clone(),
        None => {
            let response = state
                .pave
                .run(&job.grant_key, job_address_query(&job.job_id))
                .await
                .debug(&debug)?;
            str_at(&response, "/job/location/formattedAddress")
                .map(String::from)
                .ok_or_else(|| WebhookFailure::bad_request("Job has no address", debug.clone()))?
        }
    };
    debug["address"] = Value::String(address.clone());

    let image = state.maps.fetch(&address).await.debug(&debug)?;
    let extension = if image.content_type.contains("jpeg") { "jpg" } else { "png" };

    let file = state
        .pave
        .upload_file(
            &job.grant_key,
            "job",
            &job.job_id,
            &format!("Cover Photo.{}", extension),
            &image.content_type,
            image.bytes,
        )
        .await
        .debug(&debug)?;
    debug["fileId"] = Value::String(file.id.clone());

    let response = state
        .pave
        .run(&job.grant_key, set_cover_photo_mutation(&job.job_id, &file.id))
        .await
        .debug(&debug)?;
    if response.pointer("/updateJob/job/id").is_none() {
        return Err(WebhookFailure::new(
            AppError::Upstream {
                service: "jobtread",
                status: 200,
                body: response.to_string(),
            },
            debug,
        ));
    }

    tracing::info!(job_id = %job.job_id, file_id = %file.id, "Set job cover photo");
    Ok(debug)
}
