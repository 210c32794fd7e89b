// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! `/api/aiabilling/2`: attach an AIA G702/G703 pay application PDF to an invoice.

use super::webhook::{
    check_secret, duplicate_response, is_manual, parse_body, parse_event, record_log,
    skipped_response, str_at, Delivery, WebhookAuth, WebhookFailure, WithDebug,
};
use crate::db::collections;
use crate::error::AppError;
use crate::models::org::DEFAULT_RETAINAGE_PERCENT;
use crate::models::{AutomationLog, LogStatus};
use crate::queries::aia::aia_document_query;
use crate::services::aia::{build_pay_application, is_billable, pdf_file_name, render_pdf};
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

const ROUTE: &str = "aiabilling";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/aiabilling/2", post(handle))
}

#[derive(Debug)]
struct BillingJob {
    grant_key: String,
    document_id: String,
    retainage_percent: f64,
    org_id: Option<String>,
}

enum Outcome {
    Attached(Value),
    NotAnInvoice(Value),
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
        let job = BillingJob {
            grant_key: str_at(body, "/grantKey").map(String::from).unwrap_or_default(),
            document_id: str_at(body, "/documentId").map(String::from).unwrap_or_default(),
            retainage_percent: body["retainagePercent"]
                .as_f64()
                .filter(|p| (0.0..=100.0).contains(p))
                .unwrap_or(DEFAULT_RETAINAGE_PERCENT),
            org_id: str_at(body, "/orgId").map(String::from),
        };
        if job.grant_key.is_empty() || job.document_id.is_empty() {
            return Err(WebhookFailure::bad_request(
                "Missing required fields",
                json!({ "mode": "manual", "documentId": body.get("documentId") }),
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
            "documentId": event.entity_id,
        });

        // The envelope usually says what kind of document changed; skip
        // orders and bills without touching JobTread.
        if let Some(kind) = str_at(event.next, "/type") {
            if kind != "customerInvoice" {
                return Ok(skipped_response("not a customer invoice", debug));
            }
        }

        let creds = resolve_by_jobtread_org(&state.db, event.jobtread_org_id)
            .await
            .debug(&debug)?;

        let delivery = Delivery::claim(&state.db, ROUTE, event.event_id, event.entity_id)
            .await
            .debug(&debug)?;
        if matches!(delivery, Delivery::Replay) {
            return Ok(duplicate_response());
        }

        (
            BillingJob {
                grant_key: creds.grant_key,
                document_id: event.entity_id.to_string(),
                retainage_percent: creds.org.retainage_percent(),
                org_id: Some(creds.org_id),
            },
            delivery,
        )
    };

    let result = attach_pay_application(state, &job).await;

    let entry = match &result {
        Ok(Outcome::NotAnInvoice(_)) => None,
        Ok(Outcome::Attached(debug)) => Some((
            LogStatus::Success,
            debug["applicationNumber"]
                .as_u64()
                .map(|n| format!("Application #{}", n)),
            debug["jobId"].as_str().map(String::from),
        )),
        Err(failure) => Some((
            LogStatus::Error,
            Some(failure.error.to_string()),
            failure.debug["jobId"].as_str().map(String::from),
        )),
    };
    if let (Some(org_id), Some((status, message, job_id))) = (&job.org_id, entry) {
        let log = AutomationLog {
            id: None,
            org_id: org_id.clone(),
            job_id,
            document_id: Some(job.document_id.clone()),
            address: None,
            status,
            message,
            created_at: now_rfc3339(),
        };
        record_log(&state.db, collections::AIA_BILLING_LOGS, &log).await;
    }

    match result {
        Ok(Outcome::Attached(debug)) => {
            Ok(Json(json!({ "success": true, "debug": debug })).into_response())
        }
        Ok(Outcome::NotAnInvoice(debug)) => Ok(skipped_response("not a customer invoice", debug)),
        Err(failure) => {
            delivery.release(&state.db).await;
            Err(failure)
        }
    }
}

async fn attach_pay_application(
    state: &AppState,
    job: &BillingJob,
) -> Result<Outcome, WebhookFailure> {
    let mut debug = json!({
        "documentId": job.document_id,
        "retainagePercent": job.retainage_percent,
    });

    let response = state
        .pave
        .run(&job.grant_key, aia_document_query(&job.document_id))
        .await
        .debug(&debug)?;

    let document = &response["document"];
    if document.is_null() {
        return Err(WebhookFailure::new(
            AppError::NotFound(format!("Document {} not found", job.document_id)),
            debug,
        ));
    }
    debug["jobId"] = document.pointer("/job/id").cloned().unwrap_or(Value::Null);

    if !is_billable(document) {
        debug["type"] = document["type"].clone();
        return Ok(Outcome::NotAnInvoice(debug));
    }

    let application = build_pay_application(document, job.retainage_percent).debug(&debug)?;
    debug["applicationNumber"] = json!(application.application_number);
    debug["currentPaymentDue"] = json!(application.current_payment_due);

    let font_dir = state.config.aia_font_dir.clone();
    let font_family = state.config.aia_font_family.clone();
    let rendered = application.clone();
    let pdf = tokio::task::spawn_blocking(move || render_pdf(&rendered, &font_dir, &font_family))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF task failed: {}", e)))
        .and_then(|r| r)
        .debug(&debug)?;

    let file = state
        .pave
        .upload_file(
            &job.grant_key,
            "document",
            &job.document_id,
            &pdf_file_name(&application),
            "application/pdf",
            pdf,
        )
        .await
        .debug(&debug)?;
    debug["fileId"] = Value::String(file.id.clone());

    tracing::info!(
        document_id = %job.document_id,
        application_number = application.application_number,
        file_id = %file.id,
        "Attached AIA pay application"
    );
    Ok(Outcome::Attached(debug))
}
