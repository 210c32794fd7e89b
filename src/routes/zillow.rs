// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! `/api/zillow`: write a location's Zestimate into JobTread custom fields.

use super::webhook::{
    check_secret, duplicate_response, is_manual, parse_body, parse_event, str_at, Delivery,
    WebhookAuth, WebhookFailure, WithDebug,
};
use crate::error::AppError;
use crate::queries::zillow::zestimate_update_mutation;
use crate::services::bridge::normalize_address;
use crate::services::credentials::resolve_by_jobtread_org;
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

const ROUTE: &str = "zillow";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/zillow", post(handle))
}

/// Everything needed for one Zestimate write-back.
#[derive(Debug)]
struct ZillowJob {
    grant_key: String,
    location_id: String,
    zestimate_field: String,
    url_field: String,
    address: String,
    delivery_key: Option<String>,
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
        (parse_manual(body)?, Delivery::Manual)
    } else {
        match resolve_webhook(state, body).await? {
            Some(resolved) => resolved,
            None => return Ok(duplicate_response()),
        }
    };

    let result = write_zestimate(state, &job).await;
    if result.is_err() {
        delivery.release(&state.db).await;
    }
    result.map(|debug| Json(json!({ "success": true, "debug": debug })).into_response())
}

fn parse_manual(body: &Value) -> Result<ZillowJob, WebhookFailure> {
    let field = |name: &str| str_at(body, &format!("/{}", name)).map(String::from);

    let debug = json!({
        "mode": "manual",
        "locid": body.get("locid"),
        "address": body.get("address"),
    });

    match (
        field("grantKey"),
        field("locid"),
        field("zestimateField"),
        field("zestimateUrlField"),
        field("address"),
    ) {
        (Some(grant_key), Some(location_id), Some(zestimate_field), Some(url_field), Some(address)) => {
            Ok(ZillowJob {
                grant_key,
                location_id,
                zestimate_field,
                url_field,
                address,
                delivery_key: None,
            })
        }
        _ => Err(WebhookFailure::bad_request("Missing required fields", debug)),
    }
}

/// Resolve a webhook body. `Ok(None)` for a replayed delivery.
async fn resolve_webhook(
    state: &AppState,
    body: &Value,
) -> Result<Option<(ZillowJob, Delivery)>, WebhookFailure> {
    let event = parse_event(body)
        .filter(|e| str_at(e.next, "/formattedAddress").is_some())
        .ok_or_else(|| {
            WebhookFailure::bad_request(
                "Missing required webhook data",
                json!({ "mode": "webhook", "createdEvent": body.pointer("/createdEvent/id") }),
            )
        })?;

    let address = str_at(event.next, "/formattedAddress").unwrap_or_default();
    let debug = json!({
        "mode": "webhook",
        "organizationId": event.jobtread_org_id,
        "locationId": event.entity_id,
        "address": address,
    });

    let creds = resolve_by_jobtread_org(&state.db, event.jobtread_org_id)
        .await
        .debug(&debug)?;

    let (Some(zestimate_field), Some(url_field)) = (
        creds.org.zestimate_field.clone().filter(|f| !f.trim().is_empty()),
        creds.org.zestimate_url_field.clone().filter(|f| !f.trim().is_empty()),
    ) else {
        return Err(WebhookFailure::bad_request(
            "Zillow custom fields are not configured",
            debug,
        ));
    };

    let delivery = Delivery::claim(&state.db, ROUTE, event.event_id, event.entity_id)
        .await
        .debug(&debug)?;
    if matches!(delivery, Delivery::Replay) {
        return Ok(None);
    }

    let delivery_key = match &delivery {
        Delivery::Claimed(key) => Some(key.clone()),
        _ => None,
    };

    Ok(Some((
        ZillowJob {
            grant_key: creds.grant_key,
            location_id: event.entity_id.to_string(),
            zestimate_field,
            url_field,
            address: address.to_string(),
            delivery_key,
        },
        delivery,
    )))
}

/// One Bridge lookup then one Pave mutation.
async fn write_zestimate(state: &AppState, job: &ZillowJob) -> Result<Value, WebhookFailure> {
    let address = normalize_address(&job.address);
    let mut debug = json!({
        "locationId": job.location_id,
        "address": address,
        "zestimateField": job.zestimate_field,
        "zestimateUrlField": job.url_field,
        "deliveryKey": job.delivery_key,
    });

    let zestimate = state.bridge.zestimate(&address).await.debug(&debug)?;
    debug["zestimate"] = zestimate.zestimate.clone();
    debug["zillowUrl"] = Value::String(zestimate.zillow_url.clone());

    let mutation = zestimate_update_mutation(
        &job.location_id,
        &job.zestimate_field,
        &job.url_field,
        &zestimate.zestimate,
        &zestimate.zillow_url,
    );
    let response = state.pave.run(&job.grant_key, mutation).await.debug(&debug)?;

    if response.pointer("/updateLocation/location/id").is_none() {
        return Err(WebhookFailure::new(
            AppError::Upstream {
                service: "jobtread",
                status: 200,
                body: response.to_string(),
            },
            debug,
        ));
    }

    tracing::info!(
        location_id = %job.location_id,
        zestimate = %zestimate.zestimate,
        "Updated Zestimate"
    );
    Ok(debug)
}
