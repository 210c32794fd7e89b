// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Integration tests for the Zestimate automation.

mod common;

use axum::http::StatusCode;
use common::{
    create_test_app, create_test_app_for, create_test_app_with, org_with_credentials, post_json,
    post_raw, send, FakeUpstream, TEST_ZESTIMATE, TEST_ZILLOW_URL,
};
use jobtread_dashboard::config::Config;
use jobtread_dashboard::models::Organization;
use serde_json::{json, Value};
use std::sync::Arc;

fn webhook_body(event_id: &str, address: &str) -> Value {
    json!({
        "createdEvent": {
            "id": event_id,
            "type": "locationCreated",
            "organization": { "id": "22NjtOrg" },
            "data": {
                "next": { "id": "loc42", "formattedAddress": address }
            }
        }
    })
}

fn zillow_org() -> Organization {
    Organization {
        zestimate_field: Some("cfZestimate".to_string()),
        zestimate_url_field: Some("cfZillowUrl".to_string()),
        ..org_with_credentials()
    }
}

#[tokio::test]
async fn test_webhook_without_address_is_rejected() {
    let (app, _state) = create_test_app();

    let body = json!({
        "createdEvent": {
            "id": "evt1",
            "organization": { "id": "22NjtOrg" },
            "data": { "next": { "id": "loc42" } }
        }
    });
    let (status, json) = send(&app, post_json("/api/zillow", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Missing required webhook data");
    assert!(json.get("debug").is_some());
}

#[tokio::test]
async fn test_malformed_bodies_get_webhook_error_shape() {
    let (app, _state) = create_test_app();

    for uri in ["/api/zillow", "/api/coverphoto", "/api/aiabilling/2"] {
        for (content_type, body) in [
            ("application/json", "{\"grantKey\": "),
            ("text/plain", "address=1 Main St"),
            ("application/json", ""),
        ] {
            let (status, json) = send(&app, post_raw(uri, content_type, body)).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{} {:?}", uri, body);
            assert_eq!(json["error"], "Invalid JSON body");
            assert!(json["debug"]["parseError"].is_string());
        }
    }
}

#[tokio::test]
async fn test_secret_is_checked_before_body() {
    let mut config = Config::test_default();
    config.webhook_secret = Some("s3cret".to_string());
    let (app, _state) = create_test_app_with(config);

    let (status, json) = send(&app, post_raw("/api/zillow", "application/json", "not json")).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_manual_run_missing_fields_is_rejected() {
    let (app, _state) = create_test_app();

    let (status, json) = send(
        &app,
        post_json(
            "/api/zillow",
            json!({ "grantKey": "gk", "locid": "loc1", "address": "1 Main St" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Missing required fields");
}

#[tokio::test]
async fn test_manual_run_writes_zestimate_once() {
    let upstream = FakeUpstream::start().await;
    let (app, _state) = create_test_app_for(&upstream);

    let (status, json) = send(
        &app,
        post_json(
            "/api/zillow",
            json!({
                "grantKey": "gk_manual",
                "locid": "loc1",
                "zestimateField": "cfZ",
                "zestimateUrlField": "cfU",
                "address": "123 Main St, Springfield, IL 62701, USA"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["success"], true);
    assert_eq!(json["debug"]["zestimate"], TEST_ZESTIMATE);

    // Exactly one Bridge lookup, with the country suffix stripped
    assert_eq!(upstream.bridge_calls(), 1);
    assert_eq!(
        upstream.bridge_addresses.lock().unwrap()[0],
        "123 Main St, Springfield, IL 62701"
    );

    // Exactly one Pave mutation carrying the looked-up values
    let sent = upstream.pave_queries();
    assert_eq!(sent.len(), 1);
    let update = &sent[0]["updateLocation"]["$"];
    assert_eq!(sent[0]["$"]["grantKey"], "gk_manual");
    assert_eq!(update["id"], "loc1");
    assert_eq!(update["customFieldValues"]["cfZ"], TEST_ZESTIMATE);
    assert_eq!(update["customFieldValues"]["cfU"], TEST_ZILLOW_URL);
}

#[tokio::test]
async fn test_webhook_uses_org_credentials_and_suppresses_replay() {
    let upstream = FakeUpstream::start().await;
    let (app, state) = create_test_app_for(&upstream);
    state.db.upsert_org("org1", &zillow_org()).await.unwrap();

    let body = webhook_body("evt-100", "9 Elm St, Portland, OR 97201, USA");

    let (status, json) = send(&app, post_json("/api/zillow", body.clone())).await;
    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["success"], true);

    let sent = upstream.pave_queries();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["$"]["grantKey"], "gk_secret_1234");
    assert_eq!(sent[0]["updateLocation"]["$"]["id"], "loc42");
    assert_eq!(
        sent[0]["updateLocation"]["$"]["customFieldValues"]["cfZestimate"],
        TEST_ZESTIMATE
    );

    // Same delivery again: acknowledged without any upstream calls
    let (status, json) = send(&app, post_json("/api/zillow", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["duplicate"], true);
    assert_eq!(upstream.bridge_calls(), 1);
    assert_eq!(upstream.pave_queries().len(), 1);
}

#[tokio::test]
async fn test_webhook_for_unknown_org_is_rejected() {
    let (app, _state) = create_test_app();

    let (status, json) = send(
        &app,
        post_json("/api/zillow", webhook_body("evt-1", "1 Main St, USA")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "JT Grant Key or Org ID missing");
}

#[tokio::test]
async fn test_webhook_without_configured_fields_is_rejected() {
    let (app, state) = create_test_app();
    state
        .db
        .upsert_org("org1", &org_with_credentials())
        .await
        .unwrap();

    let (status, json) = send(
        &app,
        post_json("/api/zillow", webhook_body("evt-2", "1 Main St, USA")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Zillow custom fields are not configured");
}

#[tokio::test]
async fn test_failed_mutation_releases_delivery_for_retry() {
    let upstream = FakeUpstream::start_with(Arc::new(|query| {
        // JobTread answered but did not update anything
        query
            .get("updateLocation")
            .map(|_| json!({ "updateLocation": null }))
    }))
    .await;
    let (app, state) = create_test_app_for(&upstream);
    state.db.upsert_org("org1", &zillow_org()).await.unwrap();

    let body = webhook_body("evt-retry", "1 Main St, USA");

    let (status, json) = send(&app, post_json("/api/zillow", body.clone())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["debug"]["locationId"].is_string());

    // The retry is processed again rather than treated as a duplicate
    let (status, json) = send(&app, post_json("/api/zillow", body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json.get("duplicate").is_none());
    assert_eq!(upstream.bridge_calls(), 2);
}

#[tokio::test]
async fn test_webhook_secret_enforced_when_configured() {
    let mut config = Config::test_default();
    config.webhook_secret = Some("hook-secret".to_string());
    let (app, _state) = create_test_app_with(config);

    let body = webhook_body("evt-3", "1 Main St, USA");

    let (status, _) = send(&app, post_json("/api/zillow", body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, post_json("/api/zillow?secret=wrong", body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Correct secret gets past the check (and fails later on the unknown org)
    let (status, _) = send(&app, post_json("/api/zillow?secret=hook-secret", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
