// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JobTread Pave API client.
//!
//! Every JobTread call in the app goes through here: the `/api/jtfetch`
//! passthrough, the dashboard fetchers, and the webhook write-backs.

use crate::error::AppError;
use anyhow::Context;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;

/// Anything that can execute a Pave query.
///
/// Implemented by [`PaveClient`]; tests substitute scripted responses.
pub trait PaveTransport: Send + Sync {
    /// Execute a complete query (grant key included) and return the response JSON.
    fn send(&self, query: Value) -> impl Future<Output = Result<Value, AppError>> + Send;
}

/// HTTP client for the Pave endpoint.
#[derive(Clone)]
pub struct PaveClient {
    pub(crate) http: reqwest::Client,
    url: String,
}

impl PaveClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building JobTread HTTP client")?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// Post `{ "query": query }` and return the body unchanged.
    ///
    /// `query` must already carry `$.grantKey`.
    pub async fn query(&self, query: &Value) -> Result<Value, AppError> {
        let response = self
            .http
            .post(&self.url)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|e| AppError::upstream_transport("jobtread", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "jobtread",
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AppError::upstream_transport("jobtread", format!("JSON parse error: {}", e)))
    }

    /// Run a builder query under an organization's grant key.
    pub async fn run(&self, grant_key: &str, query: Value) -> Result<Value, AppError> {
        self.query(&with_grant_key(query, grant_key)).await
    }
}

impl PaveTransport for PaveClient {
    fn send(&self, query: Value) -> impl Future<Output = Result<Value, AppError>> + Send {
        async move { self.query(&query).await }
    }
}

/// Insert `$.grantKey` at the root of a query, keeping any other root arguments.
pub fn with_grant_key(mut query: Value, grant_key: &str) -> Value {
    if !query.is_object() {
        query = json!({});
    }
    if let Value::Object(root) = &mut query {
        let args = root
            .entry("$")
            .or_insert_with(|| Value::Object(Default::default()));
        if !args.is_object() {
            *args = Value::Object(Default::default());
        }
        if let Value::Object(args) = args {
            args.insert("grantKey".to_string(), Value::String(grant_key.to_string()));
        }
    }
    query
}

/// The non-blank `$.grantKey` of a query, if any.
pub fn grant_key_of(query: &Value) -> Option<&str> {
    query
        .pointer("/$/grantKey")
        .and_then(Value::as_str)
        .filter(|key| !key.trim().is_empty())
}
