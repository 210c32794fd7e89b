// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bridge Data Output client for Zillow Zestimates.

use crate::error::AppError;
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Bridge Zestimate lookup result.
#[derive(Debug, Clone)]
pub struct Zestimate {
    /// Passed through untouched; Bridge sends a number.
    pub zestimate: Value,
    pub zillow_url: String,
}

#[derive(Debug, Deserialize)]
struct ZestimateResponse {
    #[serde(default)]
    bundle: Vec<ZestimateRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZestimateRecord {
    #[serde(default)]
    zestimate: Value,
    #[serde(default)]
    zillow_url: Option<String>,
}

/// Strip a trailing `USA` country suffix from a formatted address.
///
/// `"1 Main St, Springfield, IL 62701, USA"` becomes
/// `"1 Main St, Springfield, IL 62701"`. The suffix must be separated by a
/// comma or whitespace.
pub fn normalize_address(address: &str) -> String {
    let Some(prefix) = address.strip_suffix("USA") else {
        return address.trim().to_string();
    };

    let trimmed = prefix.trim_end();
    let stripped = if let Some(without_comma) = trimmed.strip_suffix(',') {
        without_comma
    } else if trimmed.len() < prefix.len() {
        trimmed
    } else {
        address
    };
    stripped.trim().to_string()
}

#[derive(Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    url: String,
    access_token: String,
}

impl BridgeClient {
    pub fn new(
        url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building Bridge HTTP client")?;
        Ok(Self {
            http,
            url: url.into(),
            access_token: access_token.into(),
        })
    }

    /// Look up the Zestimate for an address (normalized by the caller).
    pub async fn zestimate(&self, address: &str) -> Result<Zestimate, AppError> {
        tracing::debug!(address, "Fetching Zestimate");

        let response = self
            .http
            .get(&self.url)
            .query(&[("access_token", self.access_token.as_str()), ("address", address)])
            .send()
            .await
            .map_err(|e| AppError::upstream_transport("bridge", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "bridge",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ZestimateResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream_transport("bridge", format!("JSON parse error: {}", e)))?;

        let record = parsed
            .bundle
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("No Zestimate found for {}", address)))?;

        if record.zestimate.is_null() {
            return Err(AppError::NotFound(format!(
                "No Zestimate value for {}",
                address
            )));
        }

        Ok(Zestimate {
            zestimate: record.zestimate,
            zillow_url: record.zillow_url.unwrap_or_default(),
        })
    }
}
