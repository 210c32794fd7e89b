// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Static Maps client used for job cover photos.

use crate::error::AppError;
use anyhow::Context;
use std::time::Duration;

const ZOOM: u8 = 19;
const SIZE: &str = "640x400";
const SCALE: u8 = 2;
const MAP_TYPE: &str = "satellite";

/// A rendered map image.
#[derive(Debug, Clone)]
pub struct MapImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Clone)]
pub struct StaticMapsClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl StaticMapsClient {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building Static Maps HTTP client")?;
        Ok(Self {
            http,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    /// Satellite image URL centered on `address` with a marker.
    pub fn map_url(&self, address: &str) -> String {
        let address = urlencoding::encode(address);
        format!(
            "{}?center={address}&zoom={ZOOM}&size={SIZE}&scale={SCALE}&maptype={MAP_TYPE}&markers={address}&key={}",
            self.url,
            urlencoding::encode(&self.api_key),
        )
    }

    pub async fn fetch(&self, address: &str) -> Result<MapImage, AppError> {
        let response = self
            .http
            .get(self.map_url(address))
            .send()
            .await
            .map_err(|e| AppError::upstream_transport("static_maps", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "static_maps",
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();

        if !content_type.starts_with("image/") {
            return Err(AppError::Upstream {
                service: "static_maps",
                status: status.as_u16(),
                body: format!("unexpected content type {}", content_type),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::upstream_transport("static_maps", e))?;

        Ok(MapImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_encodes_address_and_key() {
        let client = StaticMapsClient::new(
            "https://maps.example/staticmap",
            "k&y",
            Duration::from_secs(1),
        )
        .unwrap();
        let url = client.map_url("1 Main St, Springfield");
        assert!(url.starts_with("https://maps.example/staticmap?center=1%20Main%20St%2C%20Springfield&"));
        assert!(url.contains("maptype=satellite"));
        assert!(url.contains("markers=1%20Main%20St%2C%20Springfield"));
        assert!(url.ends_with("key=k%26y"));
    }
}
