// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The `NEXT_PUBLIC_*` names are shared with the web frontend so a single
//! `.env` file can serve both.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_JOBTREAD_API_URL: &str = "https://api.jobtread.com/pave";
pub const DEFAULT_BRIDGE_API_URL: &str =
    "https://api.bridgedataoutput.com/api/v2/zestimates_v2/zestimates";
pub const DEFAULT_STATIC_MAPS_URL: &str = "https://maps.googleapis.com/maps/api/staticmap";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Firebase project ID (Firestore project and ID-token audience)
    pub firebase_project_id: String,
    /// Frontend URL, allowed as a CORS origin
    pub app_url: String,

    /// JobTread Pave endpoint
    pub jobtread_api_url: String,
    /// Bridge Data Output Zestimate endpoint
    pub bridge_api_url: String,
    /// Google Maps Static API endpoint
    pub static_maps_url: String,

    /// Bridge Data Output access token
    pub bridge_api_token: String,
    /// Google Maps API key
    pub google_maps_api_key: String,
    /// Shared secret for webhook routes (`?secret=`); unchecked when unset
    pub webhook_secret: Option<String>,

    /// Upper bound on pages fetched by a single pagination loop
    pub max_pages: u32,
    /// Timeout for every outbound HTTP request
    pub upstream_timeout_secs: u64,

    /// Directory holding the TTF files used for AIA billing PDFs
    pub aia_font_dir: PathBuf,
    /// Font family name (files are `<family>-Regular.ttf` etc.)
    pub aia_font_family: String,
}

impl Config {
    /// Deterministic config for tests. Upstream URLs point nowhere useful;
    /// tests that need them override the fields.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            firebase_project_id: "test-project".to_string(),
            app_url: "http://localhost:3000".to_string(),
            jobtread_api_url: "http://127.0.0.1:9/pave".to_string(),
            bridge_api_url: "http://127.0.0.1:9/zestimates".to_string(),
            static_maps_url: "http://127.0.0.1:9/staticmap".to_string(),
            bridge_api_token: "test_bridge_token".to_string(),
            google_maps_api_key: "test_maps_key".to_string(),
            webhook_secret: None,
            max_pages: 50,
            upstream_timeout_secs: 5,
            aia_font_dir: PathBuf::from("./fonts"),
            aia_font_family: "LiberationSans".to_string(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let firebase_project_id = env::var("FIREBASE_PROJECT_ID")
            .or_else(|_| env::var("GCP_PROJECT_ID"))
            .map_err(|_| ConfigError::Missing("FIREBASE_PROJECT_ID"))?;

        Ok(Self {
            port: parse_or("PORT", 8080),
            firebase_project_id,
            app_url: env::var("NEXT_PUBLIC_APP_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),

            jobtread_api_url: env::var("JOBTREAD_API_URL")
                .unwrap_or_else(|_| DEFAULT_JOBTREAD_API_URL.to_string()),
            bridge_api_url: env::var("BRIDGE_API_URL")
                .unwrap_or_else(|_| DEFAULT_BRIDGE_API_URL.to_string()),
            static_maps_url: env::var("GOOGLE_MAPS_STATIC_URL")
                .unwrap_or_else(|_| DEFAULT_STATIC_MAPS_URL.to_string()),

            bridge_api_token: env::var("NEXT_PUBLIC_BRIDGE_API_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("NEXT_PUBLIC_BRIDGE_API_TOKEN"))?,
            google_maps_api_key: env::var("NEXT_PUBLIC_GOOGLE_MAPS_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("NEXT_PUBLIC_GOOGLE_MAPS_API_KEY"))?,
            webhook_secret: env::var("WEBHOOK_SECRET")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),

            max_pages: parse_or("PAVE_MAX_PAGES", 50).max(1),
            upstream_timeout_secs: parse_or("UPSTREAM_TIMEOUT_SECS", 30),

            aia_font_dir: env::var("AIA_FONT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./fonts")),
            aia_font_family: env::var("AIA_FONT_FAMILY")
                .unwrap_or_else(|_| "LiberationSans".to_string()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
