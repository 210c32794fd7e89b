// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! JobTread Dashboard: analytics and automations for JobTread contractors
//!
//! This crate provides the backend API behind the dashboard: a credentialed
//! gateway to JobTread's Pave API, chart data endpoints, and the webhook
//! automations (Zestimates, cover photos, AIA billing).

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod queries;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{BridgeClient, FirebaseAuth, PaveClient, StaticMapsClient};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub pave: PaveClient,
    pub bridge: BridgeClient,
    pub maps: StaticMapsClient,
    pub auth: Arc<FirebaseAuth>,
}

impl AppState {
    /// Build the upstream clients from `config`.
    pub fn new(config: Config, db: FirestoreDb, auth: Arc<FirebaseAuth>) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.upstream_timeout_secs);
        let pave = PaveClient::new(config.jobtread_api_url.clone(), timeout)?;
        let bridge = BridgeClient::new(
            config.bridge_api_url.clone(),
            config.bridge_api_token.clone(),
            timeout,
        )?;
        let maps = StaticMapsClient::new(
            config.static_maps_url.clone(),
            config.google_maps_api_key.clone(),
            timeout,
        )?;

        Ok(Self {
            config,
            db,
            pave,
            bridge,
            maps,
            auth,
        })
    }
}
