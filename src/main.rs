// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JobTread Dashboard API Server
//!
//! Serves dashboard data from JobTread and runs the toolbox automations
//! triggered by JobTread webhooks.

use jobtread_dashboard::{config::Config, db::FirestoreDb, services::FirebaseAuth, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        project = %config.firebase_project_id,
        max_pages = config.max_pages,
        webhook_secret = config.webhook_secret.is_some(),
        "Starting JobTread Dashboard API"
    );

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.firebase_project_id).await?;

    let auth = Arc::new(FirebaseAuth::new(&config)?);

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, auth)?);

    // Build router
    let app = jobtread_dashboard::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jobtread_dashboard=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
