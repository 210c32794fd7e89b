// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - upstream clients and business logic.

pub mod aia;
pub mod analytics;
pub mod bridge;
pub mod credentials;
pub mod firebase_auth;
pub mod idempotency;
pub mod pagination;
pub mod pave;
pub mod static_maps;
pub mod uploads;

pub use bridge::BridgeClient;
pub use credentials::{resolve_by_jobtread_org, resolve_credentials, OrgCredentials};
pub use firebase_auth::{FirebaseAuth, FirebaseUser, TokenError};
pub use pagination::{fetch_all_pages, PageSet};
pub use pave::{PaveClient, PaveTransport};
pub use static_maps::StaticMapsClient;
