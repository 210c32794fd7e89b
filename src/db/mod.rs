// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore).

pub mod firestore;
mod memory;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const ORGS: &str = "orgs";
    /// Subscription mirror (keyed by Stripe customer ID)
    pub const STRIPE_DATA: &str = "stripedata";
    pub const COVER_PHOTO_LOGS: &str = "coverphotoLogs";
    pub const AIA_BILLING_LOGS: &str = "aiaBillingLogs";
    /// Webhook replay guard (keyed by idempotency key)
    pub const WEBHOOK_EVENTS: &str = "webhookEvents";
}
