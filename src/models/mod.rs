// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod extra;
pub mod log;
pub mod org;
pub mod stripe;
pub mod user;

pub use extra::ExtraFields;
pub use log::{AutomationLog, LogStatus, WebhookEventClaim};
pub use org::Organization;
pub use stripe::StripeData;
pub use user::{NotificationPreferences, User};
