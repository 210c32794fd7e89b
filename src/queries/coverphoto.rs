// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cover photo queries.

use super::{fields, with};
use serde_json::{json, Value};

/// A job's name and site address.
pub fn job_address_query(job_id: &str) -> Value {
    json!({
        "job": with(
            json!({ "$": { "id": job_id } }),
            &[
                ("id", json!({})),
                ("name", json!({})),
                ("location", fields(&["id", "formattedAddress"])),
            ],
        )
    })
}

/// Point a job's cover photo at an uploaded file.
pub fn set_cover_photo_mutation(job_id: &str, file_id: &str) -> Value {
    json!({
        "updateJob": {
            "$": { "id": job_id, "coverPhotoFileId": file_id },
            "job": fields(&["id"]),
        }
    })
}
