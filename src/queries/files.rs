// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File upload mutations.
//!
//! Uploading is two Pave calls around a plain HTTP PUT: reserve an upload
//! request (returns a signed URL), PUT the bytes there, then create a file
//! record that references the upload request.

use super::fields;
use serde_json::{json, Value};

pub fn create_upload_request_mutation(size: usize, content_type: &str) -> Value {
    json!({
        "createUploadRequest": {
            "$": { "size": size, "type": content_type },
            "createdUploadRequest": fields(&["id", "url"]),
        }
    })
}

/// Attach an uploaded file to a target entity (`job`, `document`, ...).
pub fn create_file_mutation(
    target_type: &str,
    target_id: &str,
    name: &str,
    upload_request_id: &str,
) -> Value {
    json!({
        "createFile": {
            "$": {
                "targetType": target_type,
                "targetId": target_id,
                "name": name,
                "uploadRequestId": upload_request_id,
            },
            "createdFile": fields(&["id", "name", "url"]),
        }
    })
}
