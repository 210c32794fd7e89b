// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upload bytes into JobTread and attach them to a job or document.

use super::pave::PaveClient;
use crate::error::AppError;
use crate::queries::files::{create_file_mutation, create_upload_request_mutation};
use serde_json::Value;

/// A file record created in JobTread.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub id: String,
    pub url: Option<String>,
}

fn required_str<'a>(response: &'a Value, pointer: &str) -> Result<&'a str, AppError> {
    response
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Upstream {
            service: "jobtread",
            status: 200,
            body: format!("response missing {}", pointer),
        })
}

impl PaveClient {
    /// Reserve an upload, PUT the bytes, and create the file record.
    pub async fn upload_file(
        &self,
        grant_key: &str,
        target_type: &str,
        target_id: &str,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, AppError> {
        let reserved = self
            .run(
                grant_key,
                create_upload_request_mutation(bytes.len(), content_type),
            )
            .await?;
        let upload_id = required_str(&reserved, "/createUploadRequest/createdUploadRequest/id")?;
        let upload_url = required_str(&reserved, "/createUploadRequest/createdUploadRequest/url")?;

        tracing::debug!(target_type, target_id, size = bytes.len(), "Uploading file");

        let response = self
            .http
            .put(upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::upstream_transport("jobtread_upload", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "jobtread_upload",
                status: status.as_u16(),
                body,
            });
        }

        let created = self
            .run(
                grant_key,
                create_file_mutation(target_type, target_id, name, upload_id),
            )
            .await?;
        let id = required_str(&created, "/createFile/createdFile/id")?.to_string();
        let url = created
            .pointer("/createFile/createdFile/url")
            .and_then(Value::as_str)
            .map(String::from);

        tracing::info!(target_type, target_id, file_id = %id, "Uploaded file to JobTread");
        Ok(UploadedFile { id, url })
    }
}
