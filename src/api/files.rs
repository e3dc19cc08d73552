// Mendeley Core - Rust client for the Mendeley Web API
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Files endpoint (`/files`)
//!
//! # Download
//! `GET /files/{id}` answers 303 with a `Location` pointing at the binary.
//! The binary is fetched from there without the `Authorization` header and
//! streamed to disk (see [`crate::download::stream`]). Running downloads can
//! be cancelled by file id with [`MendeleyClient::cancel_download`].
//!
//! # Upload
//! `POST /files` with the raw bytes as the body, the file name in
//! `Content-Disposition` and the owning document in a `Link` header.

use crate::api::client::MendeleyClient;
use crate::api::codec::{format_timestamp, Resource};
use crate::api::models::File;
use crate::api::request::{RequestDescriptor, ResponseEnvelope};
use crate::api::transport::TransportResponse;
use crate::download::progress::ProgressCallback;
use crate::download::stream::stream_to_file;
use crate::error::{MendeleyError, Result};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// Query parameters for file listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileParams {
    pub document_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub added_since: Option<DateTime<Utc>>,
    pub deleted_since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub catalog_id: Option<Uuid>,
}

impl FileParams {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(id) = self.document_id {
            query.push(("document_id", id.to_string()));
        }
        if let Some(id) = self.group_id {
            query.push(("group_id", id.to_string()));
        }
        if let Some(since) = &self.added_since {
            query.push(("added_since", format_timestamp(since)));
        }
        if let Some(since) = &self.deleted_since {
            query.push(("deleted_since", format_timestamp(since)));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(id) = self.catalog_id {
            query.push(("catalog_id", id.to_string()));
        }
        query
    }
}

/// `Content-Disposition` value carrying a UTF-8 file name
pub fn content_disposition(file_name: &str) -> String {
    format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

/// File name announced by a `Content-Disposition` header
///
/// Prefers the RFC 5987 `filename*` form. Directory components are stripped.
pub fn disposition_file_name(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in value.split(';').map(str::trim) {
        let Some((key, raw)) = param.split_once('=') else { continue };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = raw.trim().splitn(3, '\'').nth(2).unwrap_or(raw.trim());
                extended = urlencoding::decode(encoded).ok().map(|n| n.into_owned());
            }
            "filename" => plain = Some(raw.trim().trim_matches('"').to_string()),
            _ => {}
        }
    }

    let name = extended.or(plain)?;
    Path::new(&name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
}

impl MendeleyClient {
    pub async fn list_files(&self, params: &FileParams) -> Result<ResponseEnvelope<Vec<File>>> {
        let url = self.endpoint_with_query("files", &params.query())?;
        self.list_resources(url).await
    }

    /// Download the binary of a file to `target`
    ///
    /// The download registers under `file_id` so that
    /// [`cancel_download`](Self::cancel_download) can stop it. Returns the
    /// number of bytes written.
    pub async fn download_file(
        &self,
        file_id: Uuid,
        target: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<u64> {
        let id = file_id.to_string();
        let handle = self.downloads().register(&id);
        let result = self
            .download_file_with_token(file_id, target, progress, handle.token())
            .await;
        handle.finish(&result);
        result
    }

    /// Download with a caller-owned cancellation token, bypassing the registry
    pub async fn download_file_with_token(
        &self,
        file_id: Uuid,
        target: &Path,
        progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> Result<u64> {
        let response = self.open_file_binary(file_id, &cancel).await?;
        let bytes = stream_to_file(response, target, &file_id.to_string(), progress, &cancel).await?;
        info!(file_id = %file_id, bytes, target = %target.display(), "file downloaded");
        Ok(bytes)
    }

    /// Download into `dir`, naming the file after the server's
    /// `Content-Disposition`
    ///
    /// Falls back to the file id when the server sends no usable name.
    /// Returns the path written and its size.
    pub async fn download_file_to_dir(
        &self,
        file_id: Uuid,
        dir: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<(PathBuf, u64)> {
        let id = file_id.to_string();
        let handle = self.downloads().register(&id);
        let cancel = handle.token();

        let result = async {
            let response = self.open_file_binary(file_id, &cancel).await?;
            let name = response
                .headers()
                .content_disposition
                .as_deref()
                .and_then(disposition_file_name)
                .unwrap_or_else(|| id.clone());
            let target = dir.join(name);
            let bytes = stream_to_file(response, &target, &id, progress, &cancel).await?;
            info!(file_id = %file_id, bytes, target = %target.display(), "file downloaded");
            Ok::<_, MendeleyError>((target, bytes))
        }
        .await;

        handle.finish(&result);
        result
    }

    /// Resolve the storage location of a file and open its binary
    async fn open_file_binary(
        &self,
        file_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse> {
        let id = file_id.to_string();

        let redirect = RequestDescriptor::get(self.endpoint(&format!("files/{}", file_id))?)
            .expect_status(&[StatusCode::SEE_OTHER])
            .with_cancellation(cancel.clone());
        let response = self.execute(&redirect).await?;

        let location = response
            .headers()
            .location
            .clone()
            .ok_or_else(|| MendeleyError::download("Redirect without Location header", &id))?;
        let location = redirect
            .url()
            .join(&location)
            .map_err(|e| MendeleyError::download(format!("Invalid Location: {}", e), &id))?;
        drop(response);

        // Storage URLs are pre-signed; the bearer token must not leak to them
        let binary = RequestDescriptor::get(location).with_cancellation(cancel.clone());
        self.transport().send(&binary, None).await
    }

    /// Cancel a download started with [`download_file`](Self::download_file)
    pub fn cancel_download(&self, file_id: Uuid) -> bool {
        self.downloads().cancel(&file_id.to_string())
    }

    /// Attach the file at `path` to a document
    ///
    /// `content_type` is the MIME type of the binary (`application/pdf`, ...).
    pub async fn upload_file(
        &self,
        document_id: Uuid,
        path: PathBuf,
        content_type: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<ResponseEnvelope<File>> {
        self.upload_file_with_token(document_id, path, content_type, progress, CancellationToken::new())
            .await
    }

    pub async fn upload_file_with_token(
        &self,
        document_id: Uuid,
        path: PathBuf,
        content_type: &str,
        progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> Result<ResponseEnvelope<File>> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| MendeleyError::invalid_input(format!("Not a file: {}", path.display())))?;
        let document_link = format!(
            "<{}>; rel=\"document\"",
            self.endpoint(&format!("documents/{}", document_id))?
        );

        let descriptor = RequestDescriptor::post(self.endpoint("files")?)
            .content_type(content_type)
            .header("Content-Disposition", content_disposition(&file_name))
            .header("Link", document_link)
            .file_body(path, progress)
            .with_cancellation(cancel);

        let response = self.execute(&descriptor).await?;
        let (headers, body) = response.bytes(&descriptor.cancellation_token()).await?;
        let file: File = crate::api::codec::decode(&body)?;
        info!(file_id = %file.id, document_id = %document_id, "file uploaded");
        Ok(ResponseEnvelope::new(file, headers, Some(File::CONTENT_TYPE)))
    }

    pub async fn delete_file(&self, file_id: Uuid) -> Result<()> {
        self.delete_resource(self.endpoint(&format!("files/{}", file_id))?)
            .await
    }
}
