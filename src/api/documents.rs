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


//! Documents endpoint (`/documents`)
//!
//! Lists are paginated: follow [`ResponseEnvelope::next`] with
//! [`MendeleyClient::next_page`]. Updates are PATCHes that can be guarded
//! with `If-Unmodified-Since`; a 412 means the server copy changed first.

use crate::api::client::MendeleyClient;
use crate::api::codec::{
    format_timestamp, DOCUMENT_TYPE, DOCUMENT_TYPES_TYPE, IDENTIFIER_TYPES_TYPE,
};
use crate::api::models::{Document, DocumentId, TypeDescription};
use crate::api::request::{RequestDescriptor, ResponseEnvelope};
use crate::error::Result;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

/// Which fields the server includes in each document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentView {
    /// Bibliographic fields
    Bib,
    /// Fields used by desktop clients (read/starred/...)
    Client,
    Tags,
    Patent,
    All,
}

impl DocumentView {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bib => "bib",
            Self::Client => "client",
            Self::Tags => "tags",
            Self::Patent => "patent",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSort {
    LastModified,
    Created,
    Title,
}

impl DocumentSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastModified => "last_modified",
            Self::Created => "created",
            Self::Title => "title",
        }
    }
}

/// Query parameters for document (and trash) listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentParams {
    pub view: Option<DocumentView>,
    pub group_id: Option<Uuid>,
    pub modified_since: Option<DateTime<Utc>>,
    pub deleted_since: Option<DateTime<Utc>>,
    /// Page size
    pub limit: Option<u32>,
    pub order: Option<SortOrder>,
    pub sort: Option<DocumentSort>,
}

impl DocumentParams {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(view) = self.view {
            query.push(("view", view.as_str().to_string()));
        }
        if let Some(group_id) = self.group_id {
            query.push(("group_id", group_id.to_string()));
        }
        if let Some(since) = &self.modified_since {
            query.push(("modified_since", format_timestamp(since)));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(order) = self.order {
            query.push(("order", order.as_str().to_string()));
        }
        if let Some(sort) = self.sort {
            query.push(("sort", sort.as_str().to_string()));
        }
        if let Some(since) = &self.deleted_since {
            query.push(("deleted_since", format_timestamp(since)));
        }
        query
    }
}

impl MendeleyClient {
    /// First page of the user's (or a group's) documents
    pub async fn list_documents(
        &self,
        params: &DocumentParams,
    ) -> Result<ResponseEnvelope<Vec<Document>>> {
        let url = self.endpoint_with_query("documents", &params.query())?;
        self.list_resources(url).await
    }

    /// Ids of documents deleted after `since`
    pub async fn list_deleted_documents(
        &self,
        since: DateTime<Utc>,
        group_id: Option<Uuid>,
    ) -> Result<ResponseEnvelope<Vec<DocumentId>>> {
        let params = DocumentParams {
            deleted_since: Some(since),
            group_id,
            ..Default::default()
        };
        let url = self.endpoint_with_query("documents", &params.query())?;
        self.list_resources(url).await
    }

    pub async fn get_document(
        &self,
        id: Uuid,
        view: Option<DocumentView>,
    ) -> Result<ResponseEnvelope<Document>> {
        let query: Vec<(&str, String)> = view
            .map(|v| vec![("view", v.as_str().to_string())])
            .unwrap_or_default();
        let url = self.endpoint_with_query(&format!("documents/{}", id), &query)?;
        self.get_resource(url).await
    }

    pub async fn create_document(&self, document: &Document) -> Result<ResponseEnvelope<Document>> {
        let created = self
            .create_resource(self.endpoint("documents")?, document)
            .await?;
        info!(id = ?created.resource.id, "document created");
        Ok(created)
    }

    /// Apply `changes` to a document
    ///
    /// With `if_unmodified_since` set, the server rejects the update with 412
    /// if the document changed after that instant.
    pub async fn patch_document(
        &self,
        id: Uuid,
        changes: &Document,
        if_unmodified_since: Option<DateTime<Utc>>,
    ) -> Result<ResponseEnvelope<Document>> {
        let url = self.endpoint(&format!("documents/{}", id))?;
        self.patch_resource(url, DOCUMENT_TYPE, changes, if_unmodified_since)
            .await
    }

    /// Move a document to the trash
    pub async fn trash_document(&self, id: Uuid) -> Result<()> {
        let descriptor = RequestDescriptor::post(self.endpoint(&format!("documents/{}/trash", id))?)
            .text_body("")
            .expect_status(&[StatusCode::NO_CONTENT]);
        self.fetch_empty(&descriptor).await?;
        Ok(())
    }

    /// Delete a document without going through the trash
    pub async fn delete_document(&self, id: Uuid) -> Result<()> {
        self.delete_resource(self.endpoint(&format!("documents/{}", id))?)
            .await
    }

    /// Document types the server accepts, keyed by wire name
    pub async fn get_document_types(&self) -> Result<ResponseEnvelope<BTreeMap<String, String>>> {
        self.get_type_catalogue("document_types", DOCUMENT_TYPES_TYPE)
            .await
    }

    /// Identifier kinds (`doi`, `isbn`, ...) keyed by wire name
    pub async fn get_identifier_types(&self) -> Result<ResponseEnvelope<BTreeMap<String, String>>> {
        self.get_type_catalogue("identifier_types", IDENTIFIER_TYPES_TYPE)
            .await
    }

    async fn get_type_catalogue(
        &self,
        path: &str,
        content_type: &'static str,
    ) -> Result<ResponseEnvelope<BTreeMap<String, String>>> {
        let descriptor = RequestDescriptor::get(self.endpoint(path)?).content_type(content_type);
        let listed = self.fetch::<Vec<TypeDescription>>(&descriptor).await?;
        let types = listed
            .resource
            .into_iter()
            .map(|t| (t.name, t.description))
            .collect();
        Ok(ResponseEnvelope::new(types, listed.headers, Some(content_type)))
    }
}
