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


//! Annotations endpoint (`/annotations`)

use crate::api::client::MendeleyClient;
use crate::api::codec::{format_timestamp, ANNOTATION_TYPE};
use crate::api::models::Annotation;
use crate::api::request::ResponseEnvelope;
use crate::error::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Query parameters for annotation listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationParams {
    pub document_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub include_trashed: Option<bool>,
    pub modified_since: Option<DateTime<Utc>>,
    pub deleted_since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl AnnotationParams {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(id) = self.document_id {
            query.push(("document_id", id.to_string()));
        }
        if let Some(id) = self.group_id {
            query.push(("group_id", id.to_string()));
        }
        if let Some(include) = self.include_trashed {
            query.push(("include_trashed", include.to_string()));
        }
        if let Some(since) = &self.modified_since {
            query.push(("modified_since", format_timestamp(since)));
        }
        if let Some(since) = &self.deleted_since {
            query.push(("deleted_since", format_timestamp(since)));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        query
    }
}

impl MendeleyClient {
    pub async fn list_annotations(
        &self,
        params: &AnnotationParams,
    ) -> Result<ResponseEnvelope<Vec<Annotation>>> {
        let url = self.endpoint_with_query("annotations", &params.query())?;
        self.list_resources(url).await
    }

    pub async fn get_annotation(&self, id: Uuid) -> Result<ResponseEnvelope<Annotation>> {
        self.get_resource(self.endpoint(&format!("annotations/{}", id))?)
            .await
    }

    pub async fn create_annotation(&self, annotation: &Annotation) -> Result<ResponseEnvelope<Annotation>> {
        self.create_resource(self.endpoint("annotations")?, annotation)
            .await
    }

    pub async fn patch_annotation(
        &self,
        id: Uuid,
        changes: &Annotation,
    ) -> Result<ResponseEnvelope<Annotation>> {
        let url = self.endpoint(&format!("annotations/{}", id))?;
        self.patch_resource(url, ANNOTATION_TYPE, changes, None)
            .await
    }

    pub async fn delete_annotation(&self, id: Uuid) -> Result<()> {
        self.delete_resource(self.endpoint(&format!("annotations/{}", id))?)
            .await
    }
}
