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


//! Folders endpoint (`/folders`)

use crate::api::client::MendeleyClient;
use crate::api::codec::{FOLDER_ADD_DOCUMENT_TYPE, FOLDER_UPDATE_TYPE};
use crate::api::models::{DocumentId, Folder};
use crate::api::request::{RequestDescriptor, ResponseEnvelope};
use crate::error::Result;
use uuid::Uuid;

/// Query parameters for folder listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderParams {
    pub group_id: Option<Uuid>,
    pub limit: Option<u32>,
}

impl FolderParams {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(id) = self.group_id {
            query.push(("group_id", id.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        query
    }
}

impl MendeleyClient {
    pub async fn list_folders(&self, params: &FolderParams) -> Result<ResponseEnvelope<Vec<Folder>>> {
        let url = self.endpoint_with_query("folders", &params.query())?;
        self.list_resources(url).await
    }

    pub async fn get_folder(&self, id: Uuid) -> Result<ResponseEnvelope<Folder>> {
        self.get_resource(self.endpoint(&format!("folders/{}", id))?)
            .await
    }

    pub async fn create_folder(&self, folder: &Folder) -> Result<ResponseEnvelope<Folder>> {
        self.create_resource(self.endpoint("folders")?, folder).await
    }

    /// Rename or move a folder
    pub async fn patch_folder(&self, id: Uuid, changes: &Folder) -> Result<ResponseEnvelope<Folder>> {
        let url = self.endpoint(&format!("folders/{}", id))?;
        self.patch_resource(url, FOLDER_UPDATE_TYPE, changes, None)
            .await
    }

    pub async fn delete_folder(&self, id: Uuid) -> Result<()> {
        self.delete_resource(self.endpoint(&format!("folders/{}", id))?)
            .await
    }

    /// Ids of the documents filed in a folder
    pub async fn list_folder_documents(
        &self,
        folder_id: Uuid,
        limit: Option<u32>,
    ) -> Result<ResponseEnvelope<Vec<DocumentId>>> {
        let query: Vec<(&str, String)> = limit
            .map(|l| vec![("limit", l.to_string())])
            .unwrap_or_default();
        let url = self.endpoint_with_query(&format!("folders/{}/documents", folder_id), &query)?;
        self.list_resources(url).await
    }

    pub async fn add_document_to_folder(&self, folder_id: Uuid, document_id: Uuid) -> Result<()> {
        let descriptor = RequestDescriptor::post(self.endpoint(&format!("folders/{}/documents", folder_id))?)
            .content_type(FOLDER_ADD_DOCUMENT_TYPE)
            .json_body(&DocumentId { id: document_id })?;
        self.fetch_empty(&descriptor).await?;
        Ok(())
    }

    pub async fn remove_document_from_folder(&self, folder_id: Uuid, document_id: Uuid) -> Result<()> {
        let url = self.endpoint(&format!("folders/{}/documents/{}", folder_id, document_id))?;
        self.delete_resource(url).await
    }
}
