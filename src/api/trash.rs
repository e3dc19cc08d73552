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


//! Trash endpoint (`/trash`)

use crate::api::client::MendeleyClient;
use crate::api::documents::DocumentParams;
use crate::api::models::Document;
use crate::api::request::{RequestDescriptor, ResponseEnvelope};
use crate::error::Result;
use reqwest::StatusCode;
use uuid::Uuid;

impl MendeleyClient {
    /// First page of trashed documents; accepts the same filters as documents
    pub async fn list_trashed_documents(
        &self,
        params: &DocumentParams,
    ) -> Result<ResponseEnvelope<Vec<Document>>> {
        let url = self.endpoint_with_query("trash", &params.query())?;
        self.list_resources(url).await
    }

    /// Move a trashed document back into the library
    pub async fn restore_trashed_document(&self, id: Uuid) -> Result<()> {
        let descriptor = RequestDescriptor::post(self.endpoint(&format!("trash/{}/restore", id))?)
            .text_body("")
            .expect_status(&[StatusCode::NO_CONTENT]);
        self.fetch_empty(&descriptor).await?;
        Ok(())
    }

    /// Delete a trashed document permanently
    pub async fn delete_trashed_document(&self, id: Uuid) -> Result<()> {
        self.delete_resource(self.endpoint(&format!("trash/{}", id))?)
            .await
    }
}
