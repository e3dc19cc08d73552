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


//! Groups endpoint (`/groups`)

use crate::api::client::MendeleyClient;
use crate::api::models::{Group, UserRole};
use crate::api::request::ResponseEnvelope;
use crate::error::Result;
use uuid::Uuid;

fn limit_query(limit: Option<u32>) -> Vec<(&'static str, String)> {
    limit.map(|l| vec![("limit", l.to_string())]).unwrap_or_default()
}

impl MendeleyClient {
    /// Groups the signed-in user belongs to
    pub async fn list_groups(&self, limit: Option<u32>) -> Result<ResponseEnvelope<Vec<Group>>> {
        let url = self.endpoint_with_query("groups", &limit_query(limit))?;
        self.list_resources(url).await
    }

    pub async fn get_group(&self, id: Uuid) -> Result<ResponseEnvelope<Group>> {
        self.get_resource(self.endpoint(&format!("groups/{}", id))?)
            .await
    }

    pub async fn list_group_members(
        &self,
        group_id: Uuid,
        limit: Option<u32>,
    ) -> Result<ResponseEnvelope<Vec<UserRole>>> {
        let url = self.endpoint_with_query(&format!("groups/{}/members", group_id), &limit_query(limit))?;
        self.list_resources(url).await
    }
}
