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


//! Profiles endpoint (`/profiles`)

use crate::api::client::MendeleyClient;
use crate::api::models::Profile;
use crate::api::request::ResponseEnvelope;
use crate::error::Result;
use uuid::Uuid;

impl MendeleyClient {
    /// Profile of the signed-in user
    pub async fn get_my_profile(&self) -> Result<ResponseEnvelope<Profile>> {
        self.get_resource(self.endpoint("profiles/me")?).await
    }

    pub async fn get_profile(&self, id: Uuid) -> Result<ResponseEnvelope<Profile>> {
        self.get_resource(self.endpoint(&format!("profiles/{}", id))?)
            .await
    }
}
