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


//! Mendeley API client implementation
//!
//! - [`client`] - authorized request execution and configuration
//! - [`transport`] - single HTTP exchanges
//! - [`auth`] - credentials, token store and OAuth grants
//! - [`request`] - request descriptors, response envelopes, page references
//! - [`codec`] / [`models`] - JSON wire format
//!
//! The remaining modules add resource operations to [`MendeleyClient`].

pub mod auth;
pub mod client;
pub mod codec;
pub mod models;
pub mod request;
pub mod transport;

pub mod annotations;
pub mod documents;
pub mod files;
pub mod folders;
pub mod groups;
pub mod profiles;
pub mod read_positions;
pub mod trash;

// Re-export commonly used types
pub use auth::{AppCredentials, Credentials, InMemoryTokenStore, OAuthState, TokenStore};
pub use client::{ClientConfig, ClientConfigBuilder, MendeleyClient};
pub use request::{Page, RequestDescriptor, ResponseEnvelope, ResponseHeaders};
