//! Client core for the Mendeley Web API
//!
//! Authenticated, typed access to documents, files, folders, annotations,
//! groups, profiles, read positions and the trash, with transparent OAuth2
//! token refresh and `Link`-header pagination.

pub mod api;
pub mod download;
pub mod error;

pub use api::{AppCredentials, ClientConfig, Credentials, InMemoryTokenStore, MendeleyClient, TokenStore};
pub use error::{MendeleyError, Result};
