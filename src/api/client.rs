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


//! Authorized request execution for the Mendeley API
//!
//! [`MendeleyClient`] owns the transport, the shared [`TokenStore`] and the
//! application credentials. Every resource operation funnels through
//! [`MendeleyClient::execute`]:
//!
//! 1. **Pre-flight** - read the stored credentials; no access token means
//!    [`MendeleyError::NotSignedIn`] without touching the network. Tokens with
//!    less than 5 minutes left are refreshed first, and a failed refresh ends
//!    the operation.
//! 2. **Send** - one [`Transport::send`] with the token captured in step 1.
//! 3. **Recover** - a 401 whose body says "Token has expired" triggers one
//!    refresh and one re-send with the newly stored token. Whatever the second
//!    attempt returns is final.
//!
//! There is no other retry or backoff. Concurrent requests may each refresh;
//! the last stored credentials win.
//!
//! # Example
//! ```rust,no_run
//! use mendeley_core::api::auth::{AppCredentials, InMemoryTokenStore};
//! use mendeley_core::api::client::MendeleyClient;
//! use mendeley_core::api::documents::DocumentParams;
//! use std::sync::Arc;
//!
//! # async fn example() -> mendeley_core::error::Result<()> {
//! let app = AppCredentials::new("client-id", "client-secret");
//! let client = MendeleyClient::new(app, Arc::new(InMemoryTokenStore::new()))?;
//!
//! let mut page = client.list_documents(&DocumentParams::default()).await?;
//! loop {
//!     for doc in &page.resource {
//!         println!("{}", doc.title);
//!     }
//!     if !page.has_next() {
//!         break;
//!     }
//!     page = client.next_page(page.next.as_ref()).await?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::api::auth::{self, AppCredentials, Credentials, OAuthState, TokenStore};
use crate::api::codec::{self, Resource};
use crate::api::request::{Page, RequestDescriptor, ResponseEnvelope, ResponseHeaders};
use crate::api::transport::{Transport, TransportResponse};
use crate::download::manager::DownloadRegistry;
use crate::error::{MendeleyError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Production API root
pub const DEFAULT_BASE_URL: &str = "https://api.mendeley.com/";

/// Default connect timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default per-read timeout in seconds
const DEFAULT_READ_TIMEOUT_SECS: u64 = 15;

/// Size of the chunks file uploads are streamed in
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 4096;

/// Configuration for MendeleyClient
/// Provides a builder pattern for client customization
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub token_url: Url,
    pub authorize_url: Url,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub user_agent: String,
    pub upload_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let base_url = Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid");
        Self::for_base_url(base_url)
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Defaults with every endpoint rooted at `base_url`
    fn for_base_url(base_url: Url) -> Self {
        let base_url = with_trailing_slash(base_url);
        let token_url = join_or_base(&base_url, "oauth/token");
        let authorize_url = join_or_base(&base_url, "oauth/authorize");

        Self {
            base_url,
            token_url,
            authorize_url,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            user_agent: format!("mendeley-core/{}", env!("CARGO_PKG_VERSION")),
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
        }
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn join_or_base(base: &Url, path: &str) -> Url {
    base.join(path).unwrap_or_else(|_| base.clone())
}

/// Builder for ClientConfig
#[derive(Debug)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    token_url: Option<String>,
    authorize_url: Option<String>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    user_agent: Option<String>,
    upload_chunk_size: Option<usize>,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            token_url: None,
            authorize_url: None,
            connect_timeout: None,
            read_timeout: None,
            user_agent: None,
            upload_chunk_size: None,
        }
    }

    /// API root; the OAuth endpoints default to `oauth/token` and
    /// `oauth/authorize` under it
    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn token_url<S: Into<String>>(mut self, url: S) -> Self {
        self.token_url = Some(url.into());
        self
    }

    pub fn authorize_url<S: Into<String>>(mut self, url: S) -> Self {
        self.authorize_url = Some(url.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn upload_chunk_size(mut self, size: usize) -> Self {
        self.upload_chunk_size = Some(size);
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let parse = |what: &str, value: &str| {
            Url::parse(value).map_err(|e| {
                MendeleyError::InvalidConfiguration(format!("Invalid {} '{}': {}", what, value, e))
            })
        };

        let mut config = match &self.base_url {
            Some(base) => ClientConfig::for_base_url(parse("base URL", base)?),
            None => ClientConfig::default(),
        };

        if let Some(url) = &self.token_url {
            config.token_url = parse("token URL", url)?;
        }
        if let Some(url) = &self.authorize_url {
            config.authorize_url = parse("authorize URL", url)?;
        }
        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout = timeout;
        }
        if let Some(timeout) = self.read_timeout {
            config.read_timeout = timeout;
        }
        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }
        if let Some(size) = self.upload_chunk_size {
            if size == 0 {
                return Err(MendeleyError::InvalidConfiguration(
                    "Upload chunk size must be positive".to_string(),
                ));
            }
            config.upload_chunk_size = size;
        }

        Ok(config)
    }
}

/// Client for the Mendeley API
///
/// Cheap to clone; clones share the token store and connection pool.
#[derive(Clone)]
pub struct MendeleyClient {
    transport: Transport,
    store: Arc<dyn TokenStore>,
    app: AppCredentials,
    config: ClientConfig,
    downloads: Arc<DownloadRegistry>,
}

impl fmt::Debug for MendeleyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MendeleyClient")
            .field("base_url", &self.config.base_url.as_str())
            .field("app", &self.app)
            .field("signed_in", &self.is_signed_in())
            .finish()
    }
}

impl MendeleyClient {
    /// Create a client against the production API
    pub fn new(app: AppCredentials, store: Arc<dyn TokenStore>) -> Result<Self> {
        Self::with_config(app, store, ClientConfig::default())
    }

    pub fn with_config(
        app: AppCredentials,
        store: Arc<dyn TokenStore>,
        config: ClientConfig,
    ) -> Result<Self> {
        let transport = Transport::new(&config)?;
        Ok(Self {
            transport,
            store,
            app,
            config,
            downloads: Arc::new(DownloadRegistry::new()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.store)
    }

    /// Downloads started through this client (and its clones)
    pub fn downloads(&self) -> &Arc<DownloadRegistry> {
        &self.downloads
    }

    /// Absolute URL of an API path such as `documents` or `files/{id}`
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.config.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Absolute URL of an API path with query parameters appended
    pub fn endpoint_with_query(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.endpoint(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// URL the user opens to grant this application access
    pub fn authorization_url(&self, state: &OAuthState) -> Url {
        auth::authorization_url(&self.config.authorize_url, &self.app, state)
    }

    /// Trade an authorization code for credentials and store them
    pub async fn exchange_authorization_code(&self, code: &str) -> Result<()> {
        let credentials = auth::exchange_authorization_code(
            &self.transport,
            &self.config.token_url,
            &self.app,
            code,
        )
        .await?;
        self.store.store(credentials);
        Ok(())
    }

    pub fn is_signed_in(&self) -> bool {
        self.store
            .credentials()
            .map_or(false, |c| c.has_access_token())
    }

    /// Forget the stored credentials
    pub fn sign_out(&self) {
        info!("signing out, clearing stored credentials");
        self.store.clear();
    }

    /// Run the refresh-token grant and store the new credentials
    pub async fn refresh_tokens(&self) -> Result<Credentials> {
        let current = self.store.credentials().ok_or(MendeleyError::NotSignedIn)?;
        if !current.has_refresh_token() {
            return Err(MendeleyError::NotSignedIn);
        }

        let response = auth::refresh_access_token(
            &self.transport,
            &self.config.token_url,
            &self.app,
            &current.refresh_token,
        )
        .await?;

        let refreshed =
            Credentials::from_token_response(response, Utc::now(), Some(&current.refresh_token))?;
        self.store.store(refreshed.clone());
        Ok(refreshed)
    }

    /// Access token valid for at least 5 more minutes, refreshing if needed
    async fn fresh_access_token(&self) -> Result<String> {
        let credentials = self
            .store
            .credentials()
            .filter(Credentials::has_access_token)
            .ok_or(MendeleyError::NotSignedIn)?;

        if !credentials.needs_refresh(Utc::now()) {
            return Ok(credentials.access_token);
        }

        debug!(
            seconds_to_expiry = credentials.seconds_to_expiry(Utc::now()),
            "access token about to expire, refreshing before request"
        );
        Ok(self.refresh_tokens().await?.access_token)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute one authorized operation
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<TransportResponse> {
        let token = self.fresh_access_token().await?;

        match self.transport.send(descriptor, Some(&token)).await {
            Err(e) if e.is_token_expired() => {
                warn!(
                    method = %descriptor.method(),
                    url = %descriptor.url(),
                    "access token rejected as expired, refreshing and retrying once"
                );
                let refreshed = self.refresh_tokens().await?;
                descriptor.check_cancelled()?;
                self.transport
                    .send(descriptor, Some(&refreshed.access_token))
                    .await
            }
            result => result,
        }
    }

    /// Execute and decode the body as `T`
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<ResponseEnvelope<T>> {
        let response = self.execute(descriptor).await?;
        let (headers, body) = response.bytes(&descriptor.cancellation_token()).await?;
        let resource = codec::decode(&body)?;
        Ok(ResponseEnvelope::new(
            resource,
            headers,
            descriptor.content_type_header(),
        ))
    }

    /// Execute an operation whose response body is ignored
    pub async fn fetch_empty(&self, descriptor: &RequestDescriptor) -> Result<ResponseHeaders> {
        let response = self.execute(descriptor).await?;
        Ok(response.headers().clone())
    }

    /// Follow a page reference
    ///
    /// `None` (the previous response had no `rel="next"` link) fails with
    /// [`MendeleyError::NoMorePages`] without a network call.
    pub async fn next_page<T: DeserializeOwned>(
        &self,
        page: Option<&Page<T>>,
    ) -> Result<ResponseEnvelope<T>> {
        let page = page.ok_or(MendeleyError::NoMorePages)?;
        debug!(link = %page.link(), "fetching next page");
        self.fetch(&page.to_request()).await
    }

    // ========================================================================
    // Generic resource operations used by the endpoint modules
    // ========================================================================

    pub(crate) async fn get_resource<R: Resource>(&self, url: Url) -> Result<ResponseEnvelope<R>> {
        self.fetch(&RequestDescriptor::get(url).content_type(R::CONTENT_TYPE))
            .await
    }

    pub(crate) async fn list_resources<R: Resource>(
        &self,
        url: Url,
    ) -> Result<ResponseEnvelope<Vec<R>>> {
        self.fetch(&RequestDescriptor::get(url).content_type(R::CONTENT_TYPE))
            .await
    }

    pub(crate) async fn create_resource<R: Resource>(
        &self,
        url: Url,
        resource: &R,
    ) -> Result<ResponseEnvelope<R>> {
        let descriptor = RequestDescriptor::post(url)
            .content_type(R::CONTENT_TYPE)
            .json_body(resource)?;
        self.fetch(&descriptor).await
    }

    /// PATCH `changes`, optionally guarded by `If-Unmodified-Since`
    pub(crate) async fn patch_resource<R: Resource, B: Serialize + ?Sized>(
        &self,
        url: Url,
        content_type: &str,
        changes: &B,
        if_unmodified_since: Option<DateTime<Utc>>,
    ) -> Result<ResponseEnvelope<R>> {
        let mut descriptor = RequestDescriptor::patch(url)
            .content_type(content_type)
            .json_body(changes)?;
        if let Some(date) = if_unmodified_since {
            descriptor = descriptor.if_unmodified_since(date);
        }
        self.fetch(&descriptor).await
    }

    pub(crate) async fn delete_resource(&self, url: Url) -> Result<()> {
        self.fetch_empty(&RequestDescriptor::delete(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::InMemoryTokenStore;

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url.as_str(), "https://api.mendeley.com/");
        assert_eq!(config.token_url.as_str(), "https://api.mendeley.com/oauth/token");
        assert_eq!(config.authorize_url.as_str(), "https://api.mendeley.com/oauth/authorize");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.read_timeout, Duration::from_secs(15));
        assert_eq!(config.upload_chunk_size, 4096);
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::builder()
            .base_url("http://127.0.0.1:9000/api")
            .read_timeout(Duration::from_secs(2))
            .user_agent("TestAgent/1.0")
            .build()
            .unwrap();

        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:9000/api/");
        assert_eq!(config.token_url.as_str(), "http://127.0.0.1:9000/api/oauth/token");
        assert_eq!(config.read_timeout, Duration::from_secs(2));
        assert_eq!(config.user_agent, "TestAgent/1.0");
    }

    #[test]
    fn test_client_config_builder_rejects_bad_values() {
        assert!(matches!(
            ClientConfig::builder().base_url("not a url").build(),
            Err(MendeleyError::InvalidConfiguration(_))
        ));
        assert!(ClientConfig::builder().upload_chunk_size(0).build().is_err());
    }

    #[test]
    fn test_endpoint_with_query() {
        let client = MendeleyClient::new(
            AppCredentials::new("id", "secret"),
            Arc::new(InMemoryTokenStore::new()),
        )
        .unwrap();

        let url = client
            .endpoint_with_query("/documents", &[("limit", "20".to_string()), ("view", "all".to_string())])
            .unwrap();
        assert_eq!(url.as_str(), "https://api.mendeley.com/documents?limit=20&view=all");
        assert!(!client.is_signed_in());
    }

    #[tokio::test]
    async fn test_next_page_without_link_is_no_more_pages() {
        let client = MendeleyClient::new(
            AppCredentials::new("id", "secret"),
            Arc::new(InMemoryTokenStore::new()),
        )
        .unwrap();

        let result = client.next_page::<Vec<crate::api::models::Document>>(None).await;
        assert!(matches!(result, Err(MendeleyError::NoMorePages)));
    }
}
