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


//! OAuth2 credentials and token management
//!
//! # Authentication Flow
//!
//! 1. **Authorization** (external browser):
//!    - [`authorization_url`] builds the `/oauth/authorize` URL with a random state
//!    - The user signs in and is redirected to the app's redirect URI
//!    - [`parse_authorization_callback`] extracts the `code` from that redirect
//!
//! 2. **Code exchange**:
//!    - [`exchange_authorization_code`] posts `grant_type=authorization_code`
//!    - The resulting [`Credentials`] are written to the [`TokenStore`]
//!
//! 3. **Refresh**:
//!    - Access tokens are refreshed when less than 5 minutes remain
//!      (see [`Credentials::needs_refresh`]) or when the API answers
//!      401 "Token has expired"
//!    - [`refresh_access_token`] posts `grant_type=refresh_token`
//!
//! Where the credentials live at rest is up to the host application; this
//! crate only ships [`InMemoryTokenStore`].

use crate::api::request::RequestDescriptor;
use crate::api::transport::Transport;
use crate::error::{MendeleyError, Result};
use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use tracing::{debug, info};
use url::Url;

/// Tokens valid for less than this many seconds are refreshed before use
pub const MIN_TOKEN_VALIDITY_SECS: i64 = 300;

/// Redirect URI registered for desktop and test applications
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost/auth_return";

const SCOPE: &str = "all";
const STATE_LENGTH: usize = 32;

// ============================================================================
// Credentials
// ============================================================================

/// OAuth2 credentials for one signed-in user
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// When the access token stops being accepted; `None` if unknown
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Build credentials from a token endpoint response received at `received_at`
    ///
    /// The endpoint may omit the refresh token on refresh; `previous_refresh`
    /// is carried over in that case.
    pub fn from_token_response(
        response: TokenResponse,
        received_at: DateTime<Utc>,
        previous_refresh: Option<&str>,
    ) -> Result<Self> {
        let expires_at = Duration::try_seconds(response.expires_in)
            .and_then(|lifetime| received_at.checked_add_signed(lifetime))
            .ok_or_else(|| MendeleyError::JsonParsing("expires_in out of range".to_string()))?;

        let refresh_token = response
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(str::to_string))
            .unwrap_or_default();

        Ok(Self {
            access_token: response.access_token,
            refresh_token,
            token_type: response.token_type,
            expires_at: Some(expires_at),
        })
    }

    /// Seconds until the access token expires (negative once expired)
    pub fn seconds_to_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at.map(|at| (at - now).num_seconds())
    }

    /// Check if the access token needs refresh
    ///
    /// True when the expiry is unknown or fewer than
    /// [`MIN_TOKEN_VALIDITY_SECS`] seconds remain.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.seconds_to_expiry(now) {
            None => true,
            Some(seconds) => seconds < MIN_TOKEN_VALIDITY_SECS,
        }
    }

    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Shows first 2 and last 2 characters, replaces middle with asterisks
    fn mask(s: &str) -> String {
        if s.is_empty() {
            "[empty]".to_string()
        } else if s.chars().count() <= 4 {
            "****".to_string()
        } else {
            let chars: Vec<char> = s.chars().collect();
            let first_two: String = chars.iter().take(2).collect();
            let last_two: String = chars.iter().skip(chars.len() - 2).collect();
            format!("{}{}{}", first_two, "*".repeat(chars.len() - 4), last_two)
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &Self::mask(&self.access_token))
            .field("refresh_token", &Self::mask(&self.refresh_token))
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token response from the OAuth token endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until expiration
    pub expires_in: i64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

// ============================================================================
// Token store
// ============================================================================

/// Credential holder shared by all requests of a client
///
/// `store` replaces the whole credential set at once; readers never observe
/// a half-updated state.
pub trait TokenStore: Send + Sync {
    fn credentials(&self) -> Option<Credentials>;

    fn store(&self, credentials: Credentials);

    fn clear(&self);
}

/// Process-local token store
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    inner: RwLock<Option<Credentials>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            inner: RwLock::new(Some(credentials)),
        }
    }
}

impl TokenStore for InMemoryTokenStore {
    fn credentials(&self) -> Option<Credentials> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn store(&self, credentials: Credentials) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(credentials);
    }

    fn clear(&self) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = None;
    }
}

// ============================================================================
// Application registration
// ============================================================================

/// Credentials of the registered Mendeley application
#[derive(Clone, PartialEq, Eq)]
pub struct AppCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl AppCredentials {
    pub fn new<S: Into<String>>(client_id: S, client_secret: S) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
        }
    }

    pub fn with_redirect_uri<S: Into<String>>(mut self, redirect_uri: S) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"****")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// OAuth state parameter for CSRF protection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthState {
    pub value: String,
}

impl OAuthState {
    /// Generate a new random state value
    pub fn generate() -> Self {
        let value = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_LENGTH)
            .map(char::from)
            .collect();
        Self { value }
    }
}

// ============================================================================
// Authorization code flow
// ============================================================================

/// Build the URL the user opens in a browser to grant access
///
/// `authorize_url` is the `/oauth/authorize` endpoint.
pub fn authorization_url(
    authorize_url: &Url,
    app: &AppCredentials,
    state: &OAuthState,
) -> Url {
    let mut url = authorize_url.clone();
    url.query_pairs_mut()
        .append_pair("client_id", &app.client_id)
        .append_pair("redirect_uri", &app.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", SCOPE)
        .append_pair("state", &state.value);
    url
}

/// Extract the authorization code from the redirect the browser landed on
///
/// When `expected_state` is given, a missing or different `state` parameter
/// is rejected.
pub fn parse_authorization_callback(
    callback_url: &str,
    expected_state: Option<&OAuthState>,
) -> Result<String> {
    let url = Url::parse(callback_url)
        .map_err(|e| MendeleyError::InvalidInput(format!("Invalid callback URL: {}", e)))?;

    let params: HashMap<String, String> = url
        .query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    if let Some(error) = params.get("error") {
        let error_desc = params
            .get("error_description")
            .map(|s| s.as_str())
            .unwrap_or("No description");
        return Err(MendeleyError::invalid_input(format!(
            "OAuth error: {} - {}",
            error, error_desc
        )));
    }

    if let Some(expected) = expected_state {
        if params.get("state") != Some(&expected.value) {
            return Err(MendeleyError::invalid_input(
                "OAuth state mismatch in callback",
            ));
        }
    }

    params
        .get("code")
        .filter(|code| !code.is_empty())
        .cloned()
        .ok_or_else(|| MendeleyError::invalid_input("Missing authorization code in callback"))
}

/// Exchange an authorization code for credentials
pub async fn exchange_authorization_code(
    transport: &Transport,
    token_url: &Url,
    app: &AppCredentials,
    code: &str,
) -> Result<Credentials> {
    let form = vec![
        ("grant_type".to_string(), "authorization_code".to_string()),
        ("redirect_uri".to_string(), app.redirect_uri.clone()),
        ("code".to_string(), code.to_string()),
        ("client_id".to_string(), app.client_id.clone()),
        ("client_secret".to_string(), app.client_secret.clone()),
    ];

    let response = post_token_form(transport, token_url, form).await?;
    info!("authorization code exchanged for access token");
    Credentials::from_token_response(response, Utc::now(), None)
}

/// Run the refresh-token grant
///
/// Returns the raw token response; the caller folds it into [`Credentials`]
/// and stores them.
pub async fn refresh_access_token(
    transport: &Transport,
    token_url: &Url,
    app: &AppCredentials,
    refresh_token: &str,
) -> Result<TokenResponse> {
    if refresh_token.is_empty() {
        return Err(MendeleyError::NotSignedIn);
    }

    let form = vec![
        ("grant_type".to_string(), "refresh_token".to_string()),
        ("redirect_uri".to_string(), app.redirect_uri.clone()),
        ("refresh_token".to_string(), refresh_token.to_string()),
        ("client_id".to_string(), app.client_id.clone()),
        ("client_secret".to_string(), app.client_secret.clone()),
    ];

    let response = post_token_form(transport, token_url, form).await?;
    debug!(expires_in = response.expires_in, "access token refreshed");
    Ok(response)
}

async fn post_token_form(
    transport: &Transport,
    token_url: &Url,
    form: Vec<(String, String)>,
) -> Result<TokenResponse> {
    let descriptor = RequestDescriptor::post(token_url.clone())
        .form_body(form)
        .expect_status(&[StatusCode::OK]);

    let response = transport.send(&descriptor, None).await?;
    let (_, body) = response.bytes(&descriptor.cancellation_token()).await?;

    serde_json::from_slice(&body).map_err(|e| {
        MendeleyError::JsonParsing(format!("Failed to parse token response: {}", e))
    })
}
