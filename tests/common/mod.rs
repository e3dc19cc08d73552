//! Shared fixtures for the integration tests

#![allow(dead_code)]

use chrono::{Duration, Utc};
use mendeley_core::{AppCredentials, ClientConfig, Credentials, InMemoryTokenStore, MendeleyClient};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const OLD_TOKEN: &str = "old-access-token";
pub const NEW_TOKEN: &str = "new-access-token";
pub const REFRESH_TOKEN: &str = "refresh-token";

/// Credentials expiring `seconds` from now
pub fn credentials_expiring_in(seconds: i64) -> Credentials {
    Credentials {
        access_token: OLD_TOKEN.to_string(),
        refresh_token: REFRESH_TOKEN.to_string(),
        token_type: "bearer".to_string(),
        expires_at: Some(Utc::now() + Duration::seconds(seconds)),
    }
}

pub fn fresh_credentials() -> Credentials {
    credentials_expiring_in(3600)
}

pub fn client_for(server: &MockServer, credentials: Option<Credentials>) -> (MendeleyClient, Arc<InMemoryTokenStore>) {
    client_with_read_timeout(server, credentials, std::time::Duration::from_secs(5))
}

pub fn client_with_read_timeout(
    server: &MockServer,
    credentials: Option<Credentials>,
    read_timeout: std::time::Duration,
) -> (MendeleyClient, Arc<InMemoryTokenStore>) {
    let store = Arc::new(match credentials {
        Some(credentials) => InMemoryTokenStore::with_credentials(credentials),
        None => InMemoryTokenStore::new(),
    });
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .read_timeout(read_timeout)
        .build()
        .unwrap();
    let client = MendeleyClient::with_config(
        AppCredentials::new("client-id", "client-secret"),
        store.clone(),
        config,
    )
    .unwrap();
    (client, store)
}

/// Token endpoint answering the refresh grant with [`NEW_TOKEN`]
pub fn refresh_grant() -> Mock {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": NEW_TOKEN,
            "refresh_token": "new-refresh-token",
            "token_type": "bearer",
            "expires_in": 3600
        })))
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub fn document_json(index: usize) -> serde_json::Value {
    json!({
        "id": format!("00000000-0000-0000-0000-{:012}", index),
        "title": format!("Document {}", index),
        "type": "journal"
    })
}
