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


use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use mendeley_core::api::auth::{parse_authorization_callback, OAuthState};
use mendeley_core::api::documents::DocumentParams;
use mendeley_core::download::ProgressCallback;
use mendeley_core::{AppCredentials, ClientConfig, Credentials, InMemoryTokenStore, MendeleyClient, TokenStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "mendeley-cli")]
#[command(about = "Mendeley CLI - Desktop testing tool", long_about = None)]
struct Cli {
    #[command(flatten)]
    app: AppArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct AppArgs {
    #[arg(long, env = "MENDELEY_CLIENT_ID")]
    client_id: String,

    #[arg(long, env = "MENDELEY_CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,

    #[arg(long, env = "MENDELEY_REDIRECT_URI", default_value = mendeley_core::api::auth::DEFAULT_REDIRECT_URI)]
    redirect_uri: String,

    /// API root, e.g. a staging server
    #[arg(long, env = "MENDELEY_BASE_URL")]
    base_url: Option<String>,
}

#[derive(Args)]
struct TokenArgs {
    #[arg(long, env = "MENDELEY_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    #[arg(long, env = "MENDELEY_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: String,

    /// Expiry of the access token (RFC 3339); unknown means refresh first
    #[arg(long, env = "MENDELEY_EXPIRES_AT")]
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the URL to open in a browser to sign in
    AuthUrl,
    /// Exchange the redirect URL (or bare code) for tokens
    ExchangeCode {
        /// Redirect URL the browser landed on, or the authorization code
        callback: String,
    },
    /// List all documents in the library
    Documents {
        #[command(flatten)]
        tokens: TokenArgs,
        /// Page size
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Download a file binary; Ctrl-C cancels
    Download {
        #[command(flatten)]
        tokens: TokenArgs,
        file_id: Uuid,
        /// Target file, or a directory to keep the server's file name
        target: PathBuf,
    },
    /// Attach a file to a document
    Upload {
        #[command(flatten)]
        tokens: TokenArgs,
        document_id: Uuid,
        path: PathBuf,
        /// MIME type of the file; guessed from the extension when absent
        #[arg(long)]
        content_type: Option<String>,
    },
}

fn build_client(app: &AppArgs, store: Arc<dyn TokenStore>) -> Result<MendeleyClient> {
    let config = match &app.base_url {
        Some(base) => ClientConfig::builder().base_url(base.as_str()).build()?,
        None => ClientConfig::default(),
    };
    let credentials = AppCredentials::new(app.client_id.as_str(), app.client_secret.as_str())
        .with_redirect_uri(app.redirect_uri.as_str());
    Ok(MendeleyClient::with_config(credentials, store, config)?)
}

fn signed_in_client(app: &AppArgs, tokens: &TokenArgs) -> Result<MendeleyClient> {
    let store = InMemoryTokenStore::with_credentials(Credentials {
        access_token: tokens.access_token.clone(),
        refresh_token: tokens.refresh_token.clone(),
        token_type: "bearer".to_string(),
        expires_at: tokens.expires_at,
    });
    build_client(app, Arc::new(store))
}

fn console_progress() -> ProgressCallback {
    Arc::new(|percent| {
        eprint!("\r{:>3}%", percent);
        if percent == 100 {
            eprintln!();
        }
    })
}

fn guess_content_type(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::AuthUrl => {
            let client = build_client(&cli.app, Arc::new(InMemoryTokenStore::new()))?;
            let state = OAuthState::generate();
            println!("{}", client.authorization_url(&state));
            eprintln!("state: {}", state.value);
        }
        Commands::ExchangeCode { callback } => {
            let store = Arc::new(InMemoryTokenStore::new());
            let client = build_client(&cli.app, store.clone())?;
            let code = if callback.contains("://") {
                parse_authorization_callback(&callback, None)?
            } else {
                callback
            };
            client
                .exchange_authorization_code(&code)
                .await
                .context("Authorization code exchange failed")?;
            let credentials = store.credentials().context("No credentials stored")?;
            println!("{}", serde_json::to_string_pretty(&credentials)?);
        }
        Commands::Documents { tokens, limit } => {
            let client = signed_in_client(&cli.app, &tokens)?;
            let params = DocumentParams {
                limit: Some(limit),
                ..Default::default()
            };

            let mut page = client.list_documents(&params).await?;
            if let Some(total) = page.headers.total_count {
                eprintln!("{} documents", total);
            }
            loop {
                for doc in &page.resource {
                    let id = doc.id.map(|id| id.to_string()).unwrap_or_default();
                    println!("{}\t{}", id, doc.title);
                }
                if !page.has_next() {
                    break;
                }
                page = client.next_page(page.next.as_ref()).await?;
            }
        }
        Commands::Download {
            tokens,
            file_id,
            target,
        } => {
            let client = signed_in_client(&cli.app, &tokens)?;
            let canceller = client.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    canceller.cancel_download(file_id);
                }
            });

            let (target, bytes) = if target.is_dir() {
                client
                    .download_file_to_dir(file_id, &target, Some(console_progress()))
                    .await
            } else {
                client
                    .download_file(file_id, &target, Some(console_progress()))
                    .await
                    .map(|bytes| (target, bytes))
            }
            .with_context(|| format!("Download of {} failed", file_id))?;
            eprintln!("{} bytes written to {}", bytes, target.display());
        }
        Commands::Upload {
            tokens,
            document_id,
            path,
            content_type,
        } => {
            let client = signed_in_client(&cli.app, &tokens)?;
            let content_type = content_type.unwrap_or_else(|| guess_content_type(&path).to_string());
            let uploaded = client
                .upload_file(document_id, path, &content_type, Some(console_progress()))
                .await
                .context("Upload failed")?;
            println!("{}", serde_json::to_string_pretty(&uploaded.resource)?);
        }
    }

    Ok(())
}
