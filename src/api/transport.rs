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


//! HTTP transport for the Mendeley API
//!
//! [`Transport::send`] performs exactly one HTTP exchange for a
//! [`RequestDescriptor`]:
//! - attaches `Authorization: Bearer`, `Content-Type`, `If-Unmodified-Since`
//!   and any extra headers
//! - streams file bodies from disk in fixed-size chunks; an upload fails
//!   once no chunk has moved and no response arrived for the read timeout
//! - validates the status code against the descriptor's expected set
//! - scans the response headers (content type/length, `Link`, trace id)
//!
//! It knows nothing about tokens beyond the string it is handed; refresh and
//! retry live in [`crate::api::client`].
//!
//! Redirects are never followed automatically: the file download flow needs
//! to see the 303 and re-request the `Location` without credentials.

use crate::api::client::ClientConfig;
use crate::api::request::{RequestBody, RequestDescriptor, ResponseHeaders};
use crate::error::{MendeleyError, Result};
use futures_util::StreamExt;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{
    HeaderMap, HeaderValue, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, DATE,
    IF_UNMODIFIED_SINCE, LINK, LOCATION, USER_AGENT,
};
use reqwest::redirect::Policy;
use reqwest::{Body, Client, RequestBuilder, Response, StatusCode};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Diagnostic header identifying the request on the server side
pub const TRACE_ID_HEADER: &str = "X-Mendeley-Trace-Id";

/// Total number of items in a list result
pub const COUNT_HEADER: &str = "Mendeley-Count";

lazy_static! {
    /// One `<url>; rel="name"` entry of a `Link` header
    static ref LINK_ENTRY: Regex =
        Regex::new(r#"<([^>]*)>\s*;\s*rel\s*=\s*"?([A-Za-z-]+)"?"#).expect("valid Link regex");
}

/// Performs single HTTP exchanges against the API
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    read_timeout: Duration,
    upload_chunk_size: usize,
}

impl Transport {
    /// Build the underlying HTTP client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| MendeleyError::InvalidConfiguration(format!("Invalid user agent: {}", e)))?,
        );

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .default_headers(headers)
            .redirect(Policy::none())
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| MendeleyError::InvalidConfiguration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            read_timeout: config.read_timeout,
            upload_chunk_size: config.upload_chunk_size.max(1),
        })
    }

    /// Underlying reqwest client
    pub fn http(&self) -> &Client {
        &self.client
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Execute one exchange for `descriptor`
    ///
    /// `access_token` is attached as a bearer token when present. A status
    /// outside the descriptor's expected set becomes
    /// [`MendeleyError::HttpResponse`] carrying the server's error body.
    pub async fn send(
        &self,
        descriptor: &RequestDescriptor,
        access_token: Option<&str>,
    ) -> Result<TransportResponse> {
        descriptor.check_cancelled()?;

        let mut builder = self
            .client
            .request(descriptor.method().clone(), descriptor.url().clone());

        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(content_type) = descriptor.content_type_header() {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(date) = descriptor.if_unmodified_since_header() {
            builder = builder.header(IF_UNMODIFIED_SINCE, date);
        }
        for (name, value) in descriptor.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let (builder, activity) = self.attach_body(builder, descriptor).await?;

        debug!(method = %descriptor.method(), url = %descriptor.url(), "sending API request");

        let sent = match activity {
            // Upload duration grows with the file; bound the idle time instead
            Some(activity) => send_until_idle(builder.send(), &activity, self.read_timeout)
                .await
                .ok_or_else(|| read_timeout_error(descriptor.url()))?,
            None => timeout(self.read_timeout, builder.send())
                .await
                .map_err(|_| read_timeout_error(descriptor.url()))?,
        };

        let response = match sent {
            Ok(response) => response,
            Err(_) if descriptor.is_cancelled() => return Err(MendeleyError::UserCancelled),
            Err(e) => return Err(e.into()),
        };
        descriptor.check_cancelled()?;

        let status = response.status();
        let headers = parse_response_headers(response.headers(), response.url());

        debug!(
            method = %descriptor.method(),
            url = %descriptor.url(),
            status = status.as_u16(),
            trace_id = headers.trace_id.as_deref().unwrap_or("-"),
            "received API response"
        );

        if !descriptor.is_expected(status) {
            let message = read_error_body(response, self.read_timeout).await;
            return Err(MendeleyError::http(status.as_u16(), message));
        }

        if let RequestBody::File(upload) = descriptor.body() {
            upload.complete();
        }

        Ok(TransportResponse {
            status,
            headers,
            response,
            read_timeout: self.read_timeout,
        })
    }

    async fn attach_body(
        &self,
        builder: RequestBuilder,
        descriptor: &RequestDescriptor,
    ) -> Result<(RequestBuilder, Option<UploadActivity>)> {
        let upload = match descriptor.body() {
            RequestBody::Empty => return Ok((builder, None)),
            RequestBody::Json(bytes) => return Ok((builder.body(bytes.clone()), None)),
            RequestBody::Text(text) => {
                let builder = if descriptor.content_type_header().is_none() {
                    builder.header(CONTENT_TYPE, "text/plain")
                } else {
                    builder
                };
                return Ok((builder.body(text.clone()), None));
            }
            RequestBody::Form(pairs) => return Ok((builder.form(pairs), None)),
            RequestBody::File(upload) => upload,
        };

        let file = tokio::fs::File::open(&upload.path).await?;
        let length = file.metadata().await?.len();
        let mut tracker = upload.tracker(length);
        let cancel: CancellationToken = descriptor.cancellation_token();
        let activity = UploadActivity::new();
        let touched = activity.clone();

        let stream = ReaderStream::with_capacity(file, self.upload_chunk_size).map(move |chunk| {
            if cancel.is_cancelled() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Interrupted,
                    "upload cancelled",
                ));
            }
            let chunk = chunk?;
            touched.touch();
            tracker.advance(chunk.len() as u64);
            Ok(chunk)
        });

        let builder = builder
            .header(CONTENT_LENGTH, length)
            .body(Body::wrap_stream(stream));
        Ok((builder, Some(activity)))
    }
}

/// Time the last upload chunk was handed to the connection
#[derive(Debug, Clone)]
struct UploadActivity(Arc<Mutex<Instant>>);

impl UploadActivity {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Instant::now())))
    }

    fn lock(&self) -> MutexGuard<'_, Instant> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn touch(&self) {
        *self.lock() = Instant::now();
    }

    fn last(&self) -> Instant {
        *self.lock()
    }
}

/// Await `request` while upload chunks keep moving
///
/// Returns `None` once nothing happened for `idle`: neither a chunk was sent
/// nor did the response arrive.
async fn send_until_idle<F: Future>(
    request: F,
    activity: &UploadActivity,
    idle: Duration,
) -> Option<F::Output> {
    tokio::pin!(request);
    loop {
        let deadline = activity.last() + idle;
        tokio::select! {
            output = &mut request => return Some(output),
            _ = sleep_until(deadline) => {
                if activity.last() + idle <= Instant::now() {
                    return None;
                }
            }
        }
    }
}

/// Successful response, body not yet consumed
#[derive(Debug)]
pub struct TransportResponse {
    status: StatusCode,
    headers: ResponseHeaders,
    response: Response,
    read_timeout: Duration,
}

impl TransportResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    /// Read the whole body, honouring the read timeout per chunk and cancellation
    pub async fn bytes(self, cancel: &CancellationToken) -> Result<(ResponseHeaders, Vec<u8>)> {
        let TransportResponse {
            headers,
            mut response,
            read_timeout,
            ..
        } = self;

        let mut body = Vec::with_capacity(headers.content_length.unwrap_or(0).min(1 << 20) as usize);
        loop {
            let chunk = timeout(read_timeout, response.chunk())
                .await
                .map_err(|_| read_timeout_error(response.url()))??;
            if cancel.is_cancelled() {
                return Err(MendeleyError::UserCancelled);
            }
            match chunk {
                Some(chunk) => body.extend_from_slice(&chunk),
                None => break,
            }
        }

        Ok((headers, body))
    }

    /// Split into the parsed headers and the raw response for streaming consumers
    pub(crate) fn into_parts(self) -> (ResponseHeaders, Response, Duration) {
        (self.headers, self.response, self.read_timeout)
    }
}

pub(crate) fn read_timeout_error(url: &Url) -> MendeleyError {
    MendeleyError::network_error(format!("Timed out reading from {}", url), true)
}

/// Read an error body as UTF-8 text; an unreadable body yields an empty message
async fn read_error_body(response: Response, read_timeout: Duration) -> String {
    match timeout(read_timeout, response.bytes()).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        _ => String::new(),
    }
}

/// Scan the headers the client cares about
///
/// Relative `Link` targets are resolved against `base`.
pub fn parse_response_headers(headers: &HeaderMap, base: &Url) -> ResponseHeaders {
    let text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let mut parsed = ResponseHeaders {
        content_type: text(CONTENT_TYPE.as_str()),
        content_length: text(CONTENT_LENGTH.as_str()).and_then(|v| v.trim().parse().ok()),
        trace_id: text(TRACE_ID_HEADER),
        date: text(DATE.as_str()),
        location: text(LOCATION.as_str()),
        content_disposition: text(CONTENT_DISPOSITION.as_str()),
        total_count: text(COUNT_HEADER).and_then(|v| v.trim().parse().ok()),
        next_link: None,
        last_link: None,
    };

    for value in headers.get_all(LINK).iter() {
        let Ok(value) = value.to_str() else { continue };
        for (target, rel) in parse_link_header(value) {
            let Ok(link) = base.join(&target) else { continue };
            match rel.as_str() {
                "next" => parsed.next_link = Some(link),
                "last" => parsed.last_link = Some(link),
                _ => {}
            }
        }
    }

    parsed
}

/// Split a `Link` header value into `(target, rel)` pairs
pub fn parse_link_header(value: &str) -> Vec<(String, String)> {
    LINK_ENTRY
        .captures_iter(value)
        .map(|caps| (caps[1].to_string(), caps[2].to_ascii_lowercase()))
        .collect()
}
