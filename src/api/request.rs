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


//! Request descriptors, response envelopes and page references
//!
//! A [`RequestDescriptor`] describes one logical resource operation: method,
//! target URL, content type, body producer, optional `If-Unmodified-Since`
//! precondition and the status codes that count as success. It is built once
//! and never mutated by the executor, so the same descriptor can be re-sent
//! for the single retry after a token refresh.
//!
//! A successful exchange yields a [`ResponseEnvelope`] holding the decoded
//! resource, the selected response headers and, for list endpoints, the
//! [`Page`] references parsed from the `Link` header.

use crate::api::codec;
use crate::download::progress::{ProgressCallback, ProgressMark, ProgressTracker};
use crate::error::{MendeleyError, Result};
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use url::Url;

/// HTTP-date format used by `If-Unmodified-Since` (RFC 7231 IMF-fixdate)
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp as an HTTP-date header value
pub fn format_http_date(date: &DateTime<Utc>) -> String {
    date.format(HTTP_DATE_FORMAT).to_string()
}

/// File streamed as a request body
///
/// The source is re-opened every time the body is produced, so a retried
/// upload starts from the first byte again. Progress of all attempts goes
/// through one [`ProgressMark`].
#[derive(Clone)]
pub struct FileUpload {
    pub path: PathBuf,
    pub progress: Option<ProgressCallback>,
    mark: ProgressMark,
}

impl FileUpload {
    pub fn new(path: PathBuf, progress: Option<ProgressCallback>) -> Self {
        Self {
            path,
            progress,
            mark: ProgressMark::new(),
        }
    }

    /// Tracker for one attempt at sending `total` bytes
    pub fn tracker(&self, total: u64) -> ProgressTracker {
        ProgressTracker::attempt(Some(total), self.progress.clone(), self.mark.clone())
    }

    /// Report completion once the server accepted the upload
    pub fn complete(&self) {
        self.mark.complete(self.progress.as_ref());
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("path", &self.path)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Body producer for a request
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// No body at all
    Empty,
    /// Serialized JSON payload
    Json(Vec<u8>),
    /// Plain text payload (used for empty-bodied POST actions such as trash/restore)
    Text(String),
    /// `application/x-www-form-urlencoded` pairs (token endpoint)
    Form(Vec<(String, String)>),
    /// Binary streamed from disk in fixed-size chunks
    File(FileUpload),
}

/// Immutable description of one resource operation
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    url: Url,
    content_type: Option<String>,
    headers: Vec<(String, String)>,
    body: RequestBody,
    if_unmodified_since: Option<DateTime<Utc>>,
    expected_status: Vec<StatusCode>,
    cancel: CancellationToken,
}

impl RequestDescriptor {
    /// Create a descriptor with the default expected status for the method
    ///
    /// GET/PATCH/PUT expect 200, POST expects 201 and DELETE expects 204.
    pub fn new(method: Method, url: Url) -> Self {
        let expected = match method {
            Method::POST => StatusCode::CREATED,
            Method::DELETE => StatusCode::NO_CONTENT,
            _ => StatusCode::OK,
        };

        Self {
            method,
            url,
            content_type: None,
            headers: Vec::new(),
            body: RequestBody::Empty,
            if_unmodified_since: None,
            expected_status: vec![expected],
            cancel: CancellationToken::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn patch(url: Url) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn put(url: Url) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Set the `Content-Type` header (vendor media type for JSON resources)
    pub fn content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add an extra request header
    pub fn header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Serialize `value` as the JSON body
    pub fn json_body<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.body = RequestBody::Json(codec::encode(value)?);
        Ok(self)
    }

    pub fn text_body<S: Into<String>>(mut self, text: S) -> Self {
        self.body = RequestBody::Text(text.into());
        self
    }

    pub fn form_body(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(pairs);
        self
    }

    /// Stream the file at `path` as the body, reporting upload progress
    pub fn file_body(mut self, path: PathBuf, progress: Option<ProgressCallback>) -> Self {
        self.body = RequestBody::File(FileUpload::new(path, progress));
        self
    }

    /// Only apply the update if the resource was not modified after `date`
    pub fn if_unmodified_since(mut self, date: DateTime<Utc>) -> Self {
        self.if_unmodified_since = Some(date);
        self
    }

    /// Replace the set of status codes that count as success
    pub fn expect_status(mut self, statuses: &[StatusCode]) -> Self {
        self.expected_status = statuses.to_vec();
        self
    }

    /// Use a caller-owned cancellation token for this operation
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn content_type_header(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn if_unmodified_since_header(&self) -> Option<String> {
        self.if_unmodified_since.as_ref().map(format_http_date)
    }

    pub fn expected_status(&self) -> &[StatusCode] {
        &self.expected_status
    }

    pub fn is_expected(&self, status: StatusCode) -> bool {
        self.expected_status.contains(&status)
    }

    /// Token the caller can use to cancel the operation
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with `UserCancelled` if the operation was cancelled
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(MendeleyError::UserCancelled)
        } else {
            Ok(())
        }
    }
}

/// Opaque reference to another page of a list result
///
/// Only valid for the payload type that produced it; the type parameter makes
/// handing a documents page to a files request a compile error.
pub struct Page<T> {
    link: Url,
    content_type: Option<String>,
    _resource: PhantomData<fn() -> T>,
}

impl<T> Page<T> {
    pub(crate) fn new(link: Url, content_type: Option<String>) -> Self {
        Self {
            link,
            content_type,
            _resource: PhantomData,
        }
    }

    /// Absolute URL of the page, exactly as the server sent it
    pub fn link(&self) -> &Url {
        &self.link
    }

    /// Media type of the request that produced this page
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Descriptor requesting this page verbatim
    pub fn to_request(&self) -> RequestDescriptor {
        let descriptor = RequestDescriptor::get(self.link.clone());
        match &self.content_type {
            Some(content_type) => descriptor.content_type(content_type.clone()),
            None => descriptor,
        }
    }
}

impl<T> Clone for Page<T> {
    fn clone(&self) -> Self {
        Self::new(self.link.clone(), self.content_type.clone())
    }
}

impl<T> fmt::Debug for Page<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page").field("link", &self.link.as_str()).finish()
    }
}

impl<T> PartialEq for Page<T> {
    fn eq(&self, other: &Self) -> bool {
        self.link == other.link
    }
}

/// Response headers retained for callers and diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseHeaders {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    /// `X-Mendeley-Trace-Id`, quoted when reporting problems to the API team
    pub trace_id: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub content_disposition: Option<String>,
    /// `Mendeley-Count`, total number of items in a list result
    pub total_count: Option<u64>,
    /// `rel="next"` link
    pub next_link: Option<Url>,
    /// `rel="last"` link
    pub last_link: Option<Url>,
}

/// Decoded result of one successful exchange
#[derive(Debug)]
pub struct ResponseEnvelope<T> {
    pub resource: T,
    pub next: Option<Page<T>>,
    pub last: Option<Page<T>>,
    pub headers: ResponseHeaders,
}

impl<T> ResponseEnvelope<T> {
    /// Wrap a decoded payload, deriving page references from the headers
    pub fn new(resource: T, headers: ResponseHeaders, content_type: Option<&str>) -> Self {
        let content_type = content_type.map(str::to_string);
        let next = headers
            .next_link
            .clone()
            .map(|link| Page::new(link, content_type.clone()));
        let last = headers
            .last_link
            .clone()
            .map(|link| Page::new(link, content_type));

        Self {
            resource,
            next,
            last,
            headers,
        }
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn into_resource(self) -> T {
        self.resource
    }
}
