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


//! JSON codec and vendor media types
//!
//! Every resource travels as JSON under its own `application/vnd.mendeley-*`
//! media type. [`Resource`] ties a wire type to that media type so endpoint
//! code never spells the string twice.

use crate::api::models::{
    Annotation, Document, DocumentId, File, Folder, Group, Profile, ReadPosition, UserRole,
};
use crate::error::{MendeleyError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const DOCUMENT_TYPE: &str = "application/vnd.mendeley-document.1+json";
pub const FILE_TYPE: &str = "application/vnd.mendeley-file.1+json";
pub const FOLDER_TYPE: &str = "application/vnd.mendeley-folder.1+json";
pub const FOLDER_UPDATE_TYPE: &str = "application/vnd.mendeley-folder-update-folder.1+json";
pub const FOLDER_ADD_DOCUMENT_TYPE: &str = "application/vnd.mendeley-folder-add-document.1+json";
pub const ANNOTATION_TYPE: &str = "application/vnd.mendeley-annotation.1+json";
pub const GROUP_TYPE: &str = "application/vnd.mendeley-group.1+json";
pub const MEMBERSHIP_TYPE: &str = "application/vnd.mendeley-membership.1+json";
pub const PROFILE_TYPE: &str = "application/vnd.mendeley-profiles.1+json";
pub const READ_POSITION_TYPE: &str = "application/vnd.mendeley-read-position.1+json";
pub const DOCUMENT_TYPES_TYPE: &str = "application/vnd.mendeley-document-type.1+json";
pub const IDENTIFIER_TYPES_TYPE: &str = "application/vnd.mendeley-document-identifier.1+json";

/// A type exchanged with the API as JSON under a fixed media type
pub trait Resource: Serialize + DeserializeOwned + Send + 'static {
    const CONTENT_TYPE: &'static str;
}

impl Resource for Document {
    const CONTENT_TYPE: &'static str = DOCUMENT_TYPE;
}

impl Resource for DocumentId {
    const CONTENT_TYPE: &'static str = DOCUMENT_TYPE;
}

impl Resource for File {
    const CONTENT_TYPE: &'static str = FILE_TYPE;
}

impl Resource for Folder {
    const CONTENT_TYPE: &'static str = FOLDER_TYPE;
}

impl Resource for Annotation {
    const CONTENT_TYPE: &'static str = ANNOTATION_TYPE;
}

impl Resource for Group {
    const CONTENT_TYPE: &'static str = GROUP_TYPE;
}

impl Resource for UserRole {
    const CONTENT_TYPE: &'static str = MEMBERSHIP_TYPE;
}

impl Resource for Profile {
    const CONTENT_TYPE: &'static str = PROFILE_TYPE;
}

impl Resource for ReadPosition {
    const CONTENT_TYPE: &'static str = READ_POSITION_TYPE;
}

/// Format a timestamp the way list filters (`modified_since`, ...) expect it
pub fn format_timestamp(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode a response body
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        let preview: String = String::from_utf8_lossy(body).chars().take(120).collect();
        MendeleyError::JsonParsing(format!("{} (body: {})", e, preview))
    })
}

/// Encode a request body
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_malformed_is_json_parsing() {
        let err = decode::<Vec<Document>>(b"[{\"title\": ").unwrap_err();
        assert!(matches!(err, MendeleyError::JsonParsing(_)));
    }

    #[test]
    fn test_decode_wrong_shape_is_json_parsing() {
        let err = decode::<Vec<Folder>>(b"{\"name\": \"not a list\"}").unwrap_err();
        assert!(matches!(err, MendeleyError::JsonParsing(_)));
    }

    #[test]
    fn test_format_timestamp() {
        use chrono::TimeZone;
        let date = Utc.with_ymd_and_hms(2014, 2, 20, 16, 53, 25).unwrap();
        assert_eq!(format_timestamp(&date), "2014-02-20T16:53:25.000Z");
    }

    #[test]
    fn test_encode_folder() {
        let bytes = encode(&Folder::new("Reading list")).unwrap();
        assert_eq!(bytes, br#"{"name":"Reading list"}"#.to_vec());
    }
}
