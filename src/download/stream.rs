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


//! Streaming a response body to disk
//!
//! The body is written to a sibling `<target>.part` file and renamed onto
//! the target only after the last byte arrived. Whatever goes wrong
//! (cancellation, read timeout, disk error, failed rename) the `.part` file
//! is removed, so the target path never holds a partial download.

use crate::api::transport::{read_timeout_error, TransportResponse};
use crate::download::progress::{ProgressCallback, ProgressTracker};
use crate::error::{MendeleyError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Extension of the temporary file a download is written to
pub const PARTIAL_EXTENSION: &str = ".part";

/// Path of the temporary file for `target`
pub fn part_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(PARTIAL_EXTENSION);
    PathBuf::from(name)
}

/// Write the body of `response` to `target`
///
/// Returns the number of bytes written.
pub async fn stream_to_file(
    response: TransportResponse,
    target: &Path,
    file_id: &str,
    progress: Option<ProgressCallback>,
    cancel: &CancellationToken,
) -> Result<u64> {
    let part = part_path(target);

    let result = match write_part(response, &part, file_id, progress, cancel).await {
        Ok(bytes) => promote(&part, target, file_id).await.map(|_| bytes),
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        debug!(file_id, error = %e, "download failed, removing partial file");
        remove_quietly(&part).await;
    }

    result
}

async fn write_part(
    response: TransportResponse,
    part: &Path,
    file_id: &str,
    progress: Option<ProgressCallback>,
    cancel: &CancellationToken,
) -> Result<u64> {
    let (headers, mut response, read_timeout) = response.into_parts();
    let mut tracker = ProgressTracker::new(headers.content_length, progress);

    let file = File::create(part)
        .await
        .map_err(|e| MendeleyError::download(format!("Cannot create {}: {}", part.display(), e), file_id))?;
    let mut writer = BufWriter::new(file);

    loop {
        cancel_check(cancel)?;

        let chunk = timeout(read_timeout, response.chunk())
            .await
            .map_err(|_| read_timeout_error(response.url()))?
            .map_err(|e| MendeleyError::download(format!("Read failed: {}", e), file_id))?;

        let Some(chunk) = chunk else { break };

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| MendeleyError::download(format!("Write failed: {}", e), file_id))?;
        tracker.advance(chunk.len() as u64);
    }

    writer
        .flush()
        .await
        .map_err(|e| MendeleyError::download(format!("Write failed: {}", e), file_id))?;
    drop(writer);

    // The callback may cancel on the last chunk; the target must stay untouched then
    cancel_check(cancel)?;

    Ok(tracker.transferred())
}

fn cancel_check(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(MendeleyError::UserCancelled)
    } else {
        Ok(())
    }
}

async fn promote(part: &Path, target: &Path, file_id: &str) -> Result<()> {
    tokio::fs::rename(part, target).await.map_err(|e| {
        warn!(file_id, error = %e, "cannot rename downloaded file");
        MendeleyError::download("Cannot rename downloaded file", file_id)
    })
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "could not remove partial download");
        }
    }
}
