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


//! Transfer progress tracking and reporting
//!
//! Uploads and downloads report an integer percentage through a
//! [`ProgressCallback`]. The percentage is `ceil(bytes * 100 / total)`,
//! held at 99 until the last byte has been transferred so that 100 is only
//! ever reported at completion. Reports are deduplicated and never go
//! backwards. When the total length is unknown nothing is reported.
//!
//! An upload may be sent twice (the retry after a token refresh). Both
//! attempts share one [`ProgressMark`], so the second attempt stays silent
//! until it passes what the first one reported, and 100 waits until the
//! server has accepted the body.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// Callback type for progress updates (percentage, 0-100)
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Lifecycle of a tracked download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadState {
    /// Currently receiving bytes from the server
    Downloading,
    /// Download completed and promoted to its final path
    Completed,
    /// Download failed with error
    Failed,
    /// Download cancelled by user
    Cancelled,
}

/// Percentage of `total` covered by `transferred`, rounded up
///
/// Returns 100 only once `transferred >= total`.
pub fn percent_complete(transferred: u64, total: u64) -> u8 {
    if total == 0 || transferred >= total {
        return 100;
    }
    let percent = (u128::from(transferred) * 100).div_ceil(u128::from(total));
    percent.min(99) as u8
}

/// Highest percentage reported for a transfer, shared across its attempts
#[derive(Debug, Clone, Default)]
pub struct ProgressMark(Arc<Mutex<Option<u8>>>);

impl ProgressMark {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<u8>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Last percentage handed to the callback
    pub fn reported(&self) -> Option<u8> {
        *self.lock()
    }

    /// Record `percent` if it moves past the mark; true when it should be reported
    fn advance_to(&self, percent: u8) -> bool {
        let mut reported = self.lock();
        if reported.map_or(true, |last| percent > last) {
            *reported = Some(percent);
            true
        } else {
            false
        }
    }

    /// Report 100 once the transfer is accepted
    ///
    /// Silent when nothing was reported before (unknown or zero length).
    pub fn complete(&self, callback: Option<&ProgressCallback>) {
        let Some(callback) = callback else { return };
        if self.reported().is_some() && self.advance_to(100) {
            callback(100);
        }
    }
}

/// Progress tracker for one transfer
pub struct ProgressTracker {
    /// Total bytes expected, `None` when the length is unknown
    total: Option<u64>,

    /// Bytes transferred so far
    transferred: u64,

    mark: ProgressMark,

    /// Highest percentage this tracker reports by itself
    ceiling: u8,

    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    /// Create a tracker; a zero or unknown total disables reporting
    pub fn new(total: Option<u64>, callback: Option<ProgressCallback>) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            transferred: 0,
            mark: ProgressMark::new(),
            ceiling: 100,
            callback,
        }
    }

    /// Tracker for one attempt of a transfer that may be retried
    ///
    /// Reports stop at 99; [`ProgressMark::complete`] reports 100 after the
    /// server accepted the transfer.
    pub fn attempt(
        total: Option<u64>,
        callback: Option<ProgressCallback>,
        mark: ProgressMark,
    ) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            transferred: 0,
            mark,
            ceiling: 99,
            callback,
        }
    }

    /// Record `bytes` more transferred bytes and report if the percentage moved
    pub fn advance(&mut self, bytes: u64) {
        self.transferred = self.transferred.saturating_add(bytes);
        self.report();
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Current percentage, `None` when the total is unknown
    pub fn percent(&self) -> Option<u8> {
        self.total.map(|total| percent_complete(self.transferred, total))
    }

    fn report(&mut self) {
        let (Some(percent), Some(callback)) = (self.percent(), self.callback.as_ref()) else {
            return;
        };

        if self.mark.advance_to(percent.min(self.ceiling)) {
            callback(percent.min(self.ceiling));
        }
    }
}
