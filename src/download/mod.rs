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


//! File transfer support
//!
//! - [`progress`] - percentage reporting shared by uploads and downloads
//! - [`stream`] - writing a response body to disk through a `.part` file
//! - [`manager`] - registry of running downloads, cancellable by file id

pub mod manager;
pub mod progress;
pub mod stream;

// Re-export commonly used types
pub use manager::{DownloadHandle, DownloadRegistry};
pub use progress::{DownloadState, ProgressCallback, ProgressMark, ProgressTracker};
