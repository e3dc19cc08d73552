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


//! Registry of in-flight file downloads
//!
//! Each running download registers its file id with a fresh
//! [`CancellationToken`], so another task can cancel it by id. The
//! registration is released when its [`DownloadHandle`] is finished or
//! dropped, and the outcome is kept as the file's last [`DownloadState`].
//! Only the most recent outcomes are kept (see
//! [`DownloadRegistry::with_history_limit`]).

use crate::download::progress::DownloadState;
use crate::error::MendeleyError;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug)]
struct ActiveDownload {
    /// Distinguishes two downloads of the same file id
    generation: u64,
    token: CancellationToken,
}

/// Number of finished download outcomes kept by default
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

#[derive(Debug, Default)]
struct Registry {
    active: HashMap<String, ActiveDownload>,
    finished: HashMap<String, DownloadState>,
    /// File ids in `finished`, oldest first
    finished_order: VecDeque<String>,
}

impl Registry {
    fn forget_finished(&mut self, file_id: &str) {
        if self.finished.remove(file_id).is_some() {
            self.finished_order.retain(|id| id != file_id);
        }
    }
}

/// Tracks running downloads by file id
#[derive(Debug)]
pub struct DownloadRegistry {
    inner: Mutex<Registry>,
    generation: AtomicU64,
    history_limit: usize,
}

impl Default for DownloadRegistry {
    fn default() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl DownloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry remembering the outcome of at most `limit` finished downloads
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            inner: Mutex::new(Registry::default()),
            generation: AtomicU64::new(0),
            history_limit: limit,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a download of `file_id`
    ///
    /// A download already running for the same id stays cancellable through
    /// its own token but is no longer reachable by id.
    pub fn register(self: &Arc<Self>, file_id: &str) -> DownloadHandle {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let mut registry = self.lock();
        registry.active.insert(
            file_id.to_string(),
            ActiveDownload {
                generation,
                token: token.clone(),
            },
        );
        registry.forget_finished(file_id);

        DownloadHandle {
            registry: Arc::clone(self),
            file_id: file_id.to_string(),
            generation,
            token,
            finished: false,
        }
    }

    /// Cancel the running download of `file_id`; false if none is running
    pub fn cancel(&self, file_id: &str) -> bool {
        match self.lock().active.get(file_id) {
            Some(active) => {
                info!(file_id, "cancelling download");
                active.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for active in self.lock().active.values() {
            active.token.cancel();
        }
    }

    pub fn is_active(&self, file_id: &str) -> bool {
        self.lock().active.contains_key(file_id)
    }

    pub fn active_downloads(&self) -> Vec<String> {
        self.lock().active.keys().cloned().collect()
    }

    /// State of the current or most recent download of `file_id`
    pub fn state(&self, file_id: &str) -> Option<DownloadState> {
        let registry = self.lock();
        if registry.active.contains_key(file_id) {
            return Some(DownloadState::Downloading);
        }
        registry.finished.get(file_id).copied()
    }

    fn release(&self, file_id: &str, generation: u64, state: DownloadState) {
        let mut registry = self.lock();
        let current = registry
            .active
            .get(file_id)
            .map_or(false, |active| active.generation == generation);
        if !current {
            return;
        }

        registry.active.remove(file_id);
        registry.forget_finished(file_id);
        registry.finished.insert(file_id.to_string(), state);
        registry.finished_order.push_back(file_id.to_string());

        while registry.finished_order.len() > self.history_limit {
            if let Some(oldest) = registry.finished_order.pop_front() {
                registry.finished.remove(&oldest);
            }
        }
    }
}

/// Registration of one running download
#[derive(Debug)]
pub struct DownloadHandle {
    registry: Arc<DownloadRegistry>,
    file_id: String,
    generation: u64,
    token: CancellationToken,
    finished: bool,
}

impl DownloadHandle {
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Release the registration, recording the outcome of `result`
    pub fn finish<T>(mut self, result: &Result<T, MendeleyError>) {
        let state = match result {
            Ok(_) => DownloadState::Completed,
            Err(e) if e.is_cancelled() => DownloadState::Cancelled,
            Err(_) => DownloadState::Failed,
        };
        self.registry.release(&self.file_id, self.generation, state);
        self.finished = true;
    }
}

impl Drop for DownloadHandle {
    fn drop(&mut self) {
        if !self.finished {
            // Future dropped mid-download
            self.registry
                .release(&self.file_id, self.generation, DownloadState::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_by_file_id() {
        let registry = Arc::new(DownloadRegistry::new());
        let handle = registry.register("file-1");

        assert!(registry.is_active("file-1"));
        assert_eq!(registry.state("file-1"), Some(DownloadState::Downloading));
        assert!(registry.cancel("file-1"));
        assert!(handle.token().is_cancelled());
        assert!(!registry.cancel("file-2"));

        handle.finish::<()>(&Err(MendeleyError::UserCancelled));
        assert!(!registry.is_active("file-1"));
        assert_eq!(registry.state("file-1"), Some(DownloadState::Cancelled));
    }

    #[test]
    fn test_finish_records_outcome() {
        let registry = Arc::new(DownloadRegistry::new());

        registry.register("ok").finish(&Ok(10u64));
        assert_eq!(registry.state("ok"), Some(DownloadState::Completed));

        registry
            .register("bad")
            .finish::<u64>(&Err(MendeleyError::download("Write failed", "bad")));
        assert_eq!(registry.state("bad"), Some(DownloadState::Failed));
    }

    #[test]
    fn test_drop_releases_registration() {
        let registry = Arc::new(DownloadRegistry::new());
        {
            let _handle = registry.register("file-1");
            assert_eq!(registry.active_downloads(), vec!["file-1".to_string()]);
        }
        assert!(registry.active_downloads().is_empty());
        assert_eq!(registry.state("file-1"), Some(DownloadState::Cancelled));
    }

    #[test]
    fn test_finished_history_is_bounded() {
        let registry = Arc::new(DownloadRegistry::with_history_limit(3));
        for i in 0..10 {
            registry.register(&format!("file-{}", i)).finish(&Ok(()));
        }

        assert_eq!(registry.state("file-0"), None);
        assert_eq!(registry.state("file-6"), None);
        assert_eq!(registry.state("file-7"), Some(DownloadState::Completed));
        assert_eq!(registry.state("file-9"), Some(DownloadState::Completed));
        assert_eq!(registry.lock().finished.len(), 3);
        assert_eq!(registry.lock().finished_order.len(), 3);
    }

    #[test]
    fn test_redownload_replaces_previous_outcome() {
        let registry = Arc::new(DownloadRegistry::with_history_limit(2));
        registry
            .register("file-1")
            .finish::<()>(&Err(MendeleyError::UserCancelled));
        let handle = registry.register("file-1");
        assert_eq!(registry.state("file-1"), Some(DownloadState::Downloading));

        handle.finish(&Ok(()));
        assert_eq!(registry.state("file-1"), Some(DownloadState::Completed));
        assert_eq!(registry.lock().finished_order.len(), 1);
    }

    #[test]
    fn test_stale_handle_does_not_release_newer_download() {
        let registry = Arc::new(DownloadRegistry::new());
        let first = registry.register("file-1");
        let second = registry.register("file-1");

        first.finish(&Ok(()));
        assert!(registry.is_active("file-1"));

        assert!(registry.cancel("file-1"));
        assert!(second.token().is_cancelled());
    }
}
