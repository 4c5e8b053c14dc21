//! Mock torrent client for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::torrent_client::{
    TorrentClient, TorrentClientError, TorrentHandle, TrackerRecord,
};

/// Mock implementation of the TorrentClient trait.
///
/// Tracker responses are scripted: queued responses are consumed in order,
/// after which an optional repeating response is served. Every call is
/// counted so tests can assert attempt budgets.
#[derive(Debug, Default)]
pub struct MockTorrentClient {
    handle: RwLock<Option<TorrentHandle>>,
    tracker_script: Mutex<VecDeque<Result<Vec<TrackerRecord>, TorrentClientError>>>,
    repeat_trackers: RwLock<Option<Vec<TrackerRecord>>>,
    fail_reannounce: AtomicBool,
    torrent_fetches: AtomicUsize,
    tracker_fetches: AtomicUsize,
    reannounces: AtomicUsize,
}

impl MockTorrentClient {
    /// Create a new mock torrent client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handle returned by `fetch_torrent`.
    pub async fn set_handle(&self, handle: TorrentHandle) {
        *self.handle.write().await = Some(handle);
    }

    /// Queue one tracker response.
    pub async fn push_trackers(&self, records: Vec<TrackerRecord>) {
        self.tracker_script.lock().await.push_back(Ok(records));
    }

    /// Queue one tracker fetch failure.
    pub async fn push_tracker_error(&self, error: TorrentClientError) {
        self.tracker_script.lock().await.push_back(Err(error));
    }

    /// Response served once the queue is empty.
    pub async fn set_repeat_trackers(&self, records: Vec<TrackerRecord>) {
        *self.repeat_trackers.write().await = Some(records);
    }

    /// Make every `force_reannounce` call fail.
    pub fn set_fail_reannounce(&self, fail: bool) {
        self.fail_reannounce.store(fail, Ordering::SeqCst);
    }

    /// Number of `fetch_torrent` calls made.
    pub fn torrent_fetches(&self) -> usize {
        self.torrent_fetches.load(Ordering::SeqCst)
    }

    /// Number of `fetch_trackers` calls made.
    pub fn tracker_fetches(&self) -> usize {
        self.tracker_fetches.load(Ordering::SeqCst)
    }

    /// Number of `force_reannounce` calls made.
    pub fn reannounces(&self) -> usize {
        self.reannounces.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_torrent(&self, hash: &str) -> Result<TorrentHandle, TorrentClientError> {
        self.torrent_fetches.fetch_add(1, Ordering::SeqCst);
        self.handle
            .read()
            .await
            .clone()
            .ok_or_else(|| TorrentClientError::TorrentNotFound(hash.to_string()))
    }

    async fn fetch_trackers(&self, hash: &str) -> Result<Vec<TrackerRecord>, TorrentClientError> {
        self.tracker_fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(scripted) = self.tracker_script.lock().await.pop_front() {
            return scripted;
        }
        if let Some(records) = self.repeat_trackers.read().await.clone() {
            return Ok(records);
        }
        Err(TorrentClientError::TorrentNotFound(hash.to_string()))
    }

    async fn force_reannounce(&self, _hash: &str) -> Result<(), TorrentClientError> {
        self.reannounces.fetch_add(1, Ordering::SeqCst);
        if self.fail_reannounce.load(Ordering::SeqCst) {
            return Err(TorrentClientError::ApiError(
                "simulated reannounce failure".to_string(),
            ));
        }
        Ok(())
    }
}
