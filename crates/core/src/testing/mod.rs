//! Test doubles for the torrent client capability.
//!
//! ```rust,ignore
//! use swarmstart_core::testing::{fixtures, MockTorrentClient};
//!
//! let client = MockTorrentClient::new();
//! client.set_handle(fixtures::handle_added_secs_ago("h1", 10)).await;
//! ```

mod mock_torrent_client;

pub use mock_torrent_client::MockTorrentClient;

pub mod fixtures {
    use chrono::Utc;

    use crate::torrent_client::{TorrentHandle, TrackerRecord, TrackerStatus};

    /// A handle added `secs` seconds before now.
    pub fn handle_added_secs_ago(hash: &str, secs: i64) -> TorrentHandle {
        TorrentHandle {
            hash: hash.to_string(),
            name: format!("Torrent {}", hash),
            added_at: Utc::now() - chrono::Duration::seconds(secs),
            progress: 0.0,
            num_seeds: 0,
            num_peers: 0,
            status_message: String::new(),
            next_announce_secs: Some(1800),
        }
    }

    /// A single tracker record with the given status and seed count.
    pub fn tracker(status: TrackerStatus, message: &str, num_seeds: i64) -> TrackerRecord {
        TrackerRecord {
            url: "http://tracker.example.org:6969/announce".to_string(),
            status,
            message: message.to_string(),
            num_seeds,
            num_peers: 0,
        }
    }
}
