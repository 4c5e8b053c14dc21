//! Torrent client abstraction.
//!
//! This module provides a `TorrentClient` trait for the operations the
//! reannounce controller needs, with backends for qBittorrent (WebUI API)
//! and Deluge (web JSON-RPC).

mod deluge;
mod qbittorrent;
mod types;

pub use deluge::DelugeClient;
pub use qbittorrent::QBittorrentClient;
pub use types::*;
