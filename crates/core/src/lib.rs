pub mod config;
pub mod reannounce;
pub mod testing;
pub mod torrent_client;

pub use config::{
    load_config, load_config_from_str, Config, ConfigError, DelugeConfig, QBittorrentConfig,
};
pub use reannounce::{
    ReannounceController, ReannounceOptions, ReannounceOutcome, StatusReporter, Verdict,
};
pub use torrent_client::{
    DelugeClient, QBittorrentClient, TorrentClient, TorrentClientError, TorrentHandle,
    TrackerRecord, TrackerStatus,
};
