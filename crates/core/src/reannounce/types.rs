//! Options and outcome types for a reannounce run.

use serde::{Deserialize, Serialize};

use crate::torrent_client::TorrentClientError;

/// Configuration for one controller run.
///
/// Doubles as the `[reannounce]` config-file section; defaults match the
/// tool's historical flag defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReannounceOptions {
    /// Max polling iterations before giving up.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Seconds slept before each polling iteration.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Additional unconditional reannounces performed after success.
    #[serde(default = "default_extra_attempts")]
    pub extra_attempts: u32,
    /// Seconds slept before each extra reannounce.
    #[serde(default = "default_extra_interval_secs")]
    pub extra_interval_secs: u64,
    /// Torrents older than this many seconds are rejected before any
    /// polling begins.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for ReannounceOptions {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            interval_secs: default_interval_secs(),
            extra_attempts: default_extra_attempts(),
            extra_interval_secs: default_extra_interval_secs(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

fn default_attempts() -> u32 {
    60
}

fn default_interval_secs() -> u64 {
    7
}

fn default_extra_attempts() -> u32 {
    2
}

fn default_extra_interval_secs() -> u64 {
    30
}

fn default_max_age_secs() -> u64 {
    60 * 60
}

/// Terminal result of one controller run.
#[derive(Debug)]
pub enum ReannounceOutcome {
    /// A tracker was confirmed OK before attempts ran out.
    Healthy { seeds: i64 },
    /// Attempts ran out without confirmation. Expected and non-fatal; a
    /// human may follow up.
    Exhausted,
    /// The torrent failed the age precondition; no polling was performed.
    Ineligible { age_secs: i64, max_age_secs: u64 },
    /// An underlying client call failed. Never retried.
    TransportError(TorrentClientError),
}

impl ReannounceOutcome {
    /// Process exit code for this outcome.
    ///
    /// Exhaustion is tolerated as non-fatal; only ineligibility and
    /// transport failures exit non-zero.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReannounceOutcome::Healthy { .. } | ReannounceOutcome::Exhausted => 0,
            ReannounceOutcome::Ineligible { .. } | ReannounceOutcome::TransportError(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = ReannounceOptions::default();
        assert_eq!(options.attempts, 60);
        assert_eq!(options.interval_secs, 7);
        assert_eq!(options.extra_attempts, 2);
        assert_eq!(options.extra_interval_secs, 30);
        assert_eq!(options.max_age_secs, 3600);
    }

    #[test]
    fn test_options_deserialize_partial() {
        let options: ReannounceOptions = toml::from_str("attempts = 5").unwrap();
        assert_eq!(options.attempts, 5);
        assert_eq!(options.interval_secs, 7);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ReannounceOutcome::Healthy { seeds: 3 }.exit_code(), 0);
        assert_eq!(ReannounceOutcome::Exhausted.exit_code(), 0);
        assert_eq!(
            ReannounceOutcome::Ineligible {
                age_secs: 7200,
                max_age_secs: 3600
            }
            .exit_code(),
            1
        );
        assert_eq!(
            ReannounceOutcome::TransportError(TorrentClientError::Timeout).exit_code(),
            1
        );
    }
}
