//! Age precondition for reannounce attempts.

use chrono::{DateTime, Duration, Utc};

use crate::torrent_client::TorrentHandle;

/// Result of the precondition check.
#[derive(Debug, Clone, Copy)]
pub struct GateCheck {
    pub eligible: bool,
    pub age: Duration,
}

/// Check that a torrent is young enough to be worth polling.
///
/// Old torrents have either settled or are beyond saving by a reannounce;
/// rejecting them up front avoids burning the attempt budget against the
/// remote daemon. `now` is passed in rather than sampled here.
pub fn check(handle: &TorrentHandle, max_age_secs: u64, now: DateTime<Utc>) -> GateCheck {
    let age = handle.age(now);
    GateCheck {
        eligible: age <= Duration::seconds(max_age_secs as i64),
        age,
    }
}
