//! Diagnostic line formatting for reannounce runs.
//!
//! One line per poll/extra iteration and one final summary line; downstream
//! log scrapers depend on this textual contract. Formatting only — nothing
//! here affects control flow.

use tracing::info;

use crate::torrent_client::{TorrentHandle, TrackerRecord, TrackerStatus};

/// Formats and emits per-attempt diagnostic lines.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    verbosity: u8,
}

impl StatusReporter {
    pub fn new(verbosity: u8) -> Self {
        Self { verbosity }
    }

    /// The torrent was located and passed to the gate.
    pub fn found(&self, hash: &str, age_secs: i64) {
        info!("{}: found torrent age={}s", hash, age_secs);
    }

    /// Sleep notice, only at raised verbosity.
    pub fn sleeping(&self, hash: &str, prefix: &str, secs: u64) {
        if self.verbosity > 0 {
            info!("{}: {}: sleep {}s", hash, prefix, secs);
        }
    }

    /// One line per enabled tracker in the snapshot.
    pub fn trackers(&self, hash: &str, prefix: &str, records: &[TrackerRecord]) {
        if records.is_empty() {
            info!("{}: {}: no trackers", hash, prefix);
            return;
        }
        for record in records {
            if record.status == TrackerStatus::Disabled {
                continue;
            }
            info!("{}", format_tracker_line(hash, prefix, record));
        }
    }

    /// Torrent snapshot summary line.
    pub fn snapshot(&self, hash: &str, prefix: &str, handle: &TorrentHandle) {
        info!("{}", format_snapshot_line(hash, prefix, handle));
    }

    /// A forced reannounce was requested.
    pub fn reannounce_sent(&self, hash: &str, prefix: &str) {
        info!("{}: {}: reannounce sent", hash, prefix);
    }

    /// A forced reannounce failed; the loop continues on schedule.
    pub fn reannounce_failed(&self, hash: &str, prefix: &str, err: &dyn std::fmt::Display) {
        info!("{}: {}: error reannouncing: {}", hash, prefix, err);
    }

    /// A tracker confirmed the torrent working.
    pub fn healthy(&self, hash: &str, prefix: &str, seeds: i64) {
        info!("{}: {}: found {} seeds", hash, prefix, seeds);
    }
}

/// Format one tracker record line.
pub fn format_tracker_line(hash: &str, prefix: &str, record: &TrackerRecord) -> String {
    format!(
        "{}: {}: tracker status={} seeds={} peers={} msg=\"{}\" url={}",
        hash,
        prefix,
        record.status.as_str(),
        record.num_seeds,
        record.num_peers,
        record.message,
        hostname(&record.url),
    )
}

/// Format a torrent snapshot line.
///
/// The reannounce countdown is not available on all backends; when missing,
/// the field is omitted rather than faked.
pub fn format_snapshot_line(hash: &str, prefix: &str, handle: &TorrentHandle) -> String {
    let progress = (handle.progress * 100.0 + 0.5) as i64;
    let mut line = format!(
        "{}: {}: torrent status=\"{}\" seeds={} peers={} progress={}%",
        hash, prefix, handle.status_message, handle.num_seeds, handle.num_peers, progress,
    );
    if let Some(secs) = handle.next_announce_secs {
        line.push_str(&format!(" reannounce={}s", secs));
    }
    line
}

fn hostname(url: &str) -> &str {
    url.split('/').nth(2).filter(|h| !h.is_empty()).unwrap_or(url)
}
