//! Tracker status classification.
//!
//! Tracker status text is free-form and backend-specific; the rules here
//! guarantee that an explicit rejection always outranks a stale OK and that
//! an ambiguous status never reads as success.

use crate::torrent_client::{TrackerRecord, TrackerStatus};

/// Health verdict for one set of tracker records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A tracker confirmed the torrent working.
    Healthy { seeds: i64 },
    /// No tracker confirmed the torrent working; force a new announce.
    NeedsReannounce,
    /// The daemon reported no tracker rows at all.
    Inconclusive,
}

/// Messages that mean a tracker has explicitly rejected the torrent.
const REJECTION_WORDS: &[&str] = &["unregistered", "not registered", "not found", "not exist"];

/// Classify a set of tracker records, in the order the daemon returned them.
///
/// Disabled rows (DHT/PeX/LSD) carry no announce semantics and are skipped.
/// A rejection message on any remaining row wins immediately, so a later
/// tracker's transient OK cannot mask it. Anything short of a confirmed OK
/// triggers another reannounce rather than risking a false "done".
pub fn classify(records: &[TrackerRecord]) -> Verdict {
    if records.is_empty() {
        return Verdict::Inconclusive;
    }

    for record in records {
        if record.status == TrackerStatus::Disabled {
            continue;
        }

        if is_rejection(&record.message) {
            return Verdict::NeedsReannounce;
        }

        if record.status == TrackerStatus::Ok {
            return Verdict::Healthy {
                seeds: record.num_seeds,
            };
        }
    }

    Verdict::NeedsReannounce
}

/// Return true if a tracker message indicates a terminal rejection.
fn is_rejection(message: &str) -> bool {
    let msg = message.to_lowercase();
    REJECTION_WORDS.iter().any(|w| msg.contains(w))
}
