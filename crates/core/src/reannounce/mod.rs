//! Tracker reannounce recovery.
//!
//! A torrent that was just added can sit for minutes with a stuck, stale or
//! rejected tracker announce and never find peers. This module polls the
//! daemon's tracker status for one torrent, forces new announces until a
//! tracker confirms the torrent healthy, and knows when to give up.

mod classifier;
mod controller;
mod gate;
mod reporter;
mod types;

pub use classifier::{classify, Verdict};
pub use controller::ReannounceController;
pub use gate::{check, GateCheck};
pub use reporter::StatusReporter;
pub use types::{ReannounceOptions, ReannounceOutcome};
