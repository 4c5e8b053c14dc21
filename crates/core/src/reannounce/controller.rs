//! The reannounce controller.
//!
//! A bounded two-phase retry loop: poll tracker health and force announces
//! until a tracker confirms the torrent working (or the attempt budget runs
//! out), then fire a few more announces for good measure, since a single OK
//! reading does not guarantee a durable swarm.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};

use crate::torrent_client::{TorrentClient, TorrentClientError};

use super::classifier::{classify, Verdict};
use super::gate;
use super::reporter::StatusReporter;
use super::types::{ReannounceOptions, ReannounceOutcome};

/// Drives one torrent back to tracker-announce health.
///
/// Owns nothing but loop counters for the lifetime of one `run` call; all
/// torrent state is fetched fresh from the client on every iteration. One
/// controller invocation uses one client; processing several hashes in
/// parallel means independent controller instances.
pub struct ReannounceController {
    options: ReannounceOptions,
    reporter: StatusReporter,
    shutdown: broadcast::Sender<()>,
    /// Receiver held from construction so a shutdown requested before `run`
    /// subscribes is buffered, not lost.
    shutdown_rx: Mutex<Option<broadcast::Receiver<()>>>,
}

impl ReannounceController {
    pub fn new(options: ReannounceOptions, reporter: StatusReporter) -> Self {
        let (shutdown, shutdown_rx) = broadcast::channel(1);
        Self {
            options,
            reporter,
            shutdown,
            shutdown_rx: Mutex::new(Some(shutdown_rx)),
        }
    }

    /// Handle for requesting cancellation from another task (e.g. a signal
    /// handler). The controller checks it before every sleep and every
    /// client call; a request sent before `run` starts is honored on entry.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Run the controller to a terminal outcome.
    ///
    /// Never terminates the process and never panics on daemon behavior;
    /// every failure mode is an outcome variant.
    pub async fn run(&self, client: &dyn TorrentClient, hash: &str) -> ReannounceOutcome {
        let mut shutdown = self
            .shutdown_rx
            .lock()
            .await
            .take()
            .unwrap_or_else(|| self.shutdown.subscribe());
        match self.drive(client, hash, &mut shutdown).await {
            Ok(outcome) => outcome,
            Err(e) => ReannounceOutcome::TransportError(e),
        }
    }

    async fn drive(
        &self,
        client: &dyn TorrentClient,
        hash: &str,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<ReannounceOutcome, TorrentClientError> {
        let handle = guarded(shutdown, client.fetch_torrent(hash)).await?;

        let check = gate::check(&handle, self.options.max_age_secs, Utc::now());
        let age_secs = check.age.num_seconds();
        self.reporter.found(hash, age_secs);
        if !check.eligible {
            return Ok(ReannounceOutcome::Ineligible {
                age_secs,
                max_age_secs: self.options.max_age_secs,
            });
        }

        let seeds = match self.poll_until_healthy(client, hash, shutdown).await? {
            Some(seeds) => seeds,
            None => return Ok(ReannounceOutcome::Exhausted),
        };

        self.settle(client, hash, shutdown).await?;

        let handle = guarded(shutdown, client.fetch_torrent(hash)).await?;
        self.reporter.snapshot(hash, "final", &handle);

        Ok(ReannounceOutcome::Healthy { seeds })
    }

    /// Polling phase: up to `attempts` iterations, each preceded by an
    /// unconditional delay so the daemon's previous state has time to
    /// settle. Returns `Ok(None)` on exhaustion.
    async fn poll_until_healthy(
        &self,
        client: &dyn TorrentClient,
        hash: &str,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<Option<i64>, TorrentClientError> {
        for i in 1..=self.options.attempts {
            let prefix = format!("try {}", i);

            self.reporter
                .sleeping(hash, &prefix, self.options.interval_secs);
            pause(shutdown, self.options.interval_secs).await?;

            let records = guarded(shutdown, client.fetch_trackers(hash)).await?;
            self.reporter.trackers(hash, &prefix, &records);

            match classify(&records) {
                Verdict::Healthy { seeds } => {
                    self.reporter.healthy(hash, &prefix, seeds);
                    return Ok(Some(seeds));
                }
                Verdict::NeedsReannounce | Verdict::Inconclusive => {
                    self.force(client, hash, &prefix, shutdown).await?;
                }
            }
        }

        Ok(None)
    }

    /// Settling phase: exactly `extra_attempts` unconditional reannounces,
    /// each preceded by a delay and a status snapshot.
    async fn settle(
        &self,
        client: &dyn TorrentClient,
        hash: &str,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), TorrentClientError> {
        for i in 1..=self.options.extra_attempts {
            let prefix = format!("extra {}", i);

            self.reporter
                .sleeping(hash, &prefix, self.options.extra_interval_secs);
            pause(shutdown, self.options.extra_interval_secs).await?;

            let records = guarded(shutdown, client.fetch_trackers(hash)).await?;
            self.reporter.trackers(hash, &prefix, &records);

            self.force(client, hash, &prefix, shutdown).await?;
        }

        Ok(())
    }

    /// Request a forced reannounce. A failure here means this iteration's
    /// nudge was lost, not that the run failed; only cancellation
    /// propagates.
    async fn force(
        &self,
        client: &dyn TorrentClient,
        hash: &str,
        prefix: &str,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), TorrentClientError> {
        match guarded(shutdown, client.force_reannounce(hash)).await {
            Ok(()) => {
                self.reporter.reannounce_sent(hash, prefix);
                Ok(())
            }
            Err(TorrentClientError::Interrupted) => Err(TorrentClientError::Interrupted),
            Err(e) => {
                self.reporter.reannounce_failed(hash, prefix, &e);
                Ok(())
            }
        }
    }
}

/// Sleep that aborts the instant a shutdown is requested. A partial sleep is
/// never completed.
async fn pause(
    shutdown: &mut broadcast::Receiver<()>,
    secs: u64,
) -> Result<(), TorrentClientError> {
    tokio::select! {
        biased;
        _ = shutdown.recv() => Err(TorrentClientError::Interrupted),
        _ = tokio::time::sleep(Duration::from_secs(secs)) => Ok(()),
    }
}

/// Race a client call against shutdown, checking shutdown first.
async fn guarded<T>(
    shutdown: &mut broadcast::Receiver<()>,
    call: impl Future<Output = Result<T, TorrentClientError>>,
) -> Result<T, TorrentClientError> {
    tokio::select! {
        biased;
        _ = shutdown.recv() => Err(TorrentClientError::Interrupted),
        result = call => result,
    }
}
