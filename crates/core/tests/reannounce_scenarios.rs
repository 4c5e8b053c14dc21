//! End-to-end reannounce controller scenarios against a scripted client.

use swarmstart_core::testing::{fixtures, MockTorrentClient};
use swarmstart_core::torrent_client::{TorrentClientError, TrackerStatus};
use swarmstart_core::{ReannounceController, ReannounceOptions, ReannounceOutcome, StatusReporter};

fn options(attempts: u32, extra_attempts: u32, max_age_secs: u64) -> ReannounceOptions {
    ReannounceOptions {
        attempts,
        interval_secs: 0,
        extra_attempts,
        extra_interval_secs: 0,
        max_age_secs,
    }
}

fn controller(options: ReannounceOptions) -> ReannounceController {
    ReannounceController::new(options, StatusReporter::new(1))
}

#[tokio::test]
async fn healthy_torrent_confirmed_on_first_poll() {
    let client = MockTorrentClient::new();
    client
        .set_handle(fixtures::handle_added_secs_ago("H1", 10))
        .await;
    client
        .set_repeat_trackers(vec![fixtures::tracker(TrackerStatus::Ok, "", 5)])
        .await;

    let outcome = controller(options(60, 2, 3600)).run(&client, "H1").await;

    match outcome {
        ReannounceOutcome::Healthy { seeds } => assert_eq!(seeds, 5),
        other => panic!("expected Healthy, got {:?}", other),
    }
    // One polling iteration, then the two extra reannounces.
    assert_eq!(client.tracker_fetches(), 1 + 2);
    assert_eq!(client.reannounces(), 2);
}

#[tokio::test]
async fn old_torrent_rejected_before_any_polling() {
    let client = MockTorrentClient::new();
    client
        .set_handle(fixtures::handle_added_secs_ago("H2", 7200))
        .await;

    let outcome = controller(options(60, 2, 3600)).run(&client, "H2").await;

    match outcome {
        ReannounceOutcome::Ineligible {
            age_secs,
            max_age_secs,
        } => {
            assert!(age_secs >= 7200);
            assert_eq!(max_age_secs, 3600);
        }
        other => panic!("expected Ineligible, got {:?}", other),
    }
    assert_eq!(client.tracker_fetches(), 0);
    assert_eq!(client.reannounces(), 0);
}

#[tokio::test]
async fn never_working_tracker_exhausts_the_budget() {
    let client = MockTorrentClient::new();
    client
        .set_handle(fixtures::handle_added_secs_ago("H3", 10))
        .await;
    client
        .set_repeat_trackers(vec![fixtures::tracker(TrackerStatus::NotWorking, "", 0)])
        .await;

    let attempts = 5;
    let outcome = controller(options(attempts, 2, 3600))
        .run(&client, "H3")
        .await;

    assert!(matches!(outcome, ReannounceOutcome::Exhausted));
    assert_eq!(client.tracker_fetches(), attempts as usize);
    assert_eq!(client.reannounces(), attempts as usize);
}

#[tokio::test]
async fn transport_failure_mid_polling_is_fatal() {
    let client = MockTorrentClient::new();
    client
        .set_handle(fixtures::handle_added_secs_ago("H4", 10))
        .await;
    client
        .push_trackers(vec![fixtures::tracker(TrackerStatus::NotWorking, "", 0)])
        .await;
    client
        .push_trackers(vec![fixtures::tracker(TrackerStatus::NotWorking, "", 0)])
        .await;
    client
        .push_tracker_error(TorrentClientError::ConnectionFailed("reset".into()))
        .await;

    let outcome = controller(options(60, 2, 3600)).run(&client, "H4").await;

    assert!(matches!(
        outcome,
        ReannounceOutcome::TransportError(TorrentClientError::ConnectionFailed(_))
    ));
    // Two nudges went out before the fetch on iteration 3 failed.
    assert_eq!(client.reannounces(), 2);
    assert_eq!(client.tracker_fetches(), 3);
}

#[tokio::test]
async fn rejection_message_forces_reannounce_despite_later_ok() {
    let client = MockTorrentClient::new();
    client
        .set_handle(fixtures::handle_added_secs_ago("H5", 10))
        .await;
    client
        .push_trackers(vec![
            fixtures::tracker(TrackerStatus::NotWorking, "torrent unregistered", 0),
            fixtures::tracker(TrackerStatus::Ok, "", 10),
        ])
        .await;
    client
        .set_repeat_trackers(vec![fixtures::tracker(TrackerStatus::Ok, "", 10)])
        .await;

    let outcome = controller(options(60, 0, 3600)).run(&client, "H5").await;

    // Iteration 1 saw the rejection and nudged; iteration 2 confirmed.
    assert!(matches!(outcome, ReannounceOutcome::Healthy { seeds: 10 }));
    assert_eq!(client.reannounces(), 1);
    assert_eq!(client.tracker_fetches(), 2);
}

#[tokio::test]
async fn repeated_runs_are_idempotent() {
    let extra_attempts = 2;

    for _ in 0..2 {
        let client = MockTorrentClient::new();
        client
            .set_handle(fixtures::handle_added_secs_ago("H6", 10))
            .await;
        client
            .set_repeat_trackers(vec![fixtures::tracker(TrackerStatus::Ok, "", 3)])
            .await;

        let outcome = controller(options(60, extra_attempts, 3600))
            .run(&client, "H6")
            .await;

        assert!(matches!(outcome, ReannounceOutcome::Healthy { seeds: 3 }));
        assert_eq!(client.tracker_fetches(), 1 + extra_attempts as usize);
    }
}

#[tokio::test]
async fn shutdown_requested_before_run_starts_no_network_traffic() {
    let client = MockTorrentClient::new();
    client
        .set_handle(fixtures::handle_added_secs_ago("H9", 10))
        .await;
    client
        .set_repeat_trackers(vec![fixtures::tracker(TrackerStatus::Ok, "", 5)])
        .await;

    // A signal can land between spawning the signal task and entering the
    // loop; the request must not be dropped in that window.
    let controller = controller(options(60, 2, 3600));
    controller
        .shutdown_handle()
        .send(())
        .expect("shutdown requested before run must be accepted");

    let outcome = controller.run(&client, "H9").await;

    assert!(matches!(
        outcome,
        ReannounceOutcome::TransportError(TorrentClientError::Interrupted)
    ));
    assert_eq!(client.torrent_fetches(), 0);
    assert_eq!(client.tracker_fetches(), 0);
    assert_eq!(client.reannounces(), 0);
}

#[tokio::test]
async fn missing_torrent_is_a_transport_error() {
    let client = MockTorrentClient::new();

    let outcome = controller(options(60, 2, 3600)).run(&client, "H7").await;

    assert!(matches!(
        outcome,
        ReannounceOutcome::TransportError(TorrentClientError::TorrentNotFound(_))
    ));
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn empty_tracker_list_keeps_polling() {
    let client = MockTorrentClient::new();
    client
        .set_handle(fixtures::handle_added_secs_ago("H8", 10))
        .await;
    client.push_trackers(vec![]).await;
    client
        .set_repeat_trackers(vec![fixtures::tracker(TrackerStatus::Ok, "", 1)])
        .await;

    let outcome = controller(options(60, 0, 3600)).run(&client, "H8").await;

    // The inconclusive first snapshot still triggered a nudge.
    assert!(matches!(outcome, ReannounceOutcome::Healthy { seeds: 1 }));
    assert_eq!(client.reannounces(), 1);
}
