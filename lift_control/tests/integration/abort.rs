//! Integration test: cooperative abort.

use lift_common::control::command::MovementRequest;
use lift_common::control::outcome::{MovementOutcome, StopReason};
use lift_common::control::state::ControllerState;
use lift_control::command::{AbortAck, AbortSignal, StatusBoard, spawn_controller};
use lift_control::controller::MovementController;
use lift_hal::drivers::simulation::SimulatedFrame;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use super::{MOVE_HIGH, config, scripted, stop_writes};

const SETTLE_POLL: Duration = Duration::from_millis(2);

#[tokio::test]
async fn raised_signal_stops_before_first_poll() {
    let port = scripted().then_frame(&[0, 0, 0, 0]);
    let journal = port.journal();
    let abort = AbortSignal::new();
    let mut ctl = MovementController::new(port, &config(), abort.clone(), StatusBoard::new());

    abort.raise();
    let outcome = ctl.execute(MovementRequest::direct(1000)).await;
    match &outcome {
        MovementOutcome::Stopped(report) => {
            assert_eq!(report.reason, StopReason::Aborted);
            assert_eq!(report.polls, 0);
        }
        other => panic!("unexpected outcome {other}"),
    }
    assert_eq!(outcome.class(), None);
    assert!(!outcome.reached_target());

    // Consumed by the session.
    assert!(!abort.is_raised());
    assert_eq!(journal.frame_reads(), 1);
    let mut expected = vec![(MOVE_HIGH, true)];
    expected.extend(stop_writes());
    assert_eq!(journal.writes(), expected);
    assert_eq!(ctl.state(), ControllerState::Idle);
}

#[tokio::test]
async fn abort_from_handle_stops_a_running_session() {
    let mut cfg = config();
    cfg.simulation.step_per_poll = 1;
    cfg.poll.min_interval_ms = 5;
    let port = SimulatedFrame::from_config(&cfg);
    let probe = port.probe();
    let (handle, task) = spawn_controller(port, &cfg);

    handle.request_move_to(1000).unwrap();
    sleep(Duration::from_millis(30)).await;
    assert!(handle.request_abort().signalled());

    let status = timeout(Duration::from_secs(2), handle.wait_until_settled(SETTLE_POLL))
        .await
        .expect("controller did not settle after abort");
    assert_eq!(status.state, ControllerState::Idle);
    match status.last_outcome {
        Some(MovementOutcome::Stopped(report)) => assert_eq!(report.reason, StopReason::Aborted),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(status.sessions_completed, 1);
    assert!(!probe.is_moving());
    assert!(probe.positions().iter().all(|&p| p < 950));

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn abort_while_idle_does_not_leak_into_next_session() {
    let cfg = config();
    let port = SimulatedFrame::from_config(&cfg);
    let (handle, task) = spawn_controller(port, &cfg);

    assert_eq!(handle.request_abort(), AbortAck::NoActiveSession);

    handle.request_move_to(200).unwrap();
    let status = timeout(Duration::from_secs(2), handle.wait_until_settled(SETTLE_POLL))
        .await
        .expect("controller did not settle");
    let outcome = status.last_outcome.expect("no outcome recorded");
    assert!(outcome.reached_target(), "unexpected outcome {outcome}");

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn aborted_session_leaves_controller_ready() {
    let port = scripted().then_frames(&[&[0, 0, 0, 0], &[200, 200, 200, 200], &[10, 10, 10, 10]]);
    let journal = port.journal();
    let (handle, task) = spawn_controller(port, &config());

    handle.request_move_to(200).unwrap();
    assert!(handle.request_abort().signalled());
    let first = handle.wait_until_settled(SETTLE_POLL).await;
    assert!(matches!(
        first.last_outcome,
        Some(MovementOutcome::Stopped(ref report)) if report.reason == StopReason::Aborted
    ));

    // Preflight of the next request sees the frame where the abort left it.
    handle.request_move_to(0).unwrap();
    let second = handle.wait_until_settled(SETTLE_POLL).await;
    let outcome = second.last_outcome.expect("no outcome recorded");
    assert!(outcome.reached_target(), "unexpected outcome {outcome}");
    assert_eq!(second.sessions_completed, 2);
    assert_eq!(journal.writes().len(), 6);

    drop(handle);
    task.await.unwrap();
}
