//! Integration test: command surface against a running controller task.

use lift_common::control::command::Preset;
use lift_common::control::outcome::{ErrorClass, MovementOutcome, StopReason};
use lift_common::control::state::ControllerState;
use lift_control::command::{Rejection, spawn_controller};
use lift_hal::drivers::simulation::SimulatedFrame;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use super::config;

const SETTLE_POLL: Duration = Duration::from_millis(2);

#[tokio::test]
async fn request_while_busy_is_rejected_not_queued() {
    let mut cfg = config();
    cfg.poll.min_interval_ms = 5;
    let port = SimulatedFrame::from_config(&cfg);
    let (handle, task) = spawn_controller(port, &cfg);

    handle.request_move(Preset::High).unwrap();
    assert_eq!(
        handle.request_move_to(0),
        Err(Rejection::Busy(ControllerState::Preflight))
    );

    sleep(Duration::from_millis(20)).await;
    let err = handle.request_move(Preset::Low).unwrap_err();
    assert_eq!(err, Rejection::Busy(ControllerState::Moving));
    assert_eq!(err.class(), ErrorClass::Precondition);

    let status = timeout(Duration::from_secs(5), handle.wait_until_settled(SETTLE_POLL))
        .await
        .expect("controller did not settle");
    match status.last_outcome {
        Some(MovementOutcome::Stopped(report)) => {
            assert_eq!(report.reason, StopReason::ReachedTarget);
            assert_eq!(report.target, 1000);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    // The rejected requests never ran.
    assert_eq!(status.sessions_completed, 1);

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn unknown_preset_is_rejected_before_claiming() {
    let cfg = config();
    let (handle, task) = spawn_controller(SimulatedFrame::from_config(&cfg), &cfg);

    let err = handle.request_move_named("middle").unwrap_err();
    assert!(matches!(err, Rejection::UnknownPreset(_)));
    assert_eq!(err.class(), ErrorClass::Validation);
    assert_eq!(handle.current_state().state, ControllerState::Idle);

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn handles_can_be_shared_between_tasks() {
    let cfg = config();
    let port = SimulatedFrame::from_config(&cfg);
    let probe = port.probe();
    let (handle, task) = spawn_controller(port, &cfg);

    let remote = handle.clone();
    tokio::spawn(async move { remote.request_move_named("high") })
        .await
        .unwrap()
        .unwrap();

    let status = handle.wait_until_settled(SETTLE_POLL).await;
    assert!(status.last_outcome.is_some_and(|o| o.reached_target()));
    assert!(probe.positions().iter().all(|&p| (1000 - p).abs() < 50));

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn controller_task_returns_port_when_handles_drop() {
    let cfg = config();
    let (handle, task) = spawn_controller(SimulatedFrame::from_config(&cfg), &cfg);
    let spare = handle.clone();

    drop(handle);
    assert!(spare.is_connected());
    drop(spare);

    let port = timeout(Duration::from_secs(1), task)
        .await
        .expect("controller task did not exit")
        .unwrap();
    // No request was ever served.
    assert_eq!(port.probe().ticks(), 0);
}

#[tokio::test]
async fn stopped_task_is_reported_as_gone() {
    let cfg = config();
    let (handle, task) = spawn_controller(SimulatedFrame::from_config(&cfg), &cfg);

    task.abort();
    assert!(task.await.is_err());

    assert!(!handle.is_connected());
    assert_eq!(handle.request_move(Preset::Low), Err(Rejection::ControllerGone));
    assert_eq!(handle.current_state().state, ControllerState::Idle);
}
