//! Integration test: faults and reset.
//!
//! A stop that cannot be confirmed latches the controller in Faulted. Only a
//! reset whose stop writes succeed clears it.

use lift_common::control::command::MovementRequest;
use lift_common::control::outcome::{
    ErrorClass, FaultTrigger, MovementOutcome, PreflightError, StopReason,
};
use lift_common::control::state::ControllerState;
use lift_common::port::PortError;
use lift_control::command::{Rejection, spawn_controller};
use lift_control::controller::ResetError;
use lift_hal::drivers::mock::ScriptedPort;
use std::time::Duration;

use super::{MOVE_HIGH, MOVE_LOW, config, controller, scripted, stop_writes};

fn broken_stop() -> PortError {
    PortError::Transport("connection reset".into())
}

/// Reaches 1000 on the first poll; the first low-flag clear fails.
fn failing_stop_port() -> ScriptedPort {
    scripted()
        .then_frames(&[&[0, 0, 0, 0], &[980, 980, 980, 980]])
        .fail_write(MOVE_LOW, false, broken_stop())
}

#[tokio::test]
async fn unconfirmed_stop_latches_fault() {
    let port = failing_stop_port();
    let journal = port.journal();
    let mut ctl = controller(port);

    let outcome = ctl.execute(MovementRequest::direct(1000)).await;
    match &outcome {
        MovementOutcome::Faulted(report) => {
            assert_eq!(
                report.trigger,
                FaultTrigger::SessionStop(StopReason::ReachedTarget)
            );
            assert_eq!(report.error, broken_stop());
            assert!(report.frame.is_some());
        }
        other => panic!("unexpected outcome {other}"),
    }
    assert_eq!(outcome.class(), Some(ErrorClass::Transport));
    assert!(outcome.is_fault());
    assert_eq!(ctl.state(), ControllerState::Faulted);

    // Both clears were attempted even though the first failed.
    assert_eq!(
        journal.writes(),
        vec![(MOVE_HIGH, true), (MOVE_LOW, false), (MOVE_HIGH, false)]
    );
}

#[tokio::test]
async fn faulted_controller_refuses_every_request() {
    let port = failing_stop_port();
    let journal = port.journal();
    let mut ctl = controller(port);
    ctl.execute(MovementRequest::direct(1000)).await;
    let seen = journal.events().len();

    for target in [500, 0, 20000] {
        let outcome = ctl.execute(MovementRequest::direct(target)).await;
        assert_eq!(
            outcome,
            MovementOutcome::Rejected(PreflightError::NotReady {
                state: ControllerState::Faulted
            })
        );
    }
    assert_eq!(journal.events().len(), seen);
    assert_eq!(ctl.board().snapshot().state, ControllerState::Faulted);
    assert_eq!(ctl.board().snapshot().sessions_completed, 1);
}

#[tokio::test]
async fn reset_with_confirmed_stop_returns_to_idle() {
    let port = failing_stop_port();
    let journal = port.journal();
    let mut ctl = controller(port);
    ctl.execute(MovementRequest::direct(1000)).await;
    journal.clear();

    ctl.reset().await.unwrap();
    assert_eq!(ctl.state(), ControllerState::Idle);
    assert_eq!(ctl.board().state(), ControllerState::Idle);
    assert_eq!(journal.writes(), stop_writes());

    // Frame is still at 980; the next request is a no-op.
    let outcome = ctl.execute(MovementRequest::direct(1000)).await;
    assert!(matches!(outcome, MovementOutcome::AlreadyAtTarget { .. }));
}

#[tokio::test]
async fn reset_with_failed_stop_stays_faulted() {
    let port = failing_stop_port().fail_write(MOVE_LOW, false, broken_stop());
    let mut ctl = controller(port);
    ctl.execute(MovementRequest::direct(1000)).await;

    assert_eq!(ctl.reset().await, Err(ResetError::StopFailed(broken_stop())));
    assert_eq!(ctl.state(), ControllerState::Faulted);

    // The failed reset replaces the session fault as the reported outcome.
    let status = ctl.board().snapshot();
    assert_eq!(status.state, ControllerState::Faulted);
    assert_eq!(status.sessions_completed, 1);
    match status.last_outcome {
        Some(MovementOutcome::Faulted(report)) => {
            assert_eq!(report.trigger, FaultTrigger::Reset);
            assert_eq!(report.error, broken_stop());
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(status.last_frame.is_some());

    // The one-shot faults are used up; the next reset goes through.
    ctl.reset().await.unwrap();
    assert_eq!(ctl.state(), ControllerState::Idle);
}

#[tokio::test]
async fn failed_level_stop_in_preflight_faults() {
    let port = scripted()
        .then_frame(&[0, 0, 0, 70])
        .fail_write(MOVE_HIGH, false, PortError::NotConnected);
    let journal = port.journal();
    let mut ctl = controller(port);

    let outcome = ctl.execute(MovementRequest::direct(1000)).await;
    match &outcome {
        MovementOutcome::Faulted(report) => {
            assert_eq!(report.trigger, FaultTrigger::PreflightLevelStop);
            assert_eq!(report.error, PortError::NotConnected);
        }
        other => panic!("unexpected outcome {other}"),
    }
    assert!(!journal.asserted_any());
    assert_eq!(ctl.state(), ControllerState::Faulted);
    // Preflight never ran a session.
    assert_eq!(ctl.board().snapshot().sessions_completed, 0);
}

#[tokio::test]
async fn surface_reports_fault_and_accepts_reset() {
    let cfg = config();
    let (handle, task) = spawn_controller(failing_stop_port(), &cfg);
    let settle = Duration::from_millis(2);

    handle.request_move_to(1000).unwrap();
    let status = handle.wait_until_settled(settle).await;
    assert_eq!(status.state, ControllerState::Faulted);
    assert!(status.last_outcome.as_ref().is_some_and(|o| o.is_fault()));

    assert_eq!(handle.request_move_to(500), Err(Rejection::Faulted));
    assert_eq!(handle.request_move_named("low"), Err(Rejection::Faulted));
    assert_eq!(handle.current_state().state, ControllerState::Faulted);

    handle.request_reset().unwrap();
    let status = handle.wait_until_settled(settle).await;
    assert_eq!(status.state, ControllerState::Idle);
    assert!(handle.request_reset().is_err());

    drop(handle);
    let port = task.await.unwrap();
    assert!(port.is_stopped(&cfg.direction_flags()));
}
