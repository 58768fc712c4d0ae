//! Integration test: moving sessions.
//!
//! Every session that asserted a direction ends with both flags cleared,
//! whatever stopped it.

use lift_common::control::command::{MovementRequest, Preset};
use lift_common::control::outcome::{
    ErrorClass, FaultTrigger, MovementOutcome, SessionReport, StopReason,
};
use lift_common::control::state::ControllerState;
use lift_common::frame::{Direction, FrameSnapshot};
use lift_common::port::PortError;
use lift_control::command::{AbortSignal, StatusBoard};
use lift_control::controller::MovementController;
use lift_hal::drivers::mock::PortEvent;
use lift_hal::drivers::simulation::SimulatedFrame;
use std::time::{Duration, Instant};

use super::{MOVE_HIGH, MOVE_LOW, config, controller, controller_with, scripted, stop_writes};

fn stopped(outcome: MovementOutcome) -> SessionReport {
    match outcome {
        MovementOutcome::Stopped(report) => report,
        other => panic!("expected a stopped session, got {other}"),
    }
}

fn flat(position: i32) -> [i32; 4] {
    [position; 4]
}

// ── Normal runs ─────────────────────────────────────────────────────

#[tokio::test]
async fn high_preset_reaches_target() {
    let cfg = config();
    let port = scripted().then_frames(&[&flat(0), &flat(400), &flat(900), &flat(980)]);
    let journal = port.journal();
    let mut ctl = controller(port);

    let request = MovementRequest::preset(Preset::High, &cfg.presets);
    let report = stopped(ctl.execute(request).await);

    assert_eq!(report.reason, StopReason::ReachedTarget);
    assert_eq!(report.direction, Direction::Up);
    assert_eq!(report.initial_difference, 1000);
    assert_eq!(report.polls, 3);
    assert_eq!(
        report.frame,
        Some(FrameSnapshot::from_positions(&flat(980)).unwrap())
    );

    let write = |address, value| PortEvent::WriteFlag {
        address,
        value,
        ok: true,
    };
    assert_eq!(
        journal.events(),
        vec![
            PortEvent::ReadFlags {
                address: MOVE_LOW,
                count: 1
            },
            PortEvent::ReadFlags {
                address: MOVE_HIGH,
                count: 1
            },
            PortEvent::ReadFrame,
            write(MOVE_HIGH, true),
            PortEvent::ReadFrame,
            PortEvent::ReadFrame,
            PortEvent::ReadFrame,
            write(MOVE_LOW, false),
            write(MOVE_HIGH, false),
        ]
    );

    assert_eq!(ctl.state(), ControllerState::Idle);
    let status = ctl.board().snapshot();
    assert_eq!(status.sessions_completed, 1);
    assert_eq!(status.last_frame, report.frame);
}

#[tokio::test]
async fn low_target_asserts_only_the_low_flag() {
    let port = scripted().then_frames(&[&flat(600), &flat(300), &flat(20)]);
    let journal = port.journal();
    let mut ctl = controller(port);

    let report = stopped(ctl.execute(MovementRequest::direct(0)).await);
    assert_eq!(report.reason, StopReason::ReachedTarget);
    assert_eq!(report.direction, Direction::Down);

    let mut expected = vec![(MOVE_LOW, true)];
    expected.extend(stop_writes());
    assert_eq!(journal.writes(), expected);
}

#[tokio::test]
async fn back_to_back_sessions_are_independent() {
    let port = scripted().then_frames(&[&flat(0), &flat(500), &flat(500), &flat(40)]);
    let journal = port.journal();
    let mut ctl = controller(port);

    let first = stopped(ctl.execute(MovementRequest::direct(500)).await);
    assert_eq!(first.polls, 1);
    let second = stopped(ctl.execute(MovementRequest::direct(0)).await);
    assert_eq!(second.direction, Direction::Down);
    assert_eq!(second.initial_difference, -500);
    assert_eq!(second.polls, 1);

    assert_eq!(ctl.board().snapshot().sessions_completed, 2);
    assert_eq!(journal.writes().len(), 6);
}

// ── Safety stops ────────────────────────────────────────────────────

#[tokio::test]
async fn leaving_range_stops_immediately() {
    let port = scripted().then_frames(&[&flat(0), &flat(500), &flat(1100), &flat(1000)]);
    let journal = port.journal();
    let mut ctl = controller(port);

    let outcome = ctl.execute(MovementRequest::direct(1000)).await;
    assert_eq!(outcome.class(), Some(ErrorClass::RuntimeSafety));
    let report = stopped(outcome);
    assert_eq!(report.reason, StopReason::RangeLost);
    assert_eq!(report.polls, 2);

    // No read after the offending snapshot.
    assert_eq!(journal.frame_reads(), 3);
    assert_eq!(journal.writes()[1..], stop_writes()[..]);
    assert_eq!(ctl.state(), ControllerState::Idle);
}

#[tokio::test]
async fn tilt_during_movement_stops() {
    let port = scripted().then_frames(&[&flat(0), &[300, 300, 300, 380]]);
    let mut ctl = controller(port);

    let report = stopped(ctl.execute(MovementRequest::direct(1000)).await);
    assert_eq!(report.reason, StopReason::LevelLost);
    assert_eq!(report.frame.map(|f| f.spread()), Some(80));
}

#[tokio::test]
async fn level_is_checked_before_range() {
    // Both out of range and tilted: level wins.
    let port = scripted().then_frames(&[&flat(0), &[1060, 1060, 1060, 1200]]);
    let mut ctl = controller(port);

    let report = stopped(ctl.execute(MovementRequest::direct(1000)).await);
    assert_eq!(report.reason, StopReason::LevelLost);
}

#[tokio::test]
async fn passing_the_target_is_an_overshoot() {
    let port = scripted().then_frames(&[&flat(0), &flat(300), &flat(560)]);
    let mut ctl = controller(port);

    let report = stopped(ctl.execute(MovementRequest::direct(500)).await);
    assert_eq!(report.reason, StopReason::Overshot);
    assert_eq!(report.polls, 2);
}

#[tokio::test]
async fn overshoot_is_checked_before_tolerance() {
    // 530 is inside the tolerance but on the far side of the target.
    let port = scripted().then_frames(&[&flat(0), &flat(530)]);
    let mut ctl = controller(port);

    let report = stopped(ctl.execute(MovementRequest::direct(500)).await);
    assert_eq!(report.reason, StopReason::Overshot);
}

#[tokio::test]
async fn exact_hit_is_not_an_overshoot() {
    let port = scripted().then_frames(&[&flat(0), &flat(500)]);
    let mut ctl = controller(port);

    let report = stopped(ctl.execute(MovementRequest::direct(500)).await);
    assert_eq!(report.reason, StopReason::ReachedTarget);
}

// ── Port failures ───────────────────────────────────────────────────

#[tokio::test]
async fn lost_connection_while_moving_stops_cleanly() {
    let port = scripted()
        .then_frames(&[&flat(0), &flat(200)])
        .then_read_error(PortError::Transport("connection reset".into()));
    let journal = port.journal();
    let mut ctl = controller(port);

    let outcome = ctl.execute(MovementRequest::direct(1000)).await;
    assert_eq!(outcome.class(), Some(ErrorClass::Transport));
    let report = stopped(outcome);
    assert!(matches!(
        report.reason,
        StopReason::PortFailure(PortError::Transport(_))
    ));
    assert_eq!(report.polls, 1);
    assert_eq!(journal.writes()[1..], stop_writes()[..]);
    assert_eq!(ctl.state(), ControllerState::Idle);
}

#[tokio::test]
async fn exception_reply_while_moving_faults() {
    let port = scripted()
        .then_frame(&flat(0))
        .then_read_error(PortError::Protocol("exception 0x04".into()));
    let journal = port.journal();
    let mut ctl = controller(port);

    let outcome = ctl.execute(MovementRequest::direct(1000)).await;
    match &outcome {
        MovementOutcome::Faulted(report) => {
            assert_eq!(report.trigger, FaultTrigger::DeviceReply);
            assert!(report.frame.is_none());
        }
        other => panic!("unexpected outcome {other}"),
    }
    assert_eq!(journal.writes()[1..], stop_writes()[..]);
    assert_eq!(ctl.state(), ControllerState::Faulted);
    assert_eq!(ctl.board().snapshot().sessions_completed, 1);
}

#[tokio::test]
async fn failed_direction_write_still_stops() {
    let port = scripted()
        .then_frame(&flat(0))
        .fail_write(MOVE_HIGH, true, PortError::Transport("broken pipe".into()));
    let journal = port.journal();
    let mut ctl = controller(port);

    let report = stopped(ctl.execute(MovementRequest::direct(1000)).await);
    assert!(matches!(report.reason, StopReason::PortFailure(_)));
    assert_eq!(report.polls, 0);
    assert_eq!(journal.frame_reads(), 1);
    assert_eq!(
        journal.events()[3..],
        [
            PortEvent::WriteFlag {
                address: MOVE_HIGH,
                value: true,
                ok: false
            },
            PortEvent::WriteFlag {
                address: MOVE_LOW,
                value: false,
                ok: true
            },
            PortEvent::WriteFlag {
                address: MOVE_HIGH,
                value: false,
                ok: true
            },
        ]
    );
}

// ── Pacing ──────────────────────────────────────────────────────────

#[tokio::test]
async fn poll_rounds_respect_min_interval() {
    let mut cfg = config();
    cfg.poll.min_interval_ms = 20;
    let port = scripted().then_frames(&[&flat(0), &flat(400), &flat(900), &flat(980)]);
    let mut ctl = controller_with(port, &cfg);

    let started = Instant::now();
    let report = stopped(ctl.execute(MovementRequest::direct(1000)).await);
    assert_eq!(report.polls, 3);
    // The first round fires immediately, the next two wait.
    assert!(started.elapsed() >= Duration::from_millis(40));
}

// ── Simulated frame ─────────────────────────────────────────────────

#[tokio::test]
async fn simulated_frame_reaches_target() {
    let cfg = config();
    let port = SimulatedFrame::from_config(&cfg);
    let probe = port.probe();
    let mut ctl = MovementController::new(port, &cfg, AbortSignal::new(), StatusBoard::new());

    let report = stopped(ctl.execute(MovementRequest::direct(600)).await);
    assert_eq!(report.reason, StopReason::ReachedTarget);
    assert!(!probe.is_moving());
    for position in probe.positions() {
        assert!((600 - position).abs() < 50, "stopped at {position}");
    }
}

#[tokio::test]
async fn lagging_actuator_trips_level_check() {
    let mut cfg = config();
    cfg.simulation.drift = vec![0, 0, 0, 5];
    let port = SimulatedFrame::from_config(&cfg);
    let probe = port.probe();
    let mut ctl = MovementController::new(port, &cfg, AbortSignal::new(), StatusBoard::new());

    let report = stopped(ctl.execute(MovementRequest::direct(1000)).await);
    assert_eq!(report.reason, StopReason::LevelLost);
    // Spread grows by 5 per round and first exceeds 50 on round 11.
    assert_eq!(report.polls, 11);
    assert!(!probe.flag(MOVE_LOW) && !probe.flag(MOVE_HIGH));
}
