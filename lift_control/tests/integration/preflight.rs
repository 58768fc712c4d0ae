//! Integration test: preflight checks.
//!
//! Every rejection returns the controller to Idle without asserting a
//! direction flag. Only the not-level case writes, and then only the stop.

use lift_common::control::command::MovementRequest;
use lift_common::control::outcome::{
    ErrorClass, FaultTrigger, MovementOutcome, PreflightError,
};
use lift_common::control::state::ControllerState;
use lift_common::frame::config::TargetWindow;
use lift_common::port::PortError;
use lift_hal::drivers::mock::PortEvent;

use super::{MOVE_HIGH, MOVE_LOW, config, controller, controller_with, scripted, stop_writes};

// ── Target window ───────────────────────────────────────────────────

#[tokio::test]
async fn strict_window_rejects_target_beyond_max() {
    let port = scripted().then_frame(&[0, 0, 0, 0]);
    let journal = port.journal();
    let mut ctl = controller(port);

    let outcome = ctl.execute(MovementRequest::direct(1040)).await;
    assert_eq!(
        outcome,
        MovementOutcome::Rejected(PreflightError::TargetOutOfRange {
            target: 1040,
            min: 0,
            max: 1000
        })
    );
    assert!(journal.events().is_empty());
    assert_eq!(ctl.state(), ControllerState::Idle);
}

#[tokio::test]
async fn extended_window_accepts_target_within_tolerance() {
    let mut cfg = config();
    cfg.limits.target_window = TargetWindow::Extended;
    let port = scripted().then_frames(&[&[0, 0, 0, 0], &[1030, 1030, 1030, 1030]]);
    let journal = port.journal();
    let mut ctl = controller_with(port, &cfg);

    let outcome = ctl.execute(MovementRequest::direct(1040)).await;
    assert!(outcome.reached_target(), "unexpected outcome {outcome}");
    assert_eq!(journal.writes()[0], (MOVE_HIGH, true));

    let outcome = ctl.execute(MovementRequest::direct(1051)).await;
    assert!(matches!(
        outcome,
        MovementOutcome::Rejected(PreflightError::TargetOutOfRange { min: -50, max: 1050, .. })
    ));
}

// ── Device state ────────────────────────────────────────────────────

#[tokio::test]
async fn asserted_flag_means_already_moving() {
    let port = scripted().with_flag(MOVE_LOW, true).then_frame(&[0, 0, 0, 0]);
    let journal = port.journal();
    let mut ctl = controller(port);

    let outcome = ctl.execute(MovementRequest::direct(1000)).await;
    assert_eq!(
        outcome,
        MovementOutcome::Rejected(PreflightError::AlreadyMoving {
            move_low: true,
            move_high: false
        })
    );
    assert_eq!(outcome.class(), Some(ErrorClass::Precondition));
    assert!(journal.writes().is_empty());
    assert_eq!(journal.frame_reads(), 0);
}

#[tokio::test]
async fn frame_out_of_range_at_rest_is_not_moved() {
    let port = scripted().then_frame(&[1060, 1060, 1060, 1060]);
    let journal = port.journal();
    let mut ctl = controller(port);

    let outcome = ctl.execute(MovementRequest::direct(0)).await;
    assert!(matches!(
        outcome,
        MovementOutcome::Rejected(PreflightError::FrameOutOfRange { .. })
    ));
    assert!(journal.writes().is_empty());
}

#[tokio::test]
async fn range_boundary_at_rest_is_inclusive() {
    let port = scripted().then_frames(&[&[-50, -50, -50, -50], &[480, 480, 480, 480]]);
    let mut ctl = controller(port);
    let outcome = ctl.execute(MovementRequest::direct(500)).await;
    assert!(outcome.reached_target(), "unexpected outcome {outcome}");
}

#[tokio::test]
async fn not_level_at_rest_clears_both_flags() {
    let port = scripted().then_frame(&[0, 0, 0, 51]);
    let journal = port.journal();
    let mut ctl = controller(port);

    let outcome = ctl.execute(MovementRequest::direct(1000)).await;
    assert!(matches!(
        outcome,
        MovementOutcome::Rejected(PreflightError::NotLevel { spread: 51, .. })
    ));
    assert_eq!(journal.writes(), stop_writes());
    assert!(!journal.asserted_any());
    assert_eq!(ctl.state(), ControllerState::Idle);
}

#[tokio::test]
async fn already_at_target_reads_but_never_writes() {
    let port = scripted().then_frame(&[40, 40, 40, 40]);
    let journal = port.journal();
    let mut ctl = controller(port);

    let outcome = ctl.execute(MovementRequest::direct(0)).await;
    assert!(matches!(
        outcome,
        MovementOutcome::AlreadyAtTarget { difference: -40, .. }
    ));
    assert_eq!(outcome.class(), None);
    assert!(journal.writes().is_empty());
}

// ── Codec threshold ─────────────────────────────────────────────────

#[tokio::test]
async fn sign_threshold_comes_from_config() {
    // 0xA000 is negative under 0x8000 but a huge positive under 0xB000.
    let words = [0xA000, 0, 0xA000, 0, 0xA000, 0, 0xA000, 0];

    let port = scripted().then_words(&words);
    let mut ctl = controller(port);
    let outcome = ctl.execute(MovementRequest::direct(0)).await;
    assert!(matches!(
        &outcome,
        MovementOutcome::Rejected(PreflightError::FrameOutOfRange { frame })
            if frame.min_position() == 0xA000 - 0x10000
    ));

    let mut cfg = config();
    cfg.frame.sign_threshold = 0xB000;
    let port = scripted().then_words(&words);
    let mut ctl = controller_with(port, &cfg);
    let outcome = ctl.execute(MovementRequest::direct(0)).await;
    assert!(matches!(
        &outcome,
        MovementOutcome::Rejected(PreflightError::FrameOutOfRange { frame })
            if frame.min_position() == 0xA000
    ));
}

// ── Port failures ───────────────────────────────────────────────────

#[tokio::test]
async fn transport_error_in_preflight_returns_to_idle() {
    let port = scripted()
        .fail_next_flag_read(PortError::Timeout(std::time::Duration::from_millis(1000)))
        .then_frame(&[0, 0, 0, 0]);
    let journal = port.journal();
    let mut ctl = controller(port);

    let outcome = ctl.execute(MovementRequest::direct(1000)).await;
    assert!(matches!(
        outcome,
        MovementOutcome::Rejected(PreflightError::Transport(PortError::Timeout(_)))
    ));
    assert_eq!(outcome.class(), Some(ErrorClass::Transport));
    assert!(journal.writes().is_empty());
    assert_eq!(ctl.state(), ControllerState::Idle);

    // Nothing sticky: the next request runs.
    let outcome = ctl.execute(MovementRequest::direct(0)).await;
    assert!(outcome.reached_target());
}

#[tokio::test]
async fn malformed_block_in_preflight_faults_after_stop() {
    let port = scripted().then_words(&[0, 0, 0]);
    let journal = port.journal();
    let mut ctl = controller(port);

    let outcome = ctl.execute(MovementRequest::direct(1000)).await;
    match outcome {
        MovementOutcome::Faulted(report) => {
            assert_eq!(report.trigger, FaultTrigger::DeviceReply);
            assert!(matches!(report.error, PortError::Protocol(_)));
        }
        other => panic!("unexpected outcome {other}"),
    }
    assert_eq!(journal.writes(), stop_writes());
    assert_eq!(ctl.state(), ControllerState::Faulted);
}

#[tokio::test]
async fn preflight_reads_flags_before_frame() {
    let port = scripted().then_frame(&[500, 500, 500, 500]);
    let journal = port.journal();
    let mut ctl = controller(port);

    ctl.execute(MovementRequest::direct(510)).await;
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
        ]
    );
}
