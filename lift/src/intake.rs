//! Line-oriented command intake.
//!
//! The relay forwards client messages as one JSON object per line
//! (`{"requestedMotion": 1 | 2 | 3}`). Every line is answered with exactly
//! one JSON line saying whether the controller took the command, plus its
//! current status.

use lift_common::control::command::{MotionCommand, MotionMessage};
use lift_common::control::outcome::ErrorClass;
use lift_control::ControllerHandle;
use serde::Serialize;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::report::StatusView;

/// Answer to one command line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<ErrorClass>,
    pub status: StatusView,
}

impl Reply {
    fn new(handle: &ControllerHandle, accepted: bool) -> Self {
        Self {
            accepted,
            error: None,
            class: None,
            status: StatusView::from(&handle.current_state()),
        }
    }

    fn refused(handle: &ControllerHandle, error: String, class: ErrorClass) -> Self {
        Self {
            error: Some(error),
            class: Some(class),
            ..Self::new(handle, false)
        }
    }
}

/// Decode one line and hand the command to the controller.
pub fn handle_line(handle: &ControllerHandle, line: &str) -> Reply {
    let message: MotionMessage = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => {
            warn!("Malformed relay command {:?}: {}", line, e);
            return Reply::refused(
                handle,
                format!("malformed command: {e}"),
                ErrorClass::Validation,
            );
        }
    };
    let command = match MotionCommand::try_from(message) {
        Ok(command) => command,
        Err(e) => {
            warn!("Relay command refused: {}", e);
            return Reply::refused(handle, e.to_string(), ErrorClass::Validation);
        }
    };

    match command {
        MotionCommand::Move(preset) => match handle.request_move(preset) {
            Ok(()) => {
                info!(%preset, "Relay move accepted");
                Reply::new(handle, true)
            }
            Err(rejection) => {
                warn!(%preset, "Relay move rejected: {}", rejection);
                Reply::refused(handle, rejection.to_string(), rejection.class())
            }
        },
        // Abort without an active session is accepted and changes nothing.
        MotionCommand::Abort => {
            let ack = handle.request_abort();
            debug!(?ack, "Relay abort accepted");
            Reply::new(handle, true)
        }
    }
}

/// Serve commands from `reader` until it closes.
///
/// Input that is not UTF-8 is refused like malformed JSON; only I/O errors
/// end the loop.
pub async fn run<R, W>(handle: &ControllerHandle, mut reader: R, mut writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut raw = Vec::new();
    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw).await? == 0 {
            return Ok(());
        }
        let reply = match std::str::from_utf8(&raw) {
            Ok(line) => {
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                debug!(line = text, "Relay command received");
                handle_line(handle, text)
            }
            Err(e) => {
                warn!("Relay command is not UTF-8: {}", e);
                Reply::refused(handle, format!("malformed command: {e}"), ErrorClass::Validation)
            }
        };
        let mut encoded = serde_json::to_vec(&reply).map_err(io::Error::other)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
        writer.flush().await?;
    }
}
