//! Device port trait and error types.
//!
//! This module defines:
//! - `DevicePort` trait - Typed request/response access to the field device
//! - `PortError` enum - Transport and protocol failures
//! - `read_frame` / `read_direction_flags` - Decoding helpers at the port boundary
//!
//! The controller never sees transport-specific response shapes: positions
//! arrive as a [`FrameSnapshot`] produced by [`read_frame`].

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::frame::{DirectionFlags, FrameError, FrameLayout, FrameSnapshot};

/// Error types for device port operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// Connection lost or could not be established.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The device did not answer within the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The device answered with an exception or a malformed reply.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No connection is open and the port may not open one.
    #[error("Device port not connected")]
    NotConnected,
}

impl PortError {
    /// Whether the error is a transport failure (disconnect, timeout).
    ///
    /// Protocol errors mean the device answered but the answer is unusable.
    #[inline]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout(_) | Self::NotConnected
        )
    }
}

impl From<FrameError> for PortError {
    fn from(err: FrameError) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// Trait defining the interface for field device ports.
///
/// Every operation is a single request/response round-trip with no implicit
/// queuing. An operation either returns fresh data or fails; stale data is
/// never returned.
///
/// # Reconnect Policy
///
/// Implementations own their connection. Reads may transparently reconnect
/// and retry with backoff. Writes are attempted once so that a failed stop
/// command always reaches the caller.
#[async_trait]
pub trait DevicePort: Send {
    /// Returns the driver's identifier (e.g., "modbus", "simulation").
    fn name(&self) -> &'static str;

    /// Read `count` boolean flags starting at `address`.
    async fn read_flags(&mut self, address: u16, count: u16) -> Result<Vec<bool>, PortError>;

    /// Read `count` 16-bit words starting at `address`.
    async fn read_words(&mut self, address: u16, count: u16) -> Result<Vec<u16>, PortError>;

    /// Write a single boolean flag.
    async fn write_flag(&mut self, address: u16, value: bool) -> Result<(), PortError>;

    /// Release the connection.
    ///
    /// Default implementation does nothing.
    async fn shutdown(&mut self) -> Result<(), PortError> {
        Ok(())
    }
}

#[async_trait]
impl<P: DevicePort + ?Sized> DevicePort for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn read_flags(&mut self, address: u16, count: u16) -> Result<Vec<bool>, PortError> {
        (**self).read_flags(address, count).await
    }

    async fn read_words(&mut self, address: u16, count: u16) -> Result<Vec<u16>, PortError> {
        (**self).read_words(address, count).await
    }

    async fn write_flag(&mut self, address: u16, value: bool) -> Result<(), PortError> {
        (**self).write_flag(address, value).await
    }

    async fn shutdown(&mut self) -> Result<(), PortError> {
        (**self).shutdown().await
    }
}

/// Take one snapshot of the frame with a single batch register read.
pub async fn read_frame<P>(port: &mut P, layout: &FrameLayout) -> Result<FrameSnapshot, PortError>
where
    P: DevicePort + ?Sized,
{
    let words = port
        .read_words(layout.register_base, layout.block_len())
        .await?;
    Ok(layout.decode(&words)?)
}

/// Current state of the two direction flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagState {
    /// Move-toward-low flag asserted.
    pub move_low: bool,
    /// Move-toward-high flag asserted.
    pub move_high: bool,
}

impl FlagState {
    /// Whether either direction is asserted.
    #[inline]
    pub const fn any(&self) -> bool {
        self.move_low || self.move_high
    }
}

/// Read both direction flags, one request per flag.
pub async fn read_direction_flags<P>(
    port: &mut P,
    flags: &DirectionFlags,
) -> Result<FlagState, PortError>
where
    P: DevicePort + ?Sized,
{
    let move_low = read_single_flag(port, flags.move_low).await?;
    let move_high = read_single_flag(port, flags.move_high).await?;
    Ok(FlagState {
        move_low,
        move_high,
    })
}

async fn read_single_flag<P>(port: &mut P, address: u16) -> Result<bool, PortError>
where
    P: DevicePort + ?Sized,
{
    port.read_flags(address, 1)
        .await?
        .first()
        .copied()
        .ok_or_else(|| PortError::Protocol(format!("empty reply reading flag {address}")))
}
