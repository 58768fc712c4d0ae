//! Stop write sequence.
//!
//! The single guaranteed cleanup action: write `false` to both direction
//! flags. Both writes are always attempted, even when the first one fails;
//! the caller learns about the first failure and must treat the actuator
//! state as unknown.

use lift_common::frame::DirectionFlags;
use lift_common::port::{DevicePort, PortError};
use tracing::{debug, error};

/// Clear both direction flags, low first.
///
/// # Errors
/// The first write error. The second write is attempted regardless.
pub async fn stop_all<P>(port: &mut P, flags: &DirectionFlags) -> Result<(), PortError>
where
    P: DevicePort + ?Sized,
{
    let mut first_error = None;
    for address in flags.both() {
        match port.write_flag(address, false).await {
            Ok(()) => debug!("direction flag {} cleared", address),
            Err(err) => {
                error!("failed to clear direction flag {}: {}", address, err);
                first_error.get_or_insert(err);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}
