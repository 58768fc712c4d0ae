//! Frame data model: actuator readings, the position codec, the register
//! layout that turns one batch read into a snapshot, and deployment config.

pub mod codec;
pub mod config;
pub mod layout;
pub mod types;

pub use codec::PositionCodec;
pub use layout::FrameLayout;
pub use types::{ActuatorReading, Direction, DirectionFlags, FrameError, FrameSnapshot};
