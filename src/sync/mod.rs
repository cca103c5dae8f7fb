//! Real-time synchronization between concurrently connected editors.
//!
//! This module provides:
//! - `SyncEvent` — typed mutation events mirroring the REST shapes
//! - `SyncHub` — broadcast channel fanning events out to clients
//! - `SyncChannel` — a client's connection, with echo suppression
//! - `PositionThrottle` — bounded-rate live drag broadcasting

mod channel;
mod events;
mod hub;
mod throttle;

pub use channel::SyncChannel;
pub use events::SyncEvent;
pub use hub::SyncHub;
pub use throttle::PositionThrottle;
