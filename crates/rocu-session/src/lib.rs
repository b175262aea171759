pub mod clock;
pub mod fanout;
pub mod journal;
pub mod link;
pub mod normalize;
pub mod relay;
pub mod safety;
pub mod state;

pub use clock::{SystemWallClock, WallClock};
pub use fanout::{broadcast, FanoutReport};
pub use journal::Journal;
pub use link::{LinkError, LinkHandle};
pub use normalize::{handle_vehicle_text, normalize_yaw, parse_vehicle_text, NormalizeError};
pub use relay::relay_drive;
pub use safety::Heartbeat;
pub use state::SessionState;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a std mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
