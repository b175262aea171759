use time::OffsetDateTime;

/// Wall-clock source. Display and log timestamps only; ages are always
/// computed from the monotonic clock.
pub trait WallClock: Send + Sync {
    /// Unix time in seconds.
    fn now_s(&self) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now_s(&self) -> f64 {
        OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9
    }
}
