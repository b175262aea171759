use anyhow::Result;
use std::time::Duration;
use tokio::time::Instant;

/// Last-seen marker for a recurring event (operator command, vehicle frame).
///
/// Keeps a wall-clock stamp for display next to a monotonic stamp for age
/// computation. Only the monotonic stamp feeds [`Heartbeat::age`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Heartbeat {
    wall_s: Option<f64>,
    mono: Option<Instant>,
}

impl Heartbeat {
    pub fn beat(&mut self, wall_s: f64, now: Instant) {
        self.wall_s = Some(wall_s);
        self.mono = Some(now);
    }

    pub fn wall_s(&self) -> Option<f64> {
        self.wall_s
    }

    /// Time since the last beat, `Duration::MAX` if there never was one.
    pub fn age(&self, now: Instant) -> Duration {
        match self.mono {
            Some(t) => now.saturating_duration_since(t),
            None => Duration::MAX,
        }
    }

    pub fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        self.age(now) > timeout
    }
}

pub fn check_heartbeat_timeout(timeout_ms: u64) -> Result<()> {
    anyhow::ensure!((100..=10_000).contains(&timeout_ms), "safety.heartbeat_timeout_ms should be 100..10000");
    Ok(())
}
