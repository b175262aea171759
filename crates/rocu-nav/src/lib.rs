pub mod autopilot;
pub mod doctor;
pub mod export;
pub mod geo;
pub mod mission;

use serde::Deserialize;
use std::time::Duration;

pub use autopilot::{Autopilot, MissionLogRecord, SkipReason, TickOutcome};
pub use export::{mission_log_csv, CSV_HEADER};
pub use mission::{Arrival, MissionAction, MissionState, Target};

/// Tunables for the waypoint-following loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Control loop period
    pub period_ms: u64,
    /// Distance under which a target counts as reached (strict `<`)
    pub arrive_radius_m: f64,
    /// Proportional gain, m/s per metre of offset
    pub gain: f64,
    /// Saturation applied to each velocity axis
    pub max_speed: f64,
}

impl AutopilotConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self { period_ms: 200, arrive_radius_m: 2.0, gain: 0.05, max_speed: 1.0 }
    }
}
