use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    /// Hold time at the waypoint. Carried but not acted on by the autopilot.
    #[serde(default)]
    pub hold_s: f64,
}

impl Waypoint {
    pub fn position(&self) -> Position {
        Position { lat: self.lat, lon: self.lon }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionUpload {
    pub waypoints: Vec<Waypoint>,
}

/// Snapshot returned by the mission control endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionStatus {
    pub active: bool,
    pub paused: bool,
    pub idx: usize,
    pub rtl: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_defaults_to_zero() {
        let m: MissionUpload = serde_json::from_str(r#"{"waypoints":[{"lat":1.0,"lon":2.0}]}"#).unwrap();
        assert_eq!(m.waypoints[0].hold_s, 0.0);
    }
}
