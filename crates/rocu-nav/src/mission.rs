use rocu_proto::{MissionStatus, Position, Waypoint};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionAction {
    Go,
    Pause,
    Rtl,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown mission action: {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for MissionAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GO" => Ok(MissionAction::Go),
            "PAUSE" => Ok(MissionAction::Pause),
            "RTL" => Ok(MissionAction::Rtl),
            _ => Err(UnknownAction(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Waypoint { idx: usize, pos: Position },
    Home(Position),
}

impl Target {
    pub fn position(&self) -> Position {
        match *self {
            Target::Waypoint { pos, .. } => pos,
            Target::Home(pos) => pos,
        }
    }
}

/// Result of reaching the current target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// Moved on to this waypoint index; the mission continues.
    Advanced(usize),
    /// Reached the final index; the mission is now idle.
    Completed,
    /// Back home; return-to-launch finished and the mission is idle.
    Home,
}

impl Arrival {
    pub fn stops_vehicle(&self) -> bool {
        !matches!(self, Arrival::Advanced(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MissionState {
    home: Option<Position>,
    rtl: bool,
    active: bool,
    paused: bool,
    waypoints: Vec<Waypoint>,
    current_idx: usize,
}

impl MissionState {
    /// Replace the route and restart from its first waypoint.
    pub fn set_waypoints(&mut self, waypoints: Vec<Waypoint>) -> usize {
        self.waypoints = waypoints;
        self.current_idx = 0;
        self.waypoints.len()
    }

    pub fn home(&self) -> Option<Position> {
        self.home
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_returning_home(&self) -> bool {
        self.rtl
    }

    /// Cursor clamped into the route (0 for an empty route).
    pub fn current_index(&self) -> usize {
        self.current_idx.min(self.waypoints.len().saturating_sub(1))
    }

    pub fn status(&self) -> MissionStatus {
        MissionStatus {
            active: self.active,
            paused: self.paused,
            idx: self.current_index(),
            rtl: self.rtl,
        }
    }

    /// Start or resume the route. Home is captured from `pose` only once.
    pub fn go(&mut self, pose: Option<Position>) {
        self.active = true;
        self.paused = false;
        self.rtl = false;
        if self.home.is_none() {
            self.home = pose;
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn return_home(&mut self) {
        self.active = true;
        self.paused = false;
        self.rtl = true;
    }

    pub fn target(&self) -> Option<Target> {
        if let (true, Some(home)) = (self.rtl, self.home) {
            return Some(Target::Home(home));
        }
        let idx = self.current_index();
        self.waypoints.get(idx).map(|wp| Target::Waypoint { idx, pos: wp.position() })
    }

    /// Apply the arrival transition for the current target.
    pub fn arrive(&mut self) -> Arrival {
        if self.rtl {
            self.active = false;
            self.rtl = false;
            return Arrival::Home;
        }
        let last = self.waypoints.len().saturating_sub(1);
        self.current_idx = (self.current_idx + 1).min(last);
        if self.current_idx == last {
            self.active = false;
            Arrival::Completed
        } else {
            Arrival::Advanced(self.current_idx)
        }
    }
}
