use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rocu_proto::{DriveCommand, LinkMessage, MissionStatus, Position, TelemetryFrame, Waypoint};
use rocu_session::{Journal, SessionState};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::geo::{offset_m, steer};
use crate::mission::{Arrival, MissionAction, MissionState, Target};
use crate::AutopilotConfig;

/// One line of the mission log, written for every steering tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionLogRecord {
    pub ts: f64,
    pub lat: f64,
    pub lon: f64,
    pub vx: f64,
    pub vy: f64,
    pub wz: f64,
    /// Clamped route index; while returning home this is the last route index.
    pub idx: usize,
    #[serde(default)]
    pub rtl: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Inactive,
    Paused,
    NoWaypoints,
    NoVehicle,
    NoPose,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Skipped(SkipReason),
    Arrived(Arrival),
    Steered { cmd: DriveCommand, distance_m: f64 },
}

enum Plan {
    Skip(SkipReason),
    Arrived(Arrival),
    Drive { cmd: DriveCommand, distance_m: f64, record: MissionLogRecord },
}

/// Waypoint-following control loop plus the mission control surface.
pub struct Autopilot {
    session: Arc<SessionState>,
    mission: Mutex<MissionState>,
    log: Journal,
    cfg: AutopilotConfig,
}

impl Autopilot {
    pub fn new(session: Arc<SessionState>, log: Journal, cfg: AutopilotConfig) -> Self {
        Self { session, mission: Mutex::new(MissionState::default()), log, cfg }
    }

    pub fn log(&self) -> &Journal {
        &self.log
    }

    fn mission(&self) -> MutexGuard<'_, MissionState> {
        self.mission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> MissionStatus {
        self.mission().status()
    }

    pub fn home(&self) -> Option<Position> {
        self.mission().home()
    }

    /// Replace the mission route; returns the waypoint count.
    pub fn set_mission(&self, waypoints: Vec<Waypoint>) -> usize {
        let n = self.mission().set_waypoints(waypoints);
        info!(waypoints = n, "mission loaded");
        n
    }

    pub async fn control(&self, action: MissionAction) -> MissionStatus {
        let status = {
            let mut m = self.mission();
            match action {
                MissionAction::Go => {
                    let pose = self.session.last_frame().map(|f| pose_of(&f));
                    m.go(pose);
                }
                MissionAction::Pause => m.pause(),
                MissionAction::Rtl => m.return_home(),
            }
            m.status()
        };
        info!(?action, ?status, "mission control");

        if action == MissionAction::Pause {
            self.send_stop().await;
        }
        status
    }

    /// One control step. Never fails; transport and log errors are logged and dropped.
    pub async fn tick(&self) -> TickOutcome {
        let plan = {
            let mut m = self.mission();
            self.plan(&mut m)
        };

        match plan {
            Plan::Skip(reason) => TickOutcome::Skipped(reason),
            Plan::Arrived(arrival) => {
                info!(?arrival, "target reached");
                if arrival.stops_vehicle() {
                    self.send_stop().await;
                }
                TickOutcome::Arrived(arrival)
            }
            Plan::Drive { cmd, distance_m, record } => {
                if let Err(e) = self.session.send_to_vehicle(&LinkMessage::drive(cmd)).await {
                    debug!(error = %e, "autopilot command not delivered");
                }
                if let Err(e) = self.log.append(&record).await {
                    warn!("mission log write failed: {:#}", e);
                }
                TickOutcome::Steered { cmd, distance_m }
            }
        }
    }

    fn plan(&self, m: &mut MissionState) -> Plan {
        if !m.is_active() {
            return Plan::Skip(SkipReason::Inactive);
        }
        if m.is_paused() {
            return Plan::Skip(SkipReason::Paused);
        }
        if !self.session.has_vehicle() {
            return Plan::Skip(SkipReason::NoVehicle);
        }
        let Some(target) = m.target() else {
            return Plan::Skip(SkipReason::NoWaypoints);
        };
        let Some(frame) = self.session.last_frame() else {
            return Plan::Skip(SkipReason::NoPose);
        };

        let off = offset_m(pose_of(&frame), target.position());
        let distance_m = off.distance_m();
        if distance_m < self.cfg.arrive_radius_m {
            return Plan::Arrived(m.arrive());
        }

        let (vx, vy) = steer(off, self.cfg.gain, self.cfg.max_speed);
        let ts = self.session.wall_now();
        let idx = match target {
            Target::Waypoint { idx, .. } => idx,
            Target::Home(_) => m.current_index(),
        };
        let record = MissionLogRecord {
            ts,
            lat: frame.lat,
            lon: frame.lon,
            vx: frame.vx,
            vy: frame.vy,
            wz: frame.wz,
            idx,
            rtl: matches!(target, Target::Home(_)),
        };
        Plan::Drive { cmd: DriveCommand { ts, vx, vy, wz: 0.0 }, distance_m, record }
    }

    async fn send_stop(&self) {
        let stop = DriveCommand::stop(self.session.wall_now());
        if let Err(e) = self.session.send_to_vehicle(&LinkMessage::drive(stop)).await {
            debug!(error = %e, "stop command not delivered");
        }
    }

    /// Fixed-period loop; returns once `shutdown` flips to true or its sender is dropped.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.cfg.period().max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval fires immediately; the first real tick is one period out
        ticker.tick().await;
        info!(period_ms = self.cfg.period_ms, "autopilot loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.tick().await;
                    if let TickOutcome::Steered { cmd, distance_m } = outcome {
                        debug!(vx = cmd.vx, vy = cmd.vy, distance_m, "autopilot step");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("autopilot loop stopped");
    }
}

fn pose_of(f: &TelemetryFrame) -> Position {
    Position { lat: f.lat, lon: f.lon }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::METERS_PER_DEG;
    use rocu_session::LinkHandle;
    use tokio::sync::mpsc;

    fn frame_at(lat: f64, lon: f64) -> TelemetryFrame {
        TelemetryFrame {
            ts: 0.0, seq: 1,
            imu_ax: 0.0, imu_ay: 0.0, imu_az: 9.81,
            yaw: 0.0, pitch: 0.0, roll: 0.0,
            lat, lon,
            vx: 0.3, vy: 0.0, wz: 0.0,
        }
    }

    async fn rig(dir: &tempfile::TempDir) -> (Arc<SessionState>, Autopilot, mpsc::Receiver<String>) {
        let session = Arc::new(SessionState::default());
        let (v, rx) = LinkHandle::channel(16);
        session.attach_vehicle(v).await;
        let ap = Autopilot::new(session.clone(), Journal::new(dir.path().join("mission.jsonl")), AutopilotConfig::default());
        (session, ap, rx)
    }

    fn sent(rx: &mut mpsc::Receiver<String>) -> Vec<DriveCommand> {
        let mut out = Vec::new();
        while let Ok(text) = rx.try_recv() {
            match serde_json::from_str::<LinkMessage>(&text).unwrap() {
                LinkMessage::Command { data, .. } => out.push(data),
                other => panic!("unexpected {:?}", other),
            }
        }
        out
    }

    #[tokio::test]
    async fn idle_mission_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let (_s, ap, mut rx) = rig(&dir).await;
        assert_eq!(ap.tick().await, TickOutcome::Skipped(SkipReason::Inactive));
        assert!(sent(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn preconditions_each_block_the_tick() {
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(SessionState::default());
        let ap = Autopilot::new(session.clone(), Journal::new(dir.path().join("m.jsonl")), AutopilotConfig::default());

        ap.control(MissionAction::Go).await;
        assert_eq!(ap.tick().await, TickOutcome::Skipped(SkipReason::NoVehicle));

        let (v, _rx) = LinkHandle::channel(16);
        session.attach_vehicle(v).await;
        assert_eq!(ap.tick().await, TickOutcome::Skipped(SkipReason::NoWaypoints));

        ap.set_mission(vec![Waypoint { lat: 0.01, lon: 0.0, hold_s: 0.0 }]);
        assert_eq!(ap.tick().await, TickOutcome::Skipped(SkipReason::NoPose));

        session.record_telemetry(frame_at(0.0, 0.0));
        assert!(matches!(ap.tick().await, TickOutcome::Steered { .. }));
    }

    #[tokio::test]
    async fn arrival_threshold_is_strict() {
        let dir = tempfile::tempdir().unwrap();
        let (session, ap, mut rx) = rig(&dir).await;
        ap.set_mission(vec![
            Waypoint { lat: 0.0, lon: 0.0, hold_s: 0.0 },
            Waypoint { lat: 0.01, lon: 0.0, hold_s: 0.0 },
        ]);
        ap.control(MissionAction::Go).await;

        // 2.0 m east of the waypoint at the equator (cos(0) = 1): not arrived.
        session.record_telemetry(frame_at(0.0, -2.0 / METERS_PER_DEG));
        match ap.tick().await {
            TickOutcome::Steered { distance_m, .. } => assert!(distance_m >= 2.0),
            other => panic!("expected steering, got {:?}", other),
        }
        assert_eq!(ap.status().idx, 0);

        session.record_telemetry(frame_at(0.0, -1.999 / METERS_PER_DEG));
        assert_eq!(ap.tick().await, TickOutcome::Arrived(Arrival::Completed));
        let cmds = sent(&mut rx);
        assert_eq!(cmds.len(), 2);
        assert!(cmds[1].is_stop());
    }

    #[tokio::test]
    async fn steering_saturates_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let (session, ap, mut rx) = rig(&dir).await;
        ap.set_mission(vec![Waypoint { lat: 0.001, lon: -0.001, hold_s: 0.0 }]);
        session.record_telemetry(frame_at(0.0, 0.0));
        ap.control(MissionAction::Go).await;

        let TickOutcome::Steered { cmd, .. } = ap.tick().await else { panic!("expected steering") };
        assert_eq!(cmd.vx, 1.0);
        assert_eq!(cmd.vy, -1.0);
        assert_eq!(cmd.wz, 0.0);
        assert_eq!(sent(&mut rx), vec![cmd]);

        let recs: Vec<MissionLogRecord> = ap.log().read_all().await.unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].idx, 0);
        assert_eq!(recs[0].vx, 0.3);
        assert!(!recs[0].rtl);
    }

    #[tokio::test]
    async fn log_failure_does_not_stop_steering() {
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(SessionState::default());
        let (v, mut rx) = LinkHandle::channel(16);
        session.attach_vehicle(v).await;
        let ap = Autopilot::new(
            session.clone(),
            Journal::new(dir.path().join("missing-dir").join("m.jsonl")),
            AutopilotConfig::default(),
        );
        ap.set_mission(vec![Waypoint { lat: 0.001, lon: 0.0, hold_s: 0.0 }]);
        session.record_telemetry(frame_at(0.0, 0.0));
        ap.control(MissionAction::Go).await;

        assert!(matches!(ap.tick().await, TickOutcome::Steered { .. }));
        assert!(matches!(ap.tick().await, TickOutcome::Steered { .. }));
        assert_eq!(sent(&mut rx).len(), 2);
    }

    #[tokio::test]
    async fn return_home_logs_last_route_index_and_stops_on_arrival() {
        let dir = tempfile::tempdir().unwrap();
        let (session, ap, mut rx) = rig(&dir).await;
        ap.set_mission(vec![
            Waypoint { lat: 0.0, lon: 0.0, hold_s: 0.0 },
            Waypoint { lat: 0.001, lon: 0.0, hold_s: 0.0 },
            Waypoint { lat: 0.002, lon: 0.0, hold_s: 0.0 },
        ]);
        session.record_telemetry(frame_at(0.0, 0.0));
        ap.control(MissionAction::Go).await;
        assert_eq!(ap.home(), Some(Position { lat: 0.0, lon: 0.0 }));
        assert_eq!(ap.tick().await, TickOutcome::Arrived(Arrival::Advanced(1)));

        session.record_telemetry(frame_at(0.0005, 0.0));
        let st = ap.control(MissionAction::Rtl).await;
        assert!(st.rtl && st.active);
        let TickOutcome::Steered { cmd, .. } = ap.tick().await else { panic!("expected steering") };
        assert!(cmd.vx < 0.0);

        let recs: Vec<MissionLogRecord> = ap.log().read_all().await.unwrap();
        assert_eq!(recs.last().map(|r| (r.idx, r.rtl)), Some((1, true)));

        session.record_telemetry(frame_at(0.000001, 0.0));
        assert_eq!(ap.tick().await, TickOutcome::Arrived(Arrival::Home));
        let st = ap.status();
        assert!(!st.active && !st.rtl);
        assert!(sent(&mut rx).last().unwrap().is_stop());
        assert_eq!(ap.tick().await, TickOutcome::Skipped(SkipReason::Inactive));
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_ticks_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let (session, ap, mut rx) = rig(&dir).await;
        ap.set_mission(vec![Waypoint { lat: 0.01, lon: 0.0, hold_s: 0.0 }]);
        session.record_telemetry(frame_at(0.0, 0.0));
        ap.control(MissionAction::Go).await;

        let ap = Arc::new(ap);
        let (tx, shutdown) = watch::channel(false);
        let task = tokio::spawn(ap.clone().run(shutdown));

        for _ in 0..3 {
            assert!(rx.recv().await.is_some());
        }
        tx.send(true).unwrap();
        task.await.unwrap();
    }
}
