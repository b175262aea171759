use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rocu_proto::{LinkMessage, Metrics, TelemetryFrame};
use tokio::time::Instant;
use tracing::info;

use crate::clock::{SystemWallClock, WallClock};
use crate::link::{LinkError, LinkHandle};
use crate::lock;
use crate::safety::Heartbeat;

pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(800);

#[derive(Debug, Default)]
struct TelemetrySlot {
    beat: Heartbeat,
    frame: Option<TelemetryFrame>,
}

/// Shared vehicle/session state: the vehicle link slot, the observer set,
/// the latest telemetry frame and the command/telemetry heartbeats.
///
/// One instance is created at startup and shared by reference (`Arc`)
/// between the link readers, request handlers and the autopilot loop.
pub struct SessionState {
    clock: Arc<dyn WallClock>,
    started: Instant,
    heartbeat_timeout: Duration,

    // Held while a message is enqueued so concurrent writers serialize and a
    // reconnect cannot swap the handle mid-send. Enqueue never waits.
    vehicle: tokio::sync::Mutex<Option<LinkHandle>>,
    // Mirror of the attached vehicle id (0 = none), readable without
    // waiting on an in-flight send.
    vehicle_id: AtomicU64,

    observers: Mutex<HashMap<u64, LinkHandle>>,
    command: Mutex<Heartbeat>,
    telemetry: Mutex<TelemetrySlot>,
}

impl SessionState {
    pub fn new(heartbeat_timeout: Duration) -> Self {
        Self::with_clock(heartbeat_timeout, Arc::new(SystemWallClock))
    }

    pub fn with_clock(heartbeat_timeout: Duration, clock: Arc<dyn WallClock>) -> Self {
        Self {
            clock,
            started: Instant::now(),
            heartbeat_timeout,
            vehicle: tokio::sync::Mutex::new(None),
            vehicle_id: AtomicU64::new(0),
            observers: Mutex::new(HashMap::new()),
            command: Mutex::new(Heartbeat::default()),
            telemetry: Mutex::new(TelemetrySlot::default()),
        }
    }

    pub fn wall_now(&self) -> f64 {
        self.clock.now_s()
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    // ----- vehicle link -----

    /// Install a new vehicle link, replacing (and returning) any previous one.
    pub async fn attach_vehicle(&self, link: LinkHandle) -> Option<LinkHandle> {
        let mut slot = self.vehicle.lock().await;
        self.vehicle_id.store(link.id(), Ordering::SeqCst);
        info!(link_id = link.id(), "vehicle link attached");
        slot.replace(link)
    }

    /// Clear the vehicle link if it is still the one identified by `id`.
    pub async fn detach_vehicle(&self, id: u64) -> bool {
        let mut slot = self.vehicle.lock().await;
        match slot.as_ref() {
            Some(cur) if cur.id() == id => {
                *slot = None;
                self.vehicle_id.store(0, Ordering::SeqCst);
                info!(link_id = id, "vehicle link detached");
                true
            }
            _ => false,
        }
    }

    pub fn has_vehicle(&self) -> bool {
        self.vehicle_id.load(Ordering::SeqCst) != 0
    }

    /// Serialize and enqueue one message for the vehicle link.
    ///
    /// A stalled vehicle whose queue is full gets `LinkError::Full` rather
    /// than a wait, so the slot lock is only ever held briefly.
    pub async fn send_to_vehicle(&self, msg: &LinkMessage) -> Result<(), LinkError> {
        let text = serde_json::to_string(msg)?;
        let slot = self.vehicle.lock().await;
        match slot.as_ref() {
            Some(link) => link.try_send(text),
            None => Err(LinkError::NotConnected),
        }
    }

    // ----- observers -----

    pub fn add_observer(&self, link: LinkHandle) {
        lock(&self.observers).insert(link.id(), link);
    }

    pub fn remove_observer(&self, id: u64) -> bool {
        lock(&self.observers).remove(&id).is_some()
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.observers).len()
    }

    /// Consistent copy of the observer set taken under the lock.
    pub fn observers_snapshot(&self) -> Vec<LinkHandle> {
        lock(&self.observers).values().cloned().collect()
    }

    pub(crate) fn prune_observers(&self, ids: &[u64]) {
        let mut obs = lock(&self.observers);
        for id in ids {
            obs.remove(id);
        }
    }

    // ----- heartbeats -----

    /// Refresh the operator-command heartbeat. Returns the wall stamp used.
    pub fn record_command(&self) -> f64 {
        let ts = self.wall_now();
        lock(&self.command).beat(ts, Instant::now());
        ts
    }

    /// Replace the latest frame and refresh the telemetry heartbeat.
    pub fn record_telemetry(&self, frame: TelemetryFrame) {
        let ts = self.wall_now();
        let mut t = lock(&self.telemetry);
        t.beat.beat(ts, Instant::now());
        t.frame = Some(frame);
    }

    pub fn last_frame(&self) -> Option<TelemetryFrame> {
        lock(&self.telemetry).frame.clone()
    }

    pub fn last_cmd_ts(&self) -> Option<f64> {
        lock(&self.command).wall_s()
    }

    pub fn last_telemetry_ts(&self) -> Option<f64> {
        lock(&self.telemetry).beat.wall_s()
    }

    /// Monotonic time since the last operator command (`Duration::MAX` if none).
    pub fn dead_man_elapsed(&self) -> Duration {
        lock(&self.command).age(Instant::now())
    }

    pub fn telemetry_age(&self) -> Duration {
        lock(&self.telemetry).beat.age(Instant::now())
    }

    /// Dead-man signal. Advisory: nothing here stops the vehicle on its own.
    pub fn safe_mode(&self) -> bool {
        self.dead_man_elapsed() > self.heartbeat_timeout
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            safe_mode: self.safe_mode(),
            last_cmd_ts: self.last_cmd_ts(),
            last_telemetry_ts: self.last_telemetry_ts(),
            telemetry_clients: self.observer_count(),
            sim_connected: self.has_vehicle(),
            uptime_s: self.uptime().as_secs_f64(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_TIMEOUT)
    }
}
