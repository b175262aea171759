use serde::{Deserialize, Serialize};

/// One vehicle state sample as reported over the vehicle link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Unix timestamp (seconds)
    pub ts: f64,
    pub seq: u64,
    pub imu_ax: f64,
    pub imu_ay: f64,
    pub imu_az: f64,
    /// Radians, canonical range (-pi, pi] once normalized
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub lat: f64,
    pub lon: f64,
    pub vx: f64,
    pub vy: f64,
    pub wz: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveCommand {
    pub ts: f64,
    /// forward m/s
    pub vx: f64,
    /// lateral m/s
    pub vy: f64,
    /// yaw rate rad/s
    pub wz: f64,
}

impl DriveCommand {
    pub fn stop(ts: f64) -> Self {
        Self { ts, vx: 0.0, vy: 0.0, wz: 0.0 }
    }

    pub fn is_stop(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0 && self.wz == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Drive,
}

/// Envelope spoken on the vehicle link, `{"type": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkMessage {
    Telemetry { data: TelemetryFrame },
    Command { command: CommandKind, data: DriveCommand },
}

impl LinkMessage {
    pub fn drive(cmd: DriveCommand) -> Self {
        LinkMessage::Command { command: CommandKind::Drive, data: cmd }
    }
}

/// Observer-facing view of a frame: the frame fields plus `yaw_deg`.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryView<'a> {
    #[serde(flatten)]
    pub frame: &'a TelemetryFrame,
    pub yaw_deg: f64,
}

impl<'a> TelemetryView<'a> {
    pub fn new(frame: &'a TelemetryFrame) -> Self {
        let yaw_deg = (frame.yaw.to_degrees() * 10.0).round() / 10.0;
        Self { frame, yaw_deg }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObserverMessage<'a> {
    Telemetry { data: TelemetryView<'a> },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(yaw: f64) -> TelemetryFrame {
        TelemetryFrame {
            ts: 1.0, seq: 7,
            imu_ax: 0.0, imu_ay: 0.0, imu_az: 9.81,
            yaw, pitch: 0.0, roll: 0.0,
            lat: 32.0853, lon: 34.7818,
            vx: 0.5, vy: 0.0, wz: 0.1,
        }
    }

    #[test]
    fn drive_envelope_shape() {
        let s = serde_json::to_value(LinkMessage::drive(DriveCommand::stop(12.5))).unwrap();
        assert_eq!(s["type"], "command");
        assert_eq!(s["command"], "drive");
        assert_eq!(s["data"]["vx"], 0.0);
        assert_eq!(s["data"]["ts"], 12.5);
    }

    #[test]
    fn observer_payload_flattens_frame_and_adds_yaw_deg() {
        let f = frame(std::f64::consts::FRAC_PI_2);
        let v = serde_json::to_value(ObserverMessage::Telemetry { data: TelemetryView::new(&f) }).unwrap();
        assert_eq!(v["type"], "telemetry");
        assert_eq!(v["data"]["seq"], 7);
        assert_eq!(v["data"]["lat"], 32.0853);
        assert_eq!(v["data"]["yaw_deg"], 90.0);
    }

    #[test]
    fn yaw_deg_rounds_to_one_decimal() {
        let f = frame(0.123456);
        assert_eq!(TelemetryView::new(&f).yaw_deg, 7.1);
    }

    #[test]
    fn telemetry_envelope_parses() {
        let raw = r#"{"type":"telemetry","data":{"ts":1,"seq":2,"imu_ax":0,"imu_ay":0,"imu_az":9.8,
            "yaw":0.5,"pitch":0,"roll":0,"lat":1,"lon":2,"vx":0,"vy":0,"wz":0}}"#;
        match serde_json::from_str::<LinkMessage>(raw).unwrap() {
            LinkMessage::Telemetry { data } => assert_eq!(data.seq, 2),
            other => panic!("unexpected {:?}", other),
        }
    }
}
