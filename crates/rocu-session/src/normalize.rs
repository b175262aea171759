use rocu_proto::{ObserverMessage, TelemetryFrame, TelemetryView};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::fanout::{broadcast, FanoutReport};
use crate::state::SessionState;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("telemetry message without data")]
    MissingData,
}

/// Map any angle onto (-pi, pi].
pub fn normalize_yaw(yaw: f64) -> f64 {
    yaw.sin().atan2(yaw.cos())
}

/// Parse one text message from the vehicle link.
///
/// `Ok(None)` for well-formed messages that are not telemetry.
pub fn parse_vehicle_text(raw: &str) -> Result<Option<TelemetryFrame>, NormalizeError> {
    let obj: Value = serde_json::from_str(raw)?;
    if obj.get("type").and_then(Value::as_str) != Some("telemetry") {
        return Ok(None);
    }
    let data = obj.get("data").ok_or(NormalizeError::MissingData)?;
    let mut frame = TelemetryFrame::deserialize(data)?;
    frame.yaw = normalize_yaw(frame.yaw);
    Ok(Some(frame))
}

impl SessionState {
    /// Store a normalized frame and build the observer payload for it.
    pub fn accept_telemetry(&self, frame: TelemetryFrame) -> Option<String> {
        let payload = serde_json::to_string(&ObserverMessage::Telemetry {
            data: TelemetryView::new(&frame),
        });
        self.record_telemetry(frame);
        match payload {
            Ok(p) => Some(p),
            Err(e) => {
                debug!(error = %e, "telemetry payload encode failed");
                None
            }
        }
    }
}

/// Vehicle-link reader step: validate, store, then fan out.
///
/// Malformed or non-telemetry messages are dropped without touching the
/// store or the observers.
pub fn handle_vehicle_text(session: &SessionState, raw: &str) -> Option<FanoutReport> {
    match parse_vehicle_text(raw) {
        Ok(Some(frame)) => {
            let payload = session.accept_telemetry(frame)?;
            Some(broadcast(session, &payload))
        }
        Ok(None) => None,
        Err(e) => {
            debug!(error = %e, "dropping malformed vehicle message");
            None
        }
    }
}
