use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandAck {
    pub accepted: bool,
    pub ts: f64,
    pub rtt_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub safe_mode: bool,
    pub last_cmd_ts: Option<f64>,
    pub last_telemetry_ts: Option<f64>,
    pub telemetry_clients: usize,
    pub sim_connected: bool,
    pub uptime_s: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub uptime_s: f64,
}

/// Network quality as reported by the video client. Missing or `null`
/// fields read as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QosReport {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub bitrate_kbps: f64,
    /// seconds
    #[serde(default, deserialize_with = "null_as_zero")]
    pub jitter: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub rtt_ms: f64,
}

fn null_as_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(0.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QosAdvice {
    pub recommend_max_kbps: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoTarget {
    pub max_kbps: u32,
}
