pub mod doctor;

use std::sync::atomic::{AtomicU32, Ordering};

use rocu_proto::{QosAdvice, QosReport};
use rocu_session::Journal;
use serde_json::{Map, Value};
use tracing::{info, warn};

pub const DEFAULT_TARGET_KBPS: u32 = 1500;
/// Recommendations never go below this.
pub const MIN_TARGET_KBPS: u32 = 300;

const LOW_BITRATE_KBPS: f64 = 600.0;
const HIGH_JITTER_S: f64 = 0.04;
const HIGH_RTT_MS: f64 = 250.0;
const BACKOFF: f64 = 0.75;

/// Whether a report shows a degraded link. A zero bitrate means "not
/// measured" and does not count as low.
pub fn is_degraded(r: &QosReport) -> bool {
    (r.bitrate_kbps > 0.0 && r.bitrate_kbps < LOW_BITRATE_KBPS)
        || r.jitter > HIGH_JITTER_S
        || r.rtt_ms > HIGH_RTT_MS
}

/// Stateless policy: cut the current target by 25% (floored, min 300) when
/// the link is degraded, otherwise no recommendation.
pub fn recommend(r: &QosReport, current_kbps: u32) -> Option<u32> {
    if !is_degraded(r) {
        return None;
    }
    let cut = (current_kbps as f64 * BACKOFF).floor() as u32;
    Some(cut.max(MIN_TARGET_KBPS))
}

/// Holds the video link's current target bitrate and evaluates reports
/// against it. The target changes only through [`BitrateAdvisor::set_target_kbps`].
pub struct BitrateAdvisor {
    target_kbps: AtomicU32,
    log: Journal,
}

impl BitrateAdvisor {
    pub fn new(initial_target_kbps: u32, log: Journal) -> Self {
        Self { target_kbps: AtomicU32::new(initial_target_kbps), log }
    }

    pub fn target_kbps(&self) -> u32 {
        self.target_kbps.load(Ordering::Relaxed)
    }

    pub fn set_target_kbps(&self, kbps: u32) {
        info!(kbps, "video target bitrate set");
        self.target_kbps.store(kbps, Ordering::Relaxed);
    }

    pub fn log(&self) -> &Journal {
        &self.log
    }

    /// Evaluate one client payload and return the advice for it.
    ///
    /// The payload is logged as received (best-effort), with `ts` added only
    /// when the client did not send one. A payload whose report fields are
    /// not numbers is rejected and not logged.
    pub async fn report(&self, mut payload: Map<String, Value>, ts: f64) -> Result<QosAdvice, serde_json::Error> {
        let report: QosReport = serde_json::from_value(Value::Object(payload.clone()))?;
        payload.entry("ts").or_insert(Value::from(ts));
        if let Err(e) = self.log.append(&payload).await {
            warn!("qos log write failed: {:#}", e);
        }
        let advice = recommend(&report, self.target_kbps());
        if let Some(kbps) = advice {
            info!(
                kbps,
                bitrate_kbps = report.bitrate_kbps,
                jitter = report.jitter,
                rtt_ms = report.rtt_ms,
                "qos degraded, recommending lower bitrate"
            );
        }
        Ok(QosAdvice { recommend_max_kbps: advice })
    }
}
