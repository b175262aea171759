use anyhow::Result;
use std::path::Path;

use crate::AutopilotConfig;

pub fn check_autopilot(cfg: &AutopilotConfig) -> Result<()> {
    anyhow::ensure!((20..=2000).contains(&cfg.period_ms), "mission.period_ms should be 20..2000");
    anyhow::ensure!(cfg.arrive_radius_m > 0.0 && cfg.arrive_radius_m.is_finite(), "mission.arrive_radius_m must be > 0");
    anyhow::ensure!(cfg.gain > 0.0 && cfg.gain.is_finite(), "mission.gain must be > 0");
    anyhow::ensure!(cfg.max_speed > 0.0 && cfg.max_speed <= 5.0, "mission.max_speed should be in (0, 5] m/s");
    Ok(())
}

/// The log file may not exist yet, but the directory it goes in must.
pub fn check_log_path(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::ensure!(path.is_file(), "log path is not a file: {}", path.display());
        return Ok(());
    }
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    anyhow::ensure!(dir.is_dir(), "log directory missing: {}", dir.display());
    Ok(())
}
