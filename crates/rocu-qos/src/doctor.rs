use anyhow::Result;

use crate::MIN_TARGET_KBPS;

pub fn check_target(initial_target_kbps: u32) -> Result<()> {
    anyhow::ensure!(
        initial_target_kbps >= MIN_TARGET_KBPS,
        "qos.initial_target_kbps too low; set >= {}",
        MIN_TARGET_KBPS
    );
    anyhow::ensure!(initial_target_kbps <= 50_000, "qos.initial_target_kbps unreasonably high");
    Ok(())
}
