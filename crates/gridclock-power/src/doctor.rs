use anyhow::Result;
use crate::BatteryConfig;

pub fn check_battery(cfg: &BatteryConfig) -> Result<()> {
    let points = cfg.curve.points();
    anyhow::ensure!(cfg.cutoff < points[10], "battery.cutoff {} is above the full-charge point", cfg.cutoff);
    anyhow::ensure!(cfg.poll_interval_s >= 1 && cfg.poll_interval_s <= 3_600, "battery.poll_interval_s should be 1..3600");
    if cfg.cutoff > points[0] {
        tracing::warn!("battery.cutoff {} is above the 0% floor {}", cfg.cutoff, points[0]);
    }
    Ok(())
}
