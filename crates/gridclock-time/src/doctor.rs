use anyhow::Result;

use crate::clock::{ClockResolver, ZoneConfig};

pub fn check_zone(cfg: &ZoneConfig) -> Result<()> {
    anyhow::ensure!((-12..=14).contains(&cfg.utc_offset_hours), "clock.utc_offset_hours out of range");
    anyhow::ensure!(!cfg.standard_label.is_empty(), "clock.standard_label is empty");
    anyhow::ensure!(!cfg.daylight_label.is_empty(), "clock.daylight_label is empty");
    anyhow::ensure!(cfg.dst_delta_s >= 0 && cfg.dst_delta_s <= 7_200, "clock.dst_delta_s should be 0..7200");
    ClockResolver::new(cfg.clone())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eastern_passes() {
        check_zone(&ZoneConfig::us_eastern()).unwrap();
    }

    #[test]
    fn bad_offset_fails() {
        let mut cfg = ZoneConfig::us_eastern();
        cfg.utc_offset_hours = 20;
        assert!(check_zone(&cfg).is_err());
    }
}
