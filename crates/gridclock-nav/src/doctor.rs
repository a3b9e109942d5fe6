use anyhow::Result;
use crate::heading::CalibrationOffsets;

const STANDARD_BAUDS: [u32; 8] = [4_800, 9_600, 19_200, 38_400, 57_600, 115_200, 230_400, 460_800];

pub fn check_receiver_link(initial_baud: u32, baud: u32, ack_timeout_ms: u64) -> Result<()> {
    anyhow::ensure!(STANDARD_BAUDS.contains(&initial_baud), "gnss.initial_baud {} is not a receiver baud rate", initial_baud);
    anyhow::ensure!(STANDARD_BAUDS.contains(&baud), "gnss.baud {} is not a receiver baud rate", baud);
    anyhow::ensure!(ack_timeout_ms >= 100 && ack_timeout_ms <= 10_000, "gnss.ack_timeout_ms should be 100..10000");
    Ok(())
}

pub fn check_compass(cal: &CalibrationOffsets) -> Result<()> {
    anyhow::ensure!(cal.offset_x.is_finite() && cal.offset_y.is_finite(), "compass offsets must be finite");
    anyhow::ensure!(cal.declination.abs() <= 180.0, "compass.declination should be within +/-180");
    Ok(())
}
