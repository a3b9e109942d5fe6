pub mod adc;
pub mod battery;
pub mod doctor;

pub use battery::{BatteryCurve, BatteryGauge, BatteryMonitor, BatteryReading, CurveError};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct BatteryConfig {
    /// 11 ascending ADC thresholds; `curve[i]` tops the `i * 10` % bucket.
    #[serde(default)]
    pub curve: BatteryCurve,

    /// At or below this reading the device stops and shows the warning.
    pub cutoff: u32,

    /// Seconds between samples.
    #[serde(default = "default_poll_interval_s")]
    pub poll_interval_s: u64,

    /// IIO voltage channel, e.g. `/sys/bus/iio/devices/iio:device1/in_voltage0_raw`.
    pub adc_path: Option<String>,
}

fn default_poll_interval_s() -> u64 {
    60
}
