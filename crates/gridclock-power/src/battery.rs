use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{info, warn};

/// Thresholds measured on a 3600 mAh LiPo behind a divider into a 16-bit ADC.
pub const LIPO_3600MAH: [u32; 11] = [48500, 49600, 50900, 51400, 52000, 52900, 53900, 55900, 56900, 58000, 65535];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CurveError {
    #[error("battery curve needs 11 points, got {0}")]
    Length(usize),
    #[error("battery curve not ascending at index {0}")]
    NotAscending(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<u32>")]
pub struct BatteryCurve([u32; 11]);

impl BatteryCurve {
    pub fn new(points: [u32; 11]) -> Result<Self, CurveError> {
        if let Some(i) = (1..points.len()).find(|&i| points[i] <= points[i - 1]) {
            return Err(CurveError::NotAscending(i));
        }
        Ok(Self(points))
    }

    pub fn points(&self) -> &[u32; 11] {
        &self.0
    }
}

impl Default for BatteryCurve {
    fn default() -> Self {
        Self(LIPO_3600MAH)
    }
}

impl TryFrom<Vec<u32>> for BatteryCurve {
    type Error = CurveError;

    fn try_from(v: Vec<u32>) -> Result<Self, Self::Error> {
        let points: [u32; 11] = v.as_slice().try_into().map_err(|_| CurveError::Length(v.len()))?;
        Self::new(points)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReading {
    pub adc: u32,
    pub percent: u8,
    pub below_cutoff: bool,
}

#[derive(Debug, Clone)]
pub struct BatteryGauge {
    curve: BatteryCurve,
    cutoff: u32,
}

impl BatteryGauge {
    pub fn new(curve: BatteryCurve, cutoff: u32) -> Self {
        Self { curve, cutoff }
    }

    pub fn gauge(&self, adc: u32) -> BatteryReading {
        let p = self.curve.points();
        let percent = (1..=10)
            .rev()
            .find(|&i| p[i - 1] < adc && adc <= p[i])
            .map(|i| i as u8 * 10)
            // at or below the floor: empty; above the top point: full
            .unwrap_or(if adc > p[10] { 100 } else { 0 });

        BatteryReading { adc, percent, below_cutoff: adc <= self.cutoff }
    }
}

/// Samples the gauge no more often than `interval` and latches the
/// low-battery state once it has been seen.
#[derive(Debug)]
pub struct BatteryMonitor {
    gauge: BatteryGauge,
    interval: Duration,
    last_sample: Option<Instant>,
    depleted: bool,
}

impl BatteryMonitor {
    pub fn new(gauge: BatteryGauge, interval: Duration) -> Self {
        Self { gauge, interval, last_sample: None, depleted: false }
    }

    pub fn due(&self, now: Instant) -> bool {
        match self.last_sample {
            Some(t) => now.saturating_duration_since(t) >= self.interval,
            None => true,
        }
    }

    /// Runs `read` only when a sample is due.
    pub fn poll<F, E>(&mut self, now: Instant, read: F) -> Result<Option<BatteryReading>, E>
    where
        F: FnOnce() -> Result<u32, E>,
    {
        if !self.due(now) {
            return Ok(None);
        }
        let reading = self.gauge.gauge(read()?);
        self.last_sample = Some(now);

        if reading.below_cutoff && !self.depleted {
            warn!("battery at cutoff (adc={}), halting", reading.adc);
            self.depleted = true;
        } else {
            info!("battery {}% (adc={})", reading.percent, reading.adc);
        }
        Ok(Some(reading))
    }

    /// One-way: never clears once set.
    pub fn is_depleted(&self) -> bool {
        self.depleted
    }
}
