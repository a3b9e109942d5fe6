use std::time::Instant;

use anyhow::Result;
use tracing::{info, warn};

use gridclock_nav::gnss::GnssFix;
use gridclock_nav::HeadingResolver;
use gridclock_power::{BatteryMonitor, BatteryReading};
use gridclock_proto::DisplaySnapshot;
use gridclock_time::ClockResolver;

use crate::display::{snapshot, SyncedClock};

/// What one pass of the polling loop produced.
#[derive(Debug)]
pub enum Step {
    /// No position yet since power-on.
    WaitingForFix,
    WaitingForTime,
    Show(DisplaySnapshot),
    /// Battery at cutoff; normal operation stops.
    LowBattery,
}

/// Loop state between passes. Only the first fix is waited for; after that
/// time, heading and battery keep going whether or not the fix holds.
pub struct Station {
    clock: ClockResolver,
    heading: HeadingResolver,
    battery: BatteryMonitor,
    wall: SyncedClock,
    last_battery: Option<BatteryReading>,
    had_fix: bool,
    has_fix: bool,
}

impl Station {
    pub fn new(clock: ClockResolver, heading: HeadingResolver, battery: BatteryMonitor) -> Self {
        Self {
            clock,
            heading,
            battery,
            wall: SyncedClock::default(),
            last_battery: None,
            had_fix: false,
            has_fix: false,
        }
    }

    /// `mag` is this pass's raw magnetometer sample; `read_adc` is only
    /// called when a battery sample is due.
    pub fn step(
        &mut self,
        fix: &GnssFix,
        now: Instant,
        mag: Option<(f64, f64)>,
        read_adc: Option<&dyn Fn() -> Result<u32>>,
    ) -> Result<Step> {
        if let Some(read) = read_adc {
            match self.battery.poll(now, read) {
                Ok(Some(r)) => self.last_battery = Some(r),
                Ok(None) => {}
                Err(e) => warn!("battery read failed: {:#}", e),
            }
        }
        if self.battery.is_depleted() {
            return Ok(Step::LowBattery);
        }

        let fixed = fix.valid && fix.lat.is_some() && fix.lon.is_some();
        if fixed != self.has_fix {
            if fixed {
                info!("run: fix acquired ({} sats)", fix.sats.unwrap_or(0));
            } else {
                warn!("run: fix lost");
            }
            self.has_fix = fixed;
        }
        self.had_fix |= fixed;
        if !self.had_fix {
            return Ok(Step::WaitingForFix);
        }

        if let Some(utc) = fix.utc {
            if !self.wall.is_synced() {
                info!("run: time synced to {}", utc);
            }
            self.wall.sync(utc, now);
        }
        let Some(epoch) = self.wall.epoch(now) else {
            return Ok(Step::WaitingForTime);
        };
        let time = self.clock.resolve(epoch)?;
        let heading = mag.map(|(x, y)| self.heading.resolve(x, y));

        Ok(Step::Show(snapshot(&time, fix, heading.as_ref(), self.last_battery.as_ref())))
    }
}
