use std::time::Instant;

use gridclock_nav::gnss::GnssFix;
use gridclock_nav::heading::HeadingResult;
use gridclock_nav::locate;
use gridclock_power::BatteryReading;
use gridclock_proto::{diff, format, DisplaySnapshot, Field};
use gridclock_time::ResolvedTime;
use time::OffsetDateTime;
use tracing::warn;

/// Wall clock anchored to the last GNSS timestamp, advanced by the
/// monotonic clock in between fixes.
#[derive(Debug, Default)]
pub struct SyncedClock {
    anchor: Option<(i64, Instant)>,
}

impl SyncedClock {
    pub fn sync(&mut self, utc: OffsetDateTime, at: Instant) {
        self.anchor = Some((utc.unix_timestamp(), at));
    }

    pub fn is_synced(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn epoch(&self, at: Instant) -> Option<i64> {
        self.anchor
            .map(|(epoch, t)| epoch + at.saturating_duration_since(t).as_secs() as i64)
    }
}

/// Builds the next screen from this iteration's readings.
pub fn snapshot(
    time: &ResolvedTime,
    fix: &GnssFix,
    heading: Option<&HeadingResult>,
    battery: Option<&BatteryReading>,
) -> DisplaySnapshot {
    let mut s = DisplaySnapshot::new();
    s.set(Field::UtcTime, time.utc_time.as_str());
    s.set(Field::UtcDate, time.utc_date.as_str());
    s.set(Field::LocalTime, time.local_time.as_str());
    s.set(Field::LocalZone, time.local_zone_label.as_str());
    s.set(Field::LocalDate, time.local_date.as_str());

    // position fields hold their last value while the fix is lost
    if fix.valid {
        if let (Some(lat), Some(lon)) = (fix.lat, fix.lon) {
            s.set(Field::Latitude, format::latitude(lat));
            s.set(Field::Longitude, format::longitude(lon));
            match locate(lat, lon) {
                Ok(grid) => s.set(Field::Grid, grid.as_str()),
                Err(e) => warn!("grid: {}", e),
            }
        }
        if let Some(alt) = fix.altitude_m {
            let (ft, m) = format::altitude(alt as f64);
            s.set(Field::AltitudeFt, ft);
            s.set(Field::AltitudeM, m);
        }
        if let Some(knots) = fix.speed_knots {
            s.set(Field::Speed, format::speed_mph(knots as f64));
        }
        if let Some(track) = fix.track_deg {
            s.set(Field::Track, format::track(track as f64));
        }
    }
    if let Some(sats) = fix.sats {
        s.set(Field::Satellites, format::satellites(sats as u32));
    }
    if let Some(h) = heading {
        s.set(Field::Compass, format::compass(h.direction));
    }
    if let Some(b) = battery {
        s.set(Field::Battery, format::battery(b.percent));
    }
    s
}

/// Line-per-field stand-in for the panel: only changed fields are redrawn.
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    shown: DisplaySnapshot,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many fields were redrawn.
    pub fn render(&mut self, next: &DisplaySnapshot) -> usize {
        let updates = diff(&self.shown, next);
        for u in &updates {
            println!("{:>8}: {}", u.field.label(), u.text);
        }
        self.shown.apply(&updates);
        updates.len()
    }

    pub fn low_battery(&mut self) {
        self.shown = DisplaySnapshot::new();
        println!("LOW BATTERY");
    }
}
