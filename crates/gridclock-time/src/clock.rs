use serde::Deserialize;
use time::{Date, Duration, Month, OffsetDateTime};

use crate::ClockError;

const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTHS: [&str; 12] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

/// Annual clock change: the `week`-th `weekday` of `month`, at `hour` local time.
///
/// `weekday` counts from Monday = 0 to Sunday = 6. The week is located by
/// starting on day `week * 7 - 6` and moving forward to the first matching
/// weekday, so week 5 can run into the following month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TimeZoneRule {
    pub month: u8,
    pub week: u8,
    pub weekday: u8,
    pub hour: u8,
}

impl TimeZoneRule {
    pub const fn new(month: u8, week: u8, weekday: u8, hour: u8) -> Self {
        Self { month, week, weekday, hour }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(1..=12).contains(&self.month) {
            return Err(format!("month {} not in 1..=12", self.month));
        }
        if !(1..=5).contains(&self.week) {
            return Err(format!("week {} not in 1..=5", self.week));
        }
        if self.weekday > 6 {
            return Err(format!("weekday {} not in 0..=6", self.weekday));
        }
        if self.hour > 23 {
            return Err(format!("hour {} not in 0..=23", self.hour));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneConfig {
    pub utc_offset_hours: i32,
    pub standard_label: String,
    pub daylight_label: String,
    #[serde(default = "default_dst_delta_s")]
    pub dst_delta_s: i64,
    /// Both absent: the zone never observes DST.
    pub dst_start: Option<TimeZoneRule>,
    pub dst_end: Option<TimeZoneRule>,
}

fn default_dst_delta_s() -> i64 {
    SECS_PER_HOUR
}

impl ZoneConfig {
    /// EST/EDT: second Sunday of March to first Sunday of November, 2 AM.
    pub fn us_eastern() -> Self {
        Self {
            utc_offset_hours: -5,
            standard_label: "EST".into(),
            daylight_label: "EDT".into(),
            dst_delta_s: SECS_PER_HOUR,
            dst_start: Some(TimeZoneRule::new(3, 2, 6, 2)),
            dst_end: Some(TimeZoneRule::new(11, 1, 6, 2)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTime {
    pub utc_date: String,
    pub utc_time: String,
    pub local_date: String,
    pub local_time: String,
    pub local_zone_label: String,
    pub dst_active: bool,
}

#[derive(Debug, Clone)]
pub struct ClockResolver {
    cfg: ZoneConfig,
    dst: Option<(TimeZoneRule, TimeZoneRule)>,
}

impl ClockResolver {
    pub fn new(cfg: ZoneConfig) -> Result<Self, ClockError> {
        let dst = match (cfg.dst_start, cfg.dst_end) {
            (Some(start), Some(end)) => {
                start.validate().map_err(|reason| ClockError::InvalidRule { which: "dst_start", reason })?;
                end.validate().map_err(|reason| ClockError::InvalidRule { which: "dst_end", reason })?;
                Some((start, end))
            }
            (None, None) => None,
            _ => {
                return Err(ClockError::InvalidRule {
                    which: "dst",
                    reason: "dst_start and dst_end must be given together".into(),
                })
            }
        };
        Ok(Self { cfg, dst })
    }

    fn utc_offset_s(&self) -> i64 {
        self.cfg.utc_offset_hours as i64 * SECS_PER_HOUR
    }

    /// UTC instants `[start, end)` of daylight time for the local year `year`.
    pub fn dst_window(&self, year: i32) -> Result<Option<(i64, i64)>, ClockError> {
        let Some((start_rule, end_rule)) = &self.dst else {
            return Ok(None);
        };
        let start = self.transition(year, start_rule, 0)?;
        // The end rule is evaluated from a point already shifted back by the
        // delta, then shifted back once more.
        let end = self.transition(year, end_rule, self.cfg.dst_delta_s)?;
        Ok(Some((start, end)))
    }

    fn transition(&self, year: i32, rule: &TimeZoneRule, shift: i64) -> Result<i64, ClockError> {
        let base = civil_epoch(year, rule.month, rule.week * 7 - 6, rule.hour)? - shift;
        let weekday = decompose(base)?.weekday().number_days_from_monday() as i64;
        let mut diff = rule.weekday as i64 - weekday;
        if diff < 0 {
            diff += 7;
        }
        Ok(base + diff * SECS_PER_DAY - self.utc_offset_s() - shift)
    }

    pub fn is_dst(&self, utc_epoch: i64) -> Result<bool, ClockError> {
        if self.dst.is_none() {
            return Ok(false);
        }

        // Near New Year the local calendar can still be in the previous year.
        let mut year = decompose(utc_epoch)?.year();
        if utc_epoch < civil_epoch(year, 1, 1, 0)? - self.utc_offset_s() {
            year -= 1;
        }

        Ok(match self.dst_window(year)? {
            Some((start, end)) => utc_epoch >= start && utc_epoch < end,
            None => false,
        })
    }

    pub fn resolve(&self, utc_epoch: i64) -> Result<ResolvedTime, ClockError> {
        let utc = decompose(utc_epoch)?;
        let dst_active = self.is_dst(utc_epoch)?;

        let shift = self.utc_offset_s() + if dst_active { self.cfg.dst_delta_s } else { 0 };
        let local = decompose(utc_epoch + shift)?;

        let label = if dst_active { &self.cfg.daylight_label } else { &self.cfg.standard_label };

        Ok(ResolvedTime {
            utc_date: format_date(&utc),
            utc_time: format_time(&utc),
            local_date: format_date(&local),
            local_time: format_time(&local),
            local_zone_label: label.clone(),
            dst_active,
        })
    }
}

fn decompose(epoch: i64) -> Result<OffsetDateTime, ClockError> {
    OffsetDateTime::from_unix_timestamp(epoch).map_err(|_| ClockError::OutOfRange(epoch))
}

/// Epoch of `year-month-day hour:00:00` read as UTC. Days past the end of
/// the month roll into the next one.
fn civil_epoch(year: i32, month: u8, day: u8, hour: u8) -> Result<i64, ClockError> {
    let month = Month::try_from(month).map_err(|e| ClockError::InvalidRule { which: "calendar", reason: e.to_string() })?;
    let first = Date::from_calendar_date(year, month, 1)
        .map_err(|e| ClockError::InvalidRule { which: "calendar", reason: e.to_string() })?;
    let date = first
        .checked_add(Duration::days(day as i64 - 1))
        .ok_or_else(|| ClockError::InvalidRule { which: "calendar", reason: format!("day {} overflows {}", day, year) })?;
    Ok(date.midnight().assume_utc().unix_timestamp() + hour as i64 * SECS_PER_HOUR)
}

fn format_date(t: &OffsetDateTime) -> String {
    format!(
        "{} {} {:02}, {}",
        WEEKDAYS[t.weekday().number_days_from_monday() as usize],
        MONTHS[u8::from(t.month()) as usize - 1],
        t.day(),
        t.year()
    )
}

fn format_time(t: &OffsetDateTime) -> String {
    format!("{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn eastern() -> ClockResolver {
        ClockResolver::new(ZoneConfig::us_eastern()).unwrap()
    }

    #[test]
    fn dst_start_boundary() {
        let c = eastern();
        let start = datetime!(2024-03-10 07:00 UTC).unix_timestamp();

        let before = c.resolve(start - 1).unwrap();
        assert!(!before.dst_active);
        assert_eq!(before.local_zone_label, "EST");
        assert_eq!(before.local_time, "01:59:59");
        assert_eq!(before.local_date, "Sun Mar 10, 2024");

        let at = c.resolve(start).unwrap();
        assert!(at.dst_active);
        assert_eq!(at.local_zone_label, "EDT");
        assert_eq!(at.local_time, "03:00:00");

        assert!(c.resolve(start + 1).unwrap().dst_active);
    }

    #[test]
    fn dst_end_boundary_applies_delta_twice() {
        let c = eastern();
        let end = datetime!(2024-11-03 05:00 UTC).unix_timestamp();
        assert_eq!(
            c.dst_window(2024).unwrap(),
            Some((datetime!(2024-03-10 07:00 UTC).unix_timestamp(), end))
        );

        let before = c.resolve(end - 1).unwrap();
        assert!(before.dst_active);
        assert_eq!(before.local_time, "00:59:59");
        assert_eq!(before.local_zone_label, "EDT");

        let at = c.resolve(end).unwrap();
        assert!(!at.dst_active);
        assert_eq!(at.local_time, "00:00:00");
        assert_eq!(at.local_date, "Sun Nov 03, 2024");
        assert_eq!(at.local_zone_label, "EST");

        assert!(!c.resolve(end + 1).unwrap().dst_active);
    }

    #[test]
    fn new_year_uses_previous_local_year() {
        let c = eastern();
        let r = c.resolve(datetime!(2025-01-01 03:00 UTC).unix_timestamp()).unwrap();
        assert_eq!(r.utc_date, "Wed Jan 01, 2025");
        assert_eq!(r.utc_time, "03:00:00");
        assert_eq!(r.local_date, "Tue Dec 31, 2024");
        assert_eq!(r.local_time, "22:00:00");
        assert_eq!(r.local_zone_label, "EST");
    }

    #[test]
    fn positive_offset_without_dst() {
        let c = ClockResolver::new(ZoneConfig {
            utc_offset_hours: 10,
            standard_label: "AEST".into(),
            daylight_label: "AEDT".into(),
            dst_delta_s: 3_600,
            dst_start: None,
            dst_end: None,
        })
        .unwrap();
        let r = c.resolve(datetime!(2024-12-31 20:00 UTC).unix_timestamp()).unwrap();
        assert_eq!(r.local_date, "Wed Jan 01, 2025");
        assert_eq!(r.local_time, "06:00:00");
        assert_eq!(r.local_zone_label, "AEST");
        assert!(!r.dst_active);
    }

    #[test]
    fn fifth_week_rolls_into_next_month() {
        let mut cfg = ZoneConfig::us_eastern();
        cfg.dst_start = Some(TimeZoneRule::new(2, 5, 6, 2));
        let c = ClockResolver::new(cfg).unwrap();
        // 2023-02-29 does not exist: day 29 is Mar 1 (Wed), next Sunday Mar 5
        let (start, _) = c.dst_window(2023).unwrap().unwrap();
        assert_eq!(start, datetime!(2023-03-05 07:00 UTC).unix_timestamp());
    }

    #[test]
    fn utc_strings_round_trip_calendar_fields() {
        let c = eastern();
        let mut epoch = datetime!(2000-01-01 00:00 UTC).unix_timestamp();
        let last = datetime!(2099-12-31 23:59:59 UTC).unix_timestamp();
        while epoch <= last {
            let r = c.resolve(epoch).unwrap();
            let t = OffsetDateTime::from_unix_timestamp(epoch).unwrap();

            // "Wkd Mon DD, YYYY"
            let (wkd, rest) = r.utc_date.split_once(' ').unwrap();
            let (mon, rest) = rest.split_once(' ').unwrap();
            let (day, year) = rest.split_once(", ").unwrap();
            assert_eq!(WEEKDAYS.iter().position(|w| *w == wkd).unwrap() as u8, t.weekday().number_days_from_monday());
            assert_eq!(MONTHS.iter().position(|m| *m == mon).unwrap() as u8 + 1, u8::from(t.month()));
            assert_eq!(day.parse::<u8>().unwrap(), t.day());
            assert_eq!(year.parse::<i32>().unwrap(), t.year());

            let hms: Vec<u8> = r.utc_time.split(':').map(|p| p.parse().unwrap()).collect();
            assert_eq!(hms, vec![t.hour(), t.minute(), t.second()]);

            assert!(r.local_zone_label == "EST" || r.local_zone_label == "EDT");
            epoch += 1_234_567;
        }
    }

    #[test]
    fn invalid_rules_rejected() {
        let mut cfg = ZoneConfig::us_eastern();
        cfg.dst_end = Some(TimeZoneRule::new(13, 1, 6, 2));
        assert!(matches!(ClockResolver::new(cfg), Err(ClockError::InvalidRule { which: "dst_end", .. })));

        let mut cfg = ZoneConfig::us_eastern();
        cfg.dst_end = None;
        assert!(ClockResolver::new(cfg).is_err());
    }

    #[test]
    fn zone_config_from_toml() {
        let cfg: ZoneConfig = toml::from_str(
            r#"
            utc_offset_hours = -5
            standard_label = "EST"
            daylight_label = "EDT"
            dst_start = { month = 3, week = 2, weekday = 6, hour = 2 }
            dst_end = { month = 11, week = 1, weekday = 6, hour = 2 }
            "#,
        )
        .unwrap();
        assert_eq!(cfg.dst_delta_s, 3_600);
        assert_eq!(cfg.dst_start, Some(TimeZoneRule::new(3, 2, 6, 2)));
    }
}
