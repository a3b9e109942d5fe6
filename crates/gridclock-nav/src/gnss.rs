use std::borrow::Cow;

use anyhow::{Context, Result};
use time::{Date, Month, OffsetDateTime, Time};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::debug;

/// One decoded RMC, merged with the most recent GGA.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GnssFix {
    /// RMC status `A`.
    pub valid: bool,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub altitude_m: Option<f32>,
    pub speed_knots: Option<f32>,
    pub track_deg: Option<f32>,
    pub sats: Option<u8>,
    pub utc: Option<OffsetDateTime>,
}

pub enum GnssSource {
    Serial(BufReader<SerialStream>),
    File(BufReader<File>),
}

impl GnssSource {
    pub fn serial(dev: &str, baud: u32) -> Result<Self> {
        let port = tokio_serial::new(dev, baud).open_native_async()
            .with_context(|| format!("open serial {}", dev))?;
        Ok(Self::from_stream(port))
    }

    /// Reuse a port that was already opened (and configured) elsewhere.
    pub fn from_stream(port: SerialStream) -> Self {
        Self::Serial(BufReader::new(port))
    }

    pub fn file(path: &str) -> Result<Self> {
        let f = std::fs::File::open(path).with_context(|| format!("open nmea file {}", path))?;
        let f = File::from_std(f);
        Ok(Self::File(BufReader::new(f)))
    }

    pub async fn next_fix(&mut self, decoder: &mut NmeaDecoder) -> Result<GnssFix> {
        let mut buf = Vec::with_capacity(96);
        loop {
            let line = match self {
                GnssSource::Serial(r) => {
                    read_sentence(r, &mut buf).await?.context("receiver port closed")?
                }
                GnssSource::File(r) => match read_sentence(r, &mut buf).await? {
                    Some(line) => line,
                    None => {
                        // EOF: loop
                        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                        continue;
                    }
                },
            };
            if let Some(fix) = decoder.feed(line.trim()) {
                return Ok(fix);
            }
        }
    }
}

/// Next line, with invalid UTF-8 replaced; `None` at end of stream.
async fn read_sentence<R>(r: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if r.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    if let Cow::Owned(_) = line {
        debug!("nmea: dropped non-utf8 bytes in {:?}", line);
    }
    Ok(Some(line.into_owned()))
}

#[derive(Debug, Clone, Copy, Default)]
struct GgaData {
    sats: Option<u8>,
    altitude_m: Option<f32>,
}

/// Minimal NMEA decoding:
/// - GGA: satellites + altitude
/// - RMC: time, date, position, speed, track
#[derive(Debug, Default)]
pub struct NmeaDecoder {
    last_gga: GgaData,
}

impl NmeaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fix for every RMC sentence; everything else only updates state.
    pub fn feed(&mut self, s: &str) -> Option<GnssFix> {
        let body = s.split('*').next().unwrap_or(s);
        let parts: Vec<&str> = body.split(',').collect();
        let kind = parts.first().copied().unwrap_or("");

        if kind.len() == 6 && kind.starts_with('$') && kind.ends_with("GGA") {
            if parts.len() > 9 {
                self.last_gga = GgaData {
                    sats: parts[7].parse().ok(),
                    altitude_m: parts[9].parse().ok(),
                };
            }
            return None;
        }

        if kind.len() == 6 && kind.starts_with('$') && kind.ends_with("RMC") && parts.len() > 9 {
            let fix = GnssFix {
                valid: parts[2] == "A",
                lat: parse_deg_min(parts[3], parts[4]),
                lon: parse_deg_min(parts[5], parts[6]),
                altitude_m: self.last_gga.altitude_m,
                speed_knots: parts[7].parse().ok(),
                track_deg: parts[8].parse().ok(),
                sats: self.last_gga.sats,
                utc: parse_utc(parts[1], parts[9]),
            };
            debug!("nmea fix {:?}", fix);
            return Some(fix);
        }

        None
    }
}

fn parse_deg_min(v: &str, hemi: &str) -> Option<f64> {
    if v.is_empty() { return None; }
    // lat: ddmm.mmmm, lon: dddmm.mmmm
    let dot = v.find('.')?;
    let deg_len = if dot > 4 { 3 } else { 2 };
    let deg: f64 = v.get(..deg_len)?.parse().ok()?;
    let min: f64 = v.get(deg_len..)?.parse().ok()?;
    let mut out = deg + (min / 60.0);
    if hemi == "S" || hemi == "W" { out = -out; }
    Some(out)
}

/// `hhmmss[.ss]` + `ddmmyy`, two-digit years taken as 20yy.
fn parse_utc(hms: &str, dmy: &str) -> Option<OffsetDateTime> {
    let num = |s: &str, at: usize| -> Option<u8> { s.get(at..at + 2)?.parse().ok() };
    if dmy.len() != 6 || hms.len() < 6 { return None; }

    let month = Month::try_from(num(dmy, 2)?).ok()?;
    let date = Date::from_calendar_date(2000 + num(dmy, 4)? as i32, month, num(dmy, 0)?).ok()?;
    let time = Time::from_hms(num(hms, 0)?, num(hms, 2)?, num(hms, 4)?).ok()?;
    Some(date.with_time(time).assume_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use time::macros::datetime;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

    #[test]
    fn rmc_merges_last_gga() {
        let mut d = NmeaDecoder::new();
        assert_eq!(d.feed(GGA), None);
        let fix = d.feed(RMC).unwrap();

        assert!(fix.valid);
        assert_relative_eq!(fix.lat.unwrap(), 48.1173, epsilon = 1e-4);
        assert_relative_eq!(fix.lon.unwrap(), 11.516_666, epsilon = 1e-5);
        assert_eq!(fix.sats, Some(8));
        assert_eq!(fix.altitude_m, Some(545.4));
        assert_eq!(fix.speed_knots, Some(22.4));
        assert_eq!(fix.track_deg, Some(84.4));
        // 2-digit year is read as 20yy
        assert_eq!(fix.utc, Some(datetime!(2094-03-23 12:35:19 UTC)));
    }

    #[test]
    fn rmc_without_fix_has_no_position() {
        let mut d = NmeaDecoder::new();
        let fix = d.feed("$GNRMC,000012.00,V,,,,,,,060124,,,N*6B").unwrap();
        assert!(!fix.valid);
        assert_eq!(fix.lat, None);
        assert_eq!(fix.sats, None);
        assert_eq!(fix.utc, Some(datetime!(2024-01-06 00:00:12 UTC)));
    }

    #[test]
    fn southern_western_hemispheres_negative() {
        assert_relative_eq!(parse_deg_min("3351.128", "S").unwrap(), -33.8521, epsilon = 1e-4);
        assert_relative_eq!(parse_deg_min("07243.636", "W").unwrap(), -72.7273, epsilon = 1e-4);
        assert_eq!(parse_deg_min("", "N"), None);
    }

    #[tokio::test]
    async fn noisy_line_is_skipped() {
        let path = std::env::temp_dir().join(format!("gridclock-nmea-{}", std::process::id()));
        let mut bytes = b"$GPRMC,12\xff\xfe19,A,garbage\r\n".to_vec();
        bytes.extend_from_slice(RMC.as_bytes());
        bytes.extend_from_slice(b"\r\n");
        std::fs::write(&path, bytes).unwrap();

        let mut src = GnssSource::file(path.to_str().unwrap()).unwrap();
        let fix = src.next_fix(&mut NmeaDecoder::new()).await.unwrap();
        assert!(fix.valid);
        assert_eq!(fix.track_deg, Some(84.4));
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn end_of_stream_is_reported() {
        let mut buf = Vec::new();
        let mut r: &[u8] = b"$GPGGA,1\xff\n";
        let line = read_sentence(&mut r, &mut buf).await.unwrap().unwrap();
        assert!(line.starts_with("$GPGGA,1"));
        assert_eq!(read_sentence(&mut r, &mut buf).await.unwrap(), None);
    }

    #[test]
    fn other_sentences_ignored() {
        let mut d = NmeaDecoder::new();
        assert_eq!(d.feed("$GPGSV,3,1,11,03,03,111,00,04,15,270,00,06,01,010,00,13,06,292,00*74"), None);
        assert_eq!(d.feed("garbage"), None);
        assert_eq!(d.feed(""), None);
    }
}
