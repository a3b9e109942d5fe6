mod display;
mod station;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use gridclock_nav::gnss::{GnssFix, GnssSource, NmeaDecoder};
use gridclock_nav::mag::IioMagnetometer;
use gridclock_nav::{doctor as nav_doctor, locate, CalibrationOffsets, HardIronCalibrator, HeadingResolver};
use gridclock_power::adc::IioAdc;
use gridclock_power::{doctor as power_doctor, BatteryConfig, BatteryGauge, BatteryMonitor};
use gridclock_time::{doctor as time_doctor, ClockResolver, ZoneConfig};
use gridclock_ubx::{configure_receiver, Configurator, RetryPolicy, SerialLink, StartupPlan};

use display::ConsoleDisplay;
use station::{Station, Step};

#[derive(Debug, Parser)]
#[command(name = "gridclock", version, about = "GPS clock, grid locator and compass")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Doctor,
    /// Push the UBX startup sequence to the receiver and exit.
    Configure,
    Run,
    /// Resolve a UTC epoch (default: now) into display strings.
    Time {
        #[arg(long, allow_negative_numbers = true)]
        epoch: Option<i64>,
    },
    Grid {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// Bearing for a raw magnetometer reading, using the [compass] calibration.
    Heading {
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
    },
    /// Gauge an ADC count (default: sample battery.adc_path).
    Battery {
        #[arg(long)]
        adc: Option<u32>,
    },
    /// Rotate the unit flat for a while; prints hard-iron offsets.
    Calibrate {
        #[arg(long, default_value_t = 30)]
        seconds: u64,
    },
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    gnss: GnssCfg,
    clock: ZoneConfig,
    #[serde(default)]
    compass: CompassCfg,
    battery: BatteryConfig,
}

#[derive(Debug, serde::Deserialize)]
struct GnssCfg {
    source: String,
    nmea_device: Option<String>,
    nmea_file: Option<String>,
    #[serde(default = "default_initial_baud")]
    initial_baud: u32,
    #[serde(default = "default_baud")]
    baud: u32,
    #[serde(default = "default_true")]
    configure_receiver: bool,
    #[serde(default = "default_ack_timeout_ms")]
    ack_timeout_ms: u64,
    retry: Option<RetryPolicy>,
}

fn default_initial_baud() -> u32 {
    9_600
}

fn default_baud() -> u32 {
    38_400
}

fn default_true() -> bool {
    true
}

fn default_ack_timeout_ms() -> u64 {
    1_000
}

#[derive(Debug, Default, serde::Deserialize)]
struct CompassCfg {
    #[serde(flatten)]
    calibration: CalibrationOffsets,
    /// IIO device directory, e.g. `/sys/bus/iio/devices/iio:device0`.
    iio_device: Option<String>,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    parse_config(&s)
}

fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Configure => {
            let dev = serial_device(&cfg.gnss)?;
            configure(&cfg.gnss, dev).await?;
        }
        Command::Run => run(&cfg).await?,
        Command::Time { epoch } => time_cmd(&cfg, epoch)?,
        Command::Grid { lat, lon } => println!("{}", locate(lat, lon)?),
        Command::Heading { x, y } => {
            let h = HeadingResolver::new(cfg.compass.calibration.clone()).resolve(x, y);
            match h.bearing_degrees {
                Some(b) => println!("{:.1} {}", b, h.direction),
                None => println!("{}", h.direction),
            }
        }
        Command::Battery { adc } => battery_cmd(&cfg.battery, adc)?,
        Command::Calibrate { seconds } => calibrate(&cfg.compass, Duration::from_secs(seconds)).await?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    match cfg.gnss.source.as_str() {
        "nmea-serial" => {
            serial_device(&cfg.gnss)?;
            nav_doctor::check_receiver_link(cfg.gnss.initial_baud, cfg.gnss.baud, cfg.gnss.ack_timeout_ms)?;
        }
        "nmea-file" => {
            cfg.gnss.nmea_file.as_ref().context("gnss.nmea_file missing")?;
        }
        other => anyhow::bail!("unknown gnss.source: {}", other),
    }
    if let Some(retry) = &cfg.gnss.retry {
        anyhow::ensure!(retry.max_attempts != Some(0), "gnss.retry.max_attempts must be at least 1");
    }

    time_doctor::check_zone(&cfg.clock)?;
    nav_doctor::check_compass(&cfg.compass.calibration)?;
    power_doctor::check_battery(&cfg.battery)?;

    if cfg.compass.iio_device.is_none() {
        warn!("doctor: no compass.iio_device, heading will not be shown");
    }
    if cfg.battery.adc_path.is_none() {
        warn!("doctor: no battery.adc_path, battery will not be monitored");
    }

    info!("doctor: OK");
    Ok(())
}

fn serial_device(gnss: &GnssCfg) -> Result<&str> {
    gnss.nmea_device
        .as_deref()
        .filter(|d| !d.is_empty())
        .context("gnss.nmea_device missing")
}

/// Runs the startup sequence and hands back the port, now at `gnss.baud`.
async fn configure(gnss: &GnssCfg, dev: &str) -> Result<SerialLink> {
    info!("configure: {} at {} baud", dev, gnss.initial_baud);
    let link = SerialLink::open(dev, gnss.initial_baud)?;
    let policy = gnss.retry.clone().unwrap_or_default();
    let mut cfg = Configurator::new(link, Duration::from_millis(gnss.ack_timeout_ms), policy);

    configure_receiver(&mut cfg, &StartupPlan::new(gnss.baud))
        .await
        .context("receiver startup sequence")?;
    info!("configure: receiver at {} baud", gnss.baud);
    Ok(cfg.into_inner())
}

async fn open_source(gnss: &GnssCfg) -> Result<GnssSource> {
    match gnss.source.as_str() {
        "nmea-serial" => {
            let dev = serial_device(gnss)?;
            if gnss.configure_receiver {
                let link = configure(gnss, dev).await?;
                Ok(GnssSource::from_stream(link.into_inner()))
            } else {
                GnssSource::serial(dev, gnss.baud)
            }
        }
        "nmea-file" => GnssSource::file(gnss.nmea_file.as_ref().context("gnss.nmea_file missing")?),
        other => anyhow::bail!("unknown gnss.source: {}", other),
    }
}

fn time_cmd(cfg: &Config, epoch: Option<i64>) -> Result<()> {
    let epoch = epoch.unwrap_or_else(|| time::OffsetDateTime::now_utc().unix_timestamp());
    let t = ClockResolver::new(cfg.clock.clone())?.resolve(epoch)?;
    println!("UTC   {} {}", t.utc_date, t.utc_time);
    println!("{:<5} {} {}", t.local_zone_label, t.local_date, t.local_time);
    Ok(())
}

fn battery_cmd(cfg: &BatteryConfig, adc: Option<u32>) -> Result<()> {
    let adc = match adc {
        Some(v) => v,
        None => IioAdc::open(cfg.adc_path.as_ref().context("battery.adc_path missing, pass --adc")?)?.read()?,
    };
    let r = BatteryGauge::new(cfg.curve, cfg.cutoff).gauge(adc);
    println!("adc={} {}%{}", r.adc, r.percent, if r.below_cutoff { " LOW BATTERY" } else { "" });
    Ok(())
}

async fn calibrate(compass: &CompassCfg, duration: Duration) -> Result<()> {
    let mag = IioMagnetometer::open(compass.iio_device.as_ref().context("compass.iio_device missing")?)?;
    let mut cal = HardIronCalibrator::new();

    info!("calibrate: rotate the unit through a full turn for {}s", duration.as_secs());
    let deadline = Instant::now() + duration;
    let mut tick = tokio::time::interval(Duration::from_millis(100));
    while Instant::now() < deadline {
        tick.tick().await;
        let (x, y) = mag.read()?;
        cal.observe(x, y);
    }

    let (offset_x, offset_y) = cal.offsets().context("no magnetometer samples collected")?;
    info!("calibrate: {} samples", cal.samples());
    println!("[compass]");
    println!("offset_x = {:.3}", offset_x);
    println!("offset_y = {:.3}", offset_y);
    Ok(())
}

async fn run(cfg: &Config) -> Result<()> {
    info!("run: starting");

    let mag = match &cfg.compass.iio_device {
        Some(dir) => Some(IioMagnetometer::open(dir)?),
        None => None,
    };
    let adc = match &cfg.battery.adc_path {
        Some(path) => Some(IioAdc::open(path)?),
        None => None,
    };
    let read_adc = adc.as_ref().map(|a| move || a.read());

    let mut station = Station::new(
        ClockResolver::new(cfg.clock.clone())?,
        HeadingResolver::new(cfg.compass.calibration.clone()),
        BatteryMonitor::new(
            BatteryGauge::new(cfg.battery.curve, cfg.battery.cutoff),
            Duration::from_secs(cfg.battery.poll_interval_s),
        ),
    );

    let mut src = open_source(&cfg.gnss).await?;
    let mut decoder = NmeaDecoder::new();
    let mut display = ConsoleDisplay::new();
    let mut waiting = None;

    loop {
        let fix: GnssFix = tokio::select! {
            fix = src.next_fix(&mut decoder) => fix?,
            _ = tokio::signal::ctrl_c() => {
                info!("run: interrupted");
                return Ok(());
            }
        };

        let sample = match &mag {
            Some(m) => match m.read() {
                Ok(xy) => Some(xy),
                Err(e) => {
                    warn!("magnetometer read failed: {:#}", e);
                    None
                }
            },
            None => None,
        };
        let read = read_adc.as_ref().map(|f| f as &dyn Fn() -> Result<u32>);

        match station.step(&fix, Instant::now(), sample, read)? {
            Step::WaitingForFix => {
                if waiting != Some("fix") {
                    info!("run: waiting for fix");
                    waiting = Some("fix");
                }
            }
            Step::WaitingForTime => {
                if waiting != Some("time") {
                    info!("run: waiting for time sync");
                    waiting = Some("time");
                }
            }
            Step::Show(next) => {
                waiting = None;
                display.render(&next);
            }
            Step::LowBattery => {
                display.low_battery();
                tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_parses() {
        let cfg = parse_config(include_str!("../../../gridclock.toml")).unwrap();
        assert_eq!(cfg.gnss.source, "nmea-serial");
        assert_eq!(cfg.gnss.initial_baud, 9_600);
        assert_eq!(cfg.gnss.baud, 38_400);
        assert_eq!(cfg.clock.standard_label, "EST");
        assert_eq!(cfg.battery.cutoff, 48_300);
        doctor(&cfg).unwrap();
    }

    #[test]
    fn minimal_config_defaults() {
        let cfg = parse_config(
            r#"
            [gnss]
            source = "nmea-file"
            nmea_file = "track.nmea"

            [clock]
            utc_offset_hours = 10
            standard_label = "AEST"
            daylight_label = "AEDT"

            [battery]
            cutoff = 48300
            "#,
        )
        .unwrap();

        assert!(cfg.gnss.configure_receiver);
        assert_eq!(cfg.gnss.ack_timeout_ms, 1_000);
        assert!(cfg.gnss.retry.is_none());
        assert!(cfg.compass.iio_device.is_none());
        assert_eq!(cfg.compass.calibration.declination, 0.0);
        assert_eq!(cfg.battery.poll_interval_s, 60);
        doctor(&cfg).unwrap();
    }

    #[test]
    fn compass_calibration_is_flattened() {
        let cfg = parse_config(
            r#"
            [gnss]
            source = "nmea-file"
            nmea_file = "track.nmea"

            [clock]
            utc_offset_hours = 0
            standard_label = "UTC"
            daylight_label = "UTC"

            [compass]
            offset_x = -12.5
            swap_axes = true
            iio_device = "/sys/bus/iio/devices/iio:device0"

            [battery]
            cutoff = 48300
            "#,
        )
        .unwrap();

        assert_eq!(cfg.compass.calibration.offset_x, -12.5);
        assert!(cfg.compass.calibration.swap_axes);
        assert_eq!(cfg.compass.iio_device.as_deref(), Some("/sys/bus/iio/devices/iio:device0"));
    }

    #[test]
    fn unknown_source_rejected() {
        let cfg = parse_config(
            r#"
            [gnss]
            source = "carrier-pigeon"

            [clock]
            utc_offset_hours = 0
            standard_label = "UTC"
            daylight_label = "UTC"

            [battery]
            cutoff = 48300
            "#,
        )
        .unwrap();
        assert!(doctor(&cfg).is_err());
    }
}
