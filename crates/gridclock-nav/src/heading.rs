use std::f64::consts::PI;

use serde::Deserialize;

/// Lower edge of each 22.5° sector after north.
const SECTOR_START: [f64; 15] = [
    11.25, 33.75, 56.25, 78.75, 101.25, 123.75, 146.25, 168.75, 191.25, 213.75, 236.25, 258.75, 281.25,
    303.75, 326.25,
];
const SECTOR_NAME: [&str; 15] = [
    "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW", "NNW",
];

pub const NO_HEADING: &str = "---";

/// Per-device magnetometer mounting and hard-iron correction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalibrationOffsets {
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
    #[serde(default)]
    pub flip_x: bool,
    #[serde(default)]
    pub flip_y: bool,
    #[serde(default)]
    pub swap_axes: bool,
    /// Degrees added to the magnetic bearing.
    #[serde(default)]
    pub declination: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingResult {
    /// `None` when the field vector has no horizontal component.
    pub bearing_degrees: Option<f64>,
    pub direction: &'static str,
}

#[derive(Debug, Clone)]
pub struct HeadingResolver {
    cal: CalibrationOffsets,
    declination: f64,
}

impl HeadingResolver {
    pub fn new(cal: CalibrationOffsets) -> Self {
        // fold into (-180, 180] so one wrap is always enough
        let mut declination = cal.declination.rem_euclid(360.0);
        if declination > 180.0 {
            declination -= 360.0;
        }
        Self { cal, declination }
    }

    /// Offset, then flip, then swap.
    fn correct(&self, x_raw: f64, y_raw: f64) -> (f64, f64) {
        let mut x = x_raw - self.cal.offset_x;
        let mut y = y_raw - self.cal.offset_y;
        if self.cal.flip_x {
            x = -x;
        }
        if self.cal.flip_y {
            y = -y;
        }
        if self.cal.swap_axes {
            std::mem::swap(&mut x, &mut y);
        }
        (x, y)
    }

    pub fn bearing(&self, x_raw: f64, y_raw: f64) -> Option<f64> {
        let (x, y) = self.correct(x_raw, y_raw);

        let mut angle = if x > 0.0 && y == 0.0 {
            self.declination
        } else if x < 0.0 && y == 0.0 {
            180.0 + self.declination
        } else if y > 0.0 {
            90.0 - (x / y).atan() * 180.0 / PI + self.declination
        } else if y < 0.0 {
            270.0 - (x / y).atan() * 180.0 / PI + self.declination
        } else {
            // zero vector or NaN
            return None;
        };

        if angle < 0.0 {
            angle += 360.0;
        }
        if angle >= 360.0 {
            angle -= 360.0;
        }
        Some(angle)
    }

    pub fn resolve(&self, x_raw: f64, y_raw: f64) -> HeadingResult {
        let bearing_degrees = self.bearing(x_raw, y_raw);
        let direction = bearing_degrees.map(direction_label).unwrap_or(NO_HEADING);
        HeadingResult { bearing_degrees, direction }
    }
}

/// 16-point compass name. `-1` is the "no data" sentinel and maps to `---`.
pub fn direction_label(degrees: f64) -> &'static str {
    if degrees == -1.0 {
        return NO_HEADING;
    }
    if degrees < 11.25 || degrees >= 348.75 {
        return "N";
    }
    SECTOR_START
        .iter()
        .zip(SECTOR_NAME)
        .find(|(start, _)| degrees >= **start && degrees < **start + 22.5)
        .map(|(_, name)| name)
        .unwrap_or(NO_HEADING)
}

/// Hard-iron estimate from the extremes seen while the device is rotated.
#[derive(Debug, Clone, Default)]
pub struct HardIronCalibrator {
    // min_x, max_x, min_y, max_y
    bounds: Option<[f64; 4]>,
    samples: u64,
}

impl HardIronCalibrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        self.samples += 1;
        let b = self.bounds.get_or_insert([x, x, y, y]);
        b[0] = b[0].min(x);
        b[1] = b[1].max(x);
        b[2] = b[2].min(y);
        b[3] = b[3].max(y);
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Midpoints of the observed ranges, usable as `offset_x`/`offset_y`.
    pub fn offsets(&self) -> Option<(f64, f64)> {
        self.bounds.map(|[min_x, max_x, min_y, max_y]| ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn plain() -> HeadingResolver {
        HeadingResolver::new(CalibrationOffsets::default())
    }

    #[test]
    fn cardinal_axes() {
        let h = plain();
        assert_eq!(h.bearing(1.0, 0.0), Some(0.0));
        assert_relative_eq!(h.bearing(0.0, 1.0).unwrap(), 90.0);
        assert_eq!(h.bearing(-1.0, 0.0), Some(180.0));
        assert_relative_eq!(h.bearing(0.0, -1.0).unwrap(), 270.0);
        assert_relative_eq!(h.bearing(1.0, 1.0).unwrap(), 45.0, epsilon = 1e-9);
        assert_relative_eq!(h.bearing(1.0, -1.0).unwrap(), 315.0, epsilon = 1e-9);
        assert_eq!(h.resolve(0.0, -1.0).direction, "W");
    }

    #[test]
    fn offsets_precede_flip() {
        let h = HeadingResolver::new(CalibrationOffsets {
            offset_x: 30.9091,
            offset_y: -20.5,
            flip_x: true,
            flip_y: false,
            swap_axes: false,
            declination: -6.0,
        });
        // x - offset = -10, flipped to +10, y corrected to 0: pointing north
        let r = h.resolve(20.9091, -20.5);
        assert_relative_eq!(r.bearing_degrees.unwrap(), 354.0, epsilon = 1e-9);
        assert_eq!(r.direction, "N");
    }

    #[test]
    fn swap_after_flip() {
        let h = HeadingResolver::new(CalibrationOffsets {
            flip_y: true,
            swap_axes: true,
            ..Default::default()
        });
        // (0, -2) -> flip y -> (0, 2) -> swap -> (2, 0): north
        assert_eq!(h.bearing(0.0, -2.0), Some(0.0));
        // (3, 0) -> swap -> (0, 3): east
        assert_relative_eq!(h.bearing(3.0, 0.0).unwrap(), 90.0);
    }

    #[test]
    fn zero_vector_has_no_heading() {
        let h = HeadingResolver::new(CalibrationOffsets { offset_x: 5.0, offset_y: -3.0, ..Default::default() });
        let r = h.resolve(5.0, -3.0);
        assert_eq!(r.bearing_degrees, None);
        assert_eq!(r.direction, "---");
        assert_eq!(h.resolve(f64::NAN, 1.0).direction, "---");
    }

    #[test]
    fn bearing_always_normalized() {
        for decl in [-180.0, -6.0, 0.0, 13.5, 179.9, 180.0, 725.0, -400.0] {
            let h = HeadingResolver::new(CalibrationOffsets { declination: decl, ..Default::default() });
            let mut x = -50.0;
            while x <= 50.0 {
                let mut y = -50.0;
                while y <= 50.0 {
                    if let Some(b) = h.bearing(x, y) {
                        assert!((0.0..360.0).contains(&b), "decl={decl} x={x} y={y} b={b}");
                    }
                    y += 1.75;
                }
                x += 1.25;
            }
        }
    }

    #[test]
    fn label_boundaries() {
        assert_eq!(direction_label(11.24), "N");
        assert_eq!(direction_label(11.25), "NNE");
        assert_eq!(direction_label(348.74), "NNW");
        assert_eq!(direction_label(348.75), "N");
        assert_eq!(direction_label(0.0), "N");
        assert_eq!(direction_label(90.0), "E");
        assert_eq!(direction_label(180.0), "S");
        assert_eq!(direction_label(258.75), "W");
        assert_eq!(direction_label(-1.0), "---");
    }

    #[test]
    fn calibrator_midpoints() {
        let mut c = HardIronCalibrator::new();
        assert_eq!(c.offsets(), None);
        for (x, y) in [(10.0, -5.0), (50.0, 15.0), (30.0, -25.0), (f64::NAN, 0.0)] {
            c.observe(x, y);
        }
        assert_eq!(c.samples(), 3);
        assert_eq!(c.offsets(), Some((30.0, -5.0)));
    }
}
