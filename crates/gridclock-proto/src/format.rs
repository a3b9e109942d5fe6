//! Fixed-width text for the numeric display fields.

const FEET_PER_METRE: f64 = 3.28084;
const MPH_PER_KNOT: f64 = 1.15078;

pub fn latitude(deg: f64) -> String {
    format!("{:>8.4}", deg)
}

pub fn longitude(deg: f64) -> String {
    format!("{:>9.4}", deg)
}

/// `(feet, metres)`; metres are truncated before conversion.
pub fn altitude(metres: f64) -> (String, String) {
    let m = metres.trunc();
    let ft = (m * FEET_PER_METRE).trunc();
    (format!("{:>5}", ft as i64), format!("{:>5}", m as i64))
}

pub fn speed_mph(knots: f64) -> String {
    format!("{:>5.1}", knots * MPH_PER_KNOT)
}

pub fn track(deg: f64) -> String {
    format!("{:>5.1}", deg)
}

pub fn satellites(n: u32) -> String {
    n.to_string()
}

pub fn compass(label: &str) -> String {
    format!("{:>3}", label)
}

pub fn battery(percent: u8) -> String {
    format!("{:>3}%", percent)
}
