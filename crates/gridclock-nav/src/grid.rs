//! Maidenhead locator to subsquare precision (6 characters).

use std::fmt;

const UPPER: &[u8; 24] = b"ABCDEFGHIJKLMNOPQRSTUVWX";
const LOWER: &[u8; 24] = b"abcdefghijklmnopqrstuvwx";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GridError {
    #[error("latitude {0} outside -90..=90")]
    Latitude(f64),
    #[error("longitude {0} outside -180..=180")]
    Longitude(f64),
}

/// Field, square and subsquare, e.g. `FN31pr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn locate(lat: f64, lon: f64) -> Result<Locator, GridError> {
    // also rejects NaN
    if !(-90.0..=90.0).contains(&lat) {
        return Err(GridError::Latitude(lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(GridError::Longitude(lon));
    }

    let lat_adj = lat + 90.0;
    let lat_field = (lat_adj / 10.0).floor() as usize;
    let lat_square = (lat_adj.floor() as u32) % 10;
    let lat_sub = ((lat_adj - lat_adj.floor()) * 60.0 / 2.5).floor() as usize;

    let lon_adj = lon + 180.0;
    let lon_field = (lon_adj / 20.0).floor() as usize;
    let lon_square = ((lon_adj / 2.0) % 10.0).floor() as u32;
    let lon_sub = ((lon_adj - (lon_adj / 2.0).floor() * 2.0) * 60.0 / 5.0).floor() as usize;

    let mut s = String::with_capacity(6);
    s.push(UPPER[lon_field] as char);
    s.push(UPPER[lat_field] as char);
    s.push(char::from(b'0' + lon_square as u8));
    s.push(char::from(b'0' + lat_square as u8));
    s.push(LOWER[lon_sub] as char);
    s.push(LOWER[lat_sub] as char);
    Ok(Locator(s))
}
