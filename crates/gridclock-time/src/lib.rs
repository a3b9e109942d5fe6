pub mod clock;
pub mod doctor;

pub use clock::{ClockResolver, ResolvedTime, TimeZoneRule, ZoneConfig};

#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error("epoch {0} is outside the supported calendar range")]
    OutOfRange(i64),

    #[error("invalid {which} rule: {reason}")]
    InvalidRule { which: &'static str, reason: String },
}
