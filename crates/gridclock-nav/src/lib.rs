pub mod doctor;
pub mod gnss;
pub mod grid;
pub mod heading;
pub mod mag;

pub use grid::{locate, GridError, Locator};
pub use heading::{direction_label, CalibrationOffsets, HardIronCalibrator, HeadingResolver, HeadingResult};
