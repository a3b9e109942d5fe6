pub mod format;
pub mod snapshot;

pub use snapshot::{diff, DisplaySnapshot, Field, FieldUpdate};
