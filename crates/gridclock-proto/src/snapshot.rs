use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every text slot on the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    UtcTime,
    UtcDate,
    LocalTime,
    LocalZone,
    LocalDate,
    Latitude,
    Longitude,
    Grid,
    AltitudeFt,
    AltitudeM,
    Speed,
    Track,
    Satellites,
    Compass,
    Battery,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::UtcTime => "utc",
            Field::UtcDate => "utc date",
            Field::LocalTime => "local",
            Field::LocalZone => "zone",
            Field::LocalDate => "date",
            Field::Latitude => "lat",
            Field::Longitude => "lon",
            Field::Grid => "grid",
            Field::AltitudeFt => "alt ft",
            Field::AltitudeM => "alt m",
            Field::Speed => "mph",
            Field::Track => "track",
            Field::Satellites => "sats",
            Field::Compass => "heading",
            Field::Battery => "battery",
        }
    }
}

/// What is (or should be) on screen. Fields never set are left blank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    fields: BTreeMap<Field, String>,
}

impl DisplaySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: Field, text: impl Into<String>) {
        self.fields.insert(field, text.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Fold updates in, producing the new "last displayed" state.
    pub fn apply(&mut self, updates: &[FieldUpdate]) {
        for u in updates {
            self.fields.insert(u.field, u.text.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub field: Field,
    pub text: String,
}

/// Fields of `next` that differ from what `prev` shows. A field missing
/// from `next` keeps whatever is on screen.
pub fn diff(prev: &DisplaySnapshot, next: &DisplaySnapshot) -> Vec<FieldUpdate> {
    next.fields
        .iter()
        .filter(|(field, text)| prev.fields.get(*field) != Some(*text))
        .map(|(field, text)| FieldUpdate { field: *field, text: text.clone() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_updates_everything_set() {
        let mut next = DisplaySnapshot::new();
        next.set(Field::UtcTime, "12:00:00");
        next.set(Field::Grid, "FN31pr");
        let updates = diff(&DisplaySnapshot::new(), &next);
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0], FieldUpdate { field: Field::UtcTime, text: "12:00:00".into() });
    }

    #[test]
    fn unchanged_fields_skipped() {
        let mut shown = DisplaySnapshot::new();
        shown.set(Field::UtcTime, "12:00:00");
        shown.set(Field::Grid, "FN31pr");

        let mut next = DisplaySnapshot::new();
        next.set(Field::UtcTime, "12:00:01");
        next.set(Field::Grid, "FN31pr");

        let updates = diff(&shown, &next);
        assert_eq!(updates, vec![FieldUpdate { field: Field::UtcTime, text: "12:00:01".into() }]);

        shown.apply(&updates);
        assert_eq!(shown, next);
        assert!(diff(&shown, &next).is_empty());
    }

    #[test]
    fn missing_field_keeps_screen() {
        let mut shown = DisplaySnapshot::new();
        shown.set(Field::Latitude, " 41.7148");
        let next = DisplaySnapshot::new();
        assert!(diff(&shown, &next).is_empty());
        assert_eq!(shown.get(Field::Latitude), Some(" 41.7148"));
    }
}
