use super::{RoomTypeId, SubjectId};
use serde::{Deserialize, Serialize};

/// Curricular subject family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectCategory {
    Hauptfach,
    Sprache,
    Nw,
    Musisch,
    Sport,
    Gesellschaft,
}

/// A subject as taught across the school
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// Short code used everywhere else (e.g. "Ma", "De", "Sp")
    pub id: SubjectId,
    pub name: String,
    pub category: SubjectCategory,
    /// Special room type required, if any; `None` means any regular room
    #[serde(default)]
    pub room_type: Option<RoomTypeId>,
    /// All hours must be scheduled as double lessons (odd remainder as a
    /// singleton)
    #[serde(default)]
    pub double_required: bool,
    /// Double lessons are rewarded but not required
    #[serde(default)]
    pub double_preferred: bool,
    /// Eligible for the one-hour-per-day spread rule; independent of
    /// `category` (English is `sprache` and still a Hauptfach)
    #[serde(default)]
    pub hauptfach: bool,
}

impl Subject {
    pub fn wants_double_vars(&self) -> bool {
        self.double_required || self.double_preferred || self.hauptfach
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&SubjectCategory::Gesellschaft).unwrap();
        assert_eq!(json, "\"gesellschaft\"");
    }
}
