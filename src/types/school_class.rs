use super::{ClassId, SubjectId, TimeGrid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper-secondary course flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseType {
    /// Leistungskurs
    Lk,
    /// Grundkurs
    Gk,
    #[default]
    None,
}

/// A class (Sek-I) or a synchronised course lane member (Sek-II)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolClass {
    pub id: ClassId,
    pub grade: u8,
    /// Weekly hours per subject; BTreeMap keeps iteration deterministic
    pub curriculum: BTreeMap<SubjectId, u32>,
    /// Override of the grid ceiling; clamped to the applicable maximum
    #[serde(default)]
    pub max_period: Option<u8>,
    #[serde(default)]
    pub is_course: bool,
    #[serde(default)]
    pub course_type: CourseType,
}

impl SchoolClass {
    /// Total scheduled weekly hours
    pub fn weekly_hours(&self) -> u32 {
        self.curriculum.values().sum()
    }

    /// Last period this class may use under the given grid
    pub fn max_period(&self, grid: &TimeGrid) -> u8 {
        let ceiling = if self.is_course {
            grid.sek2_max_period
        } else {
            grid.sek1_max_period
        };
        match self.max_period {
            Some(p) => p.min(ceiling),
            None => ceiling,
        }
    }

    pub fn hours_for(&self, subject: &SubjectId) -> u32 {
        self.curriculum.get(subject).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_period_uses_ceilings() {
        let grid = TimeGrid::german_default();
        let mut class = SchoolClass {
            id: "5a".into(),
            grade: 5,
            curriculum: BTreeMap::new(),
            max_period: None,
            is_course: false,
            course_type: CourseType::None,
        };
        assert_eq!(class.max_period(&grid), 6);

        class.max_period = Some(4);
        assert_eq!(class.max_period(&grid), 4);

        class.is_course = true;
        class.max_period = None;
        assert_eq!(class.max_period(&grid), 8);
    }

    #[test]
    fn test_weekly_hours_sums_curriculum() {
        let mut curriculum = BTreeMap::new();
        curriculum.insert(SubjectId::from("Ma"), 4);
        curriculum.insert(SubjectId::from("De"), 4);
        let class = SchoolClass {
            id: "5a".into(),
            grade: 5,
            curriculum,
            max_period: None,
            is_course: false,
            course_type: CourseType::None,
        };
        assert_eq!(class.weekly_hours(), 8);
        assert_eq!(class.hours_for(&"Ma".into()), 4);
        assert_eq!(class.hours_for(&"En".into()), 0);
    }
}
