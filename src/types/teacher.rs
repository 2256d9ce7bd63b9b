use super::{Slot, SubjectId, TeacherId};
use serde::{Deserialize, Serialize};

/// A teacher with qualifications, workload band, and availability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    /// Subjects this teacher is qualified to teach
    pub subjects: Vec<SubjectId>,
    /// Target weekly teaching hours
    pub deputat: u32,
    /// Lower bound of the deputat band; defaults to `deputat - 2`
    #[serde(default)]
    pub deputat_min: Option<u32>,
    /// Upper bound of the deputat band; defaults to `deputat + 2`
    #[serde(default)]
    pub deputat_max: Option<u32>,
    /// Slots when the teacher cannot teach
    #[serde(default)]
    pub unavailable: Vec<Slot>,
    /// Days the teacher would like to keep lesson-free (0 = Monday)
    #[serde(default)]
    pub preferred_free_days: Vec<u8>,
    #[serde(default)]
    pub max_hours_per_day: Option<u8>,
    #[serde(default)]
    pub max_gaps_per_day: Option<u8>,
    #[serde(default)]
    pub max_gaps_per_week: Option<u8>,
    /// May teach upper-secondary courses
    #[serde(default)]
    pub can_teach_sek2: bool,
}

impl Teacher {
    pub fn qualified_for(&self, subject: &SubjectId) -> bool {
        self.subjects.contains(subject)
    }

    pub fn is_available(&self, slot: Slot) -> bool {
        !self.unavailable.contains(&slot)
    }

    pub fn deputat_min(&self) -> u32 {
        self.deputat_min.unwrap_or(self.deputat.saturating_sub(2))
    }

    pub fn deputat_max(&self) -> u32 {
        self.deputat_max.unwrap_or(self.deputat + 2)
    }

    /// Whether gap accounting is needed for this teacher at all
    pub fn has_gap_limits(&self) -> bool {
        self.max_gaps_per_day.is_some() || self.max_gaps_per_week.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teacher() -> Teacher {
        Teacher {
            id: "MÜL".into(),
            name: "Müller".to_string(),
            subjects: vec!["Ma".into(), "Ph".into()],
            deputat: 25,
            deputat_min: None,
            deputat_max: Some(26),
            unavailable: vec![Slot::new(0, 1)],
            preferred_free_days: vec![4],
            max_hours_per_day: Some(6),
            max_gaps_per_day: None,
            max_gaps_per_week: None,
            can_teach_sek2: false,
        }
    }

    #[test]
    fn test_deputat_band_defaults() {
        let t = teacher();
        assert_eq!(t.deputat_min(), 23);
        assert_eq!(t.deputat_max(), 26);
    }

    #[test]
    fn test_availability() {
        let t = teacher();
        assert!(!t.is_available(Slot::new(0, 1)));
        assert!(t.is_available(Slot::new(0, 2)));
        assert!(t.qualified_for(&"Ph".into()));
        assert!(!t.qualified_for(&"De".into()));
    }
}
