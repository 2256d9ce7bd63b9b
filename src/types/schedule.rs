use super::{ClassId, CouplingId, Slot, SoftWeights, SolverLimits, SubjectId, TeacherId};
use serde::{Deserialize, Serialize};

/// Final solver verdict, mapped 1:1 from the back-end status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    /// Timeout without a proven result
    Unknown,
}

impl SolveStatus {
    pub fn is_solved(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// One placed lesson. Coupling hours yield one entry per group, carrying
/// the coupling id; the anchor class stands in for all involved classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub slot: Slot,
    pub teacher: TeacherId,
    pub class: ClassId,
    pub subject: SubjectId,
    /// Room instance label (e.g. "nw-2"), assigned by the post-pass
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub coupling: Option<CouplingId>,
    #[serde(default)]
    pub coupling_group: Option<String>,
}

/// One row of the teacher-assignment solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherAssignment {
    pub teacher: TeacherId,
    pub class: ClassId,
    pub subject: SubjectId,
    pub hours: u32,
}

/// Everything needed to reproduce the solve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub weights: SoftWeights,
    pub limits: SolverLimits,
    pub two_pass_used: bool,
    pub generated_at: String,
    pub algorithm_version: String,
}

/// The decoded solution plus solver bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveResult {
    pub status: SolveStatus,
    pub entries: Vec<ScheduleEntry>,
    pub assignments: Vec<TeacherAssignment>,
    pub objective_value: Option<f64>,
    pub num_variables: usize,
    pub num_constraints: usize,
    pub solve_time_ms: u64,
    pub config_snapshot: ConfigSnapshot,
}

impl SolveResult {
    pub fn entries_for_class<'a>(&'a self, class: &'a ClassId) -> impl Iterator<Item = &'a ScheduleEntry> {
        self.entries.iter().filter(move |e| &e.class == class)
    }

    pub fn entries_for_teacher<'a>(
        &'a self,
        teacher: &'a TeacherId,
    ) -> impl Iterator<Item = &'a ScheduleEntry> {
        self.entries.iter().filter(move |e| &e.teacher == teacher)
    }

    /// Stable JSON snapshot; field order follows struct order so a
    /// re-load reproduces identical decisions
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_round_trip() {
        let result = SolveResult {
            status: SolveStatus::Optimal,
            entries: vec![ScheduleEntry {
                slot: Slot::new(0, 3),
                teacher: "MÜL".into(),
                class: "5a".into(),
                subject: "Ma".into(),
                room: None,
                coupling: None,
                coupling_group: None,
            }],
            assignments: vec![TeacherAssignment {
                teacher: "MÜL".into(),
                class: "5a".into(),
                subject: "Ma".into(),
                hours: 4,
            }],
            objective_value: Some(12.0),
            num_variables: 40,
            num_constraints: 17,
            solve_time_ms: 3,
            config_snapshot: ConfigSnapshot {
                weights: SoftWeights::default(),
                limits: SolverLimits::default(),
                two_pass_used: false,
                generated_at: String::new(),
                algorithm_version: "test".to_string(),
            },
        };

        let json = result.to_json().unwrap();
        let back = SolveResult::from_json(&json).unwrap();
        assert_eq!(back.entries, result.entries);
        assert_eq!(back.status, SolveStatus::Optimal);
        // slots persist as 0-based day + 1-based period
        assert!(json.contains("\"day\": 0"));
        assert!(json.contains("\"period\": 3"));
    }
}
