mod checks;

pub use checks::*;

use crate::types::{DomainModel, SolveResult};

/// A re-checked invariant that does not hold on the decoded solution
#[derive(Debug, Clone)]
pub struct Violation {
    pub constraint: String,
    pub message: String,
}

impl Violation {
    pub fn new(constraint: &str, message: impl Into<String>) -> Self {
        Violation {
            constraint: constraint.to_string(),
            message: message.into(),
        }
    }
}

/// Result of the independent validation pass
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<Violation>,
    pub warnings: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Re-check every invariant on the decoded entries by plain
/// aggregation. Deliberately independent of the model builder: a bug
/// there must not hide here.
pub fn validate(result: &SolveResult, model: &DomainModel) -> ValidationReport {
    let mut report = ValidationReport::default();

    report.errors.extend(check_admissible_slots(result, model));
    report.errors.extend(check_curriculum(result, model));
    report.errors.extend(check_teacher_conflicts(result, model));
    report.errors.extend(check_class_conflicts(result, model));
    report.errors.extend(check_deputat_band(result, model));
    report.errors.extend(check_class_prefix(result, model));
    report.errors.extend(check_teacher_day_caps(result, model));
    report.errors.extend(check_teacher_gaps(result, model));
    report.errors.extend(check_required_doubles(result, model));
    report.errors.extend(check_room_capacity(result, model));
    report.errors.extend(check_coupling_integrity(result, model));
    report.errors.extend(check_track_sync(result, model));

    report.warnings.extend(warn_deputat_deviation(result, model));

    report
}
