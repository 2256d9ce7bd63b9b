use crate::error::SchedulerError;
use crate::slots::SlotIndex;
use crate::solver::progress::CancelToken;
use crate::solver::vars::{Entities, Toggles};
use crate::solver::{run_placement_model, SolveOptions};
use crate::types::{DomainModel, SoftWeights, SolveStatus};

/// Per-attempt cap while diagnosing; feasibility probes do not need the
/// full budget
const PROBE_TIME_LIMIT: u64 = 30;

#[derive(Debug, Clone)]
pub struct RelaxAttempt {
    pub family: &'static str,
    pub status: SolveStatus,
}

/// Outcome of the diagnostic relaxation: which families were stripped,
/// and the first one whose removal made the model feasible
#[derive(Debug, Clone, Default)]
pub struct RelaxationReport {
    pub attempts: Vec<RelaxAttempt>,
    pub culprit: Option<&'static str>,
}

impl RelaxationReport {
    pub fn hint(&self) -> Option<String> {
        self.culprit
            .map(|family| format!("relaxing the '{family}' constraints makes the model feasible"))
    }
}

/// On `Infeasible_Solve`, strip hard-constraint families cumulatively in
/// a fixed order, re-solving after each removal with a short time limit.
/// The first family whose removal yields a feasible model is the
/// offender named in the report.
pub fn diagnose(
    domain: &DomainModel,
    opts: &SolveOptions,
    cancel: &CancelToken,
) -> Result<RelaxationReport, SchedulerError> {
    domain.validate()?;

    let ents = Entities::new(domain);
    let index = SlotIndex::new(&domain.grid);
    // feasibility only: soft terms would just slow the probes down
    let weights = SoftWeights::zeroed();
    let probe_limit = opts.time_limit.min(PROBE_TIME_LIMIT).max(1);

    type Family = (&'static str, fn(&mut Toggles));
    let families: [Family; 5] = [
        ("doubles", |t| t.doubles = false),
        ("rooms", |t| t.rooms = false),
        ("couplings", |t| t.couplings = false),
        ("deputat", |t| t.relax_deputat = true),
        ("compactness", |t| t.compactness = false),
    ];

    let mut report = RelaxationReport::default();
    let mut toggles = Toggles::default();

    for (family, apply) in families {
        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }
        apply(&mut toggles);

        let status = match run_placement_model(
            domain,
            &ents,
            &index,
            &weights,
            &toggles,
            None,
            &domain.pins,
            &[],
            probe_limit,
            opts,
        ) {
            Ok(_) => SolveStatus::Optimal,
            Err(SchedulerError::InfeasibleSolve { .. }) => SolveStatus::Infeasible,
            Err(SchedulerError::Timeout { .. }) => SolveStatus::Unknown,
            Err(other) => return Err(other),
        };

        report.attempts.push(RelaxAttempt { family, status });
        if status.is_solved() {
            report.culprit = Some(family);
            break;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_names_the_family() {
        let report = RelaxationReport {
            attempts: vec![],
            culprit: Some("deputat"),
        };
        assert!(report.hint().unwrap().contains("deputat"));
        assert!(RelaxationReport::default().hint().is_none());
    }
}
