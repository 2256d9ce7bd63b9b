use serde::{Deserialize, Serialize};

/// Non-negative weights of the soft-constraint penalty sum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftWeights {
    /// Teacher gaps (Springstunden), plus one extra unit per gap beyond
    /// the first on a day
    #[serde(default = "w_gaps")]
    pub gaps: f64,
    /// Per-teacher spread between the fullest and emptiest day
    #[serde(default = "w_workload")]
    pub workload: f64,
    /// Lessons on a teacher's preferred free day
    #[serde(default = "w_day_wishes")]
    pub day_wishes: f64,
    /// Teacher activity in the first or last period of a day
    #[serde(default = "w_compact")]
    pub compact: f64,
    /// Reward for optional double lessons
    #[serde(default = "w_double_lessons")]
    pub double_lessons: f64,
    /// More than one hour of a Hauptfach per class-day (doubles excused)
    #[serde(default = "w_subject_spread")]
    pub subject_spread: f64,
    /// Absolute deviation from the deputat target
    #[serde(default = "w_deputat_dev")]
    pub deputat_dev: f64,
}

fn w_gaps() -> f64 {
    3.0
}
fn w_workload() -> f64 {
    1.0
}
fn w_day_wishes() -> f64 {
    2.0
}
fn w_compact() -> f64 {
    0.5
}
fn w_double_lessons() -> f64 {
    1.0
}
fn w_subject_spread() -> f64 {
    2.0
}
fn w_deputat_dev() -> f64 {
    1.0
}

impl Default for SoftWeights {
    fn default() -> Self {
        SoftWeights {
            gaps: w_gaps(),
            workload: w_workload(),
            day_wishes: w_day_wishes(),
            compact: w_compact(),
            double_lessons: w_double_lessons(),
            subject_spread: w_subject_spread(),
            deputat_dev: w_deputat_dev(),
        }
    }
}

impl SoftWeights {
    /// All weights zero: pure feasibility solve (`--no-soft`)
    pub fn zeroed() -> Self {
        SoftWeights {
            gaps: 0.0,
            workload: 0.0,
            day_wishes: 0.0,
            compact: 0.0,
            double_lessons: 0.0,
            subject_spread: 0.0,
            deputat_dev: 0.0,
        }
    }

    pub fn is_all_zero(&self) -> bool {
        [
            self.gaps,
            self.workload,
            self.day_wishes,
            self.compact,
            self.double_lessons,
            self.subject_spread,
            self.deputat_dev,
        ]
        .iter()
        .all(|w| *w == 0.0)
    }

    /// Set a weight by its CLI key (`--weights gaps=2,compact=0`)
    pub fn set(&mut self, key: &str, value: f64) -> bool {
        let target = match key {
            "gaps" => &mut self.gaps,
            "workload" => &mut self.workload,
            "day_wishes" => &mut self.day_wishes,
            "compact" => &mut self.compact,
            "double_lessons" => &mut self.double_lessons,
            "subject_spread" => &mut self.subject_spread,
            "deputat_dev" => &mut self.deputat_dev,
            _ => return false,
        };
        *target = value;
        true
    }
}

/// Solver resource limits and reproducibility knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverLimits {
    #[serde(default = "default_time_limit")]
    pub time_limit_seconds: u64,
    /// 0 = detect logical cores
    #[serde(default)]
    pub num_workers: u32,
    #[serde(default = "default_seed")]
    pub seed: i32,
    /// Force the two-pass strategy on or off; `None` = auto
    #[serde(default)]
    pub two_pass: Option<bool>,
}

fn default_time_limit() -> u64 {
    120
}

fn default_seed() -> i32 {
    42
}

impl Default for SolverLimits {
    fn default() -> Self {
        SolverLimits {
            time_limit_seconds: default_time_limit(),
            num_workers: 0,
            seed: default_seed(),
            two_pass: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_by_key() {
        let mut w = SoftWeights::default();
        assert!(w.set("gaps", 7.5));
        assert_eq!(w.gaps, 7.5);
        assert!(!w.set("unknown", 1.0));
    }

    #[test]
    fn test_zeroed_is_all_zero() {
        assert!(SoftWeights::zeroed().is_all_zero());
        assert!(!SoftWeights::default().is_all_zero());
    }
}
