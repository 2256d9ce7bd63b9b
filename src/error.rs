use thiserror::Error;

/// Domain-specific errors for the timetable solver
#[derive(Error, Debug)]
pub enum SchedulerError {
    // Input errors
    #[error("invalid input ({entity}): {message}")]
    InvalidInput { entity: String, message: String },

    // Pre-solve audit rejected the model
    #[error("statically infeasible: {}", .errors.join("; "))]
    InfeasibleStatic { errors: Vec<String> },

    // Solver errors
    #[error("no feasible timetable exists{}", .hint.as_deref().map(|h| format!(" (hint: {h})")).unwrap_or_default())]
    InfeasibleSolve { hint: Option<String> },

    #[error("solver hit the {seconds}s time limit without a proven result")]
    Timeout { seconds: u64 },

    #[error("cancelled by caller")]
    Cancelled,

    // Post-solve errors
    #[error("room assignment failed: {0}")]
    RoomAssignment(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SchedulerError {
    /// Stable identifier for tooling; user-visible text may be localised,
    /// this string never changes.
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulerError::InvalidInput { .. } => "invalid_input",
            SchedulerError::InfeasibleStatic { .. } => "infeasible_static",
            SchedulerError::InfeasibleSolve { .. } => "infeasible_solve",
            SchedulerError::Timeout { .. } => "timeout",
            SchedulerError::Cancelled => "cancelled",
            SchedulerError::RoomAssignment(_) => "room_assignment",
            SchedulerError::Internal(_) => "internal",
        }
    }

    /// Process exit code for the CLI (0 = solved, 2 = infeasible,
    /// 3 = unknown/timeout, 4 = invalid input).
    pub fn exit_code(&self) -> i32 {
        match self {
            SchedulerError::InvalidInput { .. } => 4,
            SchedulerError::InfeasibleStatic { .. } => 2,
            SchedulerError::InfeasibleSolve { .. } => 2,
            SchedulerError::Timeout { .. } => 3,
            SchedulerError::Cancelled => 3,
            SchedulerError::RoomAssignment(_) => 1,
            SchedulerError::Internal(_) => 1,
        }
    }
}

/// Use anyhow::Result at application boundaries
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_stable() {
        let err = SchedulerError::Timeout { seconds: 30 };
        assert_eq!(err.kind(), "timeout");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_infeasible_static_lists_clauses() {
        let err = SchedulerError::InfeasibleStatic {
            errors: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "statically infeasible: a; b");
        assert_eq!(err.exit_code(), 2);
    }
}
