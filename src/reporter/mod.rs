use crate::error::Result;
use crate::types::{ClassId, DomainModel, SolveResult, SolveStatus};
use crate::validator::ValidationReport;
use colored::Colorize;
use std::path::Path;

/// Console summary after a solve
pub fn print_summary(result: &SolveResult, report: &ValidationReport) {
    let status = match result.status {
        SolveStatus::Optimal => "OPTIMAL".green().bold(),
        SolveStatus::Feasible => "FEASIBLE".green(),
        SolveStatus::Infeasible => "INFEASIBLE".red().bold(),
        SolveStatus::Unknown => "UNKNOWN".yellow().bold(),
    };
    println!("\n{} {status}", "Status:".bold());
    println!(
        "  {} lessons, {} assignments",
        result.entries.len(),
        result.assignments.len()
    );
    if let Some(objective) = result.objective_value {
        println!("  objective {objective:.1}");
    }
    println!(
        "  {} variables, {} constraints, {} ms",
        result.num_variables, result.num_constraints, result.solve_time_ms
    );

    if report.is_valid() {
        println!("  {}", "validation passed".green());
    } else {
        println!("  {}", "validation FAILED".red().bold());
        for violation in &report.errors {
            println!("    {} {}", violation.constraint.red(), violation.message);
        }
    }
    for warning in &report.warnings {
        println!("  {} {}", "warning:".yellow(), warning.message);
    }
}

/// Machine-readable one-line summary (quiet mode)
pub fn generate_json_summary(result: &SolveResult) -> Result<String> {
    let summary = serde_json::json!({
        "status": result.status,
        "entries": result.entries.len(),
        "assignments": result.assignments.len(),
        "objective_value": result.objective_value,
        "num_variables": result.num_variables,
        "num_constraints": result.num_constraints,
        "solve_time_ms": result.solve_time_ms,
    });
    Ok(serde_json::to_string(&summary)?)
}

/// Write the full snapshot to `<dir>/schedule.json`
pub fn write_snapshot(result: &SolveResult, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join("schedule.json"), result.to_json()?)?;
    Ok(())
}

/// Week table of one class, periods as rows and days as columns
pub fn render_class_week(result: &SolveResult, model: &DomainModel, class: &ClassId) -> String {
    let mut out = format!("{class}\n");
    let days = model.grid.days;

    out.push_str("      ");
    for day in 0..days {
        out.push_str(&format!("{:<12}", day_name(day)));
    }
    out.push('\n');

    for slot_def in &model.grid.slots {
        out.push_str(&format!("{:>2}    ", slot_def.period));
        for day in 0..days {
            let cell = result
                .entries_for_class(class)
                .find(|e| e.slot.day == day && e.slot.period == slot_def.period)
                .map(|e| format!("{} {}", e.subject, e.teacher))
                .unwrap_or_default();
            out.push_str(&format!("{cell:<12}"));
        }
        out.push('\n');
    }
    out
}

fn day_name(day: u8) -> &'static str {
    match day {
        0 => "Montag",
        1 => "Dienstag",
        2 => "Mittwoch",
        3 => "Donnerstag",
        4 => "Freitag",
        5 => "Samstag",
        _ => "Sonntag",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ConfigSnapshot, ScheduleEntry, Slot, SoftWeights, SolverLimits,
    };

    #[test]
    fn test_json_summary_has_status() {
        let result = SolveResult {
            status: SolveStatus::Optimal,
            entries: vec![ScheduleEntry {
                slot: Slot::new(0, 1),
                teacher: "MÜL".into(),
                class: "5a".into(),
                subject: "Ma".into(),
                room: None,
                coupling: None,
                coupling_group: None,
            }],
            assignments: vec![],
            objective_value: Some(3.0),
            num_variables: 10,
            num_constraints: 5,
            solve_time_ms: 1,
            config_snapshot: ConfigSnapshot {
                weights: SoftWeights::default(),
                limits: SolverLimits::default(),
                two_pass_used: false,
                generated_at: String::new(),
                algorithm_version: String::new(),
            },
        };
        let summary = generate_json_summary(&result).unwrap();
        assert!(summary.contains("\"status\":\"optimal\""));
        assert!(summary.contains("\"entries\":1"));
    }
}
