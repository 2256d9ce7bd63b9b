mod builder;
mod decoder;
mod objective;
pub mod progress;
mod relaxer;
mod rooms;
mod vars;

pub use relaxer::{diagnose, RelaxAttempt, RelaxationReport};
pub use vars::{Entities, Toggles};

use crate::audit::audit;
use crate::error::SchedulerError;
use crate::slots::SlotIndex;
use crate::types::{
    ClassId, ConfigSnapshot, DomainModel, Pin, ScheduleEntry, SoftWeights, SolveResult,
    SolveStatus, SolverLimits, SubjectId, TeacherAssignment, TeacherId,
};
use good_lp::{variable, Expression, ProblemVariables, Solution, SolverModel, Variable};
use progress::{CancelToken, ProgressSink, SolveStats};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use vars::{sum_vars, VarSet};

/// Two-pass auto-enables at this many classes
const TWO_PASS_CLASS_THRESHOLD: usize = 20;

/// Runtime knobs of one solve, derived from `SolverLimits` plus the
/// CLI-only switches
#[derive(Debug, Clone)]
pub struct SolveOptions {
    pub time_limit: u64,
    pub num_workers: u32,
    pub seed: i32,
    pub two_pass: Option<bool>,
    pub no_soft: bool,
}

impl SolveOptions {
    pub fn from_limits(limits: &SolverLimits) -> Self {
        SolveOptions {
            time_limit: limits.time_limit_seconds.max(1),
            num_workers: limits.num_workers,
            seed: limits.seed,
            two_pass: limits.two_pass,
            no_soft: false,
        }
    }
}

/// Entities whose lessons changed since the previous solution; used by
/// the incremental re-solve to decide which placements stay fixed
#[derive(Debug, Clone, Default)]
pub struct ChangedEntities {
    pub teachers: BTreeSet<TeacherId>,
    pub classes: BTreeSet<ClassId>,
    pub subjects: BTreeSet<SubjectId>,
}

impl ChangedEntities {
    pub fn affects(&self, entry: &ScheduleEntry) -> bool {
        self.teachers.contains(&entry.teacher)
            || self.classes.contains(&entry.class)
            || self.subjects.contains(&entry.subject)
    }
}

/// Solve with the limits and weights stored on the model
pub fn solve(
    domain: &DomainModel,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<SolveResult, SchedulerError> {
    let opts = SolveOptions::from_limits(&domain.limits);
    solve_with(domain, &opts, sink, cancel)
}

/// Full solve: validate, audit, then single-pass or adaptive two-pass
pub fn solve_with(
    domain: &DomainModel,
    opts: &SolveOptions,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<SolveResult, SchedulerError> {
    let start = Instant::now();
    domain.validate()?;

    let report = audit(domain);
    if !report.feasible() {
        return Err(SchedulerError::InfeasibleStatic {
            errors: report.errors,
        });
    }
    tick(sink, "audit", &start, None);
    check_cancel(cancel)?;

    let weights = if opts.no_soft {
        SoftWeights::zeroed()
    } else {
        domain.weights.clone()
    };
    let ents = Entities::new(domain);
    let index = SlotIndex::new(&domain.grid);

    let two_pass = opts
        .two_pass
        .unwrap_or(domain.classes.len() >= TWO_PASS_CLASS_THRESHOLD);

    if two_pass {
        solve_two_pass(domain, &ents, &index, &weights, opts, sink, cancel, &start)
    } else {
        let outcome = run_placement_model(
            domain,
            &ents,
            &index,
            &weights,
            &Toggles::default(),
            None,
            &domain.pins,
            &[],
            opts.time_limit,
            opts,
        )?;
        tick(sink, "solve", &start, outcome.objective_value);
        finalize(
            domain,
            weights,
            SolveStatus::Optimal,
            false,
            outcome,
            &start,
            sink,
            cancel,
        )
    }
}

/// Pass 1 decides who teaches what (assignment only); pass 2 fixes the
/// assignment and places the lessons with the full objective. Each pass
/// gets half of the budget, pass 2 reclaims what pass 1 left unused.
#[allow(clippy::too_many_arguments)]
fn solve_two_pass(
    domain: &DomainModel,
    ents: &Entities,
    index: &SlotIndex,
    weights: &SoftWeights,
    opts: &SolveOptions,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
    start: &Instant,
) -> Result<SolveResult, SchedulerError> {
    let half = (opts.time_limit / 2).max(1);
    let fixed = solve_assignment_pass(domain, ents, weights, opts, half)?;
    tick(sink, "pass1", start, None);
    check_cancel(cancel)?;

    let elapsed = start.elapsed().as_secs();
    let remaining = opts.time_limit.saturating_sub(elapsed).max(1);
    let outcome = run_placement_model(
        domain,
        ents,
        index,
        weights,
        &Toggles::default(),
        Some(&fixed),
        &domain.pins,
        &[],
        remaining,
        opts,
    )
    .map_err(|err| match err {
        SchedulerError::InfeasibleSolve { .. } => SchedulerError::InfeasibleSolve {
            hint: Some("assignment pass fixed an unplaceable selection; retry with --no-two-pass".to_string()),
        },
        other => other,
    })?;
    tick(sink, "pass2", start, outcome.objective_value);

    finalize(
        domain,
        weights.clone(),
        SolveStatus::Feasible,
        true,
        outcome,
        start,
        sink,
        cancel,
    )
}

/// Re-solve after a small change: placements of unaffected lessons stay
/// fixed; on infeasibility the fixes are released class by class, then
/// the pins are dropped one at a time.
pub fn resolve_incremental(
    domain: &DomainModel,
    previous: &SolveResult,
    changed: &ChangedEntities,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<SolveResult, SchedulerError> {
    let start = Instant::now();
    domain.validate()?;
    let report = audit(domain);
    if !report.feasible() {
        return Err(SchedulerError::InfeasibleStatic {
            errors: report.errors,
        });
    }

    let opts = SolveOptions::from_limits(&domain.limits);
    let weights = domain.weights.clone();
    let ents = Entities::new(domain);
    let index = SlotIndex::new(&domain.grid);

    // fixes grouped by class so they can be released progressively
    let mut fixes_by_class: BTreeMap<ClassId, Vec<(usize, usize, u8, u8)>> = BTreeMap::new();
    for entry in &previous.entries {
        if entry.coupling.is_some() || changed.affects(entry) {
            continue;
        }
        let (Some(di), Some(ti)) = (
            ents.demand_index(&entry.class, &entry.subject),
            ents.teacher_index(&entry.teacher),
        ) else {
            continue;
        };
        fixes_by_class
            .entry(entry.class.clone())
            .or_default()
            .push((di, ti, entry.slot.day, entry.slot.period));
    }

    let mut release_order: Vec<ClassId> = fixes_by_class.keys().cloned().collect();
    // pop() releases in ascending class-id order
    release_order.reverse();
    let mut pins: Vec<Pin> = domain.pins.clone();

    loop {
        check_cancel(cancel)?;
        let fixes: Vec<(usize, usize, u8, u8)> =
            fixes_by_class.values().flatten().copied().collect();
        let attempt = run_placement_model(
            domain,
            &ents,
            &index,
            &weights,
            &Toggles::default(),
            None,
            &pins,
            &fixes,
            opts.time_limit,
            &opts,
        );
        match attempt {
            Ok(outcome) => {
                tick(sink, "incremental", &start, outcome.objective_value);
                return finalize(
                    domain,
                    weights,
                    SolveStatus::Feasible,
                    false,
                    outcome,
                    &start,
                    sink,
                    cancel,
                );
            }
            Err(SchedulerError::InfeasibleSolve { .. }) => {
                if let Some(class) = release_order.pop() {
                    fixes_by_class.remove(&class);
                    tick(sink, "incremental-release", &start, None);
                } else if pins.pop().is_some() {
                    tick(sink, "incremental-unpin", &start, None);
                } else {
                    return Err(SchedulerError::InfeasibleSolve {
                        hint: Some(
                            "infeasible even with all previous placements and pins released"
                                .to_string(),
                        ),
                    });
                }
            }
            Err(other) => return Err(other),
        }
    }
}

/// One full placement model: build variables, compose the objective,
/// post constraints, run HiGHS, decode.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_placement_model(
    domain: &DomainModel,
    ents: &Entities,
    index: &SlotIndex,
    weights: &SoftWeights,
    toggles: &Toggles,
    fixed_assign: Option<&BTreeMap<usize, usize>>,
    pins: &[Pin],
    slot_fixes: &[(usize, usize, u8, u8)],
    time_limit: u64,
    opts: &SolveOptions,
) -> Result<PassOutcome, SchedulerError> {
    let mut pv = ProblemVariables::new();
    let vars = VarSet::build(&mut pv, domain, ents, index, weights, toggles, fixed_assign);
    let objective = objective::compose(&vars, ents, index, weights);

    let mut model = pv
        .minimise(objective.clone())
        .using(good_lp::solvers::highs::highs)
        .set_option("output_flag", "false")
        .set_option("time_limit", time_limit.max(1) as f64)
        .set_option("random_seed", opts.seed);
    if opts.num_workers > 0 {
        model = model.set_option("threads", opts.num_workers as i32);
    }

    let (model, num_constraints) = builder::post_constraints(
        model,
        ents,
        index,
        &vars,
        weights,
        toggles,
        pins,
        slot_fixes,
    );

    match model.solve() {
        Ok(solution) => {
            let (entries, assignments) = decoder::decode(&solution, ents, &vars);
            Ok(PassOutcome {
                entries,
                assignments,
                objective_value: Some(solution.eval(objective)),
                num_variables: vars.num_variables,
                num_constraints,
            })
        }
        Err(err) => Err(map_resolution_error(err, time_limit)),
    }
}

pub(crate) struct PassOutcome {
    pub entries: Vec<ScheduleEntry>,
    pub assignments: Vec<TeacherAssignment>,
    pub objective_value: Option<f64>,
    pub num_variables: usize,
    pub num_constraints: usize,
}

/// Assignment-only model for pass 1: decide `a` and the coupling group
/// teachers under the deputat band, minimising workload spread and
/// deputat deviation.
fn solve_assignment_pass(
    domain: &DomainModel,
    ents: &Entities,
    weights: &SoftWeights,
    opts: &SolveOptions,
    time_limit: u64,
) -> Result<BTreeMap<usize, usize>, SchedulerError> {
    let mut pv = ProblemVariables::new();
    let mut assign: BTreeMap<(usize, usize), Variable> = BTreeMap::new();
    let mut group: BTreeMap<(usize, usize, usize), Variable> = BTreeMap::new();

    for (di, demand) in ents.demands.iter().enumerate() {
        let class = ents.classes[demand.class];
        for (ti, teacher) in ents.teachers.iter().enumerate() {
            if !teacher.qualified_for(&demand.subject.id) {
                continue;
            }
            if class.is_course && !teacher.can_teach_sek2 {
                continue;
            }
            assign.insert((di, ti), pv.add(variable().binary()));
        }
    }
    for (ki, coupling) in ents.couplings.iter().enumerate() {
        let any_course = coupling
            .classes
            .iter()
            .any(|c| domain.school_class(c).map(|c| c.is_course).unwrap_or(false));
        for (gi, grp) in coupling.groups.iter().enumerate() {
            for (ti, teacher) in ents.teachers.iter().enumerate() {
                if !teacher.qualified_for(&grp.subject) {
                    continue;
                }
                if any_course && !teacher.can_teach_sek2 {
                    continue;
                }
                group.insert((ki, gi, ti), pv.add(variable().binary()));
            }
        }
    }

    let mut dev: BTreeMap<usize, Variable> = BTreeMap::new();
    if weights.deputat_dev > 0.0 {
        for ti in 0..ents.teachers.len() {
            dev.insert(ti, pv.add(variable().min(0.0)));
        }
    }
    let span = (weights.workload > 0.0)
        .then(|| (pv.add(variable().min(0.0)), pv.add(variable().min(0.0))));

    let mut objective = Expression::from(0.0);
    for &d in dev.values() {
        objective += weights.deputat_dev * d;
    }
    if let Some((lmax, lmin)) = span {
        objective += weights.workload * lmax;
        objective += -weights.workload * lmin;
    }

    let mut model = pv
        .minimise(objective)
        .using(good_lp::solvers::highs::highs)
        .set_option("output_flag", "false")
        .set_option("time_limit", time_limit.max(1) as f64)
        .set_option("random_seed", opts.seed);
    if opts.num_workers > 0 {
        model = model.set_option("threads", opts.num_workers as i32);
    }

    for di in 0..ents.demands.len() {
        let row: Vec<Variable> = (0..ents.teachers.len())
            .filter_map(|ti| assign.get(&(di, ti)).copied())
            .collect();
        model = model.with(sum_vars(&row).eq(1.0));
    }
    for (ki, coupling) in ents.couplings.iter().enumerate() {
        for gi in 0..coupling.groups.len() {
            let row: Vec<Variable> = (0..ents.teachers.len())
                .filter_map(|ti| group.get(&(ki, gi, ti)).copied())
                .collect();
            model = model.with(sum_vars(&row).eq(1.0));
        }
    }
    for (ti, teacher) in ents.teachers.iter().enumerate() {
        let mut load = Expression::from(0.0);
        for (di, demand) in ents.demands.iter().enumerate() {
            if let Some(&a) = assign.get(&(di, ti)) {
                load += demand.hours as f64 * a;
            }
        }
        for (ki, coupling) in ents.couplings.iter().enumerate() {
            for gi in 0..coupling.groups.len() {
                if let Some(&g) = group.get(&(ki, gi, ti)) {
                    load += coupling.hours_per_week as f64 * g;
                }
            }
        }
        model = model.with(load.clone().geq(teacher.deputat_min() as f64));
        model = model.with(load.clone().leq(teacher.deputat_max() as f64));
        if let Some(&d) = dev.get(&ti) {
            model = model.with(Expression::from(d).geq(load.clone() - teacher.deputat as f64));
            model = model.with(Expression::from(d).geq(teacher.deputat as f64 - load.clone()));
        }
        if let Some((lmax, lmin)) = span {
            model = model.with(Expression::from(lmax).geq(load.clone()));
            model = model.with(Expression::from(lmin).leq(load));
        }
    }
    for pin in &domain.pins {
        if let (Some(di), Some(ti)) = (
            ents.demand_index(&pin.class, &pin.subject),
            ents.teacher_index(&pin.teacher),
        ) {
            if let Some(&a) = assign.get(&(di, ti)) {
                model = model.with(Expression::from(a).eq(1.0));
            }
        }
    }

    match model.solve() {
        Ok(solution) => {
            let mut fixed = BTreeMap::new();
            for (&(di, ti), &a) in &assign {
                if solution.value(a) > 0.5 {
                    fixed.insert(di, ti);
                }
            }
            Ok(fixed)
        }
        Err(err) => Err(map_resolution_error(err, time_limit)),
    }
}

/// Room post-pass, internal validation, snapshot assembly
#[allow(clippy::too_many_arguments)]
fn finalize(
    domain: &DomainModel,
    weights: SoftWeights,
    status: SolveStatus,
    two_pass_used: bool,
    outcome: PassOutcome,
    start: &Instant,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<SolveResult, SchedulerError> {
    check_cancel(cancel)?;

    let PassOutcome {
        mut entries,
        assignments,
        objective_value,
        num_variables,
        num_constraints,
    } = outcome;
    rooms::assign_rooms(&mut entries, domain)?;
    tick(sink, "rooms", start, objective_value);

    let result = SolveResult {
        status,
        entries,
        assignments,
        objective_value,
        num_variables,
        num_constraints,
        solve_time_ms: start.elapsed().as_millis() as u64,
        config_snapshot: ConfigSnapshot {
            weights,
            limits: domain.limits.clone(),
            two_pass_used,
            generated_at: chrono::Utc::now().to_rfc3339(),
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };

    let report = crate::validator::validate(&result, domain);
    if !report.errors.is_empty() {
        return Err(SchedulerError::Internal(format!(
            "decoded solution fails validation: {}",
            report.errors[0].message
        )));
    }

    sink.on_solution(&result);
    Ok(result)
}

fn map_resolution_error(err: good_lp::ResolutionError, time_limit: u64) -> SchedulerError {
    match err {
        good_lp::ResolutionError::Infeasible => SchedulerError::InfeasibleSolve { hint: None },
        good_lp::ResolutionError::Unbounded => {
            SchedulerError::Internal("solver reported an unbounded model".to_string())
        }
        other => {
            let message = other.to_string();
            if message.to_lowercase().contains("time") {
                SchedulerError::Timeout {
                    seconds: time_limit,
                }
            } else {
                SchedulerError::Internal(message)
            }
        }
    }
}

fn check_cancel(cancel: &CancelToken) -> Result<(), SchedulerError> {
    if cancel.is_cancelled() {
        Err(SchedulerError::Cancelled)
    } else {
        Ok(())
    }
}

fn tick(sink: &dyn ProgressSink, phase: &str, start: &Instant, best: Option<f64>) {
    sink.on_progress(&SolveStats {
        phase: phase.to_string(),
        wall_time_ms: start.elapsed().as_millis() as u64,
        best_objective: best,
        solutions_found: best.map(|_| 1).unwrap_or(0),
    });
}
