use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use stundenplan::parser::{apply_config, load_config_or_default, load_model, load_result};
use stundenplan::reporter::{generate_json_summary, print_summary, render_class_week, write_snapshot};
use stundenplan::solver::progress::{CancelToken, NullSink, ProgressSink, SolveStats};
use stundenplan::solver::{self, ChangedEntities, SolveOptions};
use stundenplan::types::{
    CourseType, DomainModel, SchoolClass, SoftWeights, SolverLimits, Subject, SubjectCategory,
    SubjectId, Teacher, TimeGrid,
};
use stundenplan::validator::validate;
use stundenplan::SchedulerError;

#[derive(Parser)]
#[command(name = "stundenplan")]
#[command(about = "Constraint-based weekly timetable generator for German secondary schools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a timetable from a domain model
    Solve {
        /// Domain model JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Optional solver config TOML (weights, limits)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory for the schedule snapshot
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Override the wall-clock limit in seconds
        #[arg(long, value_name = "N")]
        time_limit: Option<u64>,

        /// Zero all soft-constraint weights (pure feasibility)
        #[arg(long)]
        no_soft: bool,

        /// Force the two-pass strategy on
        #[arg(long, conflicts_with = "no_two_pass")]
        two_pass: bool,

        /// Force the two-pass strategy off
        #[arg(long)]
        no_two_pass: bool,

        /// Re-solve incrementally against a previous snapshot
        #[arg(long, requires = "previous")]
        incremental: bool,

        /// Previous snapshot for --incremental
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Changed entities for --incremental (e.g. teacher:MÜL,class:5a)
        #[arg(long)]
        changed: Vec<String>,

        /// Per-weight overrides, e.g. gaps=5,compact=0
        #[arg(long, value_name = "k=v[,k=v]")]
        weights: Option<String>,

        /// On infeasibility, strip constraint families to find the culprit
        #[arg(long)]
        diagnose: bool,

        /// Solver seed override
        #[arg(long)]
        seed: Option<i32>,

        /// Suppress progress output, print a JSON summary only
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run the static feasibility audit only
    Audit {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Re-validate an existing schedule snapshot
    Validate {
        #[arg(short, long)]
        schedule: PathBuf,

        #[arg(short, long)]
        input: PathBuf,

        /// Also print the week table of this class
        #[arg(long)]
        class: Option<String>,
    },

    /// Solve a small built-in example school
    Demo {
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{} {err:#}", "error:".red().bold());
        let code = err
            .downcast_ref::<SchedulerError>()
            .map(SchedulerError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Solve {
            input,
            config,
            output,
            time_limit,
            no_soft,
            two_pass,
            no_two_pass,
            incremental,
            previous,
            changed,
            weights,
            diagnose,
            seed,
            quiet,
        } => {
            let mut model = load_model(&input)?;
            if let Some(config_path) = &config {
                apply_config(&mut model, load_config_or_default(config_path));
            }
            if let Some(spec) = &weights {
                parse_weights(spec, &mut model.weights)?;
            }

            let mut opts = SolveOptions::from_limits(&model.limits);
            if let Some(limit) = time_limit {
                opts.time_limit = limit.max(1);
            }
            if let Some(seed) = seed {
                opts.seed = seed;
            }
            if two_pass {
                opts.two_pass = Some(true);
            } else if no_two_pass {
                opts.two_pass = Some(false);
            }
            opts.no_soft = no_soft;

            run_solve(
                &model,
                &opts,
                &output,
                incremental.then_some(previous).flatten(),
                &changed,
                diagnose,
                quiet,
            )
        }
        Commands::Audit { input } => run_audit(&input),
        Commands::Validate {
            schedule,
            input,
            class,
        } => run_validate(&schedule, &input, class),
        Commands::Demo { output } => {
            let model = demo_model();
            let opts = SolveOptions::from_limits(&model.limits);
            run_solve(&model, &opts, &output, None, &[], false, false)
        }
    }
}

fn run_solve(
    model: &DomainModel,
    opts: &SolveOptions,
    output: &Path,
    previous: Option<PathBuf>,
    changed: &[String],
    diagnose: bool,
    quiet: bool,
) -> Result<()> {
    let cancel = CancelToken::new();
    let bar_sink = BarSink::new();
    let sink: &dyn ProgressSink = if quiet { &NullSink } else { &bar_sink };

    let solved = match &previous {
        Some(snapshot_path) => {
            let snapshot = load_result(snapshot_path)?;
            let changed = parse_changed(changed)?;
            solver::resolve_incremental(model, &snapshot, &changed, sink, &cancel)
        }
        None => solver::solve_with(model, opts, sink, &cancel),
    };
    bar_sink.bar.finish_and_clear();

    let result = match solved {
        Ok(result) => result,
        Err(SchedulerError::InfeasibleSolve { hint }) if diagnose => {
            let report = solver::diagnose(model, opts, &cancel)?;
            if !quiet {
                println!("{}", "Relaxation diagnosis:".bold());
                for attempt in &report.attempts {
                    println!("  without {:<12} -> {:?}", attempt.family, attempt.status);
                }
            }
            return Err(SchedulerError::InfeasibleSolve {
                hint: report.hint().or(hint),
            }
            .into());
        }
        Err(other) => return Err(other.into()),
    };

    let report = validate(&result, model);
    write_snapshot(&result, output)?;

    if quiet {
        println!("{}", generate_json_summary(&result)?);
    } else {
        print_summary(&result, &report);
        println!(
            "Snapshot written to {}",
            output.join("schedule.json").display().to_string().green()
        );
    }
    Ok(())
}

fn run_audit(input: &Path) -> Result<()> {
    let model = load_model(input)?;
    let report = stundenplan::audit::audit(&model);

    for warning in &report.warnings {
        println!("{} {warning}", "warning:".yellow());
    }
    if report.feasible() {
        println!("{}", "audit passed".green().bold());
        Ok(())
    } else {
        for error in &report.errors {
            println!("{} {error}", "error:".red());
        }
        Err(SchedulerError::InfeasibleStatic {
            errors: report.errors,
        }
        .into())
    }
}

fn run_validate(schedule: &Path, input: &Path, class: Option<String>) -> Result<()> {
    let model = load_model(input)?;
    let result = load_result(schedule)?;
    let report = validate(&result, &model);

    if let Some(class_id) = class {
        let class_id = stundenplan::types::ClassId(class_id);
        println!("{}", render_class_week(&result, &model, &class_id));
    }

    if report.is_valid() {
        println!("{}", "✓ schedule is valid".green().bold());
        for warning in &report.warnings {
            println!("  {} {}", "warning:".yellow(), warning.message);
        }
        Ok(())
    } else {
        println!("{}", "✗ schedule has violations".red().bold());
        for violation in &report.errors {
            println!("  {} {}", violation.constraint.red(), violation.message);
        }
        Err(SchedulerError::Internal(format!(
            "{} validation errors",
            report.errors.len()
        ))
        .into())
    }
}

/// `k=v[,k=v]` weight overrides
fn parse_weights(spec: &str, weights: &mut SoftWeights) -> Result<()> {
    for pair in spec.split(',').filter(|p| !p.trim().is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(SchedulerError::InvalidInput {
                entity: "--weights".to_string(),
                message: format!("'{pair}' is not k=v"),
            }
            .into());
        };
        let value: f64 = value.trim().parse().map_err(|_| SchedulerError::InvalidInput {
            entity: "--weights".to_string(),
            message: format!("'{value}' is not a number"),
        })?;
        if !weights.set(key.trim(), value) {
            return Err(SchedulerError::InvalidInput {
                entity: "--weights".to_string(),
                message: format!("unknown weight '{key}'"),
            }
            .into());
        }
    }
    Ok(())
}

/// `kind:id` changed-entity specs for --incremental
fn parse_changed(specs: &[String]) -> Result<ChangedEntities> {
    let mut changed = ChangedEntities::default();
    for spec in specs.iter().flat_map(|s| s.split(',')) {
        let Some((kind, id)) = spec.split_once(':') else {
            return Err(SchedulerError::InvalidInput {
                entity: "--changed".to_string(),
                message: format!("'{spec}' is not kind:id"),
            }
            .into());
        };
        match kind.trim() {
            "teacher" => {
                changed.teachers.insert(id.trim().into());
            }
            "class" => {
                changed.classes.insert(id.trim().into());
            }
            "subject" => {
                changed.subjects.insert(id.trim().into());
            }
            other => {
                return Err(SchedulerError::InvalidInput {
                    entity: "--changed".to_string(),
                    message: format!("unknown entity kind '{other}'"),
                }
                .into());
            }
        }
    }
    Ok(changed)
}

struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap(),
        );
        BarSink { bar }
    }
}

impl ProgressSink for BarSink {
    fn on_progress(&self, stats: &SolveStats) {
        match stats.best_objective {
            Some(objective) => self
                .bar
                .set_message(format!("{} (objective {objective:.1})", stats.phase)),
            None => self.bar.set_message(stats.phase.clone()),
        }
        self.bar.tick();
    }
}

/// Two grade-5 classes, five teachers, one sports hall
fn demo_model() -> DomainModel {
    let subject = |id: &str, category, hauptfach| Subject {
        id: id.into(),
        name: id.to_string(),
        category,
        room_type: None,
        double_required: false,
        double_preferred: false,
        hauptfach,
    };
    let teacher = |id: &str, subjects: &[&str], deputat: u32| Teacher {
        id: id.into(),
        name: id.to_string(),
        subjects: subjects.iter().map(|s| SubjectId::from(*s)).collect(),
        deputat,
        deputat_min: Some(0),
        deputat_max: Some(deputat + 2),
        unavailable: vec![],
        preferred_free_days: vec![],
        max_hours_per_day: Some(6),
        max_gaps_per_day: None,
        max_gaps_per_week: None,
        can_teach_sek2: false,
    };
    let class = |id: &str, hours: &[(&str, u32)]| SchoolClass {
        id: id.into(),
        grade: 5,
        curriculum: hours
            .iter()
            .map(|(s, h)| (SubjectId::from(*s), *h))
            .collect::<BTreeMap<_, _>>(),
        max_period: None,
        is_course: false,
        course_type: CourseType::None,
    };

    let mut sport = subject("Sp", SubjectCategory::Sport, false);
    sport.double_required = true;
    sport.room_type = Some("sport".into());
    let mut kunst = subject("Ku", SubjectCategory::Musisch, false);
    kunst.double_preferred = true;

    let mut wagner = teacher("WAG", &["Sp"], 4);
    wagner.preferred_free_days = vec![4];

    DomainModel {
        grid: TimeGrid::german_default(),
        subjects: vec![
            subject("Ma", SubjectCategory::Hauptfach, true),
            subject("De", SubjectCategory::Hauptfach, true),
            subject("En", SubjectCategory::Sprache, true),
            sport,
            kunst,
        ],
        rooms: vec![stundenplan::types::RoomType {
            id: "sport".into(),
            name: "Sporthalle".to_string(),
            capacity: 1,
        }],
        classes: vec![
            class("5a", &[("Ma", 4), ("De", 4), ("En", 4), ("Sp", 2), ("Ku", 2)]),
            class("5b", &[("Ma", 4), ("De", 4), ("En", 4), ("Sp", 2), ("Ku", 2)]),
        ],
        teachers: vec![
            teacher("MÜL", &["Ma"], 8),
            teacher("SCH", &["De"], 8),
            teacher("WEB", &["En"], 8),
            wagner,
            teacher("KLE", &["Ku"], 4),
        ],
        couplings: vec![],
        tracks: vec![],
        pins: vec![],
        weights: SoftWeights::default(),
        limits: SolverLimits {
            time_limit_seconds: 60,
            ..SolverLimits::default()
        },
    }
}
