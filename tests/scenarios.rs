//! End-to-end scenarios: solve real (small) schools and re-check every
//! invariant on the decoded schedules

mod common;

use common::*;
use std::collections::BTreeSet;
use stundenplan::slots::SlotIndex;
use stundenplan::solver::progress::{CancelToken, NullSink};
use stundenplan::solver::{self, ChangedEntities, SolveOptions};
use stundenplan::types::*;
use stundenplan::validator::validate;
use stundenplan::SchedulerError;

fn solve(model: &DomainModel) -> SolveResult {
    solver::solve(model, &NullSink, &CancelToken::new()).expect("solvable scenario")
}

#[test]
fn s_mini_solves_optimally() {
    let model = mini_model();
    let result = solve(&model);

    assert_eq!(result.status, SolveStatus::Optimal);
    assert_eq!(result.entries.len(), 16);
    assert!(result.entries.iter().all(|e| e.coupling.is_none()));

    let report = validate(&result, &model);
    assert!(report.is_valid(), "{:?}", report.errors);

    // every (class, subject) demand met exactly
    for class in ["5a", "5b"] {
        for subject in ["Ma", "De"] {
            let count = result
                .entries
                .iter()
                .filter(|e| e.class.0 == class && e.subject.0 == subject)
                .count();
            assert_eq!(count, 4, "{class}/{subject}");
        }
    }
}

#[test]
fn s_mini_snapshot_round_trips() {
    let model = mini_model();
    let result = solve(&model);

    let json = result.to_json().unwrap();
    let reloaded = SolveResult::from_json(&json).unwrap();
    let report = validate(&reloaded, &model);
    assert!(report.is_valid());
    assert_eq!(reloaded.entries, result.entries);
}

#[test]
fn s_mini_is_deterministic() {
    let model = mini_model();
    let first = solve(&model);
    let second = solve(&model);

    assert_eq!(first.objective_value, second.objective_value);
    assert_eq!(first.entries, second.entries);
}

#[test]
fn s_mini_solves_without_soft_constraints() {
    let mut model = mini_model();
    model.weights = SoftWeights::zeroed();
    let result = solve(&model);
    assert!(validate(&result, &model).is_valid());
    assert_eq!(result.objective_value, Some(0.0));
}

#[test]
fn s_mini_two_pass_forced() {
    let model = mini_model();
    let mut opts = SolveOptions::from_limits(&model.limits);
    opts.two_pass = Some(true);
    let result =
        solver::solve_with(&model, &opts, &NullSink, &CancelToken::new()).unwrap();

    assert_eq!(result.status, SolveStatus::Feasible);
    assert!(result.config_snapshot.two_pass_used);
    assert!(validate(&result, &model).is_valid());
}

#[test]
fn s_double_odd_places_one_double_and_a_far_singleton() {
    let mut physics = subject("Ph");
    physics.double_required = true;
    let model = model(
        vec![physics],
        vec![class("9a", 9, &[("Ph", 3)])],
        vec![teacher("PHY", &["Ph"], 3)],
    );
    let result = solve(&model);
    assert!(validate(&result, &model).is_valid());
    assert_eq!(result.entries.len(), 3);

    let grid = &model.grid;
    let mut double_days = BTreeSet::new();
    let mut single_days = BTreeSet::new();
    for day in 0..grid.days {
        let periods: Vec<u8> = result
            .entries
            .iter()
            .filter(|e| e.slot.day == day)
            .map(|e| e.slot.period)
            .collect();
        match periods.len() {
            0 => {}
            1 => {
                single_days.insert(day);
            }
            2 => {
                let start = *periods.iter().min().unwrap();
                assert!(grid.is_double_start(start), "pair must sit on a double block");
                assert_eq!(periods.iter().max().unwrap() - start, 1);
                double_days.insert(day);
            }
            n => panic!("{n} physics hours on one day"),
        }
    }
    assert_eq!(double_days.len(), 1);
    assert_eq!(single_days.len(), 1);
    assert!(double_days.is_disjoint(&single_days));
}

#[test]
fn s_coupling_blocks_all_classes_and_occupies_group_teachers() {
    let mut model = model(
        vec![subject("Ma"), subject("Ev"), subject("Ka"), subject("Et")],
        vec![
            class("7a", 7, &[("Ma", 2), ("Ev", 2)]),
            class("7b", 7, &[("Ma", 2), ("Ev", 2)]),
            class("7c", 7, &[("Ma", 2), ("Ev", 2)]),
        ],
        vec![
            teacher("MAT", &["Ma"], 6),
            teacher("EVT", &["Ev"], 2),
            teacher("KAT", &["Ka"], 2),
            teacher("ETT", &["Et"], 2),
        ],
    );
    model.couplings = vec![Coupling {
        id: "reli-7".into(),
        kind: CouplingKind::ReliEthik,
        classes: vec!["7a".into(), "7b".into(), "7c".into()],
        groups: vec![
            CouplingGroup {
                label: "Ev. Religion".to_string(),
                subject: "Ev".into(),
                hours: 2,
            },
            CouplingGroup {
                label: "Kath. Religion".to_string(),
                subject: "Ka".into(),
                hours: 2,
            },
            CouplingGroup {
                label: "Ethik".to_string(),
                subject: "Et".into(),
                hours: 2,
            },
        ],
        hours_per_week: 2,
    }];

    let result = solve(&model);
    let report = validate(&result, &model);
    assert!(report.is_valid(), "{:?}", report.errors);

    let coupling_entries: Vec<_> = result
        .entries
        .iter()
        .filter(|e| e.coupling.is_some())
        .collect();
    // 2 hours x 3 groups
    assert_eq!(coupling_entries.len(), 6);

    let slots: BTreeSet<Slot> = coupling_entries.iter().map(|e| e.slot).collect();
    assert_eq!(slots.len(), 2);

    for &slot in &slots {
        // every group present, three distinct teachers busy
        let teachers: BTreeSet<&str> = coupling_entries
            .iter()
            .filter(|e| e.slot == slot)
            .map(|e| e.teacher.0.as_str())
            .collect();
        assert_eq!(teachers.len(), 3);

        // no involved class has a direct lesson at the coupling slot
        for class in ["7a", "7b", "7c"] {
            assert!(
                !result
                    .entries
                    .iter()
                    .any(|e| e.coupling.is_none() && e.class.0 == class && e.slot == slot),
                "{class} must be blocked at {slot}"
            );
        }
    }
}

#[test]
fn s_pin_fixes_the_lesson() {
    let mut model = mini_model();
    model.pins = vec![Pin {
        teacher: "MÜL".into(),
        class: "5a".into(),
        subject: "Ma".into(),
        slot: Slot::new(0, 3),
    }];

    let result = solve(&model);
    assert!(validate(&result, &model).is_valid());
    assert!(
        result.entries.iter().any(|e| e.teacher.0 == "MÜL"
            && e.class.0 == "5a"
            && e.subject.0 == "Ma"
            && e.slot == Slot::new(0, 3)),
        "pinned lesson must appear in the result"
    );
}

#[test]
fn s_oberstufe_track_runs_in_lockstep() {
    let mut mathe = subject("Ma");
    mathe.hauptfach = true;
    let mut englisch = subject("En");
    englisch.hauptfach = true;

    let mut lk_m = class("12-LK-M", 12, &[("Ma", 4)]);
    lk_m.is_course = true;
    lk_m.course_type = CourseType::Lk;
    let mut lk_e = class("12-LK-E", 12, &[("En", 4)]);
    lk_e.is_course = true;
    lk_e.course_type = CourseType::Lk;

    let mut obm = teacher("OBM", &["Ma"], 4);
    obm.can_teach_sek2 = true;
    let mut obe = teacher("OBE", &["En"], 4);
    obe.can_teach_sek2 = true;

    let mut model = model(vec![mathe, englisch], vec![lk_m, lk_e], vec![obm, obe]);
    model.tracks = vec![CourseTrack {
        id: "schiene-1".into(),
        courses: vec!["12-LK-M".into(), "12-LK-E".into()],
        hours_per_week: 4,
    }];

    let result = solve(&model);
    let report = validate(&result, &model);
    assert!(report.is_valid(), "{:?}", report.errors);

    let slots_m: BTreeSet<Slot> = result
        .entries
        .iter()
        .filter(|e| e.class.0 == "12-LK-M")
        .map(|e| e.slot)
        .collect();
    let slots_e: BTreeSet<Slot> = result
        .entries
        .iter()
        .filter(|e| e.class.0 == "12-LK-E")
        .map(|e| e.slot)
        .collect();
    assert_eq!(slots_m, slots_e);
    assert_eq!(slots_m.len(), 4);
}

#[test]
fn s_infeasible_relaxer_names_deputat() {
    // two teachers whose deputat floors cannot be reached from a 4-hour
    // curriculum: the audit passes, the solve is infeasible, and only
    // widening the deputat band helps
    let mut model = model(
        vec![subject("Ma")],
        vec![class("5a", 5, &[("Ma", 4)])],
        vec![teacher("ALT", &["Ma"], 10), teacher("NEU", &["Ma"], 10)],
    );
    for teacher in &mut model.teachers {
        teacher.deputat_min = Some(8);
        teacher.deputat_max = Some(12);
    }

    assert!(stundenplan::audit::audit(&model).feasible());

    let err = solver::solve(&model, &NullSink, &CancelToken::new()).unwrap_err();
    assert_eq!(err.kind(), "infeasible_solve");

    let opts = SolveOptions::from_limits(&model.limits);
    let report = solver::diagnose(&model, &opts, &CancelToken::new()).unwrap();
    assert_eq!(report.culprit, Some("deputat"));
    assert!(report.hint().unwrap().contains("deputat"));
}

#[test]
fn incremental_resolve_keeps_unchanged_placements() {
    let model = mini_model();
    let first = solve(&model);

    let result = solver::resolve_incremental(
        &model,
        &first,
        &ChangedEntities::default(),
        &NullSink,
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(result.status, SolveStatus::Feasible);
    assert!(validate(&result, &model).is_valid());
    assert_eq!(result.entries, first.entries);
}

#[test]
fn cancellation_is_honoured() {
    let model = mini_model();
    let token = CancelToken::new();
    token.cancel();
    let err = solver::solve(&model, &NullSink, &token).unwrap_err();
    assert!(matches!(err, SchedulerError::Cancelled));
}

#[test]
fn sek1_classes_keep_the_prefix_invariant() {
    let model = mini_model();
    let result = solve(&model);
    let index = SlotIndex::new(&model.grid);

    for class in &model.classes {
        let periods = index.class_periods(class);
        for day in 0..model.grid.days {
            let active: BTreeSet<u8> = result
                .entries
                .iter()
                .filter(|e| e.class == class.id && e.slot.day == day)
                .map(|e| e.slot.period)
                .collect();
            if active.is_empty() {
                continue;
            }
            let highest = periods.iter().position(|p| Some(p) == active.iter().max()).unwrap();
            assert_eq!(
                highest + 1,
                active.len(),
                "class {} day {day} must fill a prefix",
                class.id
            );
        }
    }
}
