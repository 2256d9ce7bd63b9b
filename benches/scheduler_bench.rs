use criterion::{criterion_group, criterion_main, Criterion};
use std::collections::BTreeMap;
use stundenplan::audit::audit;
use stundenplan::slots::SlotIndex;
use stundenplan::solver::progress::{CancelToken, NullSink};
use stundenplan::types::*;

/// A Sek-I-shaped school: two parallel classes per grade 5-10, one
/// teacher pool per subject
fn sek1_model() -> DomainModel {
    let subject_defs = [
        ("De", true),
        ("Ma", true),
        ("En", true),
        ("Bio", false),
        ("Ge", false),
        ("Sp", false),
    ];
    let subjects: Vec<Subject> = subject_defs
        .iter()
        .map(|(id, hauptfach)| Subject {
            id: (*id).into(),
            name: id.to_string(),
            category: if *hauptfach {
                SubjectCategory::Hauptfach
            } else {
                SubjectCategory::Gesellschaft
            },
            room_type: None,
            double_required: false,
            double_preferred: false,
            hauptfach: *hauptfach,
        })
        .collect();

    let mut classes = Vec::new();
    for grade in 5..=10u8 {
        for parallel in ["a", "b"] {
            classes.push(SchoolClass {
                id: format!("{grade}{parallel}").as_str().into(),
                grade,
                curriculum: subject_defs
                    .iter()
                    .map(|(id, hauptfach)| ((*id).into(), if *hauptfach { 4 } else { 2 }))
                    .collect::<BTreeMap<SubjectId, u32>>(),
                max_period: None,
                is_course: false,
                course_type: CourseType::None,
            });
        }
    }

    let mut teachers = Vec::new();
    for (id, _) in &subject_defs {
        for k in 0..5 {
            teachers.push(Teacher {
                id: format!("{id}{k}").as_str().into(),
                name: format!("{id}{k}"),
                subjects: vec![(*id).into()],
                deputat: 12,
                deputat_min: Some(0),
                deputat_max: Some(24),
                unavailable: vec![],
                preferred_free_days: vec![],
                max_hours_per_day: None,
                max_gaps_per_day: None,
                max_gaps_per_week: None,
                can_teach_sek2: false,
            });
        }
    }

    DomainModel {
        grid: TimeGrid::german_default(),
        subjects,
        rooms: vec![],
        classes,
        teachers,
        couplings: vec![],
        tracks: vec![],
        pins: vec![],
        weights: SoftWeights::default(),
        limits: SolverLimits {
            time_limit_seconds: 20,
            ..SolverLimits::default()
        },
    }
}

fn mini_model() -> DomainModel {
    let mut model = sek1_model();
    model.classes.truncate(2);
    model.teachers.retain(|t| t.id.0.ends_with('0'));
    for teacher in &mut model.teachers {
        teacher.deputat = 16;
    }
    model
}

fn bench_audit(c: &mut Criterion) {
    let model = sek1_model();
    c.bench_function("audit_sek1", |b| b.iter(|| audit(&model)));
}

fn bench_slot_index(c: &mut Criterion) {
    let grid = TimeGrid::german_default();
    c.bench_function("slot_index", |b| b.iter(|| SlotIndex::new(&grid)));
}

fn bench_mini_solve(c: &mut Criterion) {
    let model = mini_model();
    let mut group = c.benchmark_group("solve");
    group.sample_size(10);
    group.bench_function("mini_school", |b| {
        b.iter(|| {
            stundenplan::solver::solve(&model, &NullSink, &CancelToken::new()).unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_audit, bench_slot_index, bench_mini_solve);
criterion_main!(benches);
