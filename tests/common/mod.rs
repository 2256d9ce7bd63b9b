//! Shared fixture builders for the end-to-end scenarios

use std::collections::BTreeMap;
use stundenplan::types::*;

pub fn subject(id: &str) -> Subject {
    Subject {
        id: id.into(),
        name: id.to_string(),
        category: SubjectCategory::Hauptfach,
        room_type: None,
        double_required: false,
        double_preferred: false,
        hauptfach: false,
    }
}

pub fn teacher(id: &str, subjects: &[&str], deputat: u32) -> Teacher {
    Teacher {
        id: id.into(),
        name: id.to_string(),
        subjects: subjects.iter().map(|s| SubjectId::from(*s)).collect(),
        deputat,
        deputat_min: Some(0),
        deputat_max: Some(deputat + 4),
        unavailable: vec![],
        preferred_free_days: vec![],
        max_hours_per_day: None,
        max_gaps_per_day: None,
        max_gaps_per_week: None,
        can_teach_sek2: false,
    }
}

pub fn class(id: &str, grade: u8, hours: &[(&str, u32)]) -> SchoolClass {
    SchoolClass {
        id: id.into(),
        grade,
        curriculum: hours
            .iter()
            .map(|(s, h)| (SubjectId::from(*s), *h))
            .collect::<BTreeMap<_, _>>(),
        max_period: None,
        is_course: false,
        course_type: CourseType::None,
    }
}

pub fn model(
    subjects: Vec<Subject>,
    classes: Vec<SchoolClass>,
    teachers: Vec<Teacher>,
) -> DomainModel {
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
            time_limit_seconds: 30,
            num_workers: 0,
            seed: 42,
            two_pass: None,
        },
    }
}

/// S-MINI: two grade-5 classes, four single-subject teachers
pub fn mini_model() -> DomainModel {
    model(
        vec![
            {
                let mut s = subject("Ma");
                s.hauptfach = true;
                s
            },
            {
                let mut s = subject("De");
                s.hauptfach = true;
                s
            },
        ],
        vec![
            class("5a", 5, &[("Ma", 4), ("De", 4)]),
            class("5b", 5, &[("Ma", 4), ("De", 4)]),
        ],
        vec![
            teacher("MÜL", &["Ma"], 4),
            teacher("SCH", &["Ma"], 4),
            teacher("KLE", &["De"], 4),
            teacher("WAG", &["De"], 4),
        ],
    )
}
