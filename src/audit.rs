use crate::slots::SlotIndex;
use crate::types::{DomainModel, SubjectId, Teacher};
use std::collections::BTreeMap;

/// Result of the pre-solve resource audit
#[derive(Debug, Default, Clone)]
pub struct AuditReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl AuditReport {
    pub fn feasible(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

/// Static resource checks before any solve. Everything here is cheap
/// aggregation; a failing clause means no model build can succeed.
pub fn audit(model: &DomainModel) -> AuditReport {
    let mut report = AuditReport::default();
    let index = SlotIndex::new(&model.grid);
    let teachers_by_subject = teachers_by_subject(&model.teachers);

    check_qualification_coverage(model, &teachers_by_subject, &mut report);
    check_subject_capacity(model, &teachers_by_subject, &mut report);
    check_room_capacity(model, &index, &mut report);
    check_teacher_floors(model, &index, &mut report);
    check_aggregate_deputat(model, &mut report);
    check_sek2_capability(model, &teachers_by_subject, &mut report);
    check_double_singletons(model, &mut report);
    check_track_hours(model, &mut report);
    check_coupling_curricula(model, &mut report);

    report
}

fn teachers_by_subject(teachers: &[Teacher]) -> BTreeMap<&SubjectId, Vec<&Teacher>> {
    let mut map: BTreeMap<&SubjectId, Vec<&Teacher>> = BTreeMap::new();
    for teacher in teachers {
        for subject in &teacher.subjects {
            map.entry(subject).or_default().push(teacher);
        }
    }
    map
}

/// Every demanded (class, subject) pair needs at least one qualified
/// teacher; coupling groups likewise.
fn check_qualification_coverage(
    model: &DomainModel,
    by_subject: &BTreeMap<&SubjectId, Vec<&Teacher>>,
    report: &mut AuditReport,
) {
    for class in &model.classes {
        for (subject, &hours) in &class.curriculum {
            if hours == 0 || model.is_coupled(&class.id, subject) {
                continue;
            }
            if !by_subject.contains_key(subject) {
                report.error(format!(
                    "class {} needs {subject} but no teacher is qualified",
                    class.id
                ));
            }
        }
    }
    for coupling in &model.couplings {
        for group in &coupling.groups {
            if !by_subject.contains_key(&group.subject) {
                report.error(format!(
                    "coupling {} group '{}' needs {} but no teacher is qualified",
                    coupling.id, group.label, group.subject
                ));
            }
        }
    }
}

/// Weekly demand per subject against the summed deputat of its
/// qualified teachers, with a warning band at 95 %.
fn check_subject_capacity(
    model: &DomainModel,
    by_subject: &BTreeMap<&SubjectId, Vec<&Teacher>>,
    report: &mut AuditReport,
) {
    let mut demand: BTreeMap<&SubjectId, u32> = BTreeMap::new();
    for class in &model.classes {
        for (subject, &hours) in &class.curriculum {
            if hours > 0 && !model.is_coupled(&class.id, subject) {
                *demand.entry(subject).or_default() += hours;
            }
        }
    }
    for coupling in &model.couplings {
        for group in &coupling.groups {
            *demand.entry(&group.subject).or_default() += group.hours;
        }
    }

    for (subject, needed) in demand {
        let supply: u32 = by_subject
            .get(subject)
            .map(|ts| ts.iter().map(|t| t.deputat).sum())
            .unwrap_or(0);
        if needed > supply {
            report.error(format!(
                "subject {subject}: demand {needed}h exceeds qualified supply {supply}h"
            ));
        } else if supply > 0 && needed * 100 >= supply * 95 {
            report.warning(format!(
                "subject {subject}: demand {needed}h uses over 95% of the qualified supply {supply}h"
            ));
        }
    }
}

/// Room-type hour demand against `capacity * |S|`
fn check_room_capacity(model: &DomainModel, index: &SlotIndex, report: &mut AuditReport) {
    for room in &model.rooms {
        let mut needed: u32 = 0;
        for class in &model.classes {
            for (subject_id, &hours) in &class.curriculum {
                if model.is_coupled(&class.id, subject_id) {
                    continue;
                }
                if let Some(subject) = model.subject(subject_id) {
                    if subject.room_type.as_ref() == Some(&room.id) {
                        needed += hours;
                    }
                }
            }
        }
        for coupling in &model.couplings {
            for group in &coupling.groups {
                if let Some(subject) = model.subject(&group.subject) {
                    if subject.room_type.as_ref() == Some(&room.id) {
                        needed += group.hours;
                    }
                }
            }
        }
        let available = room.capacity * index.len() as u32;
        if needed > available {
            report.error(format!(
                "room type {}: {needed} lesson-hours need rooms but only {available} room-slots exist",
                room.id
            ));
        }
    }
}

/// A teacher must have at least `deputat_min` available slots
fn check_teacher_floors(model: &DomainModel, index: &SlotIndex, report: &mut AuditReport) {
    for teacher in &model.teachers {
        let periods = index.teacher_periods(teacher.can_teach_sek2);
        let total = periods.len() * index.days() as usize;
        let blocked = teacher
            .unavailable
            .iter()
            .filter(|s| periods.contains(&s.period))
            .count();
        let free = total.saturating_sub(blocked);
        if (free as u32) < teacher.deputat_min() {
            report.error(format!(
                "teacher {}: only {free} available slots for a deputat floor of {}",
                teacher.id,
                teacher.deputat_min()
            ));
        }
    }
}

/// Total deputat must cover the total curricular demand
fn check_aggregate_deputat(model: &DomainModel, report: &mut AuditReport) {
    let mut demand: u32 = 0;
    for class in &model.classes {
        for (subject, &hours) in &class.curriculum {
            if !model.is_coupled(&class.id, subject) {
                demand += hours;
            }
        }
    }
    for coupling in &model.couplings {
        demand += coupling.groups.len() as u32 * coupling.hours_per_week;
    }
    let supply: u32 = model.teachers.iter().map(|t| t.deputat).sum();
    if supply < demand {
        report.error(format!(
            "aggregate deputat {supply}h cannot cover the {demand}h curriculum"
        ));
    }
}

/// Every subject taught in a course needs a Sek-II-capable teacher
fn check_sek2_capability(
    model: &DomainModel,
    by_subject: &BTreeMap<&SubjectId, Vec<&Teacher>>,
    report: &mut AuditReport,
) {
    for class in model.classes.iter().filter(|c| c.is_course) {
        for (subject, &hours) in &class.curriculum {
            if hours == 0 || model.is_coupled(&class.id, subject) {
                continue;
            }
            let capable = by_subject
                .get(subject)
                .map(|ts| ts.iter().any(|t| t.can_teach_sek2))
                .unwrap_or(false);
            if !capable {
                report.error(format!(
                    "course {} needs {subject} but no Sek-II-capable teacher is qualified",
                    class.id
                ));
            }
        }
    }
}

/// `double_required` with a single weekly hour makes the double-count
/// rule vacuous; worth a warning, not an error
fn check_double_singletons(model: &DomainModel, report: &mut AuditReport) {
    for class in &model.classes {
        for (subject_id, &hours) in &class.curriculum {
            if hours != 1 {
                continue;
            }
            if let Some(subject) = model.subject(subject_id) {
                if subject.double_required {
                    report.warning(format!(
                        "class {} has a single {subject_id} hour; the double-lesson rule is vacuous",
                        class.id
                    ));
                }
            }
        }
    }
}

/// Track members must dedicate exactly the track hours
fn check_track_hours(model: &DomainModel, report: &mut AuditReport) {
    for track in &model.tracks {
        for class_id in &track.courses {
            if let Some(class) = model.school_class(class_id) {
                if class.weekly_hours() != track.hours_per_week {
                    report.error(format!(
                        "track {}: course {class_id} schedules {}h, track runs {}h",
                        track.id,
                        class.weekly_hours(),
                        track.hours_per_week
                    ));
                }
            }
        }
    }
}

/// Curriculum hours of coupled subjects should match the coupling
fn check_coupling_curricula(model: &DomainModel, report: &mut AuditReport) {
    for coupling in &model.couplings {
        for class_id in &coupling.classes {
            let Some(class) = model.school_class(class_id) else {
                continue;
            };
            for group in &coupling.groups {
                let hours = class.hours_for(&group.subject);
                if hours != 0 && hours != coupling.hours_per_week {
                    report.warning(format!(
                        "class {class_id} lists {}h of {} but coupling {} delivers {}h",
                        hours, group.subject, coupling.id, coupling.hours_per_week
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use std::collections::BTreeMap;

    fn subject(id: &str, double_required: bool) -> Subject {
        Subject {
            id: id.into(),
            name: id.to_string(),
            category: SubjectCategory::Nw,
            room_type: None,
            double_required,
            double_preferred: false,
            hauptfach: false,
        }
    }

    fn teacher(id: &str, subjects: &[&str], deputat: u32) -> Teacher {
        Teacher {
            id: id.into(),
            name: id.to_string(),
            subjects: subjects.iter().map(|s| (*s).into()).collect(),
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

    fn class(id: &str, hours: &[(&str, u32)]) -> SchoolClass {
        SchoolClass {
            id: id.into(),
            grade: 5,
            curriculum: hours.iter().map(|(s, h)| ((*s).into(), *h)).collect::<BTreeMap<_, _>>(),
            max_period: None,
            is_course: false,
            course_type: CourseType::None,
        }
    }

    fn model() -> DomainModel {
        DomainModel {
            grid: TimeGrid::german_default(),
            subjects: vec![subject("Ma", false), subject("Ch", false)],
            rooms: vec![],
            classes: vec![class("5a", &[("Ma", 4)])],
            teachers: vec![teacher("MÜL", &["Ma"], 10)],
            couplings: vec![],
            tracks: vec![],
            pins: vec![],
            weights: SoftWeights::default(),
            limits: SolverLimits::default(),
        }
    }

    #[test]
    fn test_feasible_model_passes() {
        let report = audit(&model());
        assert!(report.feasible(), "{:?}", report.errors);
    }

    #[test]
    fn test_missing_qualification_fails() {
        let mut m = model();
        m.classes[0].curriculum.insert("Ch".into(), 2);
        let report = audit(&m);
        assert!(!report.feasible());
        assert!(report.errors[0].contains("Ch"));
    }

    #[test]
    fn test_subject_capacity_warning_band() {
        let mut m = model();
        m.teachers[0].deputat = 4; // demand 4 of supply 4 -> >= 95%
        let report = audit(&m);
        assert!(report.feasible());
        assert!(report.warnings.iter().any(|w| w.contains("95%")));
    }

    #[test]
    fn test_aggregate_deputat_floor() {
        let mut m = model();
        m.classes[0].curriculum.insert("Ma".into(), 20);
        m.teachers[0].deputat = 10;
        let report = audit(&m);
        assert!(report.errors.iter().any(|e| e.contains("aggregate")
            || e.contains("demand 20h exceeds")));
    }

    #[test]
    fn test_vacuous_double_warns() {
        let mut m = model();
        m.subjects.push(subject("Ph", true));
        m.teachers[0].subjects.push("Ph".into());
        m.classes[0].curriculum.insert("Ph".into(), 1);
        let report = audit(&m);
        assert!(report.feasible());
        assert!(report.warnings.iter().any(|w| w.contains("vacuous")));
    }

    #[test]
    fn test_sek2_capability_checked() {
        let mut m = model();
        m.classes[0].is_course = true;
        m.classes[0].grade = 12;
        let report = audit(&m);
        assert!(report.errors.iter().any(|e| e.contains("Sek-II")));
    }
}
