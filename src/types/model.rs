use super::{
    ClassId, Coupling, CourseTrack, Pin, RoomType, RoomTypeId, SchoolClass, SoftWeights,
    SolverLimits, Subject, SubjectId, Teacher, TeacherId, TimeGrid,
};
use crate::error::SchedulerError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The fully populated scheduling problem. Owns every entity by value;
/// cross-references are ids resolved through the lookup helpers.
/// Immutable once handed to the solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainModel {
    pub grid: TimeGrid,
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub rooms: Vec<RoomType>,
    pub classes: Vec<SchoolClass>,
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub couplings: Vec<Coupling>,
    #[serde(default)]
    pub tracks: Vec<CourseTrack>,
    #[serde(default)]
    pub pins: Vec<Pin>,
    #[serde(default)]
    pub weights: SoftWeights,
    #[serde(default)]
    pub limits: SolverLimits,
}

impl DomainModel {
    pub fn subject(&self, id: &SubjectId) -> Option<&Subject> {
        self.subjects.iter().find(|s| &s.id == id)
    }

    pub fn school_class(&self, id: &ClassId) -> Option<&SchoolClass> {
        self.classes.iter().find(|c| &c.id == id)
    }

    pub fn teacher(&self, id: &TeacherId) -> Option<&Teacher> {
        self.teachers.iter().find(|t| &t.id == id)
    }

    pub fn room_type(&self, id: &RoomTypeId) -> Option<&RoomType> {
        self.rooms.iter().find(|r| &r.id == id)
    }

    /// A subject is "coupled" for a class when some coupling involving
    /// the class delivers it through a group; those hours never become
    /// direct lessons.
    pub fn is_coupled(&self, class: &ClassId, subject: &SubjectId) -> bool {
        self.couplings
            .iter()
            .any(|k| k.involves(class) && k.subjects().any(|s| s == subject))
    }

    /// Structural validation of the model; first failure wins.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        self.grid.validate()?;

        check_unique("subject", self.subjects.iter().map(|s| s.id.0.as_str()))?;
        check_unique("room_type", self.rooms.iter().map(|r| r.id.0.as_str()))?;
        check_unique("class", self.classes.iter().map(|c| c.id.0.as_str()))?;
        check_unique("teacher", self.teachers.iter().map(|t| t.id.0.as_str()))?;
        check_unique("coupling", self.couplings.iter().map(|k| k.id.0.as_str()))?;
        check_unique("track", self.tracks.iter().map(|t| t.id.0.as_str()))?;

        for subject in &self.subjects {
            if let Some(room) = &subject.room_type {
                if self.room_type(room).is_none() {
                    return invalid(
                        format!("subject {}", subject.id),
                        format!("unknown room type '{room}'"),
                    );
                }
            }
        }

        for teacher in &self.teachers {
            self.validate_teacher(teacher)?;
        }
        for class in &self.classes {
            self.validate_class(class)?;
        }
        for coupling in &self.couplings {
            self.validate_coupling(coupling)?;
        }
        for track in &self.tracks {
            self.validate_track(track)?;
        }
        self.validate_pins()?;

        Ok(())
    }

    fn validate_teacher(&self, teacher: &Teacher) -> Result<(), SchedulerError> {
        let entity = format!("teacher {}", teacher.id);
        for subject in &teacher.subjects {
            if self.subject(subject).is_none() {
                return invalid(entity, format!("unknown subject '{subject}'"));
            }
        }
        if teacher.deputat_min() > teacher.deputat || teacher.deputat > teacher.deputat_max() {
            return invalid(
                entity,
                format!(
                    "deputat band [{}, {}] does not contain the target {}",
                    teacher.deputat_min(),
                    teacher.deputat_max(),
                    teacher.deputat
                ),
            );
        }
        for slot in &teacher.unavailable {
            if slot.day >= self.grid.days || self.grid.slot_def(slot.period).is_none() {
                return invalid(entity, format!("unavailable slot {slot} is outside the grid"));
            }
        }
        for day in &teacher.preferred_free_days {
            if *day >= self.grid.days {
                return invalid(entity, format!("preferred free day {day} is outside the week"));
            }
        }
        Ok(())
    }

    fn validate_class(&self, class: &SchoolClass) -> Result<(), SchedulerError> {
        let entity = format!("class {}", class.id);
        for subject in class.curriculum.keys() {
            if self.subject(subject).is_none() {
                return invalid(entity, format!("unknown curriculum subject '{subject}'"));
            }
        }
        let max_period = class.max_period(&self.grid);
        let admissible = self
            .grid
            .slots
            .iter()
            .filter(|s| s.period <= max_period && (!s.sek2_only || class.is_course))
            .count() as u32
            * self.grid.days as u32;
        if class.weekly_hours() > admissible {
            return invalid(
                entity,
                format!(
                    "curriculum needs {} hours but only {} slots are admissible",
                    class.weekly_hours(),
                    admissible
                ),
            );
        }
        Ok(())
    }

    fn validate_coupling(&self, coupling: &Coupling) -> Result<(), SchedulerError> {
        let entity = format!("coupling {}", coupling.id);
        if coupling.classes.len() < 2 {
            return invalid(entity, "needs at least two involved classes".to_string());
        }
        if coupling.groups.is_empty() {
            return invalid(entity, "has no groups".to_string());
        }
        if coupling.groups.len() > coupling.classes.len() {
            return invalid(
                entity,
                format!(
                    "{} groups cannot anchor to {} classes",
                    coupling.groups.len(),
                    coupling.classes.len()
                ),
            );
        }
        if coupling.hours_per_week == 0 {
            return invalid(entity, "hours_per_week must be positive".to_string());
        }
        let mut grade = None;
        for class_id in &coupling.classes {
            let Some(class) = self.school_class(class_id) else {
                return invalid(entity, format!("unknown class '{class_id}'"));
            };
            match grade {
                None => grade = Some(class.grade),
                Some(g) if g != class.grade => {
                    return invalid(entity, "involved classes span multiple grades".to_string());
                }
                _ => {}
            }
        }
        for group in &coupling.groups {
            if self.subject(&group.subject).is_none() {
                return invalid(
                    entity,
                    format!("group '{}' names unknown subject '{}'", group.label, group.subject),
                );
            }
            if group.hours != coupling.hours_per_week {
                return invalid(
                    entity,
                    format!(
                        "group '{}' has {} hours, coupling runs {} per week",
                        group.label, group.hours, coupling.hours_per_week
                    ),
                );
            }
        }
        Ok(())
    }

    fn validate_track(&self, track: &CourseTrack) -> Result<(), SchedulerError> {
        let entity = format!("track {}", track.id);
        if track.courses.len() < 2 {
            return invalid(entity, "needs at least two courses".to_string());
        }
        for class_id in &track.courses {
            match self.school_class(class_id) {
                None => return invalid(entity, format!("unknown course '{class_id}'")),
                Some(c) if !c.is_course => {
                    return invalid(entity, format!("'{class_id}' is not a course"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn validate_pins(&self) -> Result<(), SchedulerError> {
        let mut teacher_slots = HashSet::new();
        let mut class_slots = HashSet::new();
        for pin in &self.pins {
            let entity = format!("pin {pin}");
            let Some(teacher) = self.teacher(&pin.teacher) else {
                return invalid(entity, "unknown teacher".to_string());
            };
            let Some(class) = self.school_class(&pin.class) else {
                return invalid(entity, "unknown class".to_string());
            };
            if self.subject(&pin.subject).is_none() {
                return invalid(entity, "unknown subject".to_string());
            }
            if !teacher.qualified_for(&pin.subject) {
                return invalid(entity, "teacher is not qualified".to_string());
            }
            if class.hours_for(&pin.subject) == 0 {
                return invalid(entity, "class has no curriculum hours for the subject".to_string());
            }
            if self.is_coupled(&pin.class, &pin.subject) {
                return invalid(entity, "subject is delivered through a coupling".to_string());
            }
            if pin.slot.day >= self.grid.days || self.grid.slot_def(pin.slot.period).is_none() {
                return invalid(entity, "slot is outside the grid".to_string());
            }
            if pin.slot.period > class.max_period(&self.grid) {
                return invalid(entity, "slot is past the class ceiling".to_string());
            }
            if self.grid.is_sek2_only(pin.slot.period) && !class.is_course {
                return invalid(entity, "slot is reserved for Sek-II courses".to_string());
            }
            if !teacher.is_available(pin.slot) {
                return invalid(entity, "teacher is unavailable at the slot".to_string());
            }
            if !teacher_slots.insert((pin.teacher.clone(), pin.slot)) {
                return invalid(entity, "teacher is pinned twice at the slot".to_string());
            }
            if !class_slots.insert((pin.class.clone(), pin.slot)) {
                return invalid(entity, "class is pinned twice at the slot".to_string());
            }
        }
        Ok(())
    }
}

fn invalid(entity: String, message: String) -> Result<(), SchedulerError> {
    Err(SchedulerError::InvalidInput { entity, message })
}

fn check_unique<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), SchedulerError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(SchedulerError::InvalidInput {
                entity: format!("{kind} {id}"),
                message: "duplicate id".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CourseType, Slot, SubjectCategory};
    use std::collections::BTreeMap;

    fn subject(id: &str) -> Subject {
        Subject {
            id: id.into(),
            name: id.to_string(),
            category: SubjectCategory::Hauptfach,
            room_type: None,
            double_required: false,
            double_preferred: false,
            hauptfach: true,
        }
    }

    fn teacher(id: &str, subjects: &[&str]) -> Teacher {
        Teacher {
            id: id.into(),
            name: id.to_string(),
            subjects: subjects.iter().map(|s| (*s).into()).collect(),
            deputat: 10,
            deputat_min: Some(0),
            deputat_max: Some(28),
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

    fn minimal() -> DomainModel {
        DomainModel {
            grid: TimeGrid::german_default(),
            subjects: vec![subject("Ma"), subject("De")],
            rooms: vec![],
            classes: vec![class("5a", &[("Ma", 4), ("De", 4)])],
            teachers: vec![teacher("MÜL", &["Ma"]), teacher("KLE", &["De"])],
            couplings: vec![],
            tracks: vec![],
            pins: vec![],
            weights: SoftWeights::default(),
            limits: SolverLimits::default(),
        }
    }

    #[test]
    fn test_minimal_model_is_valid() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn test_duplicate_class_id_rejected() {
        let mut model = minimal();
        model.classes.push(class("5a", &[("Ma", 2)]));
        let err = model.validate().unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        assert!(err.to_string().contains("5a"));
    }

    #[test]
    fn test_overfull_curriculum_rejected() {
        let mut model = minimal();
        // Sek-I mask: 6 periods x 5 days = 30 admissible slots
        model.classes[0].curriculum.insert("Ma".into(), 40);
        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("admissible"));
    }

    #[test]
    fn test_pin_on_unavailable_slot_rejected() {
        let mut model = minimal();
        model.teachers[0].unavailable.push(Slot::new(0, 3));
        model.pins.push(Pin {
            teacher: "MÜL".into(),
            class: "5a".into(),
            subject: "Ma".into(),
            slot: Slot::new(0, 3),
        });
        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("unavailable"));
    }

    #[test]
    fn test_coupling_grade_mismatch_rejected() {
        let mut model = minimal();
        model.subjects.push(subject("Eth"));
        model.classes.push(class("5b", &[("Ma", 2)]));
        model.classes.push({
            let mut c = class("6a", &[("Ma", 2)]);
            c.grade = 6;
            c
        });
        model.couplings.push(Coupling {
            id: "reli".into(),
            kind: crate::types::CouplingKind::ReliEthik,
            classes: vec!["5a".into(), "6a".into()],
            groups: vec![crate::types::CouplingGroup {
                label: "Ethik".to_string(),
                subject: "Eth".into(),
                hours: 2,
            }],
            hours_per_week: 2,
        });
        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("grades"));
    }
}
