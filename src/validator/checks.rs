use crate::slots::SlotIndex;
use crate::types::{ClassId, DomainModel, ScheduleEntry, Slot, SolveResult, SubjectId, TeacherId};
use crate::validator::Violation;
use std::collections::{BTreeMap, BTreeSet};

/// Only admissible slots: grid bounds, class ceiling, Sek-II periods,
/// teacher availability and qualification
pub fn check_admissible_slots(result: &SolveResult, model: &DomainModel) -> Vec<Violation> {
    let mut violations = Vec::new();
    for entry in &result.entries {
        let slot = entry.slot;
        if slot.day >= model.grid.days || model.grid.slot_def(slot.period).is_none() {
            violations.push(Violation::new(
                "AdmissibleSlot",
                format!("entry at {slot} is outside the grid"),
            ));
            continue;
        }
        let Some(class) = model.school_class(&entry.class) else {
            violations.push(Violation::new(
                "AdmissibleSlot",
                format!("entry references unknown class '{}'", entry.class),
            ));
            continue;
        };
        if slot.period > class.max_period(&model.grid) {
            violations.push(Violation::new(
                "AdmissibleSlot",
                format!("class {} is scheduled past its ceiling at {slot}", class.id),
            ));
        }
        if model.grid.is_sek2_only(slot.period) && !class.is_course {
            violations.push(Violation::new(
                "AdmissibleSlot",
                format!("class {} uses the Sek-II-only period {slot}", class.id),
            ));
        }
        let Some(teacher) = model.teacher(&entry.teacher) else {
            violations.push(Violation::new(
                "AdmissibleSlot",
                format!("entry references unknown teacher '{}'", entry.teacher),
            ));
            continue;
        };
        if !teacher.is_available(slot) {
            violations.push(Violation::new(
                "TeacherAvailability",
                format!("teacher {} is unavailable at {slot}", teacher.id),
            ));
        }
        if !teacher.qualified_for(&entry.subject) {
            violations.push(Violation::new(
                "TeacherQualified",
                format!("teacher {} is not qualified for {}", teacher.id, entry.subject),
            ));
        }
        if class.is_course && !teacher.can_teach_sek2 {
            violations.push(Violation::new(
                "TeacherQualified",
                format!("teacher {} teaches course {} without Sek-II capability", teacher.id, class.id),
            ));
        }
    }
    violations
}

/// Every non-coupled (class, subject) demand is met exactly
pub fn check_curriculum(result: &SolveResult, model: &DomainModel) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut counts: BTreeMap<(&ClassId, &SubjectId), u32> = BTreeMap::new();
    for entry in result.entries.iter().filter(|e| e.coupling.is_none()) {
        *counts.entry((&entry.class, &entry.subject)).or_default() += 1;
    }

    for class in &model.classes {
        for (subject, &hours) in &class.curriculum {
            if model.is_coupled(&class.id, subject) {
                continue;
            }
            let scheduled = counts.remove(&(&class.id, subject)).unwrap_or(0);
            if scheduled != hours {
                violations.push(Violation::new(
                    "CurriculumMet",
                    format!("class {} has {scheduled}/{hours} hours of {subject}", class.id),
                ));
            }
        }
    }
    for ((class, subject), scheduled) in counts {
        violations.push(Violation::new(
            "CurriculumMet",
            format!("class {class} has {scheduled} undemanded hours of {subject}"),
        ));
    }
    violations
}

/// A teacher holds at most one lesson per slot (coupling group
/// contributions occupy the teacher like any lesson)
pub fn check_teacher_conflicts(result: &SolveResult, _model: &DomainModel) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut seen: BTreeMap<(&TeacherId, Slot), &ScheduleEntry> = BTreeMap::new();
    for entry in &result.entries {
        if let Some(previous) = seen.insert((&entry.teacher, entry.slot), entry) {
            violations.push(Violation::new(
                "NoTeacherConflict",
                format!(
                    "teacher {} double-booked at {} ({} {} vs {} {})",
                    entry.teacher,
                    entry.slot,
                    previous.class,
                    previous.subject,
                    entry.class,
                    entry.subject
                ),
            ));
        }
    }
    violations
}

/// A class holds at most one lesson per slot; a coupling
/// blocks every involved class at its slots
pub fn check_class_conflicts(result: &SolveResult, model: &DomainModel) -> Vec<Violation> {
    let mut violations = Vec::new();
    let occupancy = class_occupancy(result, model);
    for ((class, slot), count) in occupancy {
        if count > 1 {
            violations.push(Violation::new(
                "NoClassConflict",
                format!("class {class} double-booked at {slot}"),
            ));
        }
    }
    violations
}

/// Weekly hours inside the deputat band
pub fn check_deputat_band(result: &SolveResult, model: &DomainModel) -> Vec<Violation> {
    let mut violations = Vec::new();
    let hours = teacher_hours(result);
    for teacher in &model.teachers {
        let taught = hours.get(&teacher.id).copied().unwrap_or(0);
        if taught < teacher.deputat_min() || taught > teacher.deputat_max() {
            violations.push(Violation::new(
                "DeputatBand",
                format!(
                    "teacher {} teaches {taught}h outside the band [{}, {}]",
                    teacher.id,
                    teacher.deputat_min(),
                    teacher.deputat_max()
                ),
            ));
        }
    }
    violations
}

/// A Sek-I class day is a prefix of its period sequence
pub fn check_class_prefix(result: &SolveResult, model: &DomainModel) -> Vec<Violation> {
    let mut violations = Vec::new();
    let index = SlotIndex::new(&model.grid);
    let active = class_active_periods(result, model);

    for class in model.classes.iter().filter(|c| !c.is_course) {
        let periods = index.class_periods(class);
        for day in 0..model.grid.days {
            let Some(day_active) = active.get(&(class.id.clone(), day)) else {
                continue;
            };
            let highest = periods
                .iter()
                .rposition(|p| day_active.contains(p))
                .map(|i| i + 1)
                .unwrap_or(0);
            if highest != day_active.len() {
                violations.push(Violation::new(
                    "ClassPrefix",
                    format!(
                        "class {} has free periods before its last lesson on day {day}",
                        class.id
                    ),
                ));
            }
        }
    }
    violations
}

/// Per-day hour cap per teacher
pub fn check_teacher_day_caps(result: &SolveResult, model: &DomainModel) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut per_day: BTreeMap<(&TeacherId, u8), u32> = BTreeMap::new();
    for entry in &result.entries {
        *per_day.entry((&entry.teacher, entry.slot.day)).or_default() += 1;
    }
    for ((teacher_id, day), count) in per_day {
        let Some(teacher) = model.teacher(teacher_id) else {
            continue;
        };
        if let Some(cap) = teacher.max_hours_per_day {
            if count > cap as u32 {
                violations.push(Violation::new(
                    "MaxHoursPerDay",
                    format!("teacher {teacher_id} teaches {count}h on day {day} (cap {cap})"),
                ));
            }
        }
    }
    violations
}

/// Gaps inside contiguity runs bounded per day and per week;
/// pauses never count
pub fn check_teacher_gaps(result: &SolveResult, model: &DomainModel) -> Vec<Violation> {
    let mut violations = Vec::new();
    let index = SlotIndex::new(&model.grid);
    let mut active: BTreeMap<(&TeacherId, u8), BTreeSet<u8>> = BTreeMap::new();
    for entry in &result.entries {
        active
            .entry((&entry.teacher, entry.slot.day))
            .or_default()
            .insert(entry.slot.period);
    }

    let mut weekly: BTreeMap<&TeacherId, u32> = BTreeMap::new();
    for ((teacher_id, day), periods) in &active {
        let gaps = count_gaps(&index, periods);
        *weekly.entry(teacher_id).or_default() += gaps;
        if let Some(teacher) = model.teacher(teacher_id) {
            if let Some(cap) = teacher.max_gaps_per_day {
                if gaps > cap as u32 {
                    violations.push(Violation::new(
                        "MaxGapsPerDay",
                        format!("teacher {teacher_id} has {gaps} gaps on day {day} (cap {cap})"),
                    ));
                }
            }
        }
    }
    for (teacher_id, gaps) in weekly {
        if let Some(teacher) = model.teacher(teacher_id) {
            if let Some(cap) = teacher.max_gaps_per_week {
                if gaps > cap as u32 {
                    violations.push(Violation::new(
                        "MaxGapsPerWeek",
                        format!("teacher {teacher_id} has {gaps} gaps this week (cap {cap})"),
                    ));
                }
            }
        }
    }
    violations
}

/// Gap units of one day: per run, occupied span minus occupied count
pub fn count_gaps(index: &SlotIndex, periods: &BTreeSet<u8>) -> u32 {
    let mut gaps = 0u32;
    for run in index.runs() {
        let positions: Vec<usize> = run
            .iter()
            .enumerate()
            .filter(|(_, p)| periods.contains(p))
            .map(|(i, _)| i)
            .collect();
        if let (Some(&first), Some(&last)) = (positions.first(), positions.last()) {
            gaps += (last - first + 1 - positions.len()) as u32;
        }
    }
    gaps
}

/// Required doubles come in `floor(N/2)` blocks on double starts;
/// an odd hour is a singleton on a day without a double of the subject
pub fn check_required_doubles(result: &SolveResult, model: &DomainModel) -> Vec<Violation> {
    let mut violations = Vec::new();
    let grid = &model.grid;

    let mut per_day: BTreeMap<(&ClassId, &SubjectId, u8), BTreeSet<u8>> = BTreeMap::new();
    for entry in result.entries.iter().filter(|e| e.coupling.is_none()) {
        per_day
            .entry((&entry.class, &entry.subject, entry.slot.day))
            .or_default()
            .insert(entry.slot.period);
    }

    for class in &model.classes {
        for (subject_id, &hours) in &class.curriculum {
            let Some(subject) = model.subject(subject_id) else {
                continue;
            };
            if !subject.double_required || hours < 2 || model.is_coupled(&class.id, subject_id) {
                continue;
            }

            let mut pairs = 0u32;
            let mut singles = 0u32;
            let mut singleton_day_pairs = 0u32;
            for day in 0..grid.days {
                let Some(periods) = per_day.get(&(&class.id, subject_id, day)) else {
                    continue;
                };
                let (day_pairs, day_singles) = split_into_doubles(grid, periods);
                pairs += day_pairs;
                singles += day_singles;
                if day_singles > 0 {
                    singleton_day_pairs += day_pairs;
                }
            }

            if pairs != hours / 2 || singles != hours % 2 {
                violations.push(Violation::new(
                    "RequiredDoubles",
                    format!(
                        "class {} {subject_id}: {pairs} doubles and {singles} singles for {hours}h",
                        class.id
                    ),
                ));
            } else if singles > 0 && singleton_day_pairs > 0 {
                violations.push(Violation::new(
                    "RequiredDoubles",
                    format!(
                        "class {} {subject_id}: the odd hour shares a day with a double",
                        class.id
                    ),
                ));
            }
        }
    }
    violations
}

/// Pair up a day's periods into double blocks (start on a double start,
/// both halves present); what remains are singles
fn split_into_doubles(grid: &crate::types::TimeGrid, periods: &BTreeSet<u8>) -> (u32, u32) {
    let mut pairs = 0u32;
    let mut singles = 0u32;
    let mut taken: BTreeSet<u8> = BTreeSet::new();
    for &p in periods {
        if taken.contains(&p) {
            continue;
        }
        if grid.is_double_start(p) && periods.contains(&(p + 1)) && !taken.contains(&(p + 1)) {
            pairs += 1;
            taken.insert(p);
            taken.insert(p + 1);
        } else {
            singles += 1;
            taken.insert(p);
        }
    }
    (pairs, singles)
}

/// Per room type and slot at most `capacity` lessons, every special
/// lesson carries a distinct instance of the right type
pub fn check_room_capacity(result: &SolveResult, model: &DomainModel) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut per_type: BTreeMap<(&str, Slot), u32> = BTreeMap::new();
    let mut per_instance: BTreeMap<(&str, Slot), u32> = BTreeMap::new();

    for entry in &result.entries {
        let Some(subject) = model.subject(&entry.subject) else {
            continue;
        };
        let Some(room_type) = &subject.room_type else {
            continue;
        };
        *per_type.entry((room_type.0.as_str(), entry.slot)).or_default() += 1;

        match &entry.room {
            Some(label) if label.starts_with(&format!("{}-", room_type)) => {
                *per_instance.entry((label.as_str(), entry.slot)).or_default() += 1;
            }
            Some(label) => violations.push(Violation::new(
                "RoomCapacity",
                format!(
                    "class {} {} sits in '{label}', not a {room_type} room",
                    entry.class, entry.subject
                ),
            )),
            None => violations.push(Violation::new(
                "RoomCapacity",
                format!("class {} {} got no {room_type} room", entry.class, entry.subject),
            )),
        }
    }

    for ((type_id, slot), count) in per_type {
        let capacity = model
            .rooms
            .iter()
            .find(|r| r.id.0 == type_id)
            .map(|r| r.capacity)
            .unwrap_or(0);
        if count > capacity {
            violations.push(Violation::new(
                "RoomCapacity",
                format!("{count} lessons need a {type_id} room at {slot}, capacity is {capacity}"),
            ));
        }
    }
    for ((label, slot), count) in per_instance {
        if count > 1 {
            violations.push(Violation::new(
                "RoomCapacity",
                format!("room {label} double-booked at {slot}"),
            ));
        }
    }
    violations
}

/// Coupling hours, one stable teacher per group, every group
/// present at every coupling slot
pub fn check_coupling_integrity(result: &SolveResult, model: &DomainModel) -> Vec<Violation> {
    let mut violations = Vec::new();

    for coupling in &model.couplings {
        let entries: Vec<&ScheduleEntry> = result
            .entries
            .iter()
            .filter(|e| e.coupling.as_ref() == Some(&coupling.id))
            .collect();
        let slots: BTreeSet<Slot> = entries.iter().map(|e| e.slot).collect();

        if slots.len() as u32 != coupling.hours_per_week {
            violations.push(Violation::new(
                "CouplingHours",
                format!(
                    "coupling {} runs {} slots instead of {}",
                    coupling.id,
                    slots.len(),
                    coupling.hours_per_week
                ),
            ));
        }

        for group in &coupling.groups {
            let group_entries: Vec<&&ScheduleEntry> = entries
                .iter()
                .filter(|e| e.coupling_group.as_deref() == Some(group.label.as_str()))
                .collect();
            let group_slots: BTreeSet<Slot> = group_entries.iter().map(|e| e.slot).collect();
            if group_slots != slots {
                violations.push(Violation::new(
                    "CouplingGroups",
                    format!(
                        "coupling {} group '{}' misses slots of the coupling",
                        coupling.id, group.label
                    ),
                ));
            }
            let teachers: BTreeSet<&TeacherId> =
                group_entries.iter().map(|e| &e.teacher).collect();
            if teachers.len() > 1 {
                violations.push(Violation::new(
                    "CouplingGroups",
                    format!(
                        "coupling {} group '{}' switches teachers during the week",
                        coupling.id, group.label
                    ),
                ));
            }
            for teacher_id in teachers {
                let qualified = model
                    .teacher(teacher_id)
                    .map(|t| t.qualified_for(&group.subject))
                    .unwrap_or(false);
                if !qualified {
                    violations.push(Violation::new(
                        "CouplingGroups",
                        format!(
                            "coupling {} group '{}' is led by unqualified teacher {teacher_id}",
                            coupling.id, group.label
                        ),
                    ));
                }
            }
        }
    }
    violations
}

/// All courses of a track share an identical active slot set
pub fn check_track_sync(result: &SolveResult, model: &DomainModel) -> Vec<Violation> {
    let mut violations = Vec::new();
    for track in &model.tracks {
        let mut reference: Option<(&ClassId, BTreeSet<Slot>)> = None;
        for class_id in &track.courses {
            let slots: BTreeSet<Slot> = result
                .entries_for_class(class_id)
                .map(|e| e.slot)
                .collect();
            match &reference {
                None => reference = Some((class_id, slots)),
                Some((first, expected)) => {
                    if &slots != expected {
                        violations.push(Violation::new(
                            "TrackSync",
                            format!(
                                "track {}: {class_id} is out of step with {first}",
                                track.id
                            ),
                        ));
                    }
                }
            }
        }
    }
    violations
}

/// Deviation from the deputat target is legal inside the band, but
/// worth surfacing
pub fn warn_deputat_deviation(result: &SolveResult, model: &DomainModel) -> Vec<Violation> {
    let mut warnings = Vec::new();
    let hours = teacher_hours(result);
    for teacher in &model.teachers {
        let taught = hours.get(&teacher.id).copied().unwrap_or(0);
        if taught != teacher.deputat {
            warnings.push(Violation::new(
                "DeputatDeviation",
                format!(
                    "teacher {} teaches {taught}h, target is {}h",
                    teacher.id, teacher.deputat
                ),
            ));
        }
    }
    warnings
}

fn teacher_hours(result: &SolveResult) -> BTreeMap<TeacherId, u32> {
    let mut hours: BTreeMap<TeacherId, u32> = BTreeMap::new();
    for entry in &result.entries {
        *hours.entry(entry.teacher.clone()).or_default() += 1;
    }
    hours
}

/// Class occupancy per slot, coupling entries expanded to every
/// involved class (each coupling counted once per slot)
fn class_occupancy(
    result: &SolveResult,
    model: &DomainModel,
) -> BTreeMap<(ClassId, Slot), u32> {
    let mut occupancy: BTreeMap<(ClassId, Slot), u32> = BTreeMap::new();
    let mut couplings_seen: BTreeSet<(&str, Slot)> = BTreeSet::new();

    for entry in &result.entries {
        match &entry.coupling {
            None => {
                *occupancy.entry((entry.class.clone(), entry.slot)).or_default() += 1;
            }
            Some(coupling_id) => {
                if !couplings_seen.insert((coupling_id.0.as_str(), entry.slot)) {
                    continue;
                }
                if let Some(coupling) = model.couplings.iter().find(|k| &k.id == coupling_id) {
                    for class_id in &coupling.classes {
                        *occupancy.entry((class_id.clone(), entry.slot)).or_default() += 1;
                    }
                }
            }
        }
    }
    occupancy
}

/// Active periods per (class, day), couplings expanded
fn class_active_periods(
    result: &SolveResult,
    model: &DomainModel,
) -> BTreeMap<(ClassId, u8), BTreeSet<u8>> {
    let mut active: BTreeMap<(ClassId, u8), BTreeSet<u8>> = BTreeMap::new();
    for entry in &result.entries {
        match &entry.coupling {
            None => {
                active
                    .entry((entry.class.clone(), entry.slot.day))
                    .or_default()
                    .insert(entry.slot.period);
            }
            Some(coupling_id) => {
                if let Some(coupling) = model.couplings.iter().find(|k| &k.id == coupling_id) {
                    for class_id in &coupling.classes {
                        active
                            .entry((class_id.clone(), entry.slot.day))
                            .or_default()
                            .insert(entry.slot.period);
                    }
                }
            }
        }
    }
    active
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ConfigSnapshot, SoftWeights, SolveStatus, SolverLimits, TimeGrid,
    };

    fn entry(day: u8, period: u8, teacher: &str, class: &str, subject: &str) -> ScheduleEntry {
        ScheduleEntry {
            slot: Slot::new(day, period),
            teacher: teacher.into(),
            class: class.into(),
            subject: subject.into(),
            room: None,
            coupling: None,
            coupling_group: None,
        }
    }

    fn result(entries: Vec<ScheduleEntry>) -> SolveResult {
        SolveResult {
            status: SolveStatus::Optimal,
            entries,
            assignments: vec![],
            objective_value: None,
            num_variables: 0,
            num_constraints: 0,
            solve_time_ms: 0,
            config_snapshot: ConfigSnapshot {
                weights: SoftWeights::default(),
                limits: SolverLimits::default(),
                two_pass_used: false,
                generated_at: String::new(),
                algorithm_version: String::new(),
            },
        }
    }

    #[test]
    fn test_detects_teacher_conflict() {
        let r = result(vec![
            entry(0, 1, "MÜL", "5a", "Ma"),
            entry(0, 1, "MÜL", "5b", "Ma"),
        ]);
        let model = empty_model();
        let violations = check_teacher_conflicts(&r, &model);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("double-booked"));
    }

    #[test]
    fn test_counts_gaps_inside_runs_only() {
        let index = SlotIndex::new(&TimeGrid::german_default());
        // active 5 and 8 within the run [5,6,7,8]: two free in between
        let periods: BTreeSet<u8> = [5, 8].into_iter().collect();
        assert_eq!(count_gaps(&index, &periods), 2);
        // 2 and 3 sit in different runs (pause after 2): no gap
        let periods: BTreeSet<u8> = [2, 3].into_iter().collect();
        assert_eq!(count_gaps(&index, &periods), 0);
    }

    #[test]
    fn test_split_into_doubles() {
        let grid = TimeGrid::german_default();
        let periods: BTreeSet<u8> = [3, 4].into_iter().collect();
        assert_eq!(split_into_doubles(&grid, &periods), (1, 0));
        // 2 is no double start: (2,3) stays two singles
        let periods: BTreeSet<u8> = [2, 3].into_iter().collect();
        assert_eq!(split_into_doubles(&grid, &periods), (0, 2));
    }

    fn empty_model() -> DomainModel {
        DomainModel {
            grid: TimeGrid::german_default(),
            subjects: vec![],
            rooms: vec![],
            classes: vec![],
            teachers: vec![],
            couplings: vec![],
            tracks: vec![],
            pins: vec![],
            weights: SoftWeights::default(),
            limits: SolverLimits::default(),
        }
    }
}
