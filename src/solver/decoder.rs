use crate::solver::vars::{Entities, VarSet};
use crate::types::{ScheduleEntry, Slot, TeacherAssignment};
use good_lp::Solution;
use itertools::Itertools;

/// Read the solved variable values back into schedule entries and the
/// teacher-assignment list. Coupling hours become one entry per group,
/// anchored to the i-th involved class.
pub fn decode(
    solution: &impl Solution,
    ents: &Entities,
    vars: &VarSet,
) -> (Vec<ScheduleEntry>, Vec<TeacherAssignment>) {
    let mut entries = Vec::new();
    let mut assignments = Vec::new();

    for (&(di, ti, day, period), &x) in &vars.place {
        if solution.value(x) > 0.5 {
            let demand = &ents.demands[di];
            entries.push(ScheduleEntry {
                slot: Slot::new(day, period),
                teacher: ents.teachers[ti].id.clone(),
                class: ents.classes[demand.class].id.clone(),
                subject: demand.subject.id.clone(),
                room: None,
                coupling: None,
                coupling_group: None,
            });
        }
    }

    for (&(di, ti), &a) in &vars.assign {
        if solution.value(a) > 0.5 {
            let demand = &ents.demands[di];
            assignments.push(TeacherAssignment {
                teacher: ents.teachers[ti].id.clone(),
                class: ents.classes[demand.class].id.clone(),
                subject: demand.subject.id.clone(),
                hours: demand.hours,
            });
        }
    }

    for (ki, coupling) in ents.couplings.iter().enumerate() {
        let active_slots: Vec<Slot> = vars
            .couple_slot
            .range((ki, 0, 0)..=(ki, u8::MAX, u8::MAX))
            .filter(|(_, &u)| solution.value(u) > 0.5)
            .map(|(&(_, day, period), _)| Slot::new(day, period))
            .collect();

        for (gi, group) in coupling.groups.iter().enumerate() {
            let teacher = (0..ents.teachers.len()).find(|&ti| {
                vars.group_teacher
                    .get(&(ki, gi, ti))
                    .map(|&g| solution.value(g) > 0.5)
                    .unwrap_or(false)
            });
            let Some(ti) = teacher else {
                continue;
            };
            let anchor = coupling.classes[gi].clone();

            for &slot in &active_slots {
                entries.push(ScheduleEntry {
                    slot,
                    teacher: ents.teachers[ti].id.clone(),
                    class: anchor.clone(),
                    subject: group.subject.clone(),
                    room: None,
                    coupling: Some(coupling.id.clone()),
                    coupling_group: Some(group.label.clone()),
                });
            }
            assignments.push(TeacherAssignment {
                teacher: ents.teachers[ti].id.clone(),
                class: anchor,
                subject: group.subject.clone(),
                hours: coupling.hours_per_week,
            });
        }
    }

    let entries = entries
        .into_iter()
        .sorted_by(|a, b| {
            (a.slot.day, a.slot.period, &a.class.0, &a.subject.0).cmp(&(
                b.slot.day,
                b.slot.period,
                &b.class.0,
                &b.subject.0,
            ))
        })
        .collect();
    let assignments = assignments
        .into_iter()
        .sorted_by(|a, b| {
            (&a.class.0, &a.subject.0, &a.teacher.0).cmp(&(&b.class.0, &b.subject.0, &b.teacher.0))
        })
        .collect();

    (entries, assignments)
}
