use crate::error::SchedulerError;
use crate::types::{DomainModel, RoomType, ScheduleEntry};
use good_lp::{variable, Expression, ProblemVariables, Solution, SolverModel, Variable};
use std::collections::{BTreeMap, BTreeSet};

/// Post-pass room assignment. Per slot and room type, lessons are bound
/// to numbered instances in stable `(class, subject)` order; the second
/// half of a double lesson prefers the instance its first half got.
/// When the greedy binding cannot place a cluster, a small assignment
/// model decides; if that is infeasible too the solve fails with
/// `RoomAssignment`.
pub fn assign_rooms(
    entries: &mut [ScheduleEntry],
    model: &DomainModel,
) -> Result<(), SchedulerError> {
    // lesson indices per (slot, room type), deterministic order
    let mut clusters: BTreeMap<(u8, u8, String), Vec<usize>> = BTreeMap::new();
    for (i, entry) in entries.iter().enumerate() {
        let Some(subject) = model.subject(&entry.subject) else {
            continue;
        };
        if let Some(room_type) = &subject.room_type {
            clusters
                .entry((entry.slot.day, entry.slot.period, room_type.0.clone()))
                .or_default()
                .push(i);
        }
    }

    // (class, subject, day, period) -> bound instance, for double
    // continuity lookups against the directly preceding period
    let mut bound: BTreeMap<(String, String, u8, u8), u32> = BTreeMap::new();

    for ((day, period, type_id), mut lessons) in clusters {
        let room_type = model
            .rooms
            .iter()
            .find(|r| r.id.0 == type_id)
            .ok_or_else(|| SchedulerError::RoomAssignment(format!("unknown room type {type_id}")))?;

        lessons.sort_by(|&a, &b| {
            (&entries[a].class.0, &entries[a].subject.0)
                .cmp(&(&entries[b].class.0, &entries[b].subject.0))
        });

        let preferences: Vec<Option<u32>> = lessons
            .iter()
            .map(|&i| {
                let e = &entries[i];
                period
                    .checked_sub(1)
                    .and_then(|prev| {
                        bound
                            .get(&(e.class.0.clone(), e.subject.0.clone(), day, prev))
                            .copied()
                    })
            })
            .collect();

        let chosen = match greedy_bind(room_type, &preferences, lessons.len()) {
            Some(instances) => instances,
            None => solve_cluster(room_type, &preferences, lessons.len()).map_err(|e| {
                SchedulerError::RoomAssignment(format!(
                    "{} lessons compete for {} {} rooms at day {} period {}: {e}",
                    lessons.len(),
                    room_type.capacity,
                    type_id,
                    day,
                    period
                ))
            })?,
        };

        for (&i, &instance) in lessons.iter().zip(chosen.iter()) {
            let e = &mut entries[i];
            e.room = Some(room_type.instance_label(instance));
            bound.insert((e.class.0.clone(), e.subject.0.clone(), day, period), instance);
        }
    }

    Ok(())
}

/// Fast path: honour preferences when free, otherwise take the lowest
/// free instance. Returns `None` when a lesson cannot be bound at all.
fn greedy_bind(room_type: &RoomType, preferences: &[Option<u32>], count: usize) -> Option<Vec<u32>> {
    if count > room_type.capacity as usize {
        return None;
    }
    let mut used: BTreeSet<u32> = BTreeSet::new();
    let mut result = Vec::with_capacity(count);
    for pref in preferences {
        let instance = match pref {
            Some(p) if !used.contains(p) => *p,
            _ => (1..=room_type.capacity).find(|k| !used.contains(k))?,
        };
        used.insert(instance);
        result.push(instance);
    }
    Some(result)
}

/// CP fallback: a one-slot assignment model that maximises kept
/// preferences under the instance-exclusivity constraint
fn solve_cluster(
    room_type: &RoomType,
    preferences: &[Option<u32>],
    count: usize,
) -> Result<Vec<u32>, String> {
    let instances: Vec<u32> = (1..=room_type.capacity).collect();
    let mut pv = ProblemVariables::new();
    let mut choice: BTreeMap<(usize, u32), Variable> = BTreeMap::new();
    for lesson in 0..count {
        for &k in &instances {
            choice.insert((lesson, k), pv.add(variable().binary()));
        }
    }

    let mut objective = Expression::from(0.0);
    for (lesson, pref) in preferences.iter().enumerate() {
        if let Some(k) = pref {
            if let Some(&v) = choice.get(&(lesson, *k)) {
                objective += -1.0 * v;
            }
        }
    }

    let mut model = pv
        .minimise(objective)
        .using(good_lp::solvers::highs::highs);
    for lesson in 0..count {
        let row: Expression = instances
            .iter()
            .filter_map(|&k| choice.get(&(lesson, k)).copied())
            .map(Expression::from)
            .sum();
        model = model.with(row.eq(1.0));
    }
    for &k in &instances {
        let col: Expression = (0..count)
            .filter_map(|lesson| choice.get(&(lesson, k)).copied())
            .map(Expression::from)
            .sum();
        model = model.with(col.leq(1.0));
    }

    let solution = model.solve().map_err(|e| e.to_string())?;

    let mut result = Vec::with_capacity(count);
    for lesson in 0..count {
        let k = instances
            .iter()
            .find(|&&k| solution.value(choice[&(lesson, k)]) > 0.5)
            .ok_or_else(|| "no instance selected".to_string())?;
        result.push(*k);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(capacity: u32) -> RoomType {
        RoomType {
            id: "nw".into(),
            name: "NW".to_string(),
            capacity,
        }
    }

    #[test]
    fn test_greedy_respects_preference() {
        let chosen = greedy_bind(&room(3), &[None, Some(3), None], 3).unwrap();
        assert_eq!(chosen, vec![1, 3, 2]);
    }

    #[test]
    fn test_greedy_fails_over_capacity() {
        assert!(greedy_bind(&room(1), &[None, None], 2).is_none());
    }

    #[test]
    fn test_conflicting_preferences_fall_back_to_lowest_free() {
        let chosen = greedy_bind(&room(2), &[Some(1), Some(1)], 2).unwrap();
        assert_eq!(chosen, vec![1, 2]);
    }
}
