use crate::slots::SlotIndex;
use crate::solver::vars::{sum_vars, teacher_runs, Entities, Toggles, VarSet};
use crate::types::{Pin, SoftWeights};
use good_lp::{Expression, SolverModel, Variable};
use std::collections::BTreeSet;

/// Post every hard constraint plus the aux-defining inequalities the
/// objective terms rely on. Returns the model and the number of
/// constraints posted. `slot_fixes` pins placements from a previous
/// solution (incremental re-solve); `pins` are the caller's fixed
/// lessons. Posting order is deterministic given the entity order.
#[allow(clippy::too_many_arguments)]
pub fn post_constraints<M: SolverModel>(
    mut model: M,
    ents: &Entities,
    index: &SlotIndex,
    vars: &VarSet,
    weights: &SoftWeights,
    toggles: &Toggles,
    pins: &[Pin],
    slot_fixes: &[(usize, usize, u8, u8)],
) -> (M, usize) {
    let mut n = 0usize;

    model = post_demand_constraints(model, &mut n, ents, vars, toggles, weights);
    model = post_occupancy_constraints(model, &mut n, vars);
    model = post_deputat_band(model, &mut n, ents, vars, toggles);
    if toggles.rooms {
        model = post_room_capacity(model, &mut n, ents, vars);
    }
    if toggles.compactness {
        model = post_class_prefix(model, &mut n, ents, index, vars);
    }
    model = post_teacher_day_caps(model, &mut n, ents, index, vars);
    if toggles.couplings {
        model = post_coupling_constraints(model, &mut n, ents, vars);
    }
    model = post_gap_constraints(model, &mut n, ents, index, vars);
    model = post_track_sync(model, &mut n, ents, index, vars);
    model = post_soft_aux(model, &mut n, ents, index, vars);
    model = post_pins(model, &mut n, ents, vars, pins);

    for fix in slot_fixes {
        if let Some(&x) = vars.place.get(fix) {
            model = model.with(Expression::from(x).eq(1.0));
            n += 1;
        }
    }

    (model, n)
}

/// Per-demand constraints: unique teacher, exact weekly hours, slots
/// only for the assigned teacher, double-lesson structure, spread aux
fn post_demand_constraints<M: SolverModel>(
    mut model: M,
    n: &mut usize,
    ents: &Entities,
    vars: &VarSet,
    toggles: &Toggles,
    weights: &SoftWeights,
) -> M {
    for (di, demand) in ents.demands.iter().enumerate() {
        // exactly one teacher owns the demand
        let assigns: Vec<Variable> = (0..ents.teachers.len())
            .filter_map(|ti| vars.assign.get(&(di, ti)).copied())
            .collect();
        model = model.with(sum_vars(&assigns).eq(1.0));
        *n += 1;

        // the weekly hours are placed exactly
        let places: Vec<Variable> = vars.places_for_demand(di).map(|(_, &x)| x).collect();
        model = model.with(sum_vars(&places).eq(demand.hours as f64));
        *n += 1;

        // a slot can only go to the assigned teacher
        for (&(_, ti, _, _), &x) in vars.places_for_demand(di) {
            let a = vars.assign[&(di, ti)];
            model = model.with(Expression::from(x).leq(a));
            *n += 1;
        }

        // a double is exactly "both halves placed"
        for (&(_, ti, day, p), &y) in vars.doubles_for_demand(di) {
            let first = vars.place[&(di, ti, day, p)];
            let second = vars.place[&(di, ti, day, p + 1)];
            model = model.with(Expression::from(y).leq(first));
            model = model.with(Expression::from(y).leq(second));
            model = model.with(Expression::from(y).geq(first + second - 1.0));
            *n += 3;
        }

        // overlapping double starts exclude each other
        for (&(_, ti, day, p), &y) in vars.doubles_for_demand(di) {
            if let Some(&y_next) = vars.double.get(&(di, ti, day, p + 1)) {
                model = model.with((y + y_next).leq(1.0));
                *n += 1;
            }
        }

        // required doubles fill floor(N/2) blocks; an odd hour is a
        // singleton on a day without any double of this demand
        if toggles.doubles && demand.subject.double_required && demand.hours >= 2 {
            let doubles: Vec<Variable> = vars.doubles_for_demand(di).map(|(_, &y)| y).collect();
            model = model.with(sum_vars(&doubles).eq((demand.hours / 2) as f64));
            *n += 1;

            if demand.hours % 2 == 1 {
                for (&(_, day), &dd) in vars.day_double.range((di, 0)..=(di, u8::MAX)) {
                    let y_day: Vec<Variable> = vars
                        .doubles_for_demand(di)
                        .filter(|(&(_, _, d, _), _)| d == day)
                        .map(|(_, &y)| y)
                        .collect();
                    let x_day: Vec<Variable> = vars
                        .places_for_demand(di)
                        .filter(|(&(_, _, d, _), _)| d == day)
                        .map(|(_, &x)| x)
                        .collect();
                    if !y_day.is_empty() {
                        model =
                            model.with(sum_vars(&y_day).leq(y_day.len() as f64 * dd));
                        *n += 1;
                    }
                    // a day hosting a double admits no extra single hour
                    model = model
                        .with((sum_vars(&x_day) - 2.0 * sum_vars(&y_day) + dd).leq(1.0));
                    *n += 1;
                }
            }
        }

        // spread aux: hours beyond one per day, doubles excused
        if weights.subject_spread > 0.0 {
            for (&(_, day), &over) in vars.spread_over.range((di, 0)..=(di, u8::MAX)) {
                let x_day: Vec<Variable> = vars
                    .places_for_demand(di)
                    .filter(|(&(_, _, d, _), _)| d == day)
                    .map(|(_, &x)| x)
                    .collect();
                let y_day: Vec<Variable> = vars
                    .doubles_for_demand(di)
                    .filter(|(&(_, _, d, _), _)| d == day)
                    .map(|(_, &y)| y)
                    .collect();
                model = model.with(
                    Expression::from(over).geq(sum_vars(&x_day) - sum_vars(&y_day) - 1.0),
                );
                *n += 1;
            }
        }
    }
    model
}

/// No double-booking: teachers and classes hold at most one lesson
/// per slot (coupling blocks ride along in the same sums)
fn post_occupancy_constraints<M: SolverModel>(mut model: M, n: &mut usize, vars: &VarSet) -> M {
    let teacher_keys: BTreeSet<(usize, u8, u8)> = vars
        .x_teacher
        .keys()
        .chain(vars.busy_teacher.keys())
        .copied()
        .collect();
    for (ti, day, p) in teacher_keys {
        model = model.with(vars.act_teacher(ti, day, p).leq(1.0));
        *n += 1;
    }

    let class_keys: BTreeSet<(usize, u8, u8)> = vars
        .x_class
        .keys()
        .chain(vars.u_class.keys())
        .copied()
        .collect();
    for (ci, day, p) in class_keys {
        model = model.with(vars.act_class(ci, day, p).leq(1.0));
        *n += 1;
    }
    model
}

/// Weekly load inside the deputat band
fn post_deputat_band<M: SolverModel>(
    mut model: M,
    n: &mut usize,
    ents: &Entities,
    vars: &VarSet,
    toggles: &Toggles,
) -> M {
    if toggles.relax_deputat {
        return model;
    }
    for (ti, teacher) in ents.teachers.iter().enumerate() {
        let load = vars.load_expr(ti);
        model = model.with(load.clone().geq(teacher.deputat_min() as f64));
        model = model.with(load.leq(teacher.deputat_max() as f64));
        *n += 2;
    }
    model
}

/// Concurrent lessons per room type bounded by its capacity
fn post_room_capacity<M: SolverModel>(
    mut model: M,
    n: &mut usize,
    ents: &Entities,
    vars: &VarSet,
) -> M {
    for (ri, room) in ents.rooms.iter().enumerate() {
        let keys: BTreeSet<(usize, u8, u8)> = vars
            .x_room
            .range((ri, 0, 0)..=(ri, u8::MAX, u8::MAX))
            .map(|(k, _)| *k)
            .chain(
                vars.u_room
                    .range((ri, 0, 0)..=(ri, u8::MAX, u8::MAX))
                    .map(|(k, _)| *k),
            )
            .collect();
        for (_, day, p) in keys {
            let mut expr = Expression::default();
            if let Some(xs) = vars.x_room.get(&(ri, day, p)) {
                expr += sum_vars(xs);
            }
            if let Some(us) = vars.u_room.get(&(ri, day, p)) {
                expr += sum_vars(us);
            }
            model = model.with(expr.leq(room.capacity as f64));
            *n += 1;
        }
    }
    model
}

/// A Sek-I class day is a prefix of the day's period sequence
fn post_class_prefix<M: SolverModel>(
    mut model: M,
    n: &mut usize,
    ents: &Entities,
    index: &SlotIndex,
    vars: &VarSet,
) -> M {
    for (ci, class) in ents.classes.iter().enumerate() {
        if class.is_course {
            continue;
        }
        let periods = index.class_periods(class);
        for day in 0..index.days() {
            for pair in periods.windows(2) {
                let earlier = vars.act_class(ci, day, pair[0]);
                let later = vars.act_class(ci, day, pair[1]);
                model = model.with(later.leq(earlier));
                *n += 1;
            }
        }
    }
    model
}

/// Per-day hour cap per teacher
fn post_teacher_day_caps<M: SolverModel>(
    mut model: M,
    n: &mut usize,
    ents: &Entities,
    index: &SlotIndex,
    vars: &VarSet,
) -> M {
    for (ti, teacher) in ents.teachers.iter().enumerate() {
        let Some(cap) = teacher.max_hours_per_day else {
            continue;
        };
        let periods = index.teacher_periods(teacher.can_teach_sek2);
        for day in 0..index.days() {
            let mut expr = Expression::default();
            for &p in &periods {
                expr += vars.act_teacher(ti, day, p);
            }
            model = model.with(expr.leq(cap as f64));
            *n += 1;
        }
    }
    model
}

/// Couplings: weekly hours met, one teacher per group, and the group
/// teachers occupied whenever the coupling runs
fn post_coupling_constraints<M: SolverModel>(
    mut model: M,
    n: &mut usize,
    ents: &Entities,
    vars: &VarSet,
) -> M {
    for (ki, coupling) in ents.couplings.iter().enumerate() {
        let slots: Vec<((usize, u8, u8), Variable)> = vars
            .couple_slot
            .range((ki, 0, 0)..=(ki, u8::MAX, u8::MAX))
            .map(|(k, &u)| (*k, u))
            .collect();
        let slot_vars: Vec<Variable> = slots.iter().map(|(_, u)| *u).collect();
        model = model.with(sum_vars(&slot_vars).eq(coupling.hours_per_week as f64));
        *n += 1;

        for gi in 0..coupling.groups.len() {
            let group_vars: Vec<Variable> = (0..ents.teachers.len())
                .filter_map(|ti| vars.group_teacher.get(&(ki, gi, ti)).copied())
                .collect();
            model = model.with(sum_vars(&group_vars).eq(1.0));
            *n += 1;

            for ti in 0..ents.teachers.len() {
                let Some(&g) = vars.group_teacher.get(&(ki, gi, ti)) else {
                    continue;
                };
                for &((_, day, p), u) in &slots {
                    match vars.group_busy.get(&(ki, gi, ti, day, p)) {
                        Some(&busy) => {
                            model = model.with(Expression::from(busy).geq(u + g - 1.0));
                            model = model.with(Expression::from(busy).leq(u));
                            model = model.with(Expression::from(busy).leq(g));
                            *n += 3;
                        }
                        // teacher unavailable at the slot: the pairing
                        // itself is forbidden
                        None => {
                            model = model.with((u + g).leq(1.0));
                            *n += 1;
                        }
                    }
                }
            }
        }
    }
    model
}

/// Gap caps plus the occupancy prefix/suffix chains that pin the gap
/// cells; everything stays inside one contiguity run, so pauses never
/// count as gaps
fn post_gap_constraints<M: SolverModel>(
    mut model: M,
    n: &mut usize,
    ents: &Entities,
    index: &SlotIndex,
    vars: &VarSet,
) -> M {
    for (ti, teacher) in ents.teachers.iter().enumerate() {
        let runs: Vec<Vec<u8>> = teacher_runs(index, teacher.can_teach_sek2)
            .into_iter()
            .filter(|r| r.len() >= 3)
            .collect();
        let has_cells = runs
            .first()
            .map(|r| vars.gap_cells.contains_key(&(ti, 0, r[0])))
            .unwrap_or(false);
        if !has_cells {
            continue;
        }

        let mut week_gaps: Vec<Variable> = Vec::new();
        for day in 0..index.days() {
            let mut day_gaps: Vec<Variable> = Vec::new();
            for run in &runs {
                for (j, &p) in run.iter().enumerate() {
                    let cell = vars.gap_cells[&(ti, day, p)];
                    let act = vars.act_teacher(ti, day, p);

                    if j == 0 {
                        model = model.with(Expression::from(cell.before).eq(act.clone()));
                        *n += 1;
                    } else {
                        let prev = vars.gap_cells[&(ti, day, run[j - 1])].before;
                        model = model.with(Expression::from(cell.before).geq(prev));
                        model = model.with(Expression::from(cell.before).geq(act.clone()));
                        model = model.with(Expression::from(cell.before).leq(act.clone() + prev));
                        *n += 3;
                    }

                    if j == run.len() - 1 {
                        model = model.with(Expression::from(cell.after).eq(act.clone()));
                        *n += 1;
                    } else {
                        let next = vars.gap_cells[&(ti, day, run[j + 1])].after;
                        model = model.with(Expression::from(cell.after).geq(next));
                        model = model.with(Expression::from(cell.after).geq(act.clone()));
                        model = model.with(Expression::from(cell.after).leq(act.clone() + next));
                        *n += 3;
                    }

                    // a gap is a free period with lessons on both sides
                    model = model
                        .with(Expression::from(cell.gap).geq(cell.before + cell.after - act - 1.0));
                    *n += 1;
                    day_gaps.push(cell.gap);
                }
            }

            if let Some(cap) = teacher.max_gaps_per_day {
                model = model.with(sum_vars(&day_gaps).leq(cap as f64));
                *n += 1;
            }
            if let Some(&excess) = vars.gap_excess.get(&(ti, day)) {
                model = model.with(Expression::from(excess).geq(sum_vars(&day_gaps) - 1.0));
                *n += 1;
            }
            week_gaps.extend(day_gaps);
        }

        if let Some(cap) = teacher.max_gaps_per_week {
            model = model.with(sum_vars(&week_gaps).leq(cap as f64));
            *n += 1;
        }
    }
    model
}

/// All courses of a track are active on identical slots
fn post_track_sync<M: SolverModel>(
    mut model: M,
    n: &mut usize,
    ents: &Entities,
    index: &SlotIndex,
    vars: &VarSet,
) -> M {
    for track in &ents.tracks {
        let indices: Vec<usize> = track
            .courses
            .iter()
            .filter_map(|c| ents.class_index(c))
            .collect();
        let Some((&first, rest)) = indices.split_first() else {
            continue;
        };
        let mut periods: BTreeSet<u8> = BTreeSet::new();
        for &ci in &indices {
            periods.extend(index.class_periods(ents.classes[ci]));
        }
        for day in 0..index.days() {
            for &p in &periods {
                for &ci in rest {
                    let reference = vars.act_class(first, day, p);
                    model = model.with(reference.eq(vars.act_class(ci, day, p)));
                    *n += 1;
                }
            }
        }
    }
    model
}

/// Aux-defining constraints for the workload span, the wished-free
/// days and the deputat deviation
fn post_soft_aux<M: SolverModel>(
    mut model: M,
    n: &mut usize,
    ents: &Entities,
    index: &SlotIndex,
    vars: &VarSet,
) -> M {
    for (ti, teacher) in ents.teachers.iter().enumerate() {
        let periods = index.teacher_periods(teacher.can_teach_sek2);

        if let Some(&(max, min)) = vars.load_span.get(&ti) {
            for day in 0..index.days() {
                let mut day_load = Expression::default();
                for &p in &periods {
                    day_load += vars.act_teacher(ti, day, p);
                }
                model = model.with(Expression::from(max).geq(day_load.clone()));
                model = model.with(Expression::from(min).leq(day_load));
                *n += 2;
            }
        }

        if let Some(&dev) = vars.dep_dev.get(&ti) {
            let load = vars.load_expr(ti);
            model = model.with(Expression::from(dev).geq(load.clone() - teacher.deputat as f64));
            model = model.with(Expression::from(dev).geq(teacher.deputat as f64 - load));
            *n += 2;
        }

        for &day in &teacher.preferred_free_days {
            let Some(&worked) = vars.worked.get(&(ti, day)) else {
                continue;
            };
            let mut day_load = Expression::default();
            for &p in &periods {
                day_load += vars.act_teacher(ti, day, p);
            }
            model = model.with(day_load.leq(periods.len() as f64 * worked));
            *n += 1;
        }
    }
    model
}

/// Pinned lessons force their assignment and placement
fn post_pins<M: SolverModel>(
    mut model: M,
    n: &mut usize,
    ents: &Entities,
    vars: &VarSet,
    pins: &[Pin],
) -> M {
    for pin in pins {
        let Some(di) = ents.demand_index(&pin.class, &pin.subject) else {
            continue;
        };
        let Some(ti) = ents.teacher_index(&pin.teacher) else {
            continue;
        };
        if let Some(&a) = vars.assign.get(&(di, ti)) {
            model = model.with(Expression::from(a).eq(1.0));
            *n += 1;
        }
        if let Some(&x) = vars.place.get(&(di, ti, pin.slot.day, pin.slot.period)) {
            model = model.with(Expression::from(x).eq(1.0));
            *n += 1;
        }
    }
    model
}
