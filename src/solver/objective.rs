use crate::slots::SlotIndex;
use crate::solver::vars::{Entities, VarSet};
use crate::types::SoftWeights;
use good_lp::Expression;

/// Weighted penalty sum over the soft properties; rewards enter as
/// negative terms. Must be composed before the solver model is created.
pub fn compose(
    vars: &VarSet,
    ents: &Entities,
    index: &SlotIndex,
    weights: &SoftWeights,
) -> Expression {
    let mut objective = Expression::from(0.0);

    // every gap costs one unit, every gap beyond the first on a day
    // costs one more
    if weights.gaps > 0.0 {
        for cell in vars.gap_cells.values() {
            objective += weights.gaps * cell.gap;
        }
        for &excess in vars.gap_excess.values() {
            objective += weights.gaps * excess;
        }
    }

    // spread between the fullest and emptiest day per teacher
    if weights.workload > 0.0 {
        for &(max, min) in vars.load_span.values() {
            objective += weights.workload * max;
            objective += -weights.workload * min;
        }
    }

    // teaching on a wished-free day
    if weights.day_wishes > 0.0 {
        for &worked in vars.worked.values() {
            objective += weights.day_wishes * worked;
        }
    }

    // activity on the edge periods of a teacher's day
    if weights.compact > 0.0 {
        for (ti, teacher) in ents.teachers.iter().enumerate() {
            let periods = index.teacher_periods(teacher.can_teach_sek2);
            let (Some(&first), Some(&last)) = (periods.first(), periods.last()) else {
                continue;
            };
            for day in 0..index.days() {
                objective += weights.compact * vars.act_teacher(ti, day, first);
                if last != first {
                    objective += weights.compact * vars.act_teacher(ti, day, last);
                }
            }
        }
    }

    // reward optional double lessons
    if weights.double_lessons > 0.0 {
        for (&(di, _, _, _), &y) in &vars.double {
            let subject = ents.demands[di].subject;
            if subject.double_preferred && !subject.double_required {
                objective += -weights.double_lessons * y;
            }
        }
    }

    // Hauptfach hours beyond one per class-day
    if weights.subject_spread > 0.0 {
        for &over in vars.spread_over.values() {
            objective += weights.subject_spread * over;
        }
    }

    // deviation from the deputat target
    if weights.deputat_dev > 0.0 {
        for &dev in vars.dep_dev.values() {
            objective += weights.deputat_dev * dev;
        }
    }

    objective
}
