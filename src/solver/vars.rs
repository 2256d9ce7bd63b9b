use crate::slots::SlotIndex;
use crate::types::{
    ClassId, Coupling, CourseTrack, DomainModel, SchoolClass, Slot, SoftWeights, Subject,
    SubjectId, Teacher, TeacherId,
};
use good_lp::{variable, Expression, ProblemVariables, Variable};
use std::collections::{BTreeMap, BTreeSet};

/// Hard-constraint families the relaxer can switch off
#[derive(Debug, Clone, Copy)]
pub struct Toggles {
    /// double-lesson counts and the odd-singleton rule
    pub doubles: bool,
    /// room-type capacities
    pub rooms: bool,
    /// couplings (drops the coupling variables entirely)
    pub couplings: bool,
    /// Sek-I prefix compactness
    pub compactness: bool,
    /// replace the deputat band by [0, weekly slots]
    pub relax_deputat: bool,
}

impl Default for Toggles {
    fn default() -> Self {
        Toggles {
            doubles: true,
            rooms: true,
            couplings: true,
            compactness: true,
            relax_deputat: false,
        }
    }
}

/// One (class, subject) lesson demand that needs a direct teacher;
/// coupled subjects are delivered through their coupling instead
#[derive(Debug, Clone)]
pub struct Demand<'a> {
    pub class: usize,
    pub subject: &'a Subject,
    pub hours: u32,
}

/// Entity vectors in stable id order; all variable keys are indices
/// into these, which keeps iteration deterministic across runs
pub struct Entities<'a> {
    pub teachers: Vec<&'a Teacher>,
    pub classes: Vec<&'a SchoolClass>,
    pub couplings: Vec<&'a Coupling>,
    pub tracks: Vec<&'a CourseTrack>,
    pub rooms: Vec<&'a crate::types::RoomType>,
    pub demands: Vec<Demand<'a>>,
    teacher_by_id: BTreeMap<&'a str, usize>,
    class_by_id: BTreeMap<&'a str, usize>,
    room_by_id: BTreeMap<&'a str, usize>,
    demand_by_cs: BTreeMap<(usize, &'a str), usize>,
}

impl<'a> Entities<'a> {
    pub fn new(model: &'a DomainModel) -> Self {
        let mut teachers: Vec<&Teacher> = model.teachers.iter().collect();
        teachers.sort_by(|a, b| a.id.cmp(&b.id));
        let mut classes: Vec<&SchoolClass> = model.classes.iter().collect();
        classes.sort_by(|a, b| a.id.cmp(&b.id));
        let mut couplings: Vec<&Coupling> = model.couplings.iter().collect();
        couplings.sort_by(|a, b| a.id.cmp(&b.id));
        let mut tracks: Vec<&CourseTrack> = model.tracks.iter().collect();
        tracks.sort_by(|a, b| a.id.cmp(&b.id));
        let mut rooms: Vec<&crate::types::RoomType> = model.rooms.iter().collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));

        let teacher_by_id = teachers
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.0.as_str(), i))
            .collect();
        let class_by_id: BTreeMap<&str, usize> = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.0.as_str(), i))
            .collect();
        let room_by_id = rooms
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.0.as_str(), i))
            .collect();

        let mut demands = Vec::new();
        let mut demand_by_cs = BTreeMap::new();
        for (ci, class) in classes.iter().enumerate() {
            for (subject_id, &hours) in &class.curriculum {
                if hours == 0 || model.is_coupled(&class.id, subject_id) {
                    continue;
                }
                let subject = model
                    .subject(subject_id)
                    .expect("validated curriculum subject");
                demand_by_cs.insert((ci, subject_id.0.as_str()), demands.len());
                demands.push(Demand {
                    class: ci,
                    subject,
                    hours,
                });
            }
        }

        Entities {
            teachers,
            classes,
            couplings,
            tracks,
            rooms,
            demands,
            teacher_by_id,
            class_by_id,
            room_by_id,
            demand_by_cs,
        }
    }

    pub fn teacher_index(&self, id: &TeacherId) -> Option<usize> {
        self.teacher_by_id.get(id.0.as_str()).copied()
    }

    pub fn class_index(&self, id: &ClassId) -> Option<usize> {
        self.class_by_id.get(id.0.as_str()).copied()
    }

    pub fn room_index(&self, id: &crate::types::RoomTypeId) -> Option<usize> {
        self.room_by_id.get(id.0.as_str()).copied()
    }

    pub fn demand_index(&self, class: &ClassId, subject: &SubjectId) -> Option<usize> {
        let ci = self.class_index(class)?;
        self.demand_by_cs.get(&(ci, subject.0.as_str())).copied()
    }
}

/// Occupancy-prefix, occupancy-suffix and gap indicator for one period
/// of a teacher-day; all continuous in [0, 1], pinned by their bounds
#[derive(Debug, Clone, Copy)]
pub struct GapCell {
    pub before: Variable,
    pub after: Variable,
    pub gap: Variable,
}

/// The complete decision-variable set plus the adjacency lists the
/// constraint builder aggregates over
#[derive(Default)]
pub struct VarSet {
    /// a[t,c,s] keyed (demand, teacher)
    pub assign: BTreeMap<(usize, usize), Variable>,
    /// x[t,c,s,d,p] keyed (demand, teacher, day, period)
    pub place: BTreeMap<(usize, usize, u8, u8), Variable>,
    /// y[t,c,s,d,p] keyed (demand, teacher, day, start period)
    pub double: BTreeMap<(usize, usize, u8, u8), Variable>,
    /// u[k,d,p]
    pub couple_slot: BTreeMap<(usize, u8, u8), Variable>,
    /// g[k,i,t]
    pub group_teacher: BTreeMap<(usize, usize, usize), Variable>,
    /// Linearised u AND g: the group teacher is busy at the slot
    pub group_busy: BTreeMap<(usize, usize, usize, u8, u8), Variable>,

    // Adjacency lists (aggregation views over the maps above)
    pub x_teacher: BTreeMap<(usize, u8, u8), Vec<Variable>>,
    pub x_class: BTreeMap<(usize, u8, u8), Vec<Variable>>,
    pub x_room: BTreeMap<(usize, u8, u8), Vec<Variable>>,
    pub u_class: BTreeMap<(usize, u8, u8), Vec<Variable>>,
    pub u_room: BTreeMap<(usize, u8, u8), Vec<Variable>>,
    pub busy_teacher: BTreeMap<(usize, u8, u8), Vec<Variable>>,
    pub teacher_load: BTreeMap<usize, Vec<Variable>>,
    pub group_load: BTreeMap<usize, Vec<(u32, Variable)>>,

    // Auxiliary variables
    pub gap_cells: BTreeMap<(usize, u8, u8), GapCell>,
    pub gap_excess: BTreeMap<(usize, u8), Variable>,
    pub load_span: BTreeMap<usize, (Variable, Variable)>,
    pub dep_dev: BTreeMap<usize, Variable>,
    pub worked: BTreeMap<(usize, u8), Variable>,
    pub spread_over: BTreeMap<(usize, u8), Variable>,
    pub day_double: BTreeMap<(usize, u8), Variable>,

    pub num_variables: usize,
}

impl VarSet {
    /// Create every decision and auxiliary variable. `fixed_assign`
    /// narrows teacher choice per demand (pass 2 of the two-pass
    /// strategy); variable creation order is deterministic.
    pub fn build(
        pv: &mut ProblemVariables,
        model: &DomainModel,
        ents: &Entities,
        index: &SlotIndex,
        weights: &SoftWeights,
        toggles: &Toggles,
        fixed_assign: Option<&BTreeMap<usize, usize>>,
    ) -> Self {
        let mut vars = VarSet::default();

        vars.build_placements(pv, ents, index, fixed_assign);
        if toggles.couplings {
            vars.build_couplings(pv, model, ents, index);
        }
        vars.build_gap_machinery(pv, ents, index, weights);
        vars.build_soft_aux(pv, ents, index, weights, toggles);

        vars
    }

    fn add_binary(&mut self, pv: &mut ProblemVariables) -> Variable {
        self.num_variables += 1;
        pv.add(variable().binary())
    }

    fn add_unit(&mut self, pv: &mut ProblemVariables) -> Variable {
        self.num_variables += 1;
        pv.add(variable().min(0.0).max(1.0))
    }

    fn add_nonneg(&mut self, pv: &mut ProblemVariables) -> Variable {
        self.num_variables += 1;
        pv.add(variable().min(0.0))
    }

    fn build_placements(
        &mut self,
        pv: &mut ProblemVariables,
        ents: &Entities,
        index: &SlotIndex,
        fixed_assign: Option<&BTreeMap<usize, usize>>,
    ) {
        for (di, demand) in ents.demands.iter().enumerate() {
            let class = ents.classes[demand.class];
            let class_slots = index.class_slots(class);
            for (ti, teacher) in ents.teachers.iter().enumerate() {
                if !teacher.qualified_for(&demand.subject.id) {
                    continue;
                }
                if class.is_course && !teacher.can_teach_sek2 {
                    continue;
                }
                if let Some(fixed) = fixed_assign {
                    if fixed.get(&di) != Some(&ti) {
                        continue;
                    }
                }

                let a = self.add_binary(pv);
                self.assign.insert((di, ti), a);

                for &slot in &class_slots {
                    if !teacher.is_available(slot) {
                        continue;
                    }
                    let x = self.add_binary(pv);
                    self.place.insert((di, ti, slot.day, slot.period), x);
                    self.x_teacher
                        .entry((ti, slot.day, slot.period))
                        .or_default()
                        .push(x);
                    self.x_class
                        .entry((demand.class, slot.day, slot.period))
                        .or_default()
                        .push(x);
                    if let Some(room) = &demand.subject.room_type {
                        if let Some(ri) = ents.room_index(room) {
                            self.x_room
                                .entry((ri, slot.day, slot.period))
                                .or_default()
                                .push(x);
                        }
                    }
                    self.teacher_load.entry(ti).or_default().push(x);
                }

                if demand.subject.wants_double_vars() {
                    for day in 0..index.days() {
                        for &p in index.double_starts() {
                            let first = Slot::new(day, p);
                            let second = Slot::new(day, p + 1);
                            let both_placed = self.place.contains_key(&(di, ti, day, p))
                                && self.place.contains_key(&(di, ti, day, p + 1));
                            if both_placed
                                && teacher.is_available(first)
                                && teacher.is_available(second)
                            {
                                let y = self.add_binary(pv);
                                self.double.insert((di, ti, day, p), y);
                            }
                        }
                    }
                }
            }
        }
    }

    fn build_couplings(
        &mut self,
        pv: &mut ProblemVariables,
        model: &DomainModel,
        ents: &Entities,
        index: &SlotIndex,
    ) {
        for (ki, coupling) in ents.couplings.iter().enumerate() {
            // A coupling slot must be admissible for every involved class
            let mut shared: Option<BTreeSet<Slot>> = None;
            for class_id in &coupling.classes {
                let ci = ents.class_index(class_id).expect("validated class");
                let slots: BTreeSet<Slot> = index.class_slots(ents.classes[ci]).into_iter().collect();
                shared = Some(match shared {
                    None => slots,
                    Some(prev) => prev.intersection(&slots).copied().collect(),
                });
            }
            let any_course = coupling
                .classes
                .iter()
                .any(|c| model.school_class(c).map(|c| c.is_course).unwrap_or(false));

            let slots = shared.unwrap_or_default();
            for &slot in &slots {
                let u = self.add_binary(pv);
                self.couple_slot.insert((ki, slot.day, slot.period), u);
                for class_id in &coupling.classes {
                    let ci = ents.class_index(class_id).expect("validated class");
                    self.u_class
                        .entry((ci, slot.day, slot.period))
                        .or_default()
                        .push(u);
                }
                for group in &coupling.groups {
                    let subject = model.subject(&group.subject).expect("validated subject");
                    if let Some(room) = &subject.room_type {
                        if let Some(ri) = ents.room_index(room) {
                            self.u_room
                                .entry((ri, slot.day, slot.period))
                                .or_default()
                                .push(u);
                        }
                    }
                }
            }

            for (gi, group) in coupling.groups.iter().enumerate() {
                for (ti, teacher) in ents.teachers.iter().enumerate() {
                    if !teacher.qualified_for(&group.subject) {
                        continue;
                    }
                    if any_course && !teacher.can_teach_sek2 {
                        continue;
                    }
                    let g = self.add_binary(pv);
                    self.group_teacher.insert((ki, gi, ti), g);
                    self.group_load
                        .entry(ti)
                        .or_default()
                        .push((coupling.hours_per_week, g));

                    for &slot in &slots {
                        if !teacher.is_available(slot) {
                            // the group teacher must be free whenever the
                            // coupling runs; an unavailable slot forbids u
                            continue;
                        }
                        let busy = self.add_unit(pv);
                        self.group_busy
                            .insert((ki, gi, ti, slot.day, slot.period), busy);
                        self.busy_teacher
                            .entry((ti, slot.day, slot.period))
                            .or_default()
                            .push(busy);
                    }
                }
            }
        }
    }

    fn build_gap_machinery(
        &mut self,
        pv: &mut ProblemVariables,
        ents: &Entities,
        index: &SlotIndex,
        weights: &SoftWeights,
    ) {
        for (ti, teacher) in ents.teachers.iter().enumerate() {
            if !(teacher.has_gap_limits() || weights.gaps > 0.0) {
                continue;
            }
            let runs = teacher_runs(index, teacher.can_teach_sek2);
            // a gap needs active-free-active inside one run
            let gap_possible = runs.iter().any(|r| r.len() >= 3);
            if !gap_possible {
                continue;
            }
            for day in 0..index.days() {
                for run in runs.iter().filter(|r| r.len() >= 3) {
                    for &p in run {
                        let cell = GapCell {
                            before: self.add_unit(pv),
                            after: self.add_unit(pv),
                            gap: self.add_unit(pv),
                        };
                        self.gap_cells.insert((ti, day, p), cell);
                    }
                }
                if weights.gaps > 0.0 {
                    let excess = self.add_nonneg(pv);
                    self.gap_excess.insert((ti, day), excess);
                }
            }
        }
    }

    fn build_soft_aux(
        &mut self,
        pv: &mut ProblemVariables,
        ents: &Entities,
        index: &SlotIndex,
        weights: &SoftWeights,
        toggles: &Toggles,
    ) {
        for (ti, teacher) in ents.teachers.iter().enumerate() {
            if weights.workload > 0.0 {
                let max = self.add_nonneg(pv);
                let min = self.add_nonneg(pv);
                self.load_span.insert(ti, (max, min));
            }
            if weights.deputat_dev > 0.0 {
                let dev = self.add_nonneg(pv);
                self.dep_dev.insert(ti, dev);
            }
            if weights.day_wishes > 0.0 {
                for &day in &teacher.preferred_free_days {
                    if day < index.days() {
                        let worked = self.add_binary(pv);
                        self.worked.insert((ti, day), worked);
                    }
                }
            }
        }

        for (di, demand) in ents.demands.iter().enumerate() {
            if weights.subject_spread > 0.0 && demand.subject.hauptfach && demand.hours >= 2 {
                for day in 0..index.days() {
                    let over = self.add_nonneg(pv);
                    self.spread_over.insert((di, day), over);
                }
            }
            if toggles.doubles
                && demand.subject.double_required
                && demand.hours >= 3
                && demand.hours % 2 == 1
            {
                for day in 0..index.days() {
                    let dd = self.add_unit(pv);
                    self.day_double.insert((di, day), dd);
                }
            }
        }
    }

    /// Class activity at a slot as a linear expression; the
    /// no-double-booking constraint keeps it 0/1
    pub fn act_class(&self, class: usize, day: u8, period: u8) -> Expression {
        let mut expr = Expression::default();
        if let Some(xs) = self.x_class.get(&(class, day, period)) {
            expr += sum_vars(xs);
        }
        if let Some(us) = self.u_class.get(&(class, day, period)) {
            expr += sum_vars(us);
        }
        expr
    }

    /// Teacher activity at a slot; the no-double-booking constraint
    /// keeps it 0/1
    pub fn act_teacher(&self, teacher: usize, day: u8, period: u8) -> Expression {
        let mut expr = Expression::default();
        if let Some(xs) = self.x_teacher.get(&(teacher, day, period)) {
            expr += sum_vars(xs);
        }
        if let Some(busy) = self.busy_teacher.get(&(teacher, day, period)) {
            expr += sum_vars(busy);
        }
        expr
    }

    /// Weekly teaching hours of a teacher, coupling groups included
    pub fn load_expr(&self, teacher: usize) -> Expression {
        let mut expr = Expression::default();
        if let Some(xs) = self.teacher_load.get(&teacher) {
            expr += sum_vars(xs);
        }
        if let Some(gs) = self.group_load.get(&teacher) {
            for (hours, g) in gs {
                expr += *hours as f64 * *g;
            }
        }
        expr
    }

    /// All placement vars of one demand, in key order
    pub fn places_for_demand(
        &self,
        demand: usize,
    ) -> impl Iterator<Item = (&(usize, usize, u8, u8), &Variable)> {
        self.place
            .range((demand, 0, 0, 0)..=(demand, usize::MAX, u8::MAX, u8::MAX))
    }

    pub fn doubles_for_demand(
        &self,
        demand: usize,
    ) -> impl Iterator<Item = (&(usize, usize, u8, u8), &Variable)> {
        self.double
            .range((demand, 0, 0, 0)..=(demand, usize::MAX, u8::MAX, u8::MAX))
    }
}

/// Sum a slice of binaries into an expression
pub fn sum_vars(vars: &[Variable]) -> Expression {
    vars.iter().copied().map(Expression::from).sum()
}

/// The contiguity runs a teacher can actually reach (Sek-II-only tail
/// periods drop out for teachers without the capability)
pub fn teacher_runs(index: &SlotIndex, can_teach_sek2: bool) -> Vec<Vec<u8>> {
    let reachable = index.teacher_periods(can_teach_sek2);
    index
        .runs()
        .iter()
        .map(|run| {
            run.iter()
                .copied()
                .filter(|p| reachable.contains(p))
                .collect::<Vec<_>>()
        })
        .filter(|run: &Vec<u8>| !run.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CourseType, SchoolClass, SoftWeights, SolverLimits, Subject, SubjectCategory, Teacher, TimeGrid};
    use std::collections::BTreeMap as Map;

    fn model() -> DomainModel {
        let subject = Subject {
            id: "Ma".into(),
            name: "Mathematik".to_string(),
            category: SubjectCategory::Hauptfach,
            room_type: None,
            double_required: false,
            double_preferred: false,
            hauptfach: true,
        };
        let teacher = Teacher {
            id: "MÜL".into(),
            name: "Müller".to_string(),
            subjects: vec!["Ma".into()],
            deputat: 4,
            deputat_min: Some(0),
            deputat_max: Some(8),
            unavailable: vec![Slot::new(0, 1)],
            preferred_free_days: vec![],
            max_hours_per_day: None,
            max_gaps_per_day: None,
            max_gaps_per_week: None,
            can_teach_sek2: false,
        };
        let class = SchoolClass {
            id: "5a".into(),
            grade: 5,
            curriculum: [(SubjectId::from("Ma"), 4)].into_iter().collect::<Map<_, _>>(),
            max_period: None,
            is_course: false,
            course_type: CourseType::None,
        };
        DomainModel {
            grid: TimeGrid::german_default(),
            subjects: vec![subject],
            rooms: vec![],
            classes: vec![class],
            teachers: vec![teacher],
            couplings: vec![],
            tracks: vec![],
            pins: vec![],
            weights: SoftWeights::zeroed(),
            limits: SolverLimits::default(),
        }
    }

    #[test]
    fn test_unavailable_slots_get_no_place_vars() {
        let model = model();
        let ents = Entities::new(&model);
        let index = SlotIndex::new(&model.grid);
        let mut pv = ProblemVariables::new();
        let vars = VarSet::build(
            &mut pv,
            &model,
            &ents,
            &index,
            &model.weights,
            &Toggles::default(),
            None,
        );

        assert_eq!(vars.assign.len(), 1);
        // 6 Sek-I periods x 5 days minus the one unavailable slot
        assert_eq!(vars.place.len(), 29);
        assert!(!vars.place.contains_key(&(0, 0, 0, 1)));
    }

    #[test]
    fn test_hauptfach_demand_gets_double_vars() {
        let model = model();
        let ents = Entities::new(&model);
        let index = SlotIndex::new(&model.grid);
        let mut pv = ProblemVariables::new();
        let vars = VarSet::build(
            &mut pv,
            &model,
            &ents,
            &index,
            &model.weights,
            &Toggles::default(),
            None,
        );

        // double starts 1/3/5 inside the Sek-I mask; (0,1) is blocked so
        // day 0 loses the (1,2) block
        assert_eq!(vars.double.len(), 14);
        assert!(!vars.double.contains_key(&(0, 0, 0, 1)));
        assert!(vars.double.contains_key(&(0, 0, 1, 1)));
    }

    #[test]
    fn test_teacher_runs_respect_sek2() {
        let index = SlotIndex::new(&TimeGrid::german_default());
        assert_eq!(teacher_runs(&index, false), vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
        assert_eq!(
            teacher_runs(&index, true),
            vec![vec![1, 2], vec![3, 4], vec![5, 6, 7, 8]]
        );
    }
}
