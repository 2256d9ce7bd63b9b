use crate::types::{SchoolClass, Slot, TimeGrid};
use std::collections::BTreeMap;

/// The bijection between `(day, period)` pairs and contiguous integer
/// indices, plus everything the builder derives from the grid: per-class
/// admissible periods, double-block starts, and the contiguity runs a
/// day's period sequence splits into at each pause.
#[derive(Debug, Clone)]
pub struct SlotIndex {
    days: u8,
    periods: Vec<u8>,
    sek2_only: Vec<u8>,
    sek1_max: u8,
    sek2_max: u8,
    double_starts: Vec<u8>,
    runs: Vec<Vec<u8>>,
    slots: Vec<Slot>,
    index: BTreeMap<(u8, u8), usize>,
}

impl SlotIndex {
    pub fn new(grid: &TimeGrid) -> Self {
        let periods: Vec<u8> = grid.periods().collect();
        let sek2_only: Vec<u8> = periods
            .iter()
            .copied()
            .filter(|&p| grid.is_sek2_only(p))
            .collect();
        let double_starts: Vec<u8> = grid.double_blocks.iter().map(|&(p, _)| p).collect();

        // Split the day's period sequence at pauses; a run is a maximal
        // pause-free subsequence.
        let mut runs: Vec<Vec<u8>> = Vec::new();
        let mut current: Vec<u8> = Vec::new();
        for &p in &periods {
            current.push(p);
            if grid.has_pause_after(p) {
                runs.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }

        let mut slots = Vec::with_capacity(grid.days as usize * periods.len());
        let mut index = BTreeMap::new();
        for day in 0..grid.days {
            for &p in &periods {
                index.insert((day, p), slots.len());
                slots.push(Slot::new(day, p));
            }
        }

        SlotIndex {
            days: grid.days,
            periods,
            sek2_only,
            sek1_max: grid.sek1_max_period,
            sek2_max: grid.sek2_max_period,
            double_starts,
            runs,
            slots,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn days(&self) -> u8 {
        self.days
    }

    pub fn periods(&self) -> &[u8] {
        &self.periods
    }

    pub fn index_of(&self, slot: Slot) -> Option<usize> {
        self.index.get(&(slot.day, slot.period)).copied()
    }

    pub fn slot_at(&self, index: usize) -> Slot {
        self.slots[index]
    }

    pub fn day_of(&self, index: usize) -> u8 {
        self.slots[index].day
    }

    /// Next active period on the same day, or `None` at the day's end.
    /// Spans pauses: the following period after a pause is still "next".
    pub fn next_in_day(&self, period: u8) -> Option<u8> {
        let pos = self.periods.iter().position(|&p| p == period)?;
        self.periods.get(pos + 1).copied()
    }

    pub fn is_sek2_only(&self, period: u8) -> bool {
        self.sek2_only.contains(&period)
    }

    pub fn double_starts(&self) -> &[u8] {
        &self.double_starts
    }

    pub fn is_double_start(&self, period: u8) -> bool {
        self.double_starts.contains(&period)
    }

    /// Maximal pause-free period subsequences of a day
    pub fn runs(&self) -> &[Vec<u8>] {
        &self.runs
    }

    /// Periods a class may use: bounded by its ceiling, Sek-II-only
    /// periods reserved for courses
    pub fn class_periods(&self, class: &SchoolClass) -> Vec<u8> {
        let ceiling = if class.is_course {
            self.sek2_max
        } else {
            self.sek1_max
        };
        let max_period = class.max_period.map(|p| p.min(ceiling)).unwrap_or(ceiling);
        self.periods
            .iter()
            .copied()
            .filter(|&p| p <= max_period && (class.is_course || !self.is_sek2_only(p)))
            .collect()
    }

    /// Periods a teacher may conceivably be active in
    pub fn teacher_periods(&self, can_teach_sek2: bool) -> Vec<u8> {
        self.periods
            .iter()
            .copied()
            .filter(|&p| can_teach_sek2 || !self.is_sek2_only(p))
            .collect()
    }

    /// All admissible `(day, period)` slots for a class, day-major order
    pub fn class_slots(&self, class: &SchoolClass) -> Vec<Slot> {
        let periods = self.class_periods(class);
        (0..self.days)
            .flat_map(|day| periods.iter().map(move |&p| Slot::new(day, p)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CourseType, TimeGrid};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn course(is_course: bool) -> SchoolClass {
        SchoolClass {
            id: "x".into(),
            grade: if is_course { 12 } else { 5 },
            curriculum: BTreeMap::new(),
            max_period: None,
            is_course,
            course_type: CourseType::None,
        }
    }

    #[test]
    fn test_runs_split_at_pauses() {
        let index = SlotIndex::new(&TimeGrid::german_default());
        // pauses after 2 and 4
        assert_eq!(index.runs(), &[vec![1, 2], vec![3, 4], vec![5, 6, 7, 8]]);
    }

    #[test]
    fn test_class_masks() {
        let index = SlotIndex::new(&TimeGrid::german_default());
        assert_eq!(index.class_periods(&course(false)), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(
            index.class_periods(&course(true)),
            vec![1, 2, 3, 4, 5, 6, 7, 8]
        );
        assert_eq!(index.class_slots(&course(false)).len(), 30);
    }

    #[test]
    fn test_next_in_day_spans_pauses() {
        let index = SlotIndex::new(&TimeGrid::german_default());
        assert_eq!(index.next_in_day(2), Some(3));
        assert_eq!(index.next_in_day(8), None);
    }

    proptest! {
        #[test]
        fn prop_index_is_a_bijection(day in 0u8..5, period in 1u8..=8) {
            let index = SlotIndex::new(&TimeGrid::german_default());
            let slot = Slot::new(day, period);
            let idx = index.index_of(slot).unwrap();
            prop_assert_eq!(index.slot_at(idx), slot);
            prop_assert_eq!(index.day_of(idx), day);
        }
    }
}
