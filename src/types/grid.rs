use crate::error::SchedulerError;
use serde::{Deserialize, Serialize};

/// A specific position in the week: 0-based day, 1-based period number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    /// Day of week (0 = Monday)
    pub day: u8,
    /// Period number within the day (1-based)
    pub period: u8,
}

impl Slot {
    pub fn new(day: u8, period: u8) -> Self {
        Self { day, period }
    }

    /// Short German day name
    pub fn day_name(&self) -> &'static str {
        match self.day {
            0 => "Mo",
            1 => "Di",
            2 => "Mi",
            3 => "Do",
            4 => "Fr",
            5 => "Sa",
            6 => "So",
            _ => "??",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.day_name(), self.period)
    }
}

/// One teaching period of the daily grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonSlot {
    /// Period number (1-based)
    pub period: u8,
    pub start: String,
    pub end: String,
    /// Only upper-secondary courses may use this period
    #[serde(default)]
    pub sek2_only: bool,
}

/// A non-teaching interval; breaks contiguity between `after_period`
/// and the following period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pause {
    pub after_period: u8,
    #[serde(default)]
    pub label: String,
}

/// The daily time grid, identical for all workdays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeGrid {
    /// Number of workdays (Monday-based)
    #[serde(default = "default_days")]
    pub days: u8,
    pub slots: Vec<LessonSlot>,
    #[serde(default)]
    pub pauses: Vec<Pause>,
    /// Period pairs `(p, p+1)` that may host a double lesson
    #[serde(default)]
    pub double_blocks: Vec<(u8, u8)>,
    pub sek1_max_period: u8,
    pub sek2_max_period: u8,
}

fn default_days() -> u8 {
    5
}

impl TimeGrid {
    /// The standard grid of a German Gymnasium: 8 periods, breaks after
    /// the 2nd and 4th, double blocks on the odd pairs, Sek-I ends after
    /// the 6th period.
    pub fn german_default() -> Self {
        let times = [
            ("08:00", "08:45"),
            ("08:50", "09:35"),
            ("09:55", "10:40"),
            ("10:45", "11:30"),
            ("11:50", "12:35"),
            ("12:40", "13:25"),
            ("13:30", "14:15"),
            ("14:20", "15:05"),
        ];
        TimeGrid {
            days: 5,
            slots: times
                .iter()
                .enumerate()
                .map(|(i, &(start, end))| LessonSlot {
                    period: i as u8 + 1,
                    start: start.to_string(),
                    end: end.to_string(),
                    sek2_only: i as u8 + 1 > 6,
                })
                .collect(),
            pauses: vec![
                Pause {
                    after_period: 2,
                    label: "Große Pause".to_string(),
                },
                Pause {
                    after_period: 4,
                    label: "Große Pause".to_string(),
                },
            ],
            double_blocks: vec![(1, 2), (3, 4), (5, 6), (7, 8)],
            sek1_max_period: 6,
            sek2_max_period: 8,
        }
    }

    /// All period numbers in grid order
    pub fn periods(&self) -> impl Iterator<Item = u8> + '_ {
        self.slots.iter().map(|s| s.period)
    }

    pub fn slot_def(&self, period: u8) -> Option<&LessonSlot> {
        self.slots.iter().find(|s| s.period == period)
    }

    pub fn is_sek2_only(&self, period: u8) -> bool {
        self.slot_def(period).map(|s| s.sek2_only).unwrap_or(false)
    }

    pub fn has_pause_after(&self, period: u8) -> bool {
        self.pauses.iter().any(|p| p.after_period == period)
    }

    pub fn is_double_start(&self, period: u8) -> bool {
        self.double_blocks.iter().any(|&(p, _)| p == period)
    }

    /// Construction-time invariant checks: strictly increasing 1-based
    /// periods, pauses and ceilings inside the grid, and double blocks
    /// `(p, p+1)` that never straddle a pause.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        let fail = |message: String| {
            Err(SchedulerError::InvalidInput {
                entity: "time_grid".to_string(),
                message,
            })
        };

        if self.days == 0 || self.days > 7 {
            return fail(format!("workday count {} out of range", self.days));
        }
        if self.slots.is_empty() {
            return fail("no lesson slots".to_string());
        }
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.period != i as u8 + 1 {
                return fail(format!(
                    "period numbers must be contiguous and 1-based, found {} at position {}",
                    slot.period, i
                ));
            }
        }
        let last = self.slots.len() as u8;
        if self.sek1_max_period == 0 || self.sek1_max_period > last {
            return fail(format!("sek1_max_period {} out of range", self.sek1_max_period));
        }
        if self.sek2_max_period < self.sek1_max_period || self.sek2_max_period > last {
            return fail(format!("sek2_max_period {} out of range", self.sek2_max_period));
        }
        for pause in &self.pauses {
            if pause.after_period == 0 || pause.after_period >= last {
                return fail(format!(
                    "pause after period {} is outside the grid",
                    pause.after_period
                ));
            }
        }
        for &(p, q) in &self.double_blocks {
            if q != p + 1 {
                return fail(format!("double block ({p}, {q}) is not a consecutive pair"));
            }
            if q > last {
                return fail(format!("double block ({p}, {q}) is outside the grid"));
            }
            if self.has_pause_after(p) {
                return fail(format!("double block ({p}, {q}) straddles a pause"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_is_valid() {
        let grid = TimeGrid::german_default();
        assert!(grid.validate().is_ok());
        assert_eq!(grid.slots.len(), 8);
        assert!(grid.is_double_start(1));
        assert!(!grid.is_double_start(2));
        assert!(grid.is_sek2_only(7));
    }

    #[test]
    fn test_double_block_across_pause_rejected() {
        let mut grid = TimeGrid::german_default();
        grid.double_blocks.push((2, 3)); // pause after 2
        let err = grid.validate().unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_slot_display() {
        assert_eq!(Slot::new(0, 3).to_string(), "Mo-3");
        assert_eq!(Slot::new(4, 1).to_string(), "Fr-1");
    }
}
