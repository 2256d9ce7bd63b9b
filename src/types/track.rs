use super::{ClassId, TrackId};
use serde::{Deserialize, Serialize};

/// A Kursschiene: courses that run in lock-step on identical slots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseTrack {
    pub id: TrackId,
    /// At least two classes with `is_course = true`
    pub courses: Vec<ClassId>,
    pub hours_per_week: u32,
}
