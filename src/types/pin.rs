use super::{ClassId, Slot, SubjectId, TeacherId};
use serde::{Deserialize, Serialize};

/// A caller-fixed lesson placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    pub teacher: TeacherId,
    pub class: ClassId,
    pub subject: SubjectId,
    pub slot: Slot,
}

impl std::fmt::Display for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} @ {}",
            self.teacher, self.class, self.subject, self.slot
        )
    }
}
