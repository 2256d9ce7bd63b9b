use super::{ClassId, CouplingId, SubjectId};
use serde::{Deserialize, Serialize};

/// What kind of parallel-class split this coupling models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouplingKind {
    /// Religion/Ethik split across a grade
    ReliEthik,
    /// Wahlpflichtfach lanes
    Wpf,
}

/// One subject group inside a coupling (e.g. "Ev. Religion")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingGroup {
    pub label: String,
    pub subject: SubjectId,
    pub hours: u32,
}

/// A parallel-class lesson: all involved classes are blocked at the same
/// slots while the student body splits into subject groups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupling {
    pub id: CouplingId,
    pub kind: CouplingKind,
    /// At least two classes of the same grade
    pub classes: Vec<ClassId>,
    pub groups: Vec<CouplingGroup>,
    pub hours_per_week: u32,
}

impl Coupling {
    pub fn involves(&self, class: &ClassId) -> bool {
        self.classes.contains(class)
    }

    /// The subjects whose curriculum hours this coupling delivers
    pub fn subjects(&self) -> impl Iterator<Item = &SubjectId> {
        self.groups.iter().map(|g| &g.subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_involves() {
        let coupling = Coupling {
            id: "reli-7".into(),
            kind: CouplingKind::ReliEthik,
            classes: vec!["7a".into(), "7b".into()],
            groups: vec![CouplingGroup {
                label: "Ethik".to_string(),
                subject: "Eth".into(),
                hours: 2,
            }],
            hours_per_week: 2,
        };
        assert!(coupling.involves(&"7a".into()));
        assert!(!coupling.involves(&"7c".into()));
        assert_eq!(coupling.subjects().count(), 1);
    }
}
