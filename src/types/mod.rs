mod coupling;
mod grid;
mod model;
mod pin;
mod room;
mod schedule;
mod school_class;
mod subject;
mod teacher;
mod track;
mod weights;

pub use coupling::*;
pub use grid::*;
pub use model::*;
pub use pin::*;
pub use room::*;
pub use schedule::*;
pub use school_class::*;
pub use subject::*;
pub use teacher::*;
pub use track::*;
pub use weights::*;

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

id_type!(
    /// Newtype for teacher identifiers (the "Kürzel", e.g. "MÜL")
    TeacherId
);
id_type!(
    /// Newtype for class identifiers (e.g. "5a", "12-LK-M1")
    ClassId
);
id_type!(
    /// Newtype for subject identifiers (the short code, e.g. "Ma")
    SubjectId
);
id_type!(
    /// Newtype for room type identifiers (e.g. "nw", "sport")
    RoomTypeId
);
id_type!(
    /// Newtype for coupling identifiers
    CouplingId
);
id_type!(
    /// Newtype for course track identifiers
    TrackId
);
