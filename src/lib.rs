//! Stundenplan - constraint-based weekly timetable generator for
//! German secondary schools (Sek I, optional Sek II courses)
//!
//! The solver decides jointly which teacher teaches which subject in
//! which class, and where each resulting lesson sits on the weekly
//! grid, honouring curricular hours, deputat bands, availability,
//! room-type capacities, cross-class couplings, course tracks,
//! double-lesson rules and pinned lessons.
//!
//! # Pipeline
//!
//! 1. **Audit**: static resource checks before any model is built
//! 2. **Build**: decision variables and hard constraints for HiGHS
//! 3. **Solve**: single-pass or adaptive two-pass, with cancellation
//! 4. **Decode**: variable values back into schedule entries, rooms
//!    assigned in a greedy post-pass with a CP fallback
//! 5. **Validate**: every invariant re-checked independently
//!
//! # Example
//!
//! ```no_run
//! use stundenplan::parser::load_model;
//! use stundenplan::solver::progress::{CancelToken, NullSink};
//! use std::path::Path;
//!
//! let model = load_model(Path::new("school.json")).unwrap();
//! let result = stundenplan::solver::solve(&model, &NullSink, &CancelToken::new()).unwrap();
//! println!("{} lessons placed", result.entries.len());
//! ```

pub mod audit;
pub mod error;
pub mod parser;
pub mod reporter;
pub mod slots;
pub mod solver;
pub mod types;
pub mod validator;

pub use error::{Result, SchedulerError};
