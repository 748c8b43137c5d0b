//! School timetabling: recurring teaching sessions onto a weekly grid.
//!
//! Registrations are expanded into one-period sessions (merging small groups
//! that share a general subject), then placed by randomized-restart greedy
//! search. Each attempt fills the fixed activity slots first and then places
//! every (group, subject) bundle as contiguous blocks, least-loaded day first.
//! The attempt leaving the fewest sessions unassigned wins.
//!
//! # Modules
//!
//! - **`model`**: input records, sessions and assignments
//! - **`rules`**: `SchedulerConfig` and subject classification
//! - **`expand`**: registrations to sessions
//! - **`timeslots`**: the weekly grid
//! - **`engine`**: one attempt
//! - **`search`**: the restart loop
//! - **`export`**: the CSV artifact

pub mod engine;
pub mod error;
pub mod expand;
pub mod export;
pub mod model;
pub mod rules;
pub mod search;
pub mod timeslots;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{AttemptOutcome, Engine, SessionPlan};
pub use error::ScheduleErr;
pub use export::{ScheduleArtifact, ScheduleRow, expand_rows, read_schedule, write_schedule};
pub use model::{Assignment, Dataset, GroupKey, Registration, Session, StudentGroup, Subject, Teach, Timeslot};
pub use rules::SchedulerConfig;
pub use search::{SearchOutcome, schedule};
pub use timeslots::TimeslotIndex;
