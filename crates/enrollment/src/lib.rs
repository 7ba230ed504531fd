//! In-memory course enrollment engine.
//!
//! Sections keep their registered set and waitlist behind per-section locks,
//! students keep their holdings behind per-student locks, and every mutation is
//! handed to an [`IntentSink`] before it becomes visible in memory.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod intent;
pub mod registrar;
pub mod schedule;
pub mod section;
pub mod snapshot;
pub mod student;
pub mod types;

#[cfg(test)]
mod testing;

pub use catalog::Catalog;
pub use clock::{Clock, SystemClock};
pub use config::EngineConfig;
pub use error::{EnrollmentError, InvariantViolation, Result};
pub use intent::{ChannelSink, Intent, IntentSink, RoutedIntent, SinkError};
pub use registrar::Registrar;
pub use schedule::WeeklyTimeSlot;
pub use section::{Admission, Section, SectionInfo, SectionView, Transfer};
pub use snapshot::{LoadError, LoadedState, Snapshot};
pub use student::{EnrollmentContext, Student, StudentInfo};
pub use types::{CourseId, DepartmentId, Departments, Gender, GenderLock, GroupId, StudentId};
