//! Error types for the enrollment workflows.

use crate::intent::SinkError;
use crate::types::{CourseId, GroupId, StudentId};
use thiserror::Error;

/// Errors returned by section and student operations.
///
/// Variants fall in three categories:
/// - business rejections, which the caller can correct
/// - [`EnrollmentError::Sink`], the durable intent could not be queued
/// - [`EnrollmentError::Invariant`], live state is inconsistent
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnrollmentError {
    /// The requested course or group does not exist, or the student does not hold it
    #[error("course does not exist")]
    NotExists,

    #[error("student {0} does not exist")]
    StudentNotFound(StudentId),

    /// The section is locked to the other gender
    #[error("you cannot pick up this course due to gender lock")]
    GenderLock,

    #[error("it's not your enrollment time")]
    NotEnrollmentTime,

    #[error("unit limit has been reached")]
    UnitLimitReached,

    #[error("you are already registered in this course")]
    AlreadyRegistered,

    #[error("exam conflict with course {course_id}-{group_id}")]
    ExamConflict { course_id: CourseId, group_id: GroupId },

    #[error("class time conflict with course {course_id}-{group_id}")]
    ClassTimeConflict { course_id: CourseId, group_id: GroupId },

    #[error("this course's capacity is filled")]
    NoCapacityLeft,

    #[error("no more remaining actions left")]
    NoRemainingActions,

    /// Source and destination of a group change are the same
    #[error("source and destination group ID is same")]
    PlayedYourself,

    #[error("new capacity {requested} is lower than the {registered} registered students")]
    CapacityBelowRegistered { requested: usize, registered: usize },

    #[error("cannot batch data: {0}")]
    Sink(#[from] SinkError),

    #[error("inconsistent state: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl EnrollmentError {
    /// Returns true for expected rejections that map to a client-correctable response.
    pub fn is_rejection(&self) -> bool {
        !self.is_infrastructure() && !self.is_fault()
    }

    /// Returns true if the durable intent could not be queued.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, EnrollmentError::Sink(_))
    }

    /// Returns true if the engine found its own state inconsistent.
    pub fn is_fault(&self) -> bool {
        matches!(self, EnrollmentError::Invariant(_))
    }
}

/// A broken cross-structure invariant between students and sections.
///
/// These are bugs in loading or in a previous mutation. They must never be
/// treated as a business outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("student {student_id} holds {course_id}-{group_id} but the section does not exist")]
    MissingSection {
        student_id: StudentId,
        course_id: CourseId,
        group_id: GroupId,
    },

    #[error("student {student_id} holds {course_id}-{group_id} but the section roster does not have them")]
    NotOnRoster {
        student_id: StudentId,
        course_id: CourseId,
        group_id: GroupId,
    },

    #[error("sections {course_id}-{first} and {course_id}-{second} cannot be used for a transfer")]
    InvalidTransfer {
        course_id: CourseId,
        first: GroupId,
        second: GroupId,
    },
}

pub type Result<T> = std::result::Result<T, EnrollmentError>;
