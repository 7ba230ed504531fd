/// Persisted records the engine is loaded from
use crate::schedule::SlotParts;
use crate::types::{CourseId, DepartmentId, Gender, GenderLock, GroupId, StudentId};
use serde::{Deserialize, Serialize};

pub type ScheduleRecord = SlotParts;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentRecord {
    pub id: DepartmentId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionRecord {
    pub course_id: CourseId,
    pub group_id: GroupId,
    pub department: DepartmentId,
    #[serde(default)]
    pub lecturer: String,
    pub units: u8,
    pub capacity: usize,
    #[serde(default)]
    pub reserve_capacity: usize,
    /// Unix milliseconds, absent when the course has no exam
    #[serde(default)]
    pub exam_time: Option<i64>,
    #[serde(default)]
    pub schedule: Option<ScheduleRecord>,
    #[serde(default)]
    pub gender_lock: GenderLock,
    /// Everyone holding a place, in enrollment order
    #[serde(default)]
    pub students: Vec<StudentId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldCourseRecord {
    pub course_id: CourseId,
    pub group_id: GroupId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: StudentId,
    /// Unix milliseconds
    pub enrollment_start: i64,
    pub max_units: u16,
    pub remaining_actions: u8,
    pub gender: Gender,
    #[serde(default)]
    pub courses: Vec<HeldCourseRecord>,
}
