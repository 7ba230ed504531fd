/// Loading the engine from a persisted snapshot

mod types;

pub use types::{DepartmentRecord, HeldCourseRecord, ScheduleRecord, SectionRecord, StudentRecord};

use crate::catalog::Catalog;
use crate::schedule::WeeklyTimeSlot;
use crate::section::{Admission, Section, SectionInfo};
use crate::student::{Student, StudentInfo};
use crate::types::{CourseId, DepartmentId, Departments, GroupId, StudentId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read the snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse the snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("department {0} is listed twice")]
    DuplicateDepartment(DepartmentId),
    #[error("section {course_id}-{group_id} belongs to unknown department {department}")]
    UnknownDepartment {
        course_id: CourseId,
        group_id: GroupId,
        department: DepartmentId,
    },
    #[error("section {course_id}-{group_id} is listed twice")]
    DuplicateSection {
        course_id: CourseId,
        group_id: GroupId,
    },
    #[error("section {course_id}-{group_id} has an invalid schedule: {reason}")]
    InvalidSchedule {
        course_id: CourseId,
        group_id: GroupId,
        reason: String,
    },
    #[error("section {course_id}-{group_id} holds more students than its capacity and reserve")]
    OverfullSection {
        course_id: CourseId,
        group_id: GroupId,
    },
    #[error("student {0} is listed twice")]
    DuplicateStudent(StudentId),
    #[error("student {student_id} holds unknown section {course_id}-{group_id}")]
    UnknownSection {
        student_id: StudentId,
        course_id: CourseId,
        group_id: GroupId,
    },
    #[error("student {student_id} and the roster of {course_id}-{group_id} disagree")]
    RosterMismatch {
        student_id: StudentId,
        course_id: CourseId,
        group_id: GroupId,
    },
}

/// Everything the engine starts from.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub departments: Vec<DepartmentRecord>,
    #[serde(default)]
    pub sections: Vec<SectionRecord>,
    #[serde(default)]
    pub students: Vec<StudentRecord>,
}

/// A validated snapshot, ready to serve requests.
#[derive(Debug)]
pub struct LoadedState {
    pub departments: Departments,
    pub catalog: Catalog,
    pub students: Vec<Student>,
}

type SeatKey = (StudentId, CourseId, GroupId);

impl Snapshot {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Builds the in-memory state and cross-checks rosters against students.
    ///
    /// Every place on a roster must be claimed by exactly one held course of
    /// that student, and every held course must appear on its roster.
    pub fn build(self) -> Result<LoadedState, LoadError> {
        let mut departments = Departments::new();
        for record in self.departments {
            if departments.insert(record.id, record.name).is_some() {
                return Err(LoadError::DuplicateDepartment(record.id));
            }
        }

        let mut sections: BTreeMap<(CourseId, GroupId), Section> = BTreeMap::new();
        let mut seated: HashSet<SeatKey> = HashSet::new();
        for record in self.sections {
            let key = (record.course_id, record.group_id);
            if sections.contains_key(&key) {
                return Err(LoadError::DuplicateSection {
                    course_id: record.course_id,
                    group_id: record.group_id,
                });
            }
            let section = section_from_record(record, &departments, &mut seated)?;
            sections.insert(key, section);
        }

        let mut students = Vec::with_capacity(self.students.len());
        let mut seen = HashSet::new();
        for record in self.students {
            if !seen.insert(record.id) {
                return Err(LoadError::DuplicateStudent(record.id));
            }
            let mut courses = BTreeMap::new();
            let mut registered_units: u16 = 0;
            for held in &record.courses {
                let section = sections.get(&(held.course_id, held.group_id)).ok_or(
                    LoadError::UnknownSection {
                        student_id: record.id,
                        course_id: held.course_id,
                        group_id: held.group_id,
                    },
                )?;
                // A second group of the same course is a disagreement too
                if courses.insert(held.course_id, held.group_id).is_some()
                    || !seated.remove(&(record.id, held.course_id, held.group_id))
                {
                    return Err(LoadError::RosterMismatch {
                        student_id: record.id,
                        course_id: held.course_id,
                        group_id: held.group_id,
                    });
                }
                registered_units = registered_units.saturating_add(u16::from(section.units()));
            }
            let info = StudentInfo {
                id: record.id,
                gender: record.gender,
                enrollment_start: record.enrollment_start,
                max_units: record.max_units,
                remaining_actions: record.remaining_actions,
            };
            students.push(Student::new(info, courses, registered_units));
        }

        // Whatever is left on a roster has no student claiming it
        if let Some(&(student_id, course_id, group_id)) = seated.iter().min() {
            return Err(LoadError::RosterMismatch {
                student_id,
                course_id,
                group_id,
            });
        }

        let catalog = Catalog::from_sections(sections.into_values());
        info!(
            "loaded {} departments, {} sections and {} students",
            departments.len(),
            catalog.len(),
            students.len()
        );
        Ok(LoadedState {
            departments,
            catalog,
            students,
        })
    }
}

fn section_from_record(
    record: SectionRecord,
    departments: &Departments,
    seated: &mut HashSet<SeatKey>,
) -> Result<Section, LoadError> {
    let (course_id, group_id) = (record.course_id, record.group_id);
    if !departments.contains_key(&record.department) {
        return Err(LoadError::UnknownDepartment {
            course_id,
            group_id,
            department: record.department,
        });
    }
    let schedule = match record.schedule {
        Some(parts) => WeeklyTimeSlot::try_from(parts).map_err(|reason| {
            LoadError::InvalidSchedule {
                course_id,
                group_id,
                reason,
            }
        })?,
        None => WeeklyTimeSlot::default(),
    };
    let mut section = Section::new(SectionInfo {
        course_id,
        group_id,
        department: record.department,
        lecturer: record.lecturer,
        units: record.units,
        capacity: record.capacity,
        reserve_capacity: record.reserve_capacity,
        exam_time: record.exam_time.unwrap_or(0),
        schedule,
        gender_lock: record.gender_lock,
    });
    for student in record.students {
        if !seated.insert((student, course_id, group_id)) {
            return Err(LoadError::RosterMismatch {
                student_id: student,
                course_id,
                group_id,
            });
        }
        if section.load_student(student) == Admission::Full {
            return Err(LoadError::OverfullSection {
                course_id,
                group_id,
            });
        }
    }
    Ok(section)
}
