/// Directory of every section, keyed by course
use crate::section::Section;
use crate::types::{CourseId, DepartmentId, GroupId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps a course ID to the sections (groups) of that course.
///
/// The set of sections is fixed once loaded. The lock is only taken in shared
/// mode by lookups and is never held across an await.
#[derive(Debug, Default)]
pub struct Catalog {
    courses: RwLock<HashMap<CourseId, Vec<Arc<Section>>>>,
}

impl Catalog {
    pub fn new(courses: HashMap<CourseId, Vec<Arc<Section>>>) -> Self {
        Self {
            courses: RwLock::new(courses),
        }
    }

    /// Builds the directory from loose sections, keeping their order within a course.
    pub fn from_sections(sections: impl IntoIterator<Item = Section>) -> Self {
        let mut courses: HashMap<CourseId, Vec<Arc<Section>>> = HashMap::new();
        for section in sections {
            courses
                .entry(section.course_id())
                .or_default()
                .push(Arc::new(section));
        }
        Self::new(courses)
    }

    /// Gets a section by course and group. Linear in the groups of the course.
    pub fn lookup(&self, course_id: CourseId, group_id: GroupId) -> Option<Arc<Section>> {
        self.courses
            .read()
            .get(&course_id)?
            .iter()
            .find(|section| section.group_id() == group_id)
            .cloned()
    }

    /// All groups of one course.
    pub fn groups(&self, course_id: CourseId) -> Vec<Arc<Section>> {
        self.courses
            .read()
            .get(&course_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Sections offered by a department, ordered by course then group.
    pub fn sections_by_department(&self, department: DepartmentId) -> Vec<Arc<Section>> {
        let mut result: Vec<Arc<Section>> = self
            .courses
            .read()
            .values()
            .flatten()
            .filter(|section| section.department() == department)
            .cloned()
            .collect();
        result.sort_by_key(|section| (section.course_id(), section.group_id()));
        result
    }

    /// Number of sections across all courses.
    pub fn len(&self) -> usize {
        self.courses.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
