//! Service facade over the catalog and the student registry.
//!
//! Every request names its student by ID. The registrar resolves it, runs the
//! workflow, and logs failures by category before handing them back: sink
//! failures and consistency faults fail the single request but are logged loudly.

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::error::{EnrollmentError, Result};
use crate::intent::IntentSink;
use crate::section::{Roster, SectionView, StudentCourseView};
use crate::snapshot::LoadedState;
use crate::student::{EnrollmentContext, Student, StudentSummary};
use crate::types::{CourseId, DepartmentId, Departments, GroupId, StudentId};
use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub struct Registrar {
    catalog: Catalog,
    students: DashMap<StudentId, Arc<Student>>,
    departments: Departments,
    sink: Arc<dyn IntentSink>,
    clock: Arc<dyn Clock>,
}

impl Registrar {
    pub fn new(state: LoadedState, sink: Arc<dyn IntentSink>, clock: Arc<dyn Clock>) -> Self {
        let students = state
            .students
            .into_iter()
            .map(|student| (student.id(), Arc::new(student)))
            .collect();
        Self {
            catalog: state.catalog,
            students,
            departments: state.departments,
            sink,
            clock,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn departments(&self) -> &Departments {
        &self.departments
    }

    pub fn student_count(&self) -> usize {
        self.students.len()
    }

    /// Gets a student. The registry entry is released before returning.
    pub fn student(&self, id: StudentId) -> Result<Arc<Student>> {
        self.students
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(EnrollmentError::StudentNotFound(id))
    }

    fn context<'a>(&'a self, cancel: &'a CancellationToken) -> EnrollmentContext<'a> {
        EnrollmentContext {
            catalog: &self.catalog,
            sink: self.sink.as_ref(),
            clock: self.clock.as_ref(),
            cancel,
        }
    }

    pub async fn enroll_course(
        &self,
        cancel: &CancellationToken,
        student: StudentId,
        course_id: CourseId,
        group_id: GroupId,
    ) -> Result<()> {
        let result = match self.student(student) {
            Ok(s) => s.enroll_course(&self.context(cancel), course_id, group_id).await,
            Err(err) => Err(err),
        };
        observe("enroll", student, course_id, result)
    }

    pub async fn disenroll_course(
        &self,
        cancel: &CancellationToken,
        student: StudentId,
        course_id: CourseId,
    ) -> Result<()> {
        let result = match self.student(student) {
            Ok(s) => s.disenroll_course(&self.context(cancel), course_id).await,
            Err(err) => Err(err),
        };
        observe("disenroll", student, course_id, result)
    }

    pub async fn change_group(
        &self,
        cancel: &CancellationToken,
        student: StudentId,
        course_id: CourseId,
        group_id: GroupId,
    ) -> Result<()> {
        let result = match self.student(student) {
            Ok(s) => s.change_group(&self.context(cancel), course_id, group_id).await,
            Err(err) => Err(err),
        };
        observe("change group", student, course_id, result)
    }

    /// Staff only. Grows the section when it is full.
    pub async fn force_enroll_course(
        &self,
        cancel: &CancellationToken,
        student: StudentId,
        course_id: CourseId,
        group_id: GroupId,
    ) -> Result<()> {
        let result = match self.student(student) {
            Ok(s) => {
                s.force_enroll_course(&self.context(cancel), course_id, group_id)
                    .await
            }
            Err(err) => Err(err),
        };
        observe("force enroll", student, course_id, result)
    }

    /// Staff only. Ignores the enrollment window and the action budget.
    pub async fn force_disenroll_course(
        &self,
        cancel: &CancellationToken,
        student: StudentId,
        course_id: CourseId,
    ) -> Result<()> {
        let result = match self.student(student) {
            Ok(s) => s.force_disenroll_course(&self.context(cancel), course_id).await,
            Err(err) => Err(err),
        };
        observe("force disenroll", student, course_id, result)
    }

    /// Staff only. Returns the waitlisted students promoted into new seats.
    pub async fn change_capacity(
        &self,
        cancel: &CancellationToken,
        course_id: CourseId,
        group_id: GroupId,
        new_capacity: usize,
    ) -> Result<Vec<StudentId>> {
        let section = self
            .catalog
            .lookup(course_id, group_id)
            .ok_or(EnrollmentError::NotExists)?;
        let result = section
            .change_capacity(cancel, new_capacity, self.sink.as_ref())
            .await;
        if let Err(err) = &result {
            log_failure("change capacity", &format!("{course_id}-{group_id}"), err);
        }
        result
    }

    pub async fn student_courses(&self, student: StudentId) -> Result<Vec<StudentCourseView>> {
        let result = match self.student(student) {
            Ok(s) => s.enrolled_courses(&self.catalog).await,
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            log_failure("list courses", &format!("student {student}"), err);
        }
        result
    }

    pub async fn student_summary(&self, student: StudentId) -> Result<StudentSummary> {
        Ok(self.student(student)?.summary().await)
    }

    pub async fn section_roster(&self, course_id: CourseId, group_id: GroupId) -> Result<Roster> {
        let section = self
            .catalog
            .lookup(course_id, group_id)
            .ok_or(EnrollmentError::NotExists)?;
        Ok(section.roster().await)
    }

    /// Every section a department offers, ordered by course then group.
    pub async fn department_courses(&self, department: DepartmentId) -> Vec<SectionView> {
        let sections = self.catalog.sections_by_department(department);
        let mut result = Vec::with_capacity(sections.len());
        for section in sections {
            result.push(section.view().await);
        }
        result
    }
}

fn observe(
    action: &str,
    student: StudentId,
    course_id: CourseId,
    result: Result<()>,
) -> Result<()> {
    if let Err(err) = &result {
        log_failure(action, &format!("student {student} course {course_id}"), err);
    }
    result
}

fn log_failure(action: &str, target: &str, err: &EnrollmentError) {
    if err.is_infrastructure() {
        warn!("{action} failed for {target}: {err}");
    } else if err.is_fault() {
        error!("{action} hit an inconsistent state for {target}: {err}");
    } else {
        debug!("{action} rejected for {target}: {err}");
    }
}
