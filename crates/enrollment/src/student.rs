//! Student enrollment state and the workflows that mutate it.
//!
//! A workflow validates business rules against the catalog while holding the
//! student's own lock, then asks one or two sections to move seats. The student
//! lock always encloses the section locks, never the other way around.

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::error::{EnrollmentError, InvariantViolation, Result};
use crate::intent::IntentSink;
use crate::section::{exam_times_conflict, Admission, Section, StudentCourseView, Transfer};
use crate::types::{CourseId, Gender, GroupId, StudentId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How long a student's enrollment window stays open.
pub const ENROLLMENT_WINDOW_MILLIS: i64 = 60 * 60 * 1000;

/// Everything a workflow needs besides the student itself.
#[derive(Clone, Copy)]
pub struct EnrollmentContext<'a> {
    pub catalog: &'a Catalog,
    pub sink: &'a dyn IntentSink,
    pub clock: &'a dyn Clock,
    /// Forwarded to the sink, the workflows never poll it
    pub cancel: &'a CancellationToken,
}

/// The static part of a student, as loaded at startup.
#[derive(Debug, Clone)]
pub struct StudentInfo {
    pub id: StudentId,
    pub gender: Gender,
    /// Unix milliseconds
    pub enrollment_start: i64,
    pub max_units: u16,
    pub remaining_actions: u8,
}

#[derive(Debug)]
struct Holdings {
    registered_units: u16,
    remaining_actions: u8,
    /// Course to the group the student holds in it
    courses: BTreeMap<CourseId, GroupId>,
}

/// A point-in-time copy of a student's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentSummary {
    pub id: StudentId,
    pub registered_units: u16,
    pub max_units: u16,
    pub remaining_actions: u8,
    pub courses: BTreeMap<CourseId, GroupId>,
}

#[derive(Debug)]
pub struct Student {
    id: StudentId,
    gender: Gender,
    enrollment_start: i64,
    max_units: u16,
    holdings: Mutex<Holdings>,
}

impl Student {
    /// Creates a student already holding `courses`, worth `registered_units` in total.
    pub fn new(
        info: StudentInfo,
        courses: BTreeMap<CourseId, GroupId>,
        registered_units: u16,
    ) -> Self {
        Self {
            id: info.id,
            gender: info.gender,
            enrollment_start: info.enrollment_start,
            max_units: info.max_units,
            holdings: Mutex::new(Holdings {
                registered_units,
                remaining_actions: info.remaining_actions,
                courses,
            }),
        }
    }

    pub fn id(&self) -> StudentId {
        self.id
    }

    /// The window is open strictly after its start and strictly before one hour later.
    pub fn is_enrollment_window_open(&self, now: DateTime<Utc>) -> bool {
        let now = now.timestamp_millis();
        now > self.enrollment_start && now < self.enrollment_start + ENROLLMENT_WINDOW_MILLIS
    }

    fn check_window(&self, cx: &EnrollmentContext<'_>) -> Result<()> {
        if self.is_enrollment_window_open(cx.clock.now()) {
            Ok(())
        } else {
            Err(EnrollmentError::NotEnrollmentTime)
        }
    }

    /// Enrolls the student in a section after checking every business rule.
    pub async fn enroll_course(
        &self,
        cx: &EnrollmentContext<'_>,
        course_id: CourseId,
        group_id: GroupId,
    ) -> Result<()> {
        self.check_window(cx)?;
        let section = cx
            .catalog
            .lookup(course_id, group_id)
            .ok_or(EnrollmentError::NotExists)?;
        // The lock of a section never changes after loading, no need to lock anything
        if !section.gender_lock().admits(self.gender) {
            return Err(EnrollmentError::GenderLock);
        }

        let mut holdings = self.holdings.lock().await;
        if holdings.registered_units + u16::from(section.units()) > self.max_units {
            return Err(EnrollmentError::UnitLimitReached);
        }
        if holdings.courses.contains_key(&course_id) {
            return Err(EnrollmentError::AlreadyRegistered);
        }
        self.check_conflicts(cx.catalog, &holdings.courses, None, &section)?;

        match section.try_admit(cx.cancel, self.id, cx.sink).await? {
            Admission::Full => return Err(EnrollmentError::NoCapacityLeft),
            Admission::Registered | Admission::Waitlisted => {}
        }
        holdings.registered_units += u16::from(section.units());
        holdings.courses.insert(course_id, group_id);
        Ok(())
    }

    /// Drops a course, consuming one remaining action.
    pub async fn disenroll_course(
        &self,
        cx: &EnrollmentContext<'_>,
        course_id: CourseId,
    ) -> Result<()> {
        self.check_window(cx)?;
        let mut holdings = self.holdings.lock().await;
        if holdings.remaining_actions == 0 {
            return Err(EnrollmentError::NoRemainingActions);
        }
        self.drop_held(cx, &mut holdings, course_id).await?;
        holdings.remaining_actions -= 1;
        Ok(())
    }

    /// Drops a course on behalf of staff. The window and the action budget are
    /// ignored and no action is consumed.
    pub async fn force_disenroll_course(
        &self,
        cx: &EnrollmentContext<'_>,
        course_id: CourseId,
    ) -> Result<()> {
        let mut holdings = self.holdings.lock().await;
        self.drop_held(cx, &mut holdings, course_id).await
    }

    async fn drop_held(
        &self,
        cx: &EnrollmentContext<'_>,
        holdings: &mut Holdings,
        course_id: CourseId,
    ) -> Result<()> {
        let group_id = *holdings
            .courses
            .get(&course_id)
            .ok_or(EnrollmentError::NotExists)?;
        let section = self.held_section(cx.catalog, course_id, group_id)?;
        section.remove(cx.cancel, self.id, cx.sink).await?;
        holdings.courses.remove(&course_id);
        holdings.registered_units = holdings
            .registered_units
            .saturating_sub(u16::from(section.units()));
        Ok(())
    }

    /// Moves the student to another group of a course they hold.
    pub async fn change_group(
        &self,
        cx: &EnrollmentContext<'_>,
        course_id: CourseId,
        destination_group: GroupId,
    ) -> Result<()> {
        self.check_window(cx)?;
        let mut holdings = self.holdings.lock().await;
        if holdings.remaining_actions == 0 {
            return Err(EnrollmentError::NoRemainingActions);
        }
        let source_group = *holdings
            .courses
            .get(&course_id)
            .ok_or(EnrollmentError::NotExists)?;
        if source_group == destination_group {
            return Err(EnrollmentError::PlayedYourself);
        }
        let source = self.held_section(cx.catalog, course_id, source_group)?;
        let destination = cx
            .catalog
            .lookup(course_id, destination_group)
            .ok_or(EnrollmentError::NotExists)?;
        if !destination.gender_lock().admits(self.gender) {
            return Err(EnrollmentError::GenderLock);
        }
        // Groups of one course normally carry the same units, but keep the total exact
        let units = (holdings.registered_units + u16::from(destination.units()))
            .saturating_sub(u16::from(source.units()));
        if destination.units() > source.units() && units > self.max_units {
            return Err(EnrollmentError::UnitLimitReached);
        }
        self.check_conflicts(cx.catalog, &holdings.courses, Some(course_id), &destination)?;

        match Section::transfer(cx.cancel, self.id, &source, &destination, cx.sink).await? {
            Transfer::Full => return Err(EnrollmentError::NoCapacityLeft),
            Transfer::Transferred => {}
        }
        holdings.remaining_actions -= 1;
        holdings.registered_units = units;
        holdings.courses.insert(course_id, destination_group);
        Ok(())
    }

    /// Enrolls the student on behalf of staff, growing the section if needed.
    ///
    /// Only existence and duplicate registration are checked.
    pub async fn force_enroll_course(
        &self,
        cx: &EnrollmentContext<'_>,
        course_id: CourseId,
        group_id: GroupId,
    ) -> Result<()> {
        let section = cx
            .catalog
            .lookup(course_id, group_id)
            .ok_or(EnrollmentError::NotExists)?;
        let mut holdings = self.holdings.lock().await;
        if holdings.courses.contains_key(&course_id) {
            return Err(EnrollmentError::AlreadyRegistered);
        }
        section.force_admit(cx.cancel, self.id, cx.sink).await?;
        holdings.registered_units = holdings
            .registered_units
            .saturating_add(u16::from(section.units()));
        holdings.courses.insert(course_id, group_id);
        Ok(())
    }

    /// Every held course with the student's place in it, ordered by course.
    pub async fn enrolled_courses(&self, catalog: &Catalog) -> Result<Vec<StudentCourseView>> {
        let holdings = self.holdings.lock().await;
        let mut result = Vec::with_capacity(holdings.courses.len());
        for (&course_id, &group_id) in &holdings.courses {
            let section = self.held_section(catalog, course_id, group_id)?;
            result.push(section.student_view(self.id).await?);
        }
        Ok(result)
    }

    pub async fn summary(&self) -> StudentSummary {
        let holdings = self.holdings.lock().await;
        StudentSummary {
            id: self.id,
            registered_units: holdings.registered_units,
            max_units: self.max_units,
            remaining_actions: holdings.remaining_actions,
            courses: holdings.courses.clone(),
        }
    }

    /// Checks exam and class times of `target` against every held course except `skip`.
    ///
    /// Courses are scanned in ID order and the first conflict wins.
    fn check_conflicts(
        &self,
        catalog: &Catalog,
        courses: &BTreeMap<CourseId, GroupId>,
        skip: Option<CourseId>,
        target: &Section,
    ) -> Result<()> {
        for (&course_id, &group_id) in courses {
            if Some(course_id) == skip {
                continue;
            }
            let held = self.held_section(catalog, course_id, group_id)?;
            if exam_times_conflict(held.exam_time(), target.exam_time()) {
                debug!(
                    "student {} exam conflict between {course_id}-{group_id} and {}-{}",
                    self.id,
                    target.course_id(),
                    target.group_id()
                );
                return Err(EnrollmentError::ExamConflict { course_id, group_id });
            }
            if held.schedule().overlaps(target.schedule()) {
                debug!(
                    "student {} class time conflict between {course_id}-{group_id} and {}-{}",
                    self.id,
                    target.course_id(),
                    target.group_id()
                );
                return Err(EnrollmentError::ClassTimeConflict { course_id, group_id });
            }
        }
        Ok(())
    }

    /// Resolves a section the student holds. A missing one is a consistency fault.
    fn held_section(
        &self,
        catalog: &Catalog,
        course_id: CourseId,
        group_id: GroupId,
    ) -> Result<Arc<Section>> {
        catalog.lookup(course_id, group_id).ok_or_else(|| {
            InvariantViolation::MissingSection {
                student_id: self.id,
                course_id,
                group_id,
            }
            .into()
        })
    }
}
