//! Test doubles and fixtures shared by the unit tests.

use crate::clock::Clock;
use crate::intent::{Intent, IntentSink, RoutedIntent, SinkError};
use crate::schedule::WeeklyTimeSlot;
use crate::section::{Section, SectionInfo};
use crate::student::{Student, StudentInfo};
use crate::types::{CourseId, DepartmentId, Gender, GenderLock, GroupId, StudentId};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// Records every acknowledged intent. Optionally starts failing after a number
/// of successful calls.
#[derive(Debug, Default)]
pub struct RecordingSink {
    recorded: Mutex<Vec<RoutedIntent>>,
    fail_after: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acknowledges `successes` intents, then rejects every following one.
    pub fn failing_after(successes: usize) -> Self {
        Self {
            recorded: Mutex::new(Vec::new()),
            fail_after: Some(successes),
        }
    }

    pub fn intents(&self) -> Vec<RoutedIntent> {
        self.recorded.lock().clone()
    }
}

#[async_trait]
impl IntentSink for RecordingSink {
    async fn enqueue(
        &self,
        _cancel: &CancellationToken,
        department: DepartmentId,
        intent: Intent,
    ) -> Result<(), SinkError> {
        let mut recorded = self.recorded.lock();
        if self.fail_after.is_some_and(|limit| recorded.len() >= limit) {
            return Err(SinkError::Rejected {
                reason: "test".to_string(),
            });
        }
        recorded.push(RoutedIntent { department, intent });
        Ok(())
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

/// 2022-09-12 09:00:00 UTC, the enrollment start used by the student fixtures.
pub fn window_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 9, 12, 9, 0, 0).unwrap()
}

pub fn section_info(course: i32, group: u8, capacity: usize, reserve: usize) -> SectionInfo {
    SectionInfo {
        course_id: CourseId(course),
        group_id: GroupId(group),
        department: DepartmentId(1),
        lecturer: "Dr. Test".to_string(),
        units: 3,
        capacity,
        reserve_capacity: reserve,
        exam_time: 0,
        schedule: WeeklyTimeSlot::default(),
        gender_lock: GenderLock::Unlocked,
    }
}

pub fn section(course: i32, group: u8, capacity: usize, reserve: usize) -> Section {
    Section::new(section_info(course, group, capacity, reserve))
}

pub fn student_info(id: u64) -> StudentInfo {
    StudentInfo {
        id: StudentId(id),
        gender: Gender::Male,
        enrollment_start: window_start().timestamp_millis(),
        max_units: 20,
        remaining_actions: 5,
    }
}

/// A student holding no courses.
pub fn student(id: u64) -> Student {
    Student::new(student_info(id), BTreeMap::new(), 0)
}
