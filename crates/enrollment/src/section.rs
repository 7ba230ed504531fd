//! One (course, group) offering and its seat accounting.
//!
//! A section owns its registered set and its bounded FIFO waitlist behind a
//! per-section lock. Every mutation queues a durable intent while holding that
//! lock and only changes memory after the sink acknowledged it.

use crate::error::{EnrollmentError, InvariantViolation, Result};
use crate::intent::{Intent, IntentSink};
use crate::schedule::WeeklyTimeSlot;
use crate::types::{CourseId, DepartmentId, GenderLock, GroupId, StudentId};
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// The static description of a section, as loaded at startup.
#[derive(Debug, Clone)]
pub struct SectionInfo {
    pub course_id: CourseId,
    pub group_id: GroupId,
    pub department: DepartmentId,
    pub lecturer: String,
    pub units: u8,
    pub capacity: usize,
    pub reserve_capacity: usize,
    /// Unix seconds, zero means there is no exam
    pub exam_time: i64,
    pub schedule: WeeklyTimeSlot,
    pub gender_lock: GenderLock,
}

/// Where a student ended up after asking for a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Registered,
    Waitlisted,
    Full,
}

/// Outcome of moving a student between two groups of one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Transferred,
    Full,
}

#[derive(Debug)]
struct Seats {
    capacity: usize,
    reserve_capacity: usize,
    registered: BTreeSet<StudentId>,
    waitlist: VecDeque<StudentId>,
}

impl Seats {
    /// What kind of slot the next student would get.
    fn vacancy(&self) -> Admission {
        if self.registered.len() < self.capacity {
            Admission::Registered
        } else if self.waitlist.len() < self.reserve_capacity {
            Admission::Waitlisted
        } else {
            Admission::Full
        }
    }

    fn place(&mut self, student: StudentId, slot: Admission) {
        match slot {
            Admission::Registered => {
                self.registered.insert(student);
            }
            Admission::Waitlisted => self.waitlist.push_back(student),
            Admission::Full => {}
        }
    }

    fn contains(&self, student: StudentId) -> bool {
        self.registered.contains(&student) || self.waitlist.contains(&student)
    }

    /// Removes the student. A freed registered seat goes to the waitlist head.
    fn take(&mut self, student: StudentId) -> bool {
        if self.registered.remove(&student) {
            if let Some(next) = self.waitlist.pop_front() {
                self.registered.insert(next);
            }
            return true;
        }
        match self.waitlist.iter().position(|&s| s == student) {
            Some(index) => {
                self.waitlist.remove(index);
                true
            }
            None => false,
        }
    }

    /// 0 for a registered student, otherwise the 1-indexed waitlist position.
    fn position(&self, student: StudentId) -> Option<usize> {
        if self.registered.contains(&student) {
            return Some(0);
        }
        self.waitlist
            .iter()
            .position(|&s| s == student)
            .map(|index| index + 1)
    }
}

/// A single group of a course.
#[derive(Debug)]
pub struct Section {
    course_id: CourseId,
    group_id: GroupId,
    department: DepartmentId,
    lecturer: String,
    units: u8,
    exam_time: AtomicI64,
    schedule: WeeklyTimeSlot,
    gender_lock: GenderLock,
    seats: Mutex<Seats>,
}

/// Public fields of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionView {
    pub course_id: CourseId,
    pub group_id: GroupId,
    pub department: DepartmentId,
    pub lecturer: String,
    pub units: u8,
    pub capacity: usize,
    pub reserve_capacity: usize,
    pub registered_count: usize,
    pub waitlist_count: usize,
    pub exam_time: i64,
    pub schedule: WeeklyTimeSlot,
}

/// Everyone holding a place in a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Roster {
    /// Registered students, ordered by ID
    pub registered: Vec<StudentId>,
    /// Waitlisted students, head first
    pub waitlist: Vec<StudentId>,
}

/// A section as seen by one of its students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentCourseView {
    pub course: SectionView,
    /// 0 if registered, otherwise the 1-indexed waitlist position
    pub waitlist_position: usize,
}

impl Section {
    pub fn new(info: SectionInfo) -> Self {
        Self {
            course_id: info.course_id,
            group_id: info.group_id,
            department: info.department,
            lecturer: info.lecturer,
            units: info.units,
            exam_time: AtomicI64::new(info.exam_time),
            schedule: info.schedule,
            gender_lock: info.gender_lock,
            seats: Mutex::new(Seats {
                capacity: info.capacity,
                reserve_capacity: info.reserve_capacity,
                registered: BTreeSet::new(),
                waitlist: VecDeque::new(),
            }),
        }
    }

    /// Seats a student that persisted state already places in this section.
    ///
    /// Registered seats fill first, then the waitlist. No intent is emitted.
    pub fn load_student(&mut self, student: StudentId) -> Admission {
        let seats = self.seats.get_mut();
        if seats.contains(student) {
            return Admission::Full;
        }
        let slot = seats.vacancy();
        seats.place(student, slot);
        slot
    }

    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn department(&self) -> DepartmentId {
        self.department
    }

    pub fn units(&self) -> u8 {
        self.units
    }

    pub fn schedule(&self) -> WeeklyTimeSlot {
        self.schedule
    }

    pub fn gender_lock(&self) -> GenderLock {
        self.gender_lock
    }

    /// Exam time in unix seconds, or zero when the section has no exam.
    pub fn exam_time(&self) -> i64 {
        self.exam_time.load(Ordering::Acquire)
    }

    pub fn set_exam_time(&self, exam_time: i64) {
        self.exam_time.store(exam_time, Ordering::Release);
    }

    /// Tries to give the student a registered seat, then a waitlist slot.
    ///
    /// This does not check conflicts, nor whether the student already holds a
    /// place here. Nothing is emitted when the section is full.
    pub async fn try_admit(
        &self,
        cancel: &CancellationToken,
        student: StudentId,
        sink: &dyn IntentSink,
    ) -> Result<Admission> {
        let mut seats = self.seats.lock().await;
        let slot = seats.vacancy();
        if slot == Admission::Full {
            return Ok(Admission::Full);
        }
        sink.enqueue(
            cancel,
            self.department,
            Intent::Enroll {
                student,
                course: self.course_id,
                group: self.group_id,
                reserved: slot == Admission::Waitlisted,
            },
        )
        .await?;
        seats.place(student, slot);
        debug!(
            "admitted student {student} into {}-{} as {slot:?}",
            self.course_id, self.group_id
        );
        Ok(slot)
    }

    /// Removes the student from the registered set or the waitlist.
    ///
    /// When a registered seat frees up the waitlist head takes it. That promotion
    /// is not emitted separately; the persistence worker derives it from the
    /// disenroll intent because the store keeps the same FIFO order.
    pub async fn remove(
        &self,
        cancel: &CancellationToken,
        student: StudentId,
        sink: &dyn IntentSink,
    ) -> Result<()> {
        let mut seats = self.seats.lock().await;
        if !seats.contains(student) {
            return Err(self.not_on_roster(student));
        }
        sink.enqueue(
            cancel,
            self.department,
            Intent::Disenroll {
                student,
                course: self.course_id,
            },
        )
        .await?;
        seats.take(student);
        debug!(
            "removed student {student} from {}-{}",
            self.course_id, self.group_id
        );
        Ok(())
    }

    /// Moves a student from `source` to `destination`, two groups of one course.
    ///
    /// Both locks are taken in ascending group order whichever side is the
    /// source, so concurrent transfers in opposite directions cannot deadlock.
    /// A single change-group intent covers both sides.
    pub async fn transfer(
        cancel: &CancellationToken,
        student: StudentId,
        source: &Section,
        destination: &Section,
        sink: &dyn IntentSink,
    ) -> Result<Transfer> {
        if source.course_id != destination.course_id || source.group_id == destination.group_id
        {
            return Err(InvariantViolation::InvalidTransfer {
                course_id: source.course_id,
                first: source.group_id,
                second: destination.group_id,
            }
            .into());
        }
        let (mut from, mut to) = if source.group_id < destination.group_id {
            let from = source.seats.lock().await;
            let to = destination.seats.lock().await;
            (from, to)
        } else {
            let to = destination.seats.lock().await;
            let from = source.seats.lock().await;
            (from, to)
        };
        if !from.contains(student) {
            return Err(source.not_on_roster(student));
        }
        let slot = to.vacancy();
        if slot == Admission::Full {
            return Ok(Transfer::Full);
        }
        sink.enqueue(
            cancel,
            source.department,
            Intent::ChangeGroup {
                student,
                course: source.course_id,
                group: destination.group_id,
            },
        )
        .await?;
        to.place(student, slot);
        from.take(student);
        debug!(
            "moved student {student} in course {} from group {} to {} as {slot:?}",
            source.course_id, source.group_id, destination.group_id
        );
        Ok(Transfer::Transferred)
    }

    /// Registers the student regardless of capacity.
    ///
    /// A full section grows by one seat first. The capacity change is kept even
    /// if the enroll intent then fails, because it was already recorded.
    pub async fn force_admit(
        &self,
        cancel: &CancellationToken,
        student: StudentId,
        sink: &dyn IntentSink,
    ) -> Result<()> {
        let mut seats = self.seats.lock().await;
        if seats.registered.len() >= seats.capacity {
            let new_capacity = seats.capacity + 1;
            sink.enqueue(
                cancel,
                self.department,
                Intent::UpdateCapacity {
                    course: self.course_id,
                    group: self.group_id,
                    new_capacity,
                    promoted: Vec::new(),
                },
            )
            .await?;
            seats.capacity = new_capacity;
            info!(
                "capacity of {}-{} raised to {new_capacity} for a forced enrollment",
                self.course_id, self.group_id
            );
        }
        sink.enqueue(
            cancel,
            self.department,
            Intent::Enroll {
                student,
                course: self.course_id,
                group: self.group_id,
                reserved: false,
            },
        )
        .await?;
        seats.registered.insert(student);
        debug!(
            "force admitted student {student} into {}-{}",
            self.course_id, self.group_id
        );
        Ok(())
    }

    /// Changes the capacity, promoting waitlisted students into new seats.
    ///
    /// Returns the promoted students in waitlist order.
    pub async fn change_capacity(
        &self,
        cancel: &CancellationToken,
        new_capacity: usize,
        sink: &dyn IntentSink,
    ) -> Result<Vec<StudentId>> {
        let mut seats = self.seats.lock().await;
        if new_capacity < seats.registered.len() {
            return Err(EnrollmentError::CapacityBelowRegistered {
                requested: new_capacity,
                registered: seats.registered.len(),
            });
        }
        if new_capacity == seats.capacity {
            return Ok(Vec::new());
        }
        let moving = new_capacity
            .saturating_sub(seats.capacity)
            .min(seats.waitlist.len());
        let promoted: Vec<StudentId> = seats.waitlist.iter().take(moving).copied().collect();
        sink.enqueue(
            cancel,
            self.department,
            Intent::UpdateCapacity {
                course: self.course_id,
                group: self.group_id,
                new_capacity,
                promoted: promoted.clone(),
            },
        )
        .await?;
        seats.waitlist.drain(..moving);
        seats.registered.extend(promoted.iter().copied());
        let old_capacity = std::mem::replace(&mut seats.capacity, new_capacity);
        info!(
            "capacity of {}-{} changed from {old_capacity} to {new_capacity}, promoted {} students",
            self.course_id,
            self.group_id,
            promoted.len()
        );
        Ok(promoted)
    }

    /// Returns 0 for a registered student, the 1-indexed waitlist position for a
    /// waitlisted one, and `None` if the student holds no place here.
    pub async fn waitlist_position(&self, student: StudentId) -> Option<usize> {
        self.seats.lock().await.position(student)
    }

    pub async fn view(&self) -> SectionView {
        let seats = self.seats.lock().await;
        self.view_of(&seats)
    }

    /// The section together with the student's place in it.
    ///
    /// A student that is not on the roster is a consistency fault.
    pub async fn student_view(&self, student: StudentId) -> Result<StudentCourseView> {
        let seats = self.seats.lock().await;
        let waitlist_position = seats
            .position(student)
            .ok_or_else(|| self.not_on_roster(student))?;
        Ok(StudentCourseView {
            course: self.view_of(&seats),
            waitlist_position,
        })
    }

    pub async fn roster(&self) -> Roster {
        let seats = self.seats.lock().await;
        Roster {
            registered: seats.registered.iter().copied().collect(),
            waitlist: seats.waitlist.iter().copied().collect(),
        }
    }

    fn view_of(&self, seats: &Seats) -> SectionView {
        SectionView {
            course_id: self.course_id,
            group_id: self.group_id,
            department: self.department,
            lecturer: self.lecturer.clone(),
            units: self.units,
            capacity: seats.capacity,
            reserve_capacity: seats.reserve_capacity,
            registered_count: seats.registered.len(),
            waitlist_count: seats.waitlist.len(),
            exam_time: self.exam_time(),
            schedule: self.schedule,
        }
    }

    fn not_on_roster(&self, student: StudentId) -> EnrollmentError {
        InvariantViolation::NotOnRoster {
            student_id: student,
            course_id: self.course_id,
            group_id: self.group_id,
        }
        .into()
    }
}

/// Two exams conflict when both exist and start at the same time.
pub fn exam_times_conflict(a: i64, b: i64) -> bool {
    a != 0 && b != 0 && a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{RoutedIntent, SinkError};
    use crate::testing::{section, section_info, RecordingSink};

    fn ids(raw: &[u64]) -> Vec<StudentId> {
        raw.iter().copied().map(StudentId).collect()
    }

    async fn admit(s: &Section, student: u64, sink: &RecordingSink) -> Admission {
        s.try_admit(&CancellationToken::new(), StudentId(student), sink)
            .await
            .unwrap()
    }

    #[test]
    fn test_exam_zero_never_conflicts() {
        assert!(!exam_times_conflict(0, 0));
        assert!(!exam_times_conflict(0, 1_700_000_000));
        assert!(!exam_times_conflict(1_700_000_000, 0));
        assert!(!exam_times_conflict(1, 2));
        assert!(exam_times_conflict(2, 2));
    }

    #[tokio::test]
    async fn test_fill_registered_then_waitlist_then_reject() {
        let s = section(1, 1, 10, 4);
        let sink = RecordingSink::new();
        for i in 0..10 {
            assert_eq!(admit(&s, i, &sink).await, Admission::Registered);
        }
        for i in 10..14 {
            assert_eq!(admit(&s, i, &sink).await, Admission::Waitlisted);
        }
        for i in 14..50 {
            assert_eq!(admit(&s, i, &sink).await, Admission::Full);
        }
        let roster = s.roster().await;
        assert_eq!(roster.registered, ids(&(0..10).collect::<Vec<u64>>()));
        assert_eq!(roster.waitlist, ids(&[10, 11, 12, 13]));
        // Rejections are not emitted
        assert_eq!(sink.intents().len(), 14);
    }

    #[tokio::test]
    async fn test_admit_emits_reserved_flag() {
        let s = Section::new(SectionInfo {
            department: DepartmentId(4),
            ..section_info(2, 3, 2, 2)
        });
        let sink = RecordingSink::new();
        for i in 0..4 {
            admit(&s, i, &sink).await;
        }
        let expected: Vec<RoutedIntent> = (0..4)
            .map(|i| RoutedIntent {
                department: DepartmentId(4),
                intent: Intent::Enroll {
                    student: StudentId(i),
                    course: CourseId(2),
                    group: GroupId(3),
                    reserved: i >= 2,
                },
            })
            .collect();
        assert_eq!(sink.intents(), expected);
    }

    #[tokio::test]
    async fn test_admit_sink_failure_leaves_section_untouched() {
        let s = section(2, 3, 2, 2);
        let sink = RecordingSink::failing_after(0);
        let err = s
            .try_admit(&CancellationToken::new(), StudentId(1), &sink)
            .await
            .unwrap_err();
        assert!(err.is_infrastructure());
        assert_eq!(s.roster().await, Roster { registered: vec![], waitlist: vec![] });
    }

    #[tokio::test]
    async fn test_remove_promotes_waitlist_head() {
        let mut s = section(1, 1, 2, 2);
        for i in [1, 2, 3, 4] {
            s.load_student(StudentId(i));
        }
        let sink = RecordingSink::new();
        s.remove(&CancellationToken::new(), StudentId(1), &sink)
            .await
            .unwrap();
        let roster = s.roster().await;
        assert_eq!(roster.registered, ids(&[2, 3]));
        assert_eq!(roster.waitlist, ids(&[4]));
        // Only the disenroll is emitted, the promotion of 3 is implied by it
        assert_eq!(
            sink.intents(),
            vec![RoutedIntent {
                department: DepartmentId(1),
                intent: Intent::Disenroll {
                    student: StudentId(1),
                    course: CourseId(1),
                },
            }]
        );
    }

    #[tokio::test]
    async fn test_remove_from_waitlist_keeps_order() {
        let mut s = section(1, 1, 1, 3);
        for i in [1, 2, 3, 4] {
            s.load_student(StudentId(i));
        }
        let sink = RecordingSink::new();
        s.remove(&CancellationToken::new(), StudentId(3), &sink)
            .await
            .unwrap();
        let roster = s.roster().await;
        assert_eq!(roster.registered, ids(&[1]));
        assert_eq!(roster.waitlist, ids(&[2, 4]));
    }

    #[tokio::test]
    async fn test_remove_unknown_student_is_fault() {
        let s = section(1, 1, 10, 4);
        let sink = RecordingSink::new();
        let err = s
            .remove(&CancellationToken::new(), StudentId(1), &sink)
            .await
            .unwrap_err();
        assert!(err.is_fault());
        assert!(sink.intents().is_empty());
    }

    #[tokio::test]
    async fn test_remove_sink_failure_leaves_section_untouched() {
        let mut s = section(1, 1, 2, 2);
        for i in [1, 2, 3, 4] {
            s.load_student(StudentId(i));
        }
        let before = s.roster().await;
        let sink = RecordingSink::failing_after(0);
        let err = s
            .remove(&CancellationToken::new(), StudentId(1), &sink)
            .await
            .unwrap_err();
        assert_eq!(err, EnrollmentError::Sink(SinkError::Rejected { reason: "test".into() }));
        assert_eq!(s.roster().await, before);
    }

    #[tokio::test]
    async fn test_transfer_into_registered_seat() {
        let mut from = section(1, 1, 1, 1);
        let to = section(1, 2, 1, 1);
        from.load_student(StudentId(7));
        let sink = RecordingSink::new();
        let outcome = Section::transfer(&CancellationToken::new(), StudentId(7), &from, &to, &sink)
            .await
            .unwrap();
        assert_eq!(outcome, Transfer::Transferred);
        assert!(from.roster().await.registered.is_empty());
        assert_eq!(to.roster().await.registered, ids(&[7]));
        assert_eq!(
            sink.intents(),
            vec![RoutedIntent {
                department: DepartmentId(1),
                intent: Intent::ChangeGroup {
                    student: StudentId(7),
                    course: CourseId(1),
                    group: GroupId(2),
                },
            }]
        );
    }

    #[tokio::test]
    async fn test_transfer_into_waitlist_and_promote_at_source() {
        let mut from = section(1, 5, 1, 1);
        let mut to = section(1, 2, 1, 1);
        from.load_student(StudentId(1));
        from.load_student(StudentId(2));
        to.load_student(StudentId(3));
        let sink = RecordingSink::new();
        let outcome = Section::transfer(&CancellationToken::new(), StudentId(1), &from, &to, &sink)
            .await
            .unwrap();
        assert_eq!(outcome, Transfer::Transferred);
        assert_eq!(from.roster().await, Roster { registered: ids(&[2]), waitlist: vec![] });
        assert_eq!(to.roster().await, Roster { registered: ids(&[3]), waitlist: ids(&[1]) });
        assert_eq!(sink.intents().len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_full_destination_emits_nothing() {
        let mut from = section(1, 1, 1, 0);
        let mut to = section(1, 2, 1, 0);
        from.load_student(StudentId(1));
        to.load_student(StudentId(2));
        let sink = RecordingSink::new();
        let outcome = Section::transfer(&CancellationToken::new(), StudentId(1), &from, &to, &sink)
            .await
            .unwrap();
        assert_eq!(outcome, Transfer::Full);
        assert!(sink.intents().is_empty());
        assert_eq!(from.roster().await.registered, ids(&[1]));
    }

    #[tokio::test]
    async fn test_transfer_rejects_mismatched_sections() {
        let mut a = section(1, 1, 1, 0);
        let b = section(2, 2, 1, 0);
        a.load_student(StudentId(1));
        let sink = RecordingSink::new();
        let cancel = CancellationToken::new();
        let err = Section::transfer(&cancel, StudentId(1), &a, &b, &sink)
            .await
            .unwrap_err();
        assert!(err.is_fault());
        let err = Section::transfer(&cancel, StudentId(1), &a, &a, &sink)
            .await
            .unwrap_err();
        assert!(err.is_fault());
        // Student not in the source
        let c = section(1, 3, 1, 0);
        let err = Section::transfer(&cancel, StudentId(9), &a, &c, &sink)
            .await
            .unwrap_err();
        assert!(err.is_fault());
    }

    #[tokio::test]
    async fn test_force_admit_grows_full_section() {
        let mut s = section(3, 1, 2, 0);
        s.load_student(StudentId(1));
        s.load_student(StudentId(2));
        let sink = RecordingSink::new();
        s.force_admit(&CancellationToken::new(), StudentId(3), &sink)
            .await
            .unwrap();
        let view = s.view().await;
        assert_eq!(view.capacity, 3);
        assert_eq!(view.registered_count, 3);
        assert_eq!(
            sink.intents().into_iter().map(|r| r.intent).collect::<Vec<_>>(),
            vec![
                Intent::UpdateCapacity {
                    course: CourseId(3),
                    group: GroupId(1),
                    new_capacity: 3,
                    promoted: vec![],
                },
                Intent::Enroll {
                    student: StudentId(3),
                    course: CourseId(3),
                    group: GroupId(1),
                    reserved: false,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_force_admit_with_free_seat_keeps_capacity() {
        let s = section(3, 1, 2, 0);
        let sink = RecordingSink::new();
        s.force_admit(&CancellationToken::new(), StudentId(3), &sink)
            .await
            .unwrap();
        assert_eq!(s.view().await.capacity, 2);
        assert_eq!(sink.intents().len(), 1);
    }

    #[tokio::test]
    async fn test_force_admit_enroll_failure_keeps_recorded_capacity() {
        let mut s = section(3, 1, 1, 0);
        s.load_student(StudentId(1));
        let sink = RecordingSink::failing_after(1);
        let err = s
            .force_admit(&CancellationToken::new(), StudentId(2), &sink)
            .await
            .unwrap_err();
        assert!(err.is_infrastructure());
        let view = s.view().await;
        assert_eq!(view.capacity, 2);
        assert_eq!(s.roster().await.registered, ids(&[1]));
    }

    #[tokio::test]
    async fn test_change_capacity_promotes_from_waitlist() {
        let mut s = section(4, 2, 2, 3);
        for i in 1..=5 {
            s.load_student(StudentId(i));
        }
        let sink = RecordingSink::new();
        let promoted = s
            .change_capacity(&CancellationToken::new(), 4, &sink)
            .await
            .unwrap();
        assert_eq!(promoted, ids(&[3, 4]));
        assert_eq!(s.roster().await, Roster { registered: ids(&[1, 2, 3, 4]), waitlist: ids(&[5]) });
        assert_eq!(
            sink.intents()[0].intent,
            Intent::UpdateCapacity {
                course: CourseId(4),
                group: GroupId(2),
                new_capacity: 4,
                promoted: ids(&[3, 4]),
            }
        );
    }

    #[tokio::test]
    async fn test_change_capacity_bounds() {
        let mut s = section(4, 2, 3, 3);
        for i in 1..=3 {
            s.load_student(StudentId(i));
        }
        let sink = RecordingSink::new();
        let cancel = CancellationToken::new();
        let err = s.change_capacity(&cancel, 2, &sink).await.unwrap_err();
        assert_eq!(
            err,
            EnrollmentError::CapacityBelowRegistered {
                requested: 2,
                registered: 3
            }
        );
        // Unchanged capacity is a no-op
        assert!(s.change_capacity(&cancel, 3, &sink).await.unwrap().is_empty());
        assert!(sink.intents().is_empty());
        // Growing with an empty waitlist promotes nobody
        assert!(s.change_capacity(&cancel, 10, &sink).await.unwrap().is_empty());
        assert_eq!(s.view().await.capacity, 10);
    }

    #[tokio::test]
    async fn test_change_capacity_sink_failure() {
        let mut s = section(4, 2, 1, 3);
        s.load_student(StudentId(1));
        s.load_student(StudentId(2));
        let sink = RecordingSink::failing_after(0);
        assert!(s
            .change_capacity(&CancellationToken::new(), 5, &sink)
            .await
            .unwrap_err()
            .is_infrastructure());
        let view = s.view().await;
        assert_eq!(view.capacity, 1);
        assert_eq!(view.waitlist_count, 1);
    }

    #[tokio::test]
    async fn test_waitlist_position_and_student_view() {
        let mut s = section(1, 1, 1, 2);
        for i in [1, 2, 3] {
            s.load_student(StudentId(i));
        }
        assert_eq!(s.waitlist_position(StudentId(1)).await, Some(0));
        assert_eq!(s.waitlist_position(StudentId(2)).await, Some(1));
        assert_eq!(s.waitlist_position(StudentId(3)).await, Some(2));
        assert_eq!(s.waitlist_position(StudentId(4)).await, None);
        let view = s.student_view(StudentId(3)).await.unwrap();
        assert_eq!(view.waitlist_position, 2);
        assert_eq!(view.course.registered_count, 1);
        assert!(s.student_view(StudentId(4)).await.unwrap_err().is_fault());
    }

    #[test]
    fn test_load_student_respects_bounds() {
        let mut s = section(1, 1, 1, 1);
        assert_eq!(s.load_student(StudentId(1)), Admission::Registered);
        assert_eq!(s.load_student(StudentId(1)), Admission::Full);
        assert_eq!(s.load_student(StudentId(2)), Admission::Waitlisted);
        assert_eq!(s.load_student(StudentId(3)), Admission::Full);
    }

    #[test]
    fn test_exam_time_is_updatable() {
        let s = section(1, 1, 1, 1);
        assert_eq!(s.exam_time(), 0);
        s.set_exam_time(1_700_000_000);
        assert_eq!(s.exam_time(), 1_700_000_000);
    }
}
