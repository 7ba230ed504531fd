/// Identifier and eligibility types shared by the enrollment engine
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The ID of a course. Every group of a course shares this ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(pub i32);

/// The ID of one group (section) inside a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentId(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub u64);

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Department id to department name. Departments never change while the engine runs.
pub type Departments = HashMap<DepartmentId, String>;

/// The eligibility category of a student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

/// Restricts a section to one eligibility category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderLock {
    /// Anyone can pick the section
    #[default]
    Unlocked,
    MaleOnly,
    FemaleOnly,
}

impl GenderLock {
    /// Returns true if a student of `gender` may occupy a section with this lock.
    pub fn admits(self, gender: Gender) -> bool {
        match self {
            GenderLock::Unlocked => true,
            GenderLock::MaleOnly => gender == Gender::Male,
            GenderLock::FemaleOnly => gender == Gender::Female,
        }
    }
}
