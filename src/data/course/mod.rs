use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::util::uuid_vec_as_binary;

pub mod db;

pub static COURSE_COLLECTION_NAME: &str = "courses";

/// Number of sessions a course runs for; only 10 and 15 are offered.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "u8", into = "u8")]
pub enum SessionCount {
    Ten,
    Fifteen,
}

impl Default for SessionCount {
    fn default() -> Self {
        SessionCount::Ten
    }
}

impl From<SessionCount> for u8 {
    fn from(value: SessionCount) -> u8 {
        match value {
            SessionCount::Ten => 10,
            SessionCount::Fifteen => 15,
        }
    }
}

impl TryFrom<u8> for SessionCount {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            10 => Ok(SessionCount::Ten),
            15 => Ok(SessionCount::Fifteen),
            other => Err(format!("invalid session count: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    /// Unique course code.
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub sessions: SessionCount,
    /// Free-text semester label, unlike `Class` which references a Semester
    /// document.
    #[serde(default)]
    pub semester_code: String,
    #[serde(default, with = "uuid_vec_as_binary")]
    pub students: Vec<Uuid>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub sessions: SessionCount,
    pub semester_code: String,
    pub students: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Course> for CourseResponse {
    fn from(value: Course) -> Self {
        Self {
            id: value.id,
            code: value.code,
            name: value.name,
            sessions: value.sessions,
            semester_code: value.semester_code,
            students: value.students,
            created_at: value.created_at,
        }
    }
}

/// Whitelisted projection used when populating a student's course list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseSummary {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id,
            code: course.code.clone(),
            name: course.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_count_accepts_only_offered_values() {
        assert_eq!(SessionCount::try_from(10), Ok(SessionCount::Ten));
        assert_eq!(SessionCount::try_from(15), Ok(SessionCount::Fifteen));
        assert!(SessionCount::try_from(12).is_err());
        assert!(SessionCount::try_from(0).is_err());
    }

    #[test]
    fn session_count_serializes_as_number() {
        let json = serde_json::to_string(&SessionCount::Fifteen).expect("serializable");
        assert_eq!(json, "15");

        let back: SessionCount = serde_json::from_str("10").expect("deserializable");
        assert_eq!(back, SessionCount::Ten);

        assert!(serde_json::from_str::<SessionCount>("11").is_err());
    }
}
