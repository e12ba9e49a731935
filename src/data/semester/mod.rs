use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::util::uuid_vec_as_binary;

pub mod db;

pub static SEMESTER_COLLECTION_NAME: &str = "semesters";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Semester {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    pub name: String,
    /// Unique semester code, e.g. "HK1-2025".
    pub code: String,
    #[serde(default, with = "uuid_vec_as_binary")]
    pub classes: Vec<Uuid>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SemesterResponse {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub classes: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Semester> for SemesterResponse {
    fn from(value: Semester) -> Self {
        Self {
            id: value.id,
            name: value.name,
            code: value.code,
            classes: value.classes,
            created_at: value.created_at,
        }
    }
}
