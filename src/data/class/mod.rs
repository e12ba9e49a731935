use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::util::uuid_vec_as_binary;

pub mod db;

pub static CLASS_COLLECTION_NAME: &str = "classes";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub instructor: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub subject: String,
    /// Every class belongs to exactly one semester.
    #[serde(with = "bson::serde_helpers::uuid_1_as_binary")]
    pub semester: Uuid,
    #[serde(default, with = "uuid_vec_as_binary")]
    pub students: Vec<Uuid>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClassResponse {
    pub id: Uuid,
    pub name: String,
    pub instructor: String,
    pub room: String,
    pub subject: String,
    pub semester: Uuid,
    pub students: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Class> for ClassResponse {
    fn from(value: Class) -> Self {
        Self {
            id: value.id,
            name: value.name,
            instructor: value.instructor,
            room: value.room,
            subject: value.subject,
            semester: value.semester,
            students: value.students,
            created_at: value.created_at,
        }
    }
}
