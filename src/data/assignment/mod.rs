use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::storage::StoredFile;
use crate::util::uuid_vec_as_binary;

pub mod db;

pub static ASSIGNMENT_COLLECTION_NAME: &str = "assignments";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    /// Every assignment belongs to one class.
    #[serde(with = "bson::serde_helpers::uuid_1_as_binary")]
    pub class: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: DateTime<Utc>,
    /// Attached hand-out, if any. The storage key travels with the URL so
    /// the object can be deleted without re-deriving anything.
    #[serde(default)]
    pub file: Option<StoredFile>,
    #[serde(default = "Utc::now")]
    pub uploaded_at: DateTime<Utc>,
    /// Submission documents are referenced but not modeled further.
    #[serde(default, with = "uuid_vec_as_binary")]
    pub submissions: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub class: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub file: Option<StoredFile>,
    pub uploaded_at: DateTime<Utc>,
    pub submissions: Vec<Uuid>,
}

impl From<Assignment> for AssignmentResponse {
    fn from(value: Assignment) -> Self {
        Self {
            id: value.id,
            class: value.class,
            title: value.title,
            description: value.description,
            due_date: value.due_date,
            file: value.file,
            uploaded_at: value.uploaded_at,
            submissions: value.submissions,
        }
    }
}
