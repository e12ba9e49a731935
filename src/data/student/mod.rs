use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::credential::PasswordHash;
use crate::storage::StoredFile;
use crate::util::uuid_vec_as_binary;

pub mod db;

pub static STUDENT_COLLECTION_NAME: &str = "students";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    /// Student identification number, globally unique.
    pub mssv: String,
    pub name: String,
    pub email: String,
    pub pw_hash: PasswordHash,
    /// `None` means the system default avatar, which is never deleted from
    /// storage.
    #[serde(default)]
    pub avatar: Option<StoredFile>,
    #[serde(default, with = "uuid_vec_as_binary")]
    pub classes: Vec<Uuid>,
    #[serde(default, with = "uuid_vec_as_binary")]
    pub courses: Vec<Uuid>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Full read model. The password hash stays behind; callers needing it for
/// verification read it off the `Student` document directly.
#[derive(Debug, Serialize, ToSchema)]
pub struct StudentResponse {
    pub id: Uuid,
    pub mssv: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub classes: Vec<Uuid>,
    pub courses: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl StudentResponse {
    pub fn new(student: Student, default_avatar_url: &str) -> StudentResponse {
        StudentResponse {
            id: student.id,
            mssv: student.mssv,
            name: student.name,
            email: student.email,
            avatar_url: student
                .avatar
                .map(|file| file.url)
                .unwrap_or_else(|| default_avatar_url.to_string()),
            classes: student.classes,
            courses: student.courses,
            created_at: student.created_at,
        }
    }
}

/// Whitelisted projection for populate-style reads (rosters, comment
/// authors). Anything sensitive simply has no field here.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentSummary {
    pub id: Uuid,
    pub mssv: String,
    pub name: String,
    pub email: String,
}

impl From<&Student> for StudentSummary {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            mssv: student.mssv.clone(),
            name: student.name.clone(),
            email: student.email.clone(),
        }
    }
}

impl From<Student> for StudentSummary {
    fn from(student: Student) -> Self {
        Self::from(&student)
    }
}
