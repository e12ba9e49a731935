use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::student::StudentSummary;

pub mod db;

pub static ANNOUNCEMENT_COLLECTION_NAME: &str = "announcements";

pub const MAX_CONTENT_CHARS: usize = 1000;
pub const MAX_COMMENT_CHARS: usize = 500;

/// Comments are embedded; they live and die with their announcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(with = "bson::serde_helpers::uuid_1_as_binary")]
    pub author: Uuid,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    #[serde(with = "bson::serde_helpers::uuid_1_as_binary")]
    pub class: Uuid,
    pub content: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentResponse {
    /// Whitelisted author info; `None` when the student no longer exists.
    pub user: Option<StudentSummary>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnnouncementResponse {
    pub id: Uuid,
    pub class: Uuid,
    pub content: String,
    pub comments: Vec<CommentResponse>,
    pub created_at: DateTime<Utc>,
}

impl AnnouncementResponse {
    /// Joins embedded comments against the given author lookup.
    pub fn populated(
        announcement: Announcement,
        authors: &std::collections::HashMap<Uuid, StudentSummary>,
    ) -> AnnouncementResponse {
        AnnouncementResponse {
            id: announcement.id,
            class: announcement.class,
            content: announcement.content,
            comments: announcement
                .comments
                .into_iter()
                .map(|comment| CommentResponse {
                    user: authors.get(&comment.author).cloned(),
                    content: comment.content,
                    created_at: comment.created_at,
                })
                .collect(),
            created_at: announcement.created_at,
        }
    }
}
