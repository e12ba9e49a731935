use bson::doc;
use chrono::Utc;
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::StreamExt;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    Announcement, Comment, ANNOUNCEMENT_COLLECTION_NAME, MAX_COMMENT_CHARS, MAX_CONTENT_CHARS,
};
use crate::resp::problem::Problem;
use crate::util::{by_id, uuid_bson};

/// Matches the original feed behavior: at most this many announcements per
/// read, newest first.
const LIST_LIMIT: i64 = 50;

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;
    use uuid::Uuid;

    #[inline]
    pub fn not_found(id: Uuid) -> Problem {
        Problem::new_untyped(Status::NotFound, "Announcement doesn't exist.")
            .insert("id", id.to_string())
            .clone()
    }

    #[inline]
    pub fn empty_content() -> Problem {
        Problem::new_untyped(Status::BadRequest, "Content must not be empty.")
    }

    #[inline]
    pub fn content_too_long(max: usize) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Content is too long.")
            .insert("max_chars", max)
            .clone()
    }

    #[inline]
    pub fn missing_comment_fields() -> Problem {
        Problem::new_untyped(Status::BadRequest, "Comment content and user are required.")
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AnnouncementCreateData {
    pub content: String,
}

impl AnnouncementCreateData {
    pub fn validate(&self) -> Result<(), Problem> {
        validate_content(&self.content, MAX_CONTENT_CHARS)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CommentCreateData {
    /// Commenting student id; parsed separately so a malformed value reports
    /// as a bad identifier instead of a body parse failure.
    pub user: String,
    pub content: String,
}

impl CommentCreateData {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.user.trim().is_empty() || self.content.trim().is_empty() {
            return Err(problem::missing_comment_fields());
        }

        validate_content(&self.content, MAX_COMMENT_CHARS)
    }
}

fn validate_content(content: &str, max_chars: usize) -> Result<(), Problem> {
    if content.trim().is_empty() {
        return Err(problem::empty_content());
    }

    if content.chars().count() > max_chars {
        return Err(problem::content_too_long(max_chars));
    }

    Ok(())
}

pub trait AnnouncementDbExt {
    async fn create_announcement(
        &self,
        class_id: Uuid,
        data: AnnouncementCreateData,
    ) -> Result<Announcement, Problem>;

    async fn get_announcement(&self, id: Uuid) -> Result<Option<Announcement>, Problem>;

    async fn list_announcements_for_class(
        &self,
        class_id: Uuid,
    ) -> Result<Vec<Announcement>, Problem>;

    /// Appends an embedded comment; fails with NotFound when the
    /// announcement is absent.
    async fn push_comment(&self, announcement_id: Uuid, comment: Comment)
        -> Result<(), Problem>;
}

impl AnnouncementDbExt for Database {
    async fn create_announcement(
        &self,
        class_id: Uuid,
        data: AnnouncementCreateData,
    ) -> Result<Announcement, Problem> {
        data.validate()?;

        let announcement = Announcement {
            id: Uuid::new_v4(),
            class: class_id,
            content: data.content.trim().to_string(),
            comments: vec![],
            created_at: Utc::now(),
        };

        self.collection(ANNOUNCEMENT_COLLECTION_NAME)
            .insert_one(
                bson::to_document(&announcement)
                    .expect("Announcement must be serializable to BSON"),
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(announcement)
    }

    async fn get_announcement(&self, id: Uuid) -> Result<Option<Announcement>, Problem> {
        self.collection(ANNOUNCEMENT_COLLECTION_NAME)
            .find_one(by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn list_announcements_for_class(
        &self,
        class_id: Uuid,
    ) -> Result<Vec<Announcement>, Problem> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .limit(LIST_LIMIT)
            .build();

        let mut cursor = self
            .collection::<Announcement>(ANNOUNCEMENT_COLLECTION_NAME)
            .find(doc! { "class": uuid_bson(class_id) }, options)
            .await
            .map_err(Problem::from)?;

        let mut announcements = vec![];
        while let Some(announcement) = cursor.next().await {
            match announcement {
                Ok(it) => announcements.push(it),
                Err(_) => tracing::warn!("Unable to deserialize Announcement document."),
            }
        }

        Ok(announcements)
    }

    async fn push_comment(
        &self,
        announcement_id: Uuid,
        comment: Comment,
    ) -> Result<(), Problem> {
        let comment_doc =
            bson::to_bson(&comment).expect("Comment must be serializable to BSON");

        let updated = self
            .collection::<bson::Document>(ANNOUNCEMENT_COLLECTION_NAME)
            .update_one(
                by_id(announcement_id),
                doc! { "$push": { "comments": comment_doc } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        if updated.matched_count == 0 {
            return Err(problem::not_found(announcement_id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_boundary_is_one_thousand_chars() {
        let at_limit = AnnouncementCreateData {
            content: "a".repeat(MAX_CONTENT_CHARS),
        };
        assert!(at_limit.validate().is_ok());

        let over_limit = AnnouncementCreateData {
            content: "a".repeat(MAX_CONTENT_CHARS + 1),
        };
        assert!(over_limit.validate().is_err());
    }

    #[test]
    fn content_limit_counts_chars_not_bytes() {
        // 1000 multi-byte characters stay within the limit.
        let at_limit = AnnouncementCreateData {
            content: "ữ".repeat(MAX_CONTENT_CHARS),
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn blank_content_is_rejected() {
        let blank = AnnouncementCreateData {
            content: "   ".to_string(),
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn comment_boundary_is_five_hundred_chars() {
        let author = Uuid::new_v4().to_string();

        let at_limit = CommentCreateData {
            user: author.clone(),
            content: "b".repeat(MAX_COMMENT_CHARS),
        };
        assert!(at_limit.validate().is_ok());

        let over_limit = CommentCreateData {
            user: author,
            content: "b".repeat(MAX_COMMENT_CHARS + 1),
        };
        assert!(over_limit.validate().is_err());
    }

    #[test]
    fn comment_requires_user_and_content() {
        let missing_user = CommentCreateData {
            user: String::new(),
            content: "ok".to_string(),
        };
        assert!(missing_user.validate().is_err());

        let missing_content = CommentCreateData {
            user: Uuid::new_v4().to_string(),
            content: " ".to_string(),
        };
        assert!(missing_content.validate().is_err());
    }
}
