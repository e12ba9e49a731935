use bson::doc;
use chrono::{DateTime, Utc};
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::StreamExt;
use uuid::Uuid;

use super::{Assignment, ASSIGNMENT_COLLECTION_NAME};
use crate::resp::problem::Problem;
use crate::storage::StoredFile;
use crate::util::{by_id, uuid_bson};

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;
    use uuid::Uuid;

    #[inline]
    pub fn not_found(id: Uuid) -> Problem {
        Problem::new_untyped(Status::NotFound, "Assignment doesn't exist.")
            .insert("id", id.to_string())
            .clone()
    }

    #[inline]
    pub fn missing_fields() -> Problem {
        Problem::new_untyped(
            Status::BadRequest,
            "Title, description and due date are required.",
        )
    }

    #[inline]
    pub fn bad_due_date(value: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Invalid due date.")
            .detail("Due dates use RFC 3339, e.g. 2026-01-31T23:59:00Z.")
            .insert_str("due_date", value)
            .clone()
    }
}

/// Assembled by the upload route after the file part has been stored.
#[derive(Debug, Clone)]
pub struct AssignmentCreateData {
    pub class: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub file: Option<StoredFile>,
}

impl AssignmentCreateData {
    /// Title and due date are always required; without a file the
    /// description must be present too.
    pub fn validate(&self) -> Result<(), Problem> {
        if self.title.trim().is_empty() {
            return Err(problem::missing_fields());
        }

        if self.file.is_none() && self.description.trim().is_empty() {
            return Err(problem::missing_fields());
        }

        Ok(())
    }
}

pub trait AssignmentDbExt {
    async fn create_assignment(&self, data: AssignmentCreateData) -> Result<Assignment, Problem>;

    async fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>, Problem>;

    async fn list_assignments_for_class(&self, class_id: Uuid)
        -> Result<Vec<Assignment>, Problem>;

    async fn delete_assignment(&self, id: Uuid) -> Result<Option<Assignment>, Problem>;

    /// Loads and removes every assignment of a class, returning the removed
    /// documents so the caller can release their stored files.
    async fn take_assignments_for_class(
        &self,
        class_id: Uuid,
    ) -> Result<Vec<Assignment>, Problem>;
}

impl AssignmentDbExt for Database {
    async fn create_assignment(&self, data: AssignmentCreateData) -> Result<Assignment, Problem> {
        data.validate()?;

        let assignment = Assignment {
            id: Uuid::new_v4(),
            class: data.class,
            title: data.title.trim().to_string(),
            description: data.description.trim().to_string(),
            due_date: data.due_date,
            file: data.file,
            uploaded_at: Utc::now(),
            submissions: vec![],
        };

        self.collection(ASSIGNMENT_COLLECTION_NAME)
            .insert_one(
                bson::to_document(&assignment).expect("Assignment must be serializable to BSON"),
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(assignment)
    }

    async fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>, Problem> {
        self.collection(ASSIGNMENT_COLLECTION_NAME)
            .find_one(by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn list_assignments_for_class(
        &self,
        class_id: Uuid,
    ) -> Result<Vec<Assignment>, Problem> {
        let options = FindOptions::builder()
            .sort(doc! { "uploaded_at": -1 })
            .build();

        let mut cursor = self
            .collection::<Assignment>(ASSIGNMENT_COLLECTION_NAME)
            .find(doc! { "class": uuid_bson(class_id) }, options)
            .await
            .map_err(Problem::from)?;

        let mut assignments = vec![];
        while let Some(assignment) = cursor.next().await {
            match assignment {
                Ok(it) => assignments.push(it),
                Err(_) => tracing::warn!("Unable to deserialize Assignment document."),
            }
        }

        Ok(assignments)
    }

    async fn delete_assignment(&self, id: Uuid) -> Result<Option<Assignment>, Problem> {
        self.collection(ASSIGNMENT_COLLECTION_NAME)
            .find_one_and_delete(by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn take_assignments_for_class(
        &self,
        class_id: Uuid,
    ) -> Result<Vec<Assignment>, Problem> {
        let assignments = self.list_assignments_for_class(class_id).await?;

        self.collection::<bson::Document>(ASSIGNMENT_COLLECTION_NAME)
            .delete_many(doc! { "class": uuid_bson(class_id) }, None)
            .await
            .map_err(Problem::from)?;

        Ok(assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_data() -> AssignmentCreateData {
        AssignmentCreateData {
            class: Uuid::new_v4(),
            title: "Bài tập chương 1".to_string(),
            description: "Đọc chương 1 và trả lời câu hỏi.".to_string(),
            due_date: Utc::now(),
            file: None,
        }
    }

    #[test]
    fn title_is_always_required() {
        let mut data = base_data();
        data.title = String::new();
        assert!(data.validate().is_err());
    }

    #[test]
    fn description_is_optional_only_with_a_file() {
        let mut data = base_data();
        data.description = String::new();
        assert!(data.validate().is_err());

        data.file = Some(StoredFile {
            original_name: "baitap.pdf".to_string(),
            key: "assignments/abc-baitap.pdf".to_string(),
            url: "http://localhost:8000/uploads/assignments/abc-baitap.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
        });
        assert!(data.validate().is_ok());
    }
}
