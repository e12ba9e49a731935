use bson::doc;
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::StreamExt;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Semester, SEMESTER_COLLECTION_NAME};
use crate::data::class::CLASS_COLLECTION_NAME;
use crate::resp::problem::{is_duplicate_key, Problem};
use crate::util::{by_id, uuid_bson};

pub mod problem {
    use crate::resp::problem::{problems, Problem};
    use rocket::http::Status;
    use uuid::Uuid;

    #[inline]
    pub fn not_found(id: Uuid) -> Problem {
        Problem::new_untyped(Status::NotFound, "Semester doesn't exist.")
            .insert("id", id.to_string())
            .clone()
    }

    #[inline]
    pub fn code_taken(code: impl ToString) -> Problem {
        problems::duplicate_key().insert_str("code", code).clone()
    }

    #[inline]
    pub fn not_empty(id: Uuid) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Semester still has classes.")
            .detail("Reassign or delete the semester's classes first.")
            .insert("id", id.to_string())
            .clone()
    }

    #[inline]
    pub fn missing_fields() -> Problem {
        Problem::new_untyped(Status::BadRequest, "Name and code are required.")
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SemesterCreateData {
    pub name: String,
    pub code: String,
}

impl SemesterCreateData {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.name.trim().is_empty() || self.code.trim().is_empty() {
            return Err(problem::missing_fields());
        }

        Ok(())
    }
}

pub trait SemesterDbExt {
    async fn create_semester(&self, data: SemesterCreateData) -> Result<Semester, Problem>;

    async fn get_semester(&self, id: Uuid) -> Result<Option<Semester>, Problem>;

    async fn list_semesters(&self) -> Result<Vec<Semester>, Problem>;

    /// Deletion never cascades; it is refused while any class still
    /// references the semester.
    async fn delete_semester(&self, id: Uuid) -> Result<Option<Semester>, Problem>;
}

impl SemesterDbExt for Database {
    async fn create_semester(&self, data: SemesterCreateData) -> Result<Semester, Problem> {
        data.validate()?;

        let existing = self
            .collection::<Semester>(SEMESTER_COLLECTION_NAME)
            .find_one(doc! { "code": data.code.trim() }, None)
            .await
            .map_err(Problem::from)?;

        if existing.is_some() {
            return Err(problem::code_taken(data.code.trim()));
        }

        let semester = Semester {
            id: Uuid::new_v4(),
            name: data.name.trim().to_string(),
            code: data.code.trim().to_string(),
            classes: vec![],
            created_at: chrono::Utc::now(),
        };

        self.collection(SEMESTER_COLLECTION_NAME)
            .insert_one(
                bson::to_document(&semester).expect("Semester must be serializable to BSON"),
                None,
            )
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    problem::code_taken(&semester.code)
                } else {
                    Problem::from(e)
                }
            })?;

        Ok(semester)
    }

    async fn get_semester(&self, id: Uuid) -> Result<Option<Semester>, Problem> {
        self.collection(SEMESTER_COLLECTION_NAME)
            .find_one(by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn list_semesters(&self) -> Result<Vec<Semester>, Problem> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let mut cursor = self
            .collection::<Semester>(SEMESTER_COLLECTION_NAME)
            .find(None, options)
            .await
            .map_err(Problem::from)?;

        let mut semesters = vec![];
        while let Some(semester) = cursor.next().await {
            match semester {
                Ok(it) => semesters.push(it),
                Err(_) => tracing::warn!("Unable to deserialize Semester document."),
            }
        }

        Ok(semesters)
    }

    async fn delete_semester(&self, id: Uuid) -> Result<Option<Semester>, Problem> {
        let dependents = self
            .collection::<bson::Document>(CLASS_COLLECTION_NAME)
            .count_documents(doc! { "semester": uuid_bson(id) }, None)
            .await
            .map_err(Problem::from)?;

        if dependents > 0 {
            return Err(problem::not_empty(id));
        }

        self.collection(SEMESTER_COLLECTION_NAME)
            .find_one_and_delete(by_id(id), None)
            .await
            .map_err(Problem::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_data_requires_name_and_code() {
        let missing_code = SemesterCreateData {
            name: "Học kỳ 1".to_string(),
            code: "  ".to_string(),
        };
        assert!(missing_code.validate().is_err());

        let valid = SemesterCreateData {
            name: "Học kỳ 1".to_string(),
            code: "HK1-2025".to_string(),
        };
        assert!(valid.validate().is_ok());
    }
}
