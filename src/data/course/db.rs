use bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;
use rocket::futures::StreamExt;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Course, SessionCount, COURSE_COLLECTION_NAME};
use crate::data::student::STUDENT_COLLECTION_NAME;
use crate::resp::problem::{is_duplicate_key, Problem};
use crate::util::{by_id, uuid_bson};

pub mod problem {
    use crate::resp::problem::{problems, Problem};
    use rocket::http::Status;
    use uuid::Uuid;

    #[inline]
    pub fn not_found(id: Uuid) -> Problem {
        Problem::new_untyped(Status::NotFound, "Course doesn't exist.")
            .insert("id", id.to_string())
            .clone()
    }

    #[inline]
    pub fn code_taken(code: impl ToString) -> Problem {
        problems::duplicate_key().insert_str("code", code).clone()
    }

    #[inline]
    pub fn missing_fields() -> Problem {
        Problem::new_untyped(Status::BadRequest, "Code and name are required.")
    }

    #[inline]
    pub fn bad_sessions(value: u8) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Invalid session count.")
            .detail("Courses run for either 10 or 15 sessions.")
            .insert("sessions", value)
            .clone()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CourseCreateData {
    pub code: String,
    pub name: String,
    pub sessions: Option<u8>,
    #[serde(default)]
    pub semester_code: String,
}

impl CourseCreateData {
    pub fn validate(&self) -> Result<SessionCount, Problem> {
        if self.code.trim().is_empty() || self.name.trim().is_empty() {
            return Err(problem::missing_fields());
        }

        match self.sessions {
            None => Ok(SessionCount::default()),
            Some(value) => SessionCount::try_from(value).map_err(|_| problem::bad_sessions(value)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CourseUpdateData {
    pub code: Option<String>,
    pub name: Option<String>,
    pub sessions: Option<u8>,
    pub semester_code: Option<String>,
}

pub trait CourseDbExt {
    async fn create_course(&self, data: CourseCreateData) -> Result<Course, Problem>;

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>, Problem>;

    async fn list_courses(&self) -> Result<Vec<Course>, Problem>;

    /// Loads courses by id, skipping dangling references.
    async fn courses_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Course>, Problem>;

    async fn update_course(
        &self,
        id: Uuid,
        data: CourseUpdateData,
    ) -> Result<Option<Course>, Problem>;

    /// Removes the course and pulls it from every student's course list.
    async fn delete_course(&self, id: Uuid) -> Result<Option<Course>, Problem>;
}

impl CourseDbExt for Database {
    async fn create_course(&self, data: CourseCreateData) -> Result<Course, Problem> {
        let sessions = data.validate()?;

        let code = data.code.trim().to_string();

        let existing = self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .find_one(doc! { "code": &code }, None)
            .await
            .map_err(Problem::from)?;

        if existing.is_some() {
            return Err(problem::code_taken(code));
        }

        let course = Course {
            id: Uuid::new_v4(),
            code,
            name: data.name.trim().to_string(),
            sessions,
            semester_code: data.semester_code.trim().to_string(),
            students: vec![],
            created_at: chrono::Utc::now(),
        };

        self.collection(COURSE_COLLECTION_NAME)
            .insert_one(
                bson::to_document(&course).expect("Course must be serializable to BSON"),
                None,
            )
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    problem::code_taken(&course.code)
                } else {
                    Problem::from(e)
                }
            })?;

        Ok(course)
    }

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>, Problem> {
        self.collection(COURSE_COLLECTION_NAME)
            .find_one(by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn list_courses(&self) -> Result<Vec<Course>, Problem> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let mut cursor = self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .find(None, options)
            .await
            .map_err(Problem::from)?;

        let mut courses = vec![];
        while let Some(course) = cursor.next().await {
            match course {
                Ok(it) => courses.push(it),
                Err(_) => tracing::warn!("Unable to deserialize Course document."),
            }
        }

        Ok(courses)
    }

    async fn courses_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Course>, Problem> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let id_bsons: Vec<bson::Bson> = ids.iter().map(|id| uuid_bson(*id)).collect();

        let mut cursor = self
            .collection::<Course>(COURSE_COLLECTION_NAME)
            .find(doc! { "_id": { "$in": id_bsons } }, None)
            .await
            .map_err(Problem::from)?;

        let mut courses = vec![];
        while let Some(course) = cursor.next().await {
            match course {
                Ok(it) => courses.push(it),
                Err(_) => tracing::warn!("Unable to deserialize Course document."),
            }
        }

        Ok(courses)
    }

    async fn update_course(
        &self,
        id: Uuid,
        data: CourseUpdateData,
    ) -> Result<Option<Course>, Problem> {
        let mut changes = bson::Document::new();

        if let Some(code) = &data.code {
            if code.trim().is_empty() {
                return Err(problem::missing_fields());
            }
            changes.insert("code", code.trim());
        }
        if let Some(name) = &data.name {
            if name.trim().is_empty() {
                return Err(problem::missing_fields());
            }
            changes.insert("name", name.trim());
        }
        if let Some(value) = data.sessions {
            let sessions =
                SessionCount::try_from(value).map_err(|_| problem::bad_sessions(value))?;
            changes.insert("sessions", u8::from(sessions) as i32);
        }
        if let Some(semester_code) = &data.semester_code {
            changes.insert("semester_code", semester_code.trim());
        }

        if changes.is_empty() {
            return self.get_course(id).await;
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.collection(COURSE_COLLECTION_NAME)
            .find_one_and_update(by_id(id), doc! { "$set": changes }, options)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    problem::code_taken(data.code.as_deref().unwrap_or_default())
                } else {
                    Problem::from(e)
                }
            })
    }

    async fn delete_course(&self, id: Uuid) -> Result<Option<Course>, Problem> {
        let removed: Option<Course> = self
            .collection(COURSE_COLLECTION_NAME)
            .find_one_and_delete(by_id(id), None)
            .await
            .map_err(Problem::from)?;

        let course = match removed {
            Some(it) => it,
            None => return Ok(None),
        };

        self.collection::<bson::Document>(STUDENT_COLLECTION_NAME)
            .update_many(
                doc! {},
                doc! { "$pull": { "courses": uuid_bson(course.id) } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(Some(course))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_data_defaults_to_ten_sessions() {
        let data = CourseCreateData {
            code: "502042".to_string(),
            name: "Introduction to Software Engineering".to_string(),
            sessions: None,
            semester_code: String::new(),
        };

        assert_eq!(data.validate().expect("valid"), SessionCount::Ten);
    }

    #[test]
    fn create_data_rejects_unoffered_session_counts() {
        let data = CourseCreateData {
            code: "502042".to_string(),
            name: "Introduction to Software Engineering".to_string(),
            sessions: Some(12),
            semester_code: String::new(),
        };

        assert!(data.validate().is_err());
    }
}
