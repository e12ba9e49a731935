use bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;
use rocket::futures::StreamExt;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Student, STUDENT_COLLECTION_NAME};
use crate::data::class::CLASS_COLLECTION_NAME;
use crate::data::course::COURSE_COLLECTION_NAME;
use crate::data::credential::PasswordHash;
use crate::resp::problem::{is_duplicate_key, Problem};
use crate::storage::StoredFile;
use crate::util::{by_id, uuid_bson};

pub mod problem {
    use crate::resp::problem::{problems, Problem};
    use rocket::http::Status;
    use uuid::Uuid;

    #[inline]
    pub fn not_found(id: Uuid) -> Problem {
        Problem::new_untyped(Status::NotFound, "Student doesn't exist.")
            .insert("id", id.to_string())
            .clone()
    }

    #[inline]
    pub fn duplicate_identity() -> Problem {
        problems::duplicate_key()
            .detail("A student with the same email or mssv already exists.")
            .clone()
    }

    #[inline]
    pub fn bad_email(email: impl ToString, detail: impl ToString) -> Problem {
        Problem::new_untyped(Status::BadRequest, "Bad email.")
            .insert_str("email", email)
            .detail(detail)
            .to_owned()
    }

    #[inline]
    pub fn missing_fields() -> Problem {
        Problem::new_untyped(Status::BadRequest, "MSSV, name, email and password are required.")
    }

    #[inline]
    pub fn bad_name() -> Problem {
        Problem::new_untyped(Status::BadRequest, "Name must not be empty.")
    }
}

#[derive(Clone, Deserialize, ToSchema)]
pub struct StudentCreateData {
    pub mssv: String,
    pub name: String,
    #[schema(format = "email")]
    pub email: String,
    #[schema(format = "password")]
    pub password: String,
}

impl std::fmt::Debug for StudentCreateData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StudentCreateData:{}", self.mssv)
    }
}

impl StudentCreateData {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.mssv.trim().is_empty()
            || self.name.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
        {
            return Err(problem::missing_fields());
        }

        if !self.email.contains('@') {
            return Err(problem::bad_email(
                self.email.to_string(),
                "Not a valid e-mail address.",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StudentUpdateData {
    pub name: Option<String>,
}

pub trait StudentDbExt {
    async fn create_student(&self, data: StudentCreateData) -> Result<Student, Problem>;

    async fn get_student(&self, id: Uuid) -> Result<Option<Student>, Problem>;

    async fn find_student_by_email(&self, email: impl AsRef<str>) -> Result<Option<Student>, Problem>;

    async fn list_students(&self) -> Result<Vec<Student>, Problem>;

    /// Loads students by id, preserving the order of `ids` where possible.
    /// Dangling references are skipped instead of failing the read.
    async fn students_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Student>, Problem>;

    async fn update_student_name(&self, id: Uuid, name: &str) -> Result<Option<Student>, Problem>;

    async fn set_student_avatar(
        &self,
        id: Uuid,
        avatar: &StoredFile,
    ) -> Result<Option<Student>, Problem>;

    /// Removes the student and pulls it out of every class and course roster.
    async fn delete_student(&self, id: Uuid) -> Result<Option<Student>, Problem>;
}

impl StudentDbExt for Database {
    async fn create_student(&self, data: StudentCreateData) -> Result<Student, Problem> {
        data.validate()?;

        let email = data.email.trim().to_lowercase();
        let mssv = data.mssv.trim().to_string();

        let existing = self
            .collection::<Student>(STUDENT_COLLECTION_NAME)
            .find_one(
                doc! { "$or": [ { "email": &email }, { "mssv": &mssv } ] },
                None,
            )
            .await
            .map_err(Problem::from)?;

        if existing.is_some() {
            return Err(problem::duplicate_identity());
        }

        let student = Student {
            id: Uuid::new_v4(),
            mssv,
            name: data.name.trim().to_string(),
            email,
            pw_hash: PasswordHash::new(&data.password),
            avatar: None,
            classes: vec![],
            courses: vec![],
            created_at: chrono::Utc::now(),
        };

        self.collection(STUDENT_COLLECTION_NAME)
            .insert_one(
                bson::to_document(&student).expect("Student must be serializable to BSON"),
                None,
            )
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    problem::duplicate_identity()
                } else {
                    Problem::from(e)
                }
            })?;

        Ok(student)
    }

    async fn get_student(&self, id: Uuid) -> Result<Option<Student>, Problem> {
        self.collection(STUDENT_COLLECTION_NAME)
            .find_one(by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn find_student_by_email(
        &self,
        email: impl AsRef<str>,
    ) -> Result<Option<Student>, Problem> {
        self.collection(STUDENT_COLLECTION_NAME)
            .find_one(doc! { "email": email.as_ref().trim().to_lowercase() }, None)
            .await
            .map_err(Problem::from)
    }

    async fn list_students(&self) -> Result<Vec<Student>, Problem> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let mut cursor = self
            .collection::<Student>(STUDENT_COLLECTION_NAME)
            .find(None, options)
            .await
            .map_err(Problem::from)?;

        let mut students = vec![];
        while let Some(student) = cursor.next().await {
            match student {
                Ok(it) => students.push(it),
                Err(_) => tracing::warn!("Unable to deserialize Student document."),
            }
        }

        Ok(students)
    }

    async fn students_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Student>, Problem> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let id_bsons: Vec<bson::Bson> = ids.iter().map(|id| uuid_bson(*id)).collect();

        let mut cursor = self
            .collection::<Student>(STUDENT_COLLECTION_NAME)
            .find(doc! { "_id": { "$in": id_bsons } }, None)
            .await
            .map_err(Problem::from)?;

        let mut students = vec![];
        while let Some(student) = cursor.next().await {
            match student {
                Ok(it) => students.push(it),
                Err(_) => tracing::warn!("Unable to deserialize Student document."),
            }
        }

        // keep the caller's ordering
        students.sort_by_key(|s| ids.iter().position(|id| *id == s.id).unwrap_or(usize::MAX));

        Ok(students)
    }

    async fn update_student_name(&self, id: Uuid, name: &str) -> Result<Option<Student>, Problem> {
        if name.trim().is_empty() {
            return Err(problem::bad_name());
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.collection(STUDENT_COLLECTION_NAME)
            .find_one_and_update(
                by_id(id),
                doc! { "$set": { "name": name.trim() } },
                options,
            )
            .await
            .map_err(Problem::from)
    }

    async fn set_student_avatar(
        &self,
        id: Uuid,
        avatar: &StoredFile,
    ) -> Result<Option<Student>, Problem> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let avatar =
            bson::to_bson(avatar).expect("StoredFile must be serializable to BSON");

        self.collection(STUDENT_COLLECTION_NAME)
            .find_one_and_update(by_id(id), doc! { "$set": { "avatar": avatar } }, options)
            .await
            .map_err(Problem::from)
    }

    async fn delete_student(&self, id: Uuid) -> Result<Option<Student>, Problem> {
        let removed: Option<Student> = self
            .collection(STUDENT_COLLECTION_NAME)
            .find_one_and_delete(by_id(id), None)
            .await
            .map_err(Problem::from)?;

        let student = match removed {
            Some(it) => it,
            None => return Ok(None),
        };

        // also remove from rosters
        self.collection::<bson::Document>(CLASS_COLLECTION_NAME)
            .update_many(
                doc! {},
                doc! { "$pull": { "students": uuid_bson(student.id) } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        self.collection::<bson::Document>(COURSE_COLLECTION_NAME)
            .update_many(
                doc! {},
                doc! { "$pull": { "students": uuid_bson(student.id) } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(Some(student))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_data() -> StudentCreateData {
        StudentCreateData {
            mssv: "521H0001".to_string(),
            name: "Nguyễn Văn A".to_string(),
            email: "a@x.com".to_string(),
            password: "student-password".to_string(),
        }
    }

    #[test]
    fn create_data_requires_all_fields() {
        let mut data = base_data();
        assert!(data.validate().is_ok());

        data.password = String::new();
        assert!(data.validate().is_err());

        let mut data = base_data();
        data.mssv = " ".to_string();
        assert!(data.validate().is_err());
    }

    #[test]
    fn create_data_rejects_invalid_email() {
        let mut data = base_data();
        data.email = "not-an-email".to_string();
        assert!(data.validate().is_err());
    }
}
