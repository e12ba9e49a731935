use bson::doc;
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::StreamExt;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Class, CLASS_COLLECTION_NAME};
use crate::data::announcement::ANNOUNCEMENT_COLLECTION_NAME;
use crate::data::semester::db::{problem as semester_problem, SemesterDbExt};
use crate::data::semester::SEMESTER_COLLECTION_NAME;
use crate::data::student::STUDENT_COLLECTION_NAME;
use crate::resp::problem::Problem;
use crate::util::{by_id, uuid_bson};

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;
    use uuid::Uuid;

    #[inline]
    pub fn not_found(id: Uuid) -> Problem {
        Problem::new_untyped(Status::NotFound, "Class doesn't exist.")
            .insert("id", id.to_string())
            .clone()
    }

    #[inline]
    pub fn bad_name() -> Problem {
        Problem::new_untyped(Status::BadRequest, "Class name is required.")
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ClassCreateData {
    pub name: String,
    #[serde(default)]
    pub instructor: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub subject: String,
    pub semester: Uuid,
}

impl ClassCreateData {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.name.trim().is_empty() {
            return Err(problem::bad_name());
        }

        Ok(())
    }
}

pub trait ClassDbExt {
    /// Creates a class under an existing semester and records it in the
    /// semester's class list.
    async fn create_class(&self, data: ClassCreateData) -> Result<Class, Problem>;

    async fn get_class(&self, id: Uuid) -> Result<Option<Class>, Problem>;

    async fn list_classes(&self) -> Result<Vec<Class>, Problem>;

    /// Queries the class collection by its `semester` field rather than the
    /// semester's own array, so one-sided relations still surface.
    async fn list_classes_by_semester(&self, semester_id: Uuid) -> Result<Vec<Class>, Problem>;

    async fn list_classes_for_student(&self, student_id: Uuid) -> Result<Vec<Class>, Problem>;

    /// Removes the class and cleans every document that referenced it:
    /// the owning semester, student membership arrays and the class's
    /// announcements. Assignment documents are handled by the caller, which
    /// has to release their stored files first.
    async fn delete_class(&self, id: Uuid) -> Result<Option<Class>, Problem>;
}

async fn collect_classes(
    db: &Database,
    filter: bson::Document,
    options: FindOptions,
) -> Result<Vec<Class>, Problem> {
    let mut cursor = db
        .collection::<Class>(CLASS_COLLECTION_NAME)
        .find(filter, options)
        .await
        .map_err(Problem::from)?;

    let mut classes = vec![];
    while let Some(class) = cursor.next().await {
        match class {
            Ok(it) => classes.push(it),
            Err(_) => tracing::warn!("Unable to deserialize Class document."),
        }
    }

    Ok(classes)
}

impl ClassDbExt for Database {
    async fn create_class(&self, data: ClassCreateData) -> Result<Class, Problem> {
        data.validate()?;

        if self.get_semester(data.semester).await?.is_none() {
            return Err(semester_problem::not_found(data.semester));
        }

        let class = Class {
            id: Uuid::new_v4(),
            name: data.name.trim().to_string(),
            instructor: data.instructor.trim().to_string(),
            room: data.room.trim().to_string(),
            subject: data.subject.trim().to_string(),
            semester: data.semester,
            students: vec![],
            created_at: chrono::Utc::now(),
        };

        self.collection(CLASS_COLLECTION_NAME)
            .insert_one(
                bson::to_document(&class).expect("Class must be serializable to BSON"),
                None,
            )
            .await
            .map_err(Problem::from)?;

        self.collection::<bson::Document>(SEMESTER_COLLECTION_NAME)
            .update_one(
                by_id(class.semester),
                doc! { "$addToSet": { "classes": uuid_bson(class.id) } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(class)
    }

    async fn get_class(&self, id: Uuid) -> Result<Option<Class>, Problem> {
        self.collection(CLASS_COLLECTION_NAME)
            .find_one(by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn list_classes(&self) -> Result<Vec<Class>, Problem> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        collect_classes(self, bson::Document::new(), options).await
    }

    async fn list_classes_by_semester(&self, semester_id: Uuid) -> Result<Vec<Class>, Problem> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        collect_classes(self, doc! { "semester": uuid_bson(semester_id) }, options).await
    }

    async fn list_classes_for_student(&self, student_id: Uuid) -> Result<Vec<Class>, Problem> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        collect_classes(self, doc! { "students": uuid_bson(student_id) }, options).await
    }

    async fn delete_class(&self, id: Uuid) -> Result<Option<Class>, Problem> {
        let removed: Option<Class> = self
            .collection(CLASS_COLLECTION_NAME)
            .find_one_and_delete(by_id(id), None)
            .await
            .map_err(Problem::from)?;

        let class = match removed {
            Some(it) => it,
            None => return Ok(None),
        };

        self.collection::<bson::Document>(SEMESTER_COLLECTION_NAME)
            .update_one(
                by_id(class.semester),
                doc! { "$pull": { "classes": uuid_bson(class.id) } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        self.collection::<bson::Document>(STUDENT_COLLECTION_NAME)
            .update_many(
                doc! {},
                doc! { "$pull": { "classes": uuid_bson(class.id) } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        self.collection::<bson::Document>(ANNOUNCEMENT_COLLECTION_NAME)
            .delete_many(doc! { "class": uuid_bson(class.id) }, None)
            .await
            .map_err(Problem::from)?;

        Ok(Some(class))
    }
}
