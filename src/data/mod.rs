use bson::Document;
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};

pub mod admin;
pub mod announcement;
pub mod assignment;
pub mod class;
pub mod course;
pub mod credential;
pub mod semester;
pub mod student;

async fn unique_index(
    db: &Database,
    collection: &str,
    field: &str,
) -> Result<(), mongodb::error::Error> {
    let mut keys = Document::new();
    keys.insert(field, 1);

    let model = IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build();

    db.collection::<Document>(collection)
        .create_index(model, None)
        .await?;

    Ok(())
}

/// Creates the unique indexes backing `DuplicateKey` detection. Runs on every
/// startup; MongoDB treats existing identical indexes as a no-op.
pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    unique_index(db, student::STUDENT_COLLECTION_NAME, "email").await?;
    unique_index(db, student::STUDENT_COLLECTION_NAME, "mssv").await?;
    unique_index(db, semester::SEMESTER_COLLECTION_NAME, "code").await?;
    unique_index(db, course::COURSE_COLLECTION_NAME, "code").await?;
    unique_index(db, admin::ADMIN_COLLECTION_NAME, "email").await?;

    Ok(())
}
