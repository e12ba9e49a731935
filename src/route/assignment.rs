use chrono::{DateTime, Utc};
use mongodb::Database;
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use uuid::Uuid;

use crate::config::Config;
use crate::data::assignment::db::{problem, AssignmentCreateData, AssignmentDbExt};
use crate::data::assignment::AssignmentResponse;
use crate::data::class::db::{problem as class_problem, ClassDbExt};
use crate::resp::jwt::AdminClaims;
use crate::resp::problem::Problem;
use crate::route::{Data, Listing};
use crate::storage::{
    is_accepted_mime, problem as storage_problem, Attachments, ObjectStore, Upload,
    ASSIGNMENT_FOLDER, MAX_UPLOAD_BYTES,
};

#[derive(FromForm)]
pub struct AssignmentUpload<'r> {
    pub title: Option<String>,
    pub description: Option<String>,
    #[field(name = "dueDate")]
    pub due_date: Option<String>,
    pub file: Option<TempFile<'r>>,
}

/// Reads a multipart file part into an [`Upload`] through a staging file,
/// enforcing the size cap and the accepted-type filter first.
pub(super) async fn read_upload(
    file: &mut TempFile<'_>,
    c: &Config,
) -> Result<Upload, Problem> {
    if file.len() > MAX_UPLOAD_BYTES {
        return Err(storage_problem::file_too_large());
    }

    let mime_type = file
        .content_type()
        .map(|ct| ct.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    if !is_accepted_mime(&mime_type) {
        return Err(storage_problem::unsupported_file_type(&mime_type));
    }

    let original_name = file
        .raw_name()
        .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_string())
        .unwrap_or_else(|| "file".to_string());

    let staging = c
        .uploads_dir
        .join(".staging")
        .join(Uuid::new_v4().simple().to_string());

    if let Some(parent) = staging.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(Problem::from)?;
    }

    file.copy_to(&staging).await.map_err(Problem::from)?;
    let bytes = tokio::fs::read(&staging).await.map_err(Problem::from)?;
    let _ = tokio::fs::remove_file(&staging).await;

    Ok(Upload {
        original_name,
        mime_type,
        bytes,
    })
}

fn parse_due_date(value: &str) -> Result<DateTime<Utc>, Problem> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| problem::bad_due_date(value))
}

/// Multipart create: text fields plus an optional hand-out in the `file`
/// field. If storing succeeds but the database write fails, the fresh
/// object is deleted before the error is returned.
#[utoipa::path(
    responses(
        (status = 201, description = "Created assignment", body = AssignmentResponse),
        (status = 400, description = "Validation, size or file-type failure", body = Problem),
        (status = 404, description = "Class doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/admin/classes/<class_id>/assignments", data = "<form>")]
#[tracing::instrument(skip(form, db, c, store))]
pub async fn assignment_create(
    class_id: Uuid,
    mut form: Form<AssignmentUpload<'_>>,
    _admin: AdminClaims,
    db: &State<Database>,
    c: &State<Config>,
    store: &State<Box<dyn ObjectStore>>,
) -> Result<(Status, Json<Data<AssignmentResponse>>), Problem> {
    if db.get_class(class_id).await?.is_none() {
        return Err(class_problem::not_found(class_id));
    }

    let title = form.title.clone().unwrap_or_default();
    let description = form.description.clone().unwrap_or_default();
    let due_date = match form.due_date.as_deref() {
        Some(it) => parse_due_date(it.trim())?,
        None => return Err(problem::missing_fields()),
    };

    let attachments = Attachments::new(store.inner().as_ref());

    let stored = match form.file.as_mut() {
        Some(file) => {
            let upload = read_upload(file, c).await?;
            Some(attachments.attach(ASSIGNMENT_FOLDER, &upload).await?)
        }
        None => None,
    };

    let data = AssignmentCreateData {
        class: class_id,
        title,
        description,
        due_date,
        file: stored.clone(),
    };

    match db.create_assignment(data).await {
        Ok(created) => Ok((
            Status::Created,
            Json(Data {
                data: created.into(),
            }),
        )),
        Err(e) => {
            // compensating action: don't leak the object we just stored
            if let Some(file) = &stored {
                attachments.release(file).await;
            }
            Err(e)
        }
    }
}

#[utoipa::path(
    responses(
        (status = 200, description = "Assignments of the class, newest first"),
        (status = 404, description = "Class doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/admin/classes/<class_id>/assignments")]
#[tracing::instrument(skip(db))]
pub async fn assignment_list(
    class_id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<Json<Listing<AssignmentResponse>>, Problem> {
    if db.get_class(class_id).await?.is_none() {
        return Err(class_problem::not_found(class_id));
    }

    let assignments = db.list_assignments_for_class(class_id).await?;

    let data: Vec<AssignmentResponse> = assignments.into_iter().map(Into::into).collect();

    Ok(Json(Listing {
        count: data.len(),
        data,
    }))
}

/// Deletes the assignment and its stored file.
#[utoipa::path(
    responses(
        (status = 200, description = "Deleted assignment", body = AssignmentResponse),
        (status = 404, description = "Assignment doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[delete("/admin/assignments/<id>")]
#[tracing::instrument(skip(db, store))]
pub async fn assignment_delete(
    id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
    store: &State<Box<dyn ObjectStore>>,
) -> Result<Json<AssignmentResponse>, Problem> {
    let removed = db
        .delete_assignment(id)
        .await?
        .ok_or_else(|| problem::not_found(id))?;

    if let Some(file) = &removed.file {
        Attachments::new(store.inner().as_ref()).release(file).await;
    }

    Ok(Json(removed.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_dates_parse_from_rfc3339() {
        let parsed = parse_due_date("2026-01-31T23:59:00Z").expect("valid due date");
        assert_eq!(parsed.timezone(), Utc);

        assert!(parse_due_date("31/01/2026").is_err());
        assert!(parse_due_date("").is_err());
    }
}
