use chrono::{DateTime, Utc};
use mongodb::Database;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::class::db::ClassDbExt;
use crate::data::class::ClassResponse;
use crate::data::semester::db::{problem, SemesterCreateData, SemesterDbExt};
use crate::data::semester::SemesterResponse;
use crate::resp::jwt::AdminClaims;
use crate::resp::problem::Problem;
use crate::route::Data;

#[derive(Debug, Serialize, ToSchema)]
pub struct SemesterDetailResponse {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub classes: Vec<ClassResponse>,
    pub created_at: DateTime<Utc>,
}

#[utoipa::path(
    request_body = SemesterCreateData,
    responses(
        (status = 201, description = "Created semester", body = SemesterResponse),
        (status = 400, description = "Missing fields or duplicate code", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/admin/semesters", format = "application/json", data = "<semester>")]
#[tracing::instrument(skip(db))]
pub async fn semester_create(
    semester: Json<SemesterCreateData>,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<(Status, Json<SemesterResponse>), Problem> {
    let created = db.create_semester(semester.into_inner()).await?;

    Ok((Status::Created, Json(created.into())))
}

#[utoipa::path(
    responses((status = 200, description = "All semesters, newest first")),
    security(("jwt" = []))
)]
#[get("/admin/semesters")]
#[tracing::instrument(skip(db))]
pub async fn semester_list(
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<Json<Vec<SemesterResponse>>, Problem> {
    let semesters = db.list_semesters().await?;

    Ok(Json(semesters.into_iter().map(Into::into).collect()))
}

/// Fetches one semester with its classes populated.
#[utoipa::path(
    responses(
        (status = 200, description = "Semester with populated classes", body = SemesterDetailResponse),
        (status = 404, description = "Semester doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/admin/semesters/<id>")]
#[tracing::instrument(skip(db))]
pub async fn semester_get(
    id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<Json<SemesterDetailResponse>, Problem> {
    let semester = db
        .get_semester(id)
        .await?
        .ok_or_else(|| problem::not_found(id))?;

    let classes = db.list_classes_by_semester(id).await?;

    Ok(Json(SemesterDetailResponse {
        id: semester.id,
        name: semester.name,
        code: semester.code,
        classes: classes.into_iter().map(Into::into).collect(),
        created_at: semester.created_at,
    }))
}

#[utoipa::path(
    responses(
        (status = 200, description = "Classes of the semester"),
        (status = 404, description = "Semester doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/admin/semesters/<id>/classes")]
#[tracing::instrument(skip(db))]
pub async fn semester_classes(
    id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<Json<Data<Vec<ClassResponse>>>, Problem> {
    if db.get_semester(id).await?.is_none() {
        return Err(problem::not_found(id));
    }

    let classes = db.list_classes_by_semester(id).await?;

    Ok(Json(Data {
        data: classes.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    responses(
        (status = 200, description = "Deleted semester", body = SemesterResponse),
        (status = 400, description = "Semester still has classes", body = Problem),
        (status = 404, description = "Semester doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[delete("/admin/semesters/<id>")]
#[tracing::instrument(skip(db))]
pub async fn semester_delete(
    id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<Json<SemesterResponse>, Problem> {
    let removed = db
        .delete_semester(id)
        .await?
        .ok_or_else(|| problem::not_found(id))?;

    Ok(Json(removed.into()))
}
