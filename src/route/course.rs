use chrono::{DateTime, Utc};
use mongodb::Database;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::course::db::{problem, CourseCreateData, CourseDbExt, CourseUpdateData};
use crate::data::course::{CourseResponse, SessionCount};
use crate::data::student::db::StudentDbExt;
use crate::data::student::StudentSummary;
use crate::resp::jwt::AdminClaims;
use crate::resp::problem::Problem;
use crate::roster::RosterDbExt;

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseDetailResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub sessions: SessionCount,
    pub semester_code: String,
    pub students: Vec<StudentSummary>,
    pub created_at: DateTime<Utc>,
}

#[utoipa::path(
    request_body = CourseCreateData,
    responses(
        (status = 201, description = "Created course", body = CourseResponse),
        (status = 400, description = "Missing fields, bad session count or duplicate code", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/admin/courses", format = "application/json", data = "<course>")]
#[tracing::instrument(skip(db))]
pub async fn course_create(
    course: Json<CourseCreateData>,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<(Status, Json<CourseResponse>), Problem> {
    let created = db.create_course(course.into_inner()).await?;

    Ok((Status::Created, Json(created.into())))
}

#[get("/admin/courses")]
#[tracing::instrument(skip(db))]
pub async fn course_list(
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<Json<Vec<CourseResponse>>, Problem> {
    let courses = db.list_courses().await?;

    Ok(Json(courses.into_iter().map(Into::into).collect()))
}

/// Course detail with its roster populated.
#[get("/admin/courses/<id>")]
#[tracing::instrument(skip(db))]
pub async fn course_get(
    id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<Json<CourseDetailResponse>, Problem> {
    let course = db
        .get_course(id)
        .await?
        .ok_or_else(|| problem::not_found(id))?;

    let students = db.students_by_ids(&course.students).await?;

    Ok(Json(CourseDetailResponse {
        id: course.id,
        code: course.code,
        name: course.name,
        sessions: course.sessions,
        semester_code: course.semester_code,
        students: students.iter().map(StudentSummary::from).collect(),
        created_at: course.created_at,
    }))
}

#[put("/admin/courses/<id>", format = "application/json", data = "<update>")]
#[tracing::instrument(skip(db))]
pub async fn course_update(
    id: Uuid,
    update: Json<CourseUpdateData>,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<Json<CourseResponse>, Problem> {
    let updated = db
        .update_course(id, update.into_inner())
        .await?
        .ok_or_else(|| problem::not_found(id))?;

    Ok(Json(updated.into()))
}

#[delete("/admin/courses/<id>")]
#[tracing::instrument(skip(db))]
pub async fn course_delete(
    id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<Json<CourseResponse>, Problem> {
    let removed = db
        .delete_course(id)
        .await?
        .ok_or_else(|| problem::not_found(id))?;

    Ok(Json(removed.into()))
}

#[put("/admin/courses/<id>/students/<student_id>")]
#[tracing::instrument(skip(db))]
pub async fn course_add_student(
    id: Uuid,
    student_id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<(), Problem> {
    db.add_student_to_course(id, student_id).await
}

#[delete("/admin/courses/<id>/students/<student_id>")]
#[tracing::instrument(skip(db))]
pub async fn course_remove_student(
    id: Uuid,
    student_id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<(), Problem> {
    db.remove_student_from_course(id, student_id).await
}
