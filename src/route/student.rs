use chrono::{DateTime, Utc};
use mongodb::Database;
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::Config;
use crate::data::class::db::ClassDbExt;
use crate::data::class::ClassResponse;
use crate::data::course::db::CourseDbExt;
use crate::data::course::CourseSummary;
use crate::data::student::db::{problem, StudentCreateData, StudentDbExt, StudentUpdateData};
use crate::data::student::{Student, StudentResponse, StudentSummary};
use crate::resp::jwt::{auth_problem, AdminClaims, AuthClaims};
use crate::resp::problem::Problem;
use crate::route::Data;
use crate::storage::{
    is_image_mime, problem as storage_problem, Attachments, ObjectStore, AVATAR_FOLDER,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentDetailResponse {
    pub id: Uuid,
    pub mssv: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub classes: Vec<Uuid>,
    pub courses: Vec<CourseSummary>,
    pub created_at: DateTime<Utc>,
}

#[derive(FromForm)]
pub struct ProfileUpdate<'r> {
    pub name: Option<String>,
    #[field(name = "newAvatar")]
    pub new_avatar: Option<TempFile<'r>>,
}

#[utoipa::path(
    request_body = StudentCreateData,
    responses(
        (status = 201, description = "Created student", body = StudentResponse),
        (status = 400, description = "Missing fields or duplicate email/mssv", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/admin/students", format = "application/json", data = "<student>")]
#[tracing::instrument(skip(db, c))]
pub async fn student_create(
    student: Json<StudentCreateData>,
    _admin: AdminClaims,
    db: &State<Database>,
    c: &State<Config>,
) -> Result<(Status, Json<StudentResponse>), Problem> {
    let created = db.create_student(student.into_inner()).await?;

    Ok((
        Status::Created,
        Json(StudentResponse::new(created, &c.default_avatar_url)),
    ))
}

#[get("/admin/students")]
#[tracing::instrument(skip(db, c))]
pub async fn student_list(
    _admin: AdminClaims,
    db: &State<Database>,
    c: &State<Config>,
) -> Result<Json<Vec<StudentResponse>>, Problem> {
    let students = db.list_students().await?;

    Ok(Json(
        students
            .into_iter()
            .map(|s| StudentResponse::new(s, &c.default_avatar_url))
            .collect(),
    ))
}

/// Student detail with enrolled courses populated.
#[utoipa::path(
    responses(
        (status = 200, description = "Student with populated courses", body = StudentDetailResponse),
        (status = 404, description = "Student doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/admin/students/<id>")]
#[tracing::instrument(skip(db, c))]
pub async fn student_get(
    id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
    c: &State<Config>,
) -> Result<Json<StudentDetailResponse>, Problem> {
    let student = db
        .get_student(id)
        .await?
        .ok_or_else(|| problem::not_found(id))?;

    let courses = db.courses_by_ids(&student.courses).await?;

    Ok(Json(StudentDetailResponse {
        id: student.id,
        mssv: student.mssv,
        name: student.name,
        email: student.email,
        avatar_url: student
            .avatar
            .map(|file| file.url)
            .unwrap_or_else(|| c.default_avatar_url.clone()),
        classes: student.classes,
        courses: courses.iter().map(CourseSummary::from).collect(),
        created_at: student.created_at,
    }))
}

/// Admin rename; emails never change.
#[put("/admin/students/<id>", format = "application/json", data = "<update>")]
#[tracing::instrument(skip(db))]
pub async fn student_update(
    id: Uuid,
    update: Json<StudentUpdateData>,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<Json<StudentSummary>, Problem> {
    let name = update
        .name
        .as_deref()
        .ok_or_else(problem::bad_name)?;

    let updated = db
        .update_student_name(id, name)
        .await?
        .ok_or_else(|| problem::not_found(id))?;

    Ok(Json(StudentSummary::from(updated)))
}

/// Deletes the student, scrubs every roster and releases a stored avatar.
#[utoipa::path(
    responses(
        (status = 200, description = "Deleted student", body = StudentSummary),
        (status = 404, description = "Student doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[delete("/admin/students/<id>")]
#[tracing::instrument(skip(db, store))]
pub async fn student_delete(
    id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
    store: &State<Box<dyn ObjectStore>>,
) -> Result<Json<StudentSummary>, Problem> {
    let removed = db
        .delete_student(id)
        .await?
        .ok_or_else(|| problem::not_found(id))?;

    if let Some(avatar) = &removed.avatar {
        Attachments::new(store.inner().as_ref())
            .release(avatar)
            .await;
    }

    Ok(Json(StudentSummary::from(removed)))
}

fn authorize_self_or_admin(auth: &AuthClaims, id: Uuid) -> Result<(), Problem> {
    if auth.sub != id && !auth.role.is_admin() {
        return Err(auth_problem("Profile belongs to another student."));
    }

    Ok(())
}

/// Multipart self-service update: new display name and/or a replacement
/// avatar in the `newAvatar` field. A replaced avatar's old object is
/// deleted unless it is the system default.
#[utoipa::path(
    responses(
        (status = 200, description = "Updated profile", body = StudentResponse),
        (status = 400, description = "No data or bad avatar", body = Problem),
        (status = 404, description = "Student doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[put("/student/<id>/profile", data = "<form>")]
#[tracing::instrument(skip(form, db, c, store))]
pub async fn student_profile_update(
    id: Uuid,
    mut form: Form<ProfileUpdate<'_>>,
    auth: AuthClaims,
    db: &State<Database>,
    c: &State<Config>,
    store: &State<Box<dyn ObjectStore>>,
) -> Result<Json<Data<StudentResponse>>, Problem> {
    authorize_self_or_admin(&auth, id)?;

    if form.name.is_none() && form.new_avatar.is_none() {
        return Err(Problem::new_untyped(
            Status::BadRequest,
            "Nothing to update.",
        ));
    }

    let mut student: Student = db
        .get_student(id)
        .await?
        .ok_or_else(|| problem::not_found(id))?;

    if let Some(file) = form.new_avatar.as_mut() {
        let upload = super::assignment::read_upload(file, c).await?;

        if !is_image_mime(&upload.mime_type) {
            return Err(storage_problem::avatar_not_image(&upload.mime_type));
        }

        let attachments = Attachments::new(store.inner().as_ref());
        let fresh = attachments
            .replace(student.avatar.as_ref(), AVATAR_FOLDER, &upload)
            .await?;

        student = match db.set_student_avatar(id, &fresh).await {
            Ok(Some(it)) => it,
            Ok(None) => {
                // student vanished between read and write
                attachments.release(&fresh).await;
                return Err(problem::not_found(id));
            }
            Err(e) => {
                // compensating action for the failed database write
                attachments.release(&fresh).await;
                return Err(e);
            }
        };
    }

    if let Some(name) = form.name.as_deref() {
        student = db
            .update_student_name(id, name)
            .await?
            .ok_or_else(|| problem::not_found(id))?;
    }

    Ok(Json(Data {
        data: StudentResponse::new(student, &c.default_avatar_url),
    }))
}

/// Classes the student is enrolled in, queried by roster membership.
#[get("/student/<id>/classes")]
#[tracing::instrument(skip(db))]
pub async fn student_classes(
    id: Uuid,
    auth: AuthClaims,
    db: &State<Database>,
) -> Result<Json<Data<Vec<ClassResponse>>>, Problem> {
    authorize_self_or_admin(&auth, id)?;

    if db.get_student(id).await?.is_none() {
        return Err(problem::not_found(id));
    }

    let classes = db.list_classes_for_student(id).await?;

    Ok(Json(Data {
        data: classes.into_iter().map(Into::into).collect(),
    }))
}
