use mongodb::Database;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::assignment::db::AssignmentDbExt;
use crate::data::class::db::{problem, ClassCreateData, ClassDbExt};
use crate::data::class::ClassResponse;
use crate::data::student::db::StudentDbExt;
use crate::data::student::StudentSummary;
use crate::resp::jwt::AdminClaims;
use crate::resp::problem::Problem;
use crate::roster::RosterDbExt;
use crate::route::Data;
use crate::storage::{Attachments, ObjectStore};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InviteData {
    #[schema(format = "email")]
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InviteResponse {
    pub student: StudentSummary,
}

#[utoipa::path(
    request_body = ClassCreateData,
    responses(
        (status = 201, description = "Created class", body = ClassResponse),
        (status = 400, description = "Missing class name", body = Problem),
        (status = 404, description = "Semester doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/admin/classes", format = "application/json", data = "<class>")]
#[tracing::instrument(skip(db))]
pub async fn class_create(
    class: Json<ClassCreateData>,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<(Status, Json<ClassResponse>), Problem> {
    let created = db.create_class(class.into_inner()).await?;

    Ok((Status::Created, Json(created.into())))
}

#[get("/admin/classes")]
#[tracing::instrument(skip(db))]
pub async fn class_list(
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<Json<Data<Vec<ClassResponse>>>, Problem> {
    let classes = db.list_classes().await?;

    Ok(Json(Data {
        data: classes.into_iter().map(Into::into).collect(),
    }))
}

#[get("/admin/classes/<id>")]
#[tracing::instrument(skip(db))]
pub async fn class_get(
    id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<Json<ClassResponse>, Problem> {
    let class = db
        .get_class(id)
        .await?
        .ok_or_else(|| problem::not_found(id))?;

    Ok(Json(class.into()))
}

/// Deleting a class releases its assignments' stored files before the
/// documents and cross-references go.
#[utoipa::path(
    responses(
        (status = 200, description = "Deleted class", body = ClassResponse),
        (status = 404, description = "Class doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[delete("/admin/classes/<id>")]
#[tracing::instrument(skip(db, store))]
pub async fn class_delete(
    id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
    store: &State<Box<dyn ObjectStore>>,
) -> Result<Json<ClassResponse>, Problem> {
    if db.get_class(id).await?.is_none() {
        return Err(problem::not_found(id));
    }

    let assignments = db.take_assignments_for_class(id).await?;

    let attachments = Attachments::new(store.inner().as_ref());
    for assignment in &assignments {
        if let Some(file) = &assignment.file {
            attachments.release(file).await;
        }
    }

    let removed = db
        .delete_class(id)
        .await?
        .ok_or_else(|| problem::not_found(id))?;

    Ok(Json(removed.into()))
}

/// Adds a student to the class roster by email.
#[utoipa::path(
    request_body = InviteData,
    responses(
        (status = 200, description = "Enrolled student", body = InviteResponse),
        (status = 400, description = "Missing email or already a member", body = Problem),
        (status = 404, description = "Class or student missing", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/admin/classes/<id>/invite", format = "application/json", data = "<invite>")]
#[tracing::instrument(skip(db))]
pub async fn class_invite(
    id: Uuid,
    invite: Json<InviteData>,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<Json<InviteResponse>, Problem> {
    if invite.email.trim().is_empty() {
        return Err(Problem::new_untyped(
            Status::BadRequest,
            "Email is required.",
        ));
    }

    let student = db.invite_student_by_email(id, invite.email.trim()).await?;

    Ok(Json(InviteResponse {
        student: StudentSummary::from(student),
    }))
}

/// Current roster with whitelisted student fields populated.
#[utoipa::path(
    responses(
        (status = 200, description = "Roster of the class"),
        (status = 404, description = "Class doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/admin/classes/<id>/students")]
#[tracing::instrument(skip(db))]
pub async fn class_students(
    id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<Json<Data<Vec<StudentSummary>>>, Problem> {
    let class = db
        .get_class(id)
        .await?
        .ok_or_else(|| problem::not_found(id))?;

    let students = db.students_by_ids(&class.students).await?;

    Ok(Json(Data {
        data: students.iter().map(StudentSummary::from).collect(),
    }))
}

#[put("/admin/classes/<id>/students/<student_id>")]
#[tracing::instrument(skip(db))]
pub async fn class_add_student(
    id: Uuid,
    student_id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<(), Problem> {
    db.add_student_to_class(id, student_id).await
}

#[delete("/admin/classes/<id>/students/<student_id>")]
#[tracing::instrument(skip(db))]
pub async fn class_remove_student(
    id: Uuid,
    student_id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<(), Problem> {
    db.remove_student_from_class(id, student_id).await
}
