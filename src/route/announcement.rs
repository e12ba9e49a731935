use std::collections::HashMap;

use mongodb::Database;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use uuid::Uuid;

use crate::data::announcement::db::{
    problem, AnnouncementCreateData, AnnouncementDbExt, CommentCreateData,
};
use crate::data::announcement::{Announcement, AnnouncementResponse, Comment, CommentResponse};
use crate::data::class::db::{problem as class_problem, ClassDbExt};
use crate::data::student::db::{problem as student_problem, StudentDbExt};
use crate::data::student::StudentSummary;
use crate::resp::jwt::AdminClaims;
use crate::resp::problem::{problems, Problem};
use crate::route::{Data, Listing};

/// Loads the whitelisted author info for every comment in `announcements`.
async fn comment_authors(
    db: &Database,
    announcements: &[Announcement],
) -> Result<HashMap<Uuid, StudentSummary>, Problem> {
    let mut ids: Vec<Uuid> = announcements
        .iter()
        .flat_map(|a| a.comments.iter().map(|c| c.author))
        .collect();
    ids.sort();
    ids.dedup();

    let students = db.students_by_ids(&ids).await?;

    Ok(students
        .iter()
        .map(|s| (s.id, StudentSummary::from(s)))
        .collect())
}

#[utoipa::path(
    request_body = AnnouncementCreateData,
    responses(
        (status = 201, description = "Created announcement", body = AnnouncementResponse),
        (status = 400, description = "Empty or over-long content", body = Problem),
        (status = 404, description = "Class doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post(
    "/admin/classes/<class_id>/announcements",
    format = "application/json",
    data = "<announcement>"
)]
#[tracing::instrument(skip(db))]
pub async fn announcement_create(
    class_id: Uuid,
    announcement: Json<AnnouncementCreateData>,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<(Status, Json<Data<AnnouncementResponse>>), Problem> {
    if db.get_class(class_id).await?.is_none() {
        return Err(class_problem::not_found(class_id));
    }

    let created = db
        .create_announcement(class_id, announcement.into_inner())
        .await?;

    Ok((
        Status::Created,
        Json(Data {
            data: AnnouncementResponse::populated(created, &HashMap::new()),
        }),
    ))
}

/// Newest announcements first, comment authors populated.
#[utoipa::path(
    responses(
        (status = 200, description = "Announcements of the class"),
        (status = 404, description = "Class doesn't exist", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/admin/classes/<class_id>/announcements")]
#[tracing::instrument(skip(db))]
pub async fn announcement_list(
    class_id: Uuid,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<Json<Listing<AnnouncementResponse>>, Problem> {
    if db.get_class(class_id).await?.is_none() {
        return Err(class_problem::not_found(class_id));
    }

    let announcements = db.list_announcements_for_class(class_id).await?;
    let authors = comment_authors(db, &announcements).await?;

    let data: Vec<AnnouncementResponse> = announcements
        .into_iter()
        .map(|a| AnnouncementResponse::populated(a, &authors))
        .collect();

    Ok(Json(Listing {
        count: data.len(),
        data,
    }))
}

#[utoipa::path(
    request_body = CommentCreateData,
    responses(
        (status = 201, description = "Added comment", body = CommentResponse),
        (status = 400, description = "Missing content/user or bad identifier", body = Problem),
        (status = 404, description = "Announcement or user missing", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post(
    "/admin/classes/<_class_id>/announcements/<announcement_id>/comments",
    format = "application/json",
    data = "<comment>"
)]
#[tracing::instrument(skip(db))]
pub async fn comment_create(
    _class_id: Uuid,
    announcement_id: Uuid,
    comment: Json<CommentCreateData>,
    _admin: AdminClaims,
    db: &State<Database>,
) -> Result<(Status, Json<Data<CommentResponse>>), Problem> {
    let comment = comment.into_inner();
    comment.validate()?;

    let author_id = Uuid::parse_str(comment.user.trim())
        .map_err(|_| problems::invalid_identifier(comment.user.trim()))?;

    let author = db
        .get_student(author_id)
        .await?
        .ok_or_else(|| student_problem::not_found(author_id))?;

    if db.get_announcement(announcement_id).await?.is_none() {
        return Err(problem::not_found(announcement_id));
    }

    let stored = Comment {
        author: author_id,
        content: comment.content.trim().to_string(),
        created_at: chrono::Utc::now(),
    };

    db.push_comment(announcement_id, stored.clone()).await?;

    Ok((
        Status::Created,
        Json(Data {
            data: CommentResponse {
                user: Some(StudentSummary::from(&author)),
                content: stored.content,
                created_at: stored.created_at,
            },
        }),
    ))
}
