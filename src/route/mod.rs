use std::collections::BTreeMap;

use rocket::{Build, Rocket, Route};
use serde::Serialize;

pub mod announcement;
pub mod assignment;
pub mod auth;
pub mod class;
pub mod course;
pub mod semester;
pub mod student;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    data::{
        announcement::{AnnouncementResponse, CommentResponse},
        announcement::db::{AnnouncementCreateData, CommentCreateData},
        assignment::AssignmentResponse,
        class::db::ClassCreateData,
        class::ClassResponse,
        course::db::{CourseCreateData, CourseUpdateData},
        course::{CourseResponse, CourseSummary, SessionCount},
        semester::db::SemesterCreateData,
        semester::SemesterResponse,
        student::db::{StudentCreateData, StudentUpdateData},
        student::{StudentResponse, StudentSummary},
    },
    resp::{jwt::doc::JWTAuth, problem::Problem},
    role::Role,
    storage::StoredFile,
};

/// `{"data": ...}` envelope used by most endpoints.
#[derive(Debug, Serialize)]
pub struct Data<T: Serialize> {
    pub data: T,
}

/// Listing envelope with an element count, mirroring the feed endpoints.
#[derive(Debug, Serialize)]
pub struct Listing<T: Serialize> {
    pub count: usize,
    pub data: Vec<T>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        semester::semester_create,
        semester::semester_list,
        semester::semester_get,
        semester::semester_classes,
        semester::semester_delete,
        class::class_create,
        class::class_delete,
        class::class_invite,
        class::class_students,
        announcement::announcement_create,
        announcement::announcement_list,
        announcement::comment_create,
        assignment::assignment_create,
        assignment::assignment_list,
        assignment::assignment_delete,
        student::student_create,
        student::student_get,
        student::student_delete,
        student::student_profile_update,
        course::course_create,
    ),
    components(schemas(
        Role,
        Problem,
        StoredFile,
        auth::LoginData,
        auth::LoginUser,
        auth::LoginResponse,
        SemesterCreateData,
        SemesterResponse,
        semester::SemesterDetailResponse,
        ClassCreateData,
        ClassResponse,
        class::InviteData,
        class::InviteResponse,
        AnnouncementCreateData,
        CommentCreateData,
        AnnouncementResponse,
        CommentResponse,
        AssignmentResponse,
        StudentCreateData,
        StudentUpdateData,
        StudentResponse,
        StudentSummary,
        student::StudentDetailResponse,
        CourseCreateData,
        CourseUpdateData,
        CourseResponse,
        CourseSummary,
        course::CourseDetailResponse,
        SessionCount,
    )),
    modifiers(&JWTAuth, &API_PREFIX)
)]
pub struct ApiDoc;

pub struct PathPrefix(pub &'static str);
static API_PREFIX: PathPrefix = PathPrefix("/api");

impl utoipa::Modify for PathPrefix {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut new_paths = BTreeMap::new();

        for (path, item) in std::mem::take(&mut openapi.paths.paths) {
            new_paths.insert(self.0.to_string() + path.as_ref(), item);
        }

        openapi.paths.paths = new_paths;
    }
}

pub fn api() -> Vec<Route> {
    routes![
        auth::login,
        semester::semester_create,
        semester::semester_list,
        semester::semester_get,
        semester::semester_classes,
        semester::semester_delete,
        class::class_create,
        class::class_list,
        class::class_get,
        class::class_delete,
        class::class_invite,
        class::class_students,
        class::class_add_student,
        class::class_remove_student,
        announcement::announcement_create,
        announcement::announcement_list,
        announcement::comment_create,
        assignment::assignment_create,
        assignment::assignment_list,
        assignment::assignment_delete,
        student::student_create,
        student::student_list,
        student::student_get,
        student::student_update,
        student::student_delete,
        student::student_profile_update,
        student::student_classes,
        course::course_create,
        course::course_list,
        course::course_get,
        course::course_update,
        course::course_delete,
        course::course_add_student,
        course::course_remove_student,
    ]
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount("/api", api()).mount(
        "/",
        SwaggerUi::new("/swagger/<_..>").url("/api/openapi.json", ApiDoc::openapi()),
    )
}
