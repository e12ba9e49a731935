use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::Config;
use crate::data::admin::db::AdminDbExt;
use crate::data::student::db::StudentDbExt;
use crate::resp::jwt::AuthClaims;
use crate::resp::problem::Problem;
use crate::role::Role;

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    #[inline]
    pub fn missing_fields() -> Problem {
        Problem::new_untyped(Status::BadRequest, "Email and password are required.")
    }

    #[inline]
    pub fn bad_login() -> Problem {
        Problem::new_untyped(Status::Unauthorized, "Bad email or password.")
    }
}

#[derive(Clone, Deserialize, ToSchema)]
pub struct LoginData {
    #[schema(format = "email")]
    pub email: String,
    #[schema(format = "password")]
    pub password: String,
}

impl std::fmt::Debug for LoginData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LoginData:{}", self.email)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

/// Admin accounts take precedence; an email unknown to both stores reports
/// the same failure as a wrong password.
#[utoipa::path(
    request_body = LoginData,
    responses(
        (status = 200, description = "Token and authenticated principal", body = LoginResponse),
        (status = 400, description = "Missing email or password", body = Problem),
        (status = 401, description = "Unknown email or wrong password", body = Problem),
    )
)]
#[post("/auth/login", format = "application/json", data = "<login>")]
#[tracing::instrument(skip(db, c))]
pub async fn login(
    login: Json<LoginData>,
    db: &State<Database>,
    c: &State<Config>,
) -> Result<Json<LoginResponse>, Problem> {
    if login.email.trim().is_empty() || login.password.is_empty() {
        return Err(problem::missing_fields());
    }

    if let Some(admin) = db.find_admin_by_email(&login.email).await? {
        if !admin.pw_hash.verify(&login.password) {
            return Err(problem::bad_login());
        }

        let token = AuthClaims::new(admin.id, Role::Admin).encode_jwt(&c.jwt_secret)?;

        return Ok(Json(LoginResponse {
            token,
            user: LoginUser {
                id: admin.id,
                name: admin.name,
                email: admin.email,
                role: Role::Admin,
            },
        }));
    }

    let student = db
        .find_student_by_email(&login.email)
        .await?
        .ok_or_else(problem::bad_login)?;

    if !student.pw_hash.verify(&login.password) {
        return Err(problem::bad_login());
    }

    let token = AuthClaims::new(student.id, Role::Student).encode_jwt(&c.jwt_secret)?;

    Ok(Json(LoginResponse {
        token,
        user: LoginUser {
            id: student.id,
            name: student.name,
            email: student.email,
            role: Role::Student,
        },
    }))
}
