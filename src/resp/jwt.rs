use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::Status;
use rocket::request::{self, FromRequest, Request};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::resp::problem::Problem;
use crate::role::Role;
use crate::util::date_time_as_unix_seconds;

/// Issued tokens stay valid this long; there is no revocation list, so a
/// leaked token remains usable until expiry.
pub fn token_validity() -> Duration {
    Duration::days(7)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthClaims {
    #[serde(with = "date_time_as_unix_seconds")]
    iat: DateTime<Utc>,
    #[serde(with = "date_time_as_unix_seconds")]
    exp: DateTime<Utc>,
    pub sub: Uuid,
    pub role: Role,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token signature mismatch")]
    SignatureMismatch,
    #[error("malformed token")]
    Invalid,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
            _ => TokenError::Invalid,
        }
    }
}

impl From<TokenError> for Problem {
    fn from(e: TokenError) -> Self {
        auth_problem(e)
    }
}

impl AuthClaims {
    pub fn new(sub: Uuid, role: Role) -> AuthClaims {
        let now = Utc::now();
        AuthClaims {
            iat: now,
            exp: now + token_validity(),
            sub,
            role,
        }
    }

    pub fn encode_jwt(&self, secret: impl AsRef<[u8]>) -> Result<String, TokenError> {
        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret(secret.as_ref());

        encode(&header, &self, &key).map_err(TokenError::from)
    }
}

pub fn decode_jwt(token: &str, secret: impl AsRef<[u8]>) -> Result<AuthClaims, TokenError> {
    decode::<AuthClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(TokenError::from)
}

pub fn auth_problem(detail: impl ToString) -> Problem {
    Problem::new_untyped(Status::Unauthorized, "Unable to authorize user.")
        .detail(detail)
        .clone()
}

fn bearer_token<'r>(req: &'r Request<'_>) -> Option<&'r str> {
    req.headers()
        .get_one("Authorization")?
        .strip_prefix("Bearer ")
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthClaims {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let config: &Config = req.rocket().state().unwrap();

        tracing::trace!("extracting auth claims from request headers");
        let token = match bearer_token(req) {
            Some(it) => it,
            None => {
                return request::Outcome::Error((
                    Status::Unauthorized,
                    auth_problem("No bearer token."),
                ));
            }
        };

        match decode_jwt(token, &config.jwt_secret) {
            Ok(claims) => {
                tracing::debug!("decoded auth claims for principal: {}", claims.sub);
                request::Outcome::Success(claims)
            }
            Err(e) => {
                tracing::debug!("unable to decode bearer token: {}", e);
                request::Outcome::Error((Status::Unauthorized, e.into()))
            }
        }
    }
}

/// Guard for `/api/admin` routes; succeeds only for `Role::Admin` claims.
#[derive(Debug, Clone)]
pub struct AdminClaims(pub AuthClaims);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminClaims {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let claims = match AuthClaims::from_request(req).await {
            request::Outcome::Success(it) => it,
            request::Outcome::Error(e) => return request::Outcome::Error(e),
            request::Outcome::Forward(f) => return request::Outcome::Forward(f),
        };

        if !claims.role.is_admin() {
            return request::Outcome::Error((
                Status::Unauthorized,
                auth_problem("Administrator privileges required."),
            ));
        }

        request::Outcome::Success(AdminClaims(claims))
    }
}

pub mod doc {
    use utoipa::openapi::security::*;

    #[derive(Clone, Copy)]
    pub struct JWTAuth;

    impl From<JWTAuth> for SecurityScheme {
        fn from(_: JWTAuth) -> SecurityScheme {
            let mut http = Http::new(HttpAuthScheme::Bearer);
            http.bearer_format = Some("JWT".to_string());
            SecurityScheme::Http(http)
        }
    }

    impl utoipa::Modify for JWTAuth {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            let c = openapi.components.as_mut().unwrap();
            c.add_security_scheme("jwt", *self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::SubsecRound;

    const SECRET: &[u8] = b"test-signing-secret";

    #[test]
    fn jwt_round_trips() {
        let mut now = Utc::now();
        now = now.round_subsecs(0);

        let sub = Uuid::new_v4();

        let claims = AuthClaims {
            iat: now,
            exp: now + token_validity(),
            sub,
            role: Role::Admin,
        };

        let token = claims
            .encode_jwt(SECRET)
            .expect("encoding should work for example");

        let decoded = decode_jwt(&token, SECRET).expect("unable to decode encoded token");

        assert_eq!(now, decoded.iat);
        assert_eq!(now + token_validity(), decoded.exp);
        assert_eq!(sub, decoded.sub);
        assert_eq!(decoded.role, Role::Admin);
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let issued = Utc::now() - Duration::days(8);
        let claims = AuthClaims {
            iat: issued,
            exp: issued + token_validity(),
            sub: Uuid::new_v4(),
            role: Role::Student,
        };

        let token = claims.encode_jwt(SECRET).expect("encodable");

        assert_eq!(decode_jwt(&token, SECRET), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_token_is_rejected_as_signature_mismatch() {
        let claims = AuthClaims::new(Uuid::new_v4(), Role::Student);
        let token = claims.encode_jwt(SECRET).expect("encodable");

        assert_eq!(
            decode_jwt(&token, b"some-other-secret"),
            Err(TokenError::SignatureMismatch)
        );
    }

    #[test]
    fn garbage_token_is_rejected_as_invalid() {
        assert_eq!(
            decode_jwt("not-a-jwt-at-all", SECRET),
            Err(TokenError::Invalid)
        );
    }
}
