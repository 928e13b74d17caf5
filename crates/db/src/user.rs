use chrono::NaiveDateTime;
use diesel::prelude::*;
use once_cell::sync::Lazy;
use regex::Regex;
use rocket::{
    http::{Cookie, CookieJar, Status},
    outcome::try_outcome,
    request::{self, FromRequest},
    Request,
};
use serde::Serialize;

use crate::{schema, DbConn};

pub const LOGIN_COOKIE: &str = "council_session";

#[derive(Debug, Queryable, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub public_id: String,
    pub roll_no: String,
    pub name: String,
    pub email: String,
    pub department: String,
    pub semester: String,
    pub phone_no: String,
    pub password_hash: String,
    pub is_phone_no_verified: bool,
    pub has_filled_profile: bool,
    pub is_from_fcrit: bool,
    pub email_send: bool,
    pub is_superuser: bool,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn validate_email(email: &str) -> bool {
        static RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"(?m)^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
            )
            .unwrap()
        });
        RE.is_match(email)
    }

    pub fn validate_password(password: &str) -> bool {
        password.len() >= 6
    }
}

#[derive(Debug)]
pub enum AuthError {
    CookieMissingOrMalformed,
    NoDatabase,
    Unauthorized,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct LoginSession {
    id: i64,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = AuthError;

    async fn from_request(
        request: &'r Request<'_>,
    ) -> request::Outcome<Self, AuthError> {
        let db = try_outcome!(request
            .guard::<DbConn>()
            .await
            .map_error(|(t, _)| (t, AuthError::NoDatabase)));

        let login_cookie = match request.cookies().get_private(LOGIN_COOKIE) {
            Some(cookie) => cookie,
            None => {
                return rocket::request::Outcome::Error((
                    Status::BadRequest,
                    AuthError::CookieMissingOrMalformed,
                ));
            }
        };

        let login: LoginSession =
            match serde_json::from_str(login_cookie.value()) {
                Ok(t) => t,
                Err(error) => {
                    tracing::debug!(%error, "removing malformed login cookie");

                    // a malformed cookie would otherwise persist and prevent
                    // the user from ever logging in again
                    request.cookies().remove_private(LOGIN_COOKIE);
                    return rocket::request::Outcome::Error((
                        Status::BadRequest,
                        AuthError::CookieMissingOrMalformed,
                    ));
                }
            };

        let user = match db
            .run(move |conn| {
                schema::users::table
                    .filter(schema::users::id.eq(login.id))
                    .first(conn)
                    .optional()
            })
            .await
        {
            Ok(Some(user)) => Some(user),
            Ok(None) => None,
            Err(_) => {
                return rocket::request::Outcome::Error((
                    Status::InternalServerError,
                    AuthError::NoDatabase,
                ));
            }
        };

        match user {
            Some(user) => rocket::request::Outcome::Success(user),
            None => rocket::request::Outcome::Error((
                Status::Unauthorized,
                AuthError::Unauthorized,
            )),
        }
    }
}

pub fn set_login_cookie(id: i64, jar: &CookieJar) {
    jar.add_private(Cookie::new(
        LOGIN_COOKIE,
        serde_json::to_string(&LoginSession { id }).unwrap(),
    ));
}
