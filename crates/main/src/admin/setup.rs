use db::user::User;
use db::{schema::users, DbConn};
use diesel::prelude::*;
use maud::Markup;
use rocket::{form::Form, response::Redirect};
use serde::Serialize;
use uuid::Uuid;

use crate::html::{error_403, page_of_body};
use crate::util::hash_password;

fn setup_page_form(error: Option<String>) -> Markup {
    page_of_body(
        maud::html! {
            @if let Some(err) = error {
                div class="alert alert-danger" role="alert" {
                    (err)
                }
            }
            form method="POST" class="container" action="/admin/setup" {
                div class="mb-3" {
                    label for="name" class="form-label" { "Name" }
                    input type="text" class="form-control" id="name" name="name" required;
                }
                div class="mb-3" {
                    label for="roll_no" class="form-label" { "Roll number" }
                    input type="text" class="form-control" id="roll_no" name="roll_no" required;
                }
                div class="mb-3" {
                    label for="email" class="form-label" { "Email" }
                    input type="email" class="form-control" id="email" name="email" required;
                }
                div class="mb-3" {
                    label for="password" class="form-label" { "Password" }
                    input type="password" class="form-control" id="password" name="password" required;
                }
                div class="mb-3" {
                    label for="password2" class="form-label" { "Password confirmation" }
                    input type="password" class="form-control" id="password2" name="password2" required;
                }
                button type="submit" class="btn btn-primary" { "Create Admin Account" }
            }
        },
        None,
    )
}

#[get("/admin/setup")]
/// Page to create the first account. This is here for convenience (it would
/// also be possible to do so by manual access to the database, but this is
/// always possible).
pub async fn setup_page(db: DbConn) -> Markup {
    db.run(|conn| {
        let user_count = users::table.count().get_result::<i64>(conn).unwrap();

        if user_count > 0 {
            return error_403(
                Some("Error: setup has already been performed!".to_string()),
                None,
            );
        }

        setup_page_form(None)
    })
    .await
}

#[derive(FromForm, Serialize)]
pub struct SetupForm {
    pub name: String,
    pub roll_no: String,
    pub email: String,
    pub password: String,
    pub password2: String,
}

#[post("/admin/setup", data = "<form>")]
/// Creates a superuser. This is only permitted if no users currently exist
/// in the system.
pub async fn do_setup(
    db: DbConn,
    form: Form<SetupForm>,
) -> Result<Redirect, Markup> {
    db.run(move |conn| {
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let user_count = users::table.count().get_result::<i64>(conn)?;

            if user_count > 0 {
                return Ok(Err(error_403(
                    Some(
                        "Error: setup has already been performed!".to_string(),
                    ),
                    None,
                )));
            }

            if form.password != form.password2 {
                return Ok(Err(setup_page_form(Some(
                    "Error: those passwords do not match!".to_string(),
                ))));
            }

            if !User::validate_email(&form.email) {
                return Ok(Err(setup_page_form(Some(
                    "Error: your email is not a valid email.".to_string(),
                ))));
            }

            if !User::validate_password(&form.password) {
                return Ok(Err(setup_page_form(Some(
                    "Error: your password should be at least 6 characters."
                        .to_string(),
                ))));
            }

            let n = diesel::insert_into(users::table)
                .values((
                    users::public_id.eq(Uuid::new_v4().to_string()),
                    users::roll_no.eq(&form.roll_no),
                    users::name.eq(&form.name),
                    users::email.eq(&form.email),
                    users::department.eq(""),
                    users::semester.eq(""),
                    users::phone_no.eq(""),
                    users::password_hash.eq(hash_password(&form.password)),
                    users::is_phone_no_verified.eq(false),
                    users::has_filled_profile.eq(false),
                    users::is_from_fcrit.eq(false),
                    users::email_send.eq(false),
                    users::is_superuser.eq(true),
                    users::created_at.eq(diesel::dsl::now),
                ))
                .execute(conn)
                .unwrap();
            assert_eq!(n, 1);

            Ok(Ok(Redirect::to("/admin")))
        })
        .unwrap()
    })
    .await
}
