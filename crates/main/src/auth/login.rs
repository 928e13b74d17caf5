use argon2::{Argon2, PasswordHash, PasswordVerifier};
use db::{
    schema::users,
    user::{set_login_cookie, User},
    DbConn,
};
use diesel::prelude::*;
use rocket::{
    form::Form,
    http::CookieJar,
    response::{Flash, Redirect},
};
use serde::Serialize;

use crate::html::page_of_body;

#[get("/login")]
pub async fn login_page(
    user: Option<User>,
) -> Result<maud::Markup, Flash<Redirect>> {
    if user.is_some() {
        return Err(Flash::error(
            Redirect::to("/"),
            "You are already logged in!",
        ));
    }

    Ok(page_of_body(login_form(None), user))
}

#[derive(FromForm, Serialize, Debug)]
pub struct PasswordLoginForm {
    pub email: String,
    pub password: String,
}

#[post("/login", data = "<form>")]
pub async fn do_login(
    user: Option<User>,
    form: Form<PasswordLoginForm>,
    jar: &CookieJar<'_>,
    db: DbConn,
) -> Result<maud::Markup, Flash<Redirect>> {
    if user.is_some() {
        return Err(Flash::error(
            Redirect::to("/"),
            "You are already logged in!",
        ));
    }

    let (ret, set_cookie) = db
        .run(move |conn| {
            let user: Option<User> = users::table
                .filter(users::email.eq(&form.email))
                .first::<User>(conn)
                .optional()
                .unwrap();

            match user {
                Some(user) => {
                    let parsed_hash =
                        PasswordHash::new(&user.password_hash).unwrap();
                    if Argon2::default()
                        .verify_password(form.password.as_bytes(), &parsed_hash)
                        .is_ok()
                    {
                        (
                            Err(Flash::new(
                                Redirect::to("/"),
                                "info",
                                "You are now logged in.",
                            )),
                            Some(user.id),
                        )
                    } else {
                        // the requester has not authenticated, so the page
                        // must not carry the looked-up account's chrome
                        (
                            Ok(page_of_body(
                                login_form(Some(
                                    "Incorrect password.".to_string(),
                                )),
                                None,
                            )),
                            None,
                        )
                    }
                }
                None => (
                    Ok(page_of_body(
                        login_form(Some("No such user".to_string())),
                        user,
                    )),
                    None,
                ),
            }
        })
        .await;

    if let Some(id) = set_cookie {
        set_login_cookie(id, jar);
    }
    ret
}

fn login_form(error: Option<String>) -> maud::Markup {
    maud::html! {
        div class="container" {
            @if let Some(err) = error {
                div class="alert alert-danger" {
                    (err)
                }
            }
            form method="post" {
                div class="form-group" {
                    label for="email" { "Email address" }
                    input type="email" class="form-control" id="email" name="email" placeholder="Enter email";
                }
                div class="form-group" {
                    label for="password" { "Password" }
                    input type="password" class="form-control" id="password" name="password" placeholder="Password";
                }
                button type="submit" class="btn btn-primary" { "Submit" }
            }
        }
    }
}
