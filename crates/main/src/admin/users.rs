use std::sync::Arc;

use db::{config::ConfigItem, schema::users, user::User, DbConn};
use diesel::prelude::*;
use email::send_mail;
use maud::{html, Markup};
use rocket::form::Form;

use crate::{
    admin::{action_buttons, selection_checkbox, AdminAction, SelectionForm},
    csv_export::{render_csv, Column, CsvDownload},
    html::{error_403, page_of_body, page_title},
    permissions::{has_permission, Permission},
    util::{hash_password, short_random},
};

pub const USER_ACTIONS: [AdminAction; 2] = [
    AdminAction {
        label: "Send Email To User",
        route: "/admin/users/email",
    },
    AdminAction {
        label: "Download Csv",
        route: "/admin/users/export",
    },
];

/// Where the credentials email points recipients, unless the `login_url`
/// config key overrides it.
const DEFAULT_LOGIN_URL: &str = "https://faces.fcrit.ac.in";

/// Lists every user; `?q=` narrows the list to rows whose roll number,
/// name or email contains the query.
#[get("/admin/users?<q>")]
pub async fn users_page(
    user: User,
    db: DbConn,
    q: Option<String>,
) -> Result<Markup, Markup> {
    if !has_permission(Some(&user), &Permission::AdministerRecords) {
        return Err(error_403(
            Some("Error: you are not authorized to view this page"),
            Some(user),
        ));
    }

    let query = q.clone();
    let all_users: Vec<User> = db
        .run(move |conn| {
            let mut listing = users::table.into_boxed();
            if let Some(q) = query {
                let pattern = format!("%{q}%");
                listing = listing.filter(
                    users::roll_no
                        .like(pattern.clone())
                        .or(users::name.like(pattern.clone()))
                        .or(users::email.like(pattern)),
                );
            }
            listing.order_by(users::roll_no.asc()).load(conn).unwrap()
        })
        .await;

    let search_form = html! {
        form method="get" class="row g-2 mb-3" {
            div class="col-auto" {
                input type="text" class="form-control" name="q"
                    placeholder="Search roll no, name or email"
                    value=[q.as_deref()];
            }
            div class="col-auto" {
                button type="submit" class="btn btn-outline-secondary" { "Search" }
            }
        }
    };

    let table = html! {
        form method="post" {
            (action_buttons(&USER_ACTIONS))
            table class="table" {
                thead {
                    tr {
                        th scope="col" {}
                        th scope="col" { "Roll no" }
                        th scope="col" { "Name" }
                        th scope="col" { "Email" }
                        th scope="col" { "Department" }
                        th scope="col" { "Semester" }
                        th scope="col" { "Email sent" }
                    }
                }
                tbody {
                    @for record in all_users.iter() {
                        tr {
                            td { (selection_checkbox(&record.public_id)) }
                            td { (record.roll_no) }
                            td { (record.name) }
                            td { (record.email) }
                            td { (record.department) }
                            td { (record.semester) }
                            td {
                                @if record.email_send {
                                    span class="badge bg-success" { "yes" }
                                } @else {
                                    span class="badge bg-secondary" { "no" }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    Ok(page_of_body(
        html! {
            (page_title("Users"))
            (search_form)
            (table)
        },
        Some(user),
    ))
}

/// The full model projection, in schema order.
fn user_columns() -> Vec<Column<User>> {
    vec![
        Column {
            header: "id",
            accessor: |u| u.id.to_string(),
        },
        Column {
            header: "public_id",
            accessor: |u| u.public_id.clone(),
        },
        Column {
            header: "roll_no",
            accessor: |u| u.roll_no.clone(),
        },
        Column {
            header: "name",
            accessor: |u| u.name.clone(),
        },
        Column {
            header: "email",
            accessor: |u| u.email.clone(),
        },
        Column {
            header: "department",
            accessor: |u| u.department.clone(),
        },
        Column {
            header: "semester",
            accessor: |u| u.semester.clone(),
        },
        Column {
            header: "phone_no",
            accessor: |u| u.phone_no.clone(),
        },
        Column {
            header: "password_hash",
            accessor: |u| u.password_hash.clone(),
        },
        Column {
            header: "is_phone_no_verified",
            accessor: |u| u.is_phone_no_verified.to_string(),
        },
        Column {
            header: "has_filled_profile",
            accessor: |u| u.has_filled_profile.to_string(),
        },
        Column {
            header: "is_from_fcrit",
            accessor: |u| u.is_from_fcrit.to_string(),
        },
        Column {
            header: "email_send",
            accessor: |u| u.email_send.to_string(),
        },
        Column {
            header: "is_superuser",
            accessor: |u| u.is_superuser.to_string(),
        },
        Column {
            header: "created_at",
            accessor: |u| u.created_at.to_string(),
        },
    ]
}

#[post("/admin/users/export", data = "<form>")]
pub async fn do_export_users(
    user: User,
    db: DbConn,
    form: Form<SelectionForm>,
) -> Result<CsvDownload, Markup> {
    if !has_permission(Some(&user), &Permission::AdministerRecords) {
        return Err(error_403(
            Some("Error: you are not authorized to perform this action"),
            Some(user),
        ));
    }

    let selected = form.selected.clone();
    let rows: Vec<User> = db
        .run(move |conn| {
            users::table
                .filter(users::public_id.eq_any(&selected))
                .order_by(users::roll_no.asc())
                .load(conn)
                .unwrap()
        })
        .await;

    Ok(CsvDownload {
        entity: "User",
        body: render_csv(&user_columns(), &rows).unwrap(),
    })
}

fn credentials_email(
    name: &str,
    roll_no: &str,
    password: &str,
    login_url: &str,
) -> (String, String) {
    let html = html! {
        p { "Dear " (name) "," }
        p { "Here are your login credentials:" }
        p {
            "User ID: " (roll_no)
            br;
            "Password: " (password)
        }
        p {
            "You can log in "
            a href=(login_url) { "here" }
            "."
        }
        p { "Best regards," br; "Students Council" }
    }
    .into_string();

    let text = format!(
        "Dear {name},\n\n\
         Here are your login credentials:\n\
         User ID: {roll_no}\n\
         Password: {password}\n\n\
         You can log in at {login_url}.\n\n\
         Best regards,\nStudents Council",
    );

    (html, text)
}

/// Emails each selected user a freshly issued temporary password.
///
/// The new credential hash and the `email_send` flag are only persisted once
/// the mail gateway accepts the message; a failed dispatch leaves the row
/// untouched and the loop moves on to the next recipient.
#[post("/admin/users/email", data = "<form>")]
#[tracing::instrument(skip(user, db, form))]
pub async fn do_email_users(
    user: User,
    db: DbConn,
    form: Form<SelectionForm>,
) -> Result<Markup, Markup> {
    if !has_permission(Some(&user), &Permission::AdministerRecords) {
        return Err(error_403(
            Some("Error: you are not authorized to perform this action"),
            Some(user),
        ));
    }

    let db = Arc::new(db);
    let selected = form.selected.clone();
    let (targets, login_url) = db
        .clone()
        .run(move |conn| {
            let targets: Vec<User> = users::table
                .filter(users::public_id.eq_any(&selected))
                .order_by(users::roll_no.asc())
                .load(conn)
                .unwrap();
            let login_url = ConfigItem::lookup("login_url", conn)
                .unwrap()
                .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string());
            (targets, login_url)
        })
        .await;

    let mut sent = 0usize;
    let mut failed = 0usize;
    for target in &targets {
        let password = short_random(8);
        let (html_body, text_body) = credentials_email(
            &target.name,
            &target.roll_no,
            &password,
            &login_url,
        );

        match send_mail(
            vec![(target.name.as_str(), target.email.as_str())],
            "Your User Credentials",
            &html_body,
            &text_body,
            db.clone(),
        )
        .await
        {
            Ok(()) => {
                let hash = hash_password(&password);
                let id = target.id;
                db.clone()
                    .run(move |conn| {
                        diesel::update(users::table.filter(users::id.eq(id)))
                            .set((
                                users::password_hash.eq(&hash),
                                users::email_send.eq(true),
                            ))
                            .execute(conn)
                            .unwrap();
                    })
                    .await;
                sent += 1;
            }
            Err(error) => {
                tracing::warn!(
                    roll_no = %target.roll_no,
                    %error,
                    "failed to dispatch credentials email"
                );
                failed += 1;
            }
        }
    }

    Ok(page_of_body(
        html! {
            (page_title("Send credentials"))
            p { "Email sent successfully to " (sent) " selected users." }
            @if failed > 0 {
                p class="text-danger" {
                    (failed) " dispatches failed; see the server log for details."
                }
            }
        },
        Some(user),
    ))
}
