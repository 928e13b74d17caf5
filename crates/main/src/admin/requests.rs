use db::{request::UserRequest, schema::user_requests, user::User, DbConn};
use diesel::prelude::*;
use maud::{html, Markup};
use rocket::form::Form;

use crate::{
    admin::{action_buttons, selection_checkbox, AdminAction, SelectionForm},
    html::{error_403, page_of_body, page_title},
    permissions::{has_permission, Permission},
};

pub const REQUEST_ACTIONS: [AdminAction; 1] = [AdminAction {
    label: "Approve user request",
    route: "/admin/requests/approve",
}];

#[get("/admin/requests")]
pub async fn requests_page(user: User, db: DbConn) -> Result<Markup, Markup> {
    if !has_permission(Some(&user), &Permission::AdministerRecords) {
        return Err(error_403(
            Some("Error: you are not authorized to view this page"),
            Some(user),
        ));
    }

    let requests: Vec<UserRequest> = db
        .run(|conn| {
            user_requests::table
                .order_by(user_requests::created_at.asc())
                .load(conn)
                .unwrap()
        })
        .await;

    let table = html! {
        form method="post" {
            (action_buttons(&REQUEST_ACTIONS))
            table class="table" {
                thead {
                    tr {
                        th scope="col" {}
                        th scope="col" { "Name" }
                        th scope="col" { "Email" }
                        th scope="col" { "Department" }
                        th scope="col" { "Semester" }
                        th scope="col" { "Approved" }
                    }
                }
                tbody {
                    @for request in requests.iter() {
                        tr {
                            td { (selection_checkbox(&request.public_id)) }
                            td { (request.name) }
                            td { (request.email) }
                            td { (request.department) }
                            td { (request.semester) }
                            td {
                                @if request.is_approved {
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
            (page_title("User requests"))
            (table)
        },
        Some(user),
    ))
}

/// Marks each selected request approved. The transition is one-way and
/// idempotent: re-approving an approved request is a no-op.
#[post("/admin/requests/approve", data = "<form>")]
pub async fn do_approve_requests(
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

    let selected = form.selected.clone();
    let approved = db
        .run(move |conn| {
            let requests: Vec<UserRequest> = user_requests::table
                .filter(user_requests::public_id.eq_any(&selected))
                .load(conn)
                .unwrap();

            for request in &requests {
                diesel::update(
                    user_requests::table
                        .filter(user_requests::id.eq(request.id)),
                )
                .set(user_requests::is_approved.eq(true))
                .execute(conn)
                .unwrap();
            }

            requests.len()
        })
        .await;

    Ok(page_of_body(
        html! {
            (page_title("Approve user requests"))
            p { "Approved " (approved) " selected requests." }
        },
        Some(user),
    ))
}
