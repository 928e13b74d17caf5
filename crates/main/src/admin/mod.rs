//! The admin console.
//!
//! Every list page renders its records with per-row checkboxes inside a
//! single form; the bulk actions available for the entity are declared in an
//! explicit [`AdminAction`] table (one submit button per action, routed via
//! `formaction`), and the route table in `make_rocket` maps each action
//! route to its handler.

use db::user::User;
use maud::{html, Markup};

use crate::{
    html::{page_of_body, page_title},
    permissions::{has_permission, Permission},
};

pub mod config;
pub mod participations;
pub mod requests;
pub mod setup;
pub mod users;
pub mod worksheets;

/// A bulk action an administrator can run against a selection of records.
pub struct AdminAction {
    pub label: &'static str,
    pub route: &'static str,
}

#[derive(FromForm)]
pub struct SelectionForm {
    /// Public ids of the records ticked in the list form.
    pub selected: Vec<String>,
}

/// One submit button per registered action for the entity.
pub fn action_buttons(actions: &[AdminAction]) -> Markup {
    html! {
        div class="mb-3" {
            @for action in actions {
                button type="submit" class="btn btn-primary me-2" formaction=(action.route) {
                    (action.label)
                }
            }
        }
    }
}

pub fn selection_checkbox(public_id: &str) -> Markup {
    html! {
        input type="checkbox" class="form-check-input" name="selected" value=(public_id);
    }
}

#[get("/admin")]
pub async fn admin_overview(user: User) -> Result<Markup, Markup> {
    if !has_permission(Some(&user), &Permission::AdministerRecords) {
        return Err(crate::html::error_403(
            Some("Error: you are not authorized to view this page"),
            Some(user),
        ));
    }

    let page_body = html! {
        ul class="list-group" {
            li class="list-group-item" {
                a href="/admin/users" { "Users" }
            }
            li class="list-group-item" {
                a href="/admin/requests" { "User requests" }
            }
            li class="list-group-item" {
                a href="/admin/participations" { "Participations" }
            }
            li class="list-group-item" {
                a href="/admin/worksheets" { "Uploaded worksheets" }
            }
            li class="list-group-item" {
                a href="/admin/config" { "Site configuration" }
            }
        }
    };

    Ok(page_of_body(
        html! {
            (page_title("Admin console"))
            (page_body)
        },
        Some(user),
    ))
}
