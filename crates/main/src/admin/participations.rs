use db::{
    participation::{Event, Participation, Transaction},
    schema::{events, participations, transactions},
    user::User,
    DbConn,
};
use diesel::prelude::*;
use itertools::Itertools;
use maud::{html, Markup};
use rocket::form::Form;

use crate::{
    admin::{action_buttons, selection_checkbox, AdminAction, SelectionForm},
    csv_export::{render_csv, Column, CsvDownload},
    html::{error_403, page_of_body, page_title},
    permissions::{has_permission, Permission},
};

pub const PARTICIPATION_ACTIONS: [AdminAction; 1] = [AdminAction {
    label: "Download Csv",
    route: "/admin/participations/export",
}];

#[get("/admin/participations")]
pub async fn participations_page(
    user: User,
    db: DbConn,
) -> Result<Markup, Markup> {
    if !has_permission(Some(&user), &Permission::AdministerRecords) {
        return Err(error_403(
            Some("Error: you are not authorized to view this page"),
            Some(user),
        ));
    }

    let rows: Vec<(Participation, Event, Transaction)> = db
        .run(|conn| {
            participations::table
                .inner_join(events::table)
                .inner_join(transactions::table)
                .order_by(participations::part_id.asc())
                .load(conn)
                .unwrap()
        })
        .await;

    let table = html! {
        form method="post" {
            (action_buttons(&PARTICIPATION_ACTIONS))
            table class="table" {
                thead {
                    tr {
                        th scope="col" {}
                        th scope="col" { "Part id" }
                        th scope="col" { "Team name" }
                        th scope="col" { "Event" }
                        th scope="col" { "Transaction" }
                        th scope="col" { "Verified" }
                    }
                }
                tbody {
                    @for (participation, event, transaction) in rows.iter() {
                        tr {
                            td { (selection_checkbox(&participation.public_id)) }
                            td { (participation.part_id) }
                            td { (participation.team_name) }
                            td { (event.title) }
                            td { (transaction.transaction_id) }
                            td {
                                @if participation.is_verified {
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
            (page_title("Participations"))
            (table)
        },
        Some(user),
    ))
}

/// One export row: a participation joined with its event, transaction and
/// members, flattened for the fixed projection.
struct ParticipationRow {
    team_name: String,
    part_id: String,
    event_title: String,
    transaction_id: String,
    is_verified: bool,
    members: String,
}

/// The fixed projection used by the participation report. `Members_name` is
/// the pipe-joined `name_rollno` of every team member.
fn participation_columns() -> Vec<Column<ParticipationRow>> {
    vec![
        Column {
            header: "Team name",
            accessor: |row| row.team_name.clone(),
        },
        Column {
            header: "part_id",
            accessor: |row| row.part_id.clone(),
        },
        Column {
            header: "event",
            accessor: |row| row.event_title.clone(),
        },
        Column {
            header: "transaction_id",
            accessor: |row| row.transaction_id.clone(),
        },
        Column {
            header: "Verified",
            accessor: |row| row.is_verified.to_string(),
        },
        Column {
            header: "Members_name",
            accessor: |row| row.members.clone(),
        },
    ]
}

#[post("/admin/participations/export", data = "<form>")]
pub async fn do_export_participations(
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
    let rows: Vec<ParticipationRow> = db
        .run(move |conn| {
            let joined: Vec<(Participation, Event, Transaction)> =
                participations::table
                    .inner_join(events::table)
                    .inner_join(transactions::table)
                    .filter(participations::public_id.eq_any(&selected))
                    .order_by(participations::part_id.asc())
                    .load(conn)
                    .unwrap();

            joined
                .into_iter()
                .map(|(participation, event, transaction)| {
                    let members = participation
                        .members(conn)
                        .unwrap()
                        .iter()
                        .map(|member| {
                            format!("{}_{}", member.name, member.roll_no)
                        })
                        .join("|");

                    ParticipationRow {
                        team_name: participation.team_name,
                        part_id: participation.part_id,
                        event_title: event.title,
                        transaction_id: transaction.transaction_id,
                        is_verified: participation.is_verified,
                        members,
                    }
                })
                .collect()
        })
        .await;

    Ok(CsvDownload {
        entity: "Participation",
        body: render_csv(&participation_columns(), &rows).unwrap(),
    })
}
