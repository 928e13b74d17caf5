use db::{schema::worksheets, user::User, worksheet::Worksheet, DbConn};
use diesel::prelude::*;
use maud::{html, Markup};
use rocket::{form::Form, fs::TempFile, response::Redirect};
use uuid::Uuid;

use crate::{
    admin::{action_buttons, selection_checkbox, AdminAction, SelectionForm},
    html::{error_403, page_of_body, page_title},
    import::{import_worksheet, ImportOutcome, WorksheetError},
    permissions::{has_permission, Permission},
};

pub const WORKSHEET_ACTIONS: [AdminAction; 1] = [AdminAction {
    label: "Create Users from Excel Entries",
    route: "/admin/worksheets/import",
}];

#[get("/admin/worksheets")]
pub async fn worksheets_page(user: User, db: DbConn) -> Result<Markup, Markup> {
    if !has_permission(Some(&user), &Permission::AdministerRecords) {
        return Err(error_403(
            Some("Error: you are not authorized to view this page"),
            Some(user),
        ));
    }

    let uploads: Vec<Worksheet> = db
        .run(|conn| {
            worksheets::table
                .order_by(worksheets::id.asc())
                .load(conn)
                .unwrap()
        })
        .await;

    let table = html! {
        form method="post" {
            (action_buttons(&WORKSHEET_ACTIONS))
            table class="table" {
                thead {
                    tr {
                        th scope="col" {}
                        th scope="col" { "Id" }
                        th scope="col" { "Filename" }
                        th scope="col" { "Upload date" }
                    }
                }
                tbody {
                    @for upload in uploads.iter() {
                        tr {
                            td { (selection_checkbox(&upload.public_id)) }
                            td { (upload.id) }
                            td { (upload.filename) }
                            td { (upload.uploaded_at) }
                        }
                    }
                }
            }
        }
    };

    let upload_form = html! {
        form method="post" action="/admin/worksheets" enctype="multipart/form-data" class="mt-4" {
            div class="mb-3" {
                label for="worksheet" class="form-label" { "Worksheet" }
                input type="file" class="form-control" id="worksheet" name="worksheet" required;
            }
            button type="submit" class="btn btn-primary" { "Upload" }
        }
    };

    Ok(page_of_body(
        html! {
            (page_title("Uploaded worksheets"))
            (table)
            h2 { "Upload a new worksheet" }
            (upload_form)
        },
        Some(user),
    ))
}

#[derive(FromForm)]
pub struct UploadWorksheetForm<'f> {
    pub worksheet: TempFile<'f>,
}

#[post("/admin/worksheets", data = "<form>")]
pub async fn do_upload_worksheet(
    user: User,
    db: DbConn,
    form: Form<UploadWorksheetForm<'_>>,
) -> Result<Redirect, Markup> {
    if !has_permission(Some(&user), &Permission::AdministerRecords) {
        return Err(error_403(
            Some("Error: you are not authorized to perform this action"),
            Some(user),
        ));
    }

    let mut upload = form.into_inner();
    // the submitted name is only ever displayed and stored, never used as a
    // filesystem path
    let filename = upload
        .worksheet
        .raw_name()
        .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_string())
        .unwrap_or_else(|| "worksheet.csv".to_string());

    // `TempFile` may be buffered in memory, so spool it through a path we
    // control before reading it back
    let path = std::env::temp_dir().join(format!("worksheet-{}", Uuid::new_v4()));
    upload.worksheet.copy_to(&path).await.unwrap();
    let contents = rocket::tokio::fs::read(&path).await.unwrap();
    let _ = rocket::tokio::fs::remove_file(&path).await;

    db.run(move |conn| {
        diesel::insert_into(worksheets::table)
            .values((
                worksheets::public_id.eq(Uuid::new_v4().to_string()),
                worksheets::filename.eq(&filename),
                worksheets::contents.eq(&contents),
                worksheets::uploaded_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .unwrap();
    })
    .await;

    Ok(Redirect::to("/admin/worksheets"))
}

fn report_line(
    filename: &str,
    result: &Result<ImportOutcome, WorksheetError>,
) -> Markup {
    match result {
        Ok(outcome) => html! {
            li class="list-group-item" {
                "Users created from " (filename) ": "
                (outcome.provisioned.len()) " provisioned, "
                (outcome.failed.len()) " rows failed."
                @if !outcome.provisioned.is_empty() {
                    ul {
                        @for provisioned in outcome.provisioned.iter() {
                            li { "roll no " (provisioned.roll_no) " (" (provisioned.email) ")" }
                        }
                    }
                }
                @if !outcome.failed.is_empty() {
                    ul {
                        @for failure in outcome.failed.iter() {
                            li class="text-danger" {
                                "row " (failure.row) ": " (failure.error)
                            }
                        }
                    }
                }
            }
        },
        Err(error) => html! {
            li class="list-group-item text-danger" {
                "Error processing " (filename) ": " (error)
            }
        },
    }
}

/// Runs the bulk import over every selected worksheet. A malformed
/// worksheet aborts only itself; the remaining selection still runs, and
/// each file gets one summary line in the result page.
#[post("/admin/worksheets/import", data = "<form>")]
#[tracing::instrument(skip(user, db, form))]
pub async fn do_import_worksheets(
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
    let reports: Vec<(String, Result<ImportOutcome, WorksheetError>)> = db
        .run(move |conn| {
            let sheets: Vec<Worksheet> = worksheets::table
                .filter(worksheets::public_id.eq_any(&selected))
                .order_by(worksheets::id.asc())
                .load(conn)
                .unwrap();

            sheets
                .into_iter()
                .map(|sheet| {
                    let outcome = import_worksheet(&sheet.contents, conn);
                    (sheet.filename, outcome)
                })
                .collect()
        })
        .await;

    Ok(page_of_body(
        html! {
            (page_title("Create users from worksheets"))
            ul class="list-group" {
                @for (filename, result) in reports.iter() {
                    (report_line(filename, result))
                }
            }
        },
        Some(user),
    ))
}
