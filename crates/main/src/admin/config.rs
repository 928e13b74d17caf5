use db::config::ConfigItem;
use db::{schema::config, user::User, DbConn};
use diesel::prelude::*;
use maud::Markup;
use rocket::form::{Form, FromForm};
use rocket::response::Redirect;
use uuid::Uuid;

use crate::html::{page_of_body, page_title};
use crate::{
    html::error_403,
    permissions::{has_permission, Permission},
};

#[get("/admin/config")]
pub async fn config_page(user: User, db: DbConn) -> Option<Markup> {
    if !has_permission(Some(&user), &Permission::ModifyGlobalConfig) {
        return Some(error_403(
            Some("Error: you are not authorized to view this page!"),
            Some(user),
        ));
    }

    let config_items: Vec<ConfigItem> = db
        .run(|conn| {
            config::table
                .order_by(config::key.asc())
                .load::<ConfigItem>(conn)
                .unwrap()
        })
        .await;

    let markup = maud::html! {
        table class="table" {
            thead {
                tr {
                    th scope="col" { "Key" }
                    th scope="col" { "Value" }
                    th scope="col" { "Edit" }
                }
            }
            tbody {
                @for item in config_items.iter() {
                    tr {
                        td { (item.key) }
                        td { (item.value) }
                        td {
                            a href=(format!("/admin/config/{}/edit", item.public_id)) {
                                "Edit"
                            }
                        }
                    }
                }
            }
        }
    };

    let create_form_markup = maud::html! {
        form action="/admin/config/upsert" method="post" {
            div class="mb-3" {
                label for="key" class="form-label" { "Key" }
                input type="text" class="form-control" id="key" name="key" placeholder="key";
            }
            div class="mb-3" {
                label for="value" class="form-label" { "Value" }
                input type="text" class="form-control" id="value" name="value" placeholder="value";
            }
            button type="submit" class="btn btn-primary" { "Add Item" }
        }
    };

    Some(page_of_body(
        maud::html! {
            (page_title("Site configuration"))
            h2 { "Current config items" }
            (markup)
            h2 { "Add new config item" }
            (create_form_markup)
        },
        Some(user),
    ))
}

#[get("/admin/config/<config_id>/edit")]
pub async fn edit_existing_config_item_page(
    db: DbConn,
    user: User,
    config_id: &str,
) -> Option<Markup> {
    if !has_permission(Some(&user), &Permission::ModifyGlobalConfig) {
        return Some(error_403(
            Some("Error: you are not authorized to view this page!"),
            Some(user),
        ));
    }

    let config_id = config_id.to_string();
    let config_item: Option<ConfigItem> = db
        .run(move |conn| {
            config::table
                .filter(config::public_id.eq(config_id))
                .first::<ConfigItem>(conn)
                .optional()
                .unwrap()
        })
        .await;

    let config_item = config_item?;

    let markup = maud::html! {
        form action=("/admin/config/upsert") method="post" {
            div class="mb-3" {
                label for="key" class="form-label" { "Key" }
                input type="text" class="form-control" id="key" name="key" value=(config_item.key) readonly="readonly";
            }
            div class="mb-3" {
                label for="value" class="form-label" { "Value" }
                input type="text" class="form-control" id="value" name="value" value=(config_item.value);
            }
            button type="submit" class="btn btn-primary" { "Save changes" }
        }
    };

    Some(page_of_body(
        maud::html! {
            (page_title("Edit config item"))
            (markup)
        },
        Some(user),
    ))
}

#[derive(FromForm)]
pub struct UpsertConfigForm {
    key: String,
    value: String,
}

#[post("/admin/config/upsert", data = "<form>")]
pub async fn do_upsert_config(
    db: DbConn,
    user: User,
    form: Form<UpsertConfigForm>,
) -> Result<Redirect, Markup> {
    if !has_permission(Some(&user), &Permission::ModifyGlobalConfig) {
        return Err(error_403(
            Some("Error: you are not authorized to perform this action!"),
            Some(user),
        ));
    }

    db.run(move |conn| {
        let n_updated = diesel::insert_into(config::table)
            .values((
                config::public_id.eq(Uuid::new_v4().to_string()),
                config::key.eq(&form.key),
                config::value.eq(&form.value),
            ))
            .on_conflict(config::key)
            .do_update()
            .set(config::value.eq(&form.value))
            .execute(conn)
            .unwrap();
        assert_eq!(n_updated, 1);
    })
    .await;

    Ok(Redirect::to("/admin/config"))
}
