use admin::{
    admin_overview,
    config::{config_page, do_upsert_config, edit_existing_config_item_page},
    participations::{do_export_participations, participations_page},
    requests::{do_approve_requests, requests_page},
    setup::{do_setup, setup_page},
    users::{do_email_users, do_export_users, users_page},
    worksheets::{do_import_worksheets, do_upload_worksheet, worksheets_page},
};
use auth::{login::{do_login, login_page}, logout};
use db::{user::User, DbConn};
use diesel_migrations::{
    embed_migrations, EmbeddedMigrations, MigrationHarness,
};
use html::page_of_body;
use rocket::{
    fairing::AdHoc,
    figment::{
        util::map,
        value::{Map, Value},
    },
    Build, Rocket,
};

pub mod admin;
pub mod auth;
pub mod csv_export;
pub mod html;
pub mod import;
pub mod permissions;
pub mod util;

#[cfg(test)]
mod tests;

#[macro_use]
extern crate rocket;

#[get("/")]
fn index(user: Option<User>) -> maud::Markup {
    page_of_body(
        maud::html! {
            div {
                p { "Welcome to the student council portal." }
                @if user.as_ref().map(|u| u.is_superuser).unwrap_or(false) {
                    p {
                        a href="/admin" { "Go to the admin console" }
                    }
                }
            }
        },
        user,
    )
}

pub const MIGRATIONS: EmbeddedMigrations =
    embed_migrations!("../../migrations");

pub fn make_rocket(default_db: &str) -> Rocket<Build> {
    let db: Map<_, Value> = map![
        "url" => std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| default_db.to_string())
            .into(),
        "pool_size" => 10.into(),
        "timeout" => 5.into(),
    ];

    let figment =
        rocket::Config::figment().merge(("databases", map!["database" => db]));

    rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(AdHoc::try_on_ignite("migrations", |rocket| async move {
            let db_conn = DbConn::get_one(&rocket).await.unwrap();

            let ret: Result<(), Box<dyn std::error::Error + Send + Sync>> =
                db_conn
                    .run(move |conn| {
                        conn.run_pending_migrations(MIGRATIONS)?;
                        Ok(())
                    })
                    .await;

            match ret {
                Ok(_) => Ok(rocket),
                Err(_) => Err(rocket),
            }
        }))
        .mount(
            "/",
            routes![
                index,
                login_page,
                do_login,
                logout::logout,
                setup_page,
                do_setup,
                admin_overview,
                users_page,
                do_email_users,
                do_export_users,
                requests_page,
                do_approve_requests,
                participations_page,
                do_export_participations,
                worksheets_page,
                do_upload_worksheet,
                do_import_worksheets,
                config_page,
                edit_existing_config_item_page,
                do_upsert_config,
            ],
        )
}
