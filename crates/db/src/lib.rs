pub mod config;
pub mod email;
pub mod participation;
pub mod request;
/// Database schema
pub mod schema;
pub mod user;
pub mod worksheet;

use rocket_sync_db_pools::database;

#[database("database")]
pub struct DbConn(diesel::SqliteConnection);
