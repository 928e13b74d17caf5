use chrono::NaiveDateTime;
use diesel::prelude::Queryable;
use serde::{Deserialize, Serialize};

/// A record of a dispatched email.
#[derive(Debug, Queryable, Serialize, Deserialize, Clone)]
pub struct EmailRow {
    pub id: i64,
    pub message_id: String,
    pub recipients: String,
    pub contents: Option<String>,
    pub created_at: NaiveDateTime,
}
