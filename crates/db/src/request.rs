use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// A pending account request awaiting review.
///
/// The only transition is `is_approved: false -> true` via the admin
/// approve action; approval never flips back.
#[derive(Debug, Queryable, Serialize, Deserialize, Clone)]
pub struct UserRequest {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub email: String,
    pub phone_no: String,
    pub department: String,
    pub semester: String,
    pub is_approved: bool,
    pub created_at: NaiveDateTime,
}
