use chrono::NaiveDateTime;
use diesel::prelude::*;

/// An uploaded spreadsheet, staged for the bulk-provisioning action.
///
/// The import action consumes the stored bytes on demand; processed
/// worksheets are not deleted.
#[derive(Debug, Queryable, Clone)]
pub struct Worksheet {
    pub id: i64,
    pub public_id: String,
    pub filename: String,
    pub contents: Vec<u8>,
    pub uploaded_at: NaiveDateTime,
}
