use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{participation_members, users};
use crate::user::User;

#[derive(Debug, Queryable, Serialize, Deserialize, Clone)]
pub struct Event {
    pub id: i64,
    pub public_id: String,
    pub title: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Queryable, Serialize, Deserialize, Clone)]
pub struct Transaction {
    pub id: i64,
    pub public_id: String,
    pub transaction_id: String,
    pub upi_transaction_id: String,
    pub created_at: NaiveDateTime,
}

/// A registered team entry for an event, paid for by one transaction.
#[derive(Debug, Queryable, Serialize, Deserialize, Clone)]
pub struct Participation {
    pub id: i64,
    pub public_id: String,
    pub part_id: String,
    pub team_name: String,
    pub event_id: i64,
    pub transaction_id: i64,
    pub is_verified: bool,
    pub created_at: NaiveDateTime,
}

impl Participation {
    /// The team members of this participation, in roll number order.
    pub fn members(
        &self,
        conn: &mut SqliteConnection,
    ) -> QueryResult<Vec<User>> {
        participation_members::table
            .filter(participation_members::participation_id.eq(self.id))
            .inner_join(users::table)
            .select(users::all_columns)
            .order_by(users::roll_no.asc())
            .load(conn)
    }
}
