use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::config;

#[derive(Debug, Queryable, Serialize, Deserialize, Clone)]
pub struct ConfigItem {
    pub id: i64,
    pub public_id: String,
    pub key: String,
    pub value: String,
}

impl ConfigItem {
    /// The stored value for `key`, if one has been configured.
    pub fn lookup(
        key: &str,
        conn: &mut SqliteConnection,
    ) -> QueryResult<Option<String>> {
        config::table
            .filter(config::key.eq(key))
            .select(config::value)
            .first(conn)
            .optional()
    }
}
