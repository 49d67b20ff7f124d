//! Database model for static cache entries.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// One static cache entry. Every value is a millisecond timestamp.
#[derive(Queryable, Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::key_value_cache)]
#[serde(rename_all = "camelCase")]
pub struct KeyValueCacheDB {
    pub name: String,
    pub value: i64,
}
