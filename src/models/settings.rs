use crate::models::schema::system_settings;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
}

#[derive(Queryable, Insertable, AsChangeset, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = system_settings)]
pub struct SystemSetting {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

impl SystemSetting {
    pub fn list_all(conn: &mut PgConnection) -> Result<Vec<SystemSetting>, SettingError> {
        system_settings::table
            .order(system_settings::key.asc())
            .load::<SystemSetting>(conn)
            .map_err(SettingError::DatabaseError)
    }

    pub fn upsert(&self, conn: &mut PgConnection) -> Result<SystemSetting, SettingError> {
        diesel::insert_into(system_settings::table)
            .values(self)
            .on_conflict(system_settings::key)
            .do_update()
            .set(self)
            .get_result::<SystemSetting>(conn)
            .map_err(SettingError::DatabaseError)
    }
}
