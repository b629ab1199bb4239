use crate::models::schema::profiles;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
}

/// One profile per authenticated subject; `id` is the auth provider's
/// subject identifier.
#[derive(Queryable, Identifiable, AsChangeset, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn get_by_id(
        conn: &mut PgConnection,
        profile_id: Uuid,
    ) -> Result<Option<Profile>, ProfileError> {
        profiles::table
            .filter(profiles::id.eq(profile_id))
            .first::<Profile>(conn)
            .optional()
            .map_err(ProfileError::DatabaseError)
    }

    pub fn list_all(conn: &mut PgConnection) -> Result<Vec<Profile>, ProfileError> {
        profiles::table
            .order(profiles::created_at.desc())
            .load::<Profile>(conn)
            .map_err(ProfileError::DatabaseError)
    }

    pub fn delete(conn: &mut PgConnection, profile_id: Uuid) -> Result<usize, ProfileError> {
        diesel::delete(profiles::table.filter(profiles::id.eq(profile_id)))
            .execute(conn)
            .map_err(ProfileError::DatabaseError)
    }
}

#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = profiles)]
pub struct UpdateProfile {
    pub full_name: Option<Option<String>>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateProfile {
    pub fn apply(
        &self,
        conn: &mut PgConnection,
        profile_id: Uuid,
    ) -> Result<Profile, ProfileError> {
        diesel::update(profiles::table.filter(profiles::id.eq(profile_id)))
            .set(self)
            .get_result::<Profile>(conn)
            .map_err(ProfileError::DatabaseError)
    }
}
