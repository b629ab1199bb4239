use crate::models::schema::agents;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Persona categories the automation platform understands.
pub const AGENT_TYPES: [&str; 4] = ["advogado", "contador", "consultor", "geral"];
pub const AGENT_TYPE_DEFAULT: &str = "geral";

/// Display-name fallback when an agent has a blank name.
pub const AGENT_NAME_FALLBACK: &str = "Agente";

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
}

#[derive(Queryable, Identifiable, AsChangeset, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = agents)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub payload: Value,
    pub is_active: bool,
    pub agent_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Trimmed name, falling back to the generic label for blank names.
    pub fn display_name(&self) -> &str {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            AGENT_NAME_FALLBACK
        } else {
            trimmed
        }
    }

    pub fn get_by_id(conn: &mut PgConnection, agent_id: Uuid) -> Result<Option<Agent>, AgentError> {
        agents::table
            .filter(agents::id.eq(agent_id))
            .first::<Agent>(conn)
            .optional()
            .map_err(AgentError::DatabaseError)
    }

    pub fn get_by_name(conn: &mut PgConnection, agent_name: &str) -> Result<Option<Agent>, AgentError> {
        agents::table
            .filter(agents::name.eq(agent_name))
            .first::<Agent>(conn)
            .optional()
            .map_err(AgentError::DatabaseError)
    }

    pub fn list_all(conn: &mut PgConnection) -> Result<Vec<Agent>, AgentError> {
        agents::table
            .order(agents::created_at.desc())
            .load::<Agent>(conn)
            .map_err(AgentError::DatabaseError)
    }

    /// Leaves conversations and messages referencing the agent untouched.
    pub fn delete(conn: &mut PgConnection, agent_id: Uuid) -> Result<usize, AgentError> {
        diesel::delete(agents::table.filter(agents::id.eq(agent_id)))
            .execute(conn)
            .map_err(AgentError::DatabaseError)
    }
}

#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = agents)]
pub struct UpdateAgent {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
    pub payload: Option<Value>,
    pub is_active: Option<bool>,
    pub agent_type: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UpdateAgent {
    pub fn apply(&self, conn: &mut PgConnection, agent_id: Uuid) -> Result<Agent, AgentError> {
        diesel::update(agents::table.filter(agents::id.eq(agent_id)))
            .set(self)
            .get_result::<Agent>(conn)
            .map_err(AgentError::DatabaseError)
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = agents)]
pub struct NewAgent {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub payload: Value,
    pub is_active: bool,
    pub agent_type: String,
}

impl NewAgent {
    pub fn insert(&self, conn: &mut PgConnection) -> Result<Agent, AgentError> {
        diesel::insert_into(agents::table)
            .values(self)
            .get_result::<Agent>(conn)
            .map_err(AgentError::DatabaseError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent_named(name: &str) -> Agent {
        Agent {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            avatar_url: None,
            payload: serde_json::json!({}),
            is_active: true,
            agent_type: AGENT_TYPE_DEFAULT.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn display_name_trims_and_falls_back() {
        assert_eq!(agent_named("  Dr. Silva  ").display_name(), "Dr. Silva");
        assert_eq!(agent_named("").display_name(), AGENT_NAME_FALLBACK);
        assert_eq!(agent_named("   ").display_name(), AGENT_NAME_FALLBACK);
    }
}
