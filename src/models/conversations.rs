use crate::models::schema::conversations;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ConversationError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
}

#[derive(Queryable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = conversations)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub agent_type: Option<String>,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn get_by_id(
        conn: &mut PgConnection,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>, ConversationError> {
        conversations::table
            .filter(conversations::id.eq(conversation_id))
            .first::<Conversation>(conn)
            .optional()
            .map_err(ConversationError::DatabaseError)
    }

    pub fn get_by_id_and_user(
        conn: &mut PgConnection,
        conversation_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Conversation>, ConversationError> {
        conversations::table
            .filter(conversations::id.eq(conversation_id))
            .filter(conversations::user_id.eq(owner_id))
            .first::<Conversation>(conn)
            .optional()
            .map_err(ConversationError::DatabaseError)
    }

    pub fn list_for_user(
        conn: &mut PgConnection,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, ConversationError> {
        conversations::table
            .filter(conversations::user_id.eq(owner_id))
            .order(conversations::updated_at.desc())
            .limit(limit)
            .offset(offset)
            .load::<Conversation>(conn)
            .map_err(ConversationError::DatabaseError)
    }

    pub fn touch(
        conn: &mut PgConnection,
        conversation_id: Uuid,
    ) -> Result<usize, ConversationError> {
        diesel::update(conversations::table.filter(conversations::id.eq(conversation_id)))
            .set(conversations::updated_at.eq(Utc::now()))
            .execute(conn)
            .map_err(ConversationError::DatabaseError)
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = conversations)]
pub struct NewConversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub agent_type: Option<String>,
    pub title: Option<String>,
}

impl NewConversation {
    /// Serialized first-contact creation: the unique index on
    /// (user_id, agent_id) makes concurrent creators converge on one row.
    /// Returns the surviving conversation and whether this call created it.
    pub fn insert_or_reuse(
        &self,
        conn: &mut PgConnection,
    ) -> Result<(Conversation, bool), ConversationError> {
        let inserted = diesel::insert_into(conversations::table)
            .values(self)
            .on_conflict((conversations::user_id, conversations::agent_id))
            .do_nothing()
            .get_result::<Conversation>(conn)
            .optional()
            .map_err(ConversationError::DatabaseError)?;

        match inserted {
            Some(conversation) => Ok((conversation, true)),
            None => {
                // A skipped insert implies a conflicting row, and the
                // index only covers rows with a bound agent.
                let Some(agent_id) = self.agent_id else {
                    return Err(ConversationError::DatabaseError(
                        diesel::result::Error::NotFound,
                    ));
                };
                let existing = Self::reread_for_pair(conn, self.user_id, agent_id)?;
                Ok((existing, false))
            }
        }
    }

    fn reread_for_pair(
        conn: &mut PgConnection,
        owner_id: Uuid,
        lookup_agent_id: Uuid,
    ) -> Result<Conversation, ConversationError> {
        conversations::table
            .filter(conversations::user_id.eq(owner_id))
            .filter(conversations::agent_id.eq(lookup_agent_id))
            .order(conversations::updated_at.desc())
            .first::<Conversation>(conn)
            .map_err(ConversationError::DatabaseError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_upserts_on_the_user_agent_pair() {
        let new = NewConversation {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            agent_id: Some(Uuid::new_v4()),
            agent_type: Some("geral".to_string()),
            title: Some("Olá".to_string()),
        };
        let statement = diesel::insert_into(conversations::table)
            .values(&new)
            .on_conflict((conversations::user_id, conversations::agent_id))
            .do_nothing();
        let sql = diesel::debug_query::<diesel::pg::Pg, _>(&statement).to_string();

        assert!(sql.contains("ON CONFLICT (\"user_id\", \"agent_id\")"));
        assert!(sql.contains("DO NOTHING"));
    }
}
