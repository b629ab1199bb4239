use crate::models::agents::{Agent, AgentError, NewAgent, UpdateAgent};
use crate::models::conversations::{Conversation, ConversationError, NewConversation};
use crate::models::messages::{Message, MessageError, NewMessage};
use crate::models::profiles::{Profile, ProfileError, UpdateProfile};
use crate::models::settings::{SettingError, SystemSetting};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PoolError, PooledConnection};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
type DbConn = PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Error, Debug)]
pub enum DBError {
    #[error("Connection pool error: {0}")]
    PoolError(#[from] PoolError),
    #[error("Profile error: {0}")]
    ProfileError(#[from] ProfileError),
    #[error("Agent error: {0}")]
    AgentError(#[from] AgentError),
    #[error("Conversation error: {0}")]
    ConversationError(#[from] ConversationError),
    #[error("Message error: {0}")]
    MessageError(#[from] MessageError),
    #[error("Setting error: {0}")]
    SettingError(#[from] SettingError),
}

/// Table-scoped access facade owning the connection pool. Each call is an
/// individually atomic remote operation; there are no cross-call
/// transactions (the assistant-persist path uses `insert_and_touch`).
#[derive(Clone)]
pub struct DBConnection {
    pool: DbPool,
}

pub fn setup_db(database_url: &str) -> Result<DBConnection, DBError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder().build(manager)?;
    info!("Database connection pool established");
    Ok(DBConnection { pool })
}

impl DBConnection {
    fn conn(&self) -> Result<DbConn, DBError> {
        Ok(self.pool.get()?)
    }

    // profiles

    pub fn get_profile_by_id(&self, profile_id: Uuid) -> Result<Option<Profile>, DBError> {
        Ok(Profile::get_by_id(&mut *self.conn()?, profile_id)?)
    }

    pub fn list_profiles(&self) -> Result<Vec<Profile>, DBError> {
        Ok(Profile::list_all(&mut *self.conn()?)?)
    }

    pub fn update_profile(
        &self,
        profile_id: Uuid,
        changes: UpdateProfile,
    ) -> Result<Profile, DBError> {
        Ok(changes.apply(&mut *self.conn()?, profile_id)?)
    }

    pub fn delete_profile(&self, profile_id: Uuid) -> Result<usize, DBError> {
        Ok(Profile::delete(&mut *self.conn()?, profile_id)?)
    }

    // agents

    pub fn get_agent_by_id(&self, agent_id: Uuid) -> Result<Option<Agent>, DBError> {
        Ok(Agent::get_by_id(&mut *self.conn()?, agent_id)?)
    }

    pub fn get_agent_by_name(&self, agent_name: &str) -> Result<Option<Agent>, DBError> {
        Ok(Agent::get_by_name(&mut *self.conn()?, agent_name)?)
    }

    pub fn list_agents(&self) -> Result<Vec<Agent>, DBError> {
        Ok(Agent::list_all(&mut *self.conn()?)?)
    }

    pub fn create_agent(&self, new_agent: NewAgent) -> Result<Agent, DBError> {
        Ok(new_agent.insert(&mut *self.conn()?)?)
    }

    pub fn update_agent(&self, agent_id: Uuid, changes: UpdateAgent) -> Result<Agent, DBError> {
        Ok(changes.apply(&mut *self.conn()?, agent_id)?)
    }

    pub fn delete_agent(&self, agent_id: Uuid) -> Result<usize, DBError> {
        Ok(Agent::delete(&mut *self.conn()?, agent_id)?)
    }

    // conversations

    pub fn get_conversation_by_id(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>, DBError> {
        Ok(Conversation::get_by_id(&mut *self.conn()?, conversation_id)?)
    }

    pub fn get_conversation_by_id_and_user(
        &self,
        conversation_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Conversation>, DBError> {
        Ok(Conversation::get_by_id_and_user(
            &mut *self.conn()?,
            conversation_id,
            owner_id,
        )?)
    }

    pub fn list_conversations_for_user(
        &self,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>, DBError> {
        Ok(Conversation::list_for_user(
            &mut *self.conn()?,
            owner_id,
            limit,
            offset,
        )?)
    }

    pub fn get_or_create_conversation(
        &self,
        new_conversation: NewConversation,
    ) -> Result<(Conversation, bool), DBError> {
        Ok(new_conversation.insert_or_reuse(&mut *self.conn()?)?)
    }

    pub fn touch_conversation(&self, conversation_id: Uuid) -> Result<usize, DBError> {
        Ok(Conversation::touch(&mut *self.conn()?, conversation_id)?)
    }

    // messages

    pub fn list_messages_for_conversation(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, DBError> {
        Ok(Message::list_for_conversation(
            &mut *self.conn()?,
            conversation_id,
            limit,
            offset,
        )?)
    }

    pub fn insert_message(&self, new_message: NewMessage) -> Result<Message, DBError> {
        Ok(new_message.insert(&mut *self.conn()?)?)
    }

    pub fn insert_message_and_touch(&self, new_message: NewMessage) -> Result<Message, DBError> {
        Ok(new_message.insert_and_touch(&mut *self.conn()?)?)
    }

    // system settings

    pub fn list_settings(&self) -> Result<Vec<SystemSetting>, DBError> {
        Ok(SystemSetting::list_all(&mut *self.conn()?)?)
    }

    pub fn upsert_settings(
        &self,
        settings: Vec<SystemSetting>,
    ) -> Result<Vec<SystemSetting>, DBError> {
        let mut conn = self.conn()?;
        let mut saved = Vec::with_capacity(settings.len());
        for setting in settings {
            saved.push(setting.upsert(&mut conn)?);
        }
        Ok(saved)
    }
}
