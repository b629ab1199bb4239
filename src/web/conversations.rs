//! Conversation listing, get-or-create, and message history.

use crate::models::agents::AGENT_NAME_FALLBACK;
use crate::models::conversations::{Conversation, NewConversation};
use crate::models::messages::Message;
use crate::models::profiles::Profile;
use crate::web::auth_middleware::require_session;
use crate::{ApiError, AppState};
use axum::{
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const DEFAULT_CONVERSATION_LIMIT: i64 = 20;
const DEFAULT_MESSAGE_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: Uuid,
    pub title: Option<String>,
    pub agent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Conversation> for ConversationSummary {
    fn from(conversation: Conversation) -> Self {
        ConversationSummary {
            id: conversation.id,
            title: conversation.title,
            agent_id: conversation.agent_id,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

/// GET /api/conversations - caller's conversations, most recent first
async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
    Extension(profile): Extension<Profile>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_CONVERSATION_LIMIT).max(1);
    let offset = params.offset.unwrap_or(0).max(0);

    let conversations = state
        .db
        .list_conversations_for_user(profile.id, limit, offset)?;

    Ok(Json(conversations.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOrCreateRequest {
    pub agent_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOrCreateResponse {
    pub conversation_id: Uuid,
    pub created: bool,
}

/// POST /api/conversations - get-or-create for the (user, agent) pair.
///
/// Creation is serialized through an upsert keyed on the pair, so two
/// concurrent first contacts converge on a single conversation.
async fn get_or_create_conversation(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<Profile>,
    Json(body): Json<GetOrCreateRequest>,
) -> Result<Json<GetOrCreateResponse>, ApiError> {
    let agent_id = body
        .agent_id
        .ok_or_else(|| ApiError::Validation("agentId is required".to_string()))?;

    // Agent lookup is best-effort here: a missing agent only degrades the
    // generated title.
    let agent = state.db.get_agent_by_id(agent_id).ok().flatten();
    let (agent_name, agent_type) = match &agent {
        Some(agent) => (
            agent.display_name().to_string(),
            Some(agent.agent_type.clone()),
        ),
        None => (AGENT_NAME_FALLBACK.to_string(), None),
    };

    let (conversation, created) = state.db.get_or_create_conversation(NewConversation {
        id: Uuid::new_v4(),
        user_id: profile.id,
        agent_id: Some(agent_id),
        agent_type,
        title: Some(format!("Conversa com {agent_name}")),
    })?;

    debug!(
        "get-or-create for ({}, {}): conversation {} created={}",
        profile.id, agent_id, conversation.id, created
    );

    Ok(Json(GetOrCreateResponse {
        conversation_id: conversation.id,
        created,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationHead {
    pub id: Uuid,
    pub title: Option<String>,
    pub agent_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub conversation: ConversationHead,
    pub messages: Vec<Message>,
    pub total: usize,
}

/// GET /api/conversations/:id/messages - ownership-checked history
async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
    Query(params): Query<PageParams>,
    Extension(profile): Extension<Profile>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let conversation = state
        .db
        .get_conversation_by_id_and_user(conversation_id, profile.id)?
        .ok_or(ApiError::ConversationNotFound)?;

    let limit = params.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT).max(1);
    let offset = params.offset.unwrap_or(0).max(0);

    let messages = state
        .db
        .list_messages_for_conversation(conversation_id, limit, offset)?;

    Ok(Json(MessageListResponse {
        conversation: ConversationHead {
            id: conversation.id,
            title: conversation.title,
            agent_id: conversation.agent_id,
        },
        total: messages.len(),
        messages,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/conversations",
            get(list_conversations).post(get_or_create_conversation),
        )
        .route("/api/conversations/:id/messages", get(list_messages))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .with_state(state)
}
