//! The message-send-and-relay pipeline.
//!
//! A user message is validated, persisted, forwarded to the automation
//! platform, and the returned assistant reply (if any) is persisted and
//! announced on the conversation's realtime channel.

use crate::models::conversations::NewConversation;
use crate::models::messages::{
    attachment_kinds_summary, attachments_to_jsonb, Attachment, Message, NewMessage,
    ATTACHMENT_PLACEHOLDER,
};
use crate::models::profiles::Profile;
use crate::realtime::{Delivery, NewMessageEvent};
use crate::relay::{RelayPayload, SENDER_TYPE_USER};
use crate::web::auth_middleware::require_session;
use crate::{ApiError, AppState};
use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::post,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Conversation titles keep at most this many characters of the first message.
const TITLE_MAX_CHARS: usize = 50;

/// Display-name fallback when a profile has neither name nor usable email.
const USER_NAME_FALLBACK: &str = "Usuário";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: String,
    pub agent_id: Option<Uuid>,
    #[serde(default)]
    pub conversation_id: Option<Uuid>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub success: bool,
    pub conversation_id: Uuid,
    pub response: Option<String>,
    pub agent_message: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<Delivery>,
}

/// POST /api/chat/send
async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<Profile>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let text = body.message.trim();
    if text.is_empty() && body.attachments.is_empty() {
        return Err(ApiError::Validation(
            "A message or attachments are required".to_string(),
        ));
    }
    let agent_id = body
        .agent_id
        .ok_or_else(|| ApiError::Validation("agentId is required".to_string()))?;

    let agent = state
        .db
        .get_agent_by_id(agent_id)?
        .ok_or(ApiError::AgentNotFound)?;

    // Resolve or lazily create the conversation. Creation goes through
    // the same (user, agent) upsert as POST /api/conversations, so a
    // second send without a conversationId reuses the existing thread
    // instead of tripping the pair's unique index. The derived title only
    // lands when this call actually creates the row.
    let conversation_id = match body.conversation_id {
        Some(id) => {
            state
                .db
                .get_conversation_by_id_and_user(id, profile.id)?
                .ok_or(ApiError::ConversationNotFound)?;
            id
        }
        None => {
            let (conversation, created) = state.db.get_or_create_conversation(NewConversation {
                id: Uuid::new_v4(),
                user_id: profile.id,
                agent_id: Some(agent.id),
                agent_type: Some(agent.agent_type.clone()),
                title: Some(derive_title(text)),
            })?;
            debug!(
                "Resolved conversation {} for user {} (created={})",
                conversation.id, profile.id, created
            );
            conversation.id
        }
    };

    // Persist the inbound message before anything can go wrong upstream.
    let content = if text.is_empty() {
        ATTACHMENT_PLACEHOLDER.to_string()
    } else {
        text.to_string()
    };
    state.db.insert_message(NewMessage::user(
        conversation_id,
        content.clone(),
        Some(agent.id),
        attachments_to_jsonb(&body.attachments),
    ))?;

    let payload = RelayPayload {
        user_name: display_name(profile.full_name.as_deref(), &profile.email),
        sender_type: SENDER_TYPE_USER.to_string(),
        message: content,
        agent_name: agent.display_name().to_string(),
        conversation_id,
        attachments: body.attachments.clone(),
        attachments_type: attachment_kinds_summary(&body.attachments),
        timestamp: Utc::now().to_rfc3339(),
    };

    // The user message stays persisted even when the relay fails.
    let response_text = state.relay.relay(&payload).await?;

    let mut agent_message = None;
    let mut delivery = None;
    if let Some(ref response) = response_text {
        match state.db.insert_message_and_touch(NewMessage::assistant(
            conversation_id,
            response.clone(),
            Some(agent.id),
        )) {
            Ok(message) => {
                let outcome = state
                    .hub
                    .publish(NewMessageEvent {
                        conversation_id,
                        message: message.clone(),
                        agent_id: Some(agent.id),
                        user_id: profile.id,
                    })
                    .await;
                if outcome == Delivery::Unconfirmed {
                    warn!(
                        "No realtime listener for conversation {}; reply delivered on next load",
                        conversation_id
                    );
                }
                delivery = Some(outcome);
                agent_message = Some(message);
            }
            // The reply was produced but could not be stored; the caller
            // still gets it in the response body.
            Err(e) => error!("Failed to persist assistant reply: {:?}", e),
        }
    }

    // The touch is bundled with the assistant insert; without a reply it
    // still needs to happen, and failing it never fails the send.
    if agent_message.is_none() {
        if let Err(e) = state.db.touch_conversation(conversation_id) {
            warn!("Failed to touch conversation {}: {:?}", conversation_id, e);
        }
    }

    Ok(Json(SendMessageResponse {
        success: true,
        conversation_id,
        response: response_text,
        agent_message,
        delivery,
    }))
}

/// First 50 characters of the message, ellipsis appended when truncated.
fn derive_title(message: &str) -> String {
    let mut title: String = message.chars().take(TITLE_MAX_CHARS).collect();
    if message.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}

/// full_name when set, else a capitalized email local part, else a
/// generic label.
fn display_name(full_name: Option<&str>, email: &str) -> String {
    if let Some(name) = full_name {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let local_part = email.split('@').next().unwrap_or_default();
    let mut chars = local_part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => USER_NAME_FALLBACK.to_string(),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat/send", post(send_message))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_truncated_with_ellipsis() {
        assert_eq!(derive_title("Olá"), "Olá");
        let long = "a".repeat(60);
        let title = derive_title(&long);
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS + 3);
        assert!(title.ends_with("..."));

        let exact = "b".repeat(50);
        assert_eq!(derive_title(&exact), exact);
    }

    #[test]
    fn title_truncates_on_char_boundaries() {
        let accented = "ã".repeat(60);
        let title = derive_title(&accented);
        assert!(title.starts_with(&"ã".repeat(50)));
        assert!(title.ends_with("..."));
    }

    #[test]
    fn display_name_prefers_full_name() {
        assert_eq!(display_name(Some("Ana Souza"), "ana@x.com"), "Ana Souza");
        assert_eq!(display_name(Some("  "), "ana@x.com"), "Ana");
        assert_eq!(display_name(None, "maria.silva@x.com"), "Maria.silva");
        assert_eq!(display_name(None, ""), USER_NAME_FALLBACK);
    }

    #[test]
    fn request_accepts_minimal_body() {
        let body: SendMessageRequest = serde_json::from_str(
            r#"{"message":"Olá","agentId":"5f2d7c1e-0000-4000-8000-000000000001"}"#,
        )
        .unwrap();
        assert_eq!(body.message, "Olá");
        assert!(body.agent_id.is_some());
        assert!(body.conversation_id.is_none());
        assert!(body.attachments.is_empty());
    }
}
