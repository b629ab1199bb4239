//! Inbound callbacks from the automation platform.
//!
//! Both historical routes (`/api/webhook/n8n` and
//! `/api/webhook/n8n-response`) share one handler; the payload accepts
//! both observed field spellings. A bearer token is always required and,
//! when a shared secret is configured, must match it exactly.

use crate::models::messages::{attachments_to_jsonb, Attachment, NewMessage};
use crate::realtime::{Delivery, NewMessageEvent};
use crate::web::auth_middleware::bearer_token;
use crate::{ApiError, AppState};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct InboundReplyPayload {
    #[serde(default, alias = "conversationId")]
    pub conversation_id: Option<Uuid>,
    #[serde(default, alias = "response")]
    pub agent_response: Option<String>,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundReplyResponse {
    pub success: bool,
    pub message_id: Uuid,
    pub conversation_id: Uuid,
}

fn check_webhook_auth(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
    if let Some(ref secret) = state.config.n8n_webhook_secret {
        if token != secret {
            return Err(ApiError::Unauthorized);
        }
    }
    Ok(())
}

/// POST /api/webhook/n8n | /api/webhook/n8n-response
async fn receive_reply(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<InboundReplyPayload>,
) -> Result<Json<InboundReplyResponse>, ApiError> {
    check_webhook_auth(&state, &headers)?;

    let conversation_id = payload.conversation_id.ok_or_else(|| {
        ApiError::Validation("conversation_id is required".to_string())
    })?;
    let response_text = payload
        .agent_response
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Validation("agent_response is required".to_string()))?;

    let conversation = state
        .db
        .get_conversation_by_id(conversation_id)?
        .ok_or(ApiError::ConversationNotFound)?;

    // When the conversation has no bound agent, try the supplied name.
    // Absence is not an error; the id simply stays unset.
    let mut agent_id = conversation.agent_id;
    if agent_id.is_none() {
        if let Some(ref name) = payload.agent_name {
            agent_id = state.db.get_agent_by_name(name).ok().flatten().map(|a| a.id);
        }
    }

    let mut new_message =
        NewMessage::assistant(conversation_id, response_text.to_string(), agent_id);
    new_message.attachments = attachments_to_jsonb(&payload.attachments);
    let message = state.db.insert_message_and_touch(new_message)?;

    info!(
        "Stored asynchronous assistant reply {} for conversation {}",
        message.id, conversation_id
    );

    let delivery = state
        .hub
        .publish(NewMessageEvent {
            conversation_id,
            message: message.clone(),
            agent_id,
            user_id: conversation.user_id,
        })
        .await;
    if delivery == Delivery::Unconfirmed {
        warn!(
            "No realtime listener for conversation {}; reply delivered on next load",
            conversation_id
        );
    }

    Ok(Json(InboundReplyResponse {
        success: true,
        message_id: message.id,
        conversation_id,
    }))
}

/// GET companion: static liveness payload documenting the POST shape.
async fn describe_webhook() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Webhook de resposta N8N está funcionando",
        "timestamp": Utc::now().to_rfc3339(),
        "expectedPayload": {
            "conversation_id": "string (obrigatório)",
            "agent_response": "string (obrigatório)",
            "agent_name": "string (opcional)",
            "attachments": "array (opcional)"
        }
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/webhook/n8n", get(describe_webhook).post(receive_reply))
        .route(
            "/api/webhook/n8n-response",
            get(describe_webhook).post(receive_reply),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_accepts_both_field_spellings() {
        let canonical: InboundReplyPayload = serde_json::from_str(
            r#"{"conversation_id":"5f2d7c1e-0000-4000-8000-000000000001","agent_response":"Oi"}"#,
        )
        .unwrap();
        assert!(canonical.conversation_id.is_some());
        assert_eq!(canonical.agent_response.as_deref(), Some("Oi"));

        let legacy: InboundReplyPayload = serde_json::from_str(
            r#"{"conversationId":"5f2d7c1e-0000-4000-8000-000000000001","response":"Oi"}"#,
        )
        .unwrap();
        assert!(legacy.conversation_id.is_some());
        assert_eq!(legacy.agent_response.as_deref(), Some("Oi"));
    }

    #[test]
    fn payload_tolerates_extra_fields_and_defaults() {
        let payload: InboundReplyPayload = serde_json::from_str(
            r#"{"conversation_id":"5f2d7c1e-0000-4000-8000-000000000001",
                "agent_response":"Oi","agent_name":"Advogado",
                "user_name":"Ana","timestamp":"2026-01-01T00:00:00Z",
                "attachments_type":"image"}"#,
        )
        .unwrap();
        assert_eq!(payload.agent_name.as_deref(), Some("Advogado"));
        assert!(payload.attachments.is_empty());

        let empty: InboundReplyPayload = serde_json::from_str("{}").unwrap();
        assert!(empty.conversation_id.is_none());
        assert!(empty.agent_response.is_none());
    }
}
