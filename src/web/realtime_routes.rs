//! WebSocket endpoint chat clients use to watch a conversation.
//!
//! Browser WebSocket clients cannot set headers, so the session token
//! travels as a query parameter and is validated before the upgrade.

use crate::realtime::EVENT_NEW_MESSAGE;
use crate::web::auth_middleware::profile_for_token;
use crate::{ApiError, AppState};
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct WatchParams {
    pub conversation_id: Uuid,
    pub token: String,
}

/// GET /api/realtime/ws?conversation_id=&token=
async fn watch_conversation(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WatchParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let profile = profile_for_token(&state, &params.token)?;

    state
        .db
        .get_conversation_by_id_and_user(params.conversation_id, profile.id)?
        .ok_or(ApiError::ConversationNotFound)?;

    let conversation_id = params.conversation_id;
    Ok(ws
        .on_upgrade(move |socket| forward_events(socket, state, conversation_id))
        .into_response())
}

async fn forward_events(socket: WebSocket, state: Arc<AppState>, conversation_id: Uuid) {
    let mut events = state.hub.subscribe(conversation_id).await;
    let (mut sink, mut stream) = socket.split();

    debug!("Realtime watcher attached to conversation {conversation_id}");
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Ok(text) = serde_json::to_string(&json!({
                        "event": EVENT_NEW_MESSAGE,
                        "payload": event,
                    })) else {
                        continue;
                    };
                    if sink.send(WsMessage::Text(text)).await.is_err() {
                        break;
                    }
                }
                // A lagged watcher just misses events; history backfills.
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            },
        }
    }
    debug!("Realtime watcher detached from conversation {conversation_id}");
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/realtime/ws", get(watch_conversation))
        .with_state(state)
}
