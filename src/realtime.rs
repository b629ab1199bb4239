//! In-process publish/subscribe hub pushing new messages to connected
//! chat clients.
//!
//! Channels are partitioned per conversation (`chat:<id>`) so a listener
//! only receives traffic for the thread it watches. Publishing reports an
//! explicit delivery outcome instead of pretending an unobserved broadcast
//! succeeded; callers treat both outcomes as success and only log them.

use crate::models::messages::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

pub const EVENT_NEW_MESSAGE: &str = "new_message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// At least one live subscriber received the event.
    Confirmed,
    /// Nobody was listening; the event was dropped.
    Unconfirmed,
}

/// Broadcast payload for a newly persisted assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessageEvent {
    pub conversation_id: Uuid,
    pub message: Message,
    pub agent_id: Option<Uuid>,
    pub user_id: Uuid,
}

#[derive(Clone, Default)]
pub struct ChannelHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<NewMessageEvent>>>>,
}

pub fn channel_name(conversation_id: Uuid) -> String {
    format!("chat:{conversation_id}")
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens (or joins) the conversation's channel and returns a receiver.
    pub async fn subscribe(&self, conversation_id: Uuid) -> broadcast::Receiver<NewMessageEvent> {
        let name = channel_name(conversation_id);
        let mut channels = self.channels.write().await;
        channels
            .entry(name)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Announces the event on its conversation channel. Channels with no
    /// remaining subscribers are pruned on the way out.
    pub async fn publish(&self, event: NewMessageEvent) -> Delivery {
        let name = channel_name(event.conversation_id);

        {
            let channels = self.channels.read().await;
            if let Some(sender) = channels.get(&name) {
                if sender.send(event).is_ok() {
                    return Delivery::Confirmed;
                }
            } else {
                return Delivery::Unconfirmed;
            }
        }

        // send() failed: the last receiver went away. Drop the channel.
        let mut channels = self.channels.write().await;
        if let Some(sender) = channels.get(&name) {
            if sender.receiver_count() == 0 {
                channels.remove(&name);
                debug!(channel = %name, "Pruned idle realtime channel");
            }
        }
        Delivery::Unconfirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event_for(conversation_id: Uuid) -> NewMessageEvent {
        NewMessageEvent {
            conversation_id,
            message: Message {
                id: Uuid::new_v4(),
                conversation_id,
                content: "Como posso ajudar?".to_string(),
                role: "assistant".to_string(),
                agent_id: None,
                attachments: None,
                created_at: Utc::now(),
            },
            agent_id: None,
            user_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_unconfirmed() {
        let hub = ChannelHub::new();
        let delivery = hub.publish(event_for(Uuid::new_v4())).await;
        assert_eq!(delivery, Delivery::Unconfirmed);
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let hub = ChannelHub::new();
        let conversation_id = Uuid::new_v4();
        let mut rx = hub.subscribe(conversation_id).await;

        let delivery = hub.publish(event_for(conversation_id)).await;
        assert_eq!(delivery, Delivery::Confirmed);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.conversation_id, conversation_id);
        assert_eq!(received.message.content, "Como posso ajudar?");
    }

    #[tokio::test]
    async fn channels_are_partitioned_by_conversation() {
        let hub = ChannelHub::new();
        let watched = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut rx = hub.subscribe(watched).await;

        assert_eq!(hub.publish(event_for(other)).await, Delivery::Unconfirmed);
        assert_eq!(hub.publish(event_for(watched)).await, Delivery::Confirmed);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.conversation_id, watched);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_subscriber_turns_publish_unconfirmed() {
        let hub = ChannelHub::new();
        let conversation_id = Uuid::new_v4();
        let rx = hub.subscribe(conversation_id).await;
        drop(rx);

        assert_eq!(
            hub.publish(event_for(conversation_id)).await,
            Delivery::Unconfirmed
        );
    }

    #[test]
    fn event_serializes_camel_case() {
        let event = event_for(Uuid::new_v4());
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("conversationId").is_some());
        assert!(value.get("userId").is_some());
        assert!(value.get("agentId").is_some());
    }
}
