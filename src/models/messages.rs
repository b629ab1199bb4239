use crate::models::conversations::ConversationError;
use crate::models::schema::{conversations, messages};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// Content stored when a message carries only attachments.
pub const ATTACHMENT_PLACEHOLDER: &str = "[Anexo]";

#[derive(Error, Debug)]
pub enum MessageError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
    #[error("Conversation error: {0}")]
    ConversationError(#[from] ConversationError),
}

/// A chat attachment as carried on messages and the relay payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub mime_type: String,
}

/// Type tag derived from the MIME prefix: image, video, audio or file.
pub fn attachment_kind_from_mime(mime_type: &str) -> &'static str {
    if mime_type.starts_with("image/") {
        "image"
    } else if mime_type.starts_with("video/") {
        "video"
    } else if mime_type.starts_with("audio/") {
        "audio"
    } else {
        "file"
    }
}

/// Comma-joined distinct type tags, in first-seen order.
pub fn attachment_kinds_summary(attachments: &[Attachment]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for attachment in attachments {
        if !seen.contains(&attachment.kind.as_str()) {
            seen.push(&attachment.kind);
        }
    }
    seen.join(", ")
}

pub fn attachments_to_jsonb(attachments: &[Attachment]) -> Option<Value> {
    if attachments.is_empty() {
        None
    } else {
        serde_json::to_value(attachments).ok()
    }
}

#[derive(Queryable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub content: String,
    pub role: String,
    pub agent_id: Option<Uuid>,
    pub attachments: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn list_for_conversation(
        conn: &mut PgConnection,
        lookup_conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, MessageError> {
        messages::table
            .filter(messages::conversation_id.eq(lookup_conversation_id))
            .order(messages::created_at.asc())
            .limit(limit)
            .offset(offset)
            .load::<Message>(conn)
            .map_err(MessageError::DatabaseError)
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub content: String,
    pub role: String,
    pub agent_id: Option<Uuid>,
    pub attachments: Option<Value>,
}

impl NewMessage {
    pub fn user(
        conversation_id: Uuid,
        content: String,
        agent_id: Option<Uuid>,
        attachments: Option<Value>,
    ) -> Self {
        NewMessage {
            id: Uuid::new_v4(),
            conversation_id,
            content,
            role: ROLE_USER.to_string(),
            agent_id,
            attachments,
        }
    }

    pub fn assistant(conversation_id: Uuid, content: String, agent_id: Option<Uuid>) -> Self {
        NewMessage {
            id: Uuid::new_v4(),
            conversation_id,
            content,
            role: ROLE_ASSISTANT.to_string(),
            agent_id,
            attachments: None,
        }
    }

    pub fn insert(&self, conn: &mut PgConnection) -> Result<Message, MessageError> {
        diesel::insert_into(messages::table)
            .values(self)
            .get_result::<Message>(conn)
            .map_err(MessageError::DatabaseError)
    }

    /// Persists the message and bumps the conversation's `updated_at` in a
    /// single transaction so a reply never lands without its touch.
    pub fn insert_and_touch(&self, conn: &mut PgConnection) -> Result<Message, MessageError> {
        conn.transaction::<Message, MessageError, _>(|conn| {
            let message = diesel::insert_into(messages::table)
                .values(self)
                .get_result::<Message>(conn)?;

            diesel::update(
                conversations::table.filter(conversations::id.eq(self.conversation_id)),
            )
            .set(conversations::updated_at.eq(Utc::now()))
            .execute(conn)?;

            Ok(message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(kind: &str, mime: &str) -> Attachment {
        Attachment {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            filename: "file.bin".to_string(),
            url: "http://localhost/uploads/file.bin".to_string(),
            size: 42,
            mime_type: mime.to_string(),
        }
    }

    #[test]
    fn kind_follows_mime_prefix() {
        assert_eq!(attachment_kind_from_mime("image/png"), "image");
        assert_eq!(attachment_kind_from_mime("video/mp4"), "video");
        assert_eq!(attachment_kind_from_mime("audio/ogg"), "audio");
        assert_eq!(attachment_kind_from_mime("application/pdf"), "file");
        assert_eq!(attachment_kind_from_mime(""), "file");
    }

    #[test]
    fn summary_joins_distinct_kinds_in_order() {
        let attachments = vec![
            attachment("image", "image/png"),
            attachment("file", "application/pdf"),
            attachment("image", "image/jpeg"),
        ];
        assert_eq!(attachment_kinds_summary(&attachments), "image, file");
        assert_eq!(attachment_kinds_summary(&[]), "");
    }

    #[test]
    fn jsonb_encoding_skips_empty_lists() {
        let attachments = vec![attachment("image", "image/png")];
        let value = attachments_to_jsonb(&attachments).expect("non-empty encodes");
        let decoded: Vec<Attachment> = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, attachments);
        assert!(attachments_to_jsonb(&[]).is_none());
    }

    #[test]
    fn attachment_serializes_with_type_field() {
        let value = serde_json::to_value(attachment("image", "image/png")).unwrap();
        assert_eq!(value["type"], "image");
        assert!(value.get("kind").is_none());
    }
}
