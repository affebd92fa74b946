//! API request and response types

use crate::attachments::{FileRef, MediaKind};
use crate::request::Requester;
use crate::session::Session;
use crate::state_machine::{Event, Prompt};
use serde::{Deserialize, Serialize};

/// Request carrying one chat event
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    /// Who sent it. Falls back to the conversation id when absent.
    #[serde(default)]
    pub requester: Option<Requester>,
    pub payload: EventPayload,
}

/// What the user sent, as the chat client reports it
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Text {
        text: String,
    },
    Choice {
        token: String,
    },
    File {
        file_id: String,
        #[serde(default)]
        file_name: Option<String>,
        media: MediaKind,
    },
    Command {
        name: String,
    },
}

impl EventPayload {
    /// Decode into a typed event; the only place raw payloads are parsed
    pub fn into_event(self) -> Result<Event, String> {
        match self {
            EventPayload::Text { text } => Ok(Event::from_text(&text)),
            EventPayload::Choice { token } if token.is_empty() => {
                Err("choice token must not be empty".to_string())
            }
            EventPayload::Choice { token } => Ok(Event::from_token(&token)),
            EventPayload::File { file_id, .. } if file_id.is_empty() => {
                Err("file_id must not be empty".to_string())
            }
            EventPayload::File {
                file_id,
                file_name,
                media,
            } => Ok(Event::File(FileRef {
                file_id,
                file_name,
                media,
            })),
            EventPayload::Command { name } => Ok(Event::from_command(&name)),
        }
    }
}

/// Response for an accepted event
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

/// One reply waiting to be picked up by the chat client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Prompt(Prompt),
    /// The last choice was accepted without a visible reply
    Ack,
}

/// Response with the replies queued since the last poll
#[derive(Debug, Serialize)]
pub struct OutboxResponse {
    pub messages: Vec<Outbound>,
}

/// Response with a conversation's current session, if any
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: Option<Session>,
}

/// Response for a discarded session
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
}

/// Service status
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub active_sessions: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> Result<Event, String> {
        serde_json::from_value::<EventPayload>(value)
            .unwrap()
            .into_event()
    }

    #[test]
    fn test_payloads_decode_to_events() {
        assert_eq!(
            decode(json!({"type": "text", "text": "Cable"})),
            Ok(Event::Text("Cable".into()))
        );
        assert_eq!(
            decode(json!({"type": "text", "text": "/start"})),
            Ok(Event::Start)
        );
        assert_eq!(
            decode(json!({"type": "command", "name": "cancel"})),
            Ok(Event::Cancel)
        );
        assert_eq!(
            decode(json!({"type": "choice", "token": "cal:noop"})),
            Ok(Event::Ignore)
        );
        assert_eq!(
            decode(json!({"type": "file", "file_id": "f1", "media": "photo"})),
            Ok(Event::File(FileRef {
                file_id: "f1".into(),
                file_name: None,
                media: MediaKind::Photo,
            }))
        );
    }

    #[test]
    fn test_empty_identifiers_are_rejected() {
        assert!(decode(json!({"type": "choice", "token": ""})).is_err());
        assert!(decode(json!({"type": "file", "file_id": "", "media": "document"})).is_err());
    }

    #[test]
    fn test_outbound_wire_shape() {
        let ack = serde_json::to_value(Outbound::Ack).unwrap();
        assert_eq!(ack, json!({"type": "ack"}));

        let prompt = serde_json::to_value(Outbound::Prompt(Prompt::text("Hi"))).unwrap();
        assert_eq!(prompt["type"], "prompt");
        assert_eq!(prompt["text"], "Hi");
    }
}
