//! Frames exchanged over the live channel.
//!
//! Every frame is a JSON text message `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{messages::{Draft, Message}, AppError};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinRoom(JoinRoom),
    SendMessage(SendMessage),
    MarkSeen(MarkSeen),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub job_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    /// Echoed back in the `ack`/`error` answering this frame.
    pub client_msg_id: Option<String>,
    pub job_id: Option<Uuid>,
    pub sender_id: Option<Uuid>,
    pub receiver_id: Option<Uuid>,
    pub body: Option<String>,
}

impl SendMessage {
    pub fn into_draft(self) -> (Option<String>, Draft) {
        let draft = Draft {
            job_id: self.job_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            body: self.body,
        };
        (self.client_msg_id, draft)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSeen {
    pub job_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    ReceiveMessage(Message),
    MessagesSeen(SeenNotice),
    Ack(Ack),
    Error(ErrorNotice),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenNotice {
    pub job_id: Uuid,
    /// Whose unseen messages were just cleared.
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub in_reply_to: Option<String>,
    pub message_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    pub in_reply_to: Option<String>,
    pub code: String,
    pub message: String,
}

impl ErrorNotice {
    pub fn new(in_reply_to: Option<String>, err: &AppError) -> Self {
        ErrorNotice {
            in_reply_to,
            code: err.code().to_owned(),
            message: err.public_message(),
        }
    }
}
