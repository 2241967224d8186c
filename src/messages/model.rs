use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AppError, AppResult};

use super::MessageStatus;

/// A stored message. Conversations are never stored; they are the messages
/// sharing a `job_id` and an unordered `{sender_id, receiver_id}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub job_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub body: String,
    pub status: MessageStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Message {
    /// The other participant, seen from `user_id`.
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.sender_id == user_id {
            Some(self.receiver_id)
        } else if self.receiver_id == user_id {
            Some(self.sender_id)
        } else {
            None
        }
    }
}

/// Unvalidated send request, as it arrives from a request body, a live event
/// or another workflow (e.g. a bid proposal).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub job_id: Option<Uuid>,
    pub sender_id: Option<Uuid>,
    pub receiver_id: Option<Uuid>,
    pub body: Option<String>,
}

impl Draft {
    pub fn new(job_id: Uuid, sender_id: Uuid, receiver_id: Uuid, body: impl Into<String>) -> Self {
        Draft {
            job_id: Some(job_id),
            sender_id: Some(sender_id),
            receiver_id: Some(receiver_id),
            body: Some(body.into()),
        }
    }

    pub(crate) fn validate(self) -> AppResult<NewMessage> {
        let job_id = self.job_id.ok_or_else(|| AppError::validation("jobId is required"))?;
        let sender_id = self.sender_id.ok_or_else(|| AppError::validation("senderId is required"))?;
        let receiver_id = self
            .receiver_id
            .ok_or_else(|| AppError::validation("receiverId is required"))?;
        let body = self.body.unwrap_or_default();

        if body.trim().is_empty() {
            return Err(AppError::validation("body must not be empty"));
        }
        if sender_id == receiver_id {
            return Err(AppError::validation("sender and receiver must differ"));
        }

        Ok(NewMessage { job_id, sender_id, receiver_id, body })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NewMessage {
    pub(crate) job_id: Uuid,
    pub(crate) sender_id: Uuid,
    pub(crate) receiver_id: Uuid,
    pub(crate) body: String,
}

/// Display identity of a counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counterpart {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub user: Counterpart,
    pub last_message: Message,
}

/// A conversation as returned to its reader: statuses are as stored before
/// the read marked anything seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub messages: Vec<Message>,
    #[serde(skip)]
    pub newly_seen: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_incomplete_drafts() {
        let (job, a, b) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());

        let missing_job = Draft { job_id: None, ..Draft::new(job, a, b, "hi") };
        assert!(matches!(missing_job.validate(), Err(AppError::Validation(_))));

        let missing_receiver = Draft { receiver_id: None, ..Draft::new(job, a, b, "hi") };
        assert!(matches!(missing_receiver.validate(), Err(AppError::Validation(_))));

        assert!(matches!(Draft::new(job, a, b, "").validate(), Err(AppError::Validation(_))));
        assert!(matches!(Draft::new(job, a, b, "  \n").validate(), Err(AppError::Validation(_))));
        assert!(matches!(Draft::new(job, a, a, "hi").validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn keeps_body_verbatim() {
        let (job, a, b) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        let new = Draft::new(job, a, b, "  Can deliver in 5 days ").validate().unwrap();
        assert_eq!(new.body, "  Can deliver in 5 days ");
        assert_eq!((new.job_id, new.sender_id, new.receiver_id), (job, a, b));
    }

    #[test]
    fn counterpart_is_relative_to_viewer() {
        let (a, b, c) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        let msg = Message {
            id: Uuid::now_v7(),
            job_id: Uuid::now_v7(),
            sender_id: a,
            receiver_id: b,
            body: "hello".into(),
            status: MessageStatus::Delivered,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert_eq!(msg.counterpart_of(a), Some(b));
        assert_eq!(msg.counterpart_of(b), Some(a));
        assert_eq!(msg.counterpart_of(c), None);
    }
}
