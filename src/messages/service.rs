use std::{collections::HashSet, sync::Arc};

use uuid::Uuid;

use crate::{live::Rooms, AppError, AppResult};

use super::{ChatEntry, Conversation, Directory, Draft, Message, MessageStatus, MessageStore};

/// Messaging operations shared by the request handlers and the live channel.
///
/// The rooms handle is injected here so both transports fan out through the
/// same path.
#[derive(Clone)]
pub struct ConversationService {
    store: MessageStore,
    directory: Directory,
    rooms: Arc<Rooms>,
}

impl ConversationService {
    pub fn new(store: MessageStore, directory: Directory, rooms: Arc<Rooms>) -> Self {
        ConversationService { store, directory, rooms }
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn rooms(&self) -> &Arc<Rooms> {
        &self.rooms
    }

    /// Persists, promotes to `delivered`, then broadcasts to the job's room.
    ///
    /// Nothing is broadcast unless both writes succeeded.
    pub async fn send_message(&self, acting_user: Uuid, draft: Draft) -> AppResult<Message> {
        let created = self.store.create(acting_user, draft).await?;
        let message = self.store.advance(created.id, MessageStatus::Delivered).await?;

        let reached = self.rooms.emit_message(message.job_id, &message);
        tracing::info!(
            message_id = %message.id,
            job_id = %message.job_id,
            sender_id = %message.sender_id,
            receiver_id = %message.receiver_id,
            reached,
            "message delivered"
        );

        Ok(message)
    }

    /// Returns the thread between `current_user` and `other_user` in `job_id`,
    /// then marks everything addressed to `current_user` there as seen.
    ///
    /// The returned statuses are those stored before the seen transition.
    pub async fn get_conversation(
        &self,
        job_id: Uuid,
        current_user: Uuid,
        other_user: Uuid,
    ) -> AppResult<Conversation> {
        if current_user == other_user {
            return Err(AppError::validation("cannot open a conversation with yourself"));
        }

        let messages = self.store.find_conversation(job_id, current_user, other_user).await?;
        let newly_seen = self.mark_seen(job_id, current_user).await?;

        Ok(Conversation { messages, newly_seen })
    }

    /// Marks `reader`'s unseen messages in `job_id` as seen and tells the room
    /// when anything changed.
    pub async fn mark_seen(&self, job_id: Uuid, reader: Uuid) -> AppResult<u64> {
        let newly_seen = self.store.bulk_advance_to_seen(job_id, reader).await?;
        if newly_seen > 0 {
            self.rooms.emit_seen(job_id, reader);
            tracing::info!(%job_id, %reader, newly_seen, "messages seen");
        }
        Ok(newly_seen)
    }

    /// One entry per counterpart, holding the latest message exchanged with
    /// them in any job, newest first. Deleted accounts are left out.
    pub async fn get_chat_list(&self, user_id: Uuid) -> AppResult<Vec<ChatEntry>> {
        let messages = self.store.find_all_for_user(user_id).await?;

        let mut chats = Vec::new();
        for (counterpart_id, last_message) in latest_per_counterpart(user_id, messages) {
            match self.directory.resolve(counterpart_id).await? {
                Some(user) => chats.push(ChatEntry { user, last_message }),
                None => tracing::debug!(%counterpart_id, "skipping chat with unknown account"),
            }
        }
        Ok(chats)
    }
}

/// Keeps the first message seen for each counterpart. `messages` must be
/// ordered newest first; the output keeps that order.
pub fn latest_per_counterpart(user_id: Uuid, messages: Vec<Message>) -> Vec<(Uuid, Message)> {
    let mut seen = HashSet::new();
    messages
        .into_iter()
        .filter_map(|msg| Some((msg.counterpart_of(user_id)?, msg)))
        .filter(|(counterpart, _)| seen.insert(*counterpart))
        .collect()
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use super::*;

    fn msg(job: Uuid, from: Uuid, to: Uuid, minutes: i64) -> Message {
        Message {
            id: Uuid::now_v7(),
            job_id: job,
            sender_id: from,
            receiver_id: to,
            body: format!("at {minutes}"),
            status: MessageStatus::Delivered,
            created_at: OffsetDateTime::UNIX_EPOCH + Duration::minutes(minutes),
        }
    }

    #[test]
    fn keeps_newest_message_per_counterpart_across_jobs() {
        let (me, a, b) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        let (job1, job2) = (Uuid::now_v7(), Uuid::now_v7());

        let newest_first = vec![
            msg(job2, b, me, 40),
            msg(job1, me, a, 30),
            msg(job2, me, b, 20),
            msg(job2, a, me, 10),
        ];
        let latest = latest_per_counterpart(me, newest_first.clone());

        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0], (b, newest_first[0].clone()));
        assert_eq!(latest[1], (a, newest_first[1].clone()));
    }

    #[test]
    fn ignores_messages_not_involving_the_user() {
        let (me, a, b) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        let latest = latest_per_counterpart(me, vec![msg(Uuid::now_v7(), a, b, 5)]);
        assert!(latest.is_empty());
    }
}
