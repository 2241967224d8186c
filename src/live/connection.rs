use std::collections::HashSet;

use tokio::{
    sync::{broadcast::error::RecvError, mpsc::{self, error::TrySendError}},
    task::JoinSet,
};
use uuid::Uuid;

use crate::{
    messages::ConversationService,
    session::Caller,
    AppError, AppResult,
};

use super::{
    event::{Ack, ClientEvent, ErrorNotice, JoinRoom, MarkSeen, ServerEvent},
    Rooms,
};

/// State of one live connection: the rooms it joined and the queue its
/// socket writer drains.
///
/// The outbound queue is bounded. When the socket cannot keep up, room
/// events that do not fit are dropped and the connection keeps receiving
/// newer ones.
///
/// Dropping the connection aborts its room subscriptions, which is all
/// leaving a room amounts to.
pub struct Connection {
    caller: Caller,
    user_id: Option<Uuid>,
    joined: HashSet<Uuid>,
    forwarders: JoinSet<()>,
    out: mpsc::Sender<ServerEvent>,
}

impl Connection {
    pub fn new(caller: Caller, out: mpsc::Sender<ServerEvent>) -> Self {
        Connection {
            caller,
            user_id: None,
            joined: HashSet::new(),
            forwarders: JoinSet::new(),
            out,
        }
    }

    /// User id recorded by the latest `join-room`.
    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn has_joined(&self, job_id: Uuid) -> bool {
        self.joined.contains(&job_id)
    }

    pub async fn handle(&mut self, conversations: &ConversationService, event: ClientEvent) {
        match event {
            ClientEvent::JoinRoom(JoinRoom { job_id, user_id }) => {
                if let Err(err) = self.join(conversations.rooms(), job_id, user_id) {
                    self.reject(None, err);
                }
            }
            ClientEvent::SendMessage(send) => {
                let (in_reply_to, draft) = send.into_draft();
                match conversations.send_message(self.caller.user_id, draft).await {
                    Ok(message) => self.reply(ServerEvent::Ack(Ack {
                        in_reply_to,
                        message_id: message.id,
                    })),
                    Err(err) => self.reject(in_reply_to, err),
                }
            }
            ClientEvent::MarkSeen(MarkSeen { job_id, user_id }) => {
                let marked = match self.caller.ensure_is(user_id) {
                    Ok(()) => conversations.mark_seen(job_id, user_id).await,
                    Err(err) => Err(err),
                };
                if let Err(err) = marked {
                    self.reject(None, err);
                }
            }
        }
    }

    pub fn join(&mut self, rooms: &Rooms, job_id: Uuid, user_id: Uuid) -> AppResult<()> {
        self.caller.ensure_is(user_id)?;
        self.user_id = Some(user_id);

        if !self.joined.insert(job_id) {
            return Ok(());
        }

        let mut rx = rooms.subscribe(job_id);
        let out = self.out.clone();
        self.forwarders.spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => match out.try_send(event) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            tracing::warn!(%job_id, "live connection too slow, dropping event");
                        }
                        Err(TrySendError::Closed(_)) => break,
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(%job_id, skipped, "live subscriber fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        tracing::info!(%user_id, %job_id, "joined job room");
        Ok(())
    }

    /// Leaves every joined room and waits until the subscriptions are gone.
    pub async fn close(mut self) {
        self.forwarders.shutdown().await;
        self.joined.clear();
    }

    /// Reports a failed event to this connection only.
    pub fn reject(&self, in_reply_to: Option<String>, err: AppError) {
        if err.status().is_server_error() {
            tracing::error!(user_id = %self.caller.user_id, error = %err, "live event failed");
        } else {
            tracing::warn!(user_id = %self.caller.user_id, error = %err, "live event rejected");
        }
        self.reply(ServerEvent::Error(ErrorNotice::new(in_reply_to, &err)));
    }

    fn reply(&self, event: ServerEvent) {
        match self.out.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let user_id = self.caller.user_id;
                tracing::warn!(%user_id, "live connection too slow, dropping reply");
            }
            // writer already gone means the socket is closing
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
