use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::messages::Message;

use super::event::{SeenNotice, ServerEvent};

/// Job-keyed rooms for fan-out of live events.
///
/// A room is a broadcast channel; joining a room means holding one of its
/// receivers. Membership lives only in this process.
pub struct Rooms {
    rooms: RwLock<HashMap<Uuid, broadcast::Sender<ServerEvent>>>,
    capacity: usize,
}

impl Rooms {
    pub fn new(capacity: usize) -> Self {
        Rooms {
            rooms: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Per-room buffer size, also used to bound each connection's outbound queue.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscribe(&self, job_id: Uuid) -> broadcast::Receiver<ServerEvent> {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = rooms.get(&job_id) {
            return tx.subscribe();
        }
        drop(rooms);

        self.rooms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(job_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Pushes a message to every member of the job's room, the sender's own
    /// connections included. Returns how many subscribers it reached.
    pub fn emit_message(&self, job_id: Uuid, message: &Message) -> usize {
        self.emit(job_id, ServerEvent::ReceiveMessage(message.clone()))
    }

    pub fn emit_seen(&self, job_id: Uuid, seen_by: Uuid) -> usize {
        self.emit(job_id, ServerEvent::MessagesSeen(SeenNotice { job_id, user_id: seen_by }))
    }

    fn emit(&self, job_id: Uuid, event: ServerEvent) -> usize {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = rooms.get(&job_id) else {
            return 0;
        };
        // no receivers is not an error: nobody is watching this job right now
        tx.send(event).unwrap_or(0)
    }

    pub fn member_count(&self, job_id: Uuid) -> usize {
        self.rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&job_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Drops rooms nobody listens to any more.
    pub fn prune(&self) {
        self.rooms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, tx| tx.receiver_count() > 0);
    }

    pub fn len(&self) -> usize {
        self.rooms.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
