use super::{MessageRepository, RoomRepository, UserRepository};
use crate::domain::message::{
    start_processing, ClaimMode, ClaimOutcome, Message, MessageUpdate, ProcessingLease,
    ProcessingStatus,
};
use crate::domain::room::Room;
use crate::domain::user::User;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::broadcast;

const CHANGE_FEED_CAPACITY: usize = 1024;

/// Change notifications published by the in-memory store
#[derive(Debug, Clone)]
pub enum StoreEvent {
    RoomsChanged,
    MessageCreated(Message),
}

type MessageKey = (String, String);

/// Process-local store used for development and tests.
/// Every mutation happens under one write lock, so claims are atomic.
pub struct MemoryStore {
    rooms: RwLock<BTreeMap<String, Room>>,
    users: RwLock<HashMap<String, User>>,
    messages: RwLock<HashMap<MessageKey, Message>>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            rooms: RwLock::new(BTreeMap::new()),
            users: RwLock::new(HashMap::new()),
            messages: RwLock::new(HashMap::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn room_ids(&self) -> Vec<String> {
        self.rooms.read().keys().cloned().collect()
    }

    /// Messages of a room in creation order
    pub fn room_messages(&self, room_id: &str) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .messages
            .read()
            .values()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        messages
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn key(room_id: &str, message_id: &str) -> MessageKey {
        (room_id.to_string(), message_id.to_string())
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn find(&self, room_id: &str, message_id: &str) -> AppResult<Option<Message>> {
        Ok(self
            .messages
            .read()
            .get(&Self::key(room_id, message_id))
            .cloned())
    }

    async fn list_recent(&self, room_id: &str, limit: i64) -> AppResult<Vec<Message>> {
        let mut messages = self.room_messages(room_id);
        messages.reverse();
        messages.truncate(limit.max(0) as usize);
        Ok(messages)
    }

    async fn create(&self, message: &Message) -> AppResult<()> {
        {
            let mut messages = self.messages.write();
            let key = Self::key(&message.room_id, &message.id);
            if messages.contains_key(&key) {
                return Err(AppError::Conflict(format!(
                    "message {} already exists",
                    message.id
                )));
            }
            messages.insert(key, message.clone());
        }

        self.publish(StoreEvent::MessageCreated(message.clone()));
        Ok(())
    }

    async fn try_claim(
        &self,
        room_id: &str,
        message_id: &str,
        mode: ClaimMode,
    ) -> AppResult<ClaimOutcome> {
        let mut messages = self.messages.write();
        let message = messages
            .get_mut(&Self::key(room_id, message_id))
            .ok_or_else(|| AppError::NotFound(format!("message {}/{}", room_id, message_id)))?;

        if !mode.allows(message.processing_status) {
            return Ok(ClaimOutcome::Declined(message.processing_status));
        }

        start_processing(message, Utc::now());
        Ok(ClaimOutcome::Claimed(ProcessingLease {
            room_id: room_id.to_string(),
            message_id: message_id.to_string(),
            run: message.processing_run,
        }))
    }

    async fn apply(&self, lease: &ProcessingLease, update: MessageUpdate) -> AppResult<()> {
        let mut messages = self.messages.write();
        let message = messages
            .get_mut(&Self::key(&lease.room_id, &lease.message_id))
            .ok_or_else(|| AppError::NotFound(format!("message {}", lease.message_id)))?;

        if message.processing_run != lease.run
            || message.processing_status != Some(ProcessingStatus::Processing)
        {
            return Err(AppError::Conflict(format!(
                "run {} of message {} is no longer current",
                lease.run, lease.message_id
            )));
        }

        update.apply_to(message, Utc::now());
        Ok(())
    }
}

#[async_trait]
impl RoomRepository for MemoryStore {
    async fn find(&self, room_id: &str) -> AppResult<Option<Room>> {
        Ok(self.rooms.read().get(room_id).cloned())
    }

    async fn list_ids(&self) -> AppResult<Vec<String>> {
        Ok(self.room_ids())
    }

    async fn upsert(&self, room: &Room) -> AppResult<()> {
        let created = self
            .rooms
            .write()
            .insert(room.id.clone(), room.clone())
            .is_none();

        if created {
            self.publish(StoreEvent::RoomsChanged);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, user_id: &str) -> AppResult<Option<User>> {
        Ok(self.users.read().get(user_id).cloned())
    }

    async fn upsert(&self, user: &User) -> AppResult<()> {
        self.users.write().insert(user.id.clone(), user.clone());
        Ok(())
    }
}
