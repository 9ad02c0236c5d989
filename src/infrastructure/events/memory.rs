use super::{MessageEventSource, EVENT_BUFFER};
use crate::domain::message::Message;
use crate::infrastructure::repositories::{MemoryStore, StoreEvent};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

/// Change feed over the in-memory store's broadcast channel
pub struct MemoryEventSource {
    store: Arc<MemoryStore>,
}

impl MemoryEventSource {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MessageEventSource for MemoryEventSource {
    async fn watch_rooms(&self) -> Result<mpsc::Receiver<Vec<String>>, String> {
        // Subscribe before the snapshot so no change falls in between
        let mut events = self.store.subscribe();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let store = self.store.clone();

        tokio::spawn(async move {
            if tx.send(store.room_ids()).await.is_err() {
                return;
            }

            loop {
                match events.recv().await {
                    Ok(StoreEvent::RoomsChanged) | Err(RecvError::Lagged(_)) => {
                        if tx.send(store.room_ids()).await.is_err() {
                            return;
                        }
                    }
                    Ok(StoreEvent::MessageCreated(_)) => {}
                    Err(RecvError::Closed) => return,
                }
            }
        });

        Ok(rx)
    }

    async fn watch_messages(&self, room_id: &str) -> Result<mpsc::Receiver<Message>, String> {
        let mut events = self.store.subscribe();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let store = self.store.clone();
        let room_id = room_id.to_string();

        tokio::spawn(async move {
            for message in store.room_messages(&room_id) {
                if tx.send(message).await.is_err() {
                    return;
                }
            }

            loop {
                match events.recv().await {
                    Ok(StoreEvent::MessageCreated(message)) if message.room_id == room_id => {
                        if tx.send(message).await.is_err() {
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            room_id = %room_id,
                            skipped = skipped,
                            "Change feed lagged, replaying room snapshot"
                        );
                        for message in store.room_messages(&room_id) {
                            if tx.send(message).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        });

        Ok(rx)
    }
}
