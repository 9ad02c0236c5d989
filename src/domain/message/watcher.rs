use super::dispatcher::MessageDispatcher;
use super::model::{ClaimMode, Message};
use super::processor::MessageProcessor;
use super::registry::RoomRegistry;
use crate::infrastructure::events::MessageEventSource;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherStatus {
    pub running: bool,
    pub watched_rooms: usize,
    pub in_flight_jobs: usize,
}

struct RunningWatcher {
    cancel: CancellationToken,
    tasks: TaskTracker,
}

/// Observes every room and hands each newly created, eligible message to the
/// processor in the background.
pub struct MessageWatcher {
    events: Arc<dyn MessageEventSource>,
    processor: Arc<MessageProcessor>,
    dispatcher: Arc<MessageDispatcher>,
    registry: Arc<RoomRegistry>,
    running: Mutex<Option<RunningWatcher>>,
    feed_alive: AtomicBool,
}

impl MessageWatcher {
    pub fn new(
        events: Arc<dyn MessageEventSource>,
        processor: Arc<MessageProcessor>,
        dispatcher: Arc<MessageDispatcher>,
        registry: Arc<RoomRegistry>,
    ) -> Self {
        Self {
            events,
            processor,
            dispatcher,
            registry,
            running: Mutex::new(None),
            feed_alive: AtomicBool::new(false),
        }
    }

    /// Subscribe to the room list. Calling it again while running is a no-op.
    pub async fn start(self: &Arc<Self>) -> Result<(), String> {
        if self.running.lock().is_some() {
            return Ok(());
        }

        let rooms = self.events.watch_rooms().await?;
        let cancel = CancellationToken::new();
        let tasks = TaskTracker::new();

        {
            let mut running = self.running.lock();
            if running.is_some() {
                return Ok(());
            }
            *running = Some(RunningWatcher {
                cancel: cancel.clone(),
                tasks: tasks.clone(),
            });
        }

        self.feed_alive.store(true, Ordering::SeqCst);
        tasks.spawn(self.clone().watch_rooms(rooms, cancel, tasks.clone()));

        tracing::info!("Message watcher started");
        Ok(())
    }

    /// Detach every observer and forget the watched rooms.
    /// Jobs already dispatched keep running; drain the dispatcher to await them.
    pub async fn stop(&self) {
        let running = self.running.lock().take();

        if let Some(running) = running {
            running.cancel.cancel();
            running.tasks.close();
            running.tasks.wait().await;
        }

        self.feed_alive.store(false, Ordering::SeqCst);
        self.registry.clear();
        tracing::info!("Message watcher stopped");
    }

    pub fn status(&self) -> WatcherStatus {
        WatcherStatus {
            running: self.running.lock().is_some() && self.feed_alive.load(Ordering::SeqCst),
            watched_rooms: self.registry.len(),
            in_flight_jobs: self.dispatcher.in_flight(),
        }
    }

    /// React to one message-creation event
    pub fn handle_message(&self, message: Message) {
        if !message.is_eligible_for_processing() {
            tracing::debug!(
                room_id = %message.room_id,
                message_id = %message.id,
                status = ?message.processing_status,
                has_text = message.original_text.is_some(),
                has_sender = message.sender_id.is_some(),
                "Skipping ineligible message"
            );
            return;
        }

        tracing::info!(
            room_id = %message.room_id,
            message_id = %message.id,
            "New message detected"
        );

        let processor = self.processor.clone();
        let room_id = message.room_id;
        let message_id = message.id;

        self.dispatcher.dispatch(message_id.clone(), async move {
            processor
                .process(&room_id, &message_id, ClaimMode::Automatic)
                .await
        });
    }

    async fn watch_rooms(
        self: Arc<Self>,
        mut rooms: mpsc::Receiver<Vec<String>>,
        cancel: CancellationToken,
        tasks: TaskTracker,
    ) {
        loop {
            let snapshot = tokio::select! {
                _ = cancel.cancelled() => return,
                snapshot = rooms.recv() => snapshot,
            };

            match snapshot {
                Some(room_ids) => {
                    for room_id in room_ids {
                        self.attach(room_id, &cancel, &tasks);
                    }
                }
                None => {
                    tracing::error!("Room feed closed, no new rooms will be observed");
                    self.feed_alive.store(false, Ordering::SeqCst);
                    return;
                }
            }
        }
    }

    fn attach(self: &Arc<Self>, room_id: String, cancel: &CancellationToken, tasks: &TaskTracker) {
        if !self.registry.try_register(&room_id) {
            return;
        }

        tracing::debug!(room_id = %room_id, "Attaching message observer");
        tasks.spawn(self.clone().watch_room(room_id, cancel.clone()));
    }

    async fn watch_room(self: Arc<Self>, room_id: String, cancel: CancellationToken) {
        let mut messages = match self.events.watch_messages(&room_id).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!(room_id = %room_id, error = %e, "Failed to observe room");
                // Let the next room snapshot retry
                self.registry.unregister(&room_id);
                return;
            }
        };

        loop {
            let message = tokio::select! {
                _ = cancel.cancelled() => return,
                message = messages.recv() => message,
            };

            match message {
                Some(message) => self.handle_message(message),
                None => {
                    tracing::warn!(room_id = %room_id, "Message feed closed");
                    self.registry.unregister(&room_id);
                    return;
                }
            }
        }
    }
}
