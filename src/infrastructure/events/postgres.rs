use super::{MessageEventSource, EVENT_BUFFER};
use crate::domain::message::Message;
use crate::infrastructure::db::DbPool;
use crate::infrastructure::repositories::{MessageRepository, RoomRepository};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use sqlx::postgres::PgListener;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;

const ROOMS_CHANNEL: &str = "rooms_changed";
const MESSAGES_CHANNEL: &str = "message_events";

/// Messages replayed when a room is first watched or after a reconnect
const SNAPSHOT_LIMIT: i64 = 500;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Payload of `message_events`, see the `notify_message_created` trigger
#[derive(Debug, Deserialize)]
struct MessageNotification {
    room_id: String,
    message_id: String,
}

/// Per-room senders fed by the shared `message_events` listener
#[derive(Default)]
struct RoomRoutes {
    senders: Mutex<HashMap<String, mpsc::Sender<Message>>>,
}

impl RoomRoutes {
    /// Replaces any previous subscriber of the room
    fn insert(&self, room_id: &str, tx: mpsc::Sender<Message>) {
        self.senders.lock().insert(room_id.to_string(), tx);
    }

    /// Sender of a watched room; rooms whose receiver is gone are dropped
    fn sender(&self, room_id: &str) -> Option<mpsc::Sender<Message>> {
        let mut senders = self.senders.lock();
        match senders.get(room_id) {
            Some(tx) if tx.is_closed() => {
                senders.remove(room_id);
                None
            }
            Some(tx) => Some(tx.clone()),
            None => None,
        }
    }

    fn live(&self) -> Vec<(String, mpsc::Sender<Message>)> {
        let mut senders = self.senders.lock();
        senders.retain(|_, tx| !tx.is_closed());
        senders
            .iter()
            .map(|(room_id, tx)| (room_id.clone(), tx.clone()))
            .collect()
    }
}

/// Change feed over Postgres `LISTEN`/`NOTIFY`.
///
/// Uses two connections whatever the number of rooms: one listening on
/// `rooms_changed` and one on `message_events`, the latter routing each
/// notification to the room it belongs to.
pub struct PgEventSource {
    pool: Arc<DbPool>,
    room_repo: Arc<dyn RoomRepository>,
    message_repo: Arc<dyn MessageRepository>,
    routes: Arc<RoomRoutes>,
    router_started: tokio::sync::Mutex<bool>,
}

impl PgEventSource {
    pub fn new(
        pool: Arc<DbPool>,
        room_repo: Arc<dyn RoomRepository>,
        message_repo: Arc<dyn MessageRepository>,
    ) -> Self {
        Self {
            pool,
            room_repo,
            message_repo,
            routes: Arc::new(RoomRoutes::default()),
            router_started: tokio::sync::Mutex::new(false),
        }
    }

    async fn listen(&self, channel: &str) -> Result<PgListener, String> {
        let mut listener = PgListener::connect_with(self.pool.as_ref())
            .await
            .map_err(|e| format!("Failed to open listener connection: {}", e))?;
        listener
            .listen(channel)
            .await
            .map_err(|e| format!("Failed to LISTEN on {}: {}", channel, e))?;
        Ok(listener)
    }

    /// Start the shared message listener unless it is already running
    async fn ensure_router(&self) -> Result<(), String> {
        let mut started = self.router_started.lock().await;
        if *started {
            return Ok(());
        }

        let listener = self.listen(MESSAGES_CHANNEL).await?;
        tokio::spawn(route_notifications(
            listener,
            Arc::downgrade(&self.routes),
            self.message_repo.clone(),
        ));
        *started = true;
        Ok(())
    }
}

/// Runs until the owning event source is dropped
async fn route_notifications(
    mut listener: PgListener,
    routes: Weak<RoomRoutes>,
    message_repo: Arc<dyn MessageRepository>,
) {
    loop {
        let notification = listener.try_recv().await;
        let Some(live_routes) = routes.upgrade() else {
            return;
        };

        match notification {
            Ok(Some(notification)) => {
                let payload = notification.payload();
                let event: MessageNotification = match serde_json::from_str(payload) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(payload = %payload, error = %e, "Ignoring malformed notification");
                        continue;
                    }
                };

                if let Some(tx) = live_routes.sender(&event.room_id) {
                    tokio::spawn(deliver_message(message_repo.clone(), event, tx));
                }
            }
            Ok(None) => {
                // Connection dropped; the listener reconnects on the next call
                let watched = live_routes.live();
                tracing::warn!(
                    channel = MESSAGES_CHANNEL,
                    rooms = watched.len(),
                    "Listener reconnecting, replaying room snapshots"
                );
                for (room_id, tx) in watched {
                    let message_repo = message_repo.clone();
                    tokio::spawn(async move {
                        let _ = send_message_snapshot(&message_repo, &room_id, &tx).await;
                    });
                }
            }
            Err(e) => {
                tracing::error!(channel = MESSAGES_CHANNEL, error = %e, "Listener error");
                drop(live_routes);
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

async fn deliver_message(
    message_repo: Arc<dyn MessageRepository>,
    event: MessageNotification,
    tx: mpsc::Sender<Message>,
) {
    match message_repo.find(&event.room_id, &event.message_id).await {
        Ok(Some(message)) => {
            let _ = tx.send(message).await;
        }
        Ok(None) => {}
        Err(e) => tracing::error!(
            room_id = %event.room_id,
            message_id = %event.message_id,
            error = %e,
            "Failed to load notified message"
        ),
    }
}

async fn send_room_snapshot(
    room_repo: &Arc<dyn RoomRepository>,
    tx: &mpsc::Sender<Vec<String>>,
) -> Result<(), ()> {
    match room_repo.list_ids().await {
        Ok(ids) => tx.send(ids).await.map_err(|_| ()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list rooms");
            Ok(())
        }
    }
}

async fn send_message_snapshot(
    message_repo: &Arc<dyn MessageRepository>,
    room_id: &str,
    tx: &mpsc::Sender<Message>,
) -> Result<(), ()> {
    match message_repo.list_recent(room_id, SNAPSHOT_LIMIT).await {
        Ok(messages) => {
            for message in messages.into_iter().rev() {
                tx.send(message).await.map_err(|_| ())?;
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(room_id = room_id, error = %e, "Failed to list room messages");
            Ok(())
        }
    }
}

#[async_trait]
impl MessageEventSource for PgEventSource {
    async fn watch_rooms(&self) -> Result<mpsc::Receiver<Vec<String>>, String> {
        let mut listener = self.listen(ROOMS_CHANNEL).await?;
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let room_repo = self.room_repo.clone();

        tokio::spawn(async move {
            if send_room_snapshot(&room_repo, &tx).await.is_err() {
                return;
            }

            loop {
                let notification = tokio::select! {
                    _ = tx.closed() => return,
                    notification = listener.try_recv() => notification,
                };

                match notification {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        // Connection dropped; the listener reconnects on the next call
                        tracing::warn!(channel = ROOMS_CHANNEL, "Listener reconnecting");
                    }
                    Err(e) => {
                        tracing::error!(channel = ROOMS_CHANNEL, error = %e, "Listener error");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }

                if send_room_snapshot(&room_repo, &tx).await.is_err() {
                    return;
                }
            }
        });

        Ok(rx)
    }

    async fn watch_messages(&self, room_id: &str) -> Result<mpsc::Receiver<Message>, String> {
        self.ensure_router().await?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.routes.insert(room_id, tx.clone());

        let message_repo = self.message_repo.clone();
        let room_id = room_id.to_string();
        tokio::spawn(async move {
            let _ = send_message_snapshot(&message_repo, &room_id, &tx).await;
        });

        Ok(rx)
    }
}
