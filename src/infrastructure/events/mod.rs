pub mod memory;
pub mod postgres;

use crate::domain::message::Message;
use async_trait::async_trait;
use tokio::sync::mpsc;

pub use memory::MemoryEventSource;
pub use postgres::PgEventSource;

const EVENT_BUFFER: usize = 256;

/// Real-time view of the store used by the intake watcher.
///
/// Streams end when the receiver is dropped. Delivery is at-least-once: a
/// message may be seen more than once, for instance after a reconnect.
#[async_trait]
pub trait MessageEventSource: Send + Sync {
    /// Full list of room ids, emitted immediately and again after every change
    async fn watch_rooms(&self) -> Result<mpsc::Receiver<Vec<String>>, String>;

    /// Every existing message of the room, then each newly created one
    async fn watch_messages(&self, room_id: &str) -> Result<mpsc::Receiver<Message>, String>;
}
