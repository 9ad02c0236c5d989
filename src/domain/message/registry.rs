use parking_lot::Mutex;
use std::collections::BTreeSet;

/// Rooms that currently have a message observer attached
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: Mutex<BTreeSet<String>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only for the caller that actually registered the room
    pub fn try_register(&self, room_id: &str) -> bool {
        self.rooms.lock().insert(room_id.to_string())
    }

    pub fn unregister(&self, room_id: &str) {
        self.rooms.lock().remove(room_id);
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.lock().contains(room_id)
    }

    pub fn rooms(&self) -> Vec<String> {
        self.rooms.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.rooms.lock().clear();
    }
}
