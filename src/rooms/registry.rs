//! Room registry implementation.

use crate::error::{Result, StoreError};
use crate::types::{Message, DEFAULT_MAX_MESSAGES};
use std::collections::{BTreeMap, VecDeque};

/// Messages partitioned by room, each room capped at `max_per_room`.
///
/// Not synchronized; the store wraps it in its lock.
#[derive(Debug)]
pub struct RoomRegistry {
    /// Room name to messages, oldest first. Ordered so listing is sorted.
    rooms: BTreeMap<String, VecDeque<Message>>,

    /// Retention cap per room (at least 1).
    max_per_room: usize,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

impl RoomRegistry {
    /// Create an empty registry. A cap of zero is raised to one so the newest
    /// message always survives.
    pub fn new(max_per_room: usize) -> Self {
        Self {
            rooms: BTreeMap::new(),
            max_per_room: max_per_room.max(1),
        }
    }

    /// Retention cap per room.
    pub fn max_per_room(&self) -> usize {
        self.max_per_room
    }

    /// Append a message to its room, evicting the oldest entries until the
    /// room is back under the cap. Returns how many were evicted.
    pub fn push(&mut self, msg: Message) -> usize {
        let room = msg.room_key().to_string();
        let queue = self.rooms.entry(room).or_default();
        queue.push_back(msg);

        let excess = queue.len().saturating_sub(self.max_per_room);
        queue.drain(..excess);
        excess
    }

    /// Register an empty room.
    ///
    /// Names are compared exactly (case-sensitive, no trimming). Only the empty
    /// string counts as blank.
    pub fn create(&mut self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(StoreError::InvalidRoomName);
        }
        if self.rooms.contains_key(name) {
            return Err(StoreError::RoomAlreadyExists(name.to_string()));
        }
        self.rooms.insert(name.to_string(), VecDeque::new());
        Ok(())
    }

    /// Whether a room is known.
    pub fn contains(&self, name: &str) -> bool {
        self.rooms.contains_key(name)
    }

    /// Copy of a room's messages, oldest first. Unknown rooms are empty.
    pub fn messages(&self, room: &str) -> Vec<Message> {
        self.rooms
            .get(room)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// All room names in lexicographic order.
    pub fn room_names(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Messages retained across all rooms.
    pub fn message_count(&self) -> usize {
        self.rooms.values().map(VecDeque::len).sum()
    }
}
