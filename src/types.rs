//! Core types for the message store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Room that receives messages with a blank room name.
pub const DEFAULT_ROOM: &str = "main";

/// Default per-room retention cap.
pub const DEFAULT_MAX_MESSAGES: usize = 10_000;

/// Resolve a routing key: blank means [`DEFAULT_ROOM`].
pub fn resolve_room(room: &str) -> &str {
    if room.is_empty() {
        DEFAULT_ROOM
    } else {
        room
    }
}

/// A single chat message. Never mutated once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Target room; empty means the default room.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub room: String,

    /// Who sent it.
    pub sender: String,

    /// Wall-clock instant, used for ordering and display.
    pub timestamp: DateTime<Utc>,

    /// Message body. No length limit at this layer.
    pub text: String,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(room: impl Into<String>, sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::at(room, sender, text, Utc::now())
    }

    /// Create a message with an explicit timestamp.
    pub fn at(
        room: impl Into<String>,
        sender: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            room: room.into(),
            sender: sender.into(),
            timestamp,
            text: text.into(),
        }
    }

    /// The room this message is filed under.
    pub fn room_key(&self) -> &str {
        resolve_room(&self.room)
    }
}

/// Store statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of known rooms, including empty ones.
    pub rooms: usize,
    /// Messages currently retained across all rooms.
    pub messages: usize,
    /// Records appended to the journal by this store instance.
    pub journal_records: u64,
    /// Messages dropped by retention since the store was opened.
    pub evicted: u64,
}
