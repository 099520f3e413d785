//! # Room Log
//!
//! The message store behind a terminal chat client: messages partitioned by
//! room, a bounded window of history per room, and an append-only journal
//! that is replayed on startup.
//!
//! ## Core Concepts
//!
//! - **Rooms**: Named partitions, created by their first message or explicitly
//! - **Retention**: Each room keeps its newest messages, evicting oldest first
//! - **Journal**: One JSON message per line, replayed to rebuild rooms
//! - **Warnings**: Journal failures are reported on a side channel, never to
//!   the sender
//!
//! ## Example
//!
//! ```ignore
//! use roomlog::{format_for_display, Message, Store, StoreConfig, UserDirectory};
//! use std::sync::Arc;
//!
//! let users = Arc::new(UserDirectory::load("users.json")?);
//! let store = Store::open(users, StoreConfig::with_journal("chatlog.jsonl"))?;
//!
//! let alice = store.authenticate_user("alice", "secret")?;
//! store.add_message(Message::new("main", &alice.username, "Hi"));
//! store.add_room("random")?;
//!
//! for msg in store.list_messages(Some("main")) {
//!     println!("{}", format_for_display(&msg, &alice.colored_name()));
//! }
//!
//! store.close()?;
//! ```

pub mod error;
pub mod journal;
pub mod rooms;
pub mod store;
pub mod transcript;
pub mod types;
pub mod users;
pub mod warnings;

// Re-exports
pub use error::{AuthError, Result, StoreError};
pub use journal::{Journal, ReplaySummary};
pub use rooms::RoomRegistry;
pub use store::{Store, StoreConfig};
pub use transcript::{format_for_display, TranscriptWindow};
pub use types::*;
pub use users::{assign_color, User, UserColor, UserDirectory};
pub use warnings::{StoreWarning, WarningHandle, WarningHub, WarningId};
