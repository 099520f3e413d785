//! Side channel for non-fatal store conditions.
//!
//! Journal writes are best-effort: a failed append still lands in memory and
//! the caller of `add_message` never sees an error. The failure is logged
//! through `tracing` and fanned out to any warning subscribers.
//!
//! # Example
//!
//! ```ignore
//! let warnings = store.subscribe_warnings();
//! store.add_message(Message::new("main", "alice", "hi"));
//! while let Ok(warning) = warnings.try_recv() {
//!     eprintln!("{warning}");
//! }
//! ```

mod hub;
mod types;

pub use hub::{WarningHub, DEFAULT_WARNING_BUFFER};
pub use types::{StoreWarning, WarningHandle, WarningId};
