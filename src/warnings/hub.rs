//! Fan-out of store warnings to subscribers.

use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{StoreWarning, WarningHandle, WarningId};

/// Default per-subscriber buffer.
pub const DEFAULT_WARNING_BUFFER: usize = 64;

/// Broadcasts warnings without ever blocking the publisher.
///
/// A subscriber whose buffer is full, or whose handle was dropped, is removed.
pub struct WarningHub {
    subscribers: RwLock<HashMap<WarningId, Sender<StoreWarning>>>,
    next_id: AtomicU64,
    buffer_size: usize,
}

impl Default for WarningHub {
    fn default() -> Self {
        Self::new(DEFAULT_WARNING_BUFFER)
    }
}

impl WarningHub {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> WarningHandle {
        let id = WarningId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(self.buffer_size);
        self.subscribers.write().insert(id, sender);
        WarningHandle { id, receiver }
    }

    /// Remove a subscriber.
    pub fn unsubscribe(&self, id: WarningId) {
        self.subscribers.write().remove(&id);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Log a warning and deliver it to every subscriber.
    pub fn publish(&self, warning: StoreWarning) {
        match &warning {
            StoreWarning::JournalWrite { room, sender, error } => {
                tracing::warn!(%room, %sender, %error, "could not write to chat log");
            }
            StoreWarning::ReplayStopped {
                path,
                line,
                skipped_lines,
                skipped_bytes,
            } => {
                tracing::warn!(
                    path = %path.display(),
                    line,
                    skipped_lines,
                    skipped_bytes,
                    "chat log replay stopped early"
                );
            }
        }

        let mut dropped = Vec::new();
        {
            let subs = self.subscribers.read();
            for (id, sender) in subs.iter() {
                match sender.try_send(warning.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                        dropped.push(*id)
                    }
                }
            }
        }

        if !dropped.is_empty() {
            let mut subs = self.subscribers.write();
            for id in dropped {
                tracing::debug!(subscriber = id.0, "dropping warning subscriber");
                subs.remove(&id);
            }
        }
    }
}
