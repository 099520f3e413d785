//! Warning types.

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Unique identifier for a warning subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WarningId(pub u64);

/// A non-fatal condition reported by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreWarning {
    /// A message was kept in memory but could not be written to the journal.
    JournalWrite {
        room: String,
        sender: String,
        error: String,
    },

    /// Startup replay stopped before the end of the journal. Everything from
    /// `line` on was left unapplied.
    ReplayStopped {
        path: PathBuf,
        line: usize,
        skipped_lines: usize,
        skipped_bytes: u64,
    },
}

impl fmt::Display for StoreWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreWarning::JournalWrite { room, error, .. } => {
                write!(f, "could not write to chat log (room {room}): {error}")
            }
            StoreWarning::ReplayStopped {
                path,
                line,
                skipped_lines,
                skipped_bytes,
            } => write!(
                f,
                "chat log {} replay stopped at line {line} ({skipped_lines} lines, {skipped_bytes} bytes skipped)",
                path.display()
            ),
        }
    }
}

/// Receiving end of a warning subscription.
pub struct WarningHandle {
    pub(crate) id: WarningId,
    pub(crate) receiver: Receiver<StoreWarning>,
}

impl WarningHandle {
    /// Subscription ID.
    pub fn id(&self) -> WarningId {
        self.id
    }

    /// Block until a warning arrives or the hub goes away.
    pub fn recv(&self) -> Option<StoreWarning> {
        self.receiver.recv().ok()
    }

    /// Take a pending warning without blocking.
    pub fn try_recv(&self) -> Result<StoreWarning, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Wait up to `timeout` for a warning.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<StoreWarning, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<StoreWarning> {
        self.receiver.try_iter().collect()
    }
}
