//! Main Store struct tying all components together.

use crate::error::{AuthError, Result};
use crate::journal::{Journal, ReplaySummary};
use crate::rooms::RoomRegistry;
use crate::types::{resolve_room, Message, StoreStats, DEFAULT_MAX_MESSAGES};
use crate::users::{User, UserDirectory};
use crate::warnings::{StoreWarning, WarningHandle, WarningHub};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Journal file. `None` keeps everything in memory only.
    pub journal_path: Option<PathBuf>,

    /// Retention cap per room.
    pub max_messages_per_room: usize,

    /// fsync the journal after every append (flush always happens).
    pub sync_on_append: bool,

    /// Buffered warnings per subscriber before it is dropped.
    pub warning_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            journal_path: None,
            max_messages_per_room: DEFAULT_MAX_MESSAGES,
            sync_on_append: false,
            warning_buffer: crate::warnings::DEFAULT_WARNING_BUFFER,
        }
    }
}

impl StoreConfig {
    /// Default configuration journaling to `path`.
    pub fn with_journal(path: impl Into<PathBuf>) -> Self {
        Self {
            journal_path: Some(path.into()),
            ..Default::default()
        }
    }
}

/// State guarded by the store lock.
struct Inner {
    rooms: RoomRegistry,
    journal: Option<Journal>,
    /// Set by `close`; the journal is never written after this.
    closed: bool,
    evicted: u64,
}

/// The chat message store.
///
/// Messages are partitioned by room and each room keeps a sliding window of
/// its newest messages. Every operation takes the same lock, so callers on
/// different threads always observe some serial order of appends.
///
/// Journal writes are best-effort. A failed write never fails
/// [`add_message`](Store::add_message) and never rolls back the in-memory
/// append; it is logged and published to warning subscribers instead.
pub struct Store {
    /// Store configuration.
    config: StoreConfig,

    /// Credentials, owned by the caller and only read here.
    users: Arc<UserDirectory>,

    /// Rooms and journal.
    inner: Mutex<Inner>,

    /// Outcome of startup replay, if a journal was configured.
    replay: Option<ReplaySummary>,

    /// Non-fatal condition reporting.
    warnings: WarningHub,
}

impl Store {
    /// Open a store, replaying the configured journal if it exists.
    ///
    /// Fails if a journal path is configured but cannot be opened for append
    /// or is held by another store. A missing journal file is created; a
    /// damaged tail is replayed up to the last good record.
    pub fn open(users: Arc<UserDirectory>, config: StoreConfig) -> Result<Self> {
        let mut rooms = RoomRegistry::new(config.max_messages_per_room);
        let warnings = WarningHub::new(config.warning_buffer);

        let (journal, replay) = match &config.journal_path {
            Some(path) => {
                let journal = Journal::open(path, config.sync_on_append)?;
                let summary = Journal::replay(path, |msg| {
                    rooms.push(msg);
                })?;

                tracing::info!(
                    path = %path.display(),
                    records = summary.records,
                    rooms = rooms.len(),
                    "replayed chat log"
                );
                if let Some(line) = summary.stopped_at_line {
                    warnings.publish(StoreWarning::ReplayStopped {
                        path: path.clone(),
                        line,
                        skipped_lines: summary.skipped_lines,
                        skipped_bytes: summary.skipped_bytes,
                    });
                }

                (Some(journal), Some(summary))
            }
            None => (None, None),
        };

        Ok(Self {
            config,
            users,
            inner: Mutex::new(Inner {
                rooms,
                journal,
                closed: false,
                evicted: 0,
            }),
            replay,
            warnings,
        })
    }

    /// A store with no journal.
    pub fn in_memory(users: Arc<UserDirectory>) -> Self {
        Self::with_parts(users, StoreConfig::default(), None)
    }

    /// Assemble a store around an already-open journal.
    pub(crate) fn with_parts(
        users: Arc<UserDirectory>,
        config: StoreConfig,
        journal: Option<Journal>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                rooms: RoomRegistry::new(config.max_messages_per_room),
                journal,
                closed: false,
                evicted: 0,
            }),
            warnings: WarningHub::new(config.warning_buffer),
            config,
            users,
            replay: None,
        }
    }

    // --- Message Operations ---

    /// Append a message to its room.
    ///
    /// Blank room names go to `"main"`. If the room grows past the cap the
    /// oldest messages are evicted; the new one is always kept. The message
    /// is then journaled if a journal is open.
    pub fn add_message(&self, msg: Message) {
        let warning = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;

            let evicted = inner.rooms.push(msg.clone());
            inner.evicted += evicted as u64;

            match inner.journal.as_mut() {
                Some(_) if inner.closed => {
                    tracing::debug!(room = msg.room_key(), "chat log closed, message kept in memory only");
                    None
                }
                Some(journal) => journal.append(&msg).err().map(|e| StoreWarning::JournalWrite {
                    room: msg.room_key().to_string(),
                    sender: msg.sender.clone(),
                    error: e.to_string(),
                }),
                None => None,
            }
        };

        if let Some(warning) = warning {
            self.warnings.publish(warning);
        }
    }

    /// Snapshot of a room's messages, oldest first. `None` or blank means
    /// `"main"`. Unknown rooms yield an empty list.
    pub fn list_messages(&self, room: Option<&str>) -> Vec<Message> {
        let room = resolve_room(room.unwrap_or_default());
        self.inner.lock().rooms.messages(room)
    }

    /// All known room names, sorted.
    pub fn list_rooms(&self) -> Vec<String> {
        self.inner.lock().rooms.room_names()
    }

    /// Create an empty room.
    ///
    /// Fails with `InvalidRoomName` for `""` and `RoomAlreadyExists` if the
    /// exact name is known. Creation is not journaled; an empty room only
    /// survives a restart once it has a message.
    pub fn add_room(&self, name: &str) -> Result<()> {
        self.inner.lock().rooms.create(name)?;
        tracing::debug!(room = name, "created room");
        Ok(())
    }

    // --- Users ---

    /// Check login credentials against the user directory.
    pub fn authenticate_user(
        &self,
        username: &str,
        password: &str,
    ) -> std::result::Result<User, AuthError> {
        self.users.authenticate(username, password)
    }

    /// The user directory this store was built with.
    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    // --- Lifecycle ---

    /// Flush and close the journal. Calling it again does nothing.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(());
        }
        inner.closed = true;

        if let Some(journal) = inner.journal.as_mut() {
            tracing::debug!(path = %journal.path().display(), "closing chat log");
            journal.close()?;
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    // --- Observability ---

    /// Receive journal write failures and replay truncation notices.
    pub fn subscribe_warnings(&self) -> WarningHandle {
        self.warnings.subscribe()
    }

    /// Startup replay outcome. `None` without a journal.
    pub fn replay_summary(&self) -> Option<&ReplaySummary> {
        self.replay.as_ref()
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        StoreStats {
            rooms: inner.rooms.len(),
            messages: inner.rooms.message_count(),
            journal_records: inner
                .journal
                .as_ref()
                .map(Journal::records_written)
                .unwrap_or(0),
            evicted: inner.evicted,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        // Best-effort close on drop
        let _ = self.close();
    }
}
