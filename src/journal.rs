//! Append-only message journal.
//!
//! One JSON-encoded [`Message`] per line. Records are only ever appended;
//! nothing rewrites or truncates a complete record. On startup the journal is
//! replayed to rebuild the in-memory rooms. Replay stops quietly at the first
//! record that does not decode, which is how a record torn by a crash
//! mid-write shows up.

use crate::error::{Result, StoreError};
use crate::types::Message;
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Outcome of replaying a journal file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Records decoded and applied.
    pub records: usize,
    /// 1-based line at which replay gave up, if it did not reach the end.
    pub stopped_at_line: Option<usize>,
    /// Lines not applied, counting the one replay stopped at.
    pub skipped_lines: usize,
    /// Bytes not applied, counting the line replay stopped at.
    pub skipped_bytes: u64,
}

impl ReplaySummary {
    /// Whether replay ended before the end of the file.
    pub fn truncated(&self) -> bool {
        self.stopped_at_line.is_some()
    }
}

/// Open write side of the journal.
struct Sink {
    writer: Box<dyn Write + Send>,
    /// Backing file, kept for fsync and for discarding a torn append.
    file: Option<File>,
    /// File length a torn append can be cut back to. `None` if unknown.
    len: Option<u64>,
}

/// Journal writer.
pub struct Journal {
    /// Path to the journal file.
    path: PathBuf,
    /// `None` once closed.
    sink: Option<Sink>,
    /// Held advisory lock on the sidecar lock file.
    lock: Option<File>,
    /// fsync after every record.
    sync_on_append: bool,
    /// A failed append may have left a fragment without its newline.
    needs_newline: bool,
    /// Records appended by this handle.
    records_written: u64,
}

impl Journal {
    /// Open a journal for append, creating it if missing.
    ///
    /// Takes an exclusive advisory lock on `<path>.lock` so only one store
    /// writes to the journal. The journal itself stays unlocked so replay can
    /// read it through its own handle. If the file ends in a torn record, a
    /// newline is appended first so new records start on their own line.
    pub fn open(path: impl AsRef<Path>, sync_on_append: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| StoreError::journal_open(&path, e))?;
        let lock = Self::acquire_lock(&path)?;

        Self::terminate_tail(&mut file).map_err(|e| StoreError::journal_open(&path, e))?;

        let len = file
            .metadata()
            .map_err(|e| StoreError::journal_open(&path, e))?
            .len();
        let writer = file
            .try_clone()
            .map_err(|e| StoreError::journal_open(&path, e))?;

        Ok(Self {
            path,
            sink: Some(Sink {
                writer: Box::new(writer),
                file: Some(file),
                len: Some(len),
            }),
            lock: Some(lock),
            sync_on_append,
            needs_newline: false,
            records_written: 0,
        })
    }

    /// Build a journal over an arbitrary writer (no file, no lock).
    pub(crate) fn from_writer(path: impl Into<PathBuf>, writer: Box<dyn Write + Send>) -> Self {
        Self {
            path: path.into(),
            sink: Some(Sink {
                writer,
                file: None,
                len: None,
            }),
            lock: None,
            sync_on_append: false,
            needs_newline: false,
            records_written: 0,
        }
    }

    /// Sidecar file locked while a journal is open.
    pub fn lock_path(path: impl AsRef<Path>) -> PathBuf {
        let mut name = OsString::from(path.as_ref().as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this handle.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    /// Append one record and flush it.
    ///
    /// If the write fails partway, a file-backed journal is cut back to the
    /// end of the last complete record. When that is not possible the next
    /// record starts with a newline so it never joins the fragment.
    pub fn append(&mut self, msg: &Message) -> Result<()> {
        let sink = self.sink.as_mut().ok_or_else(|| {
            StoreError::Io(io::Error::new(io::ErrorKind::Other, "journal is closed"))
        })?;

        // Encode the whole line up front so a failed encode writes nothing.
        let mut line = Vec::new();
        if self.needs_newline {
            line.push(b'\n');
        }
        serde_json::to_writer(&mut line, msg)?;
        line.push(b'\n');

        let written = sink
            .writer
            .write_all(&line)
            .and_then(|()| sink.writer.flush());
        if let Err(e) = written {
            let discarded = match (&sink.file, sink.len) {
                (Some(file), Some(len)) => file.set_len(len).is_ok(),
                _ => false,
            };
            if !discarded {
                // The fragment stays, so its end becomes the cut-back point.
                sink.len = sink
                    .file
                    .as_ref()
                    .and_then(|file| file.metadata().ok())
                    .map(|meta| meta.len());
                self.needs_newline = true;
            }
            return Err(e.into());
        }
        self.needs_newline = false;
        if let Some(len) = sink.len.as_mut() {
            *len += line.len() as u64;
        }

        if self.sync_on_append {
            if let Some(file) = &sink.file {
                file.sync_data()?;
            }
        }

        self.records_written += 1;
        Ok(())
    }

    /// Flush, sync, unlock and release the file. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut sink) = self.sink.take() else {
            return Ok(());
        };

        let flushed = sink.writer.flush();
        let synced = match sink.file.take() {
            Some(file) => file.sync_all(),
            None => Ok(()),
        };
        if let Some(lock) = self.lock.take() {
            let _ = FileExt::unlock(&lock);
        }
        flushed?;
        synced?;
        Ok(())
    }

    /// Replay a journal file, handing each decoded message to `apply` in file
    /// order.
    ///
    /// A missing file is an empty journal. Blank lines are skipped. The first
    /// undecodable or unreadable line ends replay without an error; what was
    /// left unread is counted in the summary.
    pub fn replay(path: impl AsRef<Path>, mut apply: impl FnMut(Message)) -> Result<ReplaySummary> {
        let path = path.as_ref();

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ReplaySummary::default()),
            Err(e) => return Err(StoreError::journal_open(path, e)),
        };

        let mut reader = BufReader::new(file);
        let mut summary = ReplaySummary::default();
        let mut buf = Vec::new();
        let mut line_number = 0;

        loop {
            buf.clear();
            line_number += 1;
            let decoded = match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => match std::str::from_utf8(&buf) {
                    Ok(line) if line.trim().is_empty() => continue,
                    Ok(line) => serde_json::from_str::<Message>(line).ok(),
                    Err(_) => None,
                },
                Err(_) => None,
            };

            match decoded {
                Some(msg) => {
                    apply(msg);
                    summary.records += 1;
                }
                None => {
                    let (lines, bytes) = Self::measure_rest(&mut reader);
                    summary.stopped_at_line = Some(line_number);
                    summary.skipped_lines = 1 + lines;
                    summary.skipped_bytes = buf.len() as u64 + bytes;
                    break;
                }
            }
        }

        Ok(summary)
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_path = Self::lock_path(path);
        let lock_file =
            File::create(&lock_path).map_err(|e| StoreError::journal_open(&lock_path, e))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked {
                path: path.to_path_buf(),
            })?;

        Ok(lock_file)
    }

    /// Lines and bytes from the reader's position to the end, as far as it
    /// can be read.
    fn measure_rest(reader: &mut impl BufRead) -> (usize, u64) {
        let mut lines = 0;
        let mut bytes = 0u64;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    lines += 1;
                    bytes += n as u64;
                }
            }
        }
        (lines, bytes)
    }

    /// Append a newline if the file is non-empty and does not end with one.
    fn terminate_tail(file: &mut File) -> io::Result<()> {
        if file.metadata()?.len() == 0 {
            return Ok(());
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        if last[0] != b'\n' {
            // Append mode: writes always land at the end.
            file.write_all(b"\n")?;
            file.flush()?;
        }
        Ok(())
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        // Best-effort flush on drop
        let _ = self.close();
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .field("records_written", &self.records_written)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Once `tear` is set, writes half of the next buffer and then fails.
    struct Tearing<W> {
        inner: W,
        tear: Arc<AtomicBool>,
    }

    impl<W: Write> Write for Tearing<W> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.tear.swap(false, Ordering::SeqCst) {
                self.inner.write_all(&buf[..buf.len() / 2])?;
                return Err(io::Error::new(io::ErrorKind::Other, "device went away"));
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    #[derive(Clone, Default)]
    struct Shared(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn texts(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.text.as_str()).collect()
    }

    fn replay_all(path: &Path) -> (Vec<Message>, ReplaySummary) {
        let mut messages = Vec::new();
        let summary = Journal::replay(path, |msg| messages.push(msg)).unwrap();
        (messages, summary)
    }

    #[test]
    fn test_journal_basic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.jsonl");

        let mut journal = Journal::open(&path, false).unwrap();
        journal.append(&Message::new("main", "alice", "hello")).unwrap();
        journal.append(&Message::new("other", "bob", "yo")).unwrap();
        assert_eq!(journal.records_written(), 2);
        journal.close().unwrap();

        let (messages, summary) = replay_all(&path);
        assert_eq!(summary.records, 2);
        assert!(!summary.truncated());
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[1].room, "other");
    }

    #[test]
    fn test_one_record_per_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.jsonl");

        let mut journal = Journal::open(&path, true).unwrap();
        journal.append(&Message::new("", "alice", "multi\nline")).unwrap();
        journal.append(&Message::new("", "bob", "two")).unwrap();
        journal.close().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.ends_with('\n'));
        for line in contents.lines() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value.get("room").is_none());
            assert!(value["timestamp"].is_string());
        }
    }

    #[test]
    fn test_replay_missing_file() {
        let dir = TempDir::new().unwrap();
        let (messages, summary) = replay_all(&dir.path().join("absent.jsonl"));
        assert!(messages.is_empty());
        assert_eq!(summary, ReplaySummary::default());
    }

    #[test]
    fn test_replay_stops_at_torn_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.jsonl");

        let mut journal = Journal::open(&path, false).unwrap();
        journal.append(&Message::new("main", "alice", "one")).unwrap();
        journal.append(&Message::new("main", "alice", "two")).unwrap();
        journal.close().unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"room":"main","sender":"al"#).unwrap();
        drop(file);

        let (messages, summary) = replay_all(&path);
        assert_eq!(messages.len(), 2);
        assert_eq!(summary.stopped_at_line, Some(3));
    }

    #[test]
    fn test_replay_stops_at_first_bad_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.jsonl");
        let good = serde_json::to_string(&Message::new("main", "alice", "ok")).unwrap();
        fs::write(&path, format!("{good}\nnot json\n{good}\n")).unwrap();

        let (messages, summary) = replay_all(&path);
        assert_eq!(messages.len(), 1);
        assert_eq!(summary.stopped_at_line, Some(2));
    }

    #[test]
    fn test_replay_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.jsonl");
        let good = serde_json::to_string(&Message::new("main", "alice", "ok")).unwrap();
        fs::write(&path, format!("\n{good}\n   \n{good}\n")).unwrap();

        let (messages, summary) = replay_all(&path);
        assert_eq!(messages.len(), 2);
        assert!(!summary.truncated());
    }

    #[test]
    fn test_open_terminates_torn_tail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.jsonl");
        fs::write(&path, "{\"sender\":").unwrap();

        let mut journal = Journal::open(&path, false).unwrap();
        journal.append(&Message::new("main", "alice", "after")).unwrap();
        journal.close().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines[0], "{\"sender\":");
        let after: Message = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(after.text, "after");
    }

    #[test]
    fn test_second_open_is_locked() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.jsonl");

        let mut first = Journal::open(&path, false).unwrap();
        assert!(matches!(
            Journal::open(&path, false),
            Err(StoreError::Locked { .. })
        ));

        first.close().unwrap();
        Journal::open(&path, false).unwrap();
    }

    #[test]
    fn test_open_invalid_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("chat.jsonl");

        let err = Journal::open(&path, false).unwrap_err();
        assert!(matches!(err, StoreError::JournalOpen { .. }));
        assert!(err.is_fatal_init());
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut journal = Journal::open(dir.path().join("chat.jsonl"), false).unwrap();

        journal.close().unwrap();
        journal.close().unwrap();
        assert!(journal.is_closed());
        assert!(journal.append(&Message::new("", "a", "b")).is_err());
    }

    #[test]
    fn test_failed_write_leaves_count() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut journal = Journal::from_writer("broken.jsonl", Box::new(Broken));
        assert!(journal.append(&Message::new("", "a", "b")).is_err());
        assert_eq!(journal.records_written(), 0);
    }

    #[test]
    fn test_torn_append_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.jsonl");
        let tear = Arc::new(AtomicBool::new(false));

        let mut journal = Journal::open(&path, false).unwrap();
        let file = OpenOptions::new().append(true).open(&path).unwrap();
        journal.sink.as_mut().unwrap().writer = Box::new(Tearing {
            inner: file,
            tear: Arc::clone(&tear),
        });

        journal.append(&Message::new("main", "alice", "before")).unwrap();
        tear.store(true, Ordering::SeqCst);
        assert!(journal.append(&Message::new("main", "alice", "torn")).is_err());
        journal.append(&Message::new("main", "alice", "recovered")).unwrap();
        journal.append(&Message::new("main", "alice", "later")).unwrap();
        assert_eq!(journal.records_written(), 3);
        journal.close().unwrap();

        let (messages, summary) = replay_all(&path);
        assert_eq!(texts(&messages), vec!["before", "recovered", "later"]);
        assert!(!summary.truncated());
    }

    #[test]
    fn test_torn_append_never_joins_next_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.jsonl");
        let tear = Arc::new(AtomicBool::new(false));
        let buffer = Shared::default();

        let mut journal = Journal::from_writer(
            &path,
            Box::new(Tearing {
                inner: buffer.clone(),
                tear: Arc::clone(&tear),
            }),
        );
        journal.append(&Message::new("main", "alice", "before")).unwrap();
        tear.store(true, Ordering::SeqCst);
        assert!(journal.append(&Message::new("main", "alice", "torn")).is_err());
        journal.append(&Message::new("main", "alice", "recovered")).unwrap();

        // Without a file to cut back, the fragment keeps its own line
        let contents = String::from_utf8(buffer.0.lock().clone()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(serde_json::from_str::<Message>(lines[1]).is_err());
        let recovered: Message = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(recovered.text, "recovered");
    }

    #[test]
    fn test_lock_is_held_on_sidecar() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.jsonl");

        let mut journal = Journal::open(&path, false).unwrap();
        journal.append(&Message::new("main", "alice", "hello")).unwrap();

        assert_eq!(Journal::lock_path(&path), dir.path().join("chat.jsonl.lock"));
        assert!(Journal::lock_path(&path).exists());

        // The journal itself stays readable while the writer holds the lock
        let (messages, summary) = replay_all(&path);
        assert_eq!(texts(&messages), vec!["hello"]);
        assert_eq!(summary.records, 1);
        journal.close().unwrap();
    }

    #[test]
    fn test_replay_counts_skipped_tail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.jsonl");
        let good = serde_json::to_string(&Message::new("main", "alice", "ok")).unwrap();
        let bad = "{\"sender\":";
        fs::write(&path, format!("{good}\n{bad}\n{good}\n{good}")).unwrap();

        let (messages, summary) = replay_all(&path);
        assert_eq!(messages.len(), 1);
        assert_eq!(summary.stopped_at_line, Some(2));
        assert_eq!(summary.skipped_lines, 3);
        assert_eq!(
            summary.skipped_bytes,
            (bad.len() + 1 + good.len() + 1 + good.len()) as u64
        );
    }
}
