use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use keel_types::{Record, WorkspaceMeta};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::SyncMode;
use crate::error::Fault;

/// One durable write: a record upsert or a workspace metadata upsert.
///
/// On-disk frame:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of the length field (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized LogEntry)]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum LogEntry {
    Record(Record),
    Workspace(WorkspaceMeta),
}

/// Header size: 4 bytes length + 4 bytes length CRC + 4 bytes payload CRC.
const HEADER_SIZE: usize = 12;

/// Append-only record log.
///
/// Every frame is written with a single `write_all` and, with
/// [`SyncMode::EveryWrite`], synced before `append` returns. On open the
/// log is read front-to-back. Only a short final frame whose header checks
/// out (or a final header cut short) counts as a torn write and is
/// truncated away. Any other damage fails the open and leaves the file as
/// it is.
pub(crate) struct RecordLog {
    path: PathBuf,
    file: File,
    /// Current end of the log.
    offset: u64,
    sync_mode: SyncMode,
    /// Set when a failed append could not be rolled back.
    unusable: bool,
}

impl RecordLog {
    /// Open (or create) the log at `path` and return it with every entry it
    /// holds, in write order.
    pub(crate) fn open(path: &Path, sync_mode: SyncMode) -> Result<(Self, Vec<LogEntry>), Fault> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        let (entries, valid_len) = decode_frames(&bytes)?;

        if valid_len < bytes.len() as u64 {
            warn!(
                path = %path.display(),
                valid_len,
                file_len = bytes.len(),
                "torn record log tail; truncating"
            );
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        debug!(path = %path.display(), recovered = entries.len(), "record log opened");
        Ok((
            Self {
                path: path.to_path_buf(),
                file,
                offset: valid_len,
                sync_mode,
                unusable: false,
            },
            entries,
        ))
    }

    /// Append one entry. Returns the byte offset of the frame.
    ///
    /// If the write fails, the log is cut back to its previous length so a
    /// partial frame never survives. If that cut fails too, the log refuses
    /// every later append.
    pub(crate) fn append(&mut self, entry: &LogEntry) -> Result<u64, Fault> {
        if self.unusable {
            return Err(Fault::Unusable {
                offset: self.offset,
            });
        }
        let frame = encode_frame(entry)?;
        let entry_offset = self.offset;

        if let Err(err) = self.write_frame(&frame) {
            if let Err(rollback) = self.file.set_len(entry_offset) {
                error!(offset = entry_offset, error = %rollback, "record log rollback failed");
                self.unusable = true;
            }
            return Err(err);
        }

        self.offset += frame.len() as u64;
        debug!(offset = entry_offset, len = frame.len(), "record log append");
        Ok(entry_offset)
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), Fault> {
        self.file.seek(SeekFrom::Start(self.offset))?;
        self.file.write_all(frame)?;
        self.file.flush()?;
        if matches!(self.sync_mode, SyncMode::EveryWrite) {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Replace the log with exactly `entries`.
    ///
    /// The new log is written to a temporary file in the same directory,
    /// synced, and renamed over the old one, so a crash leaves either the
    /// old or the new log. The handle of the renamed file becomes the log
    /// handle, so appends never go to the replaced file.
    pub(crate) fn rewrite<'a, I>(&mut self, entries: I) -> Result<(), Fault>
    where
        I: IntoIterator<Item = &'a LogEntry>,
    {
        if self.unusable {
            return Err(Fault::Unusable {
                offset: self.offset,
            });
        }
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        let mut len = 0u64;
        for entry in entries {
            let frame = encode_frame(entry)?;
            tmp.write_all(&frame)?;
            len += frame.len() as u64;
        }
        tmp.as_file().sync_all()?;
        let file = tmp.persist(&self.path).map_err(|e| Fault::Io(e.error))?;

        self.file = file;
        self.offset = len;
        fsync_dir(&dir)?;
        debug!(path = %self.path.display(), len, "record log rewritten");
        Ok(())
    }

    /// Flush and sync everything written so far.
    pub(crate) fn sync(&mut self) -> Result<(), Fault> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Swap the handle for a read-only one so every write fails.
    #[cfg(test)]
    pub(crate) fn reopen_read_only(&mut self) -> Result<(), Fault> {
        self.file = OpenOptions::new().read(true).open(&self.path)?;
        Ok(())
    }
}

/// Make a rename inside `dir` durable.
#[cfg(unix)]
fn fsync_dir(dir: &Path) -> Result<(), Fault> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn fsync_dir(_dir: &Path) -> Result<(), Fault> {
    Ok(())
}

fn encode_frame(entry: &LogEntry) -> Result<Vec<u8>, Fault> {
    let payload = bincode::serialize(entry)?;
    let length = u32::try_from(payload.len()).map_err(|_| {
        Fault::Serialization(format!("entry too large: {} bytes", payload.len()).into())
    })?;
    let length = length.to_le_bytes();

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length);
    frame.extend_from_slice(&crc32fast::hash(&length).to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn corruption(offset: usize, reason: impl Into<String>) -> Fault {
    Fault::Corruption {
        offset: offset as u64,
        reason: reason.into(),
    }
}

/// Decode every complete frame in `bytes`.
///
/// Returns the entries and the length of the valid prefix. Anything past the
/// valid prefix is a torn final frame: either fewer bytes than a header, or
/// a header with a good checksum followed by a short payload.
fn decode_frames(bytes: &[u8]) -> Result<(Vec<LogEntry>, u64), Fault> {
    let mut entries = Vec::new();
    let mut offset = 0usize;

    while bytes.len() - offset >= HEADER_SIZE {
        let header = &bytes[offset..offset + HEADER_SIZE];
        let expected_header_crc = read_u32(header, 4);
        let actual_header_crc = crc32fast::hash(&header[..4]);
        if actual_header_crc != expected_header_crc {
            return Err(corruption(
                offset,
                format!(
                    "header checksum mismatch: expected {expected_header_crc:#010x}, got {actual_header_crc:#010x}"
                ),
            ));
        }

        let length = read_u32(header, 0) as usize;
        if length == 0 {
            return Err(corruption(offset, "empty frame"));
        }
        let start = offset + HEADER_SIZE;
        let Some(payload) = start
            .checked_add(length)
            .and_then(|end| bytes.get(start..end))
        else {
            break;
        };

        let expected_crc = read_u32(header, 8);
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            return Err(corruption(
                offset,
                format!("checksum mismatch: expected {expected_crc:#010x}, got {actual_crc:#010x}"),
            ));
        }

        let entry = bincode::deserialize::<LogEntry>(payload)
            .map_err(|e| corruption(offset, format!("undecodable entry: {e}")))?;
        entries.push(entry);
        offset = start + length;
    }

    Ok((entries, offset as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    use keel_types::Build;

    fn make_entry(id: &str) -> LogEntry {
        LogEntry::Record(Record::from(Build {
            id: id.into(),
            sequence: 1,
            ..Build::default()
        }))
    }

    fn log_with(path: &Path, ids: &[&str]) -> u64 {
        let (mut log, _) = RecordLog::open(path, SyncMode::EveryWrite).unwrap();
        for id in ids {
            log.append(&make_entry(id)).unwrap();
        }
        log.offset()
    }

    fn flip(path: &Path, at: usize, mask: u8) {
        let mut bytes = std::fs::read(path).unwrap();
        bytes[at] ^= mask;
        std::fs::write(path, bytes).unwrap();
    }

    // -----------------------------------------------------------------------
    // Append and replay
    // -----------------------------------------------------------------------

    #[test]
    fn append_and_reopen_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.log");
        let (mut log, entries) = RecordLog::open(&path, SyncMode::EveryWrite).unwrap();
        assert!(entries.is_empty());

        log.append(&make_entry("1")).unwrap();
        log.append(&make_entry("2")).unwrap();
        drop(log);

        let (_, recovered) = RecordLog::open(&path, SyncMode::EveryWrite).unwrap();
        assert_eq!(recovered, vec![make_entry("1"), make_entry("2")]);
    }

    #[test]
    fn append_returns_increasing_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let (mut log, _) = RecordLog::open(&dir.path().join("o.log"), SyncMode::OsDefault).unwrap();

        let off1 = log.append(&make_entry("1")).unwrap();
        let off2 = log.append(&make_entry("2")).unwrap();
        assert_eq!(off1, 0);
        assert!(off2 > off1);
        assert_eq!(log.offset(), std::fs::metadata(log.path()).unwrap().len());
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("state.log");
        let (log, _) = RecordLog::open(&path, SyncMode::OsDefault).unwrap();
        assert!(log.path().exists());
    }

    // -----------------------------------------------------------------------
    // Torn tails and corruption
    // -----------------------------------------------------------------------

    #[test]
    fn torn_payload_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.log");
        let total_len = log_with(&path, &["1", "2"]);

        // Remove the last 4 bytes, leaving an incomplete frame.
        {
            let file = OpenOptions::new().write(true).open(&path).unwrap();
            file.set_len(total_len - 4).unwrap();
        }

        let (log, recovered) = RecordLog::open(&path, SyncMode::EveryWrite).unwrap();
        assert_eq!(recovered, vec![make_entry("1")]);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), log.offset());
    }

    #[test]
    fn torn_header_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header.log");
        let first_len = log_with(&path, &["1"]);
        log_with(&path, &["2"]);

        {
            let file = OpenOptions::new().write(true).open(&path).unwrap();
            file.set_len(first_len + 5).unwrap();
        }

        let (log, recovered) = RecordLog::open(&path, SyncMode::EveryWrite).unwrap();
        assert_eq!(recovered, vec![make_entry("1")]);
        assert_eq!(log.offset(), first_len);
    }

    #[test]
    fn payload_checksum_mismatch_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.log");
        log_with(&path, &["1", "2"]);

        flip(&path, HEADER_SIZE, 0xFF);

        let err = RecordLog::open(&path, SyncMode::EveryWrite).err().unwrap();
        assert!(matches!(err, Fault::Corruption { offset: 0, .. }));
    }

    #[test]
    fn damaged_length_is_corruption_not_a_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("length.log");
        let total_len = log_with(&path, &["1", "2", "3"]);

        // High byte of the first length: the frame now claims to run far
        // past the end of the file.
        flip(&path, 3, 0x40);

        let err = RecordLog::open(&path, SyncMode::EveryWrite).err().unwrap();
        assert!(matches!(err, Fault::Corruption { offset: 0, .. }), "{err}");
        assert_eq!(std::fs::metadata(&path).unwrap().len(), total_len);
    }

    #[test]
    fn damaged_later_header_keeps_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("later.log");
        let first_len = log_with(&path, &["1"]);
        let total_len = log_with(&path, &["2"]);

        flip(&path, first_len as usize + 1, 0x01);

        let err = RecordLog::open(&path, SyncMode::EveryWrite).err().unwrap();
        assert!(matches!(err, Fault::Corruption { offset, .. } if offset == first_len));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), total_len);
    }

    // -----------------------------------------------------------------------
    // Failed writes and rewrite
    // -----------------------------------------------------------------------

    #[test]
    fn unrecoverable_append_makes_log_unusable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.log");
        let (mut log, _) = RecordLog::open(&path, SyncMode::EveryWrite).unwrap();
        log.append(&make_entry("1")).unwrap();
        let before = log.offset();

        log.reopen_read_only().unwrap();
        assert!(matches!(log.append(&make_entry("2")), Err(Fault::Io(_))));
        assert!(matches!(log.append(&make_entry("3")), Err(Fault::Unusable { .. })));
        assert!(log.rewrite(&[make_entry("1")]).is_err());
        assert_eq!(log.offset(), before);
        drop(log);

        let (_, recovered) = RecordLog::open(&path, SyncMode::EveryWrite).unwrap();
        assert_eq!(recovered, vec![make_entry("1")]);
    }

    #[test]
    fn rewrite_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rewrite.log");
        let (mut log, _) = RecordLog::open(&path, SyncMode::EveryWrite).unwrap();
        for id in ["1", "1", "1", "2"] {
            log.append(&make_entry(id)).unwrap();
        }
        let before = log.offset();

        let live = vec![make_entry("1"), make_entry("2")];
        log.rewrite(&live).unwrap();
        assert!(log.offset() < before);

        log.append(&make_entry("3")).unwrap();
        assert_eq!(log.offset(), std::fs::metadata(&path).unwrap().len());
        drop(log);

        let (_, recovered) = RecordLog::open(&path, SyncMode::EveryWrite).unwrap();
        assert_eq!(recovered, vec![make_entry("1"), make_entry("2"), make_entry("3")]);
    }

    #[test]
    fn rewrite_then_rewrite_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("twice.log");
        let (mut log, _) = RecordLog::open(&path, SyncMode::EveryWrite).unwrap();
        log.append(&make_entry("1")).unwrap();

        log.rewrite(&[make_entry("1")]).unwrap();
        log.append(&make_entry("2")).unwrap();
        log.rewrite(&[make_entry("1"), make_entry("2")]).unwrap();
        log.append(&make_entry("3")).unwrap();
        drop(log);

        let (_, recovered) = RecordLog::open(&path, SyncMode::EveryWrite).unwrap();
        assert_eq!(recovered, vec![make_entry("1"), make_entry("2"), make_entry("3")]);
    }
}
