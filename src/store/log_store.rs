use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::ops::Bound;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::frame::{self, FRAME_HEADER_LEN, LOG_MAGIC};
use super::{Durability, Entry, EntryIter, KeyValueStore, WriteBatch};
use crate::error::{ArchiveError, Result};

pub const LOG_FILE_NAME: &str = "records.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ValuePointer {
    offset: u64,
    len: u32,
}

/// Persistent ordered store backed by an append-only log of checksummed batches.
///
/// The key index lives in memory and is rebuilt from the log on open; values
/// stay on disk and are read on demand.
pub struct LogStore {
    path: PathBuf,
    file: File,
    index: BTreeMap<Vec<u8>, ValuePointer>,
    log_len: u64,
    /// Set when an aborted commit could not be truncated away.
    poisoned: bool,
}

struct Replay {
    index: BTreeMap<Vec<u8>, ValuePointer>,
    valid_len: u64,
    frames: usize,
    torn_tail: Option<&'static str>,
}

impl LogStore {
    /// Open the store in directory `path`, creating it when missing.
    ///
    /// An incomplete batch at the end of the log is truncated. A damaged batch
    /// followed by further data fails with [`ArchiveError::StoreCorrupt`] and
    /// leaves the file untouched.
    pub fn open(path: &Path) -> Result<Self> {
        let open_error = |source: io::Error| ArchiveError::StoreOpen {
            path: path.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(path).map_err(open_error)?;
        let log_path = path.join(LOG_FILE_NAME);
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&log_path)
            .map_err(open_error)?;

        let mut file_len = file.metadata().map_err(open_error)?.len();
        if file_len == 0 {
            file.write_all(&LOG_MAGIC).map_err(open_error)?;
            file.sync_all().map_err(open_error)?;
            file_len = LOG_MAGIC.len() as u64;
        }

        let replay = replay(&file, file_len, &log_path)?;
        if let Some(reason) = replay.torn_tail {
            warn!(
                "Discarding {} bytes of incomplete batch at offset {} in {}: {}",
                file_len - replay.valid_len,
                replay.valid_len,
                log_path.display(),
                reason
            );
            file.set_len(replay.valid_len).map_err(open_error)?;
            file.sync_all().map_err(open_error)?;
        }

        info!(
            "Opened store {} ({} keys from {} batches)",
            path.display(),
            replay.index.len(),
            replay.frames
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            index: replay.index,
            log_len: replay.valid_len,
            poisoned: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Size of the log file in bytes, including superseded values.
    pub fn log_len(&self) -> u64 {
        self.log_len
    }

    fn append(&mut self, bytes: &[u8], durability: Durability) -> io::Result<()> {
        self.file.write_all(bytes)?;
        if durability == Durability::Sync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    fn rollback(&mut self, len: u64) -> io::Result<()> {
        self.file.set_len(len)?;
        self.file.sync_data()
    }
}

/// Rebuild the key index, reading the log one frame at a time.
///
/// A frame that fails to decode is only treated as a torn tail when it runs
/// to the end of the file.
fn replay(file: &File, file_len: u64, log_path: &Path) -> Result<Replay> {
    let read_error = |source: io::Error| ArchiveError::StoreOpen {
        path: log_path.to_path_buf(),
        source,
    };
    let not_a_log =
        || ArchiveError::StoreCorrupt(format!("{} is not a record log", log_path.display()));

    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(0)).map_err(read_error)?;

    if file_len < LOG_MAGIC.len() as u64 {
        return Err(not_a_log());
    }
    let mut magic = [0u8; LOG_MAGIC.len()];
    reader.read_exact(&mut magic).map_err(read_error)?;
    if magic != LOG_MAGIC {
        return Err(not_a_log());
    }

    let mut replay = Replay {
        index: BTreeMap::new(),
        valid_len: LOG_MAGIC.len() as u64,
        frames: 0,
        torn_tail: None,
    };
    let mut header = [0u8; FRAME_HEADER_LEN];
    let mut payload = Vec::new();

    while replay.valid_len < file_len {
        let offset = replay.valid_len;
        let remaining = file_len - offset;
        if remaining < FRAME_HEADER_LEN as u64 {
            replay.torn_tail = Some("truncated frame header");
            break;
        }
        reader.read_exact(&mut header).map_err(read_error)?;

        let (payload_len, checksum) = frame::decode_header(&header);
        let frame_len = FRAME_HEADER_LEN as u64 + payload_len as u64;
        if frame_len > remaining {
            replay.torn_tail = Some("truncated frame payload");
            break;
        }

        payload.resize(payload_len, 0);
        reader.read_exact(&mut payload).map_err(read_error)?;
        match frame::decode_payload(&payload, checksum) {
            Ok(entries) => {
                for (key, span) in entries {
                    let pointer = ValuePointer {
                        offset: offset + span.offset as u64,
                        len: span.len,
                    };
                    replay.index.insert(key, pointer);
                }
            }
            Err(reason) if frame_len == remaining => {
                replay.torn_tail = Some(reason);
                break;
            }
            Err(reason) => {
                return Err(ArchiveError::StoreCorrupt(format!(
                    "batch at offset {} in {} is damaged ({}) and {} bytes of later batches follow it",
                    offset,
                    log_path.display(),
                    reason,
                    remaining - frame_len
                )));
            }
        }

        replay.valid_len += frame_len;
        replay.frames += 1;
    }

    debug!(
        "Replayed {} batches ({} bytes) from {}",
        replay.frames,
        replay.valid_len,
        log_path.display()
    );
    Ok(replay)
}

fn read_value(mut file: &File, pointer: ValuePointer) -> io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(pointer.offset))?;
    let mut value = vec![0u8; pointer.len as usize];
    file.read_exact(&mut value)?;
    Ok(value)
}

impl KeyValueStore for LogStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.index.get(key) {
            Some(&pointer) => Ok(Some(read_value(&self.file, pointer)?)),
            None => Ok(None),
        }
    }

    fn commit(&mut self, batch: WriteBatch, durability: Durability) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let entries = batch.len();
        if self.poisoned {
            return Err(ArchiveError::StoreCommit {
                entries,
                source: io::Error::new(
                    io::ErrorKind::Other,
                    "log ends in a partial batch from an earlier failed commit, reopen the store",
                ),
            });
        }
        let encoded = frame::encode_frame(batch.entries())
            .map_err(|source| ArchiveError::StoreCommit { entries, source })?;

        let start = self.log_len;
        if let Err(source) = self.append(&encoded.bytes, durability) {
            if let Err(e) = self.rollback(start) {
                warn!(
                    "Failed to truncate {} after aborted commit, refusing further commits: {}",
                    self.path.display(),
                    e
                );
                self.poisoned = true;
            }
            return Err(ArchiveError::StoreCommit { entries, source });
        }

        for ((key, _), span) in batch.into_entries().into_iter().zip(encoded.values) {
            let pointer = ValuePointer {
                offset: start + span.offset as u64,
                len: span.len,
            };
            self.index.insert(key, pointer);
        }
        self.log_len = start + encoded.bytes.len() as u64;

        debug!(
            "Committed {} entries ({} bytes, {:?})",
            entries,
            encoded.bytes.len() - FRAME_HEADER_LEN,
            durability
        );
        Ok(())
    }

    fn range<'a>(&'a self, lower: &[u8], upper: &[u8]) -> Result<EntryIter<'a>> {
        let pending: Vec<(Vec<u8>, ValuePointer)> = if lower < upper {
            self.index
                .range::<[u8], _>((Bound::Included(lower), Bound::Excluded(upper)))
                .map(|(key, pointer)| (key.clone(), *pointer))
                .collect()
        } else {
            Vec::new()
        };

        Ok(Box::new(LogRangeIter {
            file: &self.file,
            pending: pending.into_iter(),
            failed: false,
        }))
    }
}

/// Snapshot of a key range whose values are read lazily from the log.
///
/// Stops after yielding the first read error.
pub struct LogRangeIter<'a> {
    file: &'a File,
    pending: std::vec::IntoIter<(Vec<u8>, ValuePointer)>,
    failed: bool,
}

impl Iterator for LogRangeIter<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let (key, pointer) = self.pending.next()?;
        match read_value(self.file, pointer) {
            Ok(value) => Some(Ok((key, value))),
            Err(e) => {
                self.failed = true;
                Some(Err(ArchiveError::StoreIteration(e)))
            }
        }
    }
}
