//! Ordered byte-string key-value storage.
//!
//! Pipelines talk to storage only through [`KeyValueStore`]; [`LogStore`] is
//! the on-disk engine used by the binary.

pub mod frame;
pub mod log_store;

pub use log_store::{LogRangeIter, LogStore, LOG_FILE_NAME};

use crate::error::Result;

/// A key and its value.
pub type Entry = (Vec<u8>, Vec<u8>);

/// Forward iterator over a key range. Read failures are yielded as `Err` items.
pub type EntryIter<'a> = Box<dyn Iterator<Item = Result<Entry>> + 'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Durability {
    /// Flush the commit to stable storage before returning.
    #[default]
    Sync,
    NoSync,
}

/// Writes staged for a single atomic commit. Dropping a batch discards it.
#[derive(Debug, Default)]
pub struct WriteBatch {
    entries: Vec<Entry>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Stage a write. A later write of the same key in the batch wins.
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

pub trait KeyValueStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Apply every write of `batch`, or none of them.
    fn commit(&mut self, batch: WriteBatch, durability: Durability) -> Result<()>;

    /// Entries with `lower <= key < upper`, in ascending key order.
    fn range<'a>(&'a self, lower: &[u8], upper: &[u8]) -> Result<EntryIter<'a>>;
}
