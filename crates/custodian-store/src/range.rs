use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use custodian_types::LedgerEntry;

use crate::codec::{self, Frame};
use crate::error::{StoreError, StoreResult};

/// A finite, chain-ordered, restartable sequence of entries.
///
/// The set of entries is fixed when the range is created; appends that
/// happen afterwards are not observed. File-backed ranges decode one record
/// per step through their own file handle and never touch the append lock.
pub struct EntryRange {
    source: Source,
    cursor: usize,
}

enum Source {
    File {
        reader: BufReader<File>,
        file_len: u64,
        offsets: Vec<u64>,
    },
    Memory(Vec<LedgerEntry>),
}

impl EntryRange {
    /// Range over the records at `offsets` of the segment file at `path`.
    pub(crate) fn from_segment(path: &Path, offsets: Vec<u64>) -> StoreResult<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        Ok(Self {
            source: Source::File {
                reader: BufReader::new(file),
                file_len,
                offsets,
            },
            cursor: 0,
        })
    }

    pub(crate) fn from_entries(entries: Vec<LedgerEntry>) -> Self {
        Self {
            source: Source::Memory(entries),
            cursor: 0,
        }
    }

    /// Total number of entries in the range.
    pub fn len(&self) -> usize {
        match &self.source {
            Source::File { offsets, .. } => offsets.len(),
            Source::Memory(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Restart iteration from the first entry of the range.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl Iterator for EntryRange {
    type Item = StoreResult<LedgerEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match &mut self.source {
            Source::Memory(entries) => entries.get(self.cursor).cloned().map(Ok),
            Source::File {
                reader,
                file_len,
                offsets,
            } => offsets
                .get(self.cursor)
                .map(|&offset| read_published(reader, offset, *file_len)),
        };
        if item.is_some() {
            self.cursor += 1;
        }
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len().saturating_sub(self.cursor);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for EntryRange {}

/// Published offsets point at complete records. A record that no longer
/// decodes was damaged on disk, either before open or underneath the store.
fn read_published(
    reader: &mut BufReader<File>,
    offset: u64,
    file_len: u64,
) -> StoreResult<LedgerEntry> {
    match codec::read_frame(reader, offset, file_len)? {
        Frame::Record { entry, .. } => Ok(entry),
        Frame::End => Err(StoreError::Corrupt {
            offset,
            reason: "record missing".into(),
        }),
        Frame::Torn { reason } => Err(StoreError::Corrupt {
            offset,
            reason: reason.into(),
        }),
        Frame::Invalid { reason, .. } => Err(StoreError::Corrupt { offset, reason }),
    }
}
