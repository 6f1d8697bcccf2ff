use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use custodian_crypto::ChainHasher;
use custodian_types::{EntryCandidate, EntryHash, EntryId, LedgerEntry};

use crate::codec::{self, Frame};
use crate::counts::CategoryCounts;
use crate::error::{StoreError, StoreResult};
use crate::range::EntryRange;
use crate::traits::{clamp_range, seal_next, LedgerStore};

/// How an append is made durable before it returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` data and metadata (`File::sync_all`).
    Full,
    /// `fdatasync` (`File::sync_data`); skips metadata not needed to read
    /// the data back.
    DataOnly,
}

impl Default for SyncMode {
    fn default() -> Self {
        Self::Full
    }
}

/// Writer side of the segment, guarded by the append lock.
struct SegmentWriter {
    file: File,
    /// End of the last durable record.
    offset: u64,
}

/// Reader-visible state, replaced only after a record is durable.
#[derive(Default)]
struct Published {
    offsets: Vec<u64>,
    tail: EntryHash,
    counts: CategoryCounts,
    /// Offsets of complete records that fail their checksum or decoding.
    damaged: Vec<u64>,
}

impl Published {
    fn push(&mut self, offset: u64, entry: &LedgerEntry) {
        self.offsets.push(offset);
        self.tail = entry.entry_hash;
        self.counts.record(entry.action_type);
    }

    /// Keep an unreadable record in its chain position. Readers get
    /// `StoreError::Corrupt` for it.
    fn push_damaged(&mut self, offset: u64) {
        self.offsets.push(offset);
        self.damaged.push(offset);
    }
}

/// Durable ledger store backed by a single append-only segment file.
///
/// Entries are serialized with bincode and framed with a length prefix and a
/// CRC32 checksum (see [`codec`]). Every append is synced to disk before
/// the entry is published.
///
/// On open the file is read front to back. A trailing frame that runs past
/// end of file, as a crash mid-append leaves it, is copied to a
/// `<segment>.torn-<offset>` sidecar and cut off. A complete record that
/// fails its checksum or decoding is never removed: it keeps its place in
/// the chain, reads of it yield [`StoreError::Corrupt`], and appends are
/// refused with [`StoreError::Damaged`] for as long as the store is open.
pub struct FileLedgerStore {
    path: PathBuf,
    sync_mode: SyncMode,
    hasher: ChainHasher,
    writer: Mutex<SegmentWriter>,
    published: RwLock<Published>,
}

impl FileLedgerStore {
    /// Open (or create) the segment file at `path` and recover its entries.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let created = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        if created {
            sync_parent_dir(path)?;
        }

        let published = recover(path, &file)?;
        let offset = file.metadata()?.len();

        debug!(
            path = %path.display(),
            entries = published.offsets.len(),
            bytes = offset,
            "segment opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            sync_mode,
            hasher: ChainHasher::ENTRY,
            writer: Mutex::new(SegmentWriter { file, offset }),
            published: RwLock::new(published),
        })
    }

    /// Path to the segment file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    /// Size of the durable part of the segment in bytes.
    pub fn size_bytes(&self) -> StoreResult<u64> {
        Ok(self.writer.lock().map_err(|_| StoreError::Poisoned)?.offset)
    }

    /// Offsets of records kept in place because they fail their checksum or
    /// decoding.
    pub fn damaged_offsets(&self) -> StoreResult<Vec<u64>> {
        Ok(self
            .published
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .damaged
            .clone())
    }

    fn write_durable(&self, file: &mut File, frame: &[u8]) -> io::Result<()> {
        file.write_all(frame)?;
        match self.sync_mode {
            SyncMode::Full => file.sync_all(),
            SyncMode::DataOnly => file.sync_data(),
        }
    }
}

impl LedgerStore for FileLedgerStore {
    fn append_entry(&self, candidate: EntryCandidate) -> StoreResult<LedgerEntry> {
        let mut w = self.writer.lock().map_err(|_| StoreError::Poisoned)?;

        let (position, previous_hash) = {
            let published = self.published.read().map_err(|_| StoreError::Poisoned)?;
            if let Some(&offset) = published.damaged.first() {
                return Err(StoreError::Damaged {
                    offset,
                    count: published.damaged.len(),
                });
            }
            (published.offsets.len() as u64, published.tail)
        };

        let actual = w.file.metadata()?.len();
        if actual != w.offset {
            return Err(StoreError::ForeignWrite {
                expected: w.offset,
                actual,
            });
        }

        let entry = seal_next(&self.hasher, candidate, position, previous_hash);
        let frame = codec::encode_frame(&entry)?;
        let start = w.offset;

        if let Err(e) = self.write_durable(&mut w.file, &frame) {
            error!(offset = start, error = %e, "append failed; truncating partial record");
            if let Err(rollback) = w.file.set_len(start).and_then(|()| w.file.sync_all()) {
                error!(offset = start, error = %rollback, "failed to truncate partial record");
            }
            return Err(e.into());
        }
        w.offset = start + frame.len() as u64;

        self.published
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .push(start, &entry);

        debug!(
            entry_id = %entry.entry_id,
            offset = start,
            len = frame.len(),
            "record appended"
        );
        Ok(entry)
    }

    fn read_range(&self, offset: u64, count: u64) -> StoreResult<EntryRange> {
        let offsets = {
            let published = self.published.read().map_err(|_| StoreError::Poisoned)?;
            let range = clamp_range(offset, count, published.offsets.len() as u64)?;
            published.offsets[range].to_vec()
        };
        EntryRange::from_segment(&self.path, offsets)
    }

    fn read_tail_hash(&self) -> StoreResult<EntryHash> {
        Ok(self.published.read().map_err(|_| StoreError::Poisoned)?.tail)
    }

    fn len(&self) -> StoreResult<u64> {
        Ok(self
            .published
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .offsets
            .len() as u64)
    }

    fn category_counts(&self) -> StoreResult<CategoryCounts> {
        Ok(self.published.read().map_err(|_| StoreError::Poisoned)?.counts)
    }
}

/// Rebuild the published state by scanning the segment front to back.
fn recover(path: &Path, file: &File) -> StoreResult<Published> {
    let mut reader = BufReader::new(File::open(path)?);
    let file_len = file.metadata()?.len();
    let mut published = Published::default();
    let mut offset: u64 = 0;

    loop {
        match codec::read_frame(&mut reader, offset, file_len)? {
            Frame::End => break,
            Frame::Record { entry, frame_len } => {
                published.push(offset, &entry);
                offset += frame_len;
            }
            Frame::Invalid { frame_len, reason } => {
                let entry_id = EntryId::at_position(published.offsets.len() as u64);
                warn!(offset, frame_len, %entry_id, %reason, "damaged record kept in place");
                published.push_damaged(offset);
                offset += frame_len;
            }
            Frame::Torn { reason } if published.damaged.is_empty() => {
                set_aside_tail(path, &mut reader, file, offset, file_len, reason)?;
                break;
            }
            Frame::Torn { reason } => {
                // Framing is unreliable past a damaged record; leave the bytes.
                warn!(
                    offset,
                    trailing = file_len - offset,
                    reason,
                    "unframed bytes after damaged record left in place"
                );
                break;
            }
        }
    }

    debug!(
        recovered = published.offsets.len(),
        damaged = published.damaged.len(),
        "segment recovery complete"
    );
    Ok(published)
}

/// Copy the incomplete trailing frame to a sidecar file, then cut it off.
fn set_aside_tail(
    path: &Path,
    reader: &mut BufReader<File>,
    file: &File,
    offset: u64,
    file_len: u64,
    reason: &str,
) -> StoreResult<()> {
    let mut tail = Vec::with_capacity((file_len - offset) as usize);
    reader.seek(SeekFrom::Start(offset))?;
    reader.by_ref().take(file_len - offset).read_to_end(&mut tail)?;

    let sidecar = torn_sidecar_path(path, offset);
    let mut out = File::create(&sidecar)?;
    out.write_all(&tail)?;
    out.sync_all()?;
    sync_parent_dir(&sidecar)?;

    warn!(
        offset,
        discarded = tail.len(),
        reason,
        sidecar = %sidecar.display(),
        "discarding incomplete trailing record"
    );
    file.set_len(offset)?;
    file.sync_all()?;
    Ok(())
}

fn torn_sidecar_path(path: &Path, offset: u64) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".torn-{offset}"));
    PathBuf::from(name)
}

/// Make a newly created directory entry durable.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => File::open(parent)?.sync_all(),
        _ => File::open(".")?.sync_all(),
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
