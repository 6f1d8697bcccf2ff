//! Record framing for the segment file.
//!
//! On-disk format of one record:
//! ```text
//! [4 bytes: payload length (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode-serialized LedgerEntry)]
//! ```

use std::io::{self, Read, Seek, SeekFrom};

use custodian_types::LedgerEntry;

use crate::error::{StoreError, StoreResult};

/// Header size: 4 bytes length + 4 bytes CRC.
pub const HEADER_SIZE: usize = 8;

/// Upper bound on a single payload (16 MiB).
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Outcome of reading one frame at a given offset.
#[derive(Debug)]
pub enum Frame {
    /// A complete, checksummed, decodable record.
    Record { entry: LedgerEntry, frame_len: u64 },
    /// Offset is exactly at end of file.
    End,
    /// The frame runs past end of file.
    Torn { reason: &'static str },
    /// The frame is complete on disk but fails its checksum or decoding.
    Invalid { frame_len: u64, reason: String },
}

/// Serialize and frame an entry.
pub fn encode_frame(entry: &LedgerEntry) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(StoreError::Serialization(format!(
            "record of {} bytes exceeds {MAX_PAYLOAD_SIZE}",
            payload.len()
        )));
    }

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode a payload previously produced by [`encode_frame`].
pub fn decode_payload(payload: &[u8]) -> StoreResult<LedgerEntry> {
    bincode::deserialize(payload).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Read the frame starting at `offset` of a file that is `file_len` bytes
/// long.
pub fn read_frame<R: Read + Seek>(reader: &mut R, offset: u64, file_len: u64) -> io::Result<Frame> {
    if offset >= file_len {
        return Ok(Frame::End);
    }
    if offset + HEADER_SIZE as u64 > file_len {
        return Ok(Frame::Torn {
            reason: "short header",
        });
    }

    reader.seek(SeekFrom::Start(offset))?;
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;
    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    let frame_len = HEADER_SIZE as u64 + u64::from(length);
    if offset + frame_len > file_len {
        return Ok(Frame::Torn {
            reason: "length past end of file",
        });
    }
    if length > MAX_PAYLOAD_SIZE {
        return Ok(Frame::Invalid {
            frame_len,
            reason: format!("payload length {length} exceeds limit"),
        });
    }

    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload)?;

    let actual_crc = crc32fast::hash(&payload);
    if actual_crc != expected_crc {
        return Ok(Frame::Invalid {
            frame_len,
            reason: format!("CRC mismatch: expected {expected_crc:08x}, found {actual_crc:08x}"),
        });
    }

    match decode_payload(&payload) {
        Ok(entry) => Ok(Frame::Record { entry, frame_len }),
        Err(e) => Ok(Frame::Invalid {
            frame_len,
            reason: e.to_string(),
        }),
    }
}
