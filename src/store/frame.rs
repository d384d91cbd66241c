//! Batch frames of the store log.
//!
//! ```text
//! frame   = payload_len:u32le crc32:u32le payload
//! payload = count:u32le { key_len:u32le key value_len:u32le value }*
//! ```

use super::Entry;

/// Leading bytes of every log file.
pub const LOG_MAGIC: [u8; 8] = *b"SMNLOG\x00\x01";
pub const FRAME_HEADER_LEN: usize = 8;

/// Position of a value inside an encoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSpan {
    pub offset: usize,
    pub len: u32,
}

#[derive(Debug)]
pub struct EncodedFrame {
    pub bytes: Vec<u8>,
    /// One span per input entry, in input order.
    pub values: Vec<ValueSpan>,
}

#[derive(Debug)]
pub struct DecodedFrame {
    pub len: usize,
    pub entries: Vec<(Vec<u8>, ValueSpan)>,
}

pub fn crc32(payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}

fn len_u32(len: usize) -> std::io::Result<u32> {
    u32::try_from(len).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} bytes exceeds the frame field limit", len),
        )
    })
}

pub fn encode_frame(entries: &[Entry]) -> std::io::Result<EncodedFrame> {
    let payload_len: usize = 4 + entries
        .iter()
        .map(|(key, value)| 8 + key.len() + value.len())
        .sum::<usize>();

    let mut bytes = Vec::with_capacity(FRAME_HEADER_LEN + payload_len);
    bytes.extend_from_slice(&len_u32(payload_len)?.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 4]);
    bytes.extend_from_slice(&len_u32(entries.len())?.to_le_bytes());

    let mut values = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let value_len = len_u32(value.len())?;
        bytes.extend_from_slice(&len_u32(key.len())?.to_le_bytes());
        bytes.extend_from_slice(key);
        bytes.extend_from_slice(&value_len.to_le_bytes());
        values.push(ValueSpan {
            offset: bytes.len(),
            len: value_len,
        });
        bytes.extend_from_slice(value);
    }

    let checksum = crc32(&bytes[FRAME_HEADER_LEN..]);
    bytes[4..8].copy_from_slice(&checksum.to_le_bytes());
    Ok(EncodedFrame { bytes, values })
}

fn take_u32(buf: &[u8], pos: &mut usize) -> Option<u32> {
    let end = pos.checked_add(4)?;
    let raw: [u8; 4] = buf.get(*pos..end)?.try_into().ok()?;
    *pos = end;
    Some(u32::from_le_bytes(raw))
}

fn take_bytes<'a>(buf: &'a [u8], pos: &mut usize, len: usize) -> Option<&'a [u8]> {
    let end = pos.checked_add(len)?;
    let bytes = buf.get(*pos..end)?;
    *pos = end;
    Some(bytes)
}

/// Split a frame header into the declared payload length and checksum.
pub fn decode_header(header: &[u8; FRAME_HEADER_LEN]) -> (usize, u32) {
    let payload_len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let checksum = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    (payload_len as usize, checksum)
}

/// Verify and decode a frame payload.
///
/// Value spans are relative to the start of the frame, header included.
pub fn decode_payload(
    payload: &[u8],
    checksum: u32,
) -> Result<Vec<(Vec<u8>, ValueSpan)>, &'static str> {
    if crc32(payload) != checksum {
        return Err("frame checksum mismatch");
    }

    let mut cursor = 0;
    let count = take_u32(payload, &mut cursor).ok_or("missing entry count")?;
    let mut entries = Vec::new();
    for _ in 0..count {
        let key_len = take_u32(payload, &mut cursor).ok_or("truncated key length")? as usize;
        let key = take_bytes(payload, &mut cursor, key_len).ok_or("truncated key")?;
        let value_len = take_u32(payload, &mut cursor).ok_or("truncated value length")?;
        let span = ValueSpan {
            offset: FRAME_HEADER_LEN + cursor,
            len: value_len,
        };
        take_bytes(payload, &mut cursor, value_len as usize).ok_or("truncated value")?;
        entries.push((key.to_vec(), span));
    }
    if cursor != payload.len() {
        return Err("trailing bytes in frame payload");
    }
    Ok(entries)
}

/// Decode the frame at the start of `buf`.
///
/// Returns the reason as `Err` when the frame is incomplete or fails its
/// checksum.
pub fn decode_frame(buf: &[u8]) -> Result<DecodedFrame, &'static str> {
    let header: &[u8; FRAME_HEADER_LEN] = buf
        .get(..FRAME_HEADER_LEN)
        .and_then(|h| h.try_into().ok())
        .ok_or("truncated frame header")?;
    let (payload_len, checksum) = decode_header(header);
    let mut pos = FRAME_HEADER_LEN;
    let payload = take_bytes(buf, &mut pos, payload_len).ok_or("truncated frame payload")?;
    let entries = decode_payload(payload, checksum)?;

    Ok(DecodedFrame {
        len: FRAME_HEADER_LEN + payload_len,
        entries,
    })
}
