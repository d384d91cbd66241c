//! Fixed-width binary layout of an observation.
//!
//! Each field occupies [`FIELD_WIDTH`] bytes in [`Field`] order: one presence
//! byte (`0x01` present, `0x00` absent) followed by the value as a big-endian
//! IEEE-754 double. Absent fields still occupy their slot with a zeroed value.
//! Station and timestamp live in the key, not in the payload.

use crate::error::{ArchiveError, Result};
use crate::models::{Measurement, Measurements, Observation, FIELD_COUNT};

pub const FIELD_WIDTH: usize = 1 + std::mem::size_of::<f64>();
pub const RECORD_LEN: usize = FIELD_COUNT * FIELD_WIDTH;

const PRESENT: u8 = 0x01;
const ABSENT: u8 = 0x00;

pub fn encode(observation: &Observation) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(RECORD_LEN);
    for measurement in observation.measurements() {
        match measurement.value() {
            Some(value) => {
                buf.push(PRESENT);
                buf.extend_from_slice(&value.to_be_bytes());
            }
            None => {
                buf.push(ABSENT);
                buf.extend_from_slice(&[0u8; 8]);
            }
        }
    }
    debug_assert_eq!(buf.len(), RECORD_LEN);
    Ok(buf)
}

/// Decode the measurements of a stored record. Bytes past [`RECORD_LEN`] are ignored.
pub fn decode(bytes: &[u8]) -> Result<Measurements> {
    if bytes.len() < RECORD_LEN {
        return Err(ArchiveError::ShortPayload {
            expected: RECORD_LEN,
            actual: bytes.len(),
        });
    }

    let mut measurements = [Measurement::ABSENT; FIELD_COUNT];
    for (slot, chunk) in measurements
        .iter_mut()
        .zip(bytes[..RECORD_LEN].chunks_exact(FIELD_WIDTH))
    {
        if chunk[0] == PRESENT {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&chunk[1..FIELD_WIDTH]);
            *slot = Measurement::present(f64::from_be_bytes(raw));
        }
    }
    Ok(measurements)
}

/// Decode a stored record and attach the station and timestamp recovered from its key.
pub fn decode_observation(station: &str, epoch_seconds: i64, bytes: &[u8]) -> Result<Observation> {
    Ok(Observation::from_measurements(
        station,
        epoch_seconds,
        decode(bytes)?,
    ))
}
