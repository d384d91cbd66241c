//! Store keys of the form `<station>-<epoch_seconds>`.
//!
//! Keys sort by raw bytes, so all records of a station are contiguous but the
//! epochs inside a station sort as decimal strings, not numerically.

use crate::error::{ArchiveError, Result};

pub const KEY_SEPARATOR: u8 = b'-';

/// Exclusive upper bound above every ASCII key.
const KEYSPACE_END: u8 = 0xFF;

pub fn build_key(station: &str, epoch_seconds: i64) -> Vec<u8> {
    format!("{}-{}", station, epoch_seconds).into_bytes()
}

/// Split a key into station and epoch.
///
/// The separator is the last `-`, unless it is directly preceded by another
/// `-`, in which case that one separates a negative epoch.
pub fn parse_key(key: &[u8]) -> Result<(String, i64)> {
    let text =
        std::str::from_utf8(key).map_err(|_| ArchiveError::malformed_key(key, "not valid UTF-8"))?;

    let last = text
        .rfind(KEY_SEPARATOR as char)
        .ok_or_else(|| ArchiveError::malformed_key(key, "missing '-' separator"))?;
    let split = if last > 0 && text.as_bytes()[last - 1] == KEY_SEPARATOR {
        last - 1
    } else {
        last
    };

    let (station, rest) = (&text[..split], &text[split + 1..]);
    if station.is_empty() {
        return Err(ArchiveError::malformed_key(key, "empty station code"));
    }

    let digits = rest.strip_prefix('-').unwrap_or(rest);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ArchiveError::malformed_key(key, "epoch suffix is not a decimal integer"));
    }
    let epoch_seconds = rest
        .parse::<i64>()
        .map_err(|_| ArchiveError::malformed_key(key, "epoch suffix out of range"))?;

    Ok((station.to_string(), epoch_seconds))
}

/// Bounds covering every key in the store.
pub fn scan_bounds() -> (Vec<u8>, Vec<u8>) {
    (Vec::new(), vec![KEYSPACE_END])
}

/// Bounds covering the keys of one station: `<station>-` up to `<station>.`.
///
/// Longer codes starting with `<station>-` fall in the same range.
pub fn station_bounds(station: &str) -> (Vec<u8>, Vec<u8>) {
    let mut lower = station.as_bytes().to_vec();
    lower.push(KEY_SEPARATOR);
    let mut upper = station.as_bytes().to_vec();
    upper.push(KEY_SEPARATOR + 1);
    (lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_malformed(key: &[u8]) {
        assert!(
            matches!(parse_key(key), Err(ArchiveError::MalformedKey { .. })),
            "expected MalformedKey for {:?}",
            String::from_utf8_lossy(key)
        );
    }

    #[test]
    fn test_build_key() {
        assert_eq!(build_key("ABO", 1_704_067_200), b"ABO-1704067200".to_vec());
        assert_eq!(build_key("ABO", 0), b"ABO-0".to_vec());
        assert_eq!(build_key("ABO", -60), b"ABO--60".to_vec());
    }

    #[test]
    fn test_key_round_trip() {
        let stations = ["A", "ABO", "GVE", "STATION42", "zürich"];
        let epochs = [0, 1, 59, 1_704_067_200, -1, -1_704_067_200, i64::MAX, i64::MIN];
        for station in stations {
            for epoch in epochs {
                let key = build_key(station, epoch);
                assert_eq!(parse_key(&key).unwrap(), (station.to_string(), epoch));
            }
        }
    }

    #[test]
    fn test_station_code_may_contain_separator() {
        assert_eq!(
            parse_key(b"AB-C-1700000000").unwrap(),
            ("AB-C".to_string(), 1_700_000_000)
        );
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        assert_malformed(b"ABO1704067200");
        assert_malformed(b"ABO-");
        assert_malformed(b"ABO-12a");
        assert_malformed(b"ABO-+12");
        assert_malformed(b"-1704067200");
        assert_malformed(b"ABO-99999999999999999999");
        assert_malformed(&[0x41, 0xFF, b'-', b'1']);
        assert_malformed(b"");
    }

    #[test]
    fn test_scan_bounds_cover_keys() {
        let (lower, upper) = scan_bounds();
        for key in [build_key("0", 0), build_key("ABO", i64::MIN), build_key("zzz", i64::MAX)] {
            assert!(lower.as_slice() <= key.as_slice());
            assert!(key.as_slice() < upper.as_slice());
        }
    }

    #[test]
    fn test_station_bounds_select_one_station() {
        let (lower, upper) = station_bounds("ABO");
        let inside = |key: &[u8]| lower.as_slice() <= key && key < upper.as_slice();

        assert!(inside(&build_key("ABO", 1_704_067_200)));
        assert!(inside(&build_key("ABO", -5)));
        assert!(!inside(&build_key("AB", 1_704_067_200)));
        assert!(!inside(&build_key("ABOX", 1_704_067_200)));
        assert!(!inside(&build_key("ABP", 0)));
    }
}
