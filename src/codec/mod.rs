pub mod key;
pub mod record;

pub use key::{build_key, parse_key, scan_bounds, station_bounds, KEY_SEPARATOR};
pub use record::{decode, decode_observation, encode, FIELD_WIDTH, RECORD_LEN};
