/// Upstream feed
pub const SWISSMETNET_URL: &str =
    "https://data.geo.admin.ch/ch.meteoschweiz.messwerte-aktuell/VQHA80.csv";

/// CSV column names
pub const STATION_COLUMN: &str = "Station/Location";
pub const STATION_COLUMN_ALIAS: &str = "Station";
pub const DATE_COLUMN: &str = "Date";

/// CSV formats
pub const SOURCE_DELIMITER: u8 = b';';
pub const EXPORT_DELIMITER: u8 = b',';
pub const SOURCE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Default file locations
pub const DEFAULT_STORE_PATH: &str = "smninfo";
pub const DEFAULT_RAW_OUTPUT: &str = "data.csv";
pub const DEFAULT_EXPORT_PATH: &str = "smninfo.csv";
pub const DEFAULT_CONFIG_FILE: &str = "smn-archive";

/// Download defaults
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_RETRY_WAIT_SECS: u64 = 30;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "SMN";
