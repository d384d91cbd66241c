//! Runtime settings.
//!
//! Values are layered: built-in defaults, then an optional configuration file
//! (`smn-archive.toml` in the working directory, or an explicit path), then
//! `SMN_*` environment variables such as `SMN_STORE_PATH`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::{Validate, ValidationError};

use crate::error::Result;
use crate::utils::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_EXPORT_PATH, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_RAW_OUTPUT,
    DEFAULT_RETRY_COUNT, DEFAULT_RETRY_WAIT_SECS, DEFAULT_STORE_PATH, ENV_PREFIX, SWISSMETNET_URL,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Settings {
    #[validate(url)]
    pub source_url: String,

    /// Directory holding the record log.
    pub store_path: PathBuf,

    /// Where each download is saved before decoding.
    pub raw_output: PathBuf,

    pub export_path: PathBuf,

    #[validate(range(min = 1, max = 600))]
    pub http_timeout_secs: u64,

    #[validate(range(max = 10))]
    pub retry_count: u32,

    #[validate(range(max = 3600))]
    pub retry_wait_secs: u64,

    #[validate(custom(function = "single_byte"))]
    pub source_delimiter: String,

    #[validate(custom(function = "single_byte"))]
    pub export_delimiter: String,
}

fn single_byte(value: &str) -> std::result::Result<(), ValidationError> {
    if value.len() == 1 && value.is_ascii() {
        Ok(())
    } else {
        Err(ValidationError::new("delimiter must be a single ASCII character"))
    }
}

impl Settings {
    /// Load settings from the default file (if present) and the environment.
    pub fn load(explicit_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("source_url", SWISSMETNET_URL)?
            .set_default("store_path", DEFAULT_STORE_PATH)?
            .set_default("raw_output", DEFAULT_RAW_OUTPUT)?
            .set_default("export_path", DEFAULT_EXPORT_PATH)?
            .set_default("http_timeout_secs", DEFAULT_HTTP_TIMEOUT_SECS as i64)?
            .set_default("retry_count", DEFAULT_RETRY_COUNT as i64)?
            .set_default("retry_wait_secs", DEFAULT_RETRY_WAIT_SECS as i64)?
            .set_default("source_delimiter", ";")?
            .set_default("export_delimiter", ",")?;

        builder = match explicit_file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        settings.validate()?;

        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.retry_wait_secs)
    }

    pub fn source_delimiter_byte(&self) -> u8 {
        self.source_delimiter.as_bytes()[0]
    }

    pub fn export_delimiter_byte(&self) -> u8 {
        self.export_delimiter.as_bytes()[0]
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_url: SWISSMETNET_URL.to_string(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            raw_output: PathBuf::from(DEFAULT_RAW_OUTPUT),
            export_path: PathBuf::from(DEFAULT_EXPORT_PATH),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_wait_secs: DEFAULT_RETRY_WAIT_SECS,
            source_delimiter: ";".to_string(),
            export_delimiter: ",".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArchiveError;
    use std::io::Write;
    use tempfile::Builder;

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.source_delimiter_byte(), b';');
        assert_eq!(settings.export_delimiter_byte(), b',');
        assert_eq!(settings.retry_wait(), Duration::from_secs(30));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = config_file("store_path = \"/var/lib/smn\"\nretry_count = 5\n");
        let settings = Settings::load(Some(file.path())).unwrap();

        assert_eq!(settings.store_path, PathBuf::from("/var/lib/smn"));
        assert_eq!(settings.retry_count, 5);
        assert_eq!(settings.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let file = config_file("export_delimiter = \"::\"\n");
        assert!(matches!(
            Settings::load(Some(file.path())),
            Err(ArchiveError::Validation(_))
        ));

        let file = config_file("http_timeout_secs = 0\n");
        assert!(Settings::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(matches!(
            Settings::load(Some(Path::new("/nonexistent/smn-archive.toml"))),
            Err(ArchiveError::Config(_))
        ));
    }
}
