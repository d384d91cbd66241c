use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::DateTime;
use csv::WriterBuilder;

use crate::error::{ArchiveError, Result};
use crate::models::{Field, Observation};
use crate::utils::constants::{DATE_COLUMN, EXPORT_DELIMITER, EXPORT_TIMESTAMP_FORMAT, STATION_COLUMN};

pub struct CsvExporter {
    delimiter: u8,
}

impl CsvExporter {
    pub fn new() -> Self {
        Self {
            delimiter: EXPORT_DELIMITER,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Write observations to a new file at `path`, creating parent directories.
    pub fn write_to_path(&self, records: &[Observation], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        self.write_records(records, file)
    }

    /// Write a header row and one row per observation.
    pub fn write_records<W: Write>(&self, records: &[Observation], sink: W) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(sink);

        let mut header = vec![STATION_COLUMN, DATE_COLUMN];
        header.extend(Field::ALL.iter().map(|f| f.column()));
        writer.write_record(&header).map_err(encode_error)?;

        for record in records {
            let mut row = Vec::with_capacity(header.len());
            row.push(record.station.clone());
            row.push(format_timestamp(record.epoch_seconds)?);
            row.extend(Field::ALL.iter().map(|&f| record.get(f).to_string()));
            writer.write_record(&row).map_err(encode_error)?;
        }

        writer
            .flush()
            .map_err(|e| ArchiveError::CsvEncode(e.to_string()))?;
        Ok(())
    }
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_error(error: csv::Error) -> ArchiveError {
    ArchiveError::CsvEncode(error.to_string())
}

/// Render epoch seconds as `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn format_timestamp(epoch_seconds: i64) -> Result<String> {
    DateTime::from_timestamp(epoch_seconds, 0)
        .map(|t| t.format(EXPORT_TIMESTAMP_FORMAT).to_string())
        .ok_or_else(|| {
            ArchiveError::CsvEncode(format!("timestamp {} is out of range", epoch_seconds))
        })
}
