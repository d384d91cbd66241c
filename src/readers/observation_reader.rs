use std::borrow::Cow;
use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Trim};
use encoding_rs::WINDOWS_1252;
use tracing::{debug, warn};

use crate::error::{ArchiveError, Result};
use crate::models::{Field, Measurement, Observation, FIELD_COUNT};
use crate::utils::constants::{
    DATE_COLUMN, SOURCE_DELIMITER, SOURCE_TIMESTAMP_FORMAT, STATION_COLUMN, STATION_COLUMN_ALIAS,
};

/// Column positions resolved from the header row.
struct ColumnMap {
    station: usize,
    date: usize,
    fields: [Option<usize>; FIELD_COUNT],
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|h| h == name);

        let station = position(STATION_COLUMN)
            .or_else(|| position(STATION_COLUMN_ALIAS))
            .ok_or_else(|| {
                ArchiveError::csv_decode(1, format!("missing '{}' column", STATION_COLUMN))
            })?;
        let date = position(DATE_COLUMN)
            .ok_or_else(|| ArchiveError::csv_decode(1, format!("missing '{}' column", DATE_COLUMN)))?;

        let mut fields = [None; FIELD_COUNT];
        for field in Field::ALL {
            fields[field.index()] = position(field.column());
            if fields[field.index()].is_none() {
                debug!("Column {} not present, values will be absent", field.column());
            }
        }

        Ok(Self {
            station,
            date,
            fields,
        })
    }
}

/// Decodes the MeteoSwiss ten-minute CSV into observations.
pub struct ObservationReader {
    delimiter: u8,
}

impl ObservationReader {
    pub fn new() -> Self {
        Self {
            delimiter: SOURCE_DELIMITER,
        }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    pub fn read_path(&self, path: &Path) -> Result<Vec<Observation>> {
        let data = fs::read(path)?;
        self.read_bytes(&data)
    }

    /// Decode a downloaded file. Non-UTF-8 input is read as Windows-1252.
    pub fn read_bytes(&self, data: &[u8]) -> Result<Vec<Observation>> {
        let text: Cow<'_, str> = match std::str::from_utf8(data) {
            Ok(text) => Cow::Borrowed(text),
            Err(_) => {
                warn!("Input is not valid UTF-8, decoding as Windows-1252");
                let (text, _, _) = WINDOWS_1252.decode(data);
                text
            }
        };
        self.read_str(text.trim_start_matches('\u{feff}'))
    }

    pub fn read_str(&self, text: &str) -> Result<Vec<Observation>> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| ArchiveError::csv_decode(1, e.to_string()))?
            .clone();
        let columns = ColumnMap::from_headers(&headers)?;

        let mut observations = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| {
                let line = e.position().map_or(0, |p| p.line());
                ArchiveError::csv_decode(line, e.to_string())
            })?;
            let line = record.position().map_or(0, |p| p.line());
            observations.push(self.parse_record(&record, &columns, line)?);
        }

        debug!("Decoded {} observations", observations.len());
        Ok(observations)
    }

    fn parse_record(
        &self,
        record: &StringRecord,
        columns: &ColumnMap,
        line: u64,
    ) -> Result<Observation> {
        let station = record.get(columns.station).unwrap_or_default();
        if station.is_empty() {
            return Err(ArchiveError::csv_decode(line, "empty station code"));
        }

        let date = record.get(columns.date).unwrap_or_default();
        let epoch_seconds = parse_timestamp(date)
            .map_err(|e| ArchiveError::csv_decode(line, format!("invalid date '{}': {}", date, e)))?;

        let mut observation = Observation::new(station, epoch_seconds);
        for field in Field::ALL {
            let Some(index) = columns.fields[field.index()] else {
                continue;
            };
            let cell = record.get(index).unwrap_or_default();
            let measurement = Measurement::parse(cell).map_err(|_| {
                ArchiveError::csv_decode(
                    line,
                    format!("invalid value '{}' in column {}", cell, field.column()),
                )
            })?;
            observation.set(field, measurement);
        }

        Ok(observation)
    }
}

impl Default for ObservationReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a `YYYYMMDDHHmm` UTC timestamp into epoch seconds.
pub fn parse_timestamp(text: &str) -> std::result::Result<i64, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, SOURCE_TIMESTAMP_FORMAT).map(|t| t.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
Station/Location;Date;tre200s0;rre150z0;sre000z0;gre000z0;ure200s0;tde200s0;dkl010z0;fu3010z0;fu3010z1;prestas0;pp0qffs0;pp0qnhs0;ppz850s0;ppz700s0;dv1towz0;fu3towz0;fu3towz1;ta1tows0;uretows0;tdetows0
ABO;202401010000;-2.1;0.0;0;2;94.6;-2.9;185;3.2;6.1;864.9;1025.3;1024.6;1524.2;-;-;-;-;-;-;-
GVE;202401010010;4.4;-;0;0;81.2;1.5;222;7.9;15.1;969.3;1024.1;1023.8;-;-;-;-;-;-;-;-
";

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("202401010000").unwrap(), 1_704_067_200);
        assert_eq!(parse_timestamp("197001010001").unwrap(), 60);
        assert!(parse_timestamp("2024-01-01").is_err());
        assert!(parse_timestamp("202413010000").is_err());
    }

    #[test]
    fn test_read_sample_feed() {
        let observations = ObservationReader::new().read_str(SAMPLE).unwrap();
        assert_eq!(observations.len(), 2);

        let abo = &observations[0];
        assert_eq!(abo.station, "ABO");
        assert_eq!(abo.epoch_seconds, 1_704_067_200);
        assert_eq!(abo.get(Field::AirTemperature).value(), Some(-2.1));
        assert_eq!(abo.get(Field::GeopotentialHeight850).value(), Some(1524.2));
        assert!(!abo.get(Field::GeopotentialHeight700).is_present());

        let gve = &observations[1];
        assert_eq!(gve.epoch_seconds, 1_704_067_800);
        assert!(!gve.get(Field::Precipitation).is_present());
        assert_eq!(gve.get(Field::GustPeak).value(), Some(15.1));
    }

    #[test]
    fn test_missing_columns_are_absent() {
        let text = "Station;Date;tre200s0\nABC;202401010000;5.5\n";
        let observations = ObservationReader::new().read_str(text).unwrap();
        assert_eq!(observations[0].present_count(), 1);
        assert_eq!(observations[0].get(Field::AirTemperature).value(), Some(5.5));
    }

    #[test]
    fn test_missing_date_column_is_rejected() {
        let text = "Station/Location;tre200s0\nABC;5.5\n";
        assert!(matches!(
            ObservationReader::new().read_str(text),
            Err(ArchiveError::CsvDecode { line: 1, .. })
        ));
    }

    #[test]
    fn test_bad_cells_report_line() {
        let bad_value = "Station/Location;Date;tre200s0\nABC;202401010000;5.5\nABC;202401010010;warm\n";
        match ObservationReader::new().read_str(bad_value) {
            Err(ArchiveError::CsvDecode { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("tre200s0"));
            }
            other => panic!("expected CsvDecode, got {:?}", other),
        }

        let bad_date = "Station/Location;Date;tre200s0\nABC;yesterday;5.5\n";
        assert!(matches!(
            ObservationReader::new().read_str(bad_date),
            Err(ArchiveError::CsvDecode { line: 2, .. })
        ));

        let no_station = "Station/Location;Date;tre200s0\n;202401010000;5.5\n";
        assert!(ObservationReader::new().read_str(no_station).is_err());
    }

    #[test]
    fn test_windows_1252_input() {
        // "Zürich" with 0xFC for ü.
        let mut data = b"Station/Location;Date;tre200s0\nZ".to_vec();
        data.push(0xFC);
        data.extend_from_slice(b"R;202401010000;1.0\n");

        let observations = ObservationReader::new().read_bytes(&data).unwrap();
        assert_eq!(observations[0].station, "ZüR");
    }

    #[test]
    fn test_read_path() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, "{}", SAMPLE)?;

        let observations = ObservationReader::new().read_path(file.path())?;
        assert_eq!(observations.len(), 2);
        Ok(())
    }

    #[test]
    fn test_custom_delimiter() {
        let text = "Station/Location,Date,tre200s0\nABC,202401010000,5.5\n";
        let observations = ObservationReader::with_delimiter(b',').read_str(text).unwrap();
        assert_eq!(observations[0].get(Field::AirTemperature).value(), Some(5.5));
    }
}
