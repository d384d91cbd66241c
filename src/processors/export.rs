use tracing::info;

use crate::codec::{decode_observation, parse_key, scan_bounds, station_bounds};
use crate::error::Result;
use crate::models::Observation;
use crate::store::KeyValueStore;

/// Reads stored observations back in key order.
pub struct ExportPipeline {
    lower: Vec<u8>,
    upper: Vec<u8>,
    station: Option<String>,
}

impl ExportPipeline {
    /// Export every record in the store.
    pub fn new() -> Self {
        let (lower, upper) = scan_bounds();
        Self {
            lower,
            upper,
            station: None,
        }
    }

    /// Export the records of a single station.
    ///
    /// The key range of `AB` also covers stations such as `AB-C`, so records
    /// are matched on the station parsed from each key.
    pub fn for_station(station: &str) -> Self {
        let (lower, upper) = station_bounds(station);
        Self {
            lower,
            upper,
            station: Some(station.to_string()),
        }
    }

    /// Collect the selected records. The first unreadable entry aborts the export.
    pub fn run<S>(&self, store: &S) -> Result<Vec<Observation>>
    where
        S: KeyValueStore + ?Sized,
    {
        self.run_with(store, |_| {})
    }

    /// Like [`run`](Self::run), calling `on_record` after each decoded record.
    pub fn run_with<S, F>(&self, store: &S, mut on_record: F) -> Result<Vec<Observation>>
    where
        S: KeyValueStore + ?Sized,
        F: FnMut(&Observation),
    {
        let mut observations = Vec::new();
        for entry in store.range(&self.lower, &self.upper)? {
            let (key, value) = entry?;
            let (station, epoch_seconds) = parse_key(&key)?;
            if self.station.as_deref().is_some_and(|wanted| wanted != station) {
                continue;
            }
            let observation = decode_observation(&station, epoch_seconds, &value)?;
            on_record(&observation);
            observations.push(observation);
        }

        info!("Exported {} records", observations.len());
        Ok(observations)
    }
}

impl Default for ExportPipeline {
    fn default() -> Self {
        Self::new()
    }
}
