use std::collections::HashSet;

use tracing::{debug, info};

use crate::codec::{build_key, encode};
use crate::error::Result;
use crate::models::Observation;
use crate::store::{Durability, KeyValueStore, WriteBatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestSummary {
    pub records: usize,
    pub distinct_keys: usize,
    pub payload_bytes: usize,
}

/// Writes one ingest cycle into the store as a single batch.
pub struct IngestPipeline {
    durability: Durability,
}

impl IngestPipeline {
    pub fn new() -> Self {
        Self {
            durability: Durability::Sync,
        }
    }

    pub fn with_durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    /// Encode every observation and commit them together.
    ///
    /// Either the whole cycle is stored or, on any error, none of it is.
    pub fn run<S>(&self, store: &mut S, observations: &[Observation]) -> Result<IngestSummary>
    where
        S: KeyValueStore + ?Sized,
    {
        let mut batch = WriteBatch::with_capacity(observations.len());
        let mut keys = HashSet::with_capacity(observations.len());
        let mut payload_bytes = 0;

        for observation in observations {
            let key = build_key(&observation.station, observation.epoch_seconds);
            let value = encode(observation)?;
            payload_bytes += key.len() + value.len();
            keys.insert(key.clone());
            batch.set(key, value);
        }

        let summary = IngestSummary {
            records: observations.len(),
            distinct_keys: keys.len(),
            payload_bytes,
        };
        debug!(
            "Staged {} records under {} keys",
            summary.records, summary.distinct_keys
        );

        store.commit(batch, self.durability)?;
        info!(
            "Ingested {} records ({} bytes)",
            summary.records, summary.payload_bytes
        );
        Ok(summary)
    }
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new()
    }
}
