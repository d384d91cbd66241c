use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::args::{Cli, Commands};
use crate::codec::{decode_observation, parse_key, scan_bounds};
use crate::config::Settings;
use crate::error::Result;
use crate::fetch::HttpFetcher;
use crate::models::{Field, Observation};
use crate::processors::{ExportPipeline, IngestPipeline, IngestSummary};
use crate::readers::ObservationReader;
use crate::store::{KeyValueStore, LogStore};
use crate::utils::progress::ProgressReporter;
use crate::writers::{format_timestamp, CsvExporter};

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    setup_logging(cli.verbose);

    let settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    // Spinners would interleave with debug log lines.
    let hide_progress = cli.verbose;

    match cli.command {
        Commands::Ingest {
            input,
            store,
            raw_output,
        } => {
            let store_path = store.unwrap_or_else(|| settings.store_path.clone());

            let data = match input {
                Some(path) => fs::read(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let raw_output = raw_output.unwrap_or_else(|| settings.raw_output.clone());
                    download(&settings, &raw_output, hide_progress).await?
                }
            };

            let progress =
                ProgressReporter::new_spinner("Storing observations...", hide_progress);
            let summary = ingest_bytes(&data, &store_path, settings.source_delimiter_byte())
                .with_context(|| format!("Ingest into {} failed", store_path.display()))?;
            progress.finish_with_message(&format!(
                "Stored {} records ({} keys)",
                summary.records, summary.distinct_keys
            ));
        }

        Commands::Export {
            store,
            output,
            station,
        } => {
            let store_path = store.unwrap_or_else(|| settings.store_path.clone());
            let output = output.unwrap_or_else(|| settings.export_path.clone());

            let progress = ProgressReporter::new_counter("Exporting", hide_progress);
            let written = export_csv(
                &store_path,
                &output,
                station.as_deref(),
                settings.export_delimiter_byte(),
                &progress,
            )
            .with_context(|| format!("Export from {} failed", store_path.display()))?;
            progress.finish_with_message(&format!(
                "Wrote {} records to {}",
                written,
                output.display()
            ));
        }

        Commands::Dump { store, json, limit } => {
            let store_path = store.unwrap_or_else(|| settings.store_path.clone());
            let stdout = io::stdout();
            dump_store(&store_path, json, limit, stdout.lock())
                .with_context(|| format!("Failed to read {}", store_path.display()))?;
        }
    }

    Ok(())
}

/// Route `tracing` output to stderr. `RUST_LOG` takes precedence over `--verbose`.
pub fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("smn_archive={}", level)));

    // A subscriber may already be installed when called from tests.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .try_init();
}

async fn download(
    settings: &Settings,
    raw_output: &Path,
    hide_progress: bool,
) -> anyhow::Result<Vec<u8>> {
    let progress =
        ProgressReporter::new_spinner("Downloading current readings...", hide_progress);
    let fetcher = HttpFetcher::new(settings.source_url.as_str())
        .with_timeout(settings.http_timeout())
        .with_retries(settings.retry_count, settings.retry_wait());

    let data = fetcher
        .fetch()
        .await
        .with_context(|| format!("Download from {} failed", fetcher.url()))?;
    progress.finish_with_message(&format!("Downloaded {} bytes", data.len()));

    if let Some(parent) = raw_output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(raw_output, &data)
        .with_context(|| format!("Failed to save {}", raw_output.display()))?;
    debug!("Saved raw download to {}", raw_output.display());

    Ok(data)
}

/// Decode a feed body and commit it to the store at `store_path`.
///
/// The store is opened for this call only and released before returning.
pub fn ingest_bytes(data: &[u8], store_path: &Path, delimiter: u8) -> Result<IngestSummary> {
    let observations = ObservationReader::with_delimiter(delimiter).read_bytes(data)?;
    info!("Decoded {} observations", observations.len());

    let mut store = LogStore::open(store_path)?;
    IngestPipeline::new().run(&mut store, &observations)
}

/// Write the selected records of the store at `store_path` to a CSV file.
pub fn export_csv(
    store_path: &Path,
    output: &Path,
    station: Option<&str>,
    delimiter: u8,
    progress: &ProgressReporter,
) -> Result<usize> {
    let store = LogStore::open(store_path)?;
    let pipeline = match station {
        Some(code) => ExportPipeline::for_station(code),
        None => ExportPipeline::new(),
    };

    let observations = pipeline.run_with(&store, |_| progress.increment(1))?;
    drop(store);

    CsvExporter::new()
        .with_delimiter(delimiter)
        .write_to_path(&observations, output)?;
    Ok(observations.len())
}

/// Print each stored key with its decoded station, time and readings.
/// A `limit` of 0 prints everything.
pub fn dump_store<W: Write>(
    store_path: &Path,
    json: bool,
    limit: usize,
    mut out: W,
) -> Result<usize> {
    let store = LogStore::open(store_path)?;
    let (lower, upper) = scan_bounds();

    let mut printed = 0;
    for entry in store.range(&lower, &upper)? {
        if limit > 0 && printed >= limit {
            break;
        }

        let (key, value) = entry?;
        let (station, epoch_seconds) = parse_key(&key)?;
        let key = String::from_utf8_lossy(&key);
        let observation = decode_observation(&station, epoch_seconds, &value)?;

        if json {
            let line = serde_json::json!({
                "key": key,
                "observation": observation,
            });
            serde_json::to_writer(&mut out, &line).map_err(io::Error::from)?;
            writeln!(out)?;
        } else {
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}",
                key,
                station,
                epoch_seconds,
                format_timestamp(epoch_seconds)?,
                describe_readings(&observation)
            )?;
        }
        printed += 1;
    }

    out.flush()?;
    Ok(printed)
}

/// Present readings as `column=value unit`, comma separated.
fn describe_readings(observation: &Observation) -> String {
    Field::ALL
        .iter()
        .filter_map(|&field| {
            let measurement = observation.get(field);
            measurement
                .is_present()
                .then(|| format!("{}={} {}", field.column(), measurement, field.unit()))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArchiveError;
    use tempfile::TempDir;

    const FEED: &str = "Station/Location;Date;tre200s0;rre150z0\n\
                        ABO;202401010000;-2.1;0.0\n\
                        GVE;202401010000;5.5;-\n";

    #[test]
    fn test_dump_lists_every_key_in_order() -> Result<()> {
        let dir = TempDir::new()?;
        ingest_bytes(FEED.as_bytes(), dir.path(), b';')?;

        let mut out = Vec::new();
        let printed = dump_store(dir.path(), false, 0, &mut out)?;
        let text = String::from_utf8_lossy(&out);

        assert_eq!(printed, 2);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "ABO-1704067200\tABO\t1704067200\t2024-01-01T00:00:00.000Z\t\
                 tre200s0=-2.10 °C, rre150z0=0.00 mm",
                "GVE-1704067200\tGVE\t1704067200\t2024-01-01T00:00:00.000Z\t\
                 tre200s0=5.50 °C",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_dump_json_respects_limit() -> Result<()> {
        let dir = TempDir::new()?;
        ingest_bytes(FEED.as_bytes(), dir.path(), b';')?;

        let mut out = Vec::new();
        let printed = dump_store(dir.path(), true, 1, &mut out)?;
        assert_eq!(printed, 1);

        let line: serde_json::Value = serde_json::from_slice(&out).map_err(io::Error::from)?;
        assert_eq!(line["key"], "ABO-1704067200");
        assert_eq!(line["observation"]["station"], "ABO");
        assert_eq!(line["observation"]["epoch_seconds"], 1_704_067_200i64);
        Ok(())
    }

    #[test]
    fn test_ingest_rejects_bad_feed_without_touching_store() -> Result<()> {
        let dir = TempDir::new()?;
        let result = ingest_bytes(b"Station/Location;Date\nABO;notadate\n", dir.path(), b';');
        assert!(matches!(result, Err(ArchiveError::CsvDecode { .. })));
        assert!(!dir.path().join(crate::store::LOG_FILE_NAME).exists());
        Ok(())
    }

    #[test]
    fn test_export_csv_counts_records() -> Result<()> {
        let dir = TempDir::new()?;
        let store_path = dir.path().join("store");
        let output = dir.path().join("out").join("smninfo.csv");
        ingest_bytes(FEED.as_bytes(), &store_path, b';')?;

        let progress = ProgressReporter::new_counter("Exporting", true);
        let written = export_csv(&store_path, &output, Some("GVE"), b',', &progress)?;
        assert_eq!(written, 1);

        let contents = fs::read_to_string(&output)?;
        assert!(contents.contains("GVE,2024-01-01T00:00:00.000Z,5.50,"));
        assert!(!contents.contains("ABO"));
        Ok(())
    }
}
