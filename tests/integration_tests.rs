use smn_archive::cli::commands::{export_csv, ingest_bytes};
use smn_archive::models::{Field, Measurement, Observation};
use smn_archive::processors::{ExportPipeline, IngestPipeline};
use smn_archive::readers::ObservationReader;
use smn_archive::store::LogStore;
use smn_archive::utils::ProgressReporter;
use smn_archive::writers::CsvExporter;
use tempfile::TempDir;

const FEED: &str = "Station/Location;Date;tre200s0;rre150z0;sre000z0\n\
                    ABC;202401010000;5.5;-;10\n";

#[test]
fn test_feed_to_csv_end_to_end() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store_path = temp_dir.path().join("smninfo");
    let output_path = temp_dir.path().join("smninfo.csv");

    let summary = ingest_bytes(FEED.as_bytes(), &store_path, b';').unwrap();
    assert_eq!(summary.records, 1);
    assert_eq!(summary.distinct_keys, 1);

    let progress = ProgressReporter::new_counter("Exporting", true);
    let written = export_csv(&store_path, &output_path, None, b',', &progress).unwrap();
    assert_eq!(written, 1);

    let contents = std::fs::read_to_string(&output_path).unwrap();
    let mut lines = contents.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("Station/Location,Date,tre200s0,rre150z0,sre000z0"));

    let row = lines.next().unwrap();
    assert!(row.starts_with("ABC,2024-01-01T00:00:00.000Z,5.50,,10.00"));
    assert!(lines.next().is_none());
}

#[test]
fn test_records_survive_reopen() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let first = vec![
        Observation::new("ABO", 1_704_067_200)
            .with(Field::AirTemperature, Measurement::present(-2.1)),
        Observation::new("GVE", 1_704_067_200).with(Field::Precipitation, Measurement::present(0.3)),
    ];
    {
        let mut store = LogStore::open(temp_dir.path()).unwrap();
        IngestPipeline::new().run(&mut store, &first).unwrap();
    }

    // A second cycle overwrites one key and adds another.
    let second = vec![
        Observation::new("ABO", 1_704_067_200)
            .with(Field::AirTemperature, Measurement::present(-1.9)),
        Observation::new("ABO", 1_704_067_800),
    ];
    {
        let mut store = LogStore::open(temp_dir.path()).unwrap();
        IngestPipeline::new().run(&mut store, &second).unwrap();
    }

    let store = LogStore::open(temp_dir.path()).unwrap();
    assert_eq!(store.len(), 3);

    let exported = ExportPipeline::new().run(&store).unwrap();
    let keys: Vec<(&str, i64)> = exported
        .iter()
        .map(|o| (o.station.as_str(), o.epoch_seconds))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("ABO", 1_704_067_200),
            ("ABO", 1_704_067_800),
            ("GVE", 1_704_067_200)
        ]
    );
    assert_eq!(
        exported[0].get(Field::AirTemperature).value(),
        Some(-1.9)
    );
    assert_eq!(exported[1].present_count(), 0);
}

#[test]
fn test_legacy_encoded_feed() {
    // "Zürich" in Windows-1252
    let mut feed = b"Station/Location;Date;tre200s0\n".to_vec();
    feed.extend_from_slice(b"Z\xfcrich;202401011200;3.25\n");

    let observations = ObservationReader::new().read_bytes(&feed).unwrap();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].station, "Zürich");

    let mut out = Vec::new();
    CsvExporter::new()
        .write_records(&observations, &mut out)
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Zürich,2024-01-01T12:00:00.000Z,3.25,"));
}
