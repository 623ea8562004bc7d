use std::fs;
use std::io::BufRead;

use chrono::{Local, NaiveDate, TimeZone, Utc};
use donation_etl::export::{ExportFormat, Exporter};
use donation_etl::model::ProcessedDonation;
use donation_etl::PipelineError;
use tempfile::tempdir;

fn donations() -> Vec<ProcessedDonation> {
    let ts = |m| {
        NaiveDate::from_ymd_opt(2025, 5, 3)
            .and_then(|d| d.and_hms_opt(10, m, 0))
            .unwrap()
    };
    let processed_at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
    vec![
        ProcessedDonation { donor_id: 1, amount: 50.0, campaign_id: 101, timestamp: ts(0), processed_at },
        ProcessedDonation { donor_id: 2, amount: 100.25, campaign_id: 102, timestamp: ts(1), processed_at },
        ProcessedDonation { donor_id: 1, amount: 75.0, campaign_id: 101, timestamp: ts(2), processed_at },
    ]
}

/// Comparison key ignoring the processing stamp.
fn key(d: &ProcessedDonation) -> (i64, u64, i64, chrono::NaiveDateTime) {
    (d.donor_id, d.amount.to_bits(), d.campaign_id, d.timestamp)
}

#[test]
fn csv_export_round_trips() {
    let dir = tempdir().unwrap();
    let exporter = Exporter::new(dir.path());
    let input = donations();

    let path = exporter.export(&input, ExportFormat::Csv).expect("export should succeed");

    let header = fs::read_to_string(&path).unwrap().lines().next().unwrap().to_string();
    assert_eq!(header, "donor_id,amount,campaign_id,timestamp,processed_at");

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let parsed: Vec<ProcessedDonation> = reader.deserialize().collect::<Result<_, _>>().unwrap();
    assert_eq!(
        parsed.iter().map(key).collect::<Vec<_>>(),
        input.iter().map(key).collect::<Vec<_>>()
    );
}

#[test]
fn json_export_is_one_object_per_line_and_round_trips() {
    let dir = tempdir().unwrap();
    let exporter = Exporter::new(dir.path());
    let input = donations();

    let path = exporter.export(&input, ExportFormat::Json).unwrap();

    let file = fs::File::open(&path).unwrap();
    let parsed: Vec<ProcessedDonation> = std::io::BufReader::new(file)
        .lines()
        .map(|line| serde_json::from_str(&line.unwrap()).unwrap())
        .collect();
    assert_eq!(
        parsed.iter().map(key).collect::<Vec<_>>(),
        input.iter().map(key).collect::<Vec<_>>()
    );
    assert!(!fs::read_to_string(&path).unwrap().trim_start().starts_with('['));
}

#[test]
fn file_name_is_timestamp_qualified() {
    let dir = tempdir().unwrap();
    let exporter = Exporter::new(dir.path());
    let now = Local.with_ymd_and_hms(2026, 10, 19, 14, 5, 9).unwrap();

    let csv = exporter.export_at(&donations(), ExportFormat::Csv, now).unwrap();
    let json = exporter.export_at(&donations(), ExportFormat::Json, now).unwrap();

    assert_eq!(csv.file_name().unwrap(), "export_20261019_140509.csv");
    assert_eq!(json.file_name().unwrap(), "export_20261019_140509.json");
}

#[test]
fn exports_in_the_same_second_do_not_overwrite() {
    let dir = tempdir().unwrap();
    let exporter = Exporter::new(dir.path());
    let now = Local.with_ymd_and_hms(2026, 10, 19, 14, 5, 9).unwrap();

    let first = exporter.export_at(&donations(), ExportFormat::Csv, now).unwrap();
    let second = exporter.export_at(&donations()[..1], ExportFormat::Csv, now).unwrap();

    assert_ne!(first, second);
    assert_eq!(second.file_name().unwrap(), "export_20261019_140509_1.csv");
    assert_eq!(fs::read_to_string(&first).unwrap().lines().count(), 4);
    assert_eq!(fs::read_to_string(&second).unwrap().lines().count(), 2);
}

#[test]
fn empty_csv_export_still_has_header() {
    let dir = tempdir().unwrap();
    let path = Exporter::new(dir.path()).export(&[], ExportFormat::Csv).unwrap();

    assert_eq!(
        fs::read_to_string(path).unwrap().trim_end(),
        "donor_id,amount,campaign_id,timestamp,processed_at"
    );
}

#[test]
fn output_dir_is_created() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("exports").join("daily");

    let path = Exporter::new(&target).export(&donations(), ExportFormat::Json).unwrap();

    assert!(path.starts_with(&target));
    assert!(path.exists());
}

#[test]
fn unwritable_output_dir_is_export_error() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "file in the way").unwrap();

    let err = Exporter::new(&blocker).export(&donations(), ExportFormat::Csv).unwrap_err();

    assert!(matches!(err, PipelineError::Export(_)), "got {err:?}");
}
