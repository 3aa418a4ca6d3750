use forecast_core::analysis::decompose;
use forecast_core::frequency::Frequency;
use forecast_core::loader::{generate_sample, load_csv, parse_csv_bytes, SampleKind, CSV_LABEL, DEFAULT_SEED};
use forecast_core::{ForecastError, SeriesRepository};
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_csv_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,sales").unwrap();
    writeln!(file, "2023-01-01,100.0").unwrap();
    writeln!(file, "2023-01-02,102.0").unwrap();
    writeln!(file, "2023-01-03,101.0").unwrap();
    writeln!(file, "2023-01-04,103.0").unwrap();

    let series = load_csv(file.path(), CSV_LABEL).unwrap();
    assert_eq!(series.len(), 4);
    assert_eq!(series.values()[3], 103.0);
    assert_eq!(series.frequency(), Frequency::Daily);
}

#[test]
fn test_csv_without_numeric_column_is_rejected() {
    let csv = "date,name\n2023-01-01,a\n2023-01-02,b\n";
    let result = parse_csv_bytes(csv.as_bytes().to_vec(), CSV_LABEL);
    assert!(matches!(result, Err(ForecastError::Data(_))));
}

#[test]
fn test_csv_with_duplicate_dates_is_rejected() {
    let csv = "date,value\n2023-01-01,1\n2023-01-01,2\n";
    let result = parse_csv_bytes(csv.as_bytes().to_vec(), CSV_LABEL);
    assert!(matches!(result, Err(ForecastError::Data(_))));
}

#[rstest]
#[case(SampleKind::Trend, 1462, Frequency::Daily)]
#[case(SampleKind::Economic, 168, Frequency::Monthly)]
#[case(SampleKind::Temperature, 1096, Frequency::Daily)]
fn test_samples(#[case] kind: SampleKind, #[case] length: usize, #[case] frequency: Frequency) {
    let series = generate_sample(kind, DEFAULT_SEED).unwrap();
    assert_eq!(series.len(), length);
    assert_eq!(series.frequency(), frequency);

    let summary = series.summary();
    assert_eq!(summary.length, length);
    assert!(summary.min <= summary.mean && summary.mean <= summary.max);
}

#[test]
fn test_weekly_decomposition_indices_sum_to_zero() {
    let series = generate_sample(SampleKind::Temperature, DEFAULT_SEED).unwrap();
    let report = decompose(&series, Some(7)).unwrap();
    assert_eq!(report.seasonal_indices.len(), 7);
    // Indices sum to zero
    let total: f64 = report.seasonal_indices.iter().sum();
    assert!(total.abs() < 1e-9);
}

#[test]
fn test_repository_holds_latest_load() {
    let repo = SeriesRepository::new();
    repo.replace(generate_sample(SampleKind::Economic, DEFAULT_SEED).unwrap());
    let snapshot = repo.snapshot().unwrap();
    repo.replace(generate_sample(SampleKind::Trend, DEFAULT_SEED).unwrap());

    assert_eq!(snapshot.label(), "ECONOMIC");
    assert_eq!(repo.snapshot().unwrap().label(), "SAMPLE");
}
