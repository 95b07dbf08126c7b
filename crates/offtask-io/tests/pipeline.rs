//! End-to-end integration tests: CSV -> table -> features/summaries -> JSON.

use std::fs;
use std::path::{Path, PathBuf};

use offtask_io::{
    ExperimentName, ExploreRecord, FeatureSpec, IoError, ResultWriter, TableReader, correlation_matrix, describe,
    kind_counts, value_counts,
};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn split_fixture_into_model_inputs() {
    let table = TableReader::new(&fixture_path("students_12.csv"))
        .read()
        .expect("fixture should parse");
    assert_eq!(table.n_rows(), 12);
    assert_eq!(table.n_columns(), 7);

    let set = FeatureSpec::default().split(&table).unwrap();
    assert_eq!(set.n_samples(), 12);
    assert_eq!(
        set.feature_names(),
        &["Avg-RightToLeft".to_string(), "Avg-Pressure".to_string(), "Count-Help".to_string()]
    );
    assert_eq!(set.dropped_columns(), &["Sum-Zero".to_string()]);
    assert_eq!(set.class_counts(), vec![9, 3]);
    assert_eq!(set.labels()[2], 1);
    assert_eq!(set.groups()[8], "dan");
    assert_eq!(set.ids()[11], "12");
    assert!(set.features().iter().all(|row| row.len() == 3));
}

#[test]
fn explore_round_trip() {
    let table = TableReader::new(&fixture_path("students_12.csv")).read().unwrap();
    let summaries = describe(&table);
    let correlation = correlation_matrix(&table);
    let class_distribution = value_counts(table.column("OffTask").unwrap());

    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path(), ExperimentName::new("explore_rt".into()).unwrap()).unwrap();
    let path = writer
        .write_explore(&ExploreRecord {
            n_rows: table.n_rows(),
            n_columns: table.n_columns(),
            missing_values: 0,
            kinds: kind_counts(&table),
            class_distribution: &class_distribution,
            summaries: &summaries,
            correlation: &correlation,
        })
        .unwrap();

    let content: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(content["experiment"], "explore_rt");
    assert_eq!(content["n_rows"], 12);
    assert_eq!(content["kinds"]["categorical"], 2);
    assert_eq!(content["kinds"]["continuous"], 2);
    assert_eq!(content["kinds"]["integer"], 3);
    assert_eq!(content["class_distribution"][0][0], "N");
    assert_eq!(content["class_distribution"][0][1], 9);

    // Five numeric columns: id, two averages, a count and the zero column.
    let names = content["correlation"]["names"].as_array().unwrap();
    assert_eq!(names.len(), 5);
    let summaries = content["summaries"].as_array().unwrap();
    assert_eq!(summaries.len(), 5);
    assert_eq!(summaries[0]["name"], "Unique-id");
    assert_eq!(summaries[0]["max"], 12.0);

    // Avg-RightToLeft rises with off-task rows while Avg-Pressure falls.
    let r = content["correlation"]["values"][1][2].as_f64().unwrap();
    assert!(r < -0.9, "correlation {r}");
}

#[test]
fn reader_fixture_files_match_expected_errors() {
    let result = TableReader::new(&fixture_path("empty.csv")).read();
    assert!(
        matches!(result, Err(IoError::EmptyDataset { .. })),
        "empty.csv should give EmptyDataset, got: {result:?}"
    );

    let result = TableReader::new(&fixture_path("jagged.csv")).read();
    assert!(
        matches!(result, Err(IoError::InconsistentRowLength { .. })),
        "jagged.csv should give InconsistentRowLength, got: {result:?}"
    );

    let result = TableReader::new(&fixture_path("missing.csv")).read();
    assert!(
        matches!(result, Err(IoError::MissingValue { ref column, .. }) if column == "namea"),
        "missing.csv should give MissingValue, got: {result:?}"
    );

    let table = TableReader::new(&fixture_path("unknown_label.csv")).read().unwrap();
    let result = FeatureSpec::default().split(&table);
    assert!(
        matches!(result, Err(IoError::UnknownLabel { row_index: 2, .. })),
        "unknown_label.csv should give UnknownLabel, got: {result:?}"
    );
}
