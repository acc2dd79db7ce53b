//! Functional tests for comparing mod directories against a baseline

use crate::common::TestFixture;
use d2rdiff::diff::{DiffState, EntryMismatch, FileReport, HeaderMismatch};
use d2rdiff::output::JsonFormatter;
use d2rdiff::{D2rDiffError, DiffEngine};
use std::fs;
use std::path::PathBuf;

fn setup() -> (TestFixture, PathBuf, PathBuf) {
    let fixture = TestFixture::new().unwrap();
    let baseline = fixture.dir("baseline").unwrap();
    let candidate = fixture.dir("mod").unwrap();
    (fixture, baseline, candidate)
}

#[test]
fn test_identical_directories_are_clean() {
    let (fixture, baseline, candidate) = setup();
    let rows: &[&[&str]] = &[&["Name", "Level"], &["Sword", "5"], &["Axe", "7"]];
    for dir in [&baseline, &candidate] {
        fixture.write_table(dir, "excel/weapons.txt", rows).unwrap();
        fixture.write_table(dir, "excel/armor.txt", &[&["Name", "AC"], &["Cap", "3"]]).unwrap();
    }

    let comparison = DiffEngine::default().compare(&baseline, &candidate).unwrap();

    assert_eq!(comparison.files.len(), 2);
    let summary = comparison.summary();
    assert_eq!(summary.files_compared, 2);
    assert!(summary.is_clean());
    for report in &comparison.files {
        let result = report.result().unwrap();
        assert_eq!(result.state(), DiffState::EntriesCompared);
        assert!(!result.has_differences());
    }
}

#[test]
fn test_file_without_baseline_counterpart() {
    let (fixture, baseline, candidate) = setup();
    fixture.write_table(&candidate, "excel/newtable.txt", &[&["Id", "Value"], &["1", "x"]]).unwrap();

    let comparison = DiffEngine::default().compare(&baseline, &candidate).unwrap();

    let result = comparison.report_for("excel/newtable.txt").unwrap().result().unwrap();
    assert!(!result.exists);
    assert_eq!(result.state(), DiffState::Missing);
    assert!(result.missing_headers.is_empty());
    assert!(matches!(
        comparison.report_for("excel/newtable.txt").unwrap().missing_reason(),
        Some(D2rDiffError::MissingComparisonFile { .. })
    ));
    assert_eq!(comparison.summary().missing_files, 1);
}

#[test]
fn test_header_set_differences_skip_entries() {
    let (fixture, baseline, candidate) = setup();
    fixture
        .write_table(&baseline, "misc.txt", &[&["Name", "Level", "Cost"], &["Gem", "1", "10"]])
        .unwrap();
    fixture
        .write_table(&candidate, "misc.txt", &[&["Name", "Cost", "Rarity"], &["Other", "5", "2"]])
        .unwrap();

    let comparison = DiffEngine::default().compare(&baseline, &candidate).unwrap();
    let result = comparison.report_for("misc.txt").unwrap().result().unwrap();

    assert_eq!(result.state(), DiffState::BadHeaders);
    assert_eq!(result.missing_headers, vec!["Level"]);
    assert_eq!(result.unknown_headers, vec!["Rarity"]);
    assert!(result.mismatched_headers.is_empty());
    assert!(result.missing_entries.is_empty());
    assert!(result.mismatched_entries.is_empty());
}

#[test]
fn test_reordered_headers_are_reported_by_position() {
    let (fixture, baseline, candidate) = setup();
    fixture
        .write_table(&baseline, "misc.txt", &[&["Name", "Level", "Cost"], &["Gem", "1", "10"]])
        .unwrap();
    fixture
        .write_table(&candidate, "misc.txt", &[&["Name", "Cost", "Level"], &["Gem", "1", "10"]])
        .unwrap();

    let comparison = DiffEngine::default().compare(&baseline, &candidate).unwrap();
    let result = comparison.report_for("misc.txt").unwrap().result().unwrap();

    assert_eq!(result.state(), DiffState::EntriesCompared);
    assert_eq!(
        result.mismatched_headers,
        vec![
            HeaderMismatch {
                position: 1,
                expected: "Level".to_string(),
                found: "Cost".to_string(),
            },
            HeaderMismatch {
                position: 2,
                expected: "Cost".to_string(),
                found: "Level".to_string(),
            },
        ]
    );
}

#[test]
fn test_missing_and_mismatched_entries() {
    let (fixture, baseline, candidate) = setup();
    fixture
        .write_table(
            &baseline,
            "excel/weapons.txt",
            &[&["Name", "Level", "Cost"], &["Sword", "5", "100"], &["Axe", "7", "120"], &["Bow", "3", "80"]],
        )
        .unwrap();
    fixture
        .write_table(
            &candidate,
            "excel/weapons.txt",
            &[&["Name", "Level", "Cost"], &["Sword", "5", "100"], &["Axe", "9", "120"], &["Spear", "4", "90"]],
        )
        .unwrap();

    let comparison = DiffEngine::default().compare(&baseline, &candidate).unwrap();
    let result = comparison.report_for("excel/weapons.txt").unwrap().result().unwrap();

    assert_eq!(result.missing_entries, vec!["Bow\t3\t80"]);
    assert_eq!(
        result.mismatched_entries,
        vec![EntryMismatch {
            baseline: "Axe\t7\t120".to_string(),
            candidate: "Axe\t9\t120".to_string(),
        }]
    );

    let summary = comparison.summary();
    assert_eq!(summary.missing_entries, 1);
    assert_eq!(summary.mismatched_entries, 1);
    assert!(!summary.is_clean());
}

#[test]
fn test_duplicate_candidate_keys_match_first_row() {
    let (fixture, baseline, candidate) = setup();
    fixture
        .write_table(&baseline, "dup.txt", &[&["Key", "Value"], &["a", "1"]])
        .unwrap();
    fixture
        .write_table(&candidate, "dup.txt", &[&["Key", "Value"], &["a", "2"], &["a", "1"]])
        .unwrap();

    let comparison = DiffEngine::default().compare(&baseline, &candidate).unwrap();
    let result = comparison.report_for("dup.txt").unwrap().result().unwrap();

    assert_eq!(result.mismatched_entries.len(), 1);
    assert_eq!(result.mismatched_entries[0].candidate, "a\t2");
}

#[test]
fn test_extra_candidate_rows_are_not_reported() {
    let (fixture, baseline, candidate) = setup();
    fixture.write_table(&baseline, "t.txt", &[&["Key", "Value"], &["a", "1"]]).unwrap();
    fixture
        .write_table(&candidate, "t.txt", &[&["Key", "Value"], &["a", "1"], &["b", "2"]])
        .unwrap();

    let comparison = DiffEngine::default().compare(&baseline, &candidate).unwrap();
    let result = comparison.report_for("t.txt").unwrap().result().unwrap();

    assert!(!result.has_differences());
}

#[test]
fn test_baseline_only_files_are_ignored() {
    let (fixture, baseline, candidate) = setup();
    fixture.write_table(&baseline, "only_base.txt", &[&["A", "B"], &["1", "2"]]).unwrap();
    fixture.write_table(&baseline, "shared.txt", &[&["A", "B"], &["1", "2"]]).unwrap();
    fixture.write_table(&candidate, "shared.txt", &[&["A", "B"], &["1", "2"]]).unwrap();
    fixture.write_raw(&candidate, "readme.md", "not a table").unwrap();

    let comparison = DiffEngine::default().compare(&baseline, &candidate).unwrap();

    let files: Vec<&str> = comparison.files.iter().map(FileReport::file).collect();
    assert_eq!(files, vec!["shared.txt"]);
}

#[test]
fn test_unreadable_baseline_file_does_not_abort() {
    let (fixture, baseline, candidate) = setup();
    // A directory where the baseline file should be cannot be read as a table
    fs::create_dir_all(baseline.join("broken.txt")).unwrap();
    fixture.write_table(&candidate, "broken.txt", &[&["A", "B"]]).unwrap();
    fixture.write_table(&baseline, "fine.txt", &[&["A", "B"], &["1", "2"]]).unwrap();
    fixture.write_table(&candidate, "fine.txt", &[&["A", "B"], &["1", "2"]]).unwrap();

    let comparison = DiffEngine::default().compare(&baseline, &candidate).unwrap();

    assert!(matches!(
        comparison.report_for("broken.txt"),
        Some(FileReport::Unreadable { .. })
    ));
    assert!(comparison.report_for("fine.txt").unwrap().result().is_some());
    assert_eq!(comparison.summary().unreadable, 1);
}

#[test]
fn test_compare_many_keeps_candidate_order_and_isolates_failures() {
    let (fixture, baseline, first) = setup();
    let second = fixture.dir("mod2").unwrap();
    let absent = fixture.root().join("does-not-exist");

    fixture.write_table(&baseline, "t.txt", &[&["Key", "Value"], &["a", "1"]]).unwrap();
    fixture.write_table(&first, "t.txt", &[&["Key", "Value"], &["a", "1"]]).unwrap();
    fixture.write_table(&second, "t.txt", &[&["Key", "Value"], &["a", "2"]]).unwrap();

    let results = DiffEngine::default().compare_many(
        &baseline,
        &[first.clone(), absent, second.clone()],
    );

    assert_eq!(results.len(), 3);
    let first_cmp = results[0].as_ref().unwrap();
    assert_eq!(first_cmp.candidate, first);
    assert!(first_cmp.summary().is_clean());
    assert!(results[1].is_err());
    let second_cmp = results[2].as_ref().unwrap();
    assert_eq!(second_cmp.candidate, second);
    assert_eq!(second_cmp.summary().mismatched_entries, 1);
}

#[test]
fn test_report_file_contains_per_file_results() {
    let (fixture, baseline, candidate) = setup();
    fixture.write_table(&baseline, "t.txt", &[&["Key", "Value"], &["a", "1"]]).unwrap();
    fixture.write_table(&candidate, "t.txt", &[&["Key", "Other"], &["a", "1"]]).unwrap();

    let comparison = DiffEngine::default().compare(&baseline, &candidate).unwrap();
    let report_path = fixture.workspace.report_path("mod");
    JsonFormatter::write_comparison(&comparison, &report_path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["files"][0]["file"], "t.txt");
    assert_eq!(json["files"][0]["missing_headers"][0], "Value");
    assert_eq!(json["files"][0]["unknown_headers"][0], "Other");
    assert_eq!(json["summary"]["files_compared"], 1);
}
