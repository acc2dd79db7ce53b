//! Edge case tests for unusual file contents and layouts

use crate::common::TestFixture;
use d2rdiff::diff::DiffState;
use d2rdiff::table::{list_table_files, read_rows};
use d2rdiff::DiffEngine;

#[test]
fn test_empty_files_have_no_headers() {
    let fixture = TestFixture::new().unwrap();
    let baseline = fixture.dir("baseline").unwrap();
    let candidate = fixture.dir("mod").unwrap();
    fixture.write_raw(&baseline, "empty.txt", "").unwrap();
    fixture.write_raw(&candidate, "empty.txt", "").unwrap();

    let comparison = DiffEngine::default().compare(&baseline, &candidate).unwrap();
    let result = comparison.report_for("empty.txt").unwrap().result().unwrap();

    assert!(result.baseline_headers.is_empty());
    assert_eq!(result.state(), DiffState::EntriesCompared);
    assert!(!result.has_differences());
}

#[test]
fn test_empty_candidate_against_populated_baseline() {
    let fixture = TestFixture::new().unwrap();
    let baseline = fixture.dir("baseline").unwrap();
    let candidate = fixture.dir("mod").unwrap();
    fixture.write_table(&baseline, "t.txt", &[&["A", "B"], &["1", "2"]]).unwrap();
    fixture.write_raw(&candidate, "t.txt", "").unwrap();

    let comparison = DiffEngine::default().compare(&baseline, &candidate).unwrap();
    let result = comparison.report_for("t.txt").unwrap().result().unwrap();

    assert_eq!(result.missing_headers, vec!["A", "B"]);
    assert_eq!(result.state(), DiffState::BadHeaders);
}

#[test]
fn test_trailing_empty_fields_are_kept() {
    let fixture = TestFixture::new().unwrap();
    let dir = fixture.dir("data").unwrap();
    let path = fixture.write_raw(&dir, "t.txt", "A\tB\tC\r\nx\t\t\r\n").unwrap();

    let rows = read_rows(&path).unwrap();
    assert_eq!(rows[0], vec!["A", "B", "C"]);
    assert_eq!(rows[1], vec!["x", "", ""]);
}

#[test]
fn test_invalid_utf8_is_replaced() {
    let fixture = TestFixture::new().unwrap();
    let dir = fixture.dir("data").unwrap();
    let path = dir.join("latin1.txt");
    std::fs::write(&path, b"Name\tText\nk\tcaf\xe9\n").unwrap();

    let rows = read_rows(&path).unwrap();
    assert_eq!(rows[1][0], "k");
    assert!(rows[1][1].starts_with("caf"));
}

#[test]
fn test_uppercase_extension_is_listed() {
    let fixture = TestFixture::new().unwrap();
    let dir = fixture.dir("data").unwrap();
    fixture.write_raw(&dir, "b/Weapons.TXT", "A\tB\n").unwrap();
    fixture.write_raw(&dir, "a/armor.txt", "A\tB\n").unwrap();
    fixture.write_raw(&dir, "a/panel.sprite", "binary").unwrap();

    let files = list_table_files(&dir, "txt").unwrap();
    assert_eq!(files, vec!["a/armor.txt", "b/Weapons.TXT"]);
}

#[test]
fn test_key_only_rows_compare_as_equal() {
    let fixture = TestFixture::new().unwrap();
    let baseline = fixture.dir("baseline").unwrap();
    let candidate = fixture.dir("mod").unwrap();
    fixture.write_table(&baseline, "t.txt", &[&["Key", "Value"], &["a"]]).unwrap();
    fixture.write_table(&candidate, "t.txt", &[&["Key", "Value"], &["a"]]).unwrap();

    let comparison = DiffEngine::default().compare(&baseline, &candidate).unwrap();
    assert!(comparison.summary().is_clean());
}
