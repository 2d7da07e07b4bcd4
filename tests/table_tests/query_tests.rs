//! Tests for query routing
//!
//! These tests verify:
//! - Indexed point and range queries go through the B+Tree
//! - Unindexed queries scan the data file (stopping early when unique)
//! - Range queries on unindexed columns are refused

use plankdb::btree::TreeOptions;
use plankdb::table::{DataType, Schema, Table, Value};
use plankdb::PlankError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn people_schema() -> Schema {
    Schema::builder("people")
        .indexed_column("score", DataType::Int64)
        .column("name", DataType::String(16))
        .add_column("email", DataType::String(24), false, true)
        .column("age", DataType::Int32)
        .build()
        .unwrap()
}

fn open_people(temp: &TempDir) -> Table {
    let options = TreeOptions {
        order: Some(4),
        ..TreeOptions::default()
    };
    Table::open(temp.path(), people_schema(), &options).unwrap()
}

fn row(score: i64, name: &str, age: i32) -> Vec<Value> {
    vec![
        Value::Int64(score),
        Value::from(name),
        Value::Text(format!("{}@example.com", name)),
        Value::Int32(age),
    ]
}

/// The five-row table used by most tests
fn five_rows(table: &mut Table) {
    for (score, name, age) in [
        (300, "ann", 31),
        (100, "bob", 25),
        (500, "cat", 31),
        (200, "dan", 40),
        (400, "eve", 31),
    ] {
        table.insert(row(score, name, age)).unwrap();
    }
}

// =============================================================================
// Indexed Query Tests
// =============================================================================

#[test]
fn test_indexed_present_absent_and_full_range() {
    let temp = TempDir::new().unwrap();
    let mut table = open_people(&temp);
    five_rows(&mut table);

    let present = table.query("score", &Value::Int64(200)).unwrap();
    assert_eq!(present.len(), 1);
    assert_eq!(table.get(&present[0], "name").unwrap(), Value::from("dan"));

    assert!(table.query("score", &Value::Int64(250)).unwrap().is_empty());

    let all = table
        .range_query("score", &Value::Int64(100), &Value::Int64(500))
        .unwrap();
    assert_eq!(all.len(), 5);

    // Ascending by score
    let names: Vec<Value> = all.iter().map(|h| table.get(h, "name").unwrap()).collect();
    assert_eq!(
        names,
        ["bob", "dan", "ann", "eve", "cat"].map(Value::from).to_vec()
    );
}

#[test]
fn test_query_by_id() {
    let temp = TempDir::new().unwrap();
    let mut table = open_people(&temp);
    five_rows(&mut table);

    let third = table.query("id", &Value::Int64(3)).unwrap();
    assert_eq!(third.len(), 1);
    assert_eq!(table.get(&third[0], "name").unwrap(), Value::from("cat"));

    let middle = table
        .range_query("id", &Value::Int64(2), &Value::Int64(4))
        .unwrap();
    let ids: Vec<Value> = middle.iter().map(|h| table.get(h, "id").unwrap()).collect();
    assert_eq!(ids, vec![Value::Int64(2), Value::Int64(3), Value::Int64(4)]);
}

#[test]
fn test_indexed_duplicates_return_every_row() {
    let temp = TempDir::new().unwrap();
    let mut table = open_people(&temp);
    for i in 0..12 {
        table.insert(row(7, &format!("p{}", i), i)).unwrap();
    }

    let handles = table.query("score", &Value::Int64(7)).unwrap();
    let ages: Vec<Value> = handles.iter().map(|h| table.get(h, "age").unwrap()).collect();
    assert_eq!(ages, (0..12).map(Value::Int32).collect::<Vec<_>>());
}

// =============================================================================
// Scan Query Tests
// =============================================================================

#[test]
fn test_unindexed_scan_returns_all_matches() {
    let temp = TempDir::new().unwrap();
    let mut table = open_people(&temp);
    five_rows(&mut table);

    let thirty_one = table.query("age", &Value::Int32(31)).unwrap();
    let names: Vec<Value> = thirty_one.iter().map(|h| table.get(h, "name").unwrap()).collect();
    assert_eq!(names, ["ann", "cat", "eve"].map(Value::from).to_vec());

    assert!(table.query("name", &Value::from("zoe")).unwrap().is_empty());
}

#[test]
fn test_unique_scan_stops_at_first_match() {
    let temp = TempDir::new().unwrap();
    let mut table = open_people(&temp);
    five_rows(&mut table);

    // A second row with the same email: unique columns assume there is none
    let dup = table.insert(row(600, "ann", 50)).unwrap();

    let found = table
        .query("email", &Value::from("ann@example.com"))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_ne!(found[0], dup);
    assert_eq!(table.get(&found[0], "id").unwrap(), Value::Int64(1));
}

#[test]
fn test_range_on_unindexed_column_refused() {
    let temp = TempDir::new().unwrap();
    let mut table = open_people(&temp);
    five_rows(&mut table);

    let result = table.range_query("age", &Value::Int32(0), &Value::Int32(100));
    assert!(matches!(result, Err(PlankError::Contract(_))));
}

#[test]
fn test_query_errors() {
    let temp = TempDir::new().unwrap();
    let mut table = open_people(&temp);
    five_rows(&mut table);

    assert!(matches!(
        table.query("nope", &Value::Int32(1)),
        Err(PlankError::ColumnNotFound { .. })
    ));
    assert!(matches!(
        table.query("score", &Value::Int32(1)),
        Err(PlankError::SchemaViolation(_))
    ));
    assert!(matches!(
        table.range_query("score", &Value::Int64(1), &Value::from("x")),
        Err(PlankError::SchemaViolation(_))
    ));
}
