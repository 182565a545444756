use std::fs;

use dbload::LoadError;
use dbload::store::{LoadOptions, Store};
use dbload::types::{ColumnSchema, ColumnType, Value};

fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
    data.iter()
        .map(|r| r.iter().map(|s| s.to_string()).collect())
        .collect()
}

fn select(store: &Store, sql: &str) -> Vec<Vec<Value>> {
    store.query(sql).unwrap().rows
}

#[test]
fn integers_round_trip() {
    let mut store = Store::open_in_memory().unwrap();
    let schema = vec![ColumnSchema::new("n", ColumnType::Integer)];
    let values = ["0", "-17", "42", "9223372036854775807", "-9223372036854775808"];
    let data: Vec<Vec<String>> = values.iter().map(|v| vec![v.to_string()]).collect();

    store.ensure_relation("ints", &schema).unwrap();
    let stats = store.insert_rows("ints", &schema, &data).unwrap();
    assert_eq!(stats.rows, values.len());
    assert_eq!(stats.coercion_fallbacks, 0);

    let got: Vec<Value> = select(&store, "SELECT n FROM ints ORDER BY rowid")
        .into_iter()
        .map(|mut r| r.remove(0))
        .collect();
    let want: Vec<Value> = values.iter().map(|v| Value::Integer(v.parse().unwrap())).collect();
    assert_eq!(got, want);
}

#[test]
fn short_rows_are_padded_with_nulls_and_long_rows_truncated() {
    let mut store = Store::open_in_memory().unwrap();
    let schema = vec![
        ColumnSchema::new("a", ColumnType::Text),
        ColumnSchema::new("b", ColumnType::Integer),
        ColumnSchema::new("c", ColumnType::Real),
    ];
    store.ensure_relation("t", &schema).unwrap();
    store
        .insert_rows("t", &schema, &rows(&[&["x"], &["y", "2", "1.5", "extra"]]))
        .unwrap();

    assert_eq!(
        select(&store, "SELECT a, b, c FROM t ORDER BY rowid"),
        vec![
            vec![Value::Text("x".into()), Value::Null, Value::Null],
            vec![Value::Text("y".into()), Value::Integer(2), Value::Real(1.5)],
        ]
    );
}

#[test]
fn unparsable_numbers_are_kept_as_original_text() {
    let mut store = Store::open_in_memory().unwrap();
    let schema = vec![ColumnSchema::new("amount", ColumnType::Integer)];
    store.ensure_relation("m", &schema).unwrap();
    let stats = store
        .insert_rows("m", &schema, &rows(&[&["10"], &["n/a"], &["3.9"], &[""]]))
        .unwrap();
    assert_eq!(stats.coercion_fallbacks, 1);

    assert_eq!(
        select(&store, "SELECT amount, typeof(amount) FROM m ORDER BY rowid"),
        vec![
            vec![Value::Integer(10), Value::Text("integer".into())],
            vec![Value::Text("n/a".into()), Value::Text("text".into())],
            vec![Value::Integer(3), Value::Text("integer".into())],
            vec![Value::Null, Value::Text("null".into())],
        ]
    );
}

#[test]
fn ensure_relation_twice_is_a_no_op() {
    let mut store = Store::open_in_memory().unwrap();
    let schema = vec![
        ColumnSchema::new("id", ColumnType::Integer),
        ColumnSchema::new("full name", ColumnType::Text),
    ];
    let first = store.ensure_relation("people", &schema).unwrap();
    store.insert_rows("people", &schema, &rows(&[&["1", "Ada"]])).unwrap();
    let second = store.ensure_relation("people", &schema).unwrap();

    assert_eq!(first, second);
    assert_eq!(store.tables().unwrap(), vec!["people"]);
    assert_eq!(
        store.table_columns("people").unwrap(),
        vec![
            ("id".to_string(), "INTEGER".to_string()),
            ("full_name".to_string(), "TEXT".to_string()),
        ]
    );
    assert_eq!(select(&store, "SELECT count(*) FROM people"), vec![vec![Value::Integer(1)]]);
}

#[test]
fn existing_relation_missing_columns_is_a_conflict() {
    let mut store = Store::open_in_memory().unwrap();
    store
        .ensure_relation("people", &[ColumnSchema::new("id", ColumnType::Integer)])
        .unwrap();
    let err = store
        .ensure_relation("people", &[
            ColumnSchema::new("id", ColumnType::Integer),
            ColumnSchema::new("email", ColumnType::Text),
        ])
        .unwrap_err();
    match err {
        LoadError::RelationConflict { relation, message } => {
            assert_eq!(relation, "people");
            assert!(message.contains("email"));
        }
        other => panic!("expected relation conflict, got {other:?}"),
    }
}

#[test]
fn failing_batch_rolls_back_the_whole_file() {
    let mut store = Store::open_in_memory()
        .unwrap()
        .with_options(LoadOptions { batch_size: 1_000 });
    store
        .query("CREATE TABLE nums (v INTEGER CHECK (v < 1500))")
        .unwrap();
    let schema = vec![ColumnSchema::new("v", ColumnType::Integer)];
    store.ensure_relation("nums", &schema).unwrap();

    let data: Vec<Vec<String>> = (0..2_000).map(|i| vec![i.to_string()]).collect();
    let err = store.insert_rows("nums", &schema, &data).unwrap_err();
    assert!(matches!(err, LoadError::LoadFailure { ref relation, .. } if relation == "nums"));

    // The first batch was complete when the second one failed; nothing is visible.
    assert_eq!(select(&store, "SELECT count(*) FROM nums"), vec![vec![Value::Integer(0)]]);
}

#[test]
fn batches_are_counted() {
    let mut store = Store::open_in_memory()
        .unwrap()
        .with_options(LoadOptions { batch_size: 2 });
    let schema = vec![ColumnSchema::new("v", ColumnType::Integer)];
    store.ensure_relation("b", &schema).unwrap();
    let stats = store
        .insert_rows("b", &schema, &rows(&[&["1"], &["2"], &["3"], &["4"], &["5"]]))
        .unwrap();
    assert_eq!(stats.rows, 5);
    assert_eq!(stats.batches, 3);
}

#[test]
fn zero_rows_insert_nothing() {
    let mut store = Store::open_in_memory().unwrap();
    let schema = vec![ColumnSchema::new("v", ColumnType::Integer)];
    store.ensure_relation("z", &schema).unwrap();
    let stats = store.insert_rows("z", &schema, &[]).unwrap();
    assert_eq!(stats.rows, 0);
    assert_eq!(stats.batches, 0);
}

#[test]
fn file_store_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.db");
    let schema = vec![ColumnSchema::new("v", ColumnType::Text)];
    {
        let mut store = Store::open(&path).unwrap();
        store.ensure_relation("kept", &schema).unwrap();
        store.insert_rows("kept", &schema, &rows(&[&["a"], &["b"]])).unwrap();
    }
    let store = Store::open(&path).unwrap();
    assert_eq!(store.path(), path.as_path());
    assert_eq!(select(&store, "SELECT count(*) FROM kept"), vec![vec![Value::Integer(2)]]);
}

#[test]
fn unopenable_store_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let err = Store::open(dir.path().join("missing").join("data.db")).unwrap_err();
    assert!(matches!(err, LoadError::StoreUnavailable { .. }));
    assert!(err.is_fatal());

    let not_a_db = dir.path().join("notes.db");
    fs::write(&not_a_db, "these are plain text notes, not a database file\n".repeat(40)).unwrap();
    let err = Store::open(&not_a_db).unwrap_err();
    assert!(matches!(err, LoadError::StoreUnavailable { .. }));
}
