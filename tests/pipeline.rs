use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dbload::LoadError;
use dbload::observability::{FileContext, PipelineObserver, Severity};
use dbload::pipeline::{FileOutcome, FileState, Pipeline, PipelineOptions};
use dbload::reconcile::{
    AcceptAll, HeaderDecision, HeaderProposal, Reconciler, SchemaDecision, ScriptedAnswers, ScriptedReconciler,
};
use dbload::store::{LoadStats, Store};
use dbload::types::{ColumnSchema, DetectedFormat, Value};

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<(PathBuf, usize)>>,
    failures: Mutex<Vec<(PathBuf, Severity, FileState)>>,
    alerts: Mutex<Vec<Severity>>,
}

impl PipelineObserver for RecordingObserver {
    fn on_success(&self, ctx: &FileContext, stats: LoadStats) {
        self.successes.lock().unwrap().push((ctx.path.clone(), stats.rows));
    }

    fn on_failure(&self, ctx: &FileContext, severity: Severity, _error: &LoadError) {
        self.failures
            .lock()
            .unwrap()
            .push((ctx.path.clone(), severity, ctx.state));
    }

    fn on_alert(&self, _ctx: &FileContext, severity: Severity, _error: &LoadError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

/// Replaces every header proposal with `names` and aborts files whose name is in `abort`.
struct FixedReconciler {
    names: Option<Vec<String>>,
    abort: Vec<&'static str>,
}

impl Reconciler for FixedReconciler {
    fn confirm_headers(&mut self, _proposal: &HeaderProposal<'_>) -> dbload::LoadResult<HeaderDecision> {
        Ok(match &self.names {
            Some(names) => HeaderDecision::Replace(names.clone()),
            None => HeaderDecision::Accept,
        })
    }

    fn confirm_schema(
        &mut self,
        path: &Path,
        _schema: &[ColumnSchema],
        _format: DetectedFormat,
    ) -> dbload::LoadResult<SchemaDecision> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        Ok(if self.abort.iter().any(|a| *a == name) {
            SchemaDecision::Abort
        } else {
            SchemaDecision::Accept
        })
    }
}

fn fixture(name: &str) -> PathBuf {
    Path::new("tests/fixtures").join(name)
}

fn select(store: &Store, sql: &str) -> Vec<Vec<Value>> {
    store.query(sql).unwrap().rows
}

#[test]
fn failing_file_does_not_stop_the_run() {
    let mut store = Store::open_in_memory().unwrap();
    let obs = Arc::new(RecordingObserver::default());
    let options = PipelineOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: Severity::Error,
        ..Default::default()
    };

    let files = [fixture("lonely.log"), fixture("people.csv"), fixture("does_not_exist.csv")];
    let summary = Pipeline::new(&mut store, AcceptAll, options).run(&files);

    assert_eq!(summary.reports.len(), 3);
    assert_eq!(summary.loaded(), 1);
    assert_eq!(summary.rows(), 3);
    assert!(matches!(summary.reports[0].error(), Some(LoadError::Format { .. })));
    assert!(matches!(summary.reports[2].error(), Some(LoadError::Io(_))));
    match &summary.reports[1].outcome {
        FileOutcome::Loaded { relation, stats } => {
            assert_eq!(relation, "people");
            assert_eq!(stats.rows, 3);
        }
        other => panic!("expected people.csv to load, got {other:?}"),
    }

    let failures = obs.failures.lock().unwrap().clone();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].1, Severity::Warning);
    assert_eq!(failures[0].2, FileState::Detecting);
    assert_eq!(failures[1].1, Severity::Error);
    assert_eq!(*obs.alerts.lock().unwrap(), vec![Severity::Error]);
    assert_eq!(obs.successes.lock().unwrap().len(), 1);

    assert_eq!(
        select(&store, "SELECT id, name, age, score FROM people WHERE id = 3"),
        vec![vec![
            Value::Integer(3),
            Value::Text("Grace Hopper".into()),
            Value::Integer(85),
            Value::Null,
        ]]
    );
    assert_eq!(store.table_columns("people").unwrap()[3].1, "REAL");
}

#[test]
fn abort_skips_only_that_file() {
    let mut store = Store::open_in_memory().unwrap();
    let reconciler = FixedReconciler {
        names: None,
        abort: vec!["orders.json"],
    };
    let files = [fixture("orders.json"), fixture("events.ndjson")];
    let summary = Pipeline::new(&mut store, reconciler, PipelineOptions::default())
        .run(&files);

    match &summary.reports[0].outcome {
        FileOutcome::Failed { state, error } => {
            assert_eq!(*state, FileState::SchemaProposed);
            assert!(matches!(error, LoadError::Aborted { .. }));
        }
        other => panic!("expected abort, got {other:?}"),
    }
    assert!(summary.reports[1].is_loaded());
    assert_eq!(store.tables().unwrap(), vec!["events"]);
}

#[test]
fn replaced_headers_turn_the_header_row_into_data() {
    let mut store = Store::open_in_memory().unwrap();
    let reconciler = FixedReconciler {
        names: Some(vec!["item".into(), "cost".into(), "count".into()]),
        abort: Vec::new(),
    };
    let summary = Pipeline::new(&mut store, reconciler, PipelineOptions::default())
        .run(&[fixture("prices.data")]);
    assert_eq!(summary.rows(), 3);

    // "price" is one non-numeric value out of three, below the numeric threshold.
    assert_eq!(
        select(&store, "SELECT item, cost FROM prices ORDER BY rowid LIMIT 1"),
        vec![vec![Value::Text("item".into()), Value::Text("price".into())]]
    );
}

#[test]
fn header_replacement_of_wrong_length_is_a_schema_error() {
    let mut store = Store::open_in_memory().unwrap();
    let reconciler = FixedReconciler {
        names: Some(vec!["only_one".into()]),
        abort: Vec::new(),
    };
    let summary = Pipeline::new(&mut store, reconciler, PipelineOptions::default())
        .run(&[fixture("people.csv")]);
    assert!(matches!(summary.reports[0].error(), Some(LoadError::Schema { .. })));
    assert!(store.tables().unwrap().is_empty());
}

#[test]
fn scripted_answers_override_schema_and_table() {
    let answers = ScriptedAnswers::from_json(
        r#"{"files": {"people.csv": {
            "schema": {"override": [{"index": 0, "type": "TEXT"}, {"index": 1, "name": "full_name"}]},
            "table": "staff"
        }}}"#,
    )
    .unwrap();
    let mut store = Store::open_in_memory().unwrap();
    let summary = Pipeline::new(&mut store, ScriptedReconciler::new(answers), PipelineOptions::default())
        .run(&[fixture("people.csv")]);
    assert_eq!(summary.loaded(), 1);

    let columns = store.table_columns("staff").unwrap();
    assert_eq!(columns[0], ("id".to_string(), "TEXT".to_string()));
    assert_eq!(columns[1].0, "full_name");
    assert_eq!(
        select(&store, "SELECT id FROM staff ORDER BY rowid LIMIT 1"),
        vec![vec![Value::Text("1".into())]]
    );
}

#[test]
fn sanitized_name_collision_fails_before_touching_the_store() {
    let mut store = Store::open_in_memory().unwrap();
    let summary = Pipeline::new(&mut store, AcceptAll, PipelineOptions::default())
        .run(&[fixture("clashing.csv")]);
    match &summary.reports[0].outcome {
        FileOutcome::Failed { state, error } => {
            assert_eq!(*state, FileState::Reconciled);
            assert!(error.to_string().contains("first_name"));
        }
        other => panic!("expected schema error, got {other:?}"),
    }
    assert!(store.tables().unwrap().is_empty());
}

#[test]
fn names_differing_only_in_case_collide() {
    let mut store = Store::open_in_memory().unwrap();
    let summary = Pipeline::new(&mut store, AcceptAll, PipelineOptions::default())
        .run(&[fixture("case_clash.csv")]);
    match &summary.reports[0].outcome {
        FileOutcome::Failed { state, error } => {
            assert_eq!(*state, FileState::Reconciled);
            assert!(matches!(error, LoadError::Schema { .. }));
        }
        other => panic!("expected schema error, got {other:?}"),
    }
    assert!(store.tables().unwrap().is_empty());
}

#[test]
fn fixed_table_appends_compatible_files_and_rejects_conflicts() {
    let mut store = Store::open_in_memory().unwrap();
    let options = PipelineOptions {
        table: Some("all rows".into()),
        ..Default::default()
    };
    let files = [fixture("people.csv"), fixture("people.csv"), fixture("orders.json")];
    let summary = Pipeline::new(&mut store, AcceptAll, options).run(&files);

    assert_eq!(summary.loaded(), 2);
    match &summary.reports[2].outcome {
        FileOutcome::Failed { state, error } => {
            assert_eq!(*state, FileState::Reconciled);
            assert!(matches!(error, LoadError::RelationConflict { .. }));
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(select(&store, "SELECT count(*) FROM all_rows"), vec![vec![Value::Integer(6)]]);
}

#[test]
fn empty_file_is_skipped_with_a_warning() {
    let mut store = Store::open_in_memory().unwrap();
    let obs = Arc::new(RecordingObserver::default());
    let options = PipelineOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    };
    let summary = Pipeline::new(&mut store, AcceptAll, options)
        .run(&[fixture("empty.csv")]);
    assert_eq!(summary.failed(), 1);
    assert_eq!(obs.failures.lock().unwrap()[0].1, Severity::Warning);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn coercion_fallbacks_are_reported() {
    let mut store = Store::open_in_memory().unwrap();
    let summary = Pipeline::new(&mut store, AcceptAll, PipelineOptions::default())
        .run(&[fixture("mixed.csv")]);
    match &summary.reports[0].outcome {
        FileOutcome::Loaded { stats, .. } => {
            assert_eq!(stats.rows, 6);
            assert_eq!(stats.coercion_fallbacks, 1);
        }
        other => panic!("expected load, got {other:?}"),
    }
    assert_eq!(
        select(&store, "SELECT amount FROM mixed WHERE code IN ('b', 'f') ORDER BY code"),
        vec![vec![Value::Text("n/a".into())], vec![Value::Null]]
    );
}

#[test]
fn whitespace_text_loads_with_quoted_values() {
    let mut store = Store::open_in_memory().unwrap();
    Pipeline::new(&mut store, AcceptAll, PipelineOptions::default())
        .run(&[fixture("measurements.txt")]);
    assert_eq!(
        select(&store, "SELECT station, reading, site_name FROM measurements ORDER BY rowid"),
        vec![
            vec![Value::Text("A1".into()), Value::Real(12.5), Value::Text("North Field".into())],
            vec![Value::Text("B2".into()), Value::Real(13.0), Value::Text("East Ridge".into())],
        ]
    );
}

#[test]
fn store_failure_stops_the_run_and_keeps_earlier_reports() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("broken.db");
    let mut store = Store::open(&db).unwrap();
    // Replace the (still empty) database with bytes SQLite will not accept as a header.
    std::fs::write(&db, vec![b'x'; 4096]).unwrap();

    let obs = Arc::new(RecordingObserver::default());
    let options = PipelineOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    };
    let files = [fixture("lonely.log"), fixture("people.csv"), fixture("orders.json")];
    let summary = Pipeline::new(&mut store, AcceptAll, options).run(&files);

    assert!(summary.stopped);
    assert_eq!(summary.reports.len(), 2);
    assert!(matches!(summary.reports[0].error(), Some(LoadError::Format { .. })));
    assert!(matches!(summary.fatal_error(), Some(LoadError::StoreUnavailable { .. })));
    assert_eq!(summary.reports[1].path, fixture("people.csv"));
    assert_eq!(*obs.alerts.lock().unwrap(), vec![Severity::Critical]);
}

#[test]
fn completed_run_has_no_fatal_error() {
    let mut store = Store::open_in_memory().unwrap();
    let summary = Pipeline::new(&mut store, AcceptAll, PipelineOptions::default()).run(&[fixture("people.csv")]);
    assert!(!summary.stopped);
    assert!(summary.fatal_error().is_none());
}
