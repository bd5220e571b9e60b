//! Sync dispatch template tests over the mock adapter

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{Call, MockAdapter};
use sqlspec_drivers::{
    AdapterRegistry, DriverAdapter, OperationKind, ScriptOptions, Sql, SqlResult, SqlSpecError,
    StatementStatus, SyncDispatch, Value,
};

#[test]
fn test_select_routes_to_extract_selected() {
    let adapter = MockAdapter::new();
    let statement = Sql::new("SELECT * FROM users WHERE id = ?").with_param(1i64);
    let result = DriverAdapter::dispatch(&adapter, &statement).unwrap();

    assert_eq!(result.operation, Some(OperationKind::Single));
    assert_eq!(result.row_count(), 1);
    assert_eq!(
        result.column_names,
        Some(vec!["id".to_string(), "name".to_string()])
    );
    let calls = adapter.executed();
    assert!(matches!(&calls[0], Call::Single(sql, 1) if sql.contains("SELECT")));
}

#[test]
fn test_insert_routes_to_row_count() {
    let adapter = MockAdapter::new();
    let statement = Sql::new("INSERT INTO users (name) VALUES (?)").with_param("ann");
    let result = DriverAdapter::dispatch(&adapter, &statement).unwrap();

    assert_eq!(result.rows_affected, Some(1));
    assert!(result.rows.is_none());
}

#[test]
fn test_many_preserves_batch_order() {
    let adapter = MockAdapter::new();
    let statement = Sql::new("INSERT INTO t VALUES (?)")
        .as_many(vec![vec![Value::Int(1)], vec![Value::Int(2)], vec![Value::Int(3)]]);
    let result = DriverAdapter::dispatch(&adapter, &statement).unwrap();

    assert_eq!(result.operation, Some(OperationKind::Many));
    let calls = adapter.executed();
    assert!(matches!(&calls[0], Call::Many(_, 3)));
}

#[test]
fn test_script_collects_outcomes_with_continue_on_error() {
    let adapter = MockAdapter::new()
        .failing_on("BROKEN")
        .with_script_options(ScriptOptions::new().with_continue_on_error(true));
    let statement = Sql::new(
        "INSERT INTO t VALUES (1); INSERT INTO BROKEN VALUES (2); INSERT INTO t VALUES (3)",
    )
    .as_script();
    let result = DriverAdapter::dispatch(&adapter, &statement).unwrap();

    assert_eq!(result.statement_count, Some(3));
    let outcomes = result.statement_outcomes.unwrap();
    assert_eq!(outcomes[0].status, StatementStatus::Success);
    assert_eq!(outcomes[1].status, StatementStatus::Failed);
    assert_eq!(outcomes[2].status, StatementStatus::Success);
    assert!(outcomes[1].error.as_ref().unwrap().contains("mock failure"));
}

#[test]
fn test_script_stops_and_errors_by_default() {
    let adapter = MockAdapter::new().failing_on("BROKEN");
    let statement =
        Sql::new("INSERT INTO t VALUES (1); INSERT INTO BROKEN VALUES (2); INSERT INTO t VALUES (3)")
            .as_script();
    let err = DriverAdapter::dispatch(&adapter, &statement).unwrap_err();

    match err {
        SqlSpecError::Execution {
            operation_index, ..
        } => assert_eq!(operation_index, 1),
        other => panic!("unexpected error: {:?}", other),
    }
    // Third statement never ran
    let calls = adapter.executed();
    assert_eq!(
        calls
            .iter()
            .filter(|c| matches!(c, Call::Single(..)))
            .count(),
        1
    );
}

#[test]
fn test_special_handling_short_circuits() {
    let special = SqlResult::affected(OperationKind::Single, 99);
    let adapter = MockAdapter::new().with_special(special);
    let statement = Sql::new("SELECT * FROM t");
    let result = DriverAdapter::dispatch(&adapter, &statement).unwrap();

    assert_eq!(result.rows_affected, Some(99));
    assert!(adapter.executed().is_empty());
}

#[test]
fn test_cursor_released_on_success_and_failure() {
    let adapter = MockAdapter::new().failing_on("BROKEN");

    let ok = Sql::new("SELECT * FROM t");
    DriverAdapter::dispatch(&adapter, &ok).unwrap();
    assert_eq!(adapter.state.cursors_open.load(Ordering::SeqCst), 0);

    let bad = Sql::new("SELECT * FROM BROKEN");
    assert!(DriverAdapter::dispatch(&adapter, &bad).is_err());
    assert_eq!(adapter.state.cursors_open.load(Ordering::SeqCst), 0);
    assert_eq!(adapter.state.cursors_acquired.load(Ordering::SeqCst), 2);
}

#[test]
fn test_compile_errors_surface_before_cursor_acquisition() {
    let adapter = MockAdapter::new();
    let statement = Sql::new("SELECT FROM WHERE");
    let err = DriverAdapter::dispatch(&adapter, &statement).unwrap_err();

    assert!(matches!(err, SqlSpecError::Parse { .. }));
    assert_eq!(adapter.state.cursors_acquired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_execution_error_wraps_cause() {
    let adapter = MockAdapter::new().failing_on("BROKEN");
    let statement = Sql::new("UPDATE BROKEN SET a = ?").with_param(1i64);
    let err = DriverAdapter::dispatch(&adapter, &statement).unwrap_err();

    match err {
        SqlSpecError::Execution { sql, source, .. } => {
            assert!(sql.contains("BROKEN"));
            assert!(source.to_string().contains("mock failure"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_registry_round_trip() {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(MockAdapter::new()));

    assert!(registry.has("mock"));
    assert_eq!(registry.list(), vec!["mock"]);
    let adapter = registry.get("mock").unwrap();
    let result = adapter.execute(&Sql::new("SELECT 1")).unwrap();
    assert!(result.has_rows());
    assert!(registry.get("missing").is_none());
}
