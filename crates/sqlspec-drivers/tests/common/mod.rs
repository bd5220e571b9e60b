//! In-memory mock adapter shared by the dispatch tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use sqlspec_drivers::{
    AsyncDriverAdapter, DriverAdapter, HookResult, Row, ScriptOptions, Sql, SqlResult,
    TypedParameter, Value,
};

/// One recorded hook invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Begin,
    Commit,
    Rollback,
    Single(String, usize),
    Many(String, usize),
}

#[derive(Default)]
pub struct MockState {
    pub calls: Mutex<Vec<Call>>,
    pub cursors_open: AtomicUsize,
    pub cursors_acquired: AtomicUsize,
}

/// A driver adapter over an in-memory call log.
pub struct MockAdapter {
    pub state: Arc<MockState>,
    /// Rows returned by `extract_selected`
    pub rows: Vec<Row>,
    pub row_count: u64,
    /// Fail any statement containing this marker
    pub fail_marker: Option<String>,
    /// Short-circuit result for `try_special_handling`
    pub special: Option<SqlResult>,
    pub script_options: ScriptOptions,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState::default()),
            rows: vec![Row::new(
                vec!["id".to_string(), "name".to_string()],
                vec![Value::Int(1), Value::Text("ann".into())],
            )],
            row_count: 1,
            fail_marker: None,
            special: None,
            script_options: ScriptOptions::default(),
        }
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn with_script_options(mut self, options: ScriptOptions) -> Self {
        self.script_options = options;
        self
    }

    pub fn with_special(mut self, result: SqlResult) -> Self {
        self.special = Some(result);
        self
    }

    pub fn executed(&self) -> Vec<Call> {
        self.state.calls.lock().clone()
    }

    fn check_failure(&self, sql: &str) -> HookResult<()> {
        if let Some(marker) = &self.fail_marker {
            if sql.contains(marker.as_str()) {
                anyhow::bail!("mock failure on: {}", sql);
            }
        }
        Ok(())
    }

    fn record_single(&self, sql: &str, parameters: &[TypedParameter]) -> HookResult<()> {
        self.check_failure(sql)?;
        self.state
            .calls
            .lock()
            .push(Call::Single(sql.to_string(), parameters.len()));
        Ok(())
    }

    fn record_many(&self, sql: &str, batches: &[Vec<TypedParameter>]) -> HookResult<()> {
        self.check_failure(sql)?;
        self.state
            .calls
            .lock()
            .push(Call::Many(sql.to_string(), batches.len()));
        Ok(())
    }
}

pub struct MockCursor {
    state: Arc<MockState>,
}

impl MockCursor {
    fn open(state: Arc<MockState>) -> Self {
        state.cursors_open.fetch_add(1, Ordering::SeqCst);
        state.cursors_acquired.fetch_add(1, Ordering::SeqCst);
        Self { state }
    }

    fn close(self) {
        self.state.cursors_open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DriverAdapter for MockAdapter {
    type Cursor = MockCursor;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn script_options(&self) -> ScriptOptions {
        self.script_options.clone()
    }

    fn with_cursor(&self) -> HookResult<MockCursor> {
        Ok(MockCursor::open(self.state.clone()))
    }

    fn release_cursor(&self, cursor: MockCursor) -> HookResult<()> {
        cursor.close();
        Ok(())
    }

    fn begin(&self, _cursor: &mut MockCursor) -> HookResult<()> {
        self.state.calls.lock().push(Call::Begin);
        Ok(())
    }

    fn commit(&self, _cursor: &mut MockCursor) -> HookResult<()> {
        self.state.calls.lock().push(Call::Commit);
        Ok(())
    }

    fn rollback(&self, _cursor: &mut MockCursor) -> HookResult<()> {
        self.state.calls.lock().push(Call::Rollback);
        Ok(())
    }

    fn try_special_handling(
        &self,
        _cursor: &mut MockCursor,
        _statement: &Sql,
    ) -> HookResult<Option<SqlResult>> {
        Ok(self.special.clone())
    }

    fn execute_single(
        &self,
        _cursor: &mut MockCursor,
        sql: &str,
        parameters: &[TypedParameter],
    ) -> HookResult<()> {
        self.record_single(sql, parameters)
    }

    fn execute_many(
        &self,
        _cursor: &mut MockCursor,
        sql: &str,
        batches: &[Vec<TypedParameter>],
    ) -> HookResult<()> {
        self.record_many(sql, batches)
    }

    fn extract_selected(
        &self,
        _cursor: &mut MockCursor,
    ) -> HookResult<(Vec<Row>, Vec<String>, u64)> {
        let columns = vec!["id".to_string(), "name".to_string()];
        Ok((self.rows.clone(), columns, self.rows.len() as u64))
    }

    fn extract_row_count(&self, _cursor: &mut MockCursor) -> HookResult<u64> {
        Ok(self.row_count)
    }
}

#[async_trait::async_trait]
impl AsyncDriverAdapter for MockAdapter {
    type Cursor = MockCursor;

    fn name(&self) -> &'static str {
        "mock-async"
    }

    fn script_options(&self) -> ScriptOptions {
        self.script_options.clone()
    }

    async fn with_cursor(&self) -> HookResult<MockCursor> {
        Ok(MockCursor::open(self.state.clone()))
    }

    async fn release_cursor(&self, cursor: MockCursor) -> HookResult<()> {
        cursor.close();
        Ok(())
    }

    async fn begin(&self, _cursor: &mut MockCursor) -> HookResult<()> {
        self.state.calls.lock().push(Call::Begin);
        Ok(())
    }

    async fn commit(&self, _cursor: &mut MockCursor) -> HookResult<()> {
        self.state.calls.lock().push(Call::Commit);
        Ok(())
    }

    async fn rollback(&self, _cursor: &mut MockCursor) -> HookResult<()> {
        self.state.calls.lock().push(Call::Rollback);
        Ok(())
    }

    async fn try_special_handling(
        &self,
        _cursor: &mut MockCursor,
        _statement: &Sql,
    ) -> HookResult<Option<SqlResult>> {
        Ok(self.special.clone())
    }

    async fn execute_single(
        &self,
        _cursor: &mut MockCursor,
        sql: &str,
        parameters: &[TypedParameter],
    ) -> HookResult<()> {
        self.record_single(sql, parameters)
    }

    async fn execute_many(
        &self,
        _cursor: &mut MockCursor,
        sql: &str,
        batches: &[Vec<TypedParameter>],
    ) -> HookResult<()> {
        self.record_many(sql, batches)
    }

    async fn extract_selected(
        &self,
        _cursor: &mut MockCursor,
    ) -> HookResult<(Vec<Row>, Vec<String>, u64)> {
        let columns = vec!["id".to_string(), "name".to_string()];
        Ok((self.rows.clone(), columns, self.rows.len() as u64))
    }

    async fn extract_row_count(&self, _cursor: &mut MockCursor) -> HookResult<u64> {
        Ok(self.row_count)
    }
}
