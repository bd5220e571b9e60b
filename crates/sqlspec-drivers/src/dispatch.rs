//! Synchronous driver dispatch template
//!
//! Adapter authors implement the cursor and execution hooks; the trait's
//! provided `dispatch` routes a compiled statement through them, extracts
//! results, and guarantees cursor release on every exit path. Compilation
//! always happens before a cursor is acquired.

use std::time::Instant;

use sqlspec_core::events::{Event, EventKind, hub};
use sqlspec_core::fingerprint::hash_str;
use sqlspec_core::{
    CompiledSql, OperationKind, ParameterStyle, Result, Row, Sql, SqlProcessor, SqlResult,
    SqlSpecError, StatementOutcome, StatementStatus, TypedParameter, split_script,
};
use uuid::Uuid;

use crate::script::ScriptOptions;

/// Result type for adapter hooks; causes are wrapped into
/// [`SqlSpecError::Execution`] by the template.
pub type HookResult<T> = anyhow::Result<T>;

pub(crate) fn execution_error(sql: &str, operation_index: usize, cause: anyhow::Error) -> SqlSpecError {
    SqlSpecError::Execution {
        sql: sql.to_string(),
        operation_index,
        source: cause,
    }
}

/// Synchronous database adapter.
///
/// Implement the hooks; `dispatch` is the template and should not be
/// overridden.
pub trait DriverAdapter: Send + Sync {
    type Cursor;

    /// Adapter identifier (e.g. "postgres", "sqlite")
    fn name(&self) -> &'static str;

    /// The processor used for compilation.
    fn processor(&self) -> &SqlProcessor {
        SqlProcessor::global()
    }

    /// The placeholder style this driver wants; `None` defers to the
    /// statement's configured default.
    fn default_style(&self) -> Option<ParameterStyle> {
        None
    }

    fn script_options(&self) -> ScriptOptions {
        ScriptOptions::default()
    }

    // -- cursor and transaction hooks ------------------------------------

    /// Acquire a cursor. Paired with `release_cursor` on all exit paths.
    fn with_cursor(&self) -> HookResult<Self::Cursor>;

    /// Release a cursor. The default drop is enough for most drivers.
    fn release_cursor(&self, cursor: Self::Cursor) -> HookResult<()> {
        drop(cursor);
        Ok(())
    }

    fn begin(&self, cursor: &mut Self::Cursor) -> HookResult<()>;

    fn commit(&self, cursor: &mut Self::Cursor) -> HookResult<()>;

    fn rollback(&self, cursor: &mut Self::Cursor) -> HookResult<()>;

    // -- execution hooks -------------------------------------------------

    /// Database-specific short-circuit (e.g. COPY). `None` falls through
    /// to the standard path.
    fn try_special_handling(
        &self,
        _cursor: &mut Self::Cursor,
        _statement: &Sql,
    ) -> HookResult<Option<SqlResult>> {
        Ok(None)
    }

    fn execute_single(
        &self,
        cursor: &mut Self::Cursor,
        sql: &str,
        parameters: &[TypedParameter],
    ) -> HookResult<()>;

    fn execute_many(
        &self,
        cursor: &mut Self::Cursor,
        sql: &str,
        batches: &[Vec<TypedParameter>],
    ) -> HookResult<()>;

    /// Execute a multi-statement script.
    ///
    /// The default splits on statement boundaries and runs each part
    /// through `execute_single` without parameters; parameterized scripts
    /// are expected to compile statically. Drivers with native script
    /// support override this.
    fn execute_script(
        &self,
        cursor: &mut Self::Cursor,
        compiled: &CompiledSql,
        options: &ScriptOptions,
    ) -> HookResult<Vec<StatementOutcome>> {
        let statements = split_script(&compiled.sql);
        let mut outcomes = Vec::with_capacity(statements.len());
        let mut failed = false;
        for (index, sql) in statements.into_iter().enumerate() {
            if failed && !options.continue_on_error {
                outcomes.push(StatementOutcome::skipped(index, sql));
                continue;
            }
            match self.execute_single(cursor, &sql, &[]) {
                Ok(()) => {
                    let rows_affected = self.extract_row_count(cursor).ok();
                    outcomes.push(StatementOutcome::success(index, sql, rows_affected));
                }
                Err(error) => {
                    failed = true;
                    outcomes.push(StatementOutcome::failed(index, sql, error.to_string()));
                }
            }
        }
        Ok(outcomes)
    }

    /// Pull rows, column names, and the row count off the cursor.
    fn extract_selected(
        &self,
        cursor: &mut Self::Cursor,
    ) -> HookResult<(Vec<Row>, Vec<String>, u64)>;

    fn extract_row_count(&self, cursor: &mut Self::Cursor) -> HookResult<u64>;

    // -- template --------------------------------------------------------

    /// Compile and execute a statement, producing a normalized result.
    fn dispatch(&self, statement: &Sql) -> Result<SqlResult>
    where
        Self: Sized,
    {
        let started = Instant::now();
        let sql_fingerprint = hash_str(statement.text());
        let correlation_id = Uuid::new_v4();
        let events = hub();

        let compiled = self.processor().compile(statement, self.default_style())?;

        events.emit_with(|| {
            Event::new(EventKind::ExecuteStart, sql_fingerprint)
                .with_correlation_id(correlation_id)
                .with_driver(self.name())
                .with_operation(statement.kind())
                .with_parameter_count(compiled.parameters.count())
        });

        let result = self.run_with_cursor(statement, &compiled);

        match &result {
            Ok(_) => events.emit_with(|| {
                Event::new(EventKind::ExecuteComplete, sql_fingerprint)
                    .with_correlation_id(correlation_id)
                    .with_driver(self.name())
                    .with_operation(statement.kind())
            }),
            Err(error) => events.emit_with(|| {
                Event::new(EventKind::ExecuteError, sql_fingerprint)
                    .with_correlation_id(correlation_id)
                    .with_driver(self.name())
                    .with_operation(statement.kind())
                    .with_error(error.to_string())
            }),
        }
        events.emit_with(|| {
            Event::new(EventKind::ExecuteDuration, sql_fingerprint)
                .with_correlation_id(correlation_id)
                .with_driver(self.name())
                .with_duration(started.elapsed())
        });

        result
    }

    #[doc(hidden)]
    fn run_with_cursor(&self, statement: &Sql, compiled: &CompiledSql) -> Result<SqlResult>
    where
        Self: Sized,
    {
        let mut cursor = self
            .with_cursor()
            .map_err(|e| execution_error(&compiled.sql, 0, e))?;

        let result = route(self, &mut cursor, statement, compiled, &self.script_options());

        if let Err(error) = self.release_cursor(cursor) {
            tracing::warn!(driver = self.name(), %error, "cursor release failed");
        }
        result
    }
}

fn route<A: DriverAdapter>(
    adapter: &A,
    cursor: &mut A::Cursor,
    statement: &Sql,
    compiled: &CompiledSql,
    script_options: &ScriptOptions,
) -> Result<SqlResult> {
    let wrap = |e: anyhow::Error| execution_error(&compiled.sql, 0, e);

    if let Some(special) = adapter
        .try_special_handling(cursor, statement)
        .map_err(wrap)?
    {
        tracing::debug!(driver = adapter.name(), "special handling short-circuit");
        return Ok(special);
    }

    match statement.kind() {
        OperationKind::Single => {
            adapter
                .execute_single(cursor, &compiled.sql, compiled.parameters.single())
                .map_err(wrap)?;
            if statement.returns_rows() {
                let (rows, column_names, _) = adapter.extract_selected(cursor).map_err(wrap)?;
                Ok(SqlResult::selected(
                    OperationKind::Single,
                    rows,
                    column_names,
                ))
            } else {
                let rows_affected = adapter.extract_row_count(cursor).map_err(wrap)?;
                Ok(SqlResult::affected(OperationKind::Single, rows_affected))
            }
        }
        OperationKind::Many => {
            adapter
                .execute_many(cursor, &compiled.sql, compiled.parameters.batches())
                .map_err(wrap)?;
            let rows_affected = adapter.extract_row_count(cursor).map_err(wrap)?;
            Ok(SqlResult::affected(OperationKind::Many, rows_affected))
        }
        OperationKind::Script => {
            let outcomes = adapter
                .execute_script(cursor, compiled, script_options)
                .map_err(wrap)?;
            if !script_options.continue_on_error {
                if let Some(failed) = outcomes
                    .iter()
                    .find(|o| o.status == StatementStatus::Failed)
                {
                    return Err(execution_error(
                        &failed.sql,
                        failed.index,
                        anyhow::anyhow!(
                            failed.error.clone().unwrap_or_else(|| "statement failed".into())
                        ),
                    ));
                }
            }
            Ok(SqlResult::script(outcomes))
        }
    }
}

/// Object-safe execution surface over any [`DriverAdapter`], used by the
/// registry.
pub trait SyncDispatch: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(&self, statement: &Sql) -> Result<SqlResult>;
}

impl<T: DriverAdapter> SyncDispatch for T {
    fn name(&self) -> &'static str {
        DriverAdapter::name(self)
    }

    fn execute(&self, statement: &Sql) -> Result<SqlResult> {
        self.dispatch(statement)
    }
}
