//! Asynchronous driver dispatch template
//!
//! The async twin of [`crate::DriverAdapter`]: the pipeline stays
//! synchronous, only cursor operations and transaction primitives
//! suspend. Ordering and cursor-release guarantees match the sync
//! template.

use std::time::Instant;

use async_trait::async_trait;
use sqlspec_core::events::{Event, EventKind, hub};
use sqlspec_core::fingerprint::hash_str;
use sqlspec_core::{
    CompiledSql, OperationKind, ParameterStyle, Result, Row, Sql, SqlProcessor, SqlResult,
    StatementOutcome, StatementStatus, TypedParameter, split_script,
};
use uuid::Uuid;

use crate::dispatch::{HookResult, execution_error};
use crate::script::ScriptOptions;

/// Asynchronous database adapter.
///
/// Implement the hooks; `dispatch` is the template and should not be
/// overridden.
#[async_trait]
pub trait AsyncDriverAdapter: Send + Sync {
    type Cursor: Send;

    fn name(&self) -> &'static str;

    fn processor(&self) -> &SqlProcessor {
        SqlProcessor::global()
    }

    fn default_style(&self) -> Option<ParameterStyle> {
        None
    }

    fn script_options(&self) -> ScriptOptions {
        ScriptOptions::default()
    }

    // -- cursor and transaction hooks ------------------------------------

    async fn with_cursor(&self) -> HookResult<Self::Cursor>;

    async fn release_cursor(&self, cursor: Self::Cursor) -> HookResult<()> {
        drop(cursor);
        Ok(())
    }

    async fn begin(&self, cursor: &mut Self::Cursor) -> HookResult<()>;

    async fn commit(&self, cursor: &mut Self::Cursor) -> HookResult<()>;

    async fn rollback(&self, cursor: &mut Self::Cursor) -> HookResult<()>;

    // -- execution hooks -------------------------------------------------

    async fn try_special_handling(
        &self,
        _cursor: &mut Self::Cursor,
        _statement: &Sql,
    ) -> HookResult<Option<SqlResult>> {
        Ok(None)
    }

    async fn execute_single(
        &self,
        cursor: &mut Self::Cursor,
        sql: &str,
        parameters: &[TypedParameter],
    ) -> HookResult<()>;

    async fn execute_many(
        &self,
        cursor: &mut Self::Cursor,
        sql: &str,
        batches: &[Vec<TypedParameter>],
    ) -> HookResult<()>;

    /// Execute a multi-statement script; see the sync template for the
    /// default splitting behavior.
    async fn execute_script(
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
            match self.execute_single(cursor, &sql, &[]).await {
                Ok(()) => {
                    let rows_affected = self.extract_row_count(cursor).await.ok();
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

    async fn extract_selected(
        &self,
        cursor: &mut Self::Cursor,
    ) -> HookResult<(Vec<Row>, Vec<String>, u64)>;

    async fn extract_row_count(&self, cursor: &mut Self::Cursor) -> HookResult<u64>;

    // -- template --------------------------------------------------------

    /// Compile and execute a statement, producing a normalized result.
    async fn dispatch(&self, statement: &Sql) -> Result<SqlResult>
    where
        Self: Sized,
    {
        let started = Instant::now();
        let sql_fingerprint = hash_str(statement.text());
        let correlation_id = Uuid::new_v4();
        let events = hub();

        // Compilation is pure computation and never suspends
        let compiled = self.processor().compile(statement, self.default_style())?;

        events.emit_with(|| {
            Event::new(EventKind::ExecuteStart, sql_fingerprint)
                .with_correlation_id(correlation_id)
                .with_driver(self.name())
                .with_operation(statement.kind())
                .with_parameter_count(compiled.parameters.count())
        });

        let result = self.run_with_cursor(statement, &compiled).await;

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
    async fn run_with_cursor(&self, statement: &Sql, compiled: &CompiledSql) -> Result<SqlResult>
    where
        Self: Sized,
    {
        let mut cursor = self
            .with_cursor()
            .await
            .map_err(|e| execution_error(&compiled.sql, 0, e))?;

        let result = route(self, &mut cursor, statement, compiled, &self.script_options()).await;

        if let Err(error) = self.release_cursor(cursor).await {
            tracing::warn!(driver = self.name(), %error, "cursor release failed");
        }
        result
    }
}

async fn route<A: AsyncDriverAdapter>(
    adapter: &A,
    cursor: &mut A::Cursor,
    statement: &Sql,
    compiled: &CompiledSql,
    script_options: &ScriptOptions,
) -> Result<SqlResult> {
    let wrap = |e: anyhow::Error| execution_error(&compiled.sql, 0, e);

    if let Some(special) = adapter
        .try_special_handling(cursor, statement)
        .await
        .map_err(wrap)?
    {
        tracing::debug!(driver = adapter.name(), "special handling short-circuit");
        return Ok(special);
    }

    match statement.kind() {
        OperationKind::Single => {
            adapter
                .execute_single(cursor, &compiled.sql, compiled.parameters.single())
                .await
                .map_err(wrap)?;
            if statement.returns_rows() {
                let (rows, column_names, _) =
                    adapter.extract_selected(cursor).await.map_err(wrap)?;
                Ok(SqlResult::selected(
                    OperationKind::Single,
                    rows,
                    column_names,
                ))
            } else {
                let rows_affected = adapter.extract_row_count(cursor).await.map_err(wrap)?;
                Ok(SqlResult::affected(OperationKind::Single, rows_affected))
            }
        }
        OperationKind::Many => {
            adapter
                .execute_many(cursor, &compiled.sql, compiled.parameters.batches())
                .await
                .map_err(wrap)?;
            let rows_affected = adapter.extract_row_count(cursor).await.map_err(wrap)?;
            Ok(SqlResult::affected(OperationKind::Many, rows_affected))
        }
        OperationKind::Script => {
            let outcomes = adapter
                .execute_script(cursor, compiled, script_options)
                .await
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

/// Object-safe execution surface over any [`AsyncDriverAdapter`], used by
/// the registry.
#[async_trait]
pub trait AsyncDispatch: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, statement: &Sql) -> Result<SqlResult>;
}

#[async_trait]
impl<T: AsyncDriverAdapter> AsyncDispatch for T {
    fn name(&self) -> &'static str {
        AsyncDriverAdapter::name(self)
    }

    async fn execute(&self, statement: &Sql) -> Result<SqlResult> {
        self.dispatch(statement).await
    }
}
