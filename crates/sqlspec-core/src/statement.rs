//! The SQL statement object
//!
//! [`Sql`] is the user-facing immutable statement handle: original text,
//! parameters, filters, and configuration. Modifier methods return new
//! instances; compiled state is attached once per instance and shared by
//! clones of that instance only.

use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::ast::{self, Expression};
use crate::config::StatementConfig;
use crate::error::Result;
use crate::filters::StatementFilter;
use crate::processor::SqlProcessor;
use crate::style::ParameterStyle;
use crate::value::{TypedParameter, Value};

/// How a statement is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// One statement, one parameter set
    Single,
    /// One statement, a sequence of parameter sets
    Many,
    /// A multi-statement script
    Script,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Single => "single",
            Self::Many => "many",
            Self::Script => "script",
        };
        write!(f, "{}", s)
    }
}

/// Parameters attached to a compiled artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionParameters {
    /// No parameters (static compilation or parameterless statements)
    None,
    /// One ordered vector
    Single(Vec<TypedParameter>),
    /// One vector per batch, batch order preserved
    Batch(Vec<Vec<TypedParameter>>),
}

impl ExecutionParameters {
    /// The single vector, empty for `None`. Batch parameters have no
    /// single view.
    pub fn single(&self) -> &[TypedParameter] {
        match self {
            Self::Single(v) => v,
            _ => &[],
        }
    }

    pub fn batches(&self) -> &[Vec<TypedParameter>] {
        match self {
            Self::Batch(b) => b,
            _ => &[],
        }
    }

    pub fn count(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Single(v) => v.len(),
            Self::Batch(b) => b.iter().map(Vec::len).sum(),
        }
    }
}

/// The compiled artifact: final SQL text plus the normalized parameter
/// vector in the driver's expected style. Value type; freely shareable.
#[derive(Debug, Clone)]
pub struct CompiledSql {
    /// Final SQL text
    pub sql: String,
    /// Parameters in placeholder order of `sql`
    pub parameters: ExecutionParameters,
    /// The style `sql`'s placeholders use
    pub parameter_style: ParameterStyle,
    /// Compilation metadata (pipeline steps, literal counts, script info)
    pub metadata: IndexMap<String, serde_json::Value>,
}

/// An immutable SQL statement handle.
#[derive(Debug, Clone)]
pub struct Sql {
    text: String,
    expression: Option<Arc<Expression>>,
    positional: Vec<TypedParameter>,
    named: IndexMap<String, TypedParameter>,
    batches: Vec<Vec<TypedParameter>>,
    filters: Vec<Arc<dyn StatementFilter>>,
    config: StatementConfig,
    kind: OperationKind,
    builder_state: Option<Vec<u8>>,
    processed: OnceCell<CompiledSql>,
}

impl Sql {
    /// A statement over raw text with the default configuration.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_config(text, StatementConfig::default())
    }

    /// A statement over raw text with an explicit configuration.
    pub fn with_config(text: impl Into<String>, config: StatementConfig) -> Self {
        Self {
            text: text.into(),
            expression: None,
            positional: Vec::new(),
            named: IndexMap::new(),
            batches: Vec::new(),
            filters: Vec::new(),
            config,
            kind: OperationKind::Single,
            builder_state: None,
            processed: OnceCell::new(),
        }
    }

    /// A statement over an already-built expression.
    pub fn from_expression(expression: Expression, config: StatementConfig) -> Self {
        let text = ast::generate(&expression, false);
        Self {
            expression: Some(Arc::new(expression)),
            ..Self::with_config(text, config)
        }
    }

    /// A statement materialized by a query builder; `builder_state` is the
    /// deterministic state serialization used for builder-cache keying.
    pub fn from_builder_output(
        expression: Expression,
        config: StatementConfig,
        builder_state: Vec<u8>,
    ) -> Self {
        let mut sql = Self::from_expression(expression, config);
        sql.builder_state = Some(builder_state);
        sql
    }

    // Modifier methods. Each returns a new instance with cleared
    // compiled state; unchanged parts are shared where possible.

    fn modified(&self) -> Self {
        Self {
            processed: OnceCell::new(),
            ..self.clone()
        }
    }

    /// Append a positional parameter.
    pub fn with_param(&self, value: impl Into<Value>) -> Self {
        let mut next = self.modified();
        next.positional.push(TypedParameter::new(value));
        next
    }

    /// Append a wrapped positional parameter.
    pub fn with_typed_param(&self, parameter: TypedParameter) -> Self {
        let mut next = self.modified();
        next.positional.push(parameter);
        next
    }

    /// Append positional parameters.
    pub fn with_params<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Self {
        let mut next = self.modified();
        next.positional
            .extend(values.into_iter().map(TypedParameter::new));
        next
    }

    /// Bind a named parameter.
    pub fn with_named_param(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.modified();
        let name = name.into();
        next.named
            .insert(name.clone(), TypedParameter::named(name, value));
        next
    }

    /// Attach a statement filter.
    pub fn with_filter(&self, filter: Arc<dyn StatementFilter>) -> Self {
        let mut next = self.modified();
        next.filters.push(filter);
        next
    }

    /// Attach a filter by value.
    pub fn filtered(&self, filter: impl StatementFilter + 'static) -> Self {
        self.with_filter(Arc::new(filter))
    }

    /// AND a raw predicate onto the statement.
    pub fn where_(&self, predicate: impl Into<String>) -> Self {
        self.filtered(crate::filters::PredicateFilter::new(predicate))
    }

    /// Apply a LIMIT.
    pub fn limit(&self, limit: u64) -> Self {
        self.filtered(crate::filters::LimitOffset::limit(limit))
    }

    /// Apply an OFFSET.
    pub fn offset(&self, offset: u64) -> Self {
        self.filtered(crate::filters::LimitOffset::offset(offset))
    }

    /// Append an ORDER BY column.
    pub fn order_by(&self, column: impl Into<String>, ascending: bool) -> Self {
        self.filtered(crate::filters::OrderBy::new([(column.into(), ascending)]))
    }

    /// Switch to batch execution over the given parameter sets.
    pub fn as_many<V: Into<Value>>(
        &self,
        batches: impl IntoIterator<Item = Vec<V>>,
    ) -> Self {
        let mut next = self.modified();
        next.kind = OperationKind::Many;
        next.batches = batches
            .into_iter()
            .map(|batch| batch.into_iter().map(TypedParameter::new).collect())
            .collect();
        next
    }

    /// Switch to script execution.
    pub fn as_script(&self) -> Self {
        let mut next = self.modified();
        next.kind = OperationKind::Script;
        next
    }

    /// An independent copy of this statement without compiled state.
    pub fn copy(&self) -> Self {
        self.modified()
    }

    // Introspection

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn expression(&self) -> Option<&Arc<Expression>> {
        self.expression.as_ref()
    }

    pub fn config(&self) -> &StatementConfig {
        &self.config
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn is_script(&self) -> bool {
        self.kind == OperationKind::Script
    }

    pub fn is_many(&self) -> bool {
        self.kind == OperationKind::Many
    }

    pub fn positional_parameters(&self) -> &[TypedParameter] {
        &self.positional
    }

    pub fn named_parameters(&self) -> &IndexMap<String, TypedParameter> {
        &self.named
    }

    pub fn parameter_batches(&self) -> &[Vec<TypedParameter>] {
        &self.batches
    }

    pub fn filters(&self) -> &[Arc<dyn StatementFilter>] {
        &self.filters
    }

    pub fn builder_state(&self) -> Option<&[u8]> {
        self.builder_state.as_deref()
    }

    /// Whether executing this statement produces a row stream.
    ///
    /// Uses the parsed expression when available, otherwise the leading
    /// keyword.
    pub fn returns_rows(&self) -> bool {
        if let Some(expression) = &self.expression {
            return ast::returns_rows(expression);
        }
        let trimmed = self.text.trim_start().to_uppercase();
        trimmed.starts_with("SELECT")
            || trimmed.starts_with("WITH")
            || trimmed.starts_with("SHOW")
            || trimmed.starts_with("DESCRIBE")
            || trimmed.starts_with("EXPLAIN")
            || trimmed.starts_with("VALUES")
            || trimmed.contains(" RETURNING ")
    }

    /// Compile to the configured default style.
    pub fn compile(&self) -> Result<CompiledSql> {
        self.compile_internal(None)
    }

    /// Compile to an explicit target style.
    pub fn compile_as(&self, target_style: ParameterStyle) -> Result<CompiledSql> {
        self.compile_internal(Some(target_style))
    }

    fn compile_internal(&self, target_style: Option<ParameterStyle>) -> Result<CompiledSql> {
        if let Some(compiled) = self.processed.get() {
            if target_style.is_none() || target_style == Some(compiled.parameter_style) {
                return Ok(compiled.clone());
            }
        }
        let compiled = SqlProcessor::global().compile(self, target_style)?;
        if target_style.is_none() || target_style == Some(compiled.parameter_style) {
            let _ = self.processed.set(compiled.clone());
        }
        Ok(compiled)
    }
}
