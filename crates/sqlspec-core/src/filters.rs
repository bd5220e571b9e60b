//! Composable statement filters
//!
//! Filters append clauses to a statement immutably: attaching one returns
//! a new [`Sql`] instance, and the processor applies the accumulated
//! filters to the parsed expression at compile time, in attachment order.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::{self, Expression};
use crate::config::Dialect;
use crate::error::Result;
use crate::statement::Sql;
use crate::value::{TypedParameter, Value};

/// Collects parameters contributed by filters during application.
///
/// Each pushed parameter is assigned the next canonical placeholder slot,
/// continuing after the statement's own placeholders.
#[derive(Debug)]
pub struct FilterParamSink {
    next_index: usize,
    values: Vec<TypedParameter>,
}

impl FilterParamSink {
    /// `start_index` is the number of placeholders already present.
    pub fn new(start_index: usize) -> Self {
        Self {
            next_index: start_index,
            values: Vec::new(),
        }
    }

    /// Register a parameter and return its placeholder token.
    pub fn push(&mut self, parameter: TypedParameter) -> String {
        self.next_index += 1;
        let token = format!("${}", self.next_index);
        self.values.push(parameter);
        token
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<TypedParameter> {
        self.values
    }
}

/// A composable statement modifier.
pub trait StatementFilter: std::fmt::Debug + Send + Sync {
    /// Mutate the parsed expression, registering any contributed
    /// parameters with the sink.
    fn apply(
        &self,
        expression: &mut Expression,
        sink: &mut FilterParamSink,
        dialect: Dialect,
    ) -> Result<()>;

    /// The parameters this filter will contribute, as (positional, named).
    fn extract_parameters(&self) -> (Vec<TypedParameter>, IndexMap<String, TypedParameter>) {
        (Vec::new(), IndexMap::new())
    }

    /// Stable content bytes for cache keying.
    fn fingerprint(&self) -> Vec<u8>;

    /// Attach this filter to a statement, returning the new instance.
    fn append_to_statement(&self, sql: &Sql) -> Sql
    where
        Self: Clone + Sized + 'static,
    {
        sql.with_filter(Arc::new(self.clone()))
    }
}

/// LIMIT / OFFSET, dialect-aware through the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitOffset {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl LimitOffset {
    pub fn new(limit: Option<u64>, offset: Option<u64>) -> Self {
        Self { limit, offset }
    }

    pub fn limit(limit: u64) -> Self {
        Self::new(Some(limit), None)
    }

    pub fn offset(offset: u64) -> Self {
        Self::new(None, Some(offset))
    }

    /// Page numbering starts at 1.
    pub fn page(page: u64, page_size: u64) -> Self {
        Self::new(Some(page_size), Some(page.saturating_sub(1) * page_size))
    }
}

impl StatementFilter for LimitOffset {
    fn apply(
        &self,
        expression: &mut Expression,
        _sink: &mut FilterParamSink,
        _dialect: Dialect,
    ) -> Result<()> {
        if let Some(limit) = self.limit {
            ast::set_limit(expression, limit)?;
        }
        if let Some(offset) = self.offset {
            ast::set_offset(expression, offset)?;
        }
        Ok(())
    }

    fn fingerprint(&self) -> Vec<u8> {
        format!("{:?}", self).into_bytes()
    }
}

/// ORDER BY over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// (column, ascending) pairs
    pub columns: Vec<(String, bool)>,
}

impl OrderBy {
    pub fn new(columns: impl IntoIterator<Item = (String, bool)>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
        }
    }

    pub fn ascending(column: impl Into<String>) -> Self {
        Self::new([(column.into(), true)])
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Self::new([(column.into(), false)])
    }
}

impl StatementFilter for OrderBy {
    fn apply(
        &self,
        expression: &mut Expression,
        _sink: &mut FilterParamSink,
        _dialect: Dialect,
    ) -> Result<()> {
        ast::push_order_by(expression, self.columns.iter().cloned())
    }

    fn fingerprint(&self) -> Vec<u8> {
        format!("{:?}", self).into_bytes()
    }
}

/// `AND column IN (…)` over a collection parameter.
///
/// The collection is bound as one parameter; list expansion turns it into
/// a placeholder per element for drivers without native support.
#[derive(Debug, Clone, PartialEq)]
pub struct InCollection {
    pub column: String,
    pub values: Vec<Value>,
}

impl InCollection {
    pub fn new(column: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            column: column.into(),
            values: values.into_iter().collect(),
        }
    }
}

impl StatementFilter for InCollection {
    fn apply(
        &self,
        expression: &mut Expression,
        sink: &mut FilterParamSink,
        _dialect: Dialect,
    ) -> Result<()> {
        let token = sink.push(TypedParameter::new(Value::List(self.values.clone())));
        let predicate = ast::build::in_list(
            ast::build::column(&self.column),
            vec![ast::build::placeholder(token)],
        );
        ast::and_where(expression, predicate)
    }

    fn extract_parameters(&self) -> (Vec<TypedParameter>, IndexMap<String, TypedParameter>) {
        (
            vec![TypedParameter::new(Value::List(self.values.clone()))],
            IndexMap::new(),
        )
    }

    fn fingerprint(&self) -> Vec<u8> {
        format!("{:?}", self).into_bytes()
    }
}

/// LIKE search over a column, optionally case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    pub column: String,
    pub term: String,
    pub case_insensitive: bool,
}

impl Search {
    pub fn new(column: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            term: term.into(),
            case_insensitive: false,
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }
}

impl StatementFilter for Search {
    fn apply(
        &self,
        expression: &mut Expression,
        sink: &mut FilterParamSink,
        dialect: Dialect,
    ) -> Result<()> {
        let pattern = format!("%{}%", self.term);
        let token = sink.push(TypedParameter::new(Value::Text(pattern)));
        let column = ast::quote_identifier(&self.column);
        // LOWER(..) LIKE LOWER(..) is the portable case-insensitive form;
        // ILIKE is not parsed by every dialect.
        let text = if self.case_insensitive {
            format!("LOWER({}) LIKE LOWER({})", column, token)
        } else {
            format!("{} LIKE {}", column, token)
        };
        let predicate = ast::parse_expression(&text, dialect)?;
        ast::and_where(expression, predicate)
    }

    fn extract_parameters(&self) -> (Vec<TypedParameter>, IndexMap<String, TypedParameter>) {
        (
            vec![TypedParameter::new(Value::Text(format!("%{}%", self.term)))],
            IndexMap::new(),
        )
    }

    fn fingerprint(&self) -> Vec<u8> {
        format!("{:?}", self).into_bytes()
    }
}

/// Range predicate over a column: strictly after and/or strictly before.
#[derive(Debug, Clone, PartialEq)]
pub struct BeforeAfter {
    pub column: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl BeforeAfter {
    pub fn new(column: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            column: column.into(),
            before,
            after,
        }
    }

    pub fn before(column: impl Into<String>, value: Value) -> Self {
        Self::new(column, Some(value), None)
    }

    pub fn after(column: impl Into<String>, value: Value) -> Self {
        Self::new(column, None, Some(value))
    }
}

impl StatementFilter for BeforeAfter {
    fn apply(
        &self,
        expression: &mut Expression,
        sink: &mut FilterParamSink,
        dialect: Dialect,
    ) -> Result<()> {
        if let Some(before) = &self.before {
            let token = sink.push(TypedParameter::new(before.clone()));
            let text = format!("{} < {}", ast::quote_identifier(&self.column), token);
            ast::and_where(expression, ast::parse_expression(&text, dialect)?)?;
        }
        if let Some(after) = &self.after {
            let token = sink.push(TypedParameter::new(after.clone()));
            let text = format!("{} > {}", ast::quote_identifier(&self.column), token);
            ast::and_where(expression, ast::parse_expression(&text, dialect)?)?;
        }
        Ok(())
    }

    fn extract_parameters(&self) -> (Vec<TypedParameter>, IndexMap<String, TypedParameter>) {
        let positional = self
            .before
            .iter()
            .chain(self.after.iter())
            .cloned()
            .map(TypedParameter::new)
            .collect();
        (positional, IndexMap::new())
    }

    fn fingerprint(&self) -> Vec<u8> {
        format!("{:?}", self).into_bytes()
    }
}

/// A raw predicate ANDed onto the statement, parsed at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateFilter {
    pub predicate: String,
}

impl PredicateFilter {
    pub fn new(predicate: impl Into<String>) -> Self {
        Self {
            predicate: predicate.into(),
        }
    }
}

impl StatementFilter for PredicateFilter {
    fn apply(
        &self,
        expression: &mut Expression,
        _sink: &mut FilterParamSink,
        dialect: Dialect,
    ) -> Result<()> {
        let predicate = ast::parse_expression(&self.predicate, dialect)?;
        ast::and_where(expression, predicate)
    }

    fn fingerprint(&self) -> Vec<u8> {
        format!("{:?}", self).into_bytes()
    }
}

/// Combined fingerprint of an ordered filter chain.
pub fn filters_fingerprint(filters: &[Arc<dyn StatementFilter>]) -> u64 {
    let mut f = crate::fingerprint::Fingerprinter::new();
    for filter in filters {
        f.write_bytes(&filter.fingerprint());
    }
    f.finish()
}
