//! Thin facade over the SQL parser
//!
//! Everything that touches `sqlparser` lives here: parsing, text
//! generation, expression visitors, and a handful of node constructors.
//! The rest of the workspace imports AST types from this module only, so
//! the parser vendor can be swapped without touching callers.

use std::ops::ControlFlow;

use sqlparser::ast::{self, Expr, Statement, visit_expressions, visit_expressions_mut, visit_relations};
use sqlparser::dialect::{
    Dialect as ParserDialect, DuckDbDialect, GenericDialect, MsSqlDialect, MySqlDialect,
    PostgreSqlDialect, SQLiteDialect,
};
use sqlparser::parser::{Parser, ParserError};

use crate::config::Dialect;
use crate::error::{Result, SqlSpecError};
use crate::fingerprint::hash_str;

/// A parsed statement. Opaque to callers outside this facade.
pub type Expression = Statement;

/// A parsed scalar/predicate expression node.
pub type ExprNode = Expr;

pub use sqlparser::ast::{BinaryOperator, UnaryOperator};

fn parser_dialect(dialect: Dialect) -> Box<dyn ParserDialect> {
    match dialect {
        Dialect::Generic => Box::new(GenericDialect {}),
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
        Dialect::Mssql => Box::new(MsSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
    }
}

fn parse_error(err: ParserError) -> SqlSpecError {
    SqlSpecError::Parse {
        position: None,
        reason: err.to_string(),
    }
}

/// Parse SQL text into statements.
pub fn parse(sql: &str, dialect: Dialect) -> Result<Vec<Expression>> {
    let d = parser_dialect(dialect);
    Parser::parse_sql(d.as_ref(), sql).map_err(parse_error)
}

/// Parse SQL text expected to hold exactly one statement.
pub fn parse_one(sql: &str, dialect: Dialect) -> Result<Expression> {
    let mut statements = parse(sql, dialect)?;
    match statements.len() {
        1 => Ok(statements.remove(0)),
        n => Err(SqlSpecError::Parse {
            position: None,
            reason: format!("expected a single statement, found {}", n),
        }),
    }
}

/// Parse a standalone scalar/predicate expression.
pub fn parse_expression(sql: &str, dialect: Dialect) -> Result<ExprNode> {
    let d = parser_dialect(dialect);
    Parser::new(d.as_ref())
        .try_with_sql(sql)
        .map_err(parse_error)?
        .parse_expr()
        .map_err(parse_error)
}

/// Render an expression back to SQL text.
///
/// Total over well-formed expressions; `pretty` reflows the text through
/// the formatter for diagnostics and logs.
pub fn generate(expression: &Expression, pretty: bool) -> String {
    let sql = expression.to_string();
    if pretty {
        sqlformat::format(
            &sql,
            &sqlformat::QueryParams::None,
            &sqlformat::FormatOptions::default(),
        )
    } else {
        sql
    }
}

/// Stable fingerprint of an expression's rendered form.
pub fn expression_fingerprint(expression: &Expression) -> u64 {
    hash_str(&expression.to_string())
}

/// Visit every scalar expression mutably, in source order.
pub fn transform_expressions<F>(expression: &mut Expression, mut f: F)
where
    F: FnMut(&mut ExprNode),
{
    let _ = visit_expressions_mut(expression, |expr| {
        f(expr);
        ControlFlow::<()>::Continue(())
    });
}

/// Collect every expression node satisfying the predicate.
pub fn find_expressions<F>(expression: &Expression, mut predicate: F) -> Vec<ExprNode>
where
    F: FnMut(&ExprNode) -> bool,
{
    let mut found = Vec::new();
    let _ = visit_expressions(expression, |expr| {
        if predicate(expr) {
            found.push(expr.clone());
        }
        ControlFlow::<()>::Continue(())
    });
    found
}

/// Placeholder tokens in the expression, in visit order.
pub fn find_placeholders(expression: &Expression) -> Vec<String> {
    let mut found = Vec::new();
    let _ = visit_expressions(expression, |expr| {
        if let Expr::Value(ast::Value::Placeholder(token)) = expr {
            found.push(token.clone());
        }
        ControlFlow::<()>::Continue(())
    });
    found
}

/// The engine-level value of a literal expression node, if it is one.
pub fn literal_value(expr: &ExprNode) -> Option<crate::value::Value> {
    use crate::value::Value as V;
    let Expr::Value(v) = expr else {
        return None;
    };
    match v {
        ast::Value::Number(repr, _) => Some(numeric_literal(repr)),
        ast::Value::SingleQuotedString(s) | ast::Value::DoubleQuotedString(s) => {
            Some(V::Text(s.clone()))
        }
        ast::Value::Boolean(b) => Some(V::Bool(*b)),
        _ => None,
    }
}

/// Integers that fit become `Int`; a float is used only when it
/// reproduces the token exactly. Everything else — high-precision
/// decimals, integers beyond i64, exponent forms — keeps its textual
/// form as `Decimal`.
fn numeric_literal(repr: &str) -> crate::value::Value {
    use crate::value::Value as V;
    if let Ok(int) = repr.parse::<i64>() {
        return V::Int(int);
    }
    match repr.parse::<f64>() {
        Ok(float) if float.is_finite() && float.to_string() == repr => V::Float(float),
        _ => V::Decimal(repr.to_string()),
    }
}

/// The token of a placeholder expression node, if it is one.
pub fn placeholder_token(expr: &ExprNode) -> Option<&str> {
    match expr {
        Expr::Value(ast::Value::Placeholder(token)) => Some(token),
        _ => None,
    }
}

/// Every plain identifier referenced in scalar expressions.
pub fn find_identifiers(expression: &Expression) -> Vec<String> {
    let mut found = Vec::new();
    let _ = visit_expressions(expression, |expr| {
        match expr {
            Expr::Identifier(ident) => found.push(ident.value.clone()),
            Expr::CompoundIdentifier(parts) => {
                found.extend(parts.iter().map(|p| p.value.clone()));
            }
            _ => {}
        }
        ControlFlow::<()>::Continue(())
    });
    found
}

/// Every function name invoked by the expression.
pub fn find_function_names(expression: &Expression) -> Vec<String> {
    let mut found = Vec::new();
    let _ = visit_expressions(expression, |expr| {
        if let Expr::Function(function) = expr {
            found.push(function.name.to_string());
        }
        ControlFlow::<()>::Continue(())
    });
    found
}

fn select_projects_only_literals(set_expr: &ast::SetExpr) -> bool {
    let ast::SetExpr::Select(select) = set_expr else {
        return false;
    };
    !select.projection.is_empty()
        && select.projection.iter().all(|item| match item {
            ast::SelectItem::UnnamedExpr(expr) | ast::SelectItem::ExprWithAlias { expr, .. } => {
                literal_value(expr).is_some() || placeholder_token(expr).is_some()
            }
            _ => false,
        })
}

fn set_expr_has_literal_union_arm(set_expr: &ast::SetExpr) -> bool {
    match set_expr {
        ast::SetExpr::SetOperation {
            op: ast::SetOperator::Union,
            left,
            right,
            ..
        } => {
            select_projects_only_literals(right)
                || set_expr_has_literal_union_arm(left)
                || set_expr_has_literal_union_arm(right)
        }
        _ => false,
    }
}

/// Whether the statement carries a UNION arm projecting only literals,
/// the classic shape of an injection probe.
pub fn has_literal_union_arm(expression: &Expression) -> bool {
    match expression {
        Statement::Query(query) => set_expr_has_literal_union_arm(&query.body),
        _ => false,
    }
}

/// Every table/relation name referenced by the expression.
pub fn find_relations(expression: &Expression) -> Vec<String> {
    let mut found = Vec::new();
    let _ = visit_relations(expression, |name| {
        found.push(name.to_string());
        ControlFlow::<()>::Continue(())
    });
    found
}

/// Whether executing this expression produces a row stream.
pub fn returns_rows(expression: &Expression) -> bool {
    match expression {
        Statement::Query(_) | Statement::Explain { .. } | Statement::ExplainTable { .. } => true,
        Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowVariable { .. }
        | Statement::ShowFunctions { .. } => true,
        Statement::Insert(insert) => insert.returning.is_some(),
        Statement::Update { returning, .. } => returning.is_some(),
        Statement::Delete(delete) => delete.returning.is_some(),
        _ => false,
    }
}

/// AND a predicate onto the statement's WHERE clause.
///
/// Supports queries, updates, and deletes; other statement kinds have no
/// selection to extend.
pub fn and_where(expression: &mut Expression, predicate: ExprNode) -> Result<()> {
    let selection = match expression {
        Statement::Query(query) => match query.body.as_mut() {
            ast::SetExpr::Select(select) => &mut select.selection,
            _ => {
                return Err(SqlSpecError::Configuration(
                    "cannot add a predicate to a set-operation query".to_string(),
                ));
            }
        },
        Statement::Update { selection, .. } => selection,
        Statement::Delete(delete) => &mut delete.selection,
        other => {
            return Err(SqlSpecError::Configuration(format!(
                "cannot add a predicate to this statement kind: {}",
                statement_kind(other)
            )));
        }
    };
    *selection = Some(match selection.take() {
        Some(existing) => ExprNode::BinaryOp {
            left: Box::new(existing),
            op: ast::BinaryOperator::And,
            right: Box::new(predicate),
        },
        None => predicate,
    });
    Ok(())
}

/// Set the LIMIT clause of a query statement.
pub fn set_limit(expression: &mut Expression, limit: u64) -> Result<()> {
    match expression {
        Statement::Query(query) => {
            query.limit = Some(build::number(limit.to_string()));
            Ok(())
        }
        other => Err(SqlSpecError::Configuration(format!(
            "cannot set LIMIT on this statement kind: {}",
            statement_kind(other)
        ))),
    }
}

/// Set the OFFSET clause of a query statement.
pub fn set_offset(expression: &mut Expression, offset: u64) -> Result<()> {
    match expression {
        Statement::Query(query) => {
            query.offset = Some(ast::Offset {
                value: build::number(offset.to_string()),
                rows: ast::OffsetRows::None,
            });
            Ok(())
        }
        other => Err(SqlSpecError::Configuration(format!(
            "cannot set OFFSET on this statement kind: {}",
            statement_kind(other)
        ))),
    }
}

/// Append ORDER BY expressions to a query statement.
pub fn push_order_by(
    expression: &mut Expression,
    columns: impl IntoIterator<Item = (String, bool)>,
) -> Result<()> {
    match expression {
        Statement::Query(query) => {
            let mut exprs: Vec<ast::OrderByExpr> = columns
                .into_iter()
                .map(|(column, ascending)| ast::OrderByExpr {
                    expr: build::column(&column),
                    asc: Some(ascending),
                    nulls_first: None,
                    with_fill: None,
                })
                .collect();
            match &mut query.order_by {
                Some(order_by) => order_by.exprs.append(&mut exprs),
                None => {
                    query.order_by = Some(ast::OrderBy {
                        exprs,
                        interpolate: None,
                    });
                }
            }
            Ok(())
        }
        other => Err(SqlSpecError::Configuration(format!(
            "cannot set ORDER BY on this statement kind: {}",
            statement_kind(other)
        ))),
    }
}

/// Clauses taken off a query where literals are positional or structural
/// rather than bindable: LIMIT, OFFSET, and ORDER BY (ordinals). Opaque
/// to callers.
#[derive(Debug, Default)]
pub struct StashedClauses(
    Option<ExprNode>,
    Option<ast::Offset>,
    Option<ast::OrderBy>,
);

/// Detach the LIMIT/OFFSET/ORDER BY clauses of a query so a
/// transformation can leave them untouched. No-op for other statement
/// kinds.
pub fn take_fixed_clauses(expression: &mut Expression) -> StashedClauses {
    match expression {
        Statement::Query(query) => StashedClauses(
            query.limit.take(),
            query.offset.take(),
            query.order_by.take(),
        ),
        _ => StashedClauses::default(),
    }
}

/// Reattach clauses removed by [`take_fixed_clauses`].
pub fn restore_fixed_clauses(expression: &mut Expression, stashed: StashedClauses) {
    if let Statement::Query(query) = expression {
        query.limit = stashed.0;
        query.offset = stashed.1;
        query.order_by = stashed.2;
    }
}

/// Short statement-kind label for diagnostics and events.
pub fn statement_kind(expression: &Expression) -> &'static str {
    match expression {
        Statement::Query(_) => "select",
        Statement::Insert(_) => "insert",
        Statement::Update { .. } => "update",
        Statement::Delete(_) => "delete",
        Statement::Merge { .. } => "merge",
        Statement::Explain { .. } => "explain",
        Statement::CreateTable(_) => "create_table",
        Statement::CreateView { .. } => "create_view",
        Statement::Drop { .. } => "drop",
        Statement::Truncate { .. } => "truncate",
        Statement::StartTransaction { .. } => "begin",
        Statement::Commit { .. } => "commit",
        Statement::Rollback { .. } => "rollback",
        _ => "other",
    }
}

/// Quote an identifier when it is not a plain lowercase name.
pub fn quote_identifier(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !name.chars().next().unwrap_or('0').is_ascii_digit();
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Node constructors for the handful of shapes the engine assembles itself.
pub mod build {
    use super::*;

    /// A column reference; dotted names become compound identifiers.
    pub fn column(name: &str) -> ExprNode {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() > 1 {
            ExprNode::CompoundIdentifier(parts.into_iter().map(ast::Ident::new).collect())
        } else {
            ExprNode::Identifier(ast::Ident::new(name))
        }
    }

    /// A numeric literal.
    pub fn number(repr: String) -> ExprNode {
        ExprNode::Value(ast::Value::Number(repr, false))
    }

    /// A single-quoted string literal.
    pub fn string(value: &str) -> ExprNode {
        ExprNode::Value(ast::Value::SingleQuotedString(value.to_string()))
    }

    /// A boolean literal.
    pub fn boolean(value: bool) -> ExprNode {
        ExprNode::Value(ast::Value::Boolean(value))
    }

    /// The NULL literal.
    pub fn null() -> ExprNode {
        ExprNode::Value(ast::Value::Null)
    }

    /// A placeholder carrying the given token (e.g. `$3`).
    pub fn placeholder(token: impl Into<String>) -> ExprNode {
        ExprNode::Value(ast::Value::Placeholder(token.into()))
    }

    /// `left = right`
    pub fn eq(left: ExprNode, right: ExprNode) -> ExprNode {
        ExprNode::BinaryOp {
            left: Box::new(left),
            op: ast::BinaryOperator::Eq,
            right: Box::new(right),
        }
    }

    /// `left AND right`
    pub fn and(left: ExprNode, right: ExprNode) -> ExprNode {
        ExprNode::BinaryOp {
            left: Box::new(left),
            op: ast::BinaryOperator::And,
            right: Box::new(right),
        }
    }

    /// `left OR right`
    pub fn or(left: ExprNode, right: ExprNode) -> ExprNode {
        ExprNode::BinaryOp {
            left: Box::new(left),
            op: ast::BinaryOperator::Or,
            right: Box::new(right),
        }
    }

    /// `expr IN (items...)`
    pub fn in_list(expr: ExprNode, items: Vec<ExprNode>) -> ExprNode {
        ExprNode::InList {
            expr: Box::new(expr),
            list: items,
            negated: false,
        }
    }

    /// `expr BETWEEN low AND high`
    pub fn between(expr: ExprNode, low: ExprNode, high: ExprNode) -> ExprNode {
        ExprNode::Between {
            expr: Box::new(expr),
            negated: false,
            low: Box::new(low),
            high: Box::new(high),
        }
    }
}
