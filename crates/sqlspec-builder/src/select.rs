//! SELECT builder

use sqlspec_core::{Result, Sql, SqlSpecError, StatementConfig, ValidationKind, ast};

use crate::expr::{Cond, quote_path};

/// Start a SELECT over the given projection; empty means `*`.
pub fn select<'a>(columns: impl IntoIterator<Item = &'a str>) -> SelectBuilder {
    SelectBuilder {
        config: StatementConfig::default(),
        distinct: false,
        columns: columns.into_iter().map(quote_path).collect(),
        table: None,
        conditions: Vec::new(),
        group_by: Vec::new(),
        order: Vec::new(),
        limit: None,
        offset: None,
    }
}

/// Fluent SELECT constructor; `build()` materializes an immutable [`Sql`].
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    config: StatementConfig,
    distinct: bool,
    columns: Vec<String>,
    table: Option<String>,
    conditions: Vec<Cond>,
    group_by: Vec<String>,
    order: Vec<(String, bool)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectBuilder {
    pub fn with_config(mut self, config: StatementConfig) -> Self {
        self.config = config;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn from_(mut self, table: &str) -> Self {
        self.table = Some(quote_path(table));
        self
    }

    /// AND a predicate onto the WHERE clause.
    pub fn where_(mut self, condition: Cond) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Alias of [`Self::where_`], reads better in chains.
    pub fn and_where(self, condition: Cond) -> Self {
        self.where_(condition)
    }

    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by.push(quote_path(column));
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push((quote_path(column), ascending));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    fn render(&self) -> Result<String> {
        let table = self.table.as_ref().ok_or_else(|| {
            SqlSpecError::validation(
                ValidationKind::MissingSource,
                "SELECT requires a source table; call from_()",
            )
        })?;

        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(table);
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(
                &self
                    .conditions
                    .iter()
                    .map(|c| c.as_sql().to_string())
                    .collect::<Vec<_>>()
                    .join(" AND "),
            );
        }
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(
                &self
                    .order
                    .iter()
                    .map(|(column, ascending)| {
                        format!("{} {}", column, if *ascending { "ASC" } else { "DESC" })
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        Ok(sql)
    }

    /// Deterministic state bytes for builder-cache keying.
    pub fn state_fingerprint(&self) -> Result<Vec<u8>> {
        let mut bytes = b"select\0".to_vec();
        bytes.extend_from_slice(self.render()?.as_bytes());
        bytes.extend_from_slice(&self.config.fingerprint().to_le_bytes());
        Ok(bytes)
    }

    /// Materialize the built statement. Pure: repeated calls on the same
    /// state produce equal statements.
    pub fn build(&self) -> Result<Sql> {
        let sql = self.render()?;
        let expression = ast::parse_one(&sql, self.config.dialect)?;
        Ok(Sql::from_builder_output(
            expression,
            self.config.clone(),
            self.state_fingerprint()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::col;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_basic_select() {
        let sql = select(["id", "name"]).from_("users").build().unwrap();
        assert_eq!(sql.text(), "SELECT id, name FROM users");
    }

    #[test]
    fn test_star_projection() {
        let sql = select([]).from_("users").build().unwrap();
        assert_eq!(sql.text(), "SELECT * FROM users");
    }

    #[test]
    fn test_full_chain() {
        let sql = select(["id"])
            .from_("users")
            .where_(col("active").eq(true))
            .where_(col("age").gt(21i64))
            .order_by("name", true)
            .limit(10)
            .offset(20)
            .build()
            .unwrap();
        assert_eq!(
            sql.text(),
            "SELECT id FROM users WHERE active = TRUE AND age > 21 ORDER BY name ASC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_distinct_and_group_by() {
        let sql = select(["city"])
            .distinct()
            .from_("users")
            .group_by("city")
            .build()
            .unwrap();
        assert_eq!(sql.text(), "SELECT DISTINCT city FROM users GROUP BY city");
    }

    #[test]
    fn test_missing_from_fails() {
        let err = select(["id"]).build().unwrap_err();
        assert!(matches!(
            err,
            SqlSpecError::Validation {
                kind: ValidationKind::MissingSource,
                ..
            }
        ));
    }

    #[test]
    fn test_build_is_idempotent() {
        let builder = select(["id"]).from_("users").where_(col("a").eq(1i64));
        let first = builder.build().unwrap();
        let second = builder.build().unwrap();
        assert_eq!(first.text(), second.text());
        assert_eq!(
            builder.state_fingerprint().unwrap(),
            builder.state_fingerprint().unwrap()
        );
    }

    #[test]
    fn test_equal_op_sequences_build_equal_statements() {
        let a = select(["id"]).from_("t").where_(col("x").eq(1i64)).limit(5);
        let b = select(["id"]).from_("t").where_(col("x").eq(1i64)).limit(5);
        assert_eq!(a.build().unwrap().text(), b.build().unwrap().text());
        assert_eq!(
            a.state_fingerprint().unwrap(),
            b.state_fingerprint().unwrap()
        );
    }

    #[test]
    fn test_built_statement_compiles_with_parameterized_literals() {
        let sql = select(["id"])
            .from_("users")
            .where_(col("active").eq(true))
            .build()
            .unwrap();
        let compiled = sql.compile().unwrap();
        assert_eq!(compiled.sql, "SELECT id FROM users WHERE active = ?");
        assert_eq!(compiled.parameters.single().len(), 1);
    }
}
