//! MERGE builder

use sqlspec_core::{Result, Sql, SqlSpecError, StatementConfig, Value, ValidationKind, ast};

use crate::expr::{Cond, quote_path};

/// Start a MERGE into the given target table.
pub fn merge_into(table: &str) -> MergeBuilder {
    MergeBuilder {
        config: StatementConfig::default(),
        table: quote_path(table),
        source: None,
        on: None,
        matched_assignments: Vec::new(),
        insert_columns: Vec::new(),
        insert_values: Vec::new(),
    }
}

#[derive(Debug, Clone)]
pub struct MergeBuilder {
    config: StatementConfig,
    table: String,
    source: Option<String>,
    on: Option<Cond>,
    /// (column, rendered right-hand side)
    matched_assignments: Vec<(String, String)>,
    insert_columns: Vec<String>,
    insert_values: Vec<String>,
}

impl MergeBuilder {
    pub fn with_config(mut self, config: StatementConfig) -> Self {
        self.config = config;
        self
    }

    /// The source relation and join condition. `source` is taken verbatim
    /// when it carries an alias or subquery.
    pub fn using(mut self, source: &str, on: Cond) -> Self {
        let rendered = if source.contains(char::is_whitespace) || source.contains('(') {
            source.to_string()
        } else {
            quote_path(source)
        };
        self.source = Some(rendered);
        self.on = Some(on);
        self
    }

    /// WHEN MATCHED THEN UPDATE SET column = <literal value>.
    pub fn when_matched_set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.matched_assignments
            .push((quote_path(column), value.into().to_sql_literal()));
        self
    }

    /// WHEN MATCHED THEN UPDATE SET column = <expression>, e.g. a source
    /// column reference.
    pub fn when_matched_set_expr(mut self, column: &str, expr: &str) -> Self {
        self.matched_assignments
            .push((quote_path(column), expr.to_string()));
        self
    }

    /// WHEN NOT MATCHED THEN INSERT (columns) VALUES (expressions).
    pub fn when_not_matched_insert<'a>(
        mut self,
        columns: impl IntoIterator<Item = &'a str>,
        values: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        self.insert_columns = columns.into_iter().map(quote_path).collect();
        self.insert_values = values.into_iter().map(String::from).collect();
        self
    }

    fn render(&self) -> Result<String> {
        let source = self.source.as_ref().ok_or_else(|| {
            SqlSpecError::validation(
                ValidationKind::MissingSource,
                "MERGE requires a source; call using()",
            )
        })?;
        let on = self.on.as_ref().expect("using() always sets the condition");
        if self.matched_assignments.is_empty() && self.insert_columns.is_empty() {
            return Err(SqlSpecError::Configuration(
                "MERGE requires at least one WHEN clause".to_string(),
            ));
        }

        let mut sql = format!("MERGE INTO {} USING {} ON {}", self.table, source, on);
        if !self.matched_assignments.is_empty() {
            sql.push_str(" WHEN MATCHED THEN UPDATE SET ");
            sql.push_str(
                &self
                    .matched_assignments
                    .iter()
                    .map(|(column, rhs)| format!("{} = {}", column, rhs))
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }
        if !self.insert_columns.is_empty() {
            sql.push_str(&format!(
                " WHEN NOT MATCHED THEN INSERT ({}) VALUES ({})",
                self.insert_columns.join(", "),
                self.insert_values.join(", ")
            ));
        }
        Ok(sql)
    }

    pub fn state_fingerprint(&self) -> Result<Vec<u8>> {
        let mut bytes = b"merge\0".to_vec();
        bytes.extend_from_slice(self.render()?.as_bytes());
        bytes.extend_from_slice(&self.config.fingerprint().to_le_bytes());
        Ok(bytes)
    }

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
