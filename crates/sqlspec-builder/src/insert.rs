//! INSERT builder

use sqlspec_core::{Result, Sql, SqlSpecError, StatementConfig, Value, ValidationKind, ast};

use crate::expr::quote_path;

/// Start an INSERT into the given table.
pub fn insert_into(table: &str) -> InsertBuilder {
    InsertBuilder {
        config: StatementConfig::default(),
        table: quote_path(table),
        columns: Vec::new(),
        rows: Vec::new(),
        returning: Vec::new(),
    }
}

#[derive(Debug, Clone)]
pub struct InsertBuilder {
    config: StatementConfig,
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    returning: Vec<String>,
}

impl InsertBuilder {
    pub fn with_config(mut self, config: StatementConfig) -> Self {
        self.config = config;
        self
    }

    pub fn columns<'a>(mut self, columns: impl IntoIterator<Item = &'a str>) -> Self {
        self.columns = columns.into_iter().map(quote_path).collect();
        self
    }

    /// Append one row of values. May be called repeatedly for multi-row
    /// inserts.
    pub fn values<V: Into<Value>>(mut self, row: impl IntoIterator<Item = V>) -> Self {
        self.rows.push(row.into_iter().map(Into::into).collect());
        self
    }

    pub fn returning<'a>(mut self, columns: impl IntoIterator<Item = &'a str>) -> Self {
        self.returning = columns.into_iter().map(quote_path).collect();
        self
    }

    fn render(&self) -> Result<String> {
        if self.rows.is_empty() {
            return Err(SqlSpecError::validation(
                ValidationKind::MissingSource,
                "INSERT requires at least one row of values",
            ));
        }
        for row in &self.rows {
            if !self.columns.is_empty() && row.len() != self.columns.len() {
                return Err(SqlSpecError::Configuration(format!(
                    "row has {} values but {} columns were named",
                    row.len(),
                    self.columns.len()
                )));
            }
        }

        let mut sql = format!("INSERT INTO {}", self.table);
        if !self.columns.is_empty() {
            sql.push_str(&format!(" ({})", self.columns.join(", ")));
        }
        sql.push_str(" VALUES ");
        sql.push_str(
            &self
                .rows
                .iter()
                .map(|row| {
                    format!(
                        "({})",
                        row.iter()
                            .map(Value::to_sql_literal)
                            .collect::<Vec<_>>()
                            .join(", ")
                    )
                })
                .collect::<Vec<_>>()
                .join(", "),
        );
        if !self.returning.is_empty() {
            sql.push_str(&format!(" RETURNING {}", self.returning.join(", ")));
        }
        Ok(sql)
    }

    pub fn state_fingerprint(&self) -> Result<Vec<u8>> {
        let mut bytes = b"insert\0".to_vec();
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_row() {
        let sql = insert_into("users")
            .columns(["name", "age"])
            .values(["ann".into(), Value::Int(30)])
            .build()
            .unwrap();
        assert_eq!(
            sql.text(),
            "INSERT INTO users (name, age) VALUES ('ann', 30)"
        );
    }

    #[test]
    fn test_multi_row() {
        let sql = insert_into("t")
            .columns(["a"])
            .values([Value::Int(1)])
            .values([Value::Int(2)])
            .build()
            .unwrap();
        assert_eq!(sql.text(), "INSERT INTO t (a) VALUES (1), (2)");
    }

    #[test]
    fn test_returning_marks_rows() {
        let sql = insert_into("users")
            .columns(["name"])
            .values(["ann"])
            .returning(["id"])
            .build()
            .unwrap();
        assert!(sql.text().ends_with("RETURNING id"));
        assert!(sql.returns_rows());
    }

    #[test]
    fn test_no_rows_fails() {
        assert!(matches!(
            insert_into("t").columns(["a"]).build(),
            Err(SqlSpecError::Validation { .. })
        ));
    }

    #[test]
    fn test_column_arity_mismatch() {
        let err = insert_into("t")
            .columns(["a", "b"])
            .values([Value::Int(1)])
            .build()
            .unwrap_err();
        assert!(matches!(err, SqlSpecError::Configuration(_)));
    }

    #[test]
    fn test_compiles_to_placeholders() {
        let sql = insert_into("t")
            .columns(["a", "b"])
            .values([Value::Int(1), Value::Text("x".into())])
            .build()
            .unwrap();
        let compiled = sql.compile().unwrap();
        assert_eq!(compiled.sql, "INSERT INTO t (a, b) VALUES (?, ?)");
        assert_eq!(compiled.parameters.single().len(), 2);
    }
}
