//! UPDATE builder

use sqlspec_core::{Result, Sql, SqlSpecError, StatementConfig, Value, ValidationKind, ast};

use crate::expr::{Cond, quote_path};

/// Start an UPDATE of the given table.
pub fn update(table: &str) -> UpdateBuilder {
    UpdateBuilder {
        config: StatementConfig::default(),
        table: quote_path(table),
        assignments: Vec::new(),
        conditions: Vec::new(),
    }
}

#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    config: StatementConfig,
    table: String,
    assignments: Vec<(String, Value)>,
    conditions: Vec<Cond>,
}

impl UpdateBuilder {
    pub fn with_config(mut self, config: StatementConfig) -> Self {
        self.config = config;
        self
    }

    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.assignments.push((quote_path(column), value.into()));
        self
    }

    pub fn where_(mut self, condition: Cond) -> Self {
        self.conditions.push(condition);
        self
    }

    fn render(&self) -> Result<String> {
        if self.assignments.is_empty() {
            return Err(SqlSpecError::validation(
                ValidationKind::MissingSource,
                "UPDATE requires at least one SET assignment",
            ));
        }
        let mut sql = format!("UPDATE {} SET ", self.table);
        sql.push_str(
            &self
                .assignments
                .iter()
                .map(|(column, value)| format!("{} = {}", column, value.to_sql_literal()))
                .collect::<Vec<_>>()
                .join(", "),
        );
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
        Ok(sql)
    }

    pub fn state_fingerprint(&self) -> Result<Vec<u8>> {
        let mut bytes = b"update\0".to_vec();
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
