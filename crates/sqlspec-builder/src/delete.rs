//! DELETE builder

use sqlspec_core::{Result, Sql, StatementConfig, ast};

use crate::expr::{Cond, quote_path};

/// Start a DELETE from the given table.
pub fn delete_from(table: &str) -> DeleteBuilder {
    DeleteBuilder {
        config: StatementConfig::default(),
        table: quote_path(table),
        conditions: Vec::new(),
    }
}

#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    config: StatementConfig,
    table: String,
    conditions: Vec<Cond>,
}

impl DeleteBuilder {
    pub fn with_config(mut self, config: StatementConfig) -> Self {
        self.config = config;
        self
    }

    pub fn where_(mut self, condition: Cond) -> Self {
        self.conditions.push(condition);
        self
    }

    fn render(&self) -> String {
        let mut sql = format!("DELETE FROM {}", self.table);
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
        sql
    }

    pub fn state_fingerprint(&self) -> Vec<u8> {
        let mut bytes = b"delete\0".to_vec();
        bytes.extend_from_slice(self.render().as_bytes());
        bytes.extend_from_slice(&self.config.fingerprint().to_le_bytes());
        bytes
    }

    pub fn build(&self) -> Result<Sql> {
        let sql = self.render();
        let expression = ast::parse_one(&sql, self.config.dialect)?;
        Ok(Sql::from_builder_output(
            expression,
            self.config.clone(),
            self.state_fingerprint(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::col;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_delete_with_where() {
        let sql = delete_from("users")
            .where_(col("id").eq(7i64))
            .build()
            .unwrap();
        assert_eq!(sql.text(), "DELETE FROM users WHERE id = 7");
    }

    #[test]
    fn test_unfiltered_delete_builds() {
        let sql = delete_from("sessions").build().unwrap();
        assert_eq!(sql.text(), "DELETE FROM sessions");
    }

    #[test]
    fn test_delete_compiles() {
        let sql = delete_from("users")
            .where_(col("age").lt(18i64))
            .build()
            .unwrap();
        let compiled = sql.compile().unwrap();
        assert_eq!(compiled.sql, "DELETE FROM users WHERE age < ?");
    }
}
