//! EXPLAIN builder

use sqlspec_core::{Result, Sql, StatementConfig, ast};

/// Wrap an existing statement in EXPLAIN.
pub fn explain(statement: &Sql) -> ExplainBuilder {
    explain_sql(statement.text())
}

/// Wrap raw SQL text in EXPLAIN.
pub fn explain_sql(sql: &str) -> ExplainBuilder {
    ExplainBuilder {
        config: StatementConfig::default(),
        inner: sql.to_string(),
        analyze: false,
        verbose: false,
    }
}

#[derive(Debug, Clone)]
pub struct ExplainBuilder {
    config: StatementConfig,
    inner: String,
    analyze: bool,
    verbose: bool,
}

impl ExplainBuilder {
    pub fn with_config(mut self, config: StatementConfig) -> Self {
        self.config = config;
        self
    }

    /// Execute the statement and report actual timings.
    pub fn analyze(mut self) -> Self {
        self.analyze = true;
        self
    }

    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    fn render(&self) -> String {
        let mut sql = String::from("EXPLAIN ");
        if self.analyze {
            sql.push_str("ANALYZE ");
        }
        if self.verbose {
            sql.push_str("VERBOSE ");
        }
        sql.push_str(&self.inner);
        sql
    }

    pub fn state_fingerprint(&self) -> Vec<u8> {
        let mut bytes = b"explain\0".to_vec();
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
