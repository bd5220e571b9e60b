//! Condition DSL
//!
//! Small fluent surface for building predicates: `col("age").gt(18)`,
//! combined with `.and()` / `.or()`. Values are rendered as literals; the
//! compilation pipeline parameterizes them, so nothing here touches
//! placeholder numbering.

use sqlspec_core::{Value, ast};

/// Quote a possibly-dotted table/column path.
pub(crate) fn quote_path(name: &str) -> String {
    name.split('.')
        .map(ast::quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

/// Start a predicate from a column reference.
pub fn col(name: &str) -> ColumnRef {
    ColumnRef {
        name: name.to_string(),
    }
}

/// A column reference awaiting an operator.
#[derive(Debug, Clone)]
pub struct ColumnRef {
    name: String,
}

impl ColumnRef {
    fn rendered(&self) -> String {
        self.name
            .split('.')
            .map(ast::quote_identifier)
            .collect::<Vec<_>>()
            .join(".")
    }

    fn binary(self, op: &str, value: impl Into<Value>) -> Cond {
        Cond {
            sql: format!(
                "{} {} {}",
                self.rendered(),
                op,
                value.into().to_sql_literal()
            ),
        }
    }

    pub fn eq(self, value: impl Into<Value>) -> Cond {
        self.binary("=", value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Cond {
        self.binary("<>", value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Cond {
        self.binary(">", value)
    }

    pub fn ge(self, value: impl Into<Value>) -> Cond {
        self.binary(">=", value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Cond {
        self.binary("<", value)
    }

    pub fn le(self, value: impl Into<Value>) -> Cond {
        self.binary("<=", value)
    }

    /// Compare against another column rather than a value.
    pub fn eq_col(self, other: &str) -> Cond {
        let right = col(other).rendered();
        Cond {
            sql: format!("{} = {}", self.rendered(), right),
        }
    }

    pub fn like(self, pattern: impl Into<String>) -> Cond {
        Cond {
            sql: format!(
                "{} LIKE {}",
                self.rendered(),
                Value::Text(pattern.into()).to_sql_literal()
            ),
        }
    }

    pub fn is_null(self) -> Cond {
        Cond {
            sql: format!("{} IS NULL", self.rendered()),
        }
    }

    pub fn is_not_null(self) -> Cond {
        Cond {
            sql: format!("{} IS NOT NULL", self.rendered()),
        }
    }

    pub fn in_list<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Cond {
        let items: Vec<String> = values
            .into_iter()
            .map(|v| v.into().to_sql_literal())
            .collect();
        Cond {
            sql: format!("{} IN ({})", self.rendered(), items.join(", ")),
        }
    }

    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Cond {
        Cond {
            sql: format!(
                "{} BETWEEN {} AND {}",
                self.rendered(),
                low.into().to_sql_literal(),
                high.into().to_sql_literal()
            ),
        }
    }
}

/// A rendered predicate fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cond {
    sql: String,
}

impl Cond {
    /// An opaque predicate written by hand.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    pub fn and(self, other: Cond) -> Cond {
        Cond {
            sql: format!("({} AND {})", self.sql, other.sql),
        }
    }

    pub fn or(self, other: Cond) -> Cond {
        Cond {
            sql: format!("({} OR {})", self.sql, other.sql),
        }
    }

    pub fn not(self) -> Cond {
        Cond {
            sql: format!("NOT ({})", self.sql),
        }
    }

    pub fn as_sql(&self) -> &str {
        &self.sql
    }
}

impl std::fmt::Display for Cond {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql)
    }
}
