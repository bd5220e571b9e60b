//! Parameter placeholder styles

use serde::{Deserialize, Serialize};

use crate::error::{Result, SqlSpecError};

/// The placeholder syntax a database driver expects.
///
/// Closed set; each variant maps to a literal token form in compiled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterStyle {
    /// `?` - JDBC, MySQL, SQLite
    Qmark,
    /// `$N` (1-based) - PostgreSQL
    Numeric,
    /// `:name` - Oracle, SQLite
    NamedColon,
    /// `@name` - SQL Server
    NamedAt,
    /// `:N` (1-based) - Oracle positional
    PositionalColon,
    /// `%s` - DB-API pyformat positional
    PositionalPyformat,
    /// `%(name)s` - DB-API pyformat named
    NamedPyformat,
    /// No placeholders; literals are inlined (script compilation)
    Static,
}

impl ParameterStyle {
    /// All styles that can appear in input text. `Static` never does.
    pub const SCANNABLE: [ParameterStyle; 7] = [
        ParameterStyle::Qmark,
        ParameterStyle::Numeric,
        ParameterStyle::NamedColon,
        ParameterStyle::NamedAt,
        ParameterStyle::PositionalColon,
        ParameterStyle::PositionalPyformat,
        ParameterStyle::NamedPyformat,
    ];

    /// Whether placeholders of this style carry a name.
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            Self::NamedColon | Self::NamedAt | Self::NamedPyformat
        )
    }

    /// Whether placeholders of this style are resolved by position.
    pub fn is_positional(&self) -> bool {
        matches!(
            self,
            Self::Qmark | Self::Numeric | Self::PositionalColon | Self::PositionalPyformat
        )
    }

    /// Render the output token for the placeholder at `index` (0-based
    /// output ordinal). Named styles take the semantic name; positional
    /// callers may pass `None`.
    ///
    /// Named styles fall back to a synthesized `paramN` name when the
    /// source parameter was positional.
    pub fn token(&self, index: usize, name: Option<&str>) -> String {
        let synthesized;
        let name = match name {
            Some(n) => n,
            None => {
                synthesized = format!("param{}", index + 1);
                &synthesized
            }
        };
        match self {
            Self::Qmark => "?".to_string(),
            Self::Numeric => format!("${}", index + 1),
            Self::NamedColon => format!(":{}", name),
            Self::NamedAt => format!("@{}", name),
            Self::PositionalColon => format!(":{}", index + 1),
            Self::PositionalPyformat => "%s".to_string(),
            Self::NamedPyformat => format!("%({})s", name),
            Self::Static => String::new(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Qmark => "qmark",
            Self::Numeric => "numeric",
            Self::NamedColon => "named_colon",
            Self::NamedAt => "named_at",
            Self::PositionalColon => "positional_colon",
            Self::PositionalPyformat => "positional_pyformat",
            Self::NamedPyformat => "named_pyformat",
            Self::Static => "static",
        }
    }
}

impl std::fmt::Display for ParameterStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ParameterStyle {
    type Err = SqlSpecError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "qmark" => Ok(Self::Qmark),
            "numeric" => Ok(Self::Numeric),
            "named_colon" => Ok(Self::NamedColon),
            "named_at" => Ok(Self::NamedAt),
            "positional_colon" => Ok(Self::PositionalColon),
            "positional_pyformat" => Ok(Self::PositionalPyformat),
            "named_pyformat" => Ok(Self::NamedPyformat),
            "static" => Ok(Self::Static),
            other => Err(SqlSpecError::Configuration(format!(
                "unknown parameter style: {}",
                other
            ))),
        }
    }
}
