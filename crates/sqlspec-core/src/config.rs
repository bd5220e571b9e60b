//! Statement configuration
//!
//! [`StatementConfig`] is the immutable bundle of everything that shapes
//! compilation: dialect, feature toggles, parameter handling, and the
//! pipeline step list. Its fingerprint participates in every cache key, so
//! two configs with equal content are interchangeable and two differing
//! configs can never cross-contaminate a cache namespace.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SqlSpecError};
use crate::fingerprint::Fingerprinter;
use crate::pipeline::{PipelineStep, default_steps};
use crate::style::ParameterStyle;
use crate::value::{TypeTag, Value};

/// A named SQL variant governing parsing and generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    Generic,
    Postgres,
    MySql,
    Sqlite,
    Mssql,
    DuckDb,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
            Self::Mssql => "mssql",
            Self::DuckDb => "duckdb",
        }
    }

    /// The placeholder style drivers for this dialect conventionally expect.
    pub fn default_parameter_style(&self) -> ParameterStyle {
        match self {
            Self::Postgres | Self::DuckDb => ParameterStyle::Numeric,
            Self::Mssql => ParameterStyle::NamedAt,
            Self::Generic | Self::MySql | Self::Sqlite => ParameterStyle::Qmark,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Dialect {
    type Err = SqlSpecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "generic" => Ok(Self::Generic),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            "mssql" | "sqlserver" => Ok(Self::Mssql),
            "duckdb" => Ok(Self::DuckDb),
            other => Err(SqlSpecError::UnsupportedDialect(other.to_string())),
        }
    }
}

/// A named, single-type coercion applied to parameter values before driver
/// hand-off. The name participates in config fingerprints; the function
/// itself cannot.
#[derive(Clone)]
pub struct Coercion {
    pub name: &'static str,
    pub source: TypeTag,
    pub apply: Arc<dyn Fn(Value) -> std::result::Result<Value, String> + Send + Sync>,
}

impl std::fmt::Debug for Coercion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coercion")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

/// How parameters are presented to the target driver.
#[derive(Debug, Clone)]
pub struct ParameterStyleConfig {
    /// The style compiled output uses unless a target is given explicitly
    pub default_style: ParameterStyle,
    /// Styles this driver accepts; always contains `default_style`
    pub supported_styles: Vec<ParameterStyle>,
    /// When false, a collection bound to one placeholder is expanded into a
    /// placeholder per element at compile time
    pub has_native_list_expansion: bool,
    /// When true, multi-statement scripts compile with the static style and
    /// literals inlined
    pub needs_static_script_compilation: bool,
    /// Whether input text may mix placeholder styles
    pub allow_mixed_styles: bool,
    coercions: Vec<Coercion>,
}

impl ParameterStyleConfig {
    pub fn new(default_style: ParameterStyle) -> Self {
        Self {
            default_style,
            supported_styles: vec![default_style],
            has_native_list_expansion: false,
            needs_static_script_compilation: false,
            allow_mixed_styles: true,
            coercions: Vec::new(),
        }
    }

    pub fn with_supported_styles(mut self, styles: impl IntoIterator<Item = ParameterStyle>) -> Self {
        self.supported_styles = styles.into_iter().collect();
        if !self.supported_styles.contains(&self.default_style) {
            self.supported_styles.push(self.default_style);
        }
        self
    }

    pub fn with_native_list_expansion(mut self, native: bool) -> Self {
        self.has_native_list_expansion = native;
        self
    }

    pub fn with_static_script_compilation(mut self, needed: bool) -> Self {
        self.needs_static_script_compilation = needed;
        self
    }

    pub fn with_allow_mixed_styles(mut self, allow: bool) -> Self {
        self.allow_mixed_styles = allow;
        self
    }

    /// Register a coercion for values of the given source type.
    pub fn with_coercion(
        mut self,
        name: &'static str,
        source: TypeTag,
        apply: impl Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.coercions.push(Coercion {
            name,
            source,
            apply: Arc::new(apply),
        });
        self
    }

    pub fn supports(&self, style: ParameterStyle) -> bool {
        style == ParameterStyle::Static || self.supported_styles.contains(&style)
    }

    pub fn coercion_for(&self, source: TypeTag) -> Option<&Coercion> {
        self.coercions.iter().find(|c| c.source == source)
    }

    pub(crate) fn fingerprint_into(&self, f: &mut Fingerprinter) {
        f.write_str(self.default_style.as_str());
        f.write_usize(self.supported_styles.len());
        for s in &self.supported_styles {
            f.write_str(s.as_str());
        }
        f.write_bool(self.has_native_list_expansion);
        f.write_bool(self.needs_static_script_compilation);
        f.write_bool(self.allow_mixed_styles);
        for c in &self.coercions {
            f.write_str(c.name);
            f.write_str(c.source.as_str());
        }
    }
}

impl Default for ParameterStyleConfig {
    fn default() -> Self {
        Self::new(ParameterStyle::Qmark).with_supported_styles(ParameterStyle::SCANNABLE)
    }
}

/// Config-gated validation checks. The required checks (placeholder
/// arithmetic, identifier hygiene) are always on when validation runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationOptions {
    /// Reject literal-equals-literal predicates that are always true
    pub tautology_detection: bool,
    /// Function names that must not appear in statements
    pub forbidden_functions: Vec<String>,
    /// Reject UNION arms whose projection is entirely literal
    pub union_heuristics: bool,
}

impl ValidationOptions {
    fn fingerprint_into(&self, f: &mut Fingerprinter) {
        f.write_bool(self.tautology_detection);
        f.write_usize(self.forbidden_functions.len());
        for name in &self.forbidden_functions {
            f.write_str(name);
        }
        f.write_bool(self.union_heuristics);
    }
}

/// Where a user-registered pipeline step is spliced relative to defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPosition {
    First,
    Last,
    Before(&'static str),
    After(&'static str),
}

/// Immutable statement compilation configuration.
///
/// Cloning is cheap; user steps and coercions are shared by `Arc`.
#[derive(Clone)]
pub struct StatementConfig {
    pub dialect: Dialect,
    pub enable_parsing: bool,
    pub enable_validation: bool,
    pub enable_transformations: bool,
    pub enable_caching: bool,
    pub parameter_config: ParameterStyleConfig,
    pub validation: ValidationOptions,
    user_steps: Vec<(StepPosition, Arc<dyn PipelineStep>)>,
}

impl StatementConfig {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            enable_parsing: true,
            enable_validation: true,
            enable_transformations: true,
            enable_caching: true,
            parameter_config: ParameterStyleConfig::default(),
            validation: ValidationOptions::default(),
            user_steps: Vec::new(),
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_parsing(mut self, enabled: bool) -> Self {
        self.enable_parsing = enabled;
        self
    }

    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = enabled;
        self
    }

    pub fn with_transformations(mut self, enabled: bool) -> Self {
        self.enable_transformations = enabled;
        self
    }

    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.enable_caching = enabled;
        self
    }

    pub fn with_parameter_config(mut self, config: ParameterStyleConfig) -> Self {
        self.parameter_config = config;
        self
    }

    pub fn with_validation_options(mut self, options: ValidationOptions) -> Self {
        self.validation = options;
        self
    }

    /// Register an extra pipeline step at the given position.
    pub fn with_step(mut self, position: StepPosition, step: Arc<dyn PipelineStep>) -> Self {
        self.user_steps.push((position, step));
        self
    }

    /// The ordered step list for this config: the enabled defaults with
    /// user-registered steps spliced in.
    pub fn composed_steps(&self) -> Vec<Arc<dyn PipelineStep>> {
        let mut steps = default_steps(self.enable_transformations, self.enable_validation);
        for (position, step) in &self.user_steps {
            match position {
                StepPosition::First => steps.insert(0, step.clone()),
                StepPosition::Last => steps.push(step.clone()),
                StepPosition::Before(anchor) => {
                    let at = steps
                        .iter()
                        .position(|s| s.name() == *anchor)
                        .unwrap_or(0);
                    steps.insert(at, step.clone());
                }
                StepPosition::After(anchor) => {
                    let at = steps
                        .iter()
                        .position(|s| s.name() == *anchor)
                        .map(|i| i + 1)
                        .unwrap_or(steps.len());
                    steps.insert(at, step.clone());
                }
            }
        }
        steps
    }

    /// Stable content fingerprint. Identical configs hash identically and
    /// are interchangeable cache keys.
    pub fn fingerprint(&self) -> u64 {
        let mut f = Fingerprinter::new();
        f.write_str(self.dialect.name());
        f.write_bool(self.enable_parsing);
        f.write_bool(self.enable_validation);
        f.write_bool(self.enable_transformations);
        f.write_bool(self.enable_caching);
        self.parameter_config.fingerprint_into(&mut f);
        self.validation.fingerprint_into(&mut f);
        for step in self.composed_steps() {
            f.write_str(step.name());
        }
        f.finish()
    }
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self::new(Dialect::Generic)
    }
}

impl std::fmt::Debug for StatementConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementConfig")
            .field("dialect", &self.dialect)
            .field("enable_parsing", &self.enable_parsing)
            .field("enable_validation", &self.enable_validation)
            .field("enable_transformations", &self.enable_transformations)
            .field("enable_caching", &self.enable_caching)
            .field("parameter_config", &self.parameter_config)
            .field("validation", &self.validation)
            .field(
                "steps",
                &self
                    .composed_steps()
                    .iter()
                    .map(|s| s.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
