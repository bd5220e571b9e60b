//! AST transformation pipeline
//!
//! An ordered list of named steps, each a pure transformation of the
//! compilation context. The default chain is literal parameterization,
//! optimization, then validation; configs may splice user steps anywhere
//! around those.

mod literals;
mod optimize;
mod validate;

pub use literals::ParameterizeLiterals;
pub use optimize::Optimize;
pub use validate::Validate;

use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::Expression;
use crate::cache::CacheRegistry;
use crate::config::{Dialect, StatementConfig};
use crate::error::Result;
use crate::value::TypedParameter;

/// Mutable state threaded through one pipeline invocation.
///
/// `original` is the pristine parsed expression; steps transform
/// `current` and must never mutate `original`.
pub struct TransformContext {
    /// The expression being transformed
    pub current: Expression,
    /// The expression as parsed, untouched
    pub original: Arc<Expression>,
    /// Placeholders present before the pipeline ran (user + filter)
    pub base_placeholders: usize,
    /// Parameters available before the pipeline ran (user + filter)
    pub provided_parameters: usize,
    /// Parameters extracted from literals, appended by the pipeline
    pub extracted: Vec<TypedParameter>,
    pub dialect: Dialect,
    /// Step-attached metadata; on key collisions the later step wins
    pub metadata: IndexMap<String, serde_json::Value>,
    pub config: StatementConfig,
    /// Caches, absent when caching is disabled
    pub caches: Option<Arc<CacheRegistry>>,
}

impl TransformContext {
    pub fn new(
        expression: Expression,
        base_placeholders: usize,
        provided_parameters: usize,
        config: StatementConfig,
        caches: Option<Arc<CacheRegistry>>,
    ) -> Self {
        let original = Arc::new(expression.clone());
        Self {
            current: expression,
            original,
            base_placeholders,
            provided_parameters,
            extracted: Vec::new(),
            dialect: config.dialect,
            metadata: IndexMap::new(),
            config,
            caches,
        }
    }

    /// Attach step metadata. Later writers win.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Total placeholders the compiled statement will carry.
    pub fn total_placeholders(&self) -> usize {
        self.base_placeholders + self.extracted.len()
    }

    /// Total parameters available for binding.
    pub fn total_parameters(&self) -> usize {
        self.provided_parameters + self.extracted.len()
    }
}

impl std::fmt::Debug for TransformContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformContext")
            .field("dialect", &self.dialect)
            .field("base_placeholders", &self.base_placeholders)
            .field("provided_parameters", &self.provided_parameters)
            .field("extracted", &self.extracted.len())
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// One named transformation over the compilation context.
pub trait PipelineStep: Send + Sync {
    /// Stable step name, used for ordering anchors, metadata, and config
    /// fingerprints.
    fn name(&self) -> &'static str;

    fn apply(&self, ctx: &mut TransformContext) -> Result<()>;
}

/// The default step chain for the given feature toggles.
pub fn default_steps(transformations: bool, validation: bool) -> Vec<Arc<dyn PipelineStep>> {
    let mut steps: Vec<Arc<dyn PipelineStep>> = Vec::new();
    if transformations {
        steps.push(Arc::new(ParameterizeLiterals));
        steps.push(Arc::new(Optimize));
    }
    if validation {
        steps.push(Arc::new(Validate));
    }
    steps
}

/// Run a composed step chain over the context, recording each step name.
pub fn run_steps(steps: &[Arc<dyn PipelineStep>], ctx: &mut TransformContext) -> Result<()> {
    for step in steps {
        tracing::trace!(step = step.name(), "running pipeline step");
        step.apply(ctx)?;
    }
    ctx.set_metadata(
        "pipeline.steps",
        serde_json::Value::Array(
            steps
                .iter()
                .map(|s| serde_json::Value::String(s.name().to_string()))
                .collect(),
        ),
    );
    Ok(())
}
