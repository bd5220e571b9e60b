//! Literal parameterization step

use crate::ast;
use crate::error::Result;
use crate::value::TypedParameter;

use super::{PipelineStep, TransformContext};

/// Replaces inline literals with placeholders, appending their values to
/// the extracted parameter vector in source order.
///
/// Placeholders are numbered after the statement's existing ones so the
/// downstream style conversion can renumber everything consistently.
/// LIMIT, OFFSET, and ORDER BY values stay literal: ordinals there are
/// positional, and many databases reject placeholders in those clauses.
/// Boolean identity operands (`x AND TRUE`, `x OR FALSE`) are folded
/// away rather than extracted.
pub struct ParameterizeLiterals;

impl PipelineStep for ParameterizeLiterals {
    fn name(&self) -> &'static str {
        "parameterize_literals"
    }

    fn apply(&self, ctx: &mut TransformContext) -> Result<()> {
        let stashed = ast::take_fixed_clauses(&mut ctx.current);

        // Identity folds must happen while the operand is still a
        // literal; after extraction it is a placeholder and no rewrite
        // may touch it.
        super::optimize::fold_boolean_identities(&mut ctx.current);

        let base = ctx.base_placeholders;
        let mut extracted: Vec<TypedParameter> = std::mem::take(&mut ctx.extracted);
        ast::transform_expressions(&mut ctx.current, |expr| {
            if let Some(value) = ast::literal_value(expr) {
                let token = format!("${}", base + extracted.len() + 1);
                *expr = ast::build::placeholder(token);
                extracted.push(TypedParameter::new(value));
            }
        });
        let count = extracted.len();
        ctx.extracted = extracted;

        ast::restore_fixed_clauses(&mut ctx.current, stashed);

        if count > 0 {
            tracing::debug!(extracted = count, "parameterized inline literals");
        }
        ctx.set_metadata("literals.extracted", count);
        Ok(())
    }
}
