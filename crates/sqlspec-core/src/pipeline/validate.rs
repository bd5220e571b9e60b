//! Statement validation step

use crate::ast::{self, BinaryOperator, ExprNode};
use crate::error::{Result, SqlSpecError, ValidationKind};

use super::{PipelineStep, TransformContext};

/// Characters that never belong in an identifier, whatever the dialect.
const FORBIDDEN_IDENT_CHARS: [char; 5] = [';', '\'', '"', '\\', '\0'];

/// Enforces the configured statement guards.
///
/// Placeholder arithmetic and identifier hygiene always run; tautology
/// detection, the function deny list, and the UNION heuristic are gated
/// by [`crate::config::ValidationOptions`].
pub struct Validate;

impl PipelineStep for Validate {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn apply(&self, ctx: &mut TransformContext) -> Result<()> {
        check_placeholder_counts(ctx)?;
        check_identifiers(ctx)?;

        if ctx.config.validation.tautology_detection {
            check_tautologies(ctx)?;
        }
        if !ctx.config.validation.forbidden_functions.is_empty() {
            check_forbidden_functions(ctx)?;
        }
        if ctx.config.validation.union_heuristics {
            check_union_arms(ctx)?;
        }
        Ok(())
    }
}

fn check_placeholder_counts(ctx: &TransformContext) -> Result<()> {
    let placeholders = ast::find_placeholders(&ctx.current).len();
    let parameters = ctx.total_parameters();
    if placeholders != parameters {
        return Err(SqlSpecError::ParameterCountMismatch {
            expected: placeholders,
            actual: parameters,
        });
    }
    Ok(())
}

fn check_identifiers(ctx: &TransformContext) -> Result<()> {
    let mut names = ast::find_identifiers(&ctx.current);
    names.extend(
        ast::find_relations(&ctx.current)
            .into_iter()
            .flat_map(|r| r.split('.').map(String::from).collect::<Vec<_>>()),
    );
    for name in names {
        if name.contains(FORBIDDEN_IDENT_CHARS) || name.contains("--") {
            return Err(SqlSpecError::validation_at(
                ValidationKind::ForbiddenIdentifier,
                "identifier contains forbidden characters",
                name,
            ));
        }
    }
    Ok(())
}

/// Tautology scanning runs against the original expression: by the time
/// validation runs, literal parameterization has already rewritten
/// `1 = 1` into `$n = $m` in the current tree.
fn check_tautologies(ctx: &TransformContext) -> Result<()> {
    let mut tautology: Option<String> = None;
    let _ = ast::find_expressions(&ctx.original, |expr| {
        if tautology.is_none() {
            if let ExprNode::BinaryOp {
                left,
                op: BinaryOperator::Eq,
                right,
            } = expr
            {
                if let (Some(l), Some(r)) = (ast::literal_value(left), ast::literal_value(right)) {
                    if l == r {
                        tautology = Some(expr.to_string());
                    }
                }
            }
        }
        false
    });
    match tautology {
        Some(location) => Err(SqlSpecError::validation_at(
            ValidationKind::Tautology,
            "predicate is always true",
            location,
        )),
        None => Ok(()),
    }
}

fn check_forbidden_functions(ctx: &TransformContext) -> Result<()> {
    let deny = &ctx.config.validation.forbidden_functions;
    for name in ast::find_function_names(&ctx.original) {
        let bare = name.rsplit('.').next().unwrap_or(&name);
        if deny.iter().any(|f| f.eq_ignore_ascii_case(bare)) {
            return Err(SqlSpecError::validation_at(
                ValidationKind::ForbiddenFunction,
                "function is not allowed",
                name,
            ));
        }
    }
    Ok(())
}

fn check_union_arms(ctx: &TransformContext) -> Result<()> {
    if ast::has_literal_union_arm(&ctx.original) {
        return Err(SqlSpecError::validation(
            ValidationKind::UnionInjection,
            "UNION arm projects only literals",
        ));
    }
    Ok(())
}
