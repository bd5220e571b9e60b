//! Expression optimization step

use std::sync::Arc;

use crate::ast::{self, BinaryOperator, ExprNode, UnaryOperator};
use crate::error::Result;
use crate::fingerprint::Fingerprinter;

use super::{PipelineStep, TransformContext};

/// The rewrite set applied by [`Optimize`]; part of the optimized-cache
/// key so changing the set invalidates prior entries.
const REWRITE_SET: &str = "canonical-v1";

/// Canonicalizing AST rewrites: redundant parentheses, double negation,
/// and boolean identity operands. In the default chain the literal step
/// has already folded boolean identities before extracting anything, so
/// the identity rule here only bites under custom step orders where
/// literals survive into this step. Results are cached per (expression,
/// dialect, rewrite set).
pub struct Optimize;

impl PipelineStep for Optimize {
    fn name(&self) -> &'static str {
        "optimize"
    }

    fn apply(&self, ctx: &mut TransformContext) -> Result<()> {
        let mut key = Fingerprinter::new();
        key.write_u64(ast::expression_fingerprint(&ctx.current));
        key.write_str(ctx.dialect.name());
        key.write_str(REWRITE_SET);
        let key = key.finish();

        let optimized = match &ctx.caches {
            Some(caches) => caches
                .optimized()
                .get_or_compute(key, || Ok(Arc::new(rewrite(ctx.current.clone()))))?,
            None => Arc::new(rewrite(ctx.current.clone())),
        };

        let changed = *optimized != ctx.current;
        if changed {
            ctx.current = (*optimized).clone();
        }
        ctx.set_metadata("optimize.changed", changed);
        Ok(())
    }
}

fn rewrite(mut expression: ast::Expression) -> ast::Expression {
    // Local rewrites can cascade (e.g. unwrapping parens exposes a double
    // negation), so run to a fixed point with a small bound.
    for _ in 0..8 {
        let mut changed = false;
        ast::transform_expressions(&mut expression, |expr| {
            changed |= simplify(expr);
        });
        if !changed {
            break;
        }
    }
    expression
}

fn simplify(expr: &mut ExprNode) -> bool {
    // ((x)) => (x)
    if let ExprNode::Nested(inner) = expr {
        if let ExprNode::Nested(deep) = inner.as_mut() {
            let deep = std::mem::replace(deep.as_mut(), placeholder_null());
            *expr = ExprNode::Nested(Box::new(deep));
            return true;
        }
    }

    // NOT NOT x => x
    if let ExprNode::UnaryOp {
        op: UnaryOperator::Not,
        expr: inner,
    } = expr
    {
        if let ExprNode::UnaryOp {
            op: UnaryOperator::Not,
            expr: deep,
        } = inner.as_mut()
        {
            let deep = std::mem::replace(deep.as_mut(), placeholder_null());
            *expr = deep;
            return true;
        }
    }

    fold_boolean_identity(expr)
}

/// Fold `x AND TRUE` / `x OR FALSE` (and the mirrored forms) everywhere
/// in the expression, to a fixed point.
///
/// The literal step runs this before extraction: a boolean literal that
/// reaches extraction becomes a placeholder, out of reach of any later
/// rewrite.
pub(crate) fn fold_boolean_identities(expression: &mut ast::Expression) -> bool {
    let mut folded = false;
    for _ in 0..8 {
        let mut changed = false;
        ast::transform_expressions(expression, |expr| {
            changed |= fold_boolean_identity(expr);
        });
        folded |= changed;
        if !changed {
            break;
        }
    }
    folded
}

fn fold_boolean_identity(expr: &mut ExprNode) -> bool {
    if let ExprNode::BinaryOp { left, op, right } = expr {
        let identity = match op {
            BinaryOperator::And => Some(true),
            BinaryOperator::Or => Some(false),
            _ => None,
        };
        if let Some(identity) = identity {
            if is_boolean_literal(right, identity) {
                let kept = std::mem::replace(left.as_mut(), placeholder_null());
                *expr = kept;
                return true;
            }
            if is_boolean_literal(left, identity) {
                let kept = std::mem::replace(right.as_mut(), placeholder_null());
                *expr = kept;
                return true;
            }
        }
    }
    false
}

fn is_boolean_literal(expr: &ExprNode, wanted: bool) -> bool {
    matches!(ast::literal_value(expr), Some(crate::value::Value::Bool(b)) if b == wanted)
}

fn placeholder_null() -> ExprNode {
    ast::build::null()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Dialect;

    fn optimized(sql: &str) -> String {
        let expression = ast::parse_one(sql, Dialect::Generic).unwrap();
        ast::generate(&rewrite(expression), false)
    }

    #[test]
    fn test_unwraps_redundant_parens() {
        assert_eq!(
            optimized("SELECT * FROM t WHERE ((a = 1))"),
            "SELECT * FROM t WHERE (a = 1)"
        );
    }

    #[test]
    fn test_folds_double_negation() {
        assert_eq!(
            optimized("SELECT * FROM t WHERE NOT NOT a"),
            "SELECT * FROM t WHERE a"
        );
    }

    #[test]
    fn test_boolean_identity_and() {
        assert_eq!(
            optimized("SELECT * FROM t WHERE a = 1 AND true"),
            "SELECT * FROM t WHERE a = 1"
        );
    }

    #[test]
    fn test_boolean_identity_or() {
        assert_eq!(
            optimized("SELECT * FROM t WHERE false OR a = 1"),
            "SELECT * FROM t WHERE a = 1"
        );
    }

    #[test]
    fn test_fold_boolean_identities_standalone() {
        let mut expr =
            ast::parse_one("SELECT * FROM t WHERE (a = 1 AND true) OR false", Dialect::Generic)
                .unwrap();
        assert!(fold_boolean_identities(&mut expr));
        assert_eq!(
            ast::generate(&expr, false),
            "SELECT * FROM t WHERE (a = 1)"
        );
        assert!(!fold_boolean_identities(&mut expr));
    }

    #[test]
    fn test_leaves_meaningful_expressions_alone() {
        let sql = "SELECT * FROM t WHERE a = 1 AND b = 2";
        assert_eq!(optimized(sql), sql);
    }

    #[test]
    fn test_cascading_rewrites_reach_fixed_point() {
        assert_eq!(
            optimized("SELECT * FROM t WHERE ((a = 1 AND true))"),
            "SELECT * FROM t WHERE (a = 1)"
        );
    }
}
