//! Constant folding marks and watch-target collection.
//!
//! The walk sets `constant` on every node it visits and gathers the maximal
//! static paths (`foo.bar`, never `foo` on its own when `foo.bar` is read)
//! that a reactive layer has to observe.

use crate::ast::{ExprKind, Expression};
use serde::Serialize;
use std::fmt;

/// A static property path whose value must be observed at runtime
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchTarget {
    /// `["foo", "bar"]` for `foo.bar`
    pub path: Vec<String>,
    pub expression: Expression,
}

impl WatchTarget {
    fn from_expression(expr: &Expression) -> Option<Self> {
        Some(Self {
            path: expr.static_path()?,
            expression: expr.clone(),
        })
    }

    pub fn root(&self) -> &str {
        &self.path[0]
    }
}

impl fmt::Display for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.join("."))
    }
}

/// Analyze `expr` in place and return whether it is watchable.
///
/// `nested` is true only when `expr` is the object of a non-computed member
/// access: the enclosing chain then owns the path, so a watchable node is
/// reported upward instead of being pushed into `targets`.
pub fn analyze(expr: &mut Expression, targets: &mut Vec<WatchTarget>, nested: bool) -> bool {
    let (constant, watchable) = match &mut expr.kind {
        ExprKind::Literal { .. } => (true, false),

        ExprKind::Identifier { .. } => (false, true),

        ExprKind::ArrayExpression { elements } => {
            let mut constant = true;
            for element in elements.iter_mut() {
                analyze(element, targets, false);
                constant &= element.is_constant();
            }
            (constant, false)
        }

        ExprKind::ObjectExpression { properties } => {
            let mut constant = true;
            for property in properties.iter_mut() {
                if property.computed {
                    analyze(&mut property.key, targets, false);
                    constant = false;
                } else if matches!(property.key.kind, ExprKind::Literal { .. }) {
                    property.key.constant = Some(true);
                }
                analyze(&mut property.value, targets, false);
                constant &= property.value.is_constant();
            }
            (constant, false)
        }

        ExprKind::BinaryExpression { left, right, .. }
        | ExprKind::LogicalExpression { left, right, .. } => {
            analyze(left, targets, false);
            analyze(right, targets, false);
            (left.is_constant() && right.is_constant(), false)
        }

        ExprKind::UnaryExpression { argument, .. } => {
            analyze(argument, targets, false);
            (argument.is_constant(), false)
        }

        ExprKind::ConditionalExpression {
            test,
            consequent,
            alternate,
        } => {
            analyze(test, targets, false);
            analyze(alternate, targets, false);
            analyze(consequent, targets, false);
            (
                test.is_constant() && alternate.is_constant() && consequent.is_constant(),
                false,
            )
        }

        ExprKind::CallExpression {
            callee, arguments, ..
        } => {
            analyze(callee, targets, false);
            let mut constant = callee.is_constant();
            for argument in arguments.iter_mut() {
                analyze(argument, targets, false);
                constant &= argument.is_constant();
            }
            (constant, false)
        }

        ExprKind::MemberExpression {
            object,
            property,
            computed: true,
        } => {
            analyze(object, targets, false);
            analyze(property, targets, false);
            (object.is_constant() && property.is_constant(), false)
        }

        ExprKind::MemberExpression { object, .. } => {
            let watchable = analyze(object, targets, true);
            (object.is_constant(), watchable)
        }
    };

    expr.constant = Some(constant);

    if watchable && !nested {
        if let Some(target) = WatchTarget::from_expression(expr) {
            targets.push(target);
        }
    }

    watchable
}

/// Analyze every top-level expression against one shared target list
pub fn analyze_all(expressions: &mut [Expression]) -> Vec<WatchTarget> {
    let mut targets = Vec::new();
    for expr in expressions.iter_mut() {
        analyze(expr, &mut targets, false);
    }
    targets
}
