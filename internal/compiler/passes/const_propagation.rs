// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Try to simplify binding expressions by propagating constant expressions

use crate::expression_tree::*;
use i_weave_common::{ArithmeticOp, Literal, LiteralType};
use std::cmp::Ordering;

/// Name of the call that a `default(T)` expression is parsed to
pub const DEFAULT_METHOD: &str = "default";

pub fn const_propagation(expr: &mut Expression) {
    simplify_expression(expr);
}

/// Returns false if the expression still depends on something else than constants
fn simplify_expression(expr: &mut Expression) -> bool {
    match expr {
        Expression::Constant(_) => true,
        Expression::MethodCall { target: None, method, type_args, arguments }
            if method == DEFAULT_METHOD && arguments.is_empty() && type_args.len() == 1 =>
        {
            // Unknown types are reference types, which default to null
            let value = LiteralType::from_type_name(&type_args[0])
                .map_or(Literal::Null, Literal::default_for);
            *expr = Expression::Constant(value);
            true
        }
        Expression::Unary { op, operand } => {
            if !simplify_expression(operand) {
                return false;
            }
            let Expression::Constant(value) = &**operand else { return false };
            match fold_unary(*op, value) {
                Some(new) => {
                    *expr = Expression::Constant(new);
                    true
                }
                None => false,
            }
        }
        Expression::Binary { op, lhs, rhs } => {
            simplify_expression(lhs);
            simplify_expression(rhs);
            let new = match (*op, &mut **lhs, &mut **rhs) {
                (BinaryOperator::AndAlso, e @ Expression::Constant(Literal::Bool(false)), _)
                | (BinaryOperator::OrElse, e @ Expression::Constant(Literal::Bool(true)), _) => {
                    Some(std::mem::take(e))
                }
                (
                    BinaryOperator::AndAlso,
                    Expression::Constant(Literal::Bool(true)),
                    e @ Expression::Constant(Literal::Bool(_)),
                )
                | (
                    BinaryOperator::OrElse,
                    Expression::Constant(Literal::Bool(false)),
                    e @ Expression::Constant(Literal::Bool(_)),
                ) => Some(std::mem::take(e)),
                (BinaryOperator::NullCoalescing, Expression::Constant(Literal::Null), e) => {
                    Some(std::mem::take(e))
                }
                (BinaryOperator::NullCoalescing, e @ Expression::Constant(_), _) => {
                    Some(std::mem::take(e))
                }
                (op, Expression::Constant(a), Expression::Constant(b)) => {
                    fold_binary(op, a, b).map(Expression::Constant)
                }
                _ => None,
            };
            match new {
                Some(new) => {
                    *expr = new;
                    matches!(expr, Expression::Constant(_))
                }
                None => false,
            }
        }
        Expression::Condition { condition, true_expr, false_expr } => {
            simplify_expression(condition);
            let true_constant = simplify_expression(true_expr);
            let false_constant = simplify_expression(false_expr);
            let (taken, constant) = match &**condition {
                Expression::Constant(Literal::Bool(true)) => (true_expr, true_constant),
                Expression::Constant(Literal::Bool(false)) => (false_expr, false_constant),
                _ => return false,
            };
            *expr = std::mem::take(&mut **taken);
            constant
        }
        // Relative sources and dynamic lookups are not constant
        _ => {
            expr.visit_mut(|e| {
                simplify_expression(e);
            });
            false
        }
    }
}

/// Fold an operation on a constant. Resource lookups are never folded.
pub fn fold_unary(op: UnaryOperator, value: &Literal) -> Option<Literal> {
    match op {
        UnaryOperator::Minus => value.negate(),
        UnaryOperator::Plus if value.ty().is_numeric() => Some(value.clone()),
        UnaryOperator::Not => value.as_bool().map(|b| Literal::Bool(!b)),
        _ => None,
    }
}

/// Fold an operation on two constants. `None` if it can't be folded, the
/// evaluation then reports the error at runtime.
pub fn fold_binary(op: BinaryOperator, a: &Literal, b: &Literal) -> Option<Literal> {
    let arithmetic = |op| a.arithmetic(op, b);
    let compare = |f: fn(Ordering) -> bool| a.compare(b).map(|o| Literal::Bool(f(o)));
    match op {
        BinaryOperator::Add => arithmetic(ArithmeticOp::Add),
        BinaryOperator::Subtract => arithmetic(ArithmeticOp::Subtract),
        BinaryOperator::Multiply => arithmetic(ArithmeticOp::Multiply),
        BinaryOperator::Divide => arithmetic(ArithmeticOp::Divide),
        BinaryOperator::Remainder => arithmetic(ArithmeticOp::Remainder),
        BinaryOperator::Equality => Some(Literal::Bool(a.value_equals(b))),
        BinaryOperator::NotEqual => Some(Literal::Bool(!a.value_equals(b))),
        BinaryOperator::LessThan => compare(Ordering::is_lt),
        BinaryOperator::LessThanOrEqual => compare(Ordering::is_le),
        BinaryOperator::GreaterThan => compare(Ordering::is_gt),
        BinaryOperator::GreaterThanOrEqual => compare(Ordering::is_ge),
        BinaryOperator::AndAlso => Some(Literal::Bool(a.as_bool()? && b.as_bool()?)),
        BinaryOperator::OrElse => Some(Literal::Bool(a.as_bool()? || b.as_bool()?)),
        BinaryOperator::NullCoalescing => Some(if a.is_null() { b.clone() } else { a.clone() }),
    }
}

#[cfg(test)]
fn folded(source: &str) -> Expression {
    let mut expr = crate::parser::parse(source).unwrap();
    const_propagation(&mut expr);
    expr
}

#[test]
fn folds_constants() {
    assert_eq!(folded("3 * 2 + 15"), Expression::constant(21));
    assert_eq!(folded("\"foo \" + 42"), Expression::constant("foo 42"));
    assert_eq!(folded("default(int)"), Expression::constant(0));
    assert_eq!(folded("default(Person)"), Expression::Constant(Literal::Null));
    assert_eq!(folded("-(2.5)"), Expression::Constant(Literal::Float64(-2.5)));
    assert_eq!(folded("!(1 < 2)"), Expression::constant(false));
    assert_eq!(folded("null ?? 'x'"), Expression::constant("x"));
    assert_eq!(folded("1 == 1L"), Expression::constant(true));
    assert_eq!(folded("true ? Name : Other"), Expression::member(None, "Name"));
}

#[test]
fn keeps_dynamic_parts() {
    assert_eq!(folded("A + (1 + 2)").to_string(), "(A + 3)");
    assert_eq!(folded("false && A").to_string(), "false");
    assert_eq!(folded("true && A").to_string(), "(true && A)");
    assert_eq!(folded("Items[1 + 1]").to_string(), "Items[2]");
    assert_eq!(folded("1 / 0").to_string(), "(1 / 0)");
    assert_eq!(folded("$parent(1).Name").to_string(), "$parent(1).Name");
}
