// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Report binding expressions that can't be evaluated

use crate::diagnostics::{BuildDiagnostics, SourceLocation};
use crate::expression_tree::*;
use i_weave_common::Literal;
use smol_str::SmolStr;

pub fn check_expressions(
    expr: &Expression,
    allow_lambdas: bool,
    location: &SourceLocation,
    diag: &mut BuildDiagnostics,
) {
    let mut checker = Checker { allow_lambdas, location, diag, scope: Vec::new() };
    checker.check(expr);
}

struct Checker<'a> {
    allow_lambdas: bool,
    location: &'a SourceLocation,
    diag: &'a mut BuildDiagnostics,
    /// Parameters of the enclosing lambdas
    scope: Vec<SmolStr>,
}

impl Checker<'_> {
    fn error(&mut self, message: String) {
        self.diag.push_error(message, self.location);
    }

    fn check(&mut self, expr: &Expression) {
        match expr {
            Expression::Lambda { parameters, body } => {
                if !self.allow_lambdas {
                    self.error("Lambda expressions are not allowed in this binding".into());
                }
                let len = self.scope.len();
                self.scope.extend(parameters.iter().cloned());
                self.check(body);
                self.scope.truncate(len);
                return;
            }
            Expression::Parameter { name } => {
                if !self.scope.contains(name) {
                    self.error(format!("Unknown lambda parameter '{name}'"));
                }
            }
            Expression::Unary {
                op: op @ (UnaryOperator::DynamicExpression | UnaryOperator::StaticExpression),
                operand,
            } => {
                if operand.to_member_path().is_none() {
                    self.error(format!("'{op}' must be followed by a resource key"));
                }
            }
            Expression::RelativeSource { kind, element_name, level, .. } => match kind {
                RelativeSourceKind::FindAncestor | RelativeSourceKind::ElementName
                    if element_name.as_ref().is_none_or(|n| n.is_empty()) =>
                {
                    self.error("Missing element name in relative source".into());
                }
                RelativeSourceKind::Parent | RelativeSourceKind::FindAncestor if *level == 0 => {
                    self.error("The level of a relative source must be at least 1".into());
                }
                _ => {}
            },
            Expression::Condition { condition, .. } => {
                if let Expression::Constant(Literal::Bool(value)) = &**condition {
                    self.diag.push_warning(format!("Condition is always {value}"), self.location);
                }
            }
            _ => {}
        }
        expr.visit(|e| self.check(e));
    }
}

#[cfg(test)]
fn check(source: &str, allow_lambdas: bool) -> Vec<String> {
    let expr = crate::parser::parse(source).unwrap();
    let mut diag = BuildDiagnostics::default();
    check_expressions(&expr, allow_lambdas, &SourceLocation::default(), &mut diag);
    diag.to_string_vec()
}

#[test]
fn reports_invalid_constructs() {
    assert!(check("Items.Where(x => x.Visible)", true).is_empty());
    assert_eq!(
        check("Items.Where(x => x.Visible)", false),
        ["Lambda expressions are not allowed in this binding"]
    );
    assert_eq!(check("$(A + B)", true), ["'$' must be followed by a resource key"]);
    assert_eq!(check("true ? A : B", true), ["Condition is always true"]);
    assert!(check("$Theme.Color", true).is_empty());
}

#[test]
fn unknown_parameter() {
    let expr = Expression::member(Some(Expression::Parameter { name: "y".into() }), "Name");
    let mut diag = BuildDiagnostics::default();
    check_expressions(&expr, true, &SourceLocation::default(), &mut diag);
    assert_eq!(diag.to_string_vec(), ["Unknown lambda parameter 'y'"]);
}
