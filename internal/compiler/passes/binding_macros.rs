// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Binding macros: calls that are replaced by another expression.
//!
//! Native macros are keyed by the declaring type and the member name and are
//! applied while converting a native tree. Expression macros are keyed by the
//! method name and are applied by [`expand_binding_macros`] on parsed bindings.

use crate::expression_tree::{Expression, ExpressionVisitor, UnaryOperator};
use crate::native::{NativeExpression, NativeExpressionRc, NativeType};
use crate::native_converter::{ConversionError, ExpressionConverterContext};
use i_weave_common::Literal;
use smol_str::SmolStr;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type NativeMacro = Rc<
    dyn Fn(
        &mut ExpressionConverterContext<'_>,
        &NativeExpressionRc,
    ) -> Result<Option<Expression>, ConversionError>,
>;

pub type ExpressionMacro = Rc<dyn Fn(&Expression) -> Option<Expression>>;

/// Declaring type matching any type
pub const ANY_TYPE: &str = "*";

#[derive(Default)]
pub struct BindingMacroTable {
    native: HashMap<(SmolStr, SmolStr), NativeMacro>,
    expression: HashMap<SmolStr, ExpressionMacro>,
    lookup_cache: RefCell<HashMap<(SmolStr, SmolStr), Option<NativeMacro>>>,
}

impl std::fmt::Debug for BindingMacroTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingMacroTable")
            .field("native", &self.native.keys().collect::<Vec<_>>())
            .field("expression", &self.expression.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BindingMacroTable {
    /// The table with the resource macros
    pub fn with_builtins() -> Self {
        let mut table = Self::default();
        for (name, op) in [
            ("Resource", UnaryOperator::DynamicExpression),
            ("DynamicResource", UnaryOperator::DynamicExpression),
            ("StaticResource", UnaryOperator::StaticExpression),
        ] {
            table.register_native(ANY_TYPE, name, resource_native_macro(op));
            table.register_expression(name, resource_expression_macro(op));
        }
        table
    }

    /// Register a macro for a member of a type, or of any type with [`ANY_TYPE`]
    pub fn register_native(
        &mut self,
        declaring_type: impl Into<SmolStr>,
        member: impl Into<SmolStr>,
        binding_macro: NativeMacro,
    ) {
        self.native.insert((declaring_type.into(), member.into()), binding_macro);
        self.lookup_cache.get_mut().clear();
    }

    pub fn register_expression(
        &mut self,
        method: impl Into<SmolStr>,
        binding_macro: ExpressionMacro,
    ) {
        self.expression.insert(method.into(), binding_macro);
    }

    /// The macro for the member. A registration for the exact type wins over [`ANY_TYPE`].
    pub fn native_macro(&self, declaring_type: &NativeType, member: &str) -> Option<NativeMacro> {
        let key = (SmolStr::from(declaring_type.to_string()), SmolStr::from(member));
        if let Some(cached) = self.lookup_cache.borrow().get(&key) {
            return cached.clone();
        }
        let found = self
            .native
            .get(&key)
            .or_else(|| self.native.get(&(SmolStr::new_static(ANY_TYPE), key.1.clone())))
            .cloned();
        self.lookup_cache.borrow_mut().insert(key, found.clone());
        found
    }

    pub fn expression_macro(&self, method: &str) -> Option<ExpressionMacro> {
        self.expression.get(method).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.native.is_empty() && self.expression.is_empty()
    }
}

fn resource(op: UnaryOperator, key: &str) -> Expression {
    Expression::unary(op, Expression::member(None, key))
}

fn resource_native_macro(op: UnaryOperator) -> NativeMacro {
    Rc::new(move |_, native| {
        let NativeExpression::Call { method, arguments, .. } = &**native else {
            return Ok(None);
        };
        match arguments.as_slice() {
            [arg] => match &**arg {
                NativeExpression::Constant { value: Literal::String(key), .. } => {
                    Ok(Some(resource(op, key)))
                }
                _ => Err(ConversionError::Macro {
                    member: method.clone(),
                    message: "the resource key must be a constant string".into(),
                }),
            },
            _ => Err(ConversionError::Macro {
                member: method.clone(),
                message: format!("expected 1 argument, got {}", arguments.len()),
            }),
        }
    })
}

fn resource_expression_macro(op: UnaryOperator) -> ExpressionMacro {
    Rc::new(move |expr| match expr {
        Expression::MethodCall { target: None, arguments, .. } => match arguments.as_slice() {
            [Expression::Constant(Literal::String(key))] => Some(resource(op, key)),
            _ => None,
        },
        _ => None,
    })
}

struct MacroExpander<'a>(&'a BindingMacroTable);

impl ExpressionVisitor for MacroExpander<'_> {
    fn is_post_order(&self) -> bool {
        true
    }

    fn visit(&mut self, expr: &Expression) -> Option<Expression> {
        let Expression::MethodCall { method, .. } = expr else { return None };
        let binding_macro = self.0.expression_macro(method)?;
        let result = binding_macro(expr);
        if let Some(result) = &result {
            log::debug!("binding macro {method} expanded to {result}");
        }
        result
    }
}

/// Replace the calls that have an expression macro
pub fn expand_binding_macros(expr: Expression, table: &BindingMacroTable) -> Expression {
    if table.expression.is_empty() {
        return expr;
    }
    expr.accept(&mut MacroExpander(table))
}

#[test]
fn expands_resources() {
    let table = BindingMacroTable::with_builtins();
    let parse = |s| crate::parser::parse(s).unwrap();
    let expanded = expand_binding_macros(parse(r#"Prefix + StaticResource("Title")"#), &table);
    assert_eq!(expanded.to_string(), "(Prefix + $$Title)");
    let expanded = expand_binding_macros(parse(r#"Resource(Key)"#), &table);
    assert_eq!(expanded.to_string(), "Resource(Key)");
    let expanded = expand_binding_macros(parse(r#"Item.Resource("A")"#), &table);
    assert_eq!(expanded.to_string(), "Item.Resource(\"A\")");
}

#[test]
fn exact_type_wins_over_any_type() {
    let mut table = BindingMacroTable::with_builtins();
    let typed: NativeMacro = Rc::new(|_, _| Ok(Some(Expression::constant("typed"))));
    table.register_native("Theme", "Resource", typed);
    let resolved = table.native_macro(&NativeType::named("Theme"), "Resource");
    let x = NativeExpression::parameter("x", NativeType::named("Theme"));
    let call = NativeExpression::call(Some(&x), NativeType::named("Theme"), "Resource", vec![]);
    let converter = crate::native_converter::NativeConverter::new(Rc::new(table));
    assert!(resolved.is_some());
    assert_eq!(
        converter.convert(&NativeExpression::lambda(&[&x], call)),
        Ok(Expression::constant("typed"))
    );
}

#[test]
fn resource_macro_errors() {
    let table = Rc::new(BindingMacroTable::with_builtins());
    let converter = crate::native_converter::NativeConverter::new(table);
    let x = NativeExpression::parameter("x", NativeType::object());
    let call = NativeExpression::call(
        Some(&x),
        NativeType::named("Context"),
        "StaticResource",
        vec![NativeExpression::constant(1)],
    );
    assert_eq!(
        converter.convert(&NativeExpression::lambda(&[&x], call)),
        Err(ConversionError::Macro {
            member: "StaticResource".into(),
            message: "the resource key must be a constant string".into()
        })
    );
}
