// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! Conversion of a [`NativeExpression`] tree into an [`Expression`]

The conversion runs a chain of [`NativeNodeConverter`]s ordered by priority. Each
converter either handles a node or declines with `Ok(None)`, in which case the
next one is tried. Results are memoized per node in the
[`ExpressionConverterContext`], so a node shared by several parents is only
converted once.

When the converted tree is a lambda, its first parameter is the binding source:
`x => x.Foo.Bar` converts to the same tree as the text `Foo.Bar`.
*/

use crate::expression_tree::{BinaryOperator, Expression, UnaryOperator};
use crate::native::{NativeBinaryOp, NativeExpression, NativeExpressionRc, NativeUnaryOp};
use crate::passes::binding_macros::BindingMacroTable;
use by_address::ByAddress;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::rc::Rc;

/// Name of the method call that [`NativeExpression::NewArray`] converts to
pub const NEW_ARRAY_METHOD: &str = "NewArray";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("Cannot convert {0} to a binding expression")]
    Unsupported(&'static str),
    #[error(
        "The binding source '{0}' can only be used as the target of a member access or a method call"
    )]
    BareSource(SmolStr),
    #[error("Binding macro for '{member}' failed: {message}")]
    Macro { member: SmolStr, message: String },
}

/// One strategy of the conversion chain
pub trait NativeNodeConverter {
    /// Convert the node, or return `Ok(None)` to let the next converter try.
    fn try_convert(
        &self,
        ctx: &mut ExpressionConverterContext<'_>,
        native: &NativeExpressionRc,
    ) -> Result<Option<Expression>, ConversionError>;
}

type ConverterList = Vec<(i32, Box<dyn NativeNodeConverter>)>;

/// State of one conversion: the chain, the macros and the memoized results
pub struct ExpressionConverterContext<'a> {
    converters: &'a [(i32, Box<dyn NativeNodeConverter>)],
    macros: &'a BindingMacroTable,
    source: Option<NativeExpressionRc>,
    converted: HashMap<ByAddress<NativeExpressionRc>, Expression>,
}

impl<'a> ExpressionConverterContext<'a> {
    fn new(
        converters: &'a [(i32, Box<dyn NativeNodeConverter>)],
        macros: &'a BindingMacroTable,
    ) -> Self {
        Self { converters, macros, source: None, converted: HashMap::new() }
    }

    pub fn macros(&self) -> &'a BindingMacroTable {
        self.macros
    }

    /// Record the conversion of a node
    pub fn set_expression(&mut self, native: &NativeExpressionRc, expression: Expression) {
        self.converted.insert(ByAddress(native.clone()), expression);
    }

    pub fn try_get_expression(&self, native: &NativeExpressionRc) -> Option<&Expression> {
        self.converted.get(&ByAddress(native.clone()))
    }

    pub fn clear_expression(&mut self, native: &NativeExpressionRc) {
        self.converted.remove(&ByAddress(native.clone()));
    }

    /// True if the node is the parameter standing for the binding source
    pub fn is_source(&self, native: &NativeExpressionRc) -> bool {
        self.source.as_ref().is_some_and(|s| Rc::ptr_eq(s, native))
    }

    /// Convert a node through the chain, or return the memoized conversion
    pub fn convert(&mut self, native: &NativeExpressionRc) -> Result<Expression, ConversionError> {
        if let Some(expression) = self.try_get_expression(native) {
            return Ok(expression.clone());
        }
        let converters = self.converters;
        for (_, converter) in converters {
            if let Some(expression) = converter.try_convert(self, native)? {
                self.set_expression(native, expression.clone());
                return Ok(expression);
            }
        }
        Err(ConversionError::Unsupported(native.kind_name()))
    }

    /// Convert the target of a member access or a call. The binding source becomes no target.
    pub fn convert_target(
        &mut self,
        target: Option<&NativeExpressionRc>,
    ) -> Result<Option<Box<Expression>>, ConversionError> {
        match target {
            Some(target) if !self.is_source(target) => Ok(Some(Box::new(self.convert(target)?))),
            _ => Ok(None),
        }
    }

    pub fn convert_all(
        &mut self,
        natives: &[NativeExpressionRc],
    ) -> Result<Vec<Expression>, ConversionError> {
        natives.iter().map(|n| self.convert(n)).collect()
    }
}

/// Converts native expression trees, see the module documentation
pub struct NativeConverter {
    converters: ConverterList,
    macros: Rc<BindingMacroTable>,
}

impl NativeConverter {
    pub const MACRO_PRIORITY: i32 = 1000;
    pub const DEFAULT_PRIORITY: i32 = 0;

    /// A converter with the built-in chain
    pub fn new(macros: Rc<BindingMacroTable>) -> Self {
        let mut converter = Self { converters: Vec::new(), macros };
        converter.add_converter(Self::MACRO_PRIORITY, Box::new(MacroConverter));
        let builtins: [Box<dyn NativeNodeConverter>; 11] = [
            Box::new(ConstantConverter),
            Box::new(DefaultValueConverter),
            Box::new(UnaryConverter),
            Box::new(BinaryConverter),
            Box::new(ConditionalConverter),
            Box::new(NewArrayConverter),
            Box::new(IndexConverter),
            Box::new(MethodCallConverter),
            Box::new(MemberConverter),
            Box::new(LambdaConverter),
            Box::new(ParameterConverter),
        ];
        for c in builtins {
            converter.add_converter(Self::DEFAULT_PRIORITY, c);
        }
        converter
    }

    /// Add a converter. Higher priorities run first, equal priorities run in insertion order.
    pub fn add_converter(&mut self, priority: i32, converter: Box<dyn NativeNodeConverter>) {
        let index = self.converters.partition_point(|(p, _)| *p >= priority);
        self.converters.insert(index, (priority, converter));
    }

    pub fn convert(&self, native: &NativeExpressionRc) -> Result<Expression, ConversionError> {
        let mut ctx = ExpressionConverterContext::new(&self.converters, &self.macros);
        self.convert_with_context(&mut ctx, native)
    }

    /// Same as convert, with a context provided by the caller.
    ///
    /// Conversions already recorded in the context are reused.
    pub fn convert_with_context(
        &self,
        ctx: &mut ExpressionConverterContext<'_>,
        native: &NativeExpressionRc,
    ) -> Result<Expression, ConversionError> {
        match &**native {
            NativeExpression::Lambda { parameters, body } => {
                ctx.source = parameters.first().cloned();
                ctx.convert(body)
            }
            _ => ctx.convert(native),
        }
    }

    /// A fresh context for [`Self::convert_with_context`]
    pub fn context(&self) -> ExpressionConverterContext<'_> {
        ExpressionConverterContext::new(&self.converters, &self.macros)
    }
}

struct MacroConverter;
impl NativeNodeConverter for MacroConverter {
    fn try_convert(
        &self,
        ctx: &mut ExpressionConverterContext<'_>,
        native: &NativeExpressionRc,
    ) -> Result<Option<Expression>, ConversionError> {
        let (declaring_type, name) = match &**native {
            NativeExpression::Member { declaring_type, name, .. } => (declaring_type, name),
            NativeExpression::Call { declaring_type, method, .. } => (declaring_type, method),
            _ => return Ok(None),
        };
        let Some(binding_macro) = ctx.macros().native_macro(declaring_type, name) else {
            return Ok(None);
        };
        let result = binding_macro(ctx, native)?;
        if let Some(result) = &result {
            log::debug!("binding macro {declaring_type}.{name} expanded to {result}");
        }
        Ok(result)
    }
}

struct ConstantConverter;
impl NativeNodeConverter for ConstantConverter {
    fn try_convert(
        &self,
        _: &mut ExpressionConverterContext<'_>,
        native: &NativeExpressionRc,
    ) -> Result<Option<Expression>, ConversionError> {
        Ok(match &**native {
            NativeExpression::Constant { value, .. } => Some(Expression::Constant(value.clone())),
            _ => None,
        })
    }
}

struct DefaultValueConverter;
impl NativeNodeConverter for DefaultValueConverter {
    fn try_convert(
        &self,
        _: &mut ExpressionConverterContext<'_>,
        native: &NativeExpressionRc,
    ) -> Result<Option<Expression>, ConversionError> {
        Ok(match &**native {
            NativeExpression::Default(ty) => Some(Expression::Constant(ty.default_value())),
            _ => None,
        })
    }
}

struct UnaryConverter;
impl NativeNodeConverter for UnaryConverter {
    fn try_convert(
        &self,
        ctx: &mut ExpressionConverterContext<'_>,
        native: &NativeExpressionRc,
    ) -> Result<Option<Expression>, ConversionError> {
        let NativeExpression::Unary { op, operand, .. } = &**native else {
            return Ok(None);
        };
        let operand = ctx.convert(operand)?;
        let op = match op {
            NativeUnaryOp::Convert => return Ok(Some(operand)),
            NativeUnaryOp::Negate => UnaryOperator::Minus,
            NativeUnaryOp::UnaryPlus => UnaryOperator::Plus,
            NativeUnaryOp::Not => UnaryOperator::Not,
        };
        Ok(Some(Expression::unary(op, operand)))
    }
}

struct BinaryConverter;
impl NativeNodeConverter for BinaryConverter {
    fn try_convert(
        &self,
        ctx: &mut ExpressionConverterContext<'_>,
        native: &NativeExpressionRc,
    ) -> Result<Option<Expression>, ConversionError> {
        let NativeExpression::Binary { op, lhs, rhs } = &**native else {
            return Ok(None);
        };
        let lhs = ctx.convert(lhs)?;
        let rhs = ctx.convert(rhs)?;
        let op = match op {
            NativeBinaryOp::ArrayIndex => {
                return Ok(Some(Expression::Index { target: Box::new(lhs), arguments: vec![rhs] }));
            }
            NativeBinaryOp::Add => BinaryOperator::Add,
            NativeBinaryOp::Subtract => BinaryOperator::Subtract,
            NativeBinaryOp::Multiply => BinaryOperator::Multiply,
            NativeBinaryOp::Divide => BinaryOperator::Divide,
            NativeBinaryOp::Modulo => BinaryOperator::Remainder,
            NativeBinaryOp::Equal => BinaryOperator::Equality,
            NativeBinaryOp::NotEqual => BinaryOperator::NotEqual,
            NativeBinaryOp::LessThan => BinaryOperator::LessThan,
            NativeBinaryOp::LessThanOrEqual => BinaryOperator::LessThanOrEqual,
            NativeBinaryOp::GreaterThan => BinaryOperator::GreaterThan,
            NativeBinaryOp::GreaterThanOrEqual => BinaryOperator::GreaterThanOrEqual,
            NativeBinaryOp::AndAlso => BinaryOperator::AndAlso,
            NativeBinaryOp::OrElse => BinaryOperator::OrElse,
            NativeBinaryOp::Coalesce => BinaryOperator::NullCoalescing,
        };
        Ok(Some(Expression::binary(op, lhs, rhs)))
    }
}

struct ConditionalConverter;
impl NativeNodeConverter for ConditionalConverter {
    fn try_convert(
        &self,
        ctx: &mut ExpressionConverterContext<'_>,
        native: &NativeExpressionRc,
    ) -> Result<Option<Expression>, ConversionError> {
        let NativeExpression::Conditional { test, if_true, if_false } = &**native else {
            return Ok(None);
        };
        Ok(Some(Expression::Condition {
            condition: Box::new(ctx.convert(test)?),
            true_expr: Box::new(ctx.convert(if_true)?),
            false_expr: Box::new(ctx.convert(if_false)?),
        }))
    }
}

struct NewArrayConverter;
impl NativeNodeConverter for NewArrayConverter {
    fn try_convert(
        &self,
        ctx: &mut ExpressionConverterContext<'_>,
        native: &NativeExpressionRc,
    ) -> Result<Option<Expression>, ConversionError> {
        let NativeExpression::NewArray { element_type, items } = &**native else {
            return Ok(None);
        };
        Ok(Some(Expression::MethodCall {
            target: None,
            method: NEW_ARRAY_METHOD.into(),
            type_args: vec![element_type.to_string().into()],
            arguments: ctx.convert_all(items)?,
        }))
    }
}

struct IndexConverter;
impl NativeNodeConverter for IndexConverter {
    fn try_convert(
        &self,
        ctx: &mut ExpressionConverterContext<'_>,
        native: &NativeExpressionRc,
    ) -> Result<Option<Expression>, ConversionError> {
        let NativeExpression::Index { target, arguments } = &**native else {
            return Ok(None);
        };
        Ok(Some(Expression::Index {
            target: Box::new(ctx.convert(target)?),
            arguments: ctx.convert_all(arguments)?,
        }))
    }
}

struct MethodCallConverter;
impl NativeNodeConverter for MethodCallConverter {
    fn try_convert(
        &self,
        ctx: &mut ExpressionConverterContext<'_>,
        native: &NativeExpressionRc,
    ) -> Result<Option<Expression>, ConversionError> {
        let NativeExpression::Call { target, method, type_args, arguments, .. } = &**native else {
            return Ok(None);
        };
        if target.is_none() {
            return Ok(None);
        }
        Ok(Some(Expression::MethodCall {
            target: ctx.convert_target(target.as_ref())?,
            method: method.clone(),
            type_args: type_args.iter().map(|t| t.to_string().into()).collect(),
            arguments: ctx.convert_all(arguments)?,
        }))
    }
}

struct MemberConverter;
impl NativeNodeConverter for MemberConverter {
    fn try_convert(
        &self,
        ctx: &mut ExpressionConverterContext<'_>,
        native: &NativeExpressionRc,
    ) -> Result<Option<Expression>, ConversionError> {
        let NativeExpression::Member { target, name, .. } = &**native else {
            return Ok(None);
        };
        if target.is_none() {
            return Ok(None);
        }
        let target = ctx.convert_target(target.as_ref())?;
        Ok(Some(Expression::Member { target, name: name.clone() }))
    }
}

struct LambdaConverter;
impl NativeNodeConverter for LambdaConverter {
    fn try_convert(
        &self,
        ctx: &mut ExpressionConverterContext<'_>,
        native: &NativeExpressionRc,
    ) -> Result<Option<Expression>, ConversionError> {
        let NativeExpression::Lambda { parameters, body } = &**native else {
            return Ok(None);
        };
        let parameters = parameters
            .iter()
            .map(|p| p.parameter_name().cloned().ok_or(ConversionError::Unsupported(p.kind_name())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Expression::Lambda { parameters, body: Box::new(ctx.convert(body)?) }))
    }
}

struct ParameterConverter;
impl NativeNodeConverter for ParameterConverter {
    fn try_convert(
        &self,
        ctx: &mut ExpressionConverterContext<'_>,
        native: &NativeExpressionRc,
    ) -> Result<Option<Expression>, ConversionError> {
        let NativeExpression::Parameter { name, .. } = &**native else {
            return Ok(None);
        };
        if ctx.is_source(native) {
            return Err(ConversionError::BareSource(name.clone()));
        }
        Ok(Some(Expression::Parameter { name: name.clone() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{NativeType, NativeUnaryOp};
    use i_weave_common::{Literal, LiteralType};
    use std::cell::Cell;

    fn converter() -> NativeConverter {
        NativeConverter::new(Rc::new(BindingMacroTable::with_builtins()))
    }

    fn person() -> NativeType {
        NativeType::named("Person")
    }

    #[test]
    fn default_value_is_folded() {
        let native = Rc::new(NativeExpression::Default(NativeType::Primitive(LiteralType::Int32)));
        assert_eq!(converter().convert(&native), Ok(Expression::Constant(Literal::Int32(0))));
        let native = Rc::new(NativeExpression::Default(person()));
        assert_eq!(converter().convert(&native), Ok(Expression::Constant(Literal::Null)));
    }

    #[test]
    fn source_parameter_has_no_target() {
        let x = NativeExpression::parameter("x", person());
        let name = NativeExpression::member(&x, person(), "Name");
        let len = NativeExpression::call(Some(&name), NativeType::named("string"), "Trim", vec![]);
        let native = NativeExpression::lambda(&[&x], len);
        assert_eq!(
            converter().convert(&native),
            Ok(Expression::MethodCall {
                target: Some(Box::new(Expression::member(None, "Name"))),
                method: "Trim".into(),
                type_args: vec![],
                arguments: vec![],
            })
        );

        let bare = NativeExpression::lambda(&[&x], x.clone());
        assert_eq!(converter().convert(&bare), Err(ConversionError::BareSource("x".into())));
    }

    #[test]
    fn shared_nodes_are_converted_once() {
        struct Counter(Rc<Cell<usize>>);
        impl NativeNodeConverter for Counter {
            fn try_convert(
                &self,
                _: &mut ExpressionConverterContext<'_>,
                _: &NativeExpressionRc,
            ) -> Result<Option<Expression>, ConversionError> {
                self.0.set(self.0.get() + 1);
                Ok(None)
            }
        }

        let count = Rc::new(Cell::new(0));
        let mut converter = converter();
        converter.add_converter(i32::MAX, Box::new(Counter(count.clone())));

        let x = NativeExpression::parameter("x", person());
        let age = NativeExpression::member(&x, person(), "Age");
        let sum = NativeExpression::binary(NativeBinaryOp::Add, &age, &age);
        let native = NativeExpression::lambda(&[&x], sum.clone());

        let mut ctx = converter.context();
        let result = converter.convert_with_context(&mut ctx, &native).unwrap();
        assert_eq!(result.to_string(), "(Age + Age)");
        // `sum` and `age`, the source itself is never converted
        assert_eq!(count.get(), 2);
        assert_eq!(ctx.try_get_expression(&age), Some(&Expression::member(None, "Age")));

        ctx.clear_expression(&age);
        assert_eq!(ctx.try_get_expression(&age), None);
        ctx.set_expression(&sum, Expression::constant(3));
        assert_eq!(converter.convert_with_context(&mut ctx, &native), Ok(Expression::constant(3)));
    }

    #[test]
    fn resource_macro() {
        let vm = NativeExpression::parameter("vm", person());
        let ctx = NativeExpression::parameter("ctx", NativeType::named("BindingContext"));
        let call = NativeExpression::call(
            Some(&ctx),
            NativeType::named("BindingContext"),
            "Resource",
            vec![NativeExpression::constant("Theme")],
        );
        let native = NativeExpression::lambda(&[&vm, &ctx], call);
        assert_eq!(
            converter().convert(&native),
            Ok(Expression::unary(
                UnaryOperator::DynamicExpression,
                Expression::member(None, "Theme")
            ))
        );
    }

    #[test]
    fn converts_operators_and_lambdas() {
        let x = NativeExpression::parameter("x", person());
        let item = NativeExpression::parameter("i", person());
        let visible = NativeExpression::member(&item, person(), "Visible");
        let not_visible = Rc::new(NativeExpression::Unary {
            op: NativeUnaryOp::Not,
            operand: visible,
            ty: NativeType::Primitive(LiteralType::Bool),
        });
        let filter = NativeExpression::lambda(&[&item], not_visible);
        let items = NativeExpression::member(&x, person(), "Items");
        let any = NativeExpression::call(Some(&items), person(), "Any", vec![filter]);
        let converted = Rc::new(NativeExpression::Unary {
            op: NativeUnaryOp::Convert,
            operand: any,
            ty: NativeType::object(),
        });
        let native = NativeExpression::lambda(&[&x], converted);
        let converted = converter().convert(&native).unwrap();
        assert_eq!(converted.to_string(), "Items.Any((i) => !i.Visible)");
    }

    #[test]
    fn static_members_need_a_macro() {
        let now = Rc::new(NativeExpression::Member {
            target: None,
            declaring_type: NativeType::named("DateTime"),
            name: "Now".into(),
        });
        assert_eq!(converter().convert(&now), Err(ConversionError::Unsupported("member access")));
        let today = NativeExpression::call(None, NativeType::named("DateTime"), "Today", vec![]);
        assert_eq!(converter().convert(&today), Err(ConversionError::Unsupported("method call")));
    }

    #[test]
    fn static_members_fall_through_to_host_converters() {
        struct Clock;
        impl NativeNodeConverter for Clock {
            fn try_convert(
                &self,
                _: &mut ExpressionConverterContext<'_>,
                native: &NativeExpressionRc,
            ) -> Result<Option<Expression>, ConversionError> {
                Ok(match &**native {
                    NativeExpression::Member { target: None, name, .. } if name == "Now" => {
                        Some(Expression::Constant(Literal::Int32(42)))
                    }
                    _ => None,
                })
            }
        }

        let now = Rc::new(NativeExpression::Member {
            target: None,
            declaring_type: NativeType::named("DateTime"),
            name: "Now".into(),
        });
        let mut converter = converter();
        converter.add_converter(-10, Box::new(Clock));
        assert_eq!(converter.convert(&now), Ok(Expression::Constant(Literal::Int32(42))));
    }
}
