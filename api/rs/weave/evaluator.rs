// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Evaluation of binding expressions against a source object

use i_weave_common::{Literal, LiteralType, MemberFlags, MemberKind, MemberPath};
use i_weave_compiler::expression_tree::{
    BinaryOperator, Expression, RelativeSourceKind, UnaryOperator,
};
use i_weave_compiler::native_converter::NEW_ARRAY_METHOD;
use i_weave_compiler::passes::{DEFAULT_METHOD, fold_binary, fold_unary};
use i_weave_core::members::{MemberManager, MemberRequest};
use i_weave_core::rtti::{INDEXER_NAME, TypeDescriptor, TypeRc};
use i_weave_core::{BindingError, ListObject, Object, ObjectRc, ResolutionPolicy, Value};
use once_cell::sync::Lazy;
use smol_str::SmolStr;
use std::any::Any;
use std::sync::Arc;

/// What a binding can reach besides its source: resources and relative sources
pub trait BindingContext: Send + Sync {
    /// The resource `key`. `dynamic` is true for `$key` and false for `$$key`.
    fn resource(&self, _key: &str, _dynamic: bool) -> Option<Value> {
        None
    }

    /// The object designated by a relative source such as `$parent(2)` or `#name`.
    /// `name` is the element name, or the ancestor type name for `$relative(Type)`.
    fn relative_source(
        &self,
        _kind: RelativeSourceKind,
        _name: Option<&str>,
        _level: u32,
    ) -> Option<ObjectRc> {
        None
    }
}

/// A context without resources nor relative sources
pub struct EmptyContext;

impl BindingContext for EmptyContext {}

type Scope = Vec<(SmolStr, Value)>;

/// Evaluates expressions by resolving their members with a [`MemberManager`]
#[derive(Clone)]
pub struct Evaluator {
    manager: Arc<MemberManager>,
    context: Arc<dyn BindingContext>,
    policy: ResolutionPolicy,
}

fn evaluation_error(message: impl Into<String>) -> BindingError {
    BindingError::Evaluation(message.into())
}

impl Evaluator {
    pub fn new(manager: Arc<MemberManager>, context: Arc<dyn BindingContext>) -> Self {
        Self { manager, context, policy: ResolutionPolicy::Strict }
    }

    /// Use `policy` for the members that can't be resolved. The default is strict.
    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn member_manager(&self) -> &Arc<MemberManager> {
        &self.manager
    }

    /// Evaluate `expr`. Members without target are read on `source`.
    pub fn evaluate(&self, expr: &Expression, source: &Value) -> Result<Value, BindingError> {
        self.eval(expr, source, &Scope::new())
    }

    fn eval(
        &self,
        expr: &Expression,
        source: &Value,
        scope: &Scope,
    ) -> Result<Value, BindingError> {
        match expr {
            Expression::Constant(value) => Ok(Value::Primitive(value.clone())),
            Expression::Member { target, name } => {
                let target = self.eval_target(target.as_deref(), source, scope)?;
                self.read_member(&target, name)
            }
            Expression::Index { target, arguments } => {
                let target = self.eval(target, source, scope)?;
                let arguments = self.eval_all(arguments, source, scope)?;
                self.read_index(&target, &arguments)
            }
            Expression::MethodCall { target: None, method, type_args, arguments }
                if method == DEFAULT_METHOD && arguments.is_empty() && type_args.len() == 1 =>
            {
                let value = LiteralType::from_type_name(&type_args[0])
                    .map_or(Literal::Null, Literal::default_for);
                Ok(Value::Primitive(value))
            }
            Expression::MethodCall { target: None, method, arguments, .. }
                if method == NEW_ARRAY_METHOD =>
            {
                Ok(Value::Object(ListObject::new(self.eval_all(arguments, source, scope)?)))
            }
            Expression::MethodCall { target, method, arguments, .. } => {
                let target = self.eval_target(target.as_deref(), source, scope)?;
                let arguments = self.eval_all(arguments, source, scope)?;
                self.call_method(&target, method, &arguments)
            }
            Expression::Unary {
                op: op @ (UnaryOperator::DynamicExpression | UnaryOperator::StaticExpression),
                operand,
            } => {
                let key = operand
                    .to_member_path()
                    .ok_or_else(|| evaluation_error(format!("Invalid resource key '{operand}'")))?;
                let dynamic = *op == UnaryOperator::DynamicExpression;
                match self.context.resource(key.path(), dynamic) {
                    Some(value) => Ok(value),
                    None if self.policy.is_strict() => {
                        Err(evaluation_error(format!("Resource '{key}' not found")))
                    }
                    None => Ok(Value::null()),
                }
            }
            Expression::Unary { op, operand } => {
                let value = self.eval(operand, source, scope)?;
                let literal = self.literal(&value, expr)?;
                fold_unary(*op, literal).map(Value::Primitive).ok_or_else(|| {
                    evaluation_error(format!(
                        "Cannot apply '{expr}' to a value of type '{}'",
                        literal.ty()
                    ))
                })
            }
            Expression::Binary { op: BinaryOperator::AndAlso, lhs, rhs } => Ok(Value::from(
                self.eval_bool(lhs, source, scope)? && self.eval_bool(rhs, source, scope)?,
            )),
            Expression::Binary { op: BinaryOperator::OrElse, lhs, rhs } => Ok(Value::from(
                self.eval_bool(lhs, source, scope)? || self.eval_bool(rhs, source, scope)?,
            )),
            Expression::Binary { op: BinaryOperator::NullCoalescing, lhs, rhs } => {
                let value = self.eval(lhs, source, scope)?;
                if value.is_null() { self.eval(rhs, source, scope) } else { Ok(value) }
            }
            Expression::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs, source, scope)?;
                let rhs = self.eval(rhs, source, scope)?;
                self.binary(*op, &lhs, &rhs, expr)
            }
            Expression::Condition { condition, true_expr, false_expr } => {
                if self.eval_bool(condition, source, scope)? {
                    self.eval(true_expr, source, scope)
                } else {
                    self.eval(false_expr, source, scope)
                }
            }
            Expression::Lambda { parameters, body } => Ok(Value::Object(Arc::new(LambdaObject {
                parameters: parameters.clone(),
                body: (**body).clone(),
                source: source.clone(),
                scope: scope.clone(),
                evaluator: self.clone(),
            }))),
            Expression::Parameter { name } => scope
                .iter()
                .rev()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| evaluation_error(format!("Unknown lambda parameter '{name}'"))),
            Expression::RelativeSource { kind, element_name, path, level } => {
                let object = self.context.relative_source(*kind, element_name.as_deref(), *level);
                let Some(object) = object else {
                    return self.unavailable(&expr.to_string());
                };
                let mut value = Value::Object(object);
                for segment in path.iter().flat_map(|p| p.members()) {
                    value = match MemberPath::index_arguments(segment) {
                        Some(arguments) => {
                            let arguments: Vec<Value> =
                                arguments.into_iter().map(Value::from).collect();
                            self.read_index(&value, &arguments)?
                        }
                        None => self.read_member(&value, segment)?,
                    };
                }
                Ok(value)
            }
        }
    }

    fn eval_target(
        &self,
        target: Option<&Expression>,
        source: &Value,
        scope: &Scope,
    ) -> Result<Value, BindingError> {
        match target {
            Some(target) => self.eval(target, source, scope),
            None => Ok(source.clone()),
        }
    }

    fn eval_all(
        &self,
        exprs: &[Expression],
        source: &Value,
        scope: &Scope,
    ) -> Result<Vec<Value>, BindingError> {
        exprs.iter().map(|e| self.eval(e, source, scope)).collect()
    }

    fn eval_bool(
        &self,
        expr: &Expression,
        source: &Value,
        scope: &Scope,
    ) -> Result<bool, BindingError> {
        let value = self.eval(expr, source, scope)?;
        value.as_bool().ok_or_else(|| BindingError::TypeMismatch {
            expected: "bool".into(),
            found: value.type_name(),
        })
    }

    fn literal<'a>(
        &self,
        value: &'a Value,
        expr: &Expression,
    ) -> Result<&'a Literal, BindingError> {
        value.as_literal().ok_or_else(|| {
            evaluation_error(format!(
                "Cannot apply '{expr}' to a value of type '{}'",
                value.type_name()
            ))
        })
    }

    fn binary(
        &self,
        op: BinaryOperator,
        lhs: &Value,
        rhs: &Value,
        expr: &Expression,
    ) -> Result<Value, BindingError> {
        let has_object = lhs.as_object().is_some() || rhs.as_object().is_some();
        match op {
            BinaryOperator::Equality if has_object => Ok(Value::from(lhs == rhs)),
            BinaryOperator::NotEqual if has_object => Ok(Value::from(lhs != rhs)),
            _ => {
                let (a, b) = (self.literal(lhs, expr)?, self.literal(rhs, expr)?);
                fold_binary(op, a, b).map(Value::Primitive).ok_or_else(|| {
                    evaluation_error(format!(
                        "Cannot evaluate '{expr}' with values of type '{}' and '{}'",
                        a.ty(),
                        b.ty()
                    ))
                })
            }
        }
    }

    /// A null target is an error when strict, otherwise the result is null
    fn unavailable(&self, member: &str) -> Result<Value, BindingError> {
        if self.policy.is_strict() {
            Err(BindingError::TargetUnavailable(member.into()))
        } else {
            Ok(Value::null())
        }
    }

    fn target_type(&self, target: &Value, member: &str) -> Result<Option<TypeRc>, BindingError> {
        match target {
            Value::Object(o) => Ok(Some(o.object_type())),
            _ if target.is_null() => self.unavailable(member).map(|_| None),
            _ => Err(BindingError::MemberNotFound {
                ty: target.type_name(),
                name: member.into(),
                kind: MemberKind::ALL,
            }),
        }
    }

    fn read_member(&self, target: &Value, name: &str) -> Result<Value, BindingError> {
        let Some(ty) = self.target_type(target, name)? else { return Ok(Value::null()) };
        let flags = MemberFlags::INSTANCE_PUBLIC;
        match self.manager.try_get_member(&ty, name, MemberKind::ACCESSOR, flags, self.policy)? {
            Some(member) => self.manager.get_value(target, &member, &[]),
            None => Ok(Value::null()),
        }
    }

    fn read_index(&self, target: &Value, arguments: &[Value]) -> Result<Value, BindingError> {
        let Some(ty) = self.target_type(target, INDEXER_NAME)? else { return Ok(Value::null()) };
        let request = MemberRequest::for_values(INDEXER_NAME, arguments);
        match self.manager.try_get_members_for_request(
            &ty,
            MemberKind::ACCESSOR,
            MemberFlags::INSTANCE_PUBLIC,
            &request,
            self.policy,
        )? {
            Some(member) => self.manager.get_value(target, &member, arguments),
            None => Ok(Value::null()),
        }
    }

    fn call_method(
        &self,
        target: &Value,
        method: &str,
        arguments: &[Value],
    ) -> Result<Value, BindingError> {
        if let Some(lambda) = target.downcast_ref::<LambdaObject>()
            && method == INVOKE_METHOD
        {
            return lambda.call(arguments);
        }
        let Some(ty) = self.target_type(target, method)? else { return Ok(Value::null()) };
        let request = MemberRequest::for_values(method, arguments);
        match self.manager.try_get_members_for_request(
            &ty,
            MemberKind::METHOD,
            MemberFlags::INSTANCE_PUBLIC,
            &request,
            self.policy,
        )? {
            Some(member) => self.manager.invoke(target, &member, arguments),
            None => Ok(Value::null()),
        }
    }
}

/// The method of a lambda value that calls it
pub const INVOKE_METHOD: &str = "Invoke";

static LAMBDA_TYPE: Lazy<TypeRc> = Lazy::new(|| TypeDescriptor::builder("Lambda").build());

/// A lambda expression evaluated as a value, with the parameters of the enclosing lambdas.
///
/// Hosts receive it as argument of their methods, for example an extension method
/// `Where(list, predicate)`, and call it with [`LambdaObject::call`].
pub struct LambdaObject {
    parameters: Vec<SmolStr>,
    body: Expression,
    source: Value,
    scope: Scope,
    evaluator: Evaluator,
}

impl LambdaObject {
    pub fn parameters(&self) -> &[SmolStr] {
        &self.parameters
    }

    pub fn call(&self, arguments: &[Value]) -> Result<Value, BindingError> {
        if arguments.len() != self.parameters.len() {
            return Err(BindingError::InvalidArguments {
                member: INVOKE_METHOD.into(),
                message: format!(
                    "expected {} arguments, got {}",
                    self.parameters.len(),
                    arguments.len()
                ),
            });
        }
        let mut scope = self.scope.clone();
        scope.extend(self.parameters.iter().cloned().zip(arguments.iter().cloned()));
        self.evaluator.eval(&self.body, &self.source, &scope)
    }
}

impl Object for LambdaObject {
    fn object_type(&self) -> TypeRc {
        LAMBDA_TYPE.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn invoke_dynamic(&self, name: &str, args: &[Value]) -> Result<Value, BindingError> {
        if name == INVOKE_METHOD {
            self.call(args)
        } else {
            Err(BindingError::MemberNotFound {
                ty: "Lambda".into(),
                name: name.into(),
                kind: MemberKind::METHOD,
            })
        }
    }
}
