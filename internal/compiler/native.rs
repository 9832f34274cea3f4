// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! Native expression trees

Strongly typed binding declarations are written as lambdas over the binding source,
for instance `|x: &Person| x.address.street`, and captured as a [`NativeExpression`]
tree by the host. Nodes are reference counted so that a node may be shared by
several parents, the converter converts a shared node only once.
*/

use i_weave_common::{Literal, LiteralType};
use smol_str::SmolStr;
use std::rc::Rc;

/// The static type of a native node
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum NativeType {
    #[display("{_0}")]
    Primitive(LiteralType),
    /// A type known by its name, like `Person`
    #[display("{_0}")]
    Named(SmolStr),
}

impl NativeType {
    pub fn object() -> Self {
        Self::Primitive(LiteralType::Object)
    }

    pub fn named(name: impl Into<SmolStr>) -> Self {
        Self::Named(name.into())
    }

    /// The value of `default(T)`: zero for primitive types, null for everything else
    pub fn default_value(&self) -> Literal {
        match self {
            NativeType::Primitive(ty) => Literal::default_for(*ty),
            NativeType::Named(_) => Literal::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeUnaryOp {
    Negate,
    UnaryPlus,
    Not,
    /// A type conversion, transparent for bindings
    Convert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeBinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    AndAlso,
    OrElse,
    Coalesce,
    /// `array[index]` on a single dimension array
    ArrayIndex,
}

pub type NativeExpressionRc = Rc<NativeExpression>;

#[derive(Debug)]
pub enum NativeExpression {
    Constant {
        value: Literal,
        ty: NativeType,
    },
    Parameter {
        name: SmolStr,
        ty: NativeType,
    },
    /// A field or property. `target` is None for static members
    Member {
        target: Option<NativeExpressionRc>,
        declaring_type: NativeType,
        name: SmolStr,
    },
    /// A method call. `target` is None for static methods
    Call {
        target: Option<NativeExpressionRc>,
        declaring_type: NativeType,
        method: SmolStr,
        type_args: Vec<NativeType>,
        arguments: Vec<NativeExpressionRc>,
    },
    Unary {
        op: NativeUnaryOp,
        operand: NativeExpressionRc,
        ty: NativeType,
    },
    Binary {
        op: NativeBinaryOp,
        lhs: NativeExpressionRc,
        rhs: NativeExpressionRc,
    },
    Conditional {
        test: NativeExpressionRc,
        if_true: NativeExpressionRc,
        if_false: NativeExpressionRc,
    },
    NewArray {
        element_type: NativeType,
        items: Vec<NativeExpressionRc>,
    },
    /// An indexer call like `list[0]` or `dict["key"]`
    Index {
        target: NativeExpressionRc,
        arguments: Vec<NativeExpressionRc>,
    },
    /// `parameters` are `Parameter` nodes, shared with the body
    Lambda {
        parameters: Vec<NativeExpressionRc>,
        body: NativeExpressionRc,
    },
    Default(NativeType),
}

impl NativeExpression {
    pub fn constant(value: impl Into<Literal>) -> NativeExpressionRc {
        let value = value.into();
        let ty = NativeType::Primitive(value.ty());
        Rc::new(Self::Constant { value, ty })
    }

    pub fn parameter(name: impl Into<SmolStr>, ty: NativeType) -> NativeExpressionRc {
        Rc::new(Self::Parameter { name: name.into(), ty })
    }

    pub fn member(
        target: &NativeExpressionRc,
        declaring_type: NativeType,
        name: impl Into<SmolStr>,
    ) -> NativeExpressionRc {
        Rc::new(Self::Member { target: Some(target.clone()), declaring_type, name: name.into() })
    }

    pub fn call(
        target: Option<&NativeExpressionRc>,
        declaring_type: NativeType,
        method: impl Into<SmolStr>,
        arguments: Vec<NativeExpressionRc>,
    ) -> NativeExpressionRc {
        Rc::new(Self::Call {
            target: target.cloned(),
            declaring_type,
            method: method.into(),
            type_args: vec![],
            arguments,
        })
    }

    pub fn binary(
        op: NativeBinaryOp,
        lhs: &NativeExpressionRc,
        rhs: &NativeExpressionRc,
    ) -> NativeExpressionRc {
        Rc::new(Self::Binary { op, lhs: lhs.clone(), rhs: rhs.clone() })
    }

    pub fn lambda(
        parameters: &[&NativeExpressionRc],
        body: NativeExpressionRc,
    ) -> NativeExpressionRc {
        let parameters = parameters.iter().map(|p| (*p).clone()).collect();
        Rc::new(Self::Lambda { parameters, body })
    }

    /// Short name of the node kind, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Constant { .. } => "constant",
            Self::Parameter { .. } => "parameter",
            Self::Member { .. } => "member access",
            Self::Call { .. } => "method call",
            Self::Unary { .. } => "unary operation",
            Self::Binary { .. } => "binary operation",
            Self::Conditional { .. } => "conditional",
            Self::NewArray { .. } => "array creation",
            Self::Index { .. } => "indexer",
            Self::Lambda { .. } => "lambda",
            Self::Default(_) => "default value",
        }
    }

    pub fn parameter_name(&self) -> Option<&SmolStr> {
        match self {
            Self::Parameter { name, .. } => Some(name),
            _ => None,
        }
    }
}
