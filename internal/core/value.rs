// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! The dynamically typed values flowing through bindings

use crate::object::ObjectRc;
use crate::rtti::Type;
use i_weave_common::{IndexArgument, Literal};
use smol_str::SmolStr;
use std::sync::Arc;

/// A value read from or written to a member: either a primitive or an object
#[derive(Clone, derive_more::From)]
pub enum Value {
    Primitive(Literal),
    Object(ObjectRc),
}

impl Default for Value {
    fn default() -> Self {
        Value::Primitive(Literal::Null)
    }
}

impl Value {
    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Primitive(Literal::Null))
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Value::Primitive(l) => Some(l),
            Value::Object(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRc> {
        match self {
            Value::Object(o) => Some(o),
            Value::Primitive(_) => None,
        }
    }

    /// Downcast the object to its concrete type
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_object()?.as_any().downcast_ref()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_literal()?.as_bool()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_literal()?.as_i64()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_literal()?.as_f64()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Primitive(Literal::String(s)) => Some(s),
            _ => None,
        }
    }

    /// The type of the value at runtime
    pub fn runtime_type(&self) -> Type {
        match self {
            Value::Primitive(Literal::Null) => Type::Null,
            Value::Primitive(l) => Type::Primitive(l.ty()),
            Value::Object(o) => Type::Object(o.object_type()),
        }
    }

    pub fn type_name(&self) -> SmolStr {
        self.runtime_type().to_string().into()
    }
}

/// Primitives compare by value, objects by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Primitive(a), Value::Primitive(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Primitive(l) => write!(f, "{l}"),
            Value::Object(o) => write!(f, "{o:?}"),
        }
    }
}

macro_rules! value_from_primitive {
    ($($ty:ty,)*) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::Primitive(v.into())
            }
        })*
    };
}

value_from_primitive! { bool, char, i32, i64, u32, u64, f32, f64, SmolStr, &str, }

/// Integers that fit are `int`, like the integer literals
impl From<IndexArgument> for Value {
    fn from(argument: IndexArgument) -> Self {
        match argument {
            IndexArgument::Integer(i) => i32::try_from(i).map_or(Value::from(i), Value::from),
            IndexArgument::String(s) => Value::from(s),
        }
    }
}

impl From<Option<ObjectRc>> for Value {
    fn from(o: Option<ObjectRc>) -> Self {
        o.map_or_else(Value::null, Value::Object)
    }
}

#[test]
fn value_equality() {
    use crate::object::DynamicObject;
    use crate::rtti::TypeDescriptor;
    let ty = TypeDescriptor::builder("Thing").dynamic().build();
    let a: ObjectRc = DynamicObject::new(ty.clone());
    let b: ObjectRc = DynamicObject::new(ty);
    assert_eq!(Value::from(a.clone()), Value::from(a.clone()));
    assert_ne!(Value::from(a), Value::from(b));
    assert_eq!(Value::from(3), Value::Primitive(Literal::Int32(3)));
    assert!(Value::from(None::<ObjectRc>).is_null());
    assert_eq!(Value::from("x").runtime_type().to_string(), "string");
}
