// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*!
 Runtime type information.

 Types are described by a [`TypeDescriptor`] built with [`TypeBuilder`], which
 declares the members of the type. Each declared member becomes a [`MemberInfo`]
 whose identity is stable for the lifetime of the type, so delegates can be cached
 per member.
*/

use crate::error::BindingError;
use crate::value::Value;
use i_weave_common::{Literal, LiteralType, MemberFlags, MemberKind};
use once_cell::sync::Lazy;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

pub type TypeRc = Arc<TypeDescriptor>;

pub type Getter = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, BindingError> + Send + Sync>;
pub type Setter = Arc<dyn Fn(&Value, &[Value], Value) -> Result<(), BindingError> + Send + Sync>;
pub type Invoker = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, BindingError> + Send + Sync>;
pub type Activator = Arc<dyn Fn(&[Value]) -> Result<Value, BindingError> + Send + Sync>;

/// Name of the indexer members, `Items[0]` reads the `Item` member of `Items`
pub const INDEXER_NAME: &str = "Item";

/// The type of a member, a parameter or a value
#[derive(Clone, Debug)]
pub enum Type {
    /// Any value, `object`
    Any,
    /// The type of the `null` literal
    Null,
    /// Return type of methods without a value
    Void,
    Primitive(LiteralType),
    Object(TypeRc),
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Any, Type::Any) | (Type::Null, Type::Null) | (Type::Void, Type::Void) => true,
            (Type::Primitive(a), Type::Primitive(b)) => a == b,
            (Type::Object(a), Type::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Any => f.write_str("object"),
            Type::Null => f.write_str("null"),
            Type::Void => f.write_str("void"),
            Type::Primitive(t) => write!(f, "{t}"),
            Type::Object(t) => f.write_str(t.name()),
        }
    }
}

pub const EXACT_MATCH: u32 = 0;
const WIDENING_COST: u32 = 1;
const BOXING_COST: u32 = 8;

fn is_implicit_widening(from: LiteralType, to: LiteralType) -> bool {
    use LiteralType::*;
    match from {
        Char => matches!(to, Int32 | UInt32 | Int64 | UInt64 | Float32 | Float64 | Decimal),
        Int32 => matches!(to, Int64 | Float32 | Float64 | Decimal),
        UInt32 => matches!(to, Int64 | UInt64 | Float32 | Float64 | Decimal),
        Int64 | UInt64 => matches!(to, Float32 | Float64 | Decimal),
        Float32 => to == Float64,
        _ => false,
    }
}

fn widen(value: &Literal, to: LiteralType) -> Option<Literal> {
    let as_f64 = || match value {
        Literal::Char(c) => Some(u32::from(*c) as f64),
        _ => value.as_f64(),
    };
    let as_i64 = || match value {
        Literal::Char(c) => Some(i64::from(u32::from(*c))),
        _ => value.as_i64(),
    };
    Some(match to {
        LiteralType::Int32 => Literal::Int32(as_i64()?.try_into().ok()?),
        LiteralType::UInt32 => Literal::UInt32(as_i64()?.try_into().ok()?),
        LiteralType::Int64 => Literal::Int64(as_i64()?),
        LiteralType::UInt64 => match value {
            Literal::UInt64(v) => Literal::UInt64(*v),
            _ => Literal::UInt64(as_i64()?.try_into().ok()?),
        },
        LiteralType::Float32 => Literal::Float32(as_f64()? as f32),
        LiteralType::Float64 => Literal::Float64(as_f64()?),
        LiteralType::Decimal => Literal::Decimal(as_f64()?),
        _ => return None,
    })
}

impl Type {
    /// The type with the given name: a primitive or a registered type
    pub fn from_name(name: &str) -> Option<Type> {
        match LiteralType::from_type_name(name) {
            Some(LiteralType::Object) => Some(Type::Any),
            Some(t) => Some(Type::Primitive(t)),
            None => TypeRegistry::global().get(name).map(Type::Object),
        }
    }

    /// True if a `null` can be stored in a value of this type
    pub fn is_nullable(&self) -> bool {
        match self {
            Type::Any | Type::Null | Type::Object(_) => true,
            Type::Primitive(t) => t.is_nullable(),
            Type::Void => false,
        }
    }

    /// The cost of the implicit conversion of a value of type `from` to this type.
    ///
    /// [`EXACT_MATCH`] for the same type, then in order of increasing cost: numeric
    /// widening, reference conversion to a base type and boxing into [`Type::Any`].
    /// `None` if there is no implicit conversion.
    pub fn conversion_cost(&self, from: &Type) -> Option<u32> {
        match (self, from) {
            (to, from) if to == from => Some(EXACT_MATCH),
            (_, Type::Void) | (Type::Void, _) | (Type::Null, _) => None,
            (to, Type::Null) => to.is_nullable().then_some(WIDENING_COST),
            (Type::Primitive(to), Type::Primitive(from)) => {
                is_implicit_widening(*from, *to).then_some(WIDENING_COST)
            }
            (Type::Object(to), Type::Object(from)) => from.distance_to(to),
            (Type::Any, Type::Object(_)) => Some(BOXING_COST / 2),
            (Type::Any, _) => Some(BOXING_COST),
            _ => None,
        }
    }

    /// Convert the value to this type with an implicit conversion
    pub fn coerce(&self, value: Value) -> Result<Value, BindingError> {
        let from = value.runtime_type();
        if self.conversion_cost(&from).is_none() {
            return Err(BindingError::TypeMismatch {
                expected: self.to_string().into(),
                found: from.to_string().into(),
            });
        }
        Ok(match (self, &value) {
            (Type::Primitive(to), Value::Primitive(l)) if l.ty() != *to && !l.is_null() => {
                Value::Primitive(widen(l, *to).ok_or_else(|| BindingError::TypeMismatch {
                    expected: self.to_string().into(),
                    found: from.to_string().into(),
                })?)
            }
            _ => value,
        })
    }
}

/// A member as declared by a type, see [`TypeBuilder::member`]
pub struct MemberDeclaration {
    name: SmolStr,
    kind: MemberKind,
    flags: MemberFlags,
    ty: Type,
    parameters: Vec<Type>,
    getter: Option<Getter>,
    setter: Option<Setter>,
    invoker: Option<Invoker>,
}

impl MemberDeclaration {
    fn new(name: impl Into<SmolStr>, kind: MemberKind, ty: Type, parameters: Vec<Type>) -> Self {
        Self {
            name: name.into(),
            kind,
            flags: MemberFlags::INSTANCE_PUBLIC,
            ty,
            parameters,
            getter: None,
            setter: None,
            invoker: None,
        }
    }

    pub fn property(name: impl Into<SmolStr>, ty: Type) -> Self {
        Self::new(name, MemberKind::ACCESSOR, ty, vec![])
    }

    /// An indexer, named [`INDEXER_NAME`]
    pub fn indexer(parameters: Vec<Type>, ty: Type) -> Self {
        Self::new(INDEXER_NAME, MemberKind::ACCESSOR, ty, parameters)
    }

    pub fn method(name: impl Into<SmolStr>, parameters: Vec<Type>, return_type: Type) -> Self {
        Self::new(name, MemberKind::METHOD, return_type, parameters)
    }

    pub fn event(name: impl Into<SmolStr>) -> Self {
        Self::new(name, MemberKind::EVENT, Type::Any, vec![])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> MemberFlags {
        self.flags
    }

    pub fn parameters(&self) -> &[Type] {
        &self.parameters
    }

    /// Replace the flags, the default is [`MemberFlags::INSTANCE_PUBLIC`]
    pub fn with_flags(mut self, flags: MemberFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_getter(
        mut self,
        getter: impl Fn(&Value, &[Value]) -> Result<Value, BindingError> + Send + Sync + 'static,
    ) -> Self {
        self.getter = Some(Arc::new(getter));
        self
    }

    pub fn with_setter(
        mut self,
        setter: impl Fn(&Value, &[Value], Value) -> Result<(), BindingError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.setter = Some(Arc::new(setter));
        self
    }

    pub fn with_invoker(
        mut self,
        invoker: impl Fn(&Value, &[Value]) -> Result<Value, BindingError> + Send + Sync + 'static,
    ) -> Self {
        self.invoker = Some(Arc::new(invoker));
        self
    }

    /// Make the member info. `declaring_type` may be dangling for members that
    /// don't belong to a registered type.
    pub fn build(
        self,
        declaring_type: Weak<TypeDescriptor>,
        declaring_type_name: SmolStr,
    ) -> MemberRc {
        Arc::new(MemberInfo {
            name: self.name,
            kind: self.kind,
            flags: self.flags,
            ty: self.ty,
            parameters: self.parameters,
            declaring_type,
            declaring_type_name,
            getter: self.getter,
            setter: self.setter,
            invoker: self.invoker,
        })
    }
}

pub type MemberRc = Arc<MemberInfo>;

/// A resolved member: an accessor, a method or an event
pub struct MemberInfo {
    name: SmolStr,
    kind: MemberKind,
    flags: MemberFlags,
    ty: Type,
    parameters: Vec<Type>,
    declaring_type: Weak<TypeDescriptor>,
    declaring_type_name: SmolStr,
    getter: Option<Getter>,
    setter: Option<Setter>,
    invoker: Option<Invoker>,
}

impl MemberInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn flags(&self) -> MemberFlags {
        self.flags
    }

    /// The type of the accessor, or the return type of the method
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Parameters of the method or of the indexer
    pub fn parameters(&self) -> &[Type] {
        &self.parameters
    }

    pub fn is_indexer(&self) -> bool {
        self.kind == MemberKind::ACCESSOR && !self.parameters.is_empty()
    }

    pub fn declaring_type(&self) -> Option<TypeRc> {
        self.declaring_type.upgrade()
    }

    pub fn declaring_type_name(&self) -> &str {
        &self.declaring_type_name
    }

    /// The getter given at declaration
    pub fn declared_getter(&self) -> Option<&Getter> {
        self.getter.as_ref()
    }

    pub fn declared_setter(&self) -> Option<&Setter> {
        self.setter.as_ref()
    }

    pub fn declared_invoker(&self) -> Option<&Invoker> {
        self.invoker.as_ref()
    }
}

impl std::fmt::Debug for MemberInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.declaring_type_name, self.name)?;
        if self.kind == MemberKind::METHOD || self.is_indexer() {
            let params = self.parameters.iter().map(|p| p.to_string()).collect::<Vec<_>>();
            write!(f, "({})", params.join(", "))?;
        }
        Ok(())
    }
}

/// Description of an object type
pub struct TypeDescriptor {
    name: SmolStr,
    base: Option<TypeRc>,
    dynamic: bool,
    members: Vec<MemberRc>,
    activator: Option<Activator>,
}

impl TypeDescriptor {
    pub fn builder(name: impl Into<SmolStr>) -> TypeBuilder {
        TypeBuilder {
            name: name.into(),
            base: None,
            dynamic: false,
            members: vec![],
            activator: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> Option<&TypeRc> {
        self.base.as_ref()
    }

    /// Objects of a dynamic type resolve members that are not declared at runtime
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// The members declared by this type, not including the base types
    pub fn declared_members(&self) -> &[MemberRc] {
        &self.members
    }

    /// The constructor given at declaration
    pub fn declared_activator(&self) -> Option<&Activator> {
        self.activator.as_ref()
    }

    /// This type, then its base types
    pub fn ancestors(self: &Arc<Self>) -> impl Iterator<Item = &TypeRc> {
        std::iter::successors(Some(self), |t| (*t).base.as_ref())
    }

    /// The number of inheritance levels from this type up to `base`, if `base` is
    /// this type or one of its base types
    pub fn distance_to(self: &Arc<Self>, base: &TypeRc) -> Option<u32> {
        self.ancestors().position(|t| Arc::ptr_eq(t, base)).map(|d| d as u32)
    }

    /// True if the type is `name` or derives from the type named `name`
    pub fn is_or_derives_from(self: &Arc<Self>, name: &str) -> bool {
        self.ancestors().any(|t| t.name == name)
    }
}

impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("base", &self.base.as_ref().map(|b| b.name.clone()))
            .field("members", &self.members)
            .finish()
    }
}

pub struct TypeBuilder {
    name: SmolStr,
    base: Option<TypeRc>,
    dynamic: bool,
    members: Vec<MemberDeclaration>,
    activator: Option<Activator>,
}

impl TypeBuilder {
    pub fn base(mut self, base: &TypeRc) -> Self {
        self.base = Some(base.clone());
        self
    }

    /// See [`TypeDescriptor::is_dynamic`]
    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    pub fn member(mut self, member: MemberDeclaration) -> Self {
        self.members.push(member);
        self
    }

    pub fn activator(
        mut self,
        activator: impl Fn(&[Value]) -> Result<Value, BindingError> + Send + Sync + 'static,
    ) -> Self {
        self.activator = Some(Arc::new(activator));
        self
    }

    pub fn build(self) -> TypeRc {
        let Self { name, base, dynamic, members, activator } = self;
        Arc::new_cyclic(|weak| {
            let members =
                members.into_iter().map(|m| m.build(weak.clone(), name.clone())).collect();
            TypeDescriptor { name, base, dynamic, members, activator }
        })
    }
}

/// Types known by name, used to resolve the type names found in bindings
#[derive(Default)]
pub struct TypeRegistry {
    types: Mutex<HashMap<SmolStr, TypeRc>>,
}

static GLOBAL_REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::default);

impl TypeRegistry {
    pub fn global() -> &'static TypeRegistry {
        &GLOBAL_REGISTRY
    }

    /// Register the type under its name, replacing a type with the same name
    pub fn register(&self, ty: &TypeRc) {
        if let Some(old) = crate::lock(&self.types).insert(ty.name.clone(), ty.clone()) {
            if !Arc::ptr_eq(&old, ty) {
                log::debug!("type {} registered again", ty.name);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<TypeRc> {
        crate::lock(&self.types).get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_costs() {
        let int = Type::Primitive(LiteralType::Int32);
        let long = Type::Primitive(LiteralType::Int64);
        let string = Type::Primitive(LiteralType::String);
        assert_eq!(int.conversion_cost(&int), Some(EXACT_MATCH));
        assert!(long.conversion_cost(&int) > Some(EXACT_MATCH));
        assert_eq!(int.conversion_cost(&long), None);
        assert!(Type::Any.conversion_cost(&int) > long.conversion_cost(&int));
        assert_eq!(string.conversion_cost(&Type::Null), Some(WIDENING_COST));
        assert_eq!(int.conversion_cost(&Type::Null), None);
    }

    #[test]
    fn inheritance() {
        let base = TypeDescriptor::builder("Base").build();
        let derived = TypeDescriptor::builder("Derived").base(&base).build();
        let other = TypeDescriptor::builder("Other").build();
        assert_eq!(derived.distance_to(&base), Some(1));
        assert_eq!(base.distance_to(&derived), None);
        assert!(derived.is_or_derives_from("Base"));
        let base_ty = Type::Object(base.clone());
        assert_eq!(base_ty.conversion_cost(&Type::Object(derived)), Some(1));
        assert_eq!(base_ty.conversion_cost(&Type::Object(other)), None);
    }

    #[test]
    fn coercion() {
        let double = Type::Primitive(LiteralType::Float64);
        assert_eq!(double.coerce(Value::from(2)), Ok(Value::from(2.0)));
        assert_eq!(Type::Any.coerce(Value::from(2)), Ok(Value::from(2)));
        assert!(matches!(
            Type::Primitive(LiteralType::Int32).coerce(Value::from("2")),
            Err(BindingError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn members_know_their_type() {
        let ty = TypeDescriptor::builder("Person")
            .member(MemberDeclaration::property("Name", Type::Primitive(LiteralType::String)))
            .member(MemberDeclaration::indexer(
                vec![Type::Primitive(LiteralType::Int32)],
                Type::Any,
            ))
            .build();
        let [name, indexer] = ty.declared_members() else { panic!() };
        assert!(Arc::ptr_eq(&name.declaring_type().unwrap(), &ty));
        assert!(!name.is_indexer());
        assert!(indexer.is_indexer());
        assert_eq!(format!("{indexer:?}"), "Person.Item(int)");
    }
}
