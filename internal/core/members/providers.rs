// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! The member providers of the default chain

use crate::rtti::{MemberDeclaration, MemberRc, Type, TypeRc};
use by_address::ByAddress;
use i_weave_common::{MemberFlags, MemberKind};
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A strategy to find the members of a type.
///
/// Providers are tried in order of priority, the first one returning members wins.
pub trait MemberProvider: Send + Sync {
    fn try_get_members(
        &self,
        ty: &TypeRc,
        name: &str,
        kind: MemberKind,
        flags: MemberFlags,
    ) -> Vec<MemberRc>;
}

fn is_candidate(member: &MemberRc, name: &str, kind: MemberKind, flags: MemberFlags) -> bool {
    member.name() == name && kind.intersects(member.kind()) && member.flags().matches(flags)
}

/// The members declared on the type descriptors.
///
/// Base types are searched when the type doesn't declare a matching member:
/// a member declared in a derived type hides the members of the same name in its
/// base types.
#[derive(Default)]
pub struct ReflectionMemberProvider;

impl MemberProvider for ReflectionMemberProvider {
    fn try_get_members(
        &self,
        ty: &TypeRc,
        name: &str,
        kind: MemberKind,
        flags: MemberFlags,
    ) -> Vec<MemberRc> {
        ty.ancestors()
            .map(|t| {
                t.declared_members()
                    .iter()
                    .filter(|m| is_candidate(m, name, kind, flags))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .find(|members| !members.is_empty())
            .unwrap_or_default()
    }
}

/// Members registered by the host on types it doesn't own
#[derive(Default)]
pub struct AttachedMemberProvider {
    members: Mutex<Vec<(TypeRc, MemberRc)>>,
}

impl AttachedMemberProvider {
    /// Attach the member to `ty` and to the types deriving from it
    pub fn register(&self, ty: &TypeRc, declaration: MemberDeclaration) -> MemberRc {
        let declaration = match declaration.flags() {
            flags if flags.contains(MemberFlags::ATTACHED) => declaration,
            flags => declaration.with_flags(flags | MemberFlags::ATTACHED),
        };
        let member = declaration.build(Arc::downgrade(ty), ty.name().into());
        crate::lock(&self.members).push((ty.clone(), member.clone()));
        member
    }
}

impl MemberProvider for AttachedMemberProvider {
    fn try_get_members(
        &self,
        ty: &TypeRc,
        name: &str,
        kind: MemberKind,
        flags: MemberFlags,
    ) -> Vec<MemberRc> {
        crate::lock(&self.members)
            .iter()
            .filter(|(owner, m)| {
                is_candidate(m, name, kind, flags) && ty.distance_to(owner).is_some()
            })
            .map(|(_, m)| m.clone())
            .collect()
    }
}

/// Static methods callable as instance methods of the type of their first parameter
#[derive(Default)]
pub struct ExtensionMethodProvider {
    methods: Mutex<Vec<MemberRc>>,
}

impl ExtensionMethodProvider {
    /// Register an extension method. The declaration must have at least one parameter,
    /// its invoker receives the target as first argument.
    pub fn register(
        &self,
        declaring_type: &TypeRc,
        declaration: MemberDeclaration,
    ) -> Option<MemberRc> {
        if declaration.parameters().is_empty() {
            log::warn!("extension method {} has no parameter for its target", declaration.name());
            return None;
        }
        let declaration =
            declaration.with_flags(MemberFlags::STATIC_PUBLIC | MemberFlags::EXTENSION);
        let member =
            declaration.build(Arc::downgrade(declaring_type), declaring_type.name().into());
        crate::lock(&self.methods).push(member.clone());
        Some(member)
    }
}

impl MemberProvider for ExtensionMethodProvider {
    fn try_get_members(
        &self,
        ty: &TypeRc,
        name: &str,
        kind: MemberKind,
        flags: MemberFlags,
    ) -> Vec<MemberRc> {
        if !kind.contains(MemberKind::METHOD) || !flags.contains(MemberFlags::INSTANCE) {
            return Vec::new();
        }
        let target = Type::Object(ty.clone());
        crate::lock(&self.methods)
            .iter()
            .filter(|m| {
                m.name() == name
                    && m.parameters().first().is_some_and(|p| p.conversion_cost(&target).is_some())
            })
            .cloned()
            .collect()
    }
}

/// Accessors of dynamic types, read and written through [`crate::Object::get_dynamic`]
/// and [`crate::Object::set_dynamic`].
///
/// The same member is returned for each lookup of the same name on the same type.
#[derive(Default)]
pub struct DynamicMemberProvider {
    members: Mutex<HashMap<(ByAddress<TypeRc>, SmolStr), MemberRc>>,
}

impl MemberProvider for DynamicMemberProvider {
    fn try_get_members(
        &self,
        ty: &TypeRc,
        name: &str,
        kind: MemberKind,
        flags: MemberFlags,
    ) -> Vec<MemberRc> {
        if !ty.is_dynamic()
            || !kind.contains(MemberKind::ACCESSOR)
            || !MemberFlags::INSTANCE_PUBLIC.matches(flags)
        {
            return Vec::new();
        }
        let member = crate::lock(&self.members)
            .entry((ByAddress(ty.clone()), name.into()))
            .or_insert_with(|| {
                MemberDeclaration::property(name, Type::Any)
                    .with_flags(MemberFlags::INSTANCE_PUBLIC | MemberFlags::DYNAMIC)
                    .build(Arc::downgrade(ty), ty.name().into())
            })
            .clone();
        vec![member]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtti::TypeDescriptor;
    use i_weave_common::LiteralType;

    const PUBLIC: MemberFlags = MemberFlags::INSTANCE_PUBLIC;

    fn string() -> Type {
        Type::Primitive(LiteralType::String)
    }

    #[test]
    fn derived_members_hide_base_members() {
        let base = TypeDescriptor::builder("Base")
            .member(MemberDeclaration::property("Name", string()))
            .member(MemberDeclaration::property("Id", string()))
            .build();
        let derived = TypeDescriptor::builder("Derived")
            .base(&base)
            .member(MemberDeclaration::property("Name", string()))
            .build();
        let provider = ReflectionMemberProvider;
        let found = provider.try_get_members(&derived, "Name", MemberKind::ACCESSOR, PUBLIC);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].declaring_type_name(), "Derived");
        let found = provider.try_get_members(&derived, "Id", MemberKind::ALL, PUBLIC);
        assert_eq!(found[0].declaring_type_name(), "Base");
        assert!(provider.try_get_members(&derived, "Id", MemberKind::METHOD, PUBLIC).is_empty());
        assert!(provider
            .try_get_members(&derived, "Id", MemberKind::ACCESSOR, MemberFlags::STATIC_PUBLIC)
            .is_empty());
    }

    #[test]
    fn attached_members_apply_to_derived_types() {
        let base = TypeDescriptor::builder("View").build();
        let derived = TypeDescriptor::builder("Button").base(&base).build();
        let provider = AttachedMemberProvider::default();
        let member = provider.register(&base, MemberDeclaration::property("Row", Type::Any));
        assert!(member.flags().contains(MemberFlags::ATTACHED));
        let found = provider.try_get_members(&derived, "Row", MemberKind::ACCESSOR, PUBLIC);
        assert!(Arc::ptr_eq(&found[0], &member));
        let unrelated = TypeDescriptor::builder("Other").build();
        assert!(provider
            .try_get_members(&unrelated, "Row", MemberKind::ACCESSOR, PUBLIC)
            .is_empty());
    }

    #[test]
    fn extension_methods_match_their_first_parameter() {
        let person = TypeDescriptor::builder("Person").build();
        let helpers = TypeDescriptor::builder("PersonExtensions").build();
        let provider = ExtensionMethodProvider::default();
        let nothing = MemberDeclaration::method("Nothing", vec![], Type::Void);
        assert!(provider.register(&helpers, nothing).is_none());
        provider
            .register(
                &helpers,
                MemberDeclaration::method("Greet", vec![Type::Object(person.clone())], string()),
            )
            .unwrap();
        let found = provider.try_get_members(&person, "Greet", MemberKind::METHOD, PUBLIC);
        assert_eq!(found.len(), 1);
        assert!(found[0].flags().contains(MemberFlags::EXTENSION));
        let other = TypeDescriptor::builder("Other").build();
        assert!(provider.try_get_members(&other, "Greet", MemberKind::METHOD, PUBLIC).is_empty());
    }

    #[test]
    fn dynamic_members_keep_their_identity() {
        let dynamic = TypeDescriptor::builder("Bag").dynamic().build();
        let provider = DynamicMemberProvider::default();
        let a = provider.try_get_members(&dynamic, "X", MemberKind::ACCESSOR, PUBLIC);
        let b = provider.try_get_members(&dynamic, "X", MemberKind::ALL, PUBLIC);
        assert!(Arc::ptr_eq(&a[0], &b[0]));
        assert!(a[0].flags().contains(MemberFlags::DYNAMIC));
        let fixed = TypeDescriptor::builder("Fixed").build();
        assert!(provider.try_get_members(&fixed, "X", MemberKind::ACCESSOR, PUBLIC).is_empty());
    }
}
