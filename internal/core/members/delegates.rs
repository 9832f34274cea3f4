// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! Delegates to access the members.

The delegates are produced by a chain of [`DelegateProvider`]s and cached per
member identity. When no provider produces a delegate, the member is accessed
through the dynamic functions of [`Object`](crate::Object).
*/

use crate::error::BindingError;
use crate::object::ObjectRc;
use crate::rtti::{Activator, Getter, Invoker, MemberRc, Setter, TypeRc};
use crate::value::Value;
use by_address::ByAddress;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// A strategy to produce the delegates of the members. Every function may decline.
pub trait DelegateProvider: Send + Sync {
    fn try_get_getter(&self, _member: &MemberRc) -> Option<Getter> {
        None
    }

    fn try_get_setter(&self, _member: &MemberRc) -> Option<Setter> {
        None
    }

    fn try_get_invoker(&self, _member: &MemberRc) -> Option<Invoker> {
        None
    }

    fn try_get_activator(&self, _ty: &TypeRc) -> Option<Activator> {
        None
    }
}

/// The delegates given with the declaration of the members
#[derive(Default)]
pub struct DeclaredDelegateProvider;

impl DelegateProvider for DeclaredDelegateProvider {
    fn try_get_getter(&self, member: &MemberRc) -> Option<Getter> {
        member.declared_getter().cloned()
    }

    fn try_get_setter(&self, member: &MemberRc) -> Option<Setter> {
        member.declared_setter().cloned()
    }

    fn try_get_invoker(&self, member: &MemberRc) -> Option<Invoker> {
        member.declared_invoker().cloned()
    }

    fn try_get_activator(&self, ty: &TypeRc) -> Option<Activator> {
        ty.declared_activator().cloned()
    }
}

fn target_object<'a>(target: &'a Value, member: &str) -> Result<&'a ObjectRc, BindingError> {
    target.as_object().ok_or_else(|| BindingError::TargetUnavailable(member.into()))
}

fn dynamic_getter(member: &MemberRc) -> Getter {
    let name = member.name().to_owned();
    if member.is_indexer() {
        Arc::new(move |target: &Value, args: &[Value]| {
            target_object(target, &name)?.index_dynamic(args)
        })
    } else {
        Arc::new(move |target: &Value, _: &[Value]| {
            target_object(target, &name)?.get_dynamic(&name)
        })
    }
}

fn dynamic_setter(member: &MemberRc) -> Setter {
    let name = member.name().to_owned();
    if member.is_indexer() {
        Arc::new(move |_: &Value, _: &[Value], _: Value| {
            Err(BindingError::NotWritable(name.as_str().into()))
        })
    } else {
        Arc::new(move |target: &Value, _: &[Value], value: Value| {
            target_object(target, &name)?.set_dynamic(&name, value)
        })
    }
}

fn dynamic_invoker(member: &MemberRc) -> Invoker {
    let name = member.name().to_owned();
    Arc::new(move |target: &Value, args: &[Value]| {
        target_object(target, &name)?.invoke_dynamic(&name, args)
    })
}

struct DelegateMap<K: std::ops::Deref, D> {
    map: Mutex<HashMap<ByAddress<K>, D>>,
}

impl<K: std::ops::Deref, D> Default for DelegateMap<K, D> {
    fn default() -> Self {
        Self { map: Mutex::new(HashMap::new()) }
    }
}

impl<K: std::ops::Deref + Clone, D: Clone> DelegateMap<K, D>
where
    ByAddress<K>: Hash + Eq,
{
    /// The delegate cached for `key`. Otherwise `make` is called without holding the
    /// lock and, if another thread was faster, the delegate it stored is returned.
    fn get_or_make(&self, key: &K, make: impl FnOnce() -> D) -> D {
        if let Some(d) = crate::lock(&self.map).get(&ByAddress(key.clone())) {
            return d.clone();
        }
        let delegate = make();
        crate::lock(&self.map).entry(ByAddress(key.clone())).or_insert(delegate).clone()
    }

    fn clear(&self) {
        crate::lock(&self.map).clear();
    }
}

/// The chain of delegate providers, with the delegates cached per member
pub struct DelegateCache {
    providers: Mutex<Vec<(i32, Arc<dyn DelegateProvider>)>>,
    getters: DelegateMap<MemberRc, Getter>,
    setters: DelegateMap<MemberRc, Setter>,
    invokers: DelegateMap<MemberRc, Invoker>,
    activators: DelegateMap<TypeRc, Option<Activator>>,
}

impl Default for DelegateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DelegateCache {
    /// A cache with the [`DeclaredDelegateProvider`]
    pub fn new() -> Self {
        let cache = Self {
            providers: Default::default(),
            getters: Default::default(),
            setters: Default::default(),
            invokers: Default::default(),
            activators: Default::default(),
        };
        cache.add_provider(0, Arc::new(DeclaredDelegateProvider));
        cache
    }

    /// Add a provider. Providers with a higher priority are tried first.
    pub fn add_provider(&self, priority: i32, provider: Arc<dyn DelegateProvider>) {
        {
            let mut providers = crate::lock(&self.providers);
            let pos = providers.partition_point(|(p, _)| *p >= priority);
            providers.insert(pos, (priority, provider));
        }
        self.getters.clear();
        self.setters.clear();
        self.invokers.clear();
        self.activators.clear();
    }

    fn first<T>(&self, f: impl Fn(&dyn DelegateProvider) -> Option<T>) -> Option<T> {
        let providers: Vec<_> =
            crate::lock(&self.providers).iter().map(|(_, p)| p.clone()).collect();
        providers.iter().find_map(|p| f(p.as_ref()))
    }

    pub fn getter(&self, member: &MemberRc) -> Getter {
        self.getters.get_or_make(member, || {
            self.first(|p| p.try_get_getter(member)).unwrap_or_else(|| {
                log::debug!("{member:?} has no getter, it is read dynamically");
                dynamic_getter(member)
            })
        })
    }

    pub fn setter(&self, member: &MemberRc) -> Setter {
        self.setters.get_or_make(member, || {
            self.first(|p| p.try_get_setter(member)).unwrap_or_else(|| {
                log::debug!("{member:?} has no setter, it is written dynamically");
                dynamic_setter(member)
            })
        })
    }

    pub fn invoker(&self, member: &MemberRc) -> Invoker {
        self.invokers.get_or_make(member, || {
            self.first(|p| p.try_get_invoker(member)).unwrap_or_else(|| {
                log::debug!("{member:?} has no invoker, it is invoked dynamically");
                dynamic_invoker(member)
            })
        })
    }

    /// The constructor of the type, if any
    pub fn activator(&self, ty: &TypeRc) -> Option<Activator> {
        self.activators.get_or_make(ty, || self.first(|p| p.try_get_activator(ty)))
    }
}
