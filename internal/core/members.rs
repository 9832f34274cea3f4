// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! Member resolution.

The [`MemberManager`] finds the members of a type by asking a chain of
[`MemberProvider`]s ordered by priority:

 1. the members declared on the type descriptors ([`ReflectionMemberProvider`])
 2. the members attached by the host ([`AttachedMemberProvider`])
 3. the extension methods ([`ExtensionMethodProvider`])
 4. the accessors of dynamic types ([`DynamicMemberProvider`])

The result of each lookup is cached per `(type, name, kind, flags)`, and the
delegates used to access a member are cached per member in the [`DelegateCache`].
*/

use crate::error::{BindingError, ResolutionPolicy};
use crate::member_observer::MemberObserverManager;
use crate::rtti::{MemberDeclaration, MemberRc, Type, TypeRc};
use crate::value::Value;
use by_address::ByAddress;
use i_weave_common::{MemberFlags, MemberKind};
use once_cell::sync::Lazy;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

mod delegates;
mod overload;
mod providers;

pub use delegates::{DeclaredDelegateProvider, DelegateCache, DelegateProvider};
pub use overload::{MemberRequest, Overload, call_parameters, select_overload};
pub use providers::{
    AttachedMemberProvider, DynamicMemberProvider, ExtensionMethodProvider, MemberProvider,
    ReflectionMemberProvider,
};

pub const REFLECTION_PRIORITY: i32 = 300;
pub const ATTACHED_PRIORITY: i32 = 200;
pub const EXTENSION_PRIORITY: i32 = 100;
pub const DYNAMIC_PRIORITY: i32 = 0;

type CacheKey = (ByAddress<TypeRc>, SmolStr, MemberKind, MemberFlags);

/// The members found by the providers, per lookup
#[derive(Default)]
struct MemberCache {
    entries: Mutex<HashMap<CacheKey, Arc<[MemberRc]>>>,
}

impl MemberCache {
    fn get(&self, key: &CacheKey) -> Option<Arc<[MemberRc]>> {
        crate::lock(&self.entries).get(key).cloned()
    }

    /// Store the members unless another thread stored them first, and return the stored ones
    fn insert(&self, key: CacheKey, members: Arc<[MemberRc]>) -> Arc<[MemberRc]> {
        crate::lock(&self.entries).entry(key).or_insert(members).clone()
    }

    fn clear(&self) {
        crate::lock(&self.entries).clear();
    }
}

/// Finds members, and gives access to them through cached delegates
pub struct MemberManager {
    providers: Mutex<Vec<(i32, Arc<dyn MemberProvider>)>>,
    attached: Arc<AttachedMemberProvider>,
    extensions: Arc<ExtensionMethodProvider>,
    cache: MemberCache,
    delegates: DelegateCache,
    observers: MemberObserverManager,
}

static GLOBAL: Lazy<Arc<MemberManager>> = Lazy::new(|| Arc::new(MemberManager::new()));

impl Default for MemberManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MemberManager {
    /// A manager with the default providers
    pub fn new() -> Self {
        let attached = Arc::new(AttachedMemberProvider::default());
        let extensions = Arc::new(ExtensionMethodProvider::default());
        let manager = Self {
            providers: Default::default(),
            attached: attached.clone(),
            extensions: extensions.clone(),
            cache: Default::default(),
            delegates: DelegateCache::new(),
            observers: MemberObserverManager::new(),
        };
        manager.add_provider(REFLECTION_PRIORITY, Arc::new(ReflectionMemberProvider));
        manager.add_provider(ATTACHED_PRIORITY, attached);
        manager.add_provider(EXTENSION_PRIORITY, extensions);
        manager.add_provider(DYNAMIC_PRIORITY, Arc::new(DynamicMemberProvider::default()));
        manager
    }

    /// The manager shared by the process
    pub fn global() -> Arc<MemberManager> {
        GLOBAL.clone()
    }

    /// Add a provider. Providers with a higher priority are asked first.
    pub fn add_provider(&self, priority: i32, provider: Arc<dyn MemberProvider>) {
        {
            let mut providers = crate::lock(&self.providers);
            let pos = providers.partition_point(|(p, _)| *p >= priority);
            providers.insert(pos, (priority, provider));
        }
        self.cache.clear();
    }

    /// See [`AttachedMemberProvider::register`]
    pub fn register_attached(&self, ty: &TypeRc, declaration: MemberDeclaration) -> MemberRc {
        let member = self.attached.register(ty, declaration);
        self.cache.clear();
        member
    }

    /// See [`ExtensionMethodProvider::register`]
    pub fn register_extension(
        &self,
        declaring_type: &TypeRc,
        declaration: MemberDeclaration,
    ) -> Option<MemberRc> {
        let member = self.extensions.register(declaring_type, declaration);
        self.cache.clear();
        member
    }

    pub fn delegates(&self) -> &DelegateCache {
        &self.delegates
    }

    pub fn observers(&self) -> &MemberObserverManager {
        &self.observers
    }

    /// All the members named `name` of the first provider that has some
    pub fn try_get_members(
        &self,
        ty: &TypeRc,
        name: &str,
        kind: MemberKind,
        flags: MemberFlags,
    ) -> Arc<[MemberRc]> {
        let key = (ByAddress(ty.clone()), SmolStr::from(name), kind, flags);
        if let Some(members) = self.cache.get(&key) {
            return members;
        }
        log::debug!("looking up {kind:?} '{name}' on {} with {flags:?}", ty.name());
        let providers: Vec<_> =
            crate::lock(&self.providers).iter().map(|(_, p)| p.clone()).collect();
        let members = providers
            .iter()
            .map(|p| p.try_get_members(ty, name, kind, flags))
            .find(|m| !m.is_empty())
            .unwrap_or_default();
        self.cache.insert(key, members.into())
    }

    /// The single member named `name`.
    ///
    /// Several candidates are an [`BindingError::AmbiguousMatch`] whatever the policy.
    pub fn try_get_member(
        &self,
        ty: &TypeRc,
        name: &str,
        kind: MemberKind,
        flags: MemberFlags,
        policy: ResolutionPolicy,
    ) -> Result<Option<MemberRc>, BindingError> {
        match &*self.try_get_members(ty, name, kind, flags) {
            [] => not_found(ty, name, kind, policy),
            [member] => Ok(Some(member.clone())),
            candidates => Err(ambiguous(ty, name, candidates.len())),
        }
    }

    /// The member named `request.name` whose parameters best match the arguments
    pub fn try_get_members_for_request(
        &self,
        ty: &TypeRc,
        kind: MemberKind,
        flags: MemberFlags,
        request: &MemberRequest,
        policy: ResolutionPolicy,
    ) -> Result<Option<MemberRc>, BindingError> {
        let candidates = self.try_get_members(ty, &request.name, kind, flags);
        match select_overload(&candidates, &request.arguments) {
            Overload::Found(member) => Ok(Some(member)),
            Overload::NotFound => not_found(ty, &request.name, kind, policy),
            Overload::Ambiguous(candidates) => Err(ambiguous(ty, &request.name, candidates.len())),
        }
    }

    /// Read the accessor `member` of `target`, with the indexer arguments `args`
    pub fn get_value(
        &self,
        target: &Value,
        member: &MemberRc,
        args: &[Value],
    ) -> Result<Value, BindingError> {
        let args = coerce_arguments(member, call_parameters(member), args)?;
        (self.delegates.getter(member))(target, &args)
    }

    pub fn set_value(
        &self,
        target: &Value,
        member: &MemberRc,
        args: &[Value],
        value: Value,
    ) -> Result<(), BindingError> {
        let args = coerce_arguments(member, call_parameters(member), args)?;
        let value = member.ty().coerce(value)?;
        (self.delegates.setter(member))(target, &args, value)
    }

    /// Invoke the method `member`. The target of an extension method is passed as
    /// its first argument.
    pub fn invoke(
        &self,
        target: &Value,
        member: &MemberRc,
        args: &[Value],
    ) -> Result<Value, BindingError> {
        let mut args = coerce_arguments(member, call_parameters(member), args)?;
        let invoker = self.delegates.invoker(member);
        if member.flags().contains(MemberFlags::EXTENSION) {
            args.insert(0, target.clone());
            invoker(&Value::null(), &args)
        } else {
            invoker(target, &args)
        }
    }

    /// Create an instance of `ty`
    pub fn create_instance(&self, ty: &TypeRc, args: &[Value]) -> Result<Value, BindingError> {
        let activator = self.delegates.activator(ty).ok_or_else(|| {
            BindingError::Evaluation(format!("Type '{}' has no constructor", ty.name()))
        })?;
        activator(args)
    }
}

fn not_found(
    ty: &TypeRc,
    name: &str,
    kind: MemberKind,
    policy: ResolutionPolicy,
) -> Result<Option<MemberRc>, BindingError> {
    if policy.is_strict() {
        Err(BindingError::MemberNotFound { ty: ty.name().into(), name: name.into(), kind })
    } else {
        log::debug!("no {kind:?} '{name}' on {}", ty.name());
        Ok(None)
    }
}

fn ambiguous(ty: &TypeRc, name: &str, candidates: usize) -> BindingError {
    log::warn!("{candidates} members named '{name}' on {} are equally good", ty.name());
    BindingError::AmbiguousMatch { ty: ty.name().into(), name: name.into(), candidates }
}

fn coerce_arguments(
    member: &MemberRc,
    parameters: &[Type],
    args: &[Value],
) -> Result<Vec<Value>, BindingError> {
    if parameters.len() != args.len() {
        return Err(BindingError::InvalidArguments {
            member: member.name().into(),
            message: format!("expected {} arguments, got {}", parameters.len(), args.len()),
        });
    }
    parameters.iter().zip(args).map(|(p, a)| p.coerce(a.clone())).collect()
}
