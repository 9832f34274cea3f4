// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! Observation of a single member.

A [`MemberObserverProvider`] knows how to be notified when a member of an object
changes. The providers are tried in order of priority:

 1. members flagged [`MemberFlags::NON_OBSERVABLE`] are never observed
 2. a member `Name` is observed through the `NameChanged` event of its object
 3. otherwise through the property changed notification of its object

A member that no provider can observe is read once, as a snapshot.
*/

use crate::events::{EventSource, INDEXER_CHANGED_NAME, PropertyChangedArgs, Subscription};
use crate::object::ObjectRc;
use crate::rtti::MemberRc;
use i_weave_common::MemberFlags;
use smol_str::{SmolStr, format_smolstr};
use std::sync::{Arc, Mutex};

pub type ChangeHandler = Arc<dyn Fn(&PropertyChangedArgs) + Send + Sync>;

pub trait MemberObserverProvider: Send + Sync {
    /// Subscribe `handler` to the changes of `member` on `target`, or decline with `None`
    fn try_observe(
        &self,
        target: &ObjectRc,
        member: &MemberRc,
        handler: ChangeHandler,
    ) -> Option<Subscription>;
}

/// Opt-out for the members flagged [`MemberFlags::NON_OBSERVABLE`]
pub struct NonObservableProvider;

impl MemberObserverProvider for NonObservableProvider {
    fn try_observe(
        &self,
        _: &ObjectRc,
        member: &MemberRc,
        _: ChangeHandler,
    ) -> Option<Subscription> {
        member.flags().contains(MemberFlags::NON_OBSERVABLE).then(Subscription::none)
    }
}

/// The `<Name>Changed` event of the object
pub struct ChangedEventProvider;

impl ChangedEventProvider {
    pub fn event_name(member: &MemberRc) -> SmolStr {
        format_smolstr!("{}Changed", member.name())
    }
}

impl MemberObserverProvider for ChangedEventProvider {
    fn try_observe(
        &self,
        target: &ObjectRc,
        member: &MemberRc,
        handler: ChangeHandler,
    ) -> Option<Subscription> {
        Subscription::subscribe(target, EventSource::Member(Self::event_name(member)), move |args| {
            handler(args)
        })
    }
}

/// The property changed notification of the object, filtered by member name.
/// Indexers are notified with [`INDEXER_CHANGED_NAME`].
pub struct PropertyChangedProvider;

impl MemberObserverProvider for PropertyChangedProvider {
    fn try_observe(
        &self,
        target: &ObjectRc,
        member: &MemberRc,
        handler: ChangeHandler,
    ) -> Option<Subscription> {
        let name = if member.is_indexer() {
            SmolStr::new_static(INDEXER_CHANGED_NAME)
        } else {
            SmolStr::from(member.name())
        };
        Subscription::subscribe(target, EventSource::PropertyChanged, move |args| {
            if args.affects(&name) {
                handler(args)
            }
        })
    }
}

/// The chain of [`MemberObserverProvider`]s
pub struct MemberObserverManager {
    providers: Mutex<Vec<(i32, Arc<dyn MemberObserverProvider>)>>,
}

impl Default for MemberObserverManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MemberObserverManager {
    pub fn new() -> Self {
        let manager = Self { providers: Default::default() };
        manager.add_provider(200, Arc::new(NonObservableProvider));
        manager.add_provider(100, Arc::new(ChangedEventProvider));
        manager.add_provider(0, Arc::new(PropertyChangedProvider));
        manager
    }

    /// Add a provider. Providers with a higher priority are tried first.
    pub fn add_provider(&self, priority: i32, provider: Arc<dyn MemberObserverProvider>) {
        let mut providers = crate::lock(&self.providers);
        let pos = providers.partition_point(|(p, _)| *p >= priority);
        providers.insert(pos, (priority, provider));
    }

    /// Observe the member. `None` if it can't be observed: its value is a snapshot.
    pub fn observe(
        &self,
        target: &ObjectRc,
        member: &MemberRc,
        handler: ChangeHandler,
    ) -> Option<Subscription> {
        let providers: Vec<_> =
            crate::lock(&self.providers).iter().map(|(_, p)| p.clone()).collect();
        let subscription =
            providers.iter().find_map(|p| p.try_observe(target, member, handler.clone()));
        if subscription.is_none() {
            log::debug!("{member:?} can't be observed on {}", target.object_type().name());
        }
        subscription
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PropertyChangedEvent;
    use crate::object::{DynamicObject, ListObject, Object};
    use crate::rtti::{MemberDeclaration, Type, TypeDescriptor, TypeRc};
    use crate::value::Value;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, ChangeHandler) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, Arc::new(move |_: &PropertyChangedArgs| {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn property_changed_is_filtered_by_name() {
        let ty = TypeDescriptor::builder("Person")
            .member(MemberDeclaration::property("Name", Type::Any))
            .member(MemberDeclaration::property("Id", Type::Any).with_flags(
                MemberFlags::INSTANCE_PUBLIC | MemberFlags::NON_OBSERVABLE,
            ))
            .build();
        let person = DynamicObject::new(ty.clone());
        let target: ObjectRc = person.clone();
        let manager = MemberObserverManager::new();
        let (count, handler) = counter();
        let name = &ty.declared_members()[0];
        let _subscription = manager.observe(&target, name, handler.clone()).unwrap();
        person.set("Other", 1);
        person.set("Name", "Ann");
        assert_eq!(count.load(Ordering::SeqCst), 1);
        person.property_changed_event().raise(&PropertyChangedArgs::default());
        assert_eq!(count.load(Ordering::SeqCst), 2);

        let id = manager.observe(&target, &ty.declared_members()[1], handler).unwrap();
        assert!(!id.is_active());
        assert_eq!(person.property_changed_event().handler_count(), 1);
    }

    #[test]
    fn indexers_are_notified_with_the_indexer_name() {
        let list = ListObject::new([Value::from(1)]);
        let target: ObjectRc = list.clone();
        let indexer = crate::rtti::INDEXER_NAME;
        let member = ListObject::list_type()
            .declared_members()
            .iter()
            .find(|m| m.name() == indexer)
            .cloned()
            .unwrap();
        let (count, handler) = counter();
        let manager = MemberObserverManager::new();
        let _subscription = manager.observe(&target, &member, handler).unwrap();
        list.set(0, Value::from(2)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    struct Clock {
        ty: TypeRc,
        time_changed: PropertyChangedEvent,
    }

    impl Object for Clock {
        fn object_type(&self) -> TypeRc {
            self.ty.clone()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn member_event(&self, name: &str) -> Option<&PropertyChangedEvent> {
            (name == "TimeChanged").then_some(&self.time_changed)
        }
    }

    #[test]
    fn changed_events() {
        let ty = TypeDescriptor::builder("Clock")
            .member(MemberDeclaration::property("Time", Type::Any))
            .member(MemberDeclaration::property("Zone", Type::Any))
            .build();
        let clock = Arc::new(Clock { ty: ty.clone(), time_changed: Default::default() });
        let target: ObjectRc = clock.clone();
        let manager = MemberObserverManager::new();
        let (count, handler) = counter();
        let time = &ty.declared_members()[0];
        let subscription = manager.observe(&target, time, handler.clone()).unwrap();
        clock.time_changed.raise(&PropertyChangedArgs::new("Time"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        drop(subscription);
        assert_eq!(clock.time_changed.handler_count(), 0);
        // No event and no property changed notification
        assert!(manager.observe(&target, &ty.declared_members()[1], handler).is_none());
    }
}
