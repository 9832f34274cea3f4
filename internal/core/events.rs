// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! Change events and subscriptions.

An [`Event`] owns its handlers. A [`Subscription`] only keeps a weak reference to
the object that owns the event, so subscribing never keeps the observed object
alive, and disposing a subscription after the object is gone does nothing.
*/

use crate::object::{ObjectRc, ObjectWeak};
use smol_str::SmolStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Argument of the change notifications
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyChangedArgs {
    /// The member that changed. Empty means that every member may have changed.
    pub name: SmolStr,
}

impl PropertyChangedArgs {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self { name: name.into() }
    }

    /// True if the notification concerns the member `name`
    pub fn affects(&self, name: &str) -> bool {
        self.name.is_empty() || self.name == name
    }
}

/// Name used in the notifications of indexed values, such as the items of a list
pub const INDEXER_CHANGED_NAME: &str = "Item[]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// A list of handlers called when the event is raised
pub struct Event<A> {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(HandlerId, Handler<A>)>>,
}

pub type PropertyChangedEvent = Event<PropertyChangedArgs>;

impl<A> Default for Event<A> {
    fn default() -> Self {
        Self { next_id: AtomicU64::new(0), handlers: Mutex::new(Vec::new()) }
    }
}

impl<A> Event<A> {
    pub fn subscribe(&self, handler: impl Fn(&A) + Send + Sync + 'static) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        crate::lock(&self.handlers).push((id, Arc::new(handler)));
        id
    }

    /// Returns false if there was no such handler
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut handlers = crate::lock(&self.handlers);
        let len = handlers.len();
        handlers.retain(|(h, _)| *h != id);
        handlers.len() != len
    }

    /// Call the handlers. Handlers added or removed while raising take effect on the next call.
    pub fn raise(&self, args: &A) {
        let handlers: Vec<_> = crate::lock(&self.handlers).iter().map(|(_, h)| h.clone()).collect();
        for handler in handlers {
            handler(args);
        }
    }

    pub fn handler_count(&self) -> usize {
        crate::lock(&self.handlers).len()
    }
}

/// Which event of an object a subscription is registered to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    /// [`crate::Object::property_changed`]
    PropertyChanged,
    /// [`crate::Object::member_event`]
    Member(SmolStr),
}

impl EventSource {
    pub fn event<'a>(&self, object: &'a ObjectRc) -> Option<&'a PropertyChangedEvent> {
        match self {
            EventSource::PropertyChanged => object.property_changed(),
            EventSource::Member(name) => object.member_event(name),
        }
    }
}

struct Registration {
    target: ObjectWeak,
    source: EventSource,
    id: HandlerId,
}

/// A handler registered to an event of an object. Dropping the subscription disposes it.
#[derive(Default)]
pub struct Subscription {
    registration: Mutex<Option<Registration>>,
}

impl Subscription {
    /// Subscribe the handler to the event of the target,
    /// `None` if the target doesn't have this event
    pub fn subscribe(
        target: &ObjectRc,
        source: EventSource,
        handler: impl Fn(&PropertyChangedArgs) + Send + Sync + 'static,
    ) -> Option<Self> {
        let id = source.event(target)?.subscribe(handler);
        let registration = Registration { target: Arc::downgrade(target), source, id };
        Some(Self { registration: Mutex::new(Some(registration)) })
    }

    /// A subscription to nothing, for members that never notify
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        crate::lock(&self.registration).is_some()
    }

    /// Unregister the handler. Can be called several times, and after the target is gone.
    pub fn dispose(&self) {
        let Some(registration) = crate::lock(&self.registration).take() else { return };
        if let Some(target) = registration.target.upgrade() {
            if let Some(event) = registration.source.event(&target) {
                event.unsubscribe(registration.id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &*crate::lock(&self.registration) {
            Some(r) => write!(f, "Subscription({:?})", r.source),
            None => f.write_str("Subscription(disposed)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::DynamicObject;
    use crate::rtti::TypeDescriptor;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn raise_and_unsubscribe() {
        let event = PropertyChangedEvent::default();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let id = event.subscribe(move |args| {
            assert_eq!(args.name, "Name");
            c.fetch_add(1, Ordering::SeqCst);
        });
        event.raise(&PropertyChangedArgs::new("Name"));
        assert!(event.unsubscribe(id));
        assert!(!event.unsubscribe(id));
        event.raise(&PropertyChangedArgs::new("Name"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispose_is_idempotent() {
        let ty = TypeDescriptor::builder("Person").dynamic().build();
        let person = DynamicObject::new(ty);
        let target: ObjectRc = person.clone();
        let subscribe = |target: &ObjectRc| {
            Subscription::subscribe(target, EventSource::PropertyChanged, |_| {})
        };
        let subscription = subscribe(&target).unwrap();
        assert_eq!(person.property_changed_event().handler_count(), 1);
        subscription.dispose();
        subscription.dispose();
        assert!(!subscription.is_active());
        assert_eq!(person.property_changed_event().handler_count(), 0);

        let subscription = subscribe(&target).unwrap();
        drop(target);
        drop(person);
        // The target is gone, disposing must not fail
        subscription.dispose();
        drop(subscription);
    }

    #[test]
    fn subscriptions_dont_keep_the_target_alive() {
        let ty = TypeDescriptor::builder("Person").dynamic().build();
        let target: ObjectRc = DynamicObject::new(ty);
        let weak = Arc::downgrade(&target);
        let _subscription = Subscription::subscribe(&target, EventSource::PropertyChanged, |_| {});
        drop(target);
        assert!(weak.upgrade().is_none());
    }
}
