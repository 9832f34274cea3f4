// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

use i_weave_core::members::MemberManager;
use i_weave_core::path_observer::{MemberPathObserver, MemberPathObserverListener, ObserverState};
use i_weave_core::rtti::{MemberDeclaration, Type, TypeDescriptor, TypeRc};
use i_weave_core::{
    BindingError, DynamicObject, ListObject, LiteralType, MemberPath, ObjectRc, ResolutionPolicy,
    Value,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct Counter {
    path_changes: AtomicUsize,
    last_changes: AtomicUsize,
}

impl Counter {
    fn counts(&self) -> (usize, usize) {
        (self.path_changes.load(Ordering::SeqCst), self.last_changes.load(Ordering::SeqCst))
    }
}

impl MemberPathObserverListener for Counter {
    fn on_path_members_changed(&self, _: &MemberPathObserver) {
        self.path_changes.fetch_add(1, Ordering::SeqCst);
    }
    fn on_last_member_changed(&self, _: &MemberPathObserver) {
        self.last_changes.fetch_add(1, Ordering::SeqCst);
    }
}

fn node_type() -> TypeRc {
    TypeDescriptor::builder("Node").dynamic().build()
}

fn node<'a>(values: impl IntoIterator<Item = (&'a str, Value)>) -> Arc<DynamicObject> {
    DynamicObject::with_values(node_type(), values)
}

fn obj(o: &Arc<DynamicObject>) -> Value {
    Value::Object(o.clone())
}

fn observe(root: &Arc<DynamicObject>, path: &str) -> MemberPathObserver {
    let root: ObjectRc = root.clone();
    let path = MemberPath::parse(path).unwrap();
    MemberPathObserver::observe(&root, path, Arc::new(MemberManager::new())).unwrap()
}

#[test]
fn intermediate_change_rebinds_the_rest_of_the_path() {
    let b1 = node([("C", Value::from("one"))]);
    let a = node([("B", obj(&b1))]);
    let root = node([("A", obj(&a))]);

    let observer = observe(&root, "A.B.C");
    assert_eq!(observer.state(), ObserverState::Attached { complete: true });
    let counter = Arc::new(Counter::default());
    observer.add_listener(&counter);
    assert_eq!(b1.property_changed_event().handler_count(), 1);

    let b2 = node([("C", Value::from("two"))]);
    a.set("B", obj(&b2));
    assert_eq!(counter.counts(), (1, 1));
    assert_eq!(b1.property_changed_event().handler_count(), 0);
    assert_eq!(b2.property_changed_event().handler_count(), 1);
    assert_eq!(observer.get_value(ResolutionPolicy::Strict), Ok(Value::from("two")));

    // The old object is not observed anymore
    b1.set("C", "ignored");
    assert_eq!(counter.counts(), (1, 1));

    b2.set("C", "three");
    assert_eq!(counter.counts(), (1, 2));
    assert_eq!(observer.get_value(ResolutionPolicy::Strict), Ok(Value::from("three")));
}

#[test]
fn null_or_wrong_typed_intermediate_is_a_partial_path() {
    let b = node([("C", Value::from(1))]);
    let a = node([("B", obj(&b))]);
    let root = node([("A", obj(&a))]);
    let observer = observe(&root, "A.B.C");
    let counter = Arc::new(Counter::default());
    observer.add_listener(&counter);

    a.set("B", Value::null());
    assert_eq!(counter.counts(), (1, 1));
    assert_eq!(observer.state(), ObserverState::Attached { complete: false });
    let members = observer.get_path_members(ResolutionPolicy::Lenient).unwrap();
    assert!(!members.all_members_available());
    assert_eq!(members.resolved_count(), 2);
    assert!(members.last_member().is_none());
    assert_eq!(observer.get_value(ResolutionPolicy::Lenient), Ok(Value::null()));
    assert!(matches!(
        observer.get_path_members(ResolutionPolicy::Strict),
        Err(BindingError::TargetUnavailable(name)) if name == "C"
    ));

    a.set("B", Value::from(5));
    assert_eq!(counter.counts(), (2, 2));
    assert_eq!(observer.state(), ObserverState::Attached { complete: false });

    a.set("B", obj(&b));
    assert_eq!(observer.state(), ObserverState::Attached { complete: true });
    assert_eq!(observer.get_value(ResolutionPolicy::Strict), Ok(Value::from(1)));
}

#[test]
fn missing_member_is_reported_when_strict() {
    let fixed = TypeDescriptor::builder("Fixed").build();
    let root = node([("A", Value::Object(DynamicObject::new(fixed)))]);
    let observer = observe(&root, "A.Missing");
    assert!(matches!(
        observer.get_path_members(ResolutionPolicy::Strict),
        Err(BindingError::MemberNotFound { name, .. }) if name == "Missing"
    ));
    let members = observer.get_path_members(ResolutionPolicy::Lenient).unwrap();
    assert_eq!(members.resolved_count(), 1);
    assert!(observer.get_last_member(ResolutionPolicy::Lenient).unwrap().is_none());
}

#[test]
fn ambiguous_indexer_is_always_an_error() {
    let grid_type = TypeDescriptor::builder("Grid")
        .member(MemberDeclaration::indexer(vec![Type::Primitive(LiteralType::Int64)], Type::Any))
        .member(MemberDeclaration::indexer(vec![Type::Primitive(LiteralType::Float64)], Type::Any))
        .build();
    let root = node([("Grid", Value::Object(DynamicObject::new(grid_type)))]);
    let observer = observe(&root, "Grid[0]");
    for policy in [ResolutionPolicy::Lenient, ResolutionPolicy::Strict] {
        assert!(matches!(
            observer.get_path_members(policy),
            Err(BindingError::AmbiguousMatch { candidates: 2, .. })
        ));
    }
}

#[test]
fn dispose_is_idempotent() {
    let a = node([("B", Value::from(1))]);
    let root = node([("A", obj(&a))]);
    let observer = observe(&root, "A.B");
    let counter = Arc::new(Counter::default());
    observer.add_listener(&counter);
    assert_eq!(a.property_changed_event().handler_count(), 1);

    observer.dispose();
    observer.dispose();
    assert_eq!(observer.state(), ObserverState::Detached);
    assert!(!observer.is_alive());
    assert_eq!(a.property_changed_event().handler_count(), 0);
    assert_eq!(root.property_changed_event().handler_count(), 0);

    a.set("B", 2);
    assert_eq!(counter.counts(), (0, 0));
    assert!(matches!(
        observer.get_path_members(ResolutionPolicy::Strict),
        Err(BindingError::TargetUnavailable(_))
    ));
    assert_eq!(observer.get_path_members(ResolutionPolicy::Lenient).unwrap().resolved_count(), 0);
}

#[test]
fn observers_dont_keep_the_graph_alive() {
    let a = node([("B", Value::from(1))]);
    let root = node([("A", obj(&a))]);
    let observer = observe(&root, "A.B");
    let weak_root = Arc::downgrade(&root);
    drop(root);
    assert!(weak_root.upgrade().is_none());
    assert!(!observer.is_alive());
    assert!(matches!(
        observer.get_value(ResolutionPolicy::Strict),
        Err(BindingError::TargetUnavailable(_))
    ));
    assert_eq!(observer.get_value(ResolutionPolicy::Lenient), Ok(Value::null()));

    // Dropping the last handle unsubscribes from the objects still alive
    assert_eq!(a.property_changed_event().handler_count(), 1);
    drop(observer);
    assert_eq!(a.property_changed_event().handler_count(), 0);
}

#[test]
fn listeners_are_held_weakly() {
    let root = node([("A", Value::from(1))]);
    let observer = observe(&root, "A");
    let counter = Arc::new(Counter::default());
    observer.add_listener(&counter);
    let weak = Arc::downgrade(&counter);
    drop(counter);
    assert!(weak.upgrade().is_none());
    root.set("A", 2);
    assert_eq!(observer.get_value(ResolutionPolicy::Strict), Ok(Value::from(2)));
}

#[test]
fn indexed_path_end_to_end() {
    let person = node([("Name", Value::from("X"))]);
    let items = ListObject::new([obj(&person)]);
    let root = node([("Items", Value::Object(items.clone()))]);

    let observer = observe(&root, "Items[0].Name");
    assert_eq!(observer.get_value(ResolutionPolicy::Strict), Ok(Value::from("X")));
    let counter = Arc::new(Counter::default());
    observer.add_listener(&counter);

    let other = node([("Name", Value::from("Y"))]);
    items.set(0, obj(&other)).unwrap();
    assert_eq!(counter.counts(), (1, 1));
    assert_eq!(observer.get_value(ResolutionPolicy::Strict), Ok(Value::from("Y")));
    assert_eq!(person.property_changed_event().handler_count(), 0);

    observer.set_value(ResolutionPolicy::Strict, Value::from("Z")).unwrap();
    assert_eq!(other.get("Name"), Value::from("Z"));
    assert_eq!(counter.counts(), (1, 2));

    let last = observer.get_last_member(ResolutionPolicy::Strict).unwrap().unwrap();
    assert_eq!(last.member.name(), "Name");
    let members = observer.get_path_members(ResolutionPolicy::Strict).unwrap();
    assert_eq!(members.members()[1].arguments, [Value::from(0)]);
}
