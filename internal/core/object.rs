// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! The object model.

Every object exposed to bindings implements [`Object`]. Members declared on the
[`TypeDescriptor`](crate::rtti::TypeDescriptor) of the object are accessed through
their delegates. The `*_dynamic` functions are the slow path, used for members
without a declared delegate and for members of dynamic types.
*/

use crate::error::BindingError;
use crate::events::{INDEXER_CHANGED_NAME, PropertyChangedArgs, PropertyChangedEvent};
use crate::rtti::{MemberDeclaration, Type, TypeDescriptor, TypeRc};
use crate::value::Value;
use i_weave_common::{LiteralType, MemberKind};
use once_cell::sync::Lazy;
use smol_str::SmolStr;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

pub type ObjectRc = Arc<dyn Object>;
pub type ObjectWeak = Weak<dyn Object>;

pub trait Object: Send + Sync + 'static {
    fn object_type(&self) -> TypeRc;

    fn as_any(&self) -> &dyn Any;

    fn get_dynamic(&self, name: &str) -> Result<Value, BindingError> {
        Err(BindingError::NotReadable(name.into()))
    }

    fn set_dynamic(&self, name: &str, _value: Value) -> Result<(), BindingError> {
        Err(BindingError::NotWritable(name.into()))
    }

    fn invoke_dynamic(&self, name: &str, _args: &[Value]) -> Result<Value, BindingError> {
        Err(BindingError::MemberNotFound {
            ty: self.object_type().name().into(),
            name: name.into(),
            kind: MemberKind::METHOD,
        })
    }

    fn index_dynamic(&self, _args: &[Value]) -> Result<Value, BindingError> {
        Err(BindingError::NotReadable(INDEXER_CHANGED_NAME.into()))
    }

    /// The notification raised when any member changes, if the object has one
    fn property_changed(&self) -> Option<&PropertyChangedEvent> {
        None
    }

    /// An event dedicated to one member, such as `NameChanged`
    fn member_event(&self, _name: &str) -> Option<&PropertyChangedEvent> {
        None
    }
}

impl std::fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{} object>", self.object_type().name())
    }
}

fn lock_read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn lock_write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// An object holding its values by name, which notifies each change
pub struct DynamicObject {
    ty: TypeRc,
    values: RwLock<HashMap<SmolStr, Value>>,
    property_changed: PropertyChangedEvent,
}

impl DynamicObject {
    pub fn new(ty: TypeRc) -> Arc<Self> {
        Arc::new(Self { ty, values: Default::default(), property_changed: Default::default() })
    }

    pub fn with_values<'a>(
        ty: TypeRc,
        values: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Arc<Self> {
        let values = values.into_iter().map(|(k, v)| (SmolStr::from(k), v)).collect();
        Arc::new(Self { ty, values: RwLock::new(values), property_changed: Default::default() })
    }

    /// The value of `name`, null if it was never set
    pub fn get(&self, name: &str) -> Value {
        lock_read(&self.values).get(name).cloned().unwrap_or_default()
    }

    /// Set the value and notify the change, if the value is different
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        let old = lock_write(&self.values).insert(name.into(), value.clone());
        if old.as_ref() != Some(&value) {
            self.property_changed.raise(&PropertyChangedArgs::new(name));
        }
    }

    pub fn property_changed_event(&self) -> &PropertyChangedEvent {
        &self.property_changed
    }
}

impl Object for DynamicObject {
    fn object_type(&self) -> TypeRc {
        self.ty.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_dynamic(&self, name: &str) -> Result<Value, BindingError> {
        Ok(self.get(name))
    }

    fn set_dynamic(&self, name: &str, value: Value) -> Result<(), BindingError> {
        self.set(name, value);
        Ok(())
    }

    fn property_changed(&self) -> Option<&PropertyChangedEvent> {
        Some(&self.property_changed)
    }
}

/// A list of values with an indexer and a `Count`, which notifies its changes
#[derive(Default)]
pub struct ListObject {
    items: RwLock<Vec<Value>>,
    property_changed: PropertyChangedEvent,
}

fn index_argument(args: &[Value]) -> Result<usize, BindingError> {
    match args {
        [index] => index.as_i64().and_then(|i| usize::try_from(i).ok()).ok_or_else(|| {
            BindingError::InvalidArguments {
                member: INDEXER_CHANGED_NAME.into(),
                message: format!("{index:?} is not a valid index"),
            }
        }),
        _ => Err(BindingError::InvalidArguments {
            member: INDEXER_CHANGED_NAME.into(),
            message: format!("expected 1 argument, got {}", args.len()),
        }),
    }
}

fn out_of_range(index: usize, len: usize) -> BindingError {
    BindingError::InvalidArguments {
        member: INDEXER_CHANGED_NAME.into(),
        message: format!("index {index} is out of range for a list of {len} items"),
    }
}

fn count_value(len: usize) -> Result<Value, BindingError> {
    i32::try_from(len)
        .map(Value::from)
        .map_err(|_| BindingError::Evaluation(format!("{len} items exceed the Int32 Count range")))
}

fn as_list(target: &Value) -> Result<&ListObject, BindingError> {
    target.downcast_ref::<ListObject>().ok_or_else(|| BindingError::TypeMismatch {
        expected: LIST_TYPE.name().into(),
        found: target.type_name(),
    })
}

static LIST_TYPE: Lazy<TypeRc> = Lazy::new(|| {
    let int = Type::Primitive(LiteralType::Int32);
    TypeDescriptor::builder("List")
        .member(
            MemberDeclaration::indexer(vec![int.clone()], Type::Any)
                .with_getter(|target, args| as_list(target)?.get(index_argument(args)?))
                .with_setter(|target, args, value| {
                    as_list(target)?.set(index_argument(args)?, value)
                }),
        )
        .member(
            MemberDeclaration::property("Count", int.clone())
                .with_getter(|target, _| count_value(as_list(target)?.len())),
        )
        .member(MemberDeclaration::method("Add", vec![Type::Any], Type::Void).with_invoker(
            |target, args| {
                let list = as_list(target)?;
                for a in args {
                    list.push(a.clone());
                }
                Ok(Value::null())
            },
        ))
        .member(MemberDeclaration::method("RemoveAt", vec![int], Type::Void).with_invoker(
            |target, args| {
                as_list(target)?.remove(index_argument(args)?)?;
                Ok(Value::null())
            },
        ))
        .build()
});

impl ListObject {
    pub fn new(items: impl IntoIterator<Item = Value>) -> Arc<Self> {
        Arc::new(Self { items: RwLock::new(items.into_iter().collect()), ..Default::default() })
    }

    /// The type of every list
    pub fn list_type() -> TypeRc {
        LIST_TYPE.clone()
    }

    pub fn len(&self) -> usize {
        lock_read(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Result<Value, BindingError> {
        let items = lock_read(&self.items);
        items.get(index).cloned().ok_or_else(|| out_of_range(index, items.len()))
    }

    pub fn set(&self, index: usize, value: Value) -> Result<(), BindingError> {
        {
            let mut items = lock_write(&self.items);
            let len = items.len();
            let slot = items.get_mut(index).ok_or_else(|| out_of_range(index, len))?;
            if *slot == value {
                return Ok(());
            }
            *slot = value;
        }
        self.notify_items_changed(false);
        Ok(())
    }

    pub fn push(&self, value: Value) {
        lock_write(&self.items).push(value);
        self.notify_items_changed(true);
    }

    pub fn remove(&self, index: usize) -> Result<Value, BindingError> {
        let removed = {
            let mut items = lock_write(&self.items);
            if index >= items.len() {
                return Err(out_of_range(index, items.len()));
            }
            items.remove(index)
        };
        self.notify_items_changed(true);
        Ok(removed)
    }

    pub fn values(&self) -> Vec<Value> {
        lock_read(&self.items).clone()
    }

    fn notify_items_changed(&self, count_changed: bool) {
        if count_changed {
            self.property_changed.raise(&PropertyChangedArgs::new("Count"));
        }
        self.property_changed.raise(&PropertyChangedArgs::new(INDEXER_CHANGED_NAME));
    }
}

impl Object for ListObject {
    fn object_type(&self) -> TypeRc {
        LIST_TYPE.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn index_dynamic(&self, args: &[Value]) -> Result<Value, BindingError> {
        self.get(index_argument(args)?)
    }

    fn property_changed(&self) -> Option<&PropertyChangedEvent> {
        Some(&self.property_changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dynamic_object_notifies_changes_only() {
        let ty = TypeDescriptor::builder("Person").dynamic().build();
        let person = DynamicObject::with_values(ty, [("Name", Value::from("Ann"))]);
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        person.property_changed_event().subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        person.set("Name", "Ann");
        assert_eq!(count.load(Ordering::SeqCst), 0);
        person.set("Name", "Bob");
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(person.get("Name"), Value::from("Bob"));
        assert!(person.get("Age").is_null());
        assert_eq!(person.get_dynamic("Age"), Ok(Value::null()));
    }

    #[test]
    fn list_object() {
        let list = ListObject::new([Value::from(1), Value::from(2)]);
        let names = Arc::new(std::sync::Mutex::new(Vec::<SmolStr>::new()));
        let n = names.clone();
        list.property_changed()
            .unwrap()
            .subscribe(move |args| n.lock().unwrap().push(args.name.clone()));

        list.push(Value::from(3));
        list.set(0, Value::from(10)).unwrap();
        assert_eq!(list.index_dynamic(&[Value::from(0)]), Ok(Value::from(10)));
        assert!(list.get(3).is_err());
        assert_eq!(list.remove(1), Ok(Value::from(2)));
        assert_eq!(list.values(), [Value::from(10), Value::from(3)]);
        assert_eq!(*names.lock().unwrap(), ["Count", "Item[]", "Item[]", "Count", "Item[]"]);
    }

    #[test]
    fn list_count() {
        let list: Value = Value::Object(ListObject::new([Value::from(1)]));
        let count = LIST_TYPE.declared_members().iter().find(|m| m.name() == "Count").unwrap();
        assert_eq!(count.declared_getter().unwrap()(&list, &[]), Ok(Value::from(1)));
        assert_eq!(count_value(i32::MAX as usize), Ok(Value::from(i32::MAX)));
        assert!(matches!(count_value(i32::MAX as usize + 1), Err(BindingError::Evaluation(_))));
    }
}
