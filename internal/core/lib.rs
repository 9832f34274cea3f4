// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! The Weave runtime.

It holds the dynamic object model ([`Value`], [`object::Object`]), the runtime type
information ([`rtti`]), the member resolution pipeline ([`members::MemberManager`])
and the observers that follow member paths on live object graphs
([`path_observer::MemberPathObserver`]).

**NOTE**: This crate is an internal crate of the Weave project.
It should not be used directly by applications.
*/

#![deny(unsafe_code)]

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod error;
pub mod events;
pub mod member_observer;
pub mod members;
pub mod object;
pub mod path_observer;
pub mod rtti;
pub mod value;

#[doc(inline)]
pub use error::{BindingError, ResolutionPolicy};
#[doc(inline)]
pub use members::MemberManager;
#[doc(inline)]
pub use object::{DynamicObject, ListObject, Object, ObjectRc, ObjectWeak};
#[doc(inline)]
pub use path_observer::{MemberPathObserver, MemberPathObserverListener, ObserverState};
#[doc(inline)]
pub use value::Value;

pub use i_weave_common::{Literal, LiteralType, MemberFlags, MemberKind, MemberPath};

/// Lock a mutex, recovering the data if a thread panicked while holding it.
/// The caches only hold derived data, so the content is still usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
