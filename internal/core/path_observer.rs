// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! Observation of a member path on a live object graph.

A [`MemberPathObserver`] resolves each segment of a [`MemberPath`] from the root
object and subscribes to the changes of every resolved member. When the value of
an intermediate member changes, the rest of the path is resolved again from the
runtime type of the new value. When the last member changes, only its value has
to be read again.

The observer holds the root and every target weakly: it never keeps the observed
graph alive, and the change handlers only hold the observer weakly.
*/

use crate::error::{BindingError, ResolutionPolicy};
use crate::events::{PropertyChangedArgs, Subscription};
use crate::member_observer::ChangeHandler;
use crate::members::{MemberManager, MemberRequest};
use crate::object::{ObjectRc, ObjectWeak};
use crate::rtti::{INDEXER_NAME, MemberRc};
use crate::value::Value;
use i_weave_common::{MemberFlags, MemberKind, MemberPath, MemberPathError};
use smol_str::SmolStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Receives the notifications of a [`MemberPathObserver`]
pub trait MemberPathObserverListener: Send + Sync {
    /// The members the path resolves to have changed
    fn on_path_members_changed(&self, _observer: &MemberPathObserver) {}

    /// The value at the end of the path may have changed.
    /// Called once for each change, also after [`Self::on_path_members_changed`].
    fn on_last_member_changed(&self, _observer: &MemberPathObserver) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Unattached,
    Resolving,
    /// `complete` is false when the path could only be resolved partially
    Attached { complete: bool },
    Detached,
}

enum Segment {
    Member(SmolStr),
    Index(Vec<Value>),
}

impl Segment {
    fn parse(segment: &SmolStr) -> Result<Self, BindingError> {
        if !MemberPath::is_index_segment(segment) {
            return Ok(Segment::Member(segment.clone()));
        }
        let arguments = MemberPath::index_arguments(segment)
            .ok_or_else(|| MemberPathError::InvalidIndexArgument(segment.clone()))?;
        Ok(Segment::Index(arguments.into_iter().map(Value::from).collect()))
    }

    fn name(&self) -> &str {
        match self {
            Segment::Member(name) => name,
            Segment::Index(_) => INDEXER_NAME,
        }
    }
}

/// A resolved segment of the path
struct Link {
    id: u64,
    target: ObjectWeak,
    member: MemberRc,
    arguments: Vec<Value>,
    /// `None` when the member can't be observed
    _subscription: Option<Subscription>,
}

struct State {
    status: ObserverState,
    /// Incremented each time the links are replaced
    epoch: u64,
    links: Vec<Link>,
    failure: Option<BindingError>,
}

/// The links resolved by a walk, up to the first failure
struct Walk {
    links: Vec<Link>,
    failure: Option<BindingError>,
}

struct Inner {
    root: ObjectWeak,
    path: MemberPath,
    segments: Vec<Segment>,
    manager: Arc<MemberManager>,
    next_link_id: AtomicU64,
    state: Mutex<State>,
    listeners: Mutex<Vec<Weak<dyn MemberPathObserverListener>>>,
}

impl Inner {
    fn resolve_segment(
        self: &Arc<Self>,
        target: &ObjectRc,
        index: usize,
    ) -> Result<Link, BindingError> {
        let ty = target.object_type();
        let segment = &self.segments[index];
        let (found, arguments) = match segment {
            Segment::Member(name) => (
                self.manager.try_get_member(
                    &ty,
                    name,
                    MemberKind::ACCESSOR,
                    MemberFlags::INSTANCE_PUBLIC,
                    ResolutionPolicy::Lenient,
                )?,
                Vec::new(),
            ),
            Segment::Index(arguments) => (
                self.manager.try_get_members_for_request(
                    &ty,
                    MemberKind::ACCESSOR,
                    MemberFlags::INSTANCE_PUBLIC,
                    &MemberRequest::for_values(INDEXER_NAME, arguments),
                    ResolutionPolicy::Lenient,
                )?,
                arguments.clone(),
            ),
        };
        let member = found.ok_or_else(|| BindingError::MemberNotFound {
            ty: ty.name().into(),
            name: segment.name().into(),
            kind: MemberKind::ACCESSOR,
        })?;
        let id = self.next_link_id.fetch_add(1, Ordering::Relaxed);
        let subscription =
            self.manager.observers().observe(target, &member, self.change_handler(index, id));
        let target = Arc::downgrade(target);
        Ok(Link { id, target, member, arguments, _subscription: subscription })
    }

    /// Resolve the segments from `from`, starting with the value `current`
    fn walk(self: &Arc<Self>, from: usize, mut current: Value) -> Walk {
        let mut links = Vec::new();
        for index in from..self.segments.len() {
            let Some(target) = current.as_object().cloned() else {
                let name = self.segments[index].name();
                log::debug!("{}: the target of '{name}' is {current:?}", self.path);
                let failure = BindingError::TargetUnavailable(name.into());
                return Walk { links, failure: Some(failure) };
            };
            let link = match self.resolve_segment(&target, index) {
                Ok(link) => link,
                Err(e) => {
                    log::debug!("{}: {e}", self.path);
                    return Walk { links, failure: Some(e) };
                }
            };
            if index + 1 < self.segments.len() {
                let value =
                    self.manager.get_value(&Value::Object(target), &link.member, &link.arguments);
                links.push(link);
                match value {
                    Ok(value) => current = value,
                    Err(e) => return Walk { links, failure: Some(e) },
                }
            } else {
                links.push(link);
            }
        }
        Walk { links, failure: None }
    }

    fn change_handler(self: &Arc<Self>, index: usize, id: u64) -> ChangeHandler {
        let inner = Arc::downgrade(self);
        Arc::new(move |_: &PropertyChangedArgs| {
            if let Some(inner) = inner.upgrade() {
                Inner::on_changed(&inner, index, id);
            }
        })
    }

    fn on_changed(self: &Arc<Self>, index: usize, id: u64) {
        let (target, member, arguments, epoch) = {
            let state = crate::lock(&self.state);
            let Some(link) = state.links.get(index).filter(|l| l.id == id) else { return };
            if !matches!(state.status, ObserverState::Attached { .. }) {
                return;
            }
            if index + 1 == self.segments.len() {
                drop(state);
                log::trace!("{}: the last member changed", self.path);
                self.notify(false);
                return;
            }
            (link.target.upgrade(), link.member.clone(), link.arguments.clone(), state.epoch)
        };

        let value = match target {
            Some(target) => self.manager.get_value(&Value::Object(target), &member, &arguments),
            None => Err(BindingError::TargetUnavailable(member.name().into())),
        };
        let walk = match value {
            Ok(value) => self.walk(index + 1, value),
            Err(failure) => Walk { links: Vec::new(), failure: Some(failure) },
        };

        let old_links = {
            let mut state = crate::lock(&self.state);
            if state.epoch != epoch || !matches!(state.status, ObserverState::Attached { .. }) {
                // Replaced by a concurrent change, or disposed
                return;
            }
            state.epoch += 1;
            let old_links = state.links.split_off(index + 1);
            state.links.extend(walk.links);
            state.status = ObserverState::Attached { complete: walk.failure.is_none() };
            state.failure = walk.failure;
            old_links
        };
        drop(old_links);
        log::debug!("{}: rebound from segment {}", self.path, index + 1);
        self.notify(true);
    }

    fn notify(self: &Arc<Self>, path_changed: bool) {
        let listeners: Vec<_> = {
            let mut listeners = crate::lock(&self.listeners);
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        let observer = MemberPathObserver { inner: self.clone() };
        for listener in listeners {
            if path_changed {
                listener.on_path_members_changed(&observer);
            }
            listener.on_last_member_changed(&observer);
        }
    }
}

/// A member resolved by the path, with the object it is read on
#[derive(Clone)]
pub struct PathMember {
    pub target: ObjectRc,
    pub member: MemberRc,
    /// The arguments of an indexer
    pub arguments: Vec<Value>,
}

impl std::fmt::Debug for PathMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.member, self.arguments)
    }
}

/// The members a path currently resolves to
#[derive(Debug, Clone)]
pub struct PathMembers {
    root: Option<ObjectRc>,
    members: Vec<PathMember>,
    segments: usize,
    failure: Option<BindingError>,
}

impl PathMembers {
    /// True if every segment of the path is resolved
    pub fn all_members_available(&self) -> bool {
        self.failure.is_none() && self.members.len() == self.segments
    }

    /// The number of segments resolved before the first failure
    pub fn resolved_count(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> &[PathMember] {
        &self.members
    }

    /// The last member, if every segment is resolved
    pub fn last_member(&self) -> Option<&PathMember> {
        self.all_members_available().then(|| self.members.last()).flatten()
    }

    pub fn root(&self) -> Option<&ObjectRc> {
        self.root.as_ref()
    }

    /// Why the path couldn't be resolved completely
    pub fn failure(&self) -> Option<&BindingError> {
        self.failure.as_ref()
    }
}

/// Follows a member path from a root object. See the [module documentation](self).
///
/// Cloning the observer gives another handle to the same observation. The
/// subscriptions are disposed with [`Self::dispose`] or when the last handle is dropped.
#[derive(Clone)]
pub struct MemberPathObserver {
    inner: Arc<Inner>,
}

impl MemberPathObserver {
    /// An observer in the [`ObserverState::Unattached`] state
    pub fn new(
        root: &ObjectRc,
        path: MemberPath,
        manager: Arc<MemberManager>,
    ) -> Result<Self, BindingError> {
        let segments = path.members().iter().map(Segment::parse).collect::<Result<_, _>>()?;
        Ok(Self {
            inner: Arc::new(Inner {
                root: Arc::downgrade(root),
                path,
                segments,
                manager,
                next_link_id: AtomicU64::new(0),
                state: Mutex::new(State {
                    status: ObserverState::Unattached,
                    epoch: 0,
                    links: Vec::new(),
                    failure: None,
                }),
                listeners: Default::default(),
            }),
        })
    }

    /// Create the observer and attach it
    pub fn observe(
        root: &ObjectRc,
        path: MemberPath,
        manager: Arc<MemberManager>,
    ) -> Result<Self, BindingError> {
        let observer = Self::new(root, path, manager)?;
        observer.attach();
        Ok(observer)
    }

    pub fn path(&self) -> &MemberPath {
        &self.inner.path
    }

    pub fn state(&self) -> ObserverState {
        crate::lock(&self.inner.state).status
    }

    /// Resolve the path and subscribe to the changes. Does nothing if already attached.
    pub fn attach(&self) {
        {
            let mut state = crate::lock(&self.inner.state);
            if state.status != ObserverState::Unattached {
                return;
            }
            state.status = ObserverState::Resolving;
        }
        let walk = match self.inner.root.upgrade() {
            Some(root) => self.inner.walk(0, Value::Object(root)),
            None => Walk {
                links: Vec::new(),
                failure: Some(BindingError::TargetUnavailable(self.inner.path.path().into())),
            },
        };
        let mut state = crate::lock(&self.inner.state);
        if state.status != ObserverState::Resolving {
            return;
        }
        state.epoch += 1;
        state.links = walk.links;
        state.status = ObserverState::Attached { complete: walk.failure.is_none() };
        state.failure = walk.failure;
    }

    /// Register a listener. The observer only keeps a weak reference to it.
    pub fn add_listener<L: MemberPathObserverListener + 'static>(&self, listener: &Arc<L>) {
        let listener: Weak<dyn MemberPathObserverListener> = Arc::downgrade(listener) as _;
        crate::lock(&self.inner.listeners).push(listener);
    }

    /// True while the root is alive and the observer isn't disposed
    pub fn is_alive(&self) -> bool {
        self.inner.root.strong_count() > 0 && self.state() != ObserverState::Detached
    }

    /// The members the path currently resolves to.
    ///
    /// With [`ResolutionPolicy::Strict`], a path that can't be resolved completely is
    /// an error. An ambiguous member is an error whatever the policy.
    pub fn get_path_members(&self, policy: ResolutionPolicy) -> Result<PathMembers, BindingError> {
        self.attach();
        let unavailable = || BindingError::TargetUnavailable(self.inner.path.path().into());
        let segments = self.inner.segments.len();
        let root = self.inner.root.upgrade();
        let state = crate::lock(&self.inner.state);
        let (members, failure) = if root.is_none() || state.status == ObserverState::Detached {
            (Vec::new(), Some(unavailable()))
        } else {
            let mut members = Vec::with_capacity(state.links.len());
            let mut failure = state.failure.clone();
            for link in &state.links {
                let Some(target) = link.target.upgrade() else {
                    failure = Some(BindingError::TargetUnavailable(link.member.name().into()));
                    break;
                };
                members.push(PathMember {
                    target,
                    member: link.member.clone(),
                    arguments: link.arguments.clone(),
                });
            }
            (members, failure)
        };
        drop(state);
        match failure {
            Some(e) if policy.is_strict() || matches!(e, BindingError::AmbiguousMatch { .. }) => {
                Err(e)
            }
            failure => Ok(PathMembers { root, members, segments, failure }),
        }
    }

    /// The last member of the path, `None` if the path is only partially resolved
    pub fn get_last_member(
        &self,
        policy: ResolutionPolicy,
    ) -> Result<Option<PathMember>, BindingError> {
        Ok(self.get_path_members(policy)?.last_member().cloned())
    }

    /// The value at the end of the path. The empty path designates the root.
    ///
    /// With [`ResolutionPolicy::Lenient`], a path that can't be resolved or read is null.
    pub fn get_value(&self, policy: ResolutionPolicy) -> Result<Value, BindingError> {
        let members = self.get_path_members(policy)?;
        if self.inner.segments.is_empty() {
            return Ok(Value::from(members.root));
        }
        let Some(last) = members.last_member() else { return Ok(Value::null()) };
        let target = Value::Object(last.target.clone());
        let value = self.inner.manager.get_value(&target, &last.member, &last.arguments);
        match value {
            Err(e) if !policy.is_strict() => {
                log::debug!("{}: {e}", self.inner.path);
                Ok(Value::null())
            }
            value => value,
        }
    }

    /// Write the value at the end of the path
    pub fn set_value(&self, policy: ResolutionPolicy, value: Value) -> Result<(), BindingError> {
        if self.inner.segments.is_empty() {
            return Err(BindingError::NotWritable(self.inner.path.path().into()));
        }
        let members = self.get_path_members(policy)?;
        let Some(last) = members.last_member() else { return Ok(()) };
        let target = Value::Object(last.target.clone());
        self.inner.manager.set_value(&target, &last.member, &last.arguments, value)
    }

    /// Unsubscribe from every change. Can be called several times.
    pub fn dispose(&self) {
        let old_links = {
            let mut state = crate::lock(&self.inner.state);
            if state.status == ObserverState::Detached {
                return;
            }
            state.status = ObserverState::Detached;
            std::mem::take(&mut state.links)
        };
        crate::lock(&self.inner.listeners).clear();
        drop(old_links);
    }
}

impl std::fmt::Debug for MemberPathObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberPathObserver")
            .field("path", &self.inner.path)
            .field("state", &self.state())
            .finish()
    }
}
