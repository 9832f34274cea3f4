// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! The observers of a compiled binding

use i_weave_common::MemberPath;
use i_weave_compiler::expression_tree::{Expression, UnaryOperator};
use i_weave_core::members::MemberManager;
use i_weave_core::{BindingError, MemberPathObserver, MemberPathObserverListener, ObjectRc};
use std::sync::Arc;

/// The member paths read on the binding source, in order of appearance and without duplicates.
///
/// A chain like `A.B[0].C` is a single path. The member paths inside lambdas and
/// method arguments are collected as well, resource keys and relative sources are not.
pub fn collect_member_paths(expr: &Expression) -> Vec<MemberPath> {
    fn collect(expr: &Expression, paths: &mut Vec<MemberPath>) {
        if let Expression::Unary {
            op: UnaryOperator::DynamicExpression | UnaryOperator::StaticExpression,
            ..
        } = expr
        {
            // A resource key, not a member of the source
            return;
        }
        match expr.to_member_path() {
            Some(path) => {
                if !paths.contains(&path) {
                    paths.push(path)
                }
            }
            None => expr.visit(|e| collect(e, paths)),
        }
    }
    let mut paths = Vec::new();
    collect(expr, &mut paths);
    paths
}

struct ChangeNotifier {
    on_change: Box<dyn Fn() + Send + Sync>,
}

impl MemberPathObserverListener for ChangeNotifier {
    fn on_last_member_changed(&self, observer: &MemberPathObserver) {
        log::trace!("binding input {} changed", observer.path());
        (self.on_change)()
    }
}

/// One [`MemberPathObserver`] per member path of a binding, reporting every change
/// of the value at the end of any of these paths.
///
/// Dropping the graph disposes the observers.
pub struct ObserverGraph {
    observers: Vec<MemberPathObserver>,
    // The observers only hold the listener weakly
    _notifier: Arc<ChangeNotifier>,
}

impl ObserverGraph {
    pub fn new(
        source: &ObjectRc,
        paths: impl IntoIterator<Item = MemberPath>,
        manager: Arc<MemberManager>,
        on_change: impl Fn() + Send + Sync + 'static,
    ) -> Result<Self, BindingError> {
        let notifier = Arc::new(ChangeNotifier { on_change: Box::new(on_change) });
        let observers = paths
            .into_iter()
            .map(|path| {
                let observer = MemberPathObserver::observe(source, path, manager.clone())?;
                observer.add_listener(&notifier);
                Ok(observer)
            })
            .collect::<Result<Vec<_>, BindingError>>()?;
        Ok(Self { observers, _notifier: notifier })
    }

    pub fn observers(&self) -> &[MemberPathObserver] {
        &self.observers
    }

    /// False once the source is gone
    pub fn is_alive(&self) -> bool {
        self.observers.iter().all(MemberPathObserver::is_alive)
    }

    /// Stop observing. Can be called several times.
    pub fn dispose(&self) {
        for observer in &self.observers {
            observer.dispose();
        }
    }
}

impl Drop for ObserverGraph {
    fn drop(&mut self) {
        self.dispose();
    }
}
