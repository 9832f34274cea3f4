// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*!
# Weave

Weave compiles binding expressions, such as `Items[0].Name` or
`Title + ' (' + Count + ')'`, and evaluates them against live object graphs. A
compiled binding observes every member path it reads, and reports each change so
that the target can be updated.

```
use weave::{BindingCompiler, DynamicObject, ObjectRc, TypeDescriptor, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

let person = DynamicObject::with_values(
    TypeDescriptor::builder("Person").dynamic().build(),
    [("FirstName", Value::from("Ada")), ("LastName", Value::from("Lovelace"))],
);
let source: ObjectRc = person.clone();

let binding = BindingCompiler::new().compile("FirstName + ' ' + LastName").unwrap();
assert_eq!(binding.evaluate(&source).unwrap(), Value::from("Ada Lovelace"));

let changes = Arc::new(AtomicUsize::new(0));
let counter = changes.clone();
let _observers = binding
    .observe(&source, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
person.set("LastName", "Byron");
assert_eq!(changes.load(Ordering::SeqCst), 1);
assert_eq!(binding.evaluate(&source).unwrap(), Value::from("Ada Byron"));
```

Bindings can also be built from native expression trees with
[`BindingCompiler::compile_native`], and from binding definitions like
`Text Name, Mode=TwoWay` with [`BindingCompiler::compile_definitions`].

Members are found by a [`MemberManager`]: types declared with [`TypeDescriptor`],
members attached by the host, extension methods, and the members of dynamic
objects.
*/

#![deny(unsafe_code)]

mod evaluator;
mod observer_graph;

use i_weave_compiler::diagnostics::{BuildDiagnostics, Diagnostic, SourceLocation};
use i_weave_compiler::expression_tree::Expression;
use i_weave_compiler::native::NativeExpressionRc;
use i_weave_compiler::native_converter::{ConversionError, NativeConverter};
use i_weave_compiler::{CompilerConfiguration, passes};
use std::sync::Arc;

pub use evaluator::{BindingContext, EmptyContext, Evaluator, INVOKE_METHOD, LambdaObject};
pub use i_weave_common::{Literal, LiteralType, MemberFlags, MemberKind, MemberPath};
pub use i_weave_compiler::expression_tree::RelativeSourceKind;
pub use i_weave_core::members::{MemberManager, MemberRequest};
pub use i_weave_core::rtti::{MemberDeclaration, Type, TypeDescriptor, TypeRc, TypeRegistry};
pub use i_weave_core::{
    BindingError, DynamicObject, ListObject, MemberPathObserver, MemberPathObserverListener, Object,
    ObjectRc, ObjectWeak, ObserverState, ResolutionPolicy, Value,
};
pub use observer_graph::{ObserverGraph, collect_member_paths};

/// This module contains the compiler data structures, for the tools that inspect
/// or build binding expressions.
pub mod compiler {
    pub use i_weave_compiler::diagnostics::{BuildDiagnostics, Diagnostic, DiagnosticLevel};
    pub use i_weave_compiler::expression_tree::*;
    pub use i_weave_compiler::native::*;
    pub use i_weave_compiler::parser::{BindingDefinition, BindingParameter};
    pub use i_weave_compiler::passes::binding_macros::BindingMacroTable;
    pub use i_weave_compiler::CompilerConfiguration;
}

#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The binding doesn't compile
    #[error("{0}")]
    Compile(#[from] Diagnostic),
    /// The native expression tree can't be expressed as a binding
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    /// A member can't be resolved, read or written
    #[error(transparent)]
    Binding(#[from] BindingError),
}

/// Compiles bindings that resolve their members with a [`MemberManager`] and reach
/// resources and relative sources through a [`BindingContext`]
pub struct BindingCompiler {
    config: CompilerConfiguration,
    manager: Arc<MemberManager>,
    context: Arc<dyn BindingContext>,
}

impl Default for BindingCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingCompiler {
    /// A compiler using [`MemberManager::global`], without context
    pub fn new() -> Self {
        Self {
            config: CompilerConfiguration::new(),
            manager: MemberManager::global(),
            context: Arc::new(EmptyContext),
        }
    }

    pub fn with_member_manager(mut self, manager: Arc<MemberManager>) -> Self {
        self.manager = manager;
        self
    }

    pub fn with_context(mut self, context: Arc<dyn BindingContext>) -> Self {
        self.context = context;
        self
    }

    pub fn configuration(&self) -> &CompilerConfiguration {
        &self.config
    }

    pub fn configuration_mut(&mut self) -> &mut CompilerConfiguration {
        &mut self.config
    }

    fn binding(&self, expression: Expression) -> CompiledBinding {
        CompiledBinding {
            paths: collect_member_paths(&expression),
            expression,
            evaluator: Evaluator::new(self.manager.clone(), self.context.clone()),
        }
    }

    /// Compile a binding expression
    pub fn compile(&self, source: &str) -> Result<CompiledBinding, Error> {
        let (expression, diagnostics) =
            i_weave_compiler::compile_expression(source, "", &self.config);
        diagnostics.into_result()?;
        let expression = expression.ok_or_else(|| {
            BindingError::Evaluation(format!("'{source}' is not a binding expression"))
        })?;
        Ok(self.binding(expression))
    }

    /// Compile a native expression tree
    pub fn compile_native(&self, native: &NativeExpressionRc) -> Result<CompiledBinding, Error> {
        let converter = NativeConverter::new(self.config.binding_macros.clone());
        let expression = converter.convert(native)?;
        let mut diagnostics = BuildDiagnostics::default();
        let location = SourceLocation::default();
        let expression = passes::run_passes(expression, &self.config, &location, &mut diagnostics);
        diagnostics.into_result()?;
        Ok(self.binding(expression))
    }

    /// Compile binding definitions such as `Text Name, Mode=TwoWay; Visible IsVisible`
    pub fn compile_definitions(&self, source: &str) -> Result<Vec<CompiledDefinition>, Error> {
        let (definitions, diagnostics) =
            i_weave_compiler::compile_binding_definitions(source, &self.config);
        diagnostics.into_result()?;
        definitions
            .into_iter()
            .map(|definition| {
                let target = definition.target.to_member_path().ok_or_else(|| {
                    BindingError::Evaluation(format!(
                        "The target of a binding must be a member path, not '{}'",
                        definition.target
                    ))
                })?;
                Ok(CompiledDefinition {
                    target,
                    source: definition.source.map(|e| self.binding(e)),
                    parameters: definition
                        .parameters
                        .into_iter()
                        .map(|p| (p.name, self.binding(p.value)))
                        .collect(),
                })
            })
            .collect()
    }
}

/// A compiled binding expression
#[derive(Clone)]
pub struct CompiledBinding {
    expression: Expression,
    paths: Vec<MemberPath>,
    evaluator: Evaluator,
}

impl CompiledBinding {
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// The member paths the value depends on
    pub fn member_paths(&self) -> &[MemberPath] {
        &self.paths
    }

    /// Evaluate the binding on `source`. Every member must be resolved.
    pub fn evaluate(&self, source: &ObjectRc) -> Result<Value, Error> {
        Ok(self.evaluator.evaluate(&self.expression, &Value::Object(source.clone()))?)
    }

    /// Evaluate with `policy`: with [`ResolutionPolicy::Lenient`], a member that can't be
    /// resolved reads as null
    pub fn evaluate_with_policy(
        &self,
        source: &Value,
        policy: ResolutionPolicy,
    ) -> Result<Value, Error> {
        let evaluator = self.evaluator.clone().with_policy(policy);
        Ok(evaluator.evaluate(&self.expression, source)?)
    }

    /// Observe the member paths of the binding on `source`. `on_change` is called once
    /// for each change of a value the binding reads.
    pub fn observe(
        &self,
        source: &ObjectRc,
        on_change: impl Fn() + Send + Sync + 'static,
    ) -> Result<ObserverGraph, Error> {
        Ok(ObserverGraph::new(
            source,
            self.paths.iter().cloned(),
            self.evaluator.member_manager().clone(),
            on_change,
        )?)
    }
}

impl std::fmt::Debug for CompiledBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CompiledBinding({})", self.expression)
    }
}

/// A binding definition whose source and parameters are compiled
#[derive(Debug, Clone)]
pub struct CompiledDefinition {
    /// The member of the target that receives the value
    pub target: MemberPath,
    /// `None` binds the source itself
    pub source: Option<CompiledBinding>,
    pub parameters: Vec<(smol_str::SmolStr, CompiledBinding)>,
}

impl CompiledDefinition {
    pub fn parameter(&self, name: &str) -> Option<&CompiledBinding> {
        self.parameters.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }
}
