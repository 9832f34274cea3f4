// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! The Weave binding expression compiler.

Binding expressions come either as text, parsed by [`parser`], or as native
expression trees built by the host, converted by [`native_converter`]. Both end
up as an [`expression_tree::Expression`] that [`passes`] then simplify and check.

**NOTE**: This crate is an internal crate of the Weave project.
It should not be used directly by applications.
*/

#![deny(unsafe_code)]

use std::rc::Rc;

pub mod diagnostics;
pub mod expression_tree;
pub mod lexer;
pub mod literals;
pub mod native;
pub mod native_converter;
pub mod parser;
pub mod passes;

use crate::diagnostics::{BuildDiagnostics, SourceLocation, Span};
use crate::expression_tree::Expression;
use crate::native::NativeExpressionRc;
use crate::native_converter::NativeConverter;
use crate::parser::{BindingDefinition, DefaultParser};
use crate::passes::binding_macros::BindingMacroTable;

#[derive(Clone, Debug)]
pub struct CompilerConfiguration {
    /// Fold constant sub-expressions
    pub const_propagation: bool,

    /// Accept lambda expressions such as `Items.Where(x => x.Visible)`
    pub allow_lambdas: bool,

    /// The macros expanded during parsing and native conversion
    pub binding_macros: Rc<BindingMacroTable>,
}

impl CompilerConfiguration {
    pub fn new() -> Self {
        let const_propagation = match std::env::var("WEAVE_CONST_PROPAGATION") {
            Ok(var) => var.parse::<bool>().unwrap_or_else(|_| {
                panic!(
                    "WEAVE_CONST_PROPAGATION has incorrect value. Must be either unset, 'true' or 'false'"
                )
            }),
            Err(_) => true,
        };

        let allow_lambdas = match std::env::var("WEAVE_ALLOW_LAMBDA") {
            Ok(var) => var.parse::<bool>().unwrap_or_else(|_| {
                panic!(
                    "WEAVE_ALLOW_LAMBDA has incorrect value. Must be either unset, 'true' or 'false'"
                )
            }),
            Err(_) => true,
        };

        Self {
            const_propagation,
            allow_lambdas,
            binding_macros: Rc::new(BindingMacroTable::with_builtins()),
        }
    }
}

impl Default for CompilerConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

fn whole_source(parser: &DefaultParser, source: &str) -> SourceLocation {
    SourceLocation {
        source_file: Some(parser.source_file().clone()),
        span: Span::new(0, source.len()),
    }
}

/// Parse and check a binding expression.
///
/// `name` tells where the binding comes from, it prefixes the diagnostics.
pub fn compile_expression(
    source: &str,
    name: &str,
    config: &CompilerConfiguration,
) -> (Option<Expression>, BuildDiagnostics) {
    let mut diagnostics = BuildDiagnostics::default();
    let mut parser = DefaultParser::with_name(name, source);
    let expr = match parser.parse_expression_to_end() {
        Ok(expr) => expr,
        Err(err) => {
            diagnostics.push_compiler_error(err);
            return (None, diagnostics);
        }
    };
    let location = whole_source(&parser, source);
    let expr = passes::run_passes(expr, config, &location, &mut diagnostics);
    let expr = (!diagnostics.has_errors()).then_some(expr);
    (expr, diagnostics)
}

/// Parse and check a list of binding definitions
/// such as `Text Name, Mode=OneWay; Visible IsVisible`
pub fn compile_binding_definitions(
    source: &str,
    config: &CompilerConfiguration,
) -> (Vec<BindingDefinition>, BuildDiagnostics) {
    let mut diagnostics = BuildDiagnostics::default();
    let definitions = match parser::parse_binding_definitions(source) {
        Ok(definitions) => definitions,
        Err(err) => {
            diagnostics.push_compiler_error(err);
            return (Vec::new(), diagnostics);
        }
    };
    let location = whole_source(&DefaultParser::new(source), source);
    let definitions = definitions
        .into_iter()
        .map(|mut definition| {
            definition.source = definition
                .source
                .map(|e| passes::run_passes(e, config, &location, &mut diagnostics));
            for parameter in &mut definition.parameters {
                let value = std::mem::take(&mut parameter.value);
                parameter.value = passes::run_passes(value, config, &location, &mut diagnostics);
            }
            definition
        })
        .collect();
    (definitions, diagnostics)
}

/// Convert and check a native expression tree, see [`native_converter`]
pub fn compile_native_expression(
    native: &NativeExpressionRc,
    config: &CompilerConfiguration,
) -> (Option<Expression>, BuildDiagnostics) {
    let mut diagnostics = BuildDiagnostics::default();
    let converter = NativeConverter::new(config.binding_macros.clone());
    let expr = match converter.convert(native) {
        Ok(expr) => expr,
        Err(err) => {
            diagnostics.push_error_with_span(err.to_string(), SourceLocation::default());
            return (None, diagnostics);
        }
    };
    let expr = passes::run_passes(expr, config, &SourceLocation::default(), &mut diagnostics);
    let expr = (!diagnostics.has_errors()).then_some(expr);
    (expr, diagnostics)
}
