// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

pub mod binding_macros;
mod check_expressions;
mod const_propagation;

use crate::diagnostics::{BuildDiagnostics, SourceLocation};
use crate::expression_tree::Expression;
use crate::CompilerConfiguration;

pub use const_propagation::{fold_binary, fold_unary, DEFAULT_METHOD};

/// Run the passes on a parsed or converted binding expression
pub fn run_passes(
    expr: Expression,
    config: &CompilerConfiguration,
    location: &SourceLocation,
    diag: &mut BuildDiagnostics,
) -> Expression {
    let mut expr = binding_macros::expand_binding_macros(expr, &config.binding_macros);
    if config.const_propagation {
        const_propagation::const_propagation(&mut expr);
    }
    check_expressions::check_expressions(&expr, config.allow_lambdas, location, diag);
    expr
}
