// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! This test compiles every line of the *.bind files in the sub directories as a
//! binding expression and checks that compilation errors are properly reported
//!
//! Lines starting with `//` and empty lines are skipped. The lines following an
//! expression can carry annotations like this:
//! ```ignore
//! Person.Name +
//!              ^error{some_regexp}
//! ```
//!
//! Meaning that compiling the expression above must report an error matching the
//! regular expression, at the column pointed by the caret.
//! `^warning{regexp}` is also supported.

use i_weave_compiler::diagnostics::{Diagnostic, DiagnosticLevel};
use std::path::{Path, PathBuf};

#[test]
fn syntax_tests() -> std::io::Result<()> {
    use rayon::prelude::*;

    let mut test_entries = Vec::new();
    for entry in std::fs::read_dir(format!("{}/tests/syntax", env!("CARGO_MANIFEST_DIR")))? {
        let entry = entry?;
        if entry.file_type().is_ok_and(|f| f.is_dir()) {
            for test_entry in entry.path().read_dir()? {
                let path = test_entry?.path();
                if path.extension().is_some_and(|ext| ext == "bind") {
                    test_entries.push(path);
                }
            }
        }
    }
    assert!(!test_entries.is_empty());

    let success = test_entries
        .par_iter()
        .try_fold(
            || true,
            |mut success, path| {
                success &= process_file(path)?;
                Ok::<bool, std::io::Error>(success)
            },
        )
        .try_reduce(|| true, |success, result| Ok(success & result))?;

    assert!(success);

    Ok(())
}

struct PendingExpression {
    line: usize,
    diagnostics: Vec<Diagnostic>,
}

fn process_file(path: &Path) -> std::io::Result<bool> {
    let source = std::fs::read_to_string(path)?;
    let path = canonical(path);
    let annotation = regex::Regex::new(r"^( *)\^(error|warning)\{(.*)\}\s*$").unwrap();
    let config = i_weave_compiler::CompilerConfiguration::new();

    let mut success = true;
    let mut pending: Option<PendingExpression> = None;
    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        if let Some(m) = annotation.captures(line) {
            let Some(expression) = pending.as_mut() else {
                println!("{path:?}:{line_number}: annotation without an expression");
                success = false;
                continue;
            };
            let column = m.get(1).unwrap().as_str().len() + 1;
            let level = match m.get(2).unwrap().as_str() {
                "warning" => DiagnosticLevel::Warning,
                _ => DiagnosticLevel::Error,
            };
            let rx = m.get(3).unwrap().as_str();
            let r = match regex::Regex::new(rx) {
                Err(e) => {
                    eprintln!("{path:?}: Invalid regexp {rx:?} : {e:?}");
                    return Ok(false);
                }
                Ok(r) => r,
            };
            match expression.diagnostics.iter().position(|d| {
                d.line_column().1 == column && r.is_match(d.message()) && d.level() == level
            }) {
                Some(idx) => {
                    expression.diagnostics.remove(idx);
                }
                None => {
                    success = false;
                    println!(
                        "{path:?}:{}: {level:?} not found at column {column}: {rx:?}, got {:#?}",
                        expression.line, expression.diagnostics
                    );
                }
            }
            continue;
        }

        success &= check_no_unexpected(&path, pending.take());
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        let (_, diagnostics) = i_weave_compiler::compile_expression(line, "", &config);
        let diagnostics = diagnostics.into_iter().collect();
        pending = Some(PendingExpression { line: line_number, diagnostics });
    }
    success &= check_no_unexpected(&path, pending.take());
    Ok(success)
}

fn check_no_unexpected(path: &Path, pending: Option<PendingExpression>) -> bool {
    match pending {
        Some(expression) if !expression.diagnostics.is_empty() => {
            println!(
                "{path:?}:{}: Unexpected errors/warnings: {:#?}",
                expression.line, expression.diagnostics
            );
            false
        }
        _ => true,
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_owned())
}
