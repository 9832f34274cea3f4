// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

use std::rc::Rc;

/// Span represent an error location within a binding expression.
///
/// Currently, it is just an offset in byte within the source + the corresponding length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
}

impl Span {
    pub fn is_valid(&self) -> bool {
        self.offset != usize::MAX
    }

    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }
}

impl Default for Span {
    fn default() -> Self {
        Span { offset: usize::MAX, length: 0 }
    }
}

/// Returns a span.  This is implemented for tokens
pub trait Spanned {
    fn span(&self) -> Span;
    fn source_file(&self) -> Option<&SourceFile>;
    fn to_source_location(&self) -> SourceLocation {
        SourceLocation { source_file: self.source_file().cloned(), span: self.span() }
    }
}

#[derive(Default)]
pub struct SourceFileInner {
    /// Where the binding comes from (a view name, a resource key, ...). Only used for display
    name: String,

    /// Complete source code of the binding, used to map from offset to line number
    source: String,

    /// The offset of each linebreak
    line_offsets: std::cell::OnceCell<Vec<usize>>,
}

impl std::fmt::Debug for SourceFileInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.name)
    }
}

impl SourceFileInner {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self { name: name.into(), source: source.into(), line_offsets: Default::default() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns a tuple with the line (starting at 1) and column number (starting at 1)
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        let line_offsets = self.line_offsets();
        line_offsets.binary_search(&offset).map_or_else(
            |line| {
                if line == 0 {
                    (1, offset + 1)
                } else {
                    let line_begin = *line_offsets.get(line - 1).unwrap_or(&0);
                    (line + 1, offset - line_begin + 1)
                }
            },
            |line| (line + 2, 1),
        )
    }

    fn line_offsets(&self) -> &[usize] {
        self.line_offsets.get_or_init(|| {
            self.source
                .bytes()
                .enumerate()
                // Add the offset one past the '\n' into the index: That's the first char
                // of the new line!
                .filter_map(|(i, c)| if c == b'\n' { Some(i + 1) } else { None })
                .collect()
        })
    }
}

pub type SourceFile = Rc<SourceFileInner>;

#[derive(Debug, Clone, Default)]
pub struct SourceLocation {
    pub source_file: Option<SourceFile>,
    pub span: Span,
}

impl Spanned for SourceLocation {
    fn span(&self) -> Span {
        self.span.clone()
    }

    fn source_file(&self) -> Option<&SourceFile> {
        self.source_file.as_ref()
    }
}

/// This enum describes the level or severity of a diagnostic message produced by the compiler.
#[derive(Debug, PartialEq, Copy, Clone, Default)]
#[non_exhaustive]
pub enum DiagnosticLevel {
    /// The diagnostic found is an error that prevents the binding from being created.
    #[default]
    Error,
    /// The diagnostic found is a warning.
    Warning,
}

/// This structure represent a diagnostic emitted while compiling a binding expression.
///
/// It is basically a message, a level (warning or error), attached to a
/// position in the expression
#[derive(Debug, Clone)]
pub struct Diagnostic {
    message: String,
    span: SourceLocation,
    level: DiagnosticLevel,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, span: SourceLocation, level: DiagnosticLevel) -> Self {
        Self { message: message.into(), span, level }
    }

    /// Return the level for this diagnostic
    pub fn level(&self) -> DiagnosticLevel {
        self.level
    }

    /// Return a message for this diagnostic
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The byte offset in the source where the problem was found, if known
    pub fn offset(&self) -> Option<usize> {
        self.span.span.is_valid().then_some(self.span.span.offset)
    }

    /// Returns a tuple with the line (starting at 1) and column number (starting at 1)
    ///
    /// Can also return (0, 0) if the span is invalid
    pub fn line_column(&self) -> (usize, usize) {
        if !self.span.span.is_valid() {
            return (0, 0);
        }
        match &self.span.source_file {
            None => (0, 0),
            Some(sl) => sl.line_column(self.span.span.offset),
        }
    }

    /// Return the length of this diagnostic in UTF-8 encoded bytes.
    pub fn length(&self) -> usize {
        self.span.span.length
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.span.source_file() {
            Some(sf) if self.span.span.is_valid() => {
                let (line, column) = self.line_column();
                if sf.name().is_empty() {
                    write!(f, "{line}:{column}: {}", self.message)
                } else {
                    write!(f, "{}:{line}:{column}: {}", sf.name(), self.message)
                }
            }
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}

#[derive(Default, Debug)]
pub struct BuildDiagnostics {
    inner: Vec<Diagnostic>,
}

impl IntoIterator for BuildDiagnostics {
    type Item = Diagnostic;
    type IntoIter = <Vec<Diagnostic> as IntoIterator>::IntoIter;
    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl BuildDiagnostics {
    pub fn push_diagnostic_with_span(
        &mut self,
        message: String,
        span: SourceLocation,
        level: DiagnosticLevel,
    ) {
        debug_assert!(
            !message.as_str().ends_with('.'),
            "Error message should not end with a period: ({message:?})"
        );
        self.inner.push(Diagnostic { message, span, level });
    }
    /// Push a diagnostic produced by the parser
    pub fn push_compiler_error(&mut self, error: Diagnostic) {
        self.inner.push(error);
    }
    pub fn push_error_with_span(&mut self, message: String, span: SourceLocation) {
        self.push_diagnostic_with_span(message, span, DiagnosticLevel::Error)
    }
    pub fn push_error(&mut self, message: String, source: &dyn Spanned) {
        self.push_error_with_span(message, source.to_source_location());
    }
    pub fn push_warning_with_span(&mut self, message: String, span: SourceLocation) {
        self.push_diagnostic_with_span(message, span, DiagnosticLevel::Warning)
    }
    pub fn push_warning(&mut self, message: String, source: &dyn Spanned) {
        self.push_warning_with_span(message, source.to_source_location());
    }

    /// Return true if there is at least one compilation error
    pub fn has_errors(&self) -> bool {
        self.inner.iter().any(|diag| diag.level == DiagnosticLevel::Error)
    }

    /// Return true if there are no diagnostics (warnings or errors); false otherwise.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn to_string_vec(&self) -> Vec<String> {
        self.inner.iter().map(|d| d.to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.inner.iter()
    }

    /// Returns the first error, if any. Warnings are logged and dropped.
    pub fn into_result(self) -> Result<(), Diagnostic> {
        let mut first_error = None;
        for d in self.inner {
            match d.level {
                DiagnosticLevel::Error if first_error.is_none() => first_error = Some(d),
                DiagnosticLevel::Error => log::debug!("additional binding error: {d}"),
                DiagnosticLevel::Warning => log::warn!("{d}"),
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_file_offset_line_column_mapping() {
        let content = "Text Name,\n  Mode=TwoWay;\nVisible IsVisible\n";
        let sf = SourceFileInner::new("view", content);

        let mut line = 1;
        let mut column = 1;
        for offset in 0..content.len() {
            assert_eq!(sf.line_column(offset), (line, column));
            if content.as_bytes()[offset] == b'\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
    }

    #[test]
    fn display_with_position() {
        let sf = Rc::new(SourceFileInner::new("", "a +\n )"));
        let d = Diagnostic::new(
            "invalid expression",
            SourceLocation { source_file: Some(sf), span: Span::new(5, 1) },
            DiagnosticLevel::Error,
        );
        assert_eq!(d.offset(), Some(5));
        assert_eq!(d.to_string(), "2:2: invalid expression");
    }
}
