// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! The binding expression parser

This module is responsible to parse a string onto an
[`Expression`](crate::expression_tree::Expression).

The core of it is the `DefaultParser` class that holds a list of token and a cursor.
The grammar itself is implemented by the functions of the sub modules, generic over
the [`Parser`] trait.

A parse error is fatal: the parser functions return the first [`Diagnostic`] and
do not try to recover.

*/

use crate::diagnostics::{
    Diagnostic, DiagnosticLevel, SourceFile, SourceFileInner, SourceLocation, Span,
};
use crate::expression_tree::Expression;
use smol_str::SmolStr;
use std::fmt::Display;
use std::rc::Rc;

mod binding;
mod expressions;

pub use binding::{parse_binding_definitions, BindingDefinition, BindingParameter};
pub use expressions::parse_expression;

/// Each parser submodule would simply do `use super::prelude::*` to import typically used items
mod prelude {
    #[cfg(test)]
    pub use super::DefaultParser;
    pub use super::{ParseResult, Parser, SyntaxKind};
    pub use crate::expression_tree::*;
}

pub type ParseResult<T> = Result<T, Diagnostic>;

/// This macro is invoked once, to declare all the token kinds
///
/// Given as `$token:ident -> $rule:expr`. The rule parameter can be either a string literal or
/// a lexer function. The order of tokens is important because the rules will be run in that order
/// and the first one matching will be chosen.
macro_rules! declare_syntax {
    ({
        $($token:ident -> $rule:expr ,)*
     })
    => {
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub enum SyntaxKind {
            Error,
            Eof,

            // Tokens:
            $(
                /// Token
                $token,
            )*
        }

        impl Display for SyntaxKind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$token => {
                        if let Some(character) = <dyn std::any::Any>::downcast_ref::<&str>(& $rule) {
                            return write!(f, "'{}'", character)
                        }
                    })*
                    _ => ()
                }
                write!(f, "{:?}", self)
            }
        }

        /// Returns a pair of the matched token type at the beginning of `text`, and its size
        pub fn lex_next_token(text : &str) -> Option<(usize, SyntaxKind)> {
            use crate::lexer::LexingRule;
            $(
                let len = ($rule).lex(text);
                if len > 0 {
                    return Some((len, SyntaxKind::$token));
                }
            )*
            None
        }
    }
}
declare_syntax! {
    // Tokens.
    // The order of token is important because the rules will be run in that order
    // and the first one matching will be chosen.
    {
        Whitespace -> &crate::lexer::lex_whitespace,
        StringLiteral -> &crate::lexer::lex_string,
        NumberLiteral -> &crate::lexer::lex_number,
        Identifier -> &crate::lexer::lex_identifier,
        DollarDollar -> "$$",
        QuestionQuestion -> "??",
        FatArrow -> "=>",
        EqualEqual -> "==",
        NotEqual -> "!=",
        LessEqual -> "<=",
        GreaterEqual -> ">=",
        OrOr -> "||",
        AndAnd -> "&&",
        LParent -> "(",
        RParent -> ")",
        LBracket -> "[",
        RBracket -> "]",
        LAngle -> "<",
        RAngle -> ">",
        Plus -> "+",
        Minus -> "-",
        Star -> "*",
        Div -> "/",
        Percent -> "%",
        Equal -> "=",
        Colon -> ":",
        Comma -> ",",
        Semicolon -> ";",
        Bang -> "!",
        Dot -> ".",
        Question -> "?",
        Dollar -> "$",
        Hash -> "#",
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub text: SmolStr,
    pub offset: usize,
}

impl Default for Token {
    fn default() -> Self {
        Token { kind: SyntaxKind::Eof, text: Default::default(), offset: 0 }
    }
}

impl Token {
    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }
}

pub trait Parser: Sized {
    /// Same as nth(0)
    fn peek(&mut self) -> Token {
        self.nth(0)
    }
    /// Peek the `n`th token, not including whitespace
    fn nth(&mut self, n: usize) -> Token;
    /// Consume the current token and return it
    fn consume(&mut self) -> Token;
    /// Create an error located at the current token
    fn error(&mut self, e: impl Into<String>) -> Diagnostic;

    /// Consume the token if it has the right kind, otherwise return a syntax error.
    fn expect(&mut self, kind: SyntaxKind) -> ParseResult<Token> {
        if self.nth(0).kind() != kind {
            return Err(self.error(format!("Syntax error: expected {kind}")));
        }
        Ok(self.consume())
    }

    /// If the token if of this type, consume it and return true, otherwise return false
    fn test(&mut self, kind: SyntaxKind) -> bool {
        if self.nth(0).kind() != kind {
            return false;
        }
        self.consume();
        true
    }
}

/// Parser over a lexed binding string.
///
/// Besides the [`Parser`] trait, it exposes a cursor over the source: positions are
/// byte offsets in the source text. [`Self::set_limit`] confines the parser to a
/// sub-range, tokens at or after the limit are seen as the end of the input.
pub struct DefaultParser {
    tokens: Vec<Token>,
    cursor: usize,
    limit: Option<usize>,
    source_file: SourceFile,
}

impl DefaultParser {
    /// Constructor that create a parser from the source code
    pub fn new(source: &str) -> Self {
        Self::with_name("", source)
    }

    /// Same as `new`, the name is used when displaying diagnostics
    pub fn with_name(name: &str, source: &str) -> Self {
        Self {
            tokens: crate::lexer::lex(source),
            cursor: 0,
            limit: None,
            source_file: Rc::new(SourceFileInner::new(name, source)),
        }
    }

    /// Start over with a new source, so that the instance can be reused for another parse.
    pub fn reset(&mut self, source: &str) {
        let name = self.source_file.name().to_owned();
        *self = Self::with_name(&name, source);
    }

    pub fn source_file(&self) -> &SourceFile {
        &self.source_file
    }

    /// Offset of the current token, or [`Self::length`] at the end of the input
    pub fn position(&mut self) -> usize {
        self.consume_ws();
        self.tokens
            .get(self.cursor)
            .filter(|t| !self.is_past_limit(t))
            .map_or_else(|| self.length(), |t| t.offset)
    }

    /// Length of the input, or the limit if one is set
    pub fn length(&self) -> usize {
        let len = self.source_file.source().len();
        self.limit.map_or(len, |limit| limit.min(len))
    }

    /// The token that covers this offset
    pub fn token_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.iter().find(|t| t.offset <= offset && offset < t.offset + t.text.len())
    }

    /// The source text between two offsets
    pub fn value(&self, start: usize, end: usize) -> &str {
        self.source_file.source().get(start..end).unwrap_or_default()
    }

    /// Move the cursor to the first token starting at or after `offset`
    pub fn set_position(&mut self, offset: usize) {
        self.cursor =
            self.tokens.iter().position(|t| t.offset >= offset).unwrap_or(self.tokens.len());
    }

    /// Confine the parser to the input before `limit`, or remove the limit with None.
    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
    }

    fn is_past_limit(&self, token: &Token) -> bool {
        self.limit.is_some_and(|limit| token.offset >= limit)
    }

    fn eof(&self) -> Token {
        Token { offset: self.length(), ..Default::default() }
    }

    fn current_token(&self) -> Token {
        match self.tokens.get(self.cursor) {
            Some(t) if !self.is_past_limit(t) => t.clone(),
            _ => self.eof(),
        }
    }

    /// Consume all the whitespace
    pub fn consume_ws(&mut self) {
        while self.tokens.get(self.cursor).is_some_and(|t| t.kind == SyntaxKind::Whitespace) {
            self.cursor += 1;
        }
    }

    /// Parse a complete expression: anything after the expression is an error
    pub fn parse_expression_to_end(&mut self) -> ParseResult<Expression> {
        let expr = parse_expression(self)?;
        if self.peek().kind() != SyntaxKind::Eof {
            let token = self.peek();
            return Err(self.error(format!("Syntax error: unexpected {}", describe(&token))));
        }
        Ok(expr)
    }
}

impl Parser for DefaultParser {
    /// Peek the `n`th token, not including whitespace
    fn nth(&mut self, mut n: usize) -> Token {
        self.consume_ws();
        let mut c = self.cursor;
        while n > 0 {
            n -= 1;
            c += 1;
            while c < self.tokens.len() && self.tokens[c].kind == SyntaxKind::Whitespace {
                c += 1;
            }
        }
        match self.tokens.get(c) {
            Some(t) if !self.is_past_limit(t) => t.clone(),
            _ => self.eof(),
        }
    }

    /// Consume the current token
    fn consume(&mut self) -> Token {
        self.consume_ws();
        let t = self.current_token();
        if t.kind != SyntaxKind::Eof {
            self.cursor += 1;
        }
        t
    }

    /// Reports an error at the current token location
    fn error(&mut self, e: impl Into<String>) -> Diagnostic {
        self.consume_ws();
        let current_token = self.current_token();
        let span = Span::new(current_token.offset, current_token.text.len());
        Diagnostic::new(
            e,
            SourceLocation { source_file: Some(self.source_file.clone()), span },
            DiagnosticLevel::Error,
        )
    }
}

/// How a token is named in error messages
pub(crate) fn describe(token: &Token) -> String {
    match token.kind {
        SyntaxKind::Eof => "end of input".into(),
        SyntaxKind::Error => format!("character '{}'", token.text),
        SyntaxKind::Identifier | SyntaxKind::NumberLiteral | SyntaxKind::StringLiteral => {
            format!("{} '{}'", token.kind, token.text)
        }
        kind => kind.to_string(),
    }
}

/// Parse a binding expression
pub fn parse(source: &str) -> ParseResult<Expression> {
    DefaultParser::new(source).parse_expression_to_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor() {
        let mut p = DefaultParser::new("  Foo.Bar ; Baz");
        assert_eq!(p.position(), 2);
        assert_eq!(p.length(), 15);
        assert_eq!(p.token_at(4).map(|t| t.as_str()), Some("Foo"));
        assert_eq!(p.value(2, 9), "Foo.Bar");

        p.set_limit(Some(10));
        assert_eq!(p.length(), 10);
        assert_eq!(p.consume().as_str(), "Foo");
        assert_eq!(p.consume().as_str(), ".");
        assert_eq!(p.consume().as_str(), "Bar");
        assert_eq!(p.peek().kind(), SyntaxKind::Eof);
        assert_eq!(p.position(), 10);

        p.set_limit(None);
        p.set_position(11);
        assert_eq!(p.peek().as_str(), "Baz");
        assert_eq!(p.position(), 12);
    }

    #[test]
    fn reuse_after_reset() {
        let mut p = DefaultParser::new("A + B");
        let first = p.parse_expression_to_end().unwrap();
        p.reset("A + B");
        assert_eq!(p.parse_expression_to_end().unwrap(), first);
        p.set_position(4);
        assert_eq!(p.parse_expression_to_end().unwrap(), Expression::member(None, "B"));
    }

    #[test]
    fn trailing_garbage() {
        let err = parse("A B").unwrap_err();
        assert_eq!(err.offset(), Some(2));
        assert_eq!(err.message(), "Syntax error: unexpected Identifier 'B'");
    }
}
