// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! This module contains the code for the lexer.
//!
//! The token rules are declared by the macro in parser.rs, which also implements
//! `lex_next_token` on top of this module

/// This trait is used by the `crate::parser::lex_next_token` function and is implemented
/// for rule passed to the macro which can be either a string literal, or a function
pub trait LexingRule {
    /// Return the size of the match for this rule, or 0 if there is no match
    fn lex(&self, text: &str) -> usize;
}

impl LexingRule for &str {
    #[inline]
    fn lex(&self, text: &str) -> usize {
        if text.starts_with(*self) { self.len() } else { 0 }
    }
}

impl<F: Fn(&str) -> usize> LexingRule for F {
    #[inline]
    fn lex(&self, text: &str) -> usize {
        (self)(text)
    }
}

pub fn lex_whitespace(text: &str) -> usize {
    let mut len = 0;
    let chars = text.chars();
    for c in chars {
        if !c.is_whitespace() {
            break;
        }
        len += c.len_utf8();
    }
    len
}

/// Strings are delimited by `"` or `'`, the other quote may appear unescaped inside
pub fn lex_string(text: &str) -> usize {
    let quote = match text.as_bytes().first() {
        Some(q @ (b'"' | b'\'')) => *q as char,
        _ => return 0,
    };
    let text_len = text.len();
    let mut end = 1; // skip the quote
    loop {
        let stop = match text[end..].find([quote, '\\']) {
            Some(stop) => end + stop,
            // Unterminated, the parser reports the error token
            None => return 0,
        };
        if text.as_bytes()[stop] == b'\\' {
            if text_len <= stop + 1 {
                return 0;
            }
            end = stop + 1 + text[stop + 1..].chars().next().map_or(0, |c| c.len_utf8());
        } else {
            return stop + 1;
        }
    }
}

/// Numbers: `12`, `1.5`, `2e10`, followed by an optional type suffix such as `f` or `UL`.
/// The suffix is validated by `literals::parse_number_literal`.
pub fn lex_number(text: &str) -> usize {
    let bytes = text.as_bytes();
    let digits = |from: usize| bytes[from..].iter().take_while(|c| c.is_ascii_digit()).count();
    let mut len = digits(0);
    if len == 0 {
        return 0;
    }
    // `1.Foo` is a member access on `1`, only consume the period when a digit follows
    if bytes.get(len) == Some(&b'.') && bytes.get(len + 1).is_some_and(|c| c.is_ascii_digit()) {
        len += 1 + digits(len + 1);
    }
    if matches!(bytes.get(len), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(len + 1), Some(b'+' | b'-')));
        let exponent = digits(len + 1 + sign);
        if exponent > 0 {
            len += 1 + sign + exponent;
        }
    }
    len + bytes[len..].iter().take_while(|c| c.is_ascii_alphabetic()).count()
}

pub fn lex_identifier(text: &str) -> usize {
    let mut len = 0;
    let chars = text.chars();
    for c in chars {
        if !c.is_alphanumeric() && c != '_' {
            break;
        }
        if len == 0 && c.is_ascii_digit() {
            return 0;
        }
        len += c.len_utf8();
    }
    len
}

pub fn lex(mut source: &str) -> Vec<crate::parser::Token> {
    let mut result = vec![];
    let mut offset = 0;
    while !source.is_empty() {
        if let Some((len, kind)) = crate::parser::lex_next_token(source) {
            result.push(crate::parser::Token { kind, text: source[..len].into(), offset });
            offset += len;
            source = &source[len..];
        } else {
            result.push(crate::parser::Token {
                kind: crate::parser::SyntaxKind::Error,
                text: source.chars().next().map(|c| c.to_string()).unwrap_or_default().into(),
                offset,
            });
            break;
        }
    }
    result
}

#[test]
fn basic_lexer_test() {
    use crate::parser::SyntaxKind;
    fn compare(source: &str, expected: &[(SyntaxKind, &str)]) {
        let actual = lex(source);
        let actual =
            actual.iter().map(|token| (token.kind, token.text.as_str())).collect::<Vec<_>>();
        assert_eq!(actual.as_slice(), expected);
    }

    compare(
        r#"45  "string" 'str"ing'"#,
        &[
            (SyntaxKind::NumberLiteral, "45"),
            (SyntaxKind::Whitespace, "  "),
            (SyntaxKind::StringLiteral, r#""string""#),
            (SyntaxKind::Whitespace, " "),
            (SyntaxKind::StringLiteral, r#"'str"ing'"#),
        ],
    );

    compare(
        "12f+5.2m-1UL*2e3",
        &[
            (SyntaxKind::NumberLiteral, "12f"),
            (SyntaxKind::Plus, "+"),
            (SyntaxKind::NumberLiteral, "5.2m"),
            (SyntaxKind::Minus, "-"),
            (SyntaxKind::NumberLiteral, "1UL"),
            (SyntaxKind::Star, "*"),
            (SyntaxKind::NumberLiteral, "2e3"),
        ],
    );
    compare(
        "aa_a.b1,c",
        &[
            (SyntaxKind::Identifier, "aa_a"),
            (SyntaxKind::Dot, "."),
            (SyntaxKind::Identifier, "b1"),
            (SyntaxKind::Comma, ","),
            (SyntaxKind::Identifier, "c"),
        ],
    );
    compare(
        "a??b=>c==d=e$$f",
        &[
            (SyntaxKind::Identifier, "a"),
            (SyntaxKind::QuestionQuestion, "??"),
            (SyntaxKind::Identifier, "b"),
            (SyntaxKind::FatArrow, "=>"),
            (SyntaxKind::Identifier, "c"),
            (SyntaxKind::EqualEqual, "=="),
            (SyntaxKind::Identifier, "d"),
            (SyntaxKind::Equal, "="),
            (SyntaxKind::Identifier, "e"),
            (SyntaxKind::DollarDollar, "$$"),
            (SyntaxKind::Identifier, "f"),
        ],
    );
    compare(
        "1.ToString()",
        &[
            (SyntaxKind::NumberLiteral, "1"),
            (SyntaxKind::Dot, "."),
            (SyntaxKind::Identifier, "ToString"),
            (SyntaxKind::LParent, "("),
            (SyntaxKind::RParent, ")"),
        ],
    );
    compare(r#"a"\"\\"x"#, &[
        (SyntaxKind::Identifier, "a"),
        (SyntaxKind::StringLiteral, r#""\"\\""#),
        (SyntaxKind::Identifier, "x"),
    ]);
    compare("a @b", &[
        (SyntaxKind::Identifier, "a"),
        (SyntaxKind::Whitespace, " "),
        (SyntaxKind::Error, "@"),
    ]);

    // Unterminated strings
    compare(r#""\"#, &[(SyntaxKind::Error, "\"")]);
    compare("'abc", &[(SyntaxKind::Error, "'")]);
}
