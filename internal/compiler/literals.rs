// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

use i_weave_common::Literal;
use smol_str::{SmolStr, format_smolstr};

/// Unescape a string literal delimited by `"` or `'`.
///
/// Returns None if the literal is not properly delimited or contains an invalid escape.
pub fn unescape_string(string: &str) -> Option<SmolStr> {
    let quote = string.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let string = string.strip_prefix(quote)?.strip_suffix(quote)?;
    if !string.contains('\\') {
        return Some(string.into());
    }
    let mut result = String::with_capacity(string.len());
    let mut pos = 0;
    loop {
        let stop = match string[pos..].find('\\') {
            Some(stop) => pos + stop,
            None => {
                result += &string[pos..];
                return Some(result.into());
            }
        };
        if stop + 1 >= string.len() {
            return None;
        }
        result += &string[pos..stop];
        pos = stop + 2;
        match string.as_bytes()[stop + 1] {
            b'"' => result += "\"",
            b'\'' => result += "'",
            b'\\' => result += "\\",
            b'n' => result += "\n",
            b'r' => result += "\r",
            b't' => result += "\t",
            b'0' => result += "\0",
            b'u' => {
                if string.as_bytes().get(pos)? != &b'{' {
                    return None;
                }
                let end = string[pos..].find('}')? + pos;
                let x = u32::from_str_radix(&string[pos + 1..end], 16).ok()?;
                result.push(std::char::from_u32(x)?);
                pos = end + 1;
            }
            _ => return None,
        }
    }
}

#[test]
fn test_unescape_string() {
    assert_eq!(unescape_string(r#""foo_bar""#), Some("foo_bar".into()));
    assert_eq!(unescape_string(r#"'foo_bar'"#), Some("foo_bar".into()));
    assert_eq!(unescape_string(r#"'it\'s'"#), Some("it's".into()));
    assert_eq!(unescape_string(r#""foo\"bar""#), Some("foo\"bar".into()));
    assert_eq!(unescape_string(r#""foo\\\"bar""#), Some("foo\\\"bar".into()));
    assert_eq!(unescape_string(r#""fo\na\\r\t""#), Some("fo\na\\r\t".into()));
    assert_eq!(unescape_string(r#""fo\xa""#), None);
    assert_eq!(unescape_string(r#""fooo\""#), None);
    assert_eq!(unescape_string(r#""music\"♪\"🎝""#), Some("music\"♪\"🎝".into()));
    assert_eq!(unescape_string(r#""foo_bar"#), None);
    assert_eq!(unescape_string(r#""foo_bar'"#), None);
    assert_eq!(unescape_string(r#"foo_bar""#), None);
    assert_eq!(unescape_string(r#""d\u{8}a\u{d4}f\u{Ed3}""#), Some("d\u{8}a\u{d4}f\u{ED3}".into()));
    assert_eq!(unescape_string(r#""xxx\u""#), None);
    assert_eq!(unescape_string(r#""xxx\u{qsdf}""#), None);
}

const VALID_SUFFIXES: &str = "f, d, m, L, u, UL";

/// Parse a number literal with its optional type suffix.
///
/// Without suffix, integers get the smallest of `int`, `uint`, `long`, `ulong` that
/// holds the value, and numbers with a fractional part or an exponent are `double`.
pub fn parse_number_literal(s: &str) -> Result<Literal, SmolStr> {
    let bytes = s.as_bytes();
    let mut end = 0;
    while end < bytes.len() && matches!(bytes[end], b'0'..=b'9' | b'.') {
        end += 1;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E'))
        && bytes[end + 1..]
            .iter()
            .find(|c| !matches!(**c, b'+' | b'-'))
            .is_some_and(u8::is_ascii_digit)
    {
        end += 1;
        while end < bytes.len() && matches!(bytes[end], b'0'..=b'9' | b'+' | b'-') {
            end += 1;
        }
    }
    let (number, suffix) = s.split_at(end);
    let is_integer = !number.contains(['.', 'e', 'E']);
    let cannot_parse = || SmolStr::new_static("Cannot parse number literal");
    let float = || number.parse::<f64>().map_err(|_| cannot_parse());
    let integer = || {
        if !is_integer {
            return Err(cannot_parse());
        }
        number.parse::<u64>().map_err(|_| cannot_parse())
    };

    Ok(match suffix.to_ascii_lowercase().as_str() {
        "" if is_integer => {
            let v = integer()?;
            if let Ok(v) = i32::try_from(v) {
                Literal::Int32(v)
            } else if let Ok(v) = u32::try_from(v) {
                Literal::UInt32(v)
            } else if let Ok(v) = i64::try_from(v) {
                Literal::Int64(v)
            } else {
                Literal::UInt64(v)
            }
        }
        "" | "d" => Literal::Float64(float()?),
        "f" => Literal::Float32(float()? as f32),
        "m" => Literal::Decimal(float()?),
        "l" => Literal::Int64(i64::try_from(integer()?).map_err(|_| cannot_parse())?),
        "u" => {
            let v = integer()?;
            u32::try_from(v).map_or(Literal::UInt64(v), Literal::UInt32)
        }
        "ul" | "lu" => Literal::UInt64(integer()?),
        _ => {
            return Err(format_smolstr!(
                "Invalid suffix '{suffix}'. Valid suffixes are: {VALID_SUFFIXES}"
            ));
        }
    })
}

#[test]
fn test_parse_number_literal() {
    assert_eq!(parse_number_literal("10"), Ok(Literal::Int32(10)));
    assert_eq!(parse_number_literal("3000000000"), Ok(Literal::UInt32(3_000_000_000)));
    assert_eq!(parse_number_literal("10000000000"), Ok(Literal::Int64(10_000_000_000)));
    assert_eq!(parse_number_literal("10.5"), Ok(Literal::Float64(10.5)));
    assert_eq!(parse_number_literal("1e3"), Ok(Literal::Float64(1000.)));
    assert_eq!(parse_number_literal("2.5e-1f"), Ok(Literal::Float32(0.25)));
    assert_eq!(parse_number_literal("1.5F"), Ok(Literal::Float32(1.5)));
    assert_eq!(parse_number_literal("7d"), Ok(Literal::Float64(7.)));
    assert_eq!(parse_number_literal("7.25m"), Ok(Literal::Decimal(7.25)));
    assert_eq!(parse_number_literal("7L"), Ok(Literal::Int64(7)));
    assert_eq!(parse_number_literal("7u"), Ok(Literal::UInt32(7)));
    assert_eq!(parse_number_literal("7UL"), Ok(Literal::UInt64(7)));

    let cannot_parse = Err(SmolStr::new_static("Cannot parse number literal"));
    assert_eq!(parse_number_literal("12.10.12"), cannot_parse);
    assert_eq!(parse_number_literal("1.5L"), cannot_parse);
    assert_eq!(
        parse_number_literal("12px"),
        Err(format_smolstr!("Invalid suffix 'px'. Valid suffixes are: {VALID_SUFFIXES}"))
    );
}
