// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

//! Binding definitions: `Text Name, Mode=TwoWay; Visible=IsVisible`

use super::expressions::parse_expression;
use super::prelude::*;
use super::{DefaultParser, describe};
use smol_str::SmolStr;

/// A `Name=Value` part of a binding definition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingParameter {
    pub name: SmolStr,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingDefinition {
    /// The member of the target that receives the value
    pub target: Expression,
    /// None when the definition binds to the source itself
    pub source: Option<Expression>,
    pub parameters: Vec<BindingParameter>,
}

impl BindingDefinition {
    pub fn parameter(&self, name: &str) -> Option<&Expression> {
        self.parameters.iter().find(|p| p.name == name).map(|p| &p.value)
    }
}

/// Parse a list of definitions separated by `;`.
///
/// ```text
/// Text Name
/// Text=Path.ToName, Converter=Foo
/// Text Name, Mode=TwoWay; Visible IsVisible
/// Text (FirstName + ' ' + LastName), Fallback='?'
/// Text
/// ```
pub fn parse_binding_definitions(source: &str) -> ParseResult<Vec<BindingDefinition>> {
    let mut p = DefaultParser::new(source);
    let mut definitions = vec![];
    loop {
        if p.peek().kind() == SyntaxKind::Eof {
            break;
        }
        let end = find_definition_end(&mut p);
        p.set_limit(Some(end));
        definitions.push(parse_binding_definition(&mut p)?);
        if p.peek().kind() != SyntaxKind::Eof {
            let token = p.peek();
            return Err(p.error(format!("Syntax error: unexpected {}", describe(&token))));
        }
        p.set_limit(None);
        p.set_position(end);
        if !p.test(SyntaxKind::Semicolon) {
            break;
        }
    }
    Ok(definitions)
}

/// Offset of the `;` that ends the definition at the cursor, or the end of the input
fn find_definition_end(p: &mut DefaultParser) -> usize {
    let mut depth = 0usize;
    let mut i = 0;
    loop {
        let token = p.nth(i);
        match token.kind() {
            SyntaxKind::Eof => return token.offset,
            SyntaxKind::Semicolon if depth == 0 => return token.offset,
            SyntaxKind::LParent | SyntaxKind::LBracket => depth += 1,
            SyntaxKind::RParent | SyntaxKind::RBracket => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }
}

fn parse_binding_definition(p: &mut impl Parser) -> ParseResult<BindingDefinition> {
    let target = parse_target(p)?;
    p.test(SyntaxKind::Equal);
    let source = match p.peek().kind() {
        SyntaxKind::Eof | SyntaxKind::Comma => None,
        _ => Some(parse_expression(p)?),
    };
    let mut parameters = vec![];
    while p.test(SyntaxKind::Comma) {
        let name = p.expect(SyntaxKind::Identifier)?.text;
        let value = if p.test(SyntaxKind::Equal) {
            parse_expression(p)?
        } else {
            // A bare flag like `OneTime`
            Expression::constant(true)
        };
        parameters.push(BindingParameter { name, value });
    }
    Ok(BindingDefinition { target, source, parameters })
}

/// `Text` or `Attached.Member`: identifiers separated by dots
fn parse_target(p: &mut impl Parser) -> ParseResult<Expression> {
    let mut target = Expression::member(None, p.expect(SyntaxKind::Identifier)?.text);
    while p.test(SyntaxKind::Dot) {
        target = Expression::member(Some(target), p.expect(SyntaxKind::Identifier)?.text);
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use i_weave_common::Literal;

    #[test]
    fn single_definition() {
        let defs = parse_binding_definitions("Text=Path.ToName, Converter=Foo").unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].target, Expression::member(None, "Text"));
        assert_eq!(defs[0].source, Some(Expression::member_chain(["Path", "ToName"])));
        assert_eq!(defs[0].parameter("Converter"), Some(&Expression::member(None, "Foo")));
    }

    #[test]
    fn several_definitions() {
        let defs = parse_binding_definitions(
            "Text Name, Mode=TwoWay, OneTime; Visible (Count > 0) ; Label.Text $root.Title;",
        )
        .unwrap();
        assert_eq!(defs.len(), 3);
        assert_eq!(defs[0].source, Some(Expression::member(None, "Name")));
        assert_eq!(defs[0].parameter("Mode"), Some(&Expression::member(None, "TwoWay")));
        assert_eq!(defs[0].parameter("OneTime"), Some(&Expression::Constant(Literal::Bool(true))));
        assert_eq!(defs[1].source.as_ref().map(|s| s.to_string()).as_deref(), Some("(Count > 0)"));
        assert_eq!(defs[2].target, Expression::member_chain(["Label", "Text"]));
        assert_eq!(defs[2].source.as_ref().map(|s| s.to_string()).as_deref(), Some("$root.Title"));
    }

    #[test]
    fn semicolons_inside_strings_and_calls() {
        let defs = parse_binding_definitions("Text Format('a;b', Items[0]); Title Name").unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[1].target, Expression::member(None, "Title"));
    }

    #[test]
    fn bind_to_source() {
        let defs = parse_binding_definitions("DataContext, Mode=OneWay").unwrap();
        assert_eq!(defs[0].source, None);
        assert_eq!(defs[0].parameters.len(), 1);
    }

    #[test]
    fn errors_are_positioned() {
        let err = parse_binding_definitions("Text Name; Title A B").unwrap_err();
        assert_eq!(err.offset(), Some(19));
        let err = parse_binding_definitions("Text Name, =3").unwrap_err();
        assert_eq!(err.offset(), Some(11));
        let err = parse_binding_definitions("Text (A;").unwrap_err();
        assert_eq!(err.offset(), Some(7));
    }
}
