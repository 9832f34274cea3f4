// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

use super::describe;
use super::prelude::*;
use crate::literals::{parse_number_literal, unescape_string};
use i_weave_common::{Literal, MemberPath};
use smol_str::SmolStr;

/// Parse an expression, stopping at the first token that cannot continue it.
///
/// ```text
/// something
/// "something"
/// 'something'
/// 0.3f
/// 42UL
/// (something)
/// (something).something
/// some_id.some_property
/// function_call()
/// function_call(hello, world)
/// Generic<int, string>(x)
/// cond ? first : second
/// value ?? fallback
/// 4 + 8 * 7 / 5 + 3 - 7 - 7 % 8
/// aa == cc && bb && (xxx || fff) && 3 + aaa == bbb
/// array[index]
/// "foo".bar.something().something.xx(1)
/// x => x.Name
/// (x, y) => x + y
/// $Resource
/// $$Resource
/// $self.Text
/// $parent(2).DataContext
/// #name.Text
/// ```
pub fn parse_expression(p: &mut impl Parser) -> ParseResult<Expression> {
    if is_lambda(p) {
        return parse_lambda(p);
    }
    let condition = parse_expression_helper(p, OperatorPrecedence::Coalesce)?;
    if !p.test(SyntaxKind::Question) {
        return Ok(condition);
    }
    let true_expr = parse_expression(p)?;
    p.expect(SyntaxKind::Colon)?;
    let false_expr = parse_expression(p)?;
    Ok(Expression::Condition {
        condition: Box::new(condition),
        true_expr: Box::new(true_expr),
        false_expr: Box::new(false_expr),
    })
}

#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
#[repr(u8)]
enum OperatorPrecedence {
    /// `??`
    Coalesce,
    /// `||`
    OrOr,
    /// `&&`
    AndAnd,
    /// `==` `!=`
    Equality,
    /// `<` `>` `<=` `>=`
    Relational,
    /// `+ -`
    Add,
    /// `* / %`
    Mul,
    Unary,
}

impl OperatorPrecedence {
    fn tighter(self) -> Self {
        match self {
            Self::Coalesce => Self::OrOr,
            Self::OrOr => Self::AndAnd,
            Self::AndAnd => Self::Equality,
            Self::Equality => Self::Relational,
            Self::Relational => Self::Add,
            Self::Add => Self::Mul,
            Self::Mul | Self::Unary => Self::Unary,
        }
    }
}

fn binary_operator(kind: SyntaxKind) -> Option<(BinaryOperator, OperatorPrecedence)> {
    use OperatorPrecedence as P;
    Some(match kind {
        SyntaxKind::QuestionQuestion => (BinaryOperator::NullCoalescing, P::Coalesce),
        SyntaxKind::OrOr => (BinaryOperator::OrElse, P::OrOr),
        SyntaxKind::AndAnd => (BinaryOperator::AndAlso, P::AndAnd),
        SyntaxKind::EqualEqual => (BinaryOperator::Equality, P::Equality),
        SyntaxKind::NotEqual => (BinaryOperator::NotEqual, P::Equality),
        SyntaxKind::LAngle => (BinaryOperator::LessThan, P::Relational),
        SyntaxKind::LessEqual => (BinaryOperator::LessThanOrEqual, P::Relational),
        SyntaxKind::RAngle => (BinaryOperator::GreaterThan, P::Relational),
        SyntaxKind::GreaterEqual => (BinaryOperator::GreaterThanOrEqual, P::Relational),
        SyntaxKind::Plus => (BinaryOperator::Add, P::Add),
        SyntaxKind::Minus => (BinaryOperator::Subtract, P::Add),
        SyntaxKind::Star => (BinaryOperator::Multiply, P::Mul),
        SyntaxKind::Div => (BinaryOperator::Divide, P::Mul),
        SyntaxKind::Percent => (BinaryOperator::Remainder, P::Mul),
        _ => return None,
    })
}

fn parse_expression_helper(
    p: &mut impl Parser,
    precedence: OperatorPrecedence,
) -> ParseResult<Expression> {
    let mut lhs = parse_unary(p)?;
    while let Some((op, op_precedence)) = binary_operator(p.peek().kind()) {
        if op_precedence < precedence {
            break;
        }
        p.consume();
        // `??` is right associative, everything else is left associative
        let rhs = if op == BinaryOperator::NullCoalescing {
            parse_expression_helper(p, op_precedence)?
        } else {
            parse_expression_helper(p, op_precedence.tighter())?
        };
        lhs = Expression::binary(op, lhs, rhs);
    }
    Ok(lhs)
}

fn parse_unary(p: &mut impl Parser) -> ParseResult<Expression> {
    let op = match p.peek().kind() {
        SyntaxKind::Minus => UnaryOperator::Minus,
        SyntaxKind::Plus => UnaryOperator::Plus,
        SyntaxKind::Bang => UnaryOperator::Not,
        SyntaxKind::DollarDollar => UnaryOperator::StaticExpression,
        SyntaxKind::Dollar if is_relative_source_keyword(p.nth(1).as_str()) => {
            let source = parse_relative_source(p)?;
            return parse_postfix(p, source);
        }
        SyntaxKind::Dollar => UnaryOperator::DynamicExpression,
        _ => {
            let primary = parse_primary(p)?;
            return parse_postfix(p, primary);
        }
    };
    p.consume();
    let operand = parse_unary(p)?;
    Ok(Expression::unary(op, operand))
}

fn parse_primary(p: &mut impl Parser) -> ParseResult<Expression> {
    let token = p.peek();
    match token.kind() {
        SyntaxKind::Identifier => {
            p.consume();
            match token.as_str() {
                "true" => Ok(Expression::constant(true)),
                "false" => Ok(Expression::constant(false)),
                "null" => Ok(Expression::Constant(Literal::Null)),
                "default" if p.peek().kind() == SyntaxKind::LParent => {
                    p.consume();
                    let ty = parse_type_name(p)?;
                    p.expect(SyntaxKind::RParent)?;
                    Ok(Expression::MethodCall {
                        target: None,
                        method: token.text,
                        type_args: vec![ty],
                        arguments: vec![],
                    })
                }
                _ => parse_member_or_call(p, None, token.text),
            }
        }
        SyntaxKind::NumberLiteral => {
            let value = parse_number_literal(token.as_str()).map_err(|e| p.error(e))?;
            p.consume();
            Ok(Expression::Constant(value))
        }
        SyntaxKind::StringLiteral => {
            let value = unescape_string(token.as_str())
                .ok_or_else(|| p.error("Cannot parse string literal"))?;
            p.consume();
            Ok(Expression::Constant(Literal::String(value)))
        }
        SyntaxKind::LParent => {
            p.consume();
            let expr = parse_expression(p)?;
            p.expect(SyntaxKind::RParent)?;
            Ok(expr)
        }
        SyntaxKind::Hash => {
            p.consume();
            let name = p.expect(SyntaxKind::Identifier)?;
            Ok(Expression::RelativeSource {
                kind: RelativeSourceKind::ElementName,
                element_name: Some(name.text),
                path: None,
                level: 0,
            })
        }
        _ => Err(p.error(format!("invalid expression, unexpected {}", describe(&token)))),
    }
}

/// Member accesses, method calls and indexers following `expr`
fn parse_postfix(p: &mut impl Parser, mut expr: Expression) -> ParseResult<Expression> {
    loop {
        match p.peek().kind() {
            SyntaxKind::Dot => {
                p.consume();
                let name = p.expect(SyntaxKind::Identifier)?.text;
                if let Expression::RelativeSource { path, .. } = &mut expr {
                    if p.peek().kind() != SyntaxKind::LParent && !is_generic_call(p) {
                        let members = path.iter().flat_map(|m| m.members().iter().cloned());
                        *path = Some(MemberPath::from_members(members.chain([name])));
                        continue;
                    }
                }
                expr = parse_member_or_call(p, Some(expr), name)?;
            }
            SyntaxKind::LBracket => {
                p.consume();
                if p.peek().kind() == SyntaxKind::RBracket {
                    return Err(p.error("Indexer needs at least one argument"));
                }
                let arguments = parse_arguments(p, SyntaxKind::RBracket)?;
                expr = Expression::Index { target: Box::new(expr), arguments };
            }
            _ => return Ok(expr),
        }
    }
}

/// After an identifier: `name`, `name(args)` or `name<T>(args)`
fn parse_member_or_call(
    p: &mut impl Parser,
    target: Option<Expression>,
    name: SmolStr,
) -> ParseResult<Expression> {
    let type_args = if is_generic_call(p) { parse_type_arguments(p)? } else { vec![] };
    if type_args.is_empty() && p.peek().kind() != SyntaxKind::LParent {
        return Ok(Expression::member(target, name));
    }
    p.expect(SyntaxKind::LParent)?;
    let arguments = parse_arguments(p, SyntaxKind::RParent)?;
    Ok(Expression::MethodCall { target: target.map(Box::new), method: name, type_args, arguments })
}

/// ```text
/// ()
/// (foo)
/// (foo, bar, foo)
/// (foo, bar(), xx+xx,)
/// ```
/// The opening token was already consumed.
fn parse_arguments(p: &mut impl Parser, close: SyntaxKind) -> ParseResult<Vec<Expression>> {
    let mut arguments = vec![];
    while p.nth(0).kind() != close {
        arguments.push(parse_expression(p)?);
        if !p.test(SyntaxKind::Comma) {
            break;
        }
    }
    p.expect(close)?;
    Ok(arguments)
}

/// `Foo.Bar` as a type name
fn parse_type_name(p: &mut impl Parser) -> ParseResult<SmolStr> {
    let mut name = String::from(p.expect(SyntaxKind::Identifier)?.as_str());
    while p.peek().kind() == SyntaxKind::Dot && p.nth(1).kind() == SyntaxKind::Identifier {
        p.consume();
        name.push('.');
        name.push_str(p.consume().as_str());
    }
    Ok(name.into())
}

fn parse_type_arguments(p: &mut impl Parser) -> ParseResult<Vec<SmolStr>> {
    p.expect(SyntaxKind::LAngle)?;
    let mut type_args = vec![parse_type_name(p)?];
    while p.test(SyntaxKind::Comma) {
        type_args.push(parse_type_name(p)?);
    }
    p.expect(SyntaxKind::RAngle)?;
    Ok(type_args)
}

/// Looks ahead for `<Type, Other.Type>(`, which tells a generic call from a comparison
fn is_generic_call(p: &mut impl Parser) -> bool {
    if p.nth(0).kind() != SyntaxKind::LAngle {
        return false;
    }
    let mut i = 1;
    loop {
        if p.nth(i).kind() != SyntaxKind::Identifier {
            return false;
        }
        i += 1;
        while p.nth(i).kind() == SyntaxKind::Dot && p.nth(i + 1).kind() == SyntaxKind::Identifier {
            i += 2;
        }
        match p.nth(i).kind() {
            SyntaxKind::Comma => i += 1,
            SyntaxKind::RAngle => return p.nth(i + 1).kind() == SyntaxKind::LParent,
            _ => return false,
        }
    }
}

/// `x =>`, `() =>` or `(x, y) =>`
fn is_lambda(p: &mut impl Parser) -> bool {
    match p.nth(0).kind() {
        SyntaxKind::Identifier => p.nth(1).kind() == SyntaxKind::FatArrow,
        SyntaxKind::LParent => {
            let mut i = 1;
            if p.nth(i).kind() == SyntaxKind::RParent {
                return p.nth(i + 1).kind() == SyntaxKind::FatArrow;
            }
            loop {
                if p.nth(i).kind() != SyntaxKind::Identifier {
                    return false;
                }
                match p.nth(i + 1).kind() {
                    SyntaxKind::Comma => i += 2,
                    SyntaxKind::RParent => return p.nth(i + 2).kind() == SyntaxKind::FatArrow,
                    _ => return false,
                }
            }
        }
        _ => false,
    }
}

fn parse_lambda(p: &mut impl Parser) -> ParseResult<Expression> {
    let mut parameters: Vec<SmolStr> = vec![];
    if p.test(SyntaxKind::LParent) {
        while p.peek().kind() == SyntaxKind::Identifier {
            if parameters.contains(&p.peek().text) {
                let msg = format!("Duplicated lambda parameter '{}'", p.peek().text);
                return Err(p.error(msg));
            }
            parameters.push(p.consume().text);
            if !p.test(SyntaxKind::Comma) {
                break;
            }
        }
        p.expect(SyntaxKind::RParent)?;
    } else {
        parameters.push(p.expect(SyntaxKind::Identifier)?.text);
    }
    p.expect(SyntaxKind::FatArrow)?;
    let mut body = parse_expression(p)?;
    // Inner lambdas were already bound, so shadowed names are already parameters
    body.visit_recursive_mut(&mut |e| {
        if let Expression::Member { target: None, name } = e {
            if parameters.contains(name) {
                let name = std::mem::take(name);
                *e = Expression::Parameter { name };
            }
        }
    });
    Ok(Expression::Lambda { parameters, body: Box::new(body) })
}

fn is_relative_source_keyword(ident: &str) -> bool {
    matches!(ident, "self" | "this" | "root" | "parent" | "relative" | "element")
}

/// ```text
/// $self
/// $this
/// $root
/// $parent
/// $parent(2)
/// $relative(Some.Type)
/// $relative(Some.Type, 2)
/// $element(name)
/// ```
fn parse_relative_source(p: &mut impl Parser) -> ParseResult<Expression> {
    p.expect(SyntaxKind::Dollar)?;
    let keyword = p.expect(SyntaxKind::Identifier)?;
    let mut element_name = None;
    let mut level = 0;
    let kind = match keyword.as_str() {
        "self" | "this" => RelativeSourceKind::Current,
        "root" => RelativeSourceKind::Root,
        "parent" => {
            level = 1;
            if p.test(SyntaxKind::LParent) {
                level = parse_level(p)?;
                p.expect(SyntaxKind::RParent)?;
            }
            RelativeSourceKind::Parent
        }
        "relative" => {
            p.expect(SyntaxKind::LParent)?;
            element_name = Some(parse_type_name(p)?);
            level = 1;
            if p.test(SyntaxKind::Comma) {
                level = parse_level(p)?;
            }
            p.expect(SyntaxKind::RParent)?;
            RelativeSourceKind::FindAncestor
        }
        "element" => {
            p.expect(SyntaxKind::LParent)?;
            element_name = Some(p.expect(SyntaxKind::Identifier)?.text);
            p.expect(SyntaxKind::RParent)?;
            RelativeSourceKind::ElementName
        }
        _ => return Err(p.error(format!("Unknown relative source '${}'", keyword.text))),
    };
    Ok(Expression::RelativeSource { kind, element_name, path: None, level })
}

fn parse_level(p: &mut impl Parser) -> ParseResult<u32> {
    let token = p.peek();
    match token.as_str().parse::<u32>() {
        Ok(level) if token.kind() == SyntaxKind::NumberLiteral && level > 0 => {
            p.consume();
            Ok(level)
        }
        _ => Err(p.error("The level of a relative source must be a positive integer")),
    }
}
