// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

/*! The binding expression tree.

Both the textual parser and the native tree converter produce an [`Expression`].
The tree is a value: passes never mutate a tree that is shared, they either own it
or rebuild it through [`Expression::accept`].
*/

use i_weave_common::{IndexArgument, Literal, MemberPath};
use itertools::Itertools;
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter, strum::Display)]
pub enum UnaryOperator {
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "!")]
    Not,
    /// `$Foo`: a resource looked up and observed every time it changes
    #[strum(serialize = "$")]
    DynamicExpression,
    /// `$$Foo`: a resource looked up once
    #[strum(serialize = "$$")]
    StaticExpression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter, strum::Display)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Remainder,
    #[strum(serialize = "==")]
    Equality,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = "<=")]
    LessThanOrEqual,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = ">=")]
    GreaterThanOrEqual,
    #[strum(serialize = "&&")]
    AndAlso,
    #[strum(serialize = "||")]
    OrElse,
    #[strum(serialize = "??")]
    NullCoalescing,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum OperatorClass {
    ComparisonOp,
    LogicalOp,
    ArithmeticOp,
}

impl BinaryOperator {
    /// the class of for this operation
    pub fn class(self) -> OperatorClass {
        match self {
            Self::Equality
            | Self::NotEqual
            | Self::LessThan
            | Self::LessThanOrEqual
            | Self::GreaterThan
            | Self::GreaterThanOrEqual => OperatorClass::ComparisonOp,
            Self::AndAlso | Self::OrElse | Self::NullCoalescing => OperatorClass::LogicalOp,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Remainder => {
                OperatorClass::ArithmeticOp
            }
        }
    }
}

/// Where a relative source starts looking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelativeSourceKind {
    /// `$self` or `$this`: the target element itself
    Current,
    /// `$root`
    Root,
    /// `$parent` or `$parent(level)`
    Parent,
    /// `$relative(Type)` or `$relative(Type, level)`: the ancestor of the given type
    FindAncestor,
    /// `$element(name)` or `#name`
    ElementName,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    Constant(Literal),

    /// Access to `name` on `target`, or on the binding source when there is no target
    Member {
        target: Option<Box<Expression>>,
        name: SmolStr,
    },

    /// `target[arguments]`
    Index {
        target: Box<Expression>,
        arguments: Vec<Expression>,
    },

    /// `target.method<type_args>(arguments)`
    MethodCall {
        target: Option<Box<Expression>>,
        method: SmolStr,
        type_args: Vec<SmolStr>,
        arguments: Vec<Expression>,
    },

    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    Binary {
        op: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },

    Condition {
        condition: Box<Expression>,
        true_expr: Box<Expression>,
        false_expr: Box<Expression>,
    },

    Lambda {
        parameters: Vec<SmolStr>,
        body: Box<Expression>,
    },

    /// Reference to a parameter of an enclosing lambda
    Parameter {
        name: SmolStr,
    },

    /// A source found relative to the target element.
    ///
    /// `element_name` holds the element name for `ElementName` and the ancestor
    /// type name for `FindAncestor`.
    RelativeSource {
        kind: RelativeSourceKind,
        element_name: Option<SmolStr>,
        path: Option<MemberPath>,
        level: u32,
    },
}

impl Default for Expression {
    fn default() -> Self {
        Expression::Constant(Literal::Null)
    }
}

impl Expression {
    pub fn constant(value: impl Into<Literal>) -> Self {
        Expression::Constant(value.into())
    }

    pub fn member(target: Option<Expression>, name: impl Into<SmolStr>) -> Self {
        Expression::Member { target: target.map(Box::new), name: name.into() }
    }

    pub fn binary(op: BinaryOperator, lhs: Expression, rhs: Expression) -> Self {
        Expression::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    pub fn unary(op: UnaryOperator, operand: Expression) -> Self {
        Expression::Unary { op, operand: Box::new(operand) }
    }

    /// Build `A.B.C` as a chain of members starting at the binding source
    pub fn member_chain<'a>(members: impl IntoIterator<Item = &'a str>) -> Self {
        members
            .into_iter()
            .fold(None, |target, name| Some(Expression::member(target, name)))
            .unwrap_or_default()
    }

    /// Call the visitor for each sub-expression.  (note: this function does not recurse)
    pub fn visit(&self, mut visitor: impl FnMut(&Self)) {
        match self {
            Expression::Constant(_) => {}
            Expression::Member { target, .. } => {
                if let Some(target) = target {
                    visitor(target)
                }
            }
            Expression::Index { target, arguments } => {
                visitor(target);
                arguments.iter().for_each(visitor);
            }
            Expression::MethodCall { target, arguments, .. } => {
                if let Some(target) = target {
                    visitor(target);
                }
                arguments.iter().for_each(visitor);
            }
            Expression::Unary { operand, .. } => visitor(operand),
            Expression::Binary { lhs, rhs, .. } => {
                visitor(lhs);
                visitor(rhs);
            }
            Expression::Condition { condition, true_expr, false_expr } => {
                visitor(condition);
                visitor(true_expr);
                visitor(false_expr);
            }
            Expression::Lambda { body, .. } => visitor(body),
            Expression::Parameter { .. } => {}
            Expression::RelativeSource { .. } => {}
        }
    }

    pub fn visit_mut(&mut self, mut visitor: impl FnMut(&mut Self)) {
        match self {
            Expression::Constant(_) => {}
            Expression::Member { target, .. } => {
                if let Some(target) = target {
                    visitor(target)
                }
            }
            Expression::Index { target, arguments } => {
                visitor(target);
                arguments.iter_mut().for_each(visitor);
            }
            Expression::MethodCall { target, arguments, .. } => {
                if let Some(target) = target {
                    visitor(target);
                }
                arguments.iter_mut().for_each(visitor);
            }
            Expression::Unary { operand, .. } => visitor(operand),
            Expression::Binary { lhs, rhs, .. } => {
                visitor(lhs);
                visitor(rhs);
            }
            Expression::Condition { condition, true_expr, false_expr } => {
                visitor(condition);
                visitor(true_expr);
                visitor(false_expr);
            }
            Expression::Lambda { body, .. } => visitor(body),
            Expression::Parameter { .. } => {}
            Expression::RelativeSource { .. } => {}
        }
    }

    /// Visit itself and each sub expression recursively
    pub fn visit_recursive(&self, visitor: &mut dyn FnMut(&Self)) {
        visitor(self);
        self.visit(|e| e.visit_recursive(visitor));
    }

    /// Visit itself and each sub expression recursively
    pub fn visit_recursive_mut(&mut self, visitor: &mut dyn FnMut(&mut Self)) {
        visitor(self);
        self.visit_mut(|e| e.visit_recursive_mut(visitor));
    }

    /// Rebuild this tree through the visitor.
    ///
    /// In pre-order the visitor sees a node before its children, and the children
    /// of a replacement node are visited in turn. In post-order the children are
    /// rebuilt first.
    pub fn accept(self, visitor: &mut dyn ExpressionVisitor) -> Expression {
        if visitor.is_post_order() {
            let mut expr = self;
            expr.visit_mut(|e| *e = std::mem::take(e).accept(visitor));
            match visitor.visit(&expr) {
                Some(new) => new,
                None => expr,
            }
        } else {
            let mut expr = match visitor.visit(&self) {
                Some(new) => new,
                None => self,
            };
            expr.visit_mut(|e| *e = std::mem::take(e).accept(visitor));
            expr
        }
    }

    pub fn is_constant(&self) -> bool {
        match self {
            Expression::Constant(_) => true,
            Expression::Unary { op, operand } => {
                !matches!(op, UnaryOperator::DynamicExpression | UnaryOperator::StaticExpression)
                    && operand.is_constant()
            }
            Expression::Binary { lhs, rhs, .. } => lhs.is_constant() && rhs.is_constant(),
            Expression::Condition { condition, true_expr, false_expr } => {
                condition.is_constant() && true_expr.is_constant() && false_expr.is_constant()
            }
            _ => false,
        }
    }

    /// The member path of a chain of members and constant indexers that starts at
    /// the binding source, like `Items[0].Name`. Returns None for anything else.
    pub fn to_member_path(&self) -> Option<MemberPath> {
        let mut segments = Vec::new();
        if !self.collect_member_segments(&mut segments) {
            return None;
        }
        Some(MemberPath::from_members(segments))
    }

    fn collect_member_segments(&self, segments: &mut Vec<SmolStr>) -> bool {
        match self {
            Expression::Member { target: None, name } => {
                segments.push(name.clone());
                true
            }
            Expression::Member { target: Some(target), name } => {
                if !target.collect_member_segments(segments) {
                    return false;
                }
                segments.push(name.clone());
                true
            }
            Expression::Index { target, arguments } => {
                if !target.collect_member_segments(segments) {
                    return false;
                }
                let Some(arguments) = arguments
                    .iter()
                    .map(|a| match a {
                        Expression::Constant(Literal::String(s)) => {
                            Some(IndexArgument::String(s.clone()))
                        }
                        Expression::Constant(l) => l.as_i64().map(IndexArgument::Integer),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()
                else {
                    return false;
                };
                segments.push(smol_str::format_smolstr!("[{}]", arguments.iter().join(",")));
                true
            }
            _ => false,
        }
    }
}

/// A visitor rebuilding an expression tree, see [`Expression::accept`]
pub trait ExpressionVisitor {
    /// When true, children are visited before their parent
    fn is_post_order(&self) -> bool {
        false
    }

    /// Return a replacement for this node, or None to keep it
    fn visit(&mut self, expr: &Expression) -> Option<Expression>;
}

fn needs_parentheses(expr: &Expression) -> bool {
    matches!(
        expr,
        Expression::Binary { .. } | Expression::Condition { .. } | Expression::Lambda { .. }
    )
}

struct Operand<'a>(&'a Expression);

impl std::fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if needs_parentheses(self.0) { write!(f, "({})", self.0) } else { write!(f, "{}", self.0) }
    }
}

/// Prints the expression in the binding syntax. Binary operations are always
/// parenthesized so that the output parses back to the same tree.
impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Constant(value) => write!(f, "{value}"),
            Expression::Member { target: None, name } => write!(f, "{name}"),
            Expression::Member { target: Some(target), name } => {
                write!(f, "{}.{name}", Operand(target))
            }
            Expression::Index { target, arguments } => {
                write!(f, "{}[{}]", Operand(target), arguments.iter().join(", "))
            }
            Expression::MethodCall { target, method, type_args, arguments } => {
                if let Some(target) = target {
                    write!(f, "{}.", Operand(target))?;
                }
                write!(f, "{method}")?;
                if !type_args.is_empty() {
                    write!(f, "<{}>", type_args.iter().join(", "))?;
                }
                write!(f, "({})", arguments.iter().join(", "))
            }
            Expression::Unary { op, operand } => write!(f, "{op}{}", Operand(operand)),
            Expression::Binary { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Expression::Condition { condition, true_expr, false_expr } => {
                write!(f, "({condition} ? {true_expr} : {false_expr})")
            }
            Expression::Lambda { parameters, body } => {
                write!(f, "({}) => {body}", parameters.iter().join(", "))
            }
            Expression::Parameter { name } => write!(f, "{name}"),
            Expression::RelativeSource { kind, element_name, path, level } => {
                let name = element_name.as_deref().unwrap_or_default();
                match kind {
                    RelativeSourceKind::Current => write!(f, "$self")?,
                    RelativeSourceKind::Root => write!(f, "$root")?,
                    RelativeSourceKind::Parent => write!(f, "$parent({level})")?,
                    RelativeSourceKind::FindAncestor => write!(f, "$relative({name}, {level})")?,
                    RelativeSourceKind::ElementName => write!(f, "#{name}")?,
                }
                match path {
                    Some(path) if !path.is_empty() => write!(f, ".{path}"),
                    _ => Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Identity;
    impl ExpressionVisitor for Identity {
        fn visit(&mut self, _: &Expression) -> Option<Expression> {
            None
        }
    }

    fn sample() -> Expression {
        Expression::Condition {
            condition: Box::new(Expression::binary(
                BinaryOperator::GreaterThan,
                Expression::member_chain(["Person", "Age"]),
                Expression::constant(17),
            )),
            true_expr: Box::new(Expression::MethodCall {
                target: Some(Box::new(Expression::member(None, "Format"))),
                method: "Adult".into(),
                type_args: vec!["string".into()],
                arguments: vec![Expression::Index {
                    target: Box::new(Expression::member(None, "Items")),
                    arguments: vec![Expression::constant(0)],
                }],
            }),
            false_expr: Box::new(Expression::unary(
                UnaryOperator::DynamicExpression,
                Expression::member(None, "Minor"),
            )),
        }
    }

    #[test]
    fn identity_visitor_round_trip() {
        struct PostOrderIdentity;
        impl ExpressionVisitor for PostOrderIdentity {
            fn is_post_order(&self) -> bool {
                true
            }
            fn visit(&mut self, expr: &Expression) -> Option<Expression> {
                Some(expr.clone())
            }
        }

        assert_eq!(sample().accept(&mut Identity), sample());
        assert_eq!(sample().accept(&mut PostOrderIdentity), sample());
    }

    #[test]
    fn visit_order() {
        struct Recorder(Vec<String>, bool);
        impl ExpressionVisitor for Recorder {
            fn is_post_order(&self) -> bool {
                self.1
            }
            fn visit(&mut self, expr: &Expression) -> Option<Expression> {
                if let Expression::Member { name, .. } = expr {
                    self.0.push(name.to_string());
                }
                None
            }
        }
        let expr = Expression::member_chain(["A", "B"]);
        let mut pre = Recorder(vec![], false);
        let _ = expr.clone().accept(&mut pre);
        assert_eq!(pre.0, ["B", "A"]);
        let mut post = Recorder(vec![], true);
        let _ = expr.accept(&mut post);
        assert_eq!(post.0, ["A", "B"]);
    }

    #[test]
    fn member_path_of_chains() {
        let expr = Expression::member(
            Some(Expression::Index {
                target: Box::new(Expression::member(None, "Items")),
                arguments: vec![Expression::constant(0)],
            }),
            "Name",
        );
        assert_eq!(expr.to_member_path().map(|p| p.to_string()).as_deref(), Some("Items[0].Name"));
        assert_eq!(sample().to_member_path(), None);
    }

    #[test]
    fn display() {
        assert_eq!(
            sample().to_string(),
            "((Person.Age > 17) ? Format.Adult<string>(Items[0]) : $Minor)"
        );
    }
}
