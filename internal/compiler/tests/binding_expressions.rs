// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

use i_weave_common::{Literal, LiteralType, MemberPath};
use i_weave_compiler::expression_tree::{BinaryOperator, Expression, ExpressionVisitor};
use i_weave_compiler::native::{NativeExpression, NativeType};
use i_weave_compiler::{compile_binding_definitions, compile_expression, compile_native_expression};
use i_weave_compiler::CompilerConfiguration;

fn config() -> CompilerConfiguration {
    let mut config = CompilerConfiguration::new();
    config.const_propagation = true;
    config.allow_lambdas = true;
    config
}

fn compile(source: &str) -> Expression {
    let (expr, diag) = compile_expression(source, "test", &config());
    assert!(!diag.has_errors(), "{source}: {:?}", diag.to_string_vec());
    expr.unwrap()
}

#[test]
fn lambda_over_the_source_is_the_same_as_text() {
    let person = NativeType::named("Person");
    let x = NativeExpression::parameter("x", person.clone());
    let foo = NativeExpression::member(&x, person.clone(), "Foo");
    let bar = NativeExpression::member(&foo, NativeType::named("Foo"), "Bar");
    let lambda = NativeExpression::lambda(&[&x], bar);
    let (converted, diag) = compile_native_expression(&lambda, &config());
    assert!(diag.is_empty());
    assert_eq!(converted.unwrap(), compile("Foo.Bar"));
}

#[test]
fn default_value_is_a_constant() {
    let int = NativeType::Primitive(LiteralType::Int32);
    let native = std::rc::Rc::new(NativeExpression::Default(int));
    let (converted, _) = compile_native_expression(&native, &config());
    assert_eq!(converted, Some(Expression::Constant(Literal::Int32(0))));
    assert_eq!(compile("default(int)"), Expression::Constant(Literal::Int32(0)));
}

#[test]
fn indexer_path() {
    let expr = compile("Items[0].Name");
    assert_eq!(
        expr,
        Expression::member(
            Some(Expression::Index {
                target: Box::new(Expression::member(None, "Items")),
                arguments: vec![Expression::constant(0)],
            }),
            "Name"
        )
    );
    assert_eq!(expr.to_member_path(), MemberPath::parse("Items[0].Name").ok());
}

#[test]
fn precedence_and_folding() {
    let mut config = config();
    config.const_propagation = false;
    let (expr, _) = compile_expression("A + B * C == D", "", &config);
    let Some(Expression::Binary { op: BinaryOperator::Equality, lhs, .. }) = expr else {
        panic!("equality should be at the root");
    };
    assert_eq!(lhs.to_string(), "(A + (B * C))");
    assert_eq!(compile("2 + 3 * 4 - Offset").to_string(), "(14 - Offset)");
}

#[test]
fn same_input_same_tree() {
    let source = "Items.Where(x => x.Price > 10 && x.Visible).Count() ?? $parent(2).Total";
    assert_eq!(compile(source), compile(source));
    // The printed form parses back to the same tree
    assert_eq!(compile(&compile(source).to_string()), compile(source));
}

#[test]
fn identity_visitor() {
    struct Identity(bool, usize);
    impl ExpressionVisitor for Identity {
        fn is_post_order(&self) -> bool {
            self.0
        }
        fn visit(&mut self, _: &Expression) -> Option<Expression> {
            self.1 += 1;
            None
        }
    }
    let expr = compile("Format(\"{0}\", Items[Index].Name, -Value) + $Theme.Suffix");
    for post_order in [false, true] {
        let mut visitor = Identity(post_order, 0);
        assert_eq!(expr.clone().accept(&mut visitor), expr);
        let mut count = 0;
        expr.visit_recursive(&mut |_| count += 1);
        assert_eq!(visitor.1, count);
    }
}

#[test]
fn binding_definitions() {
    let (definitions, diag) = compile_binding_definitions(
        "Text Person.Name, Mode=OneWay, FallbackValue=1 + 1; Visible $IsVisible",
        &config(),
    );
    assert!(diag.is_empty(), "{:?}", diag.to_string_vec());
    assert_eq!(definitions.len(), 2);
    assert_eq!(definitions[0].target.to_string(), "Text");
    let source = |i: usize| definitions[i].source.as_ref().map(|s| s.to_string());
    assert_eq!(source(0).as_deref(), Some("Person.Name"));
    assert_eq!(definitions[0].parameter("FallbackValue"), Some(&Expression::constant(2)));
    assert_eq!(source(1).as_deref(), Some("$IsVisible"));
}

#[test]
fn diagnostics_point_into_the_source() {
    let (expr, diag) = compile_expression("Person.\n  Name +", "view.xml", &config());
    assert!(expr.is_none());
    assert_eq!(diag.to_string_vec(), ["view.xml:2:9: invalid expression, unexpected end of input"]);

    let mut config = config();
    config.allow_lambdas = false;
    let (expr, diag) = compile_expression("Items.Any(x => x.Visible)", "view.xml", &config);
    assert!(expr.is_none());
    assert_eq!(
        diag.to_string_vec(),
        ["view.xml:1:1: Lambda expressions are not allowed in this binding"]
    );
}
