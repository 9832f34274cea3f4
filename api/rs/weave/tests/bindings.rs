// Copyright © SixtyFPS GmbH <info@slint.dev>
// SPDX-License-Identifier: GPL-3.0-only OR LicenseRef-Slint-Royalty-free-2.0 OR LicenseRef-Slint-Software-3.0

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use weave::compiler::{NativeExpression, NativeType};
use weave::*;

fn node_type() -> TypeRc {
    TypeDescriptor::builder("Node").dynamic().build()
}

fn node<'a>(values: impl IntoIterator<Item = (&'a str, Value)>) -> Arc<DynamicObject> {
    DynamicObject::with_values(node_type(), values)
}

fn obj(o: &Arc<DynamicObject>) -> Value {
    Value::Object(o.clone())
}

fn compiler() -> BindingCompiler {
    BindingCompiler::new().with_member_manager(Arc::new(MemberManager::new()))
}

fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    (count, move || {
        c.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn arithmetic_and_precedence() {
    let source: ObjectRc = node([("Count", Value::from(4))]);
    let compiler = compiler();
    let eval = |text: &str| compiler.compile(text).unwrap().evaluate(&source).unwrap();
    assert_eq!(eval("1 + 2 * 3"), Value::from(7));
    assert_eq!(eval("Count * 2 + 1"), Value::from(9));
    assert_eq!(eval("Count > 3 ? 'many' : 'few'"), Value::from("many"));
    assert_eq!(eval("'n=' + Count"), Value::from("n=4"));
    assert_eq!(eval("Missing ?? 'none'"), Value::from("none"));
    assert_eq!(eval("!(Count == 4) || Count % 3 == 1"), Value::from(true));
    assert_eq!(eval("-Count"), Value::from(-4));
}

#[test]
fn indexed_path_end_to_end() {
    let items = ListObject::new([obj(&node([("Name", Value::from("X"))]))]);
    let source: ObjectRc = node([("Items", Value::Object(items.clone()))]);
    let binding = compiler().compile("Items[0].Name").unwrap();
    assert_eq!(binding.member_paths(), [MemberPath::parse("Items[0].Name").unwrap()]);
    assert_eq!(binding.evaluate(&source).unwrap(), Value::from("X"));
    let count = compiler().compile("Items.Count").unwrap();
    assert_eq!(count.evaluate(&source).unwrap(), Value::from(1));
}

fn dictionary(entries: &[(&str, &str)]) -> Arc<DynamicObject> {
    let ty = TypeDescriptor::builder("Dictionary")
        .member(
            MemberDeclaration::indexer(vec![Type::Primitive(LiteralType::String)], Type::Any)
                .with_getter(|target, args| {
                    let key = args[0].as_str().unwrap_or_default();
                    let entries = target.downcast_ref::<DynamicObject>();
                    Ok(entries.map(|d| d.get(key)).unwrap_or_default())
                }),
        )
        .build();
    DynamicObject::with_values(ty, entries.iter().map(|(k, v)| (*k, Value::from(*v))))
}

#[test]
fn string_keys_may_contain_dots() {
    let root = node([("Items", Value::Object(dictionary(&[("a.b", "dotted")])))]);
    let source: ObjectRc = root.clone();
    let binding = compiler().compile("Items['a.b']").unwrap();
    assert_eq!(binding.member_paths()[0].members(), ["Items", "[\"a.b\"]"]);
    assert_eq!(binding.evaluate(&source).unwrap(), Value::from("dotted"));

    let (count, on_change) = counter();
    let graph = binding.observe(&source, on_change).unwrap();
    assert_eq!(graph.observers()[0].path().path(), "Items[\"a.b\"]");
    root.set("Items", Value::Object(dictionary(&[("a.b", "replaced")])));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(binding.evaluate(&source).unwrap(), Value::from("replaced"));
}

#[test]
fn native_lambda_is_the_same_as_text() {
    let compiler = compiler();
    let person = NativeType::named("Person");
    let x = NativeExpression::parameter("x", person.clone());
    let foo = NativeExpression::member(&x, person, "Foo");
    let bar = NativeExpression::member(&foo, NativeType::named("Foo"), "Bar");
    let native = compiler.compile_native(&NativeExpression::lambda(&[&x], bar)).unwrap();
    let text = compiler.compile("Foo.Bar").unwrap();
    assert_eq!(native.expression(), text.expression());

    let source: ObjectRc = node([("Foo", obj(&node([("Bar", Value::from(5))])))]);
    assert_eq!(native.evaluate(&source).unwrap(), Value::from(5));
}

#[test]
fn bare_source_is_not_a_binding() {
    let x = NativeExpression::parameter("x", NativeType::named("Person"));
    let err = compiler().compile_native(&NativeExpression::lambda(&[&x], x.clone())).unwrap_err();
    assert!(matches!(err, Error::Conversion(_)), "{err}");
}

#[test]
fn observing_rebinds_intermediate_members() {
    let b1 = node([("C", Value::from(1))]);
    let a = node([("B", obj(&b1))]);
    let root = node([("A", obj(&a)), ("Offset", Value::from(10))]);
    let source: ObjectRc = root.clone();

    let binding = compiler().compile("A.B.C + Offset").unwrap();
    let (count, on_change) = counter();
    let graph = binding.observe(&source, on_change).unwrap();
    assert_eq!(graph.observers().len(), 2);

    let b2 = node([("C", Value::from(2))]);
    a.set("B", obj(&b2));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(binding.evaluate(&source).unwrap(), Value::from(12));

    b1.set("C", 100);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    b2.set("C", 3);
    root.set("Offset", 20);
    assert_eq!(count.load(Ordering::SeqCst), 3);
    assert_eq!(binding.evaluate(&source).unwrap(), Value::from(23));

    drop(graph);
    b2.set("C", 4);
    assert_eq!(count.load(Ordering::SeqCst), 3);
    assert_eq!(b2.property_changed_event().handler_count(), 0);
}

#[test]
fn strict_and_lenient_evaluation() {
    let fixed = TypeDescriptor::builder("Fixed").build();
    let source: ObjectRc = DynamicObject::new(fixed);
    let binding = compiler().compile("Missing.Name").unwrap();
    assert!(matches!(
        binding.evaluate(&source),
        Err(Error::Binding(BindingError::MemberNotFound { .. }))
    ));
    assert_eq!(
        binding.evaluate_with_policy(&Value::Object(source), ResolutionPolicy::Lenient).unwrap(),
        Value::null()
    );
}

#[test]
fn compile_errors_have_a_position() {
    let err = compiler().compile("Name +").unwrap_err();
    let Error::Compile(diagnostic) = &err else { panic!("unexpected error {err}") };
    assert_ne!(diagnostic.line_column(), (0, 0));
}

struct Theme;

impl BindingContext for Theme {
    fn resource(&self, key: &str, dynamic: bool) -> Option<Value> {
        match (key, dynamic) {
            ("Accent", true) => Some(Value::from("blue")),
            ("Margin", false) => Some(Value::from(8)),
            _ => None,
        }
    }

    fn relative_source(
        &self,
        kind: RelativeSourceKind,
        name: Option<&str>,
        _: u32,
    ) -> Option<ObjectRc> {
        match (kind, name) {
            (RelativeSourceKind::ElementName, Some("header")) => {
                Some(node([("Title", Value::from("Home"))]))
            }
            _ => None,
        }
    }
}

#[test]
fn resources_and_relative_sources() {
    let compiler = compiler().with_context(Arc::new(Theme));
    let source: ObjectRc = node([]);
    let eval = |text: &str| compiler.compile(text).unwrap().evaluate(&source);
    assert_eq!(eval("$Accent").unwrap(), Value::from("blue"));
    assert_eq!(eval("$$Margin * 2").unwrap(), Value::from(16));
    assert_eq!(eval("#header.Title").unwrap(), Value::from("Home"));
    assert!(eval("$Unknown").is_err());
    assert!(matches!(
        eval("$parent.Title"),
        Err(Error::Binding(BindingError::TargetUnavailable(_)))
    ));
}

#[test]
fn lambdas_are_passed_to_extension_methods() {
    let manager = Arc::new(MemberManager::new());
    let helpers = TypeDescriptor::builder("ListExtensions").build();
    manager.register_extension(
        &helpers,
        MemberDeclaration::method(
            "Select",
            vec![Type::Object(ListObject::list_type()), Type::Any],
            Type::Object(ListObject::list_type()),
        )
        .with_invoker(|_, args| {
            let (Some(list), Some(selector)) =
                (args[0].downcast_ref::<ListObject>(), args[1].downcast_ref::<LambdaObject>())
            else {
                return Err(BindingError::Evaluation("Select expects a list and a lambda".into()));
            };
            let items = list
                .values()
                .iter()
                .map(|v| selector.call(std::slice::from_ref(v)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Object(ListObject::new(items)))
        }),
    );
    let items = ListObject::new([
        obj(&node([("Name", Value::from("a"))])),
        obj(&node([("Name", Value::from("b"))])),
    ]);
    let source: ObjectRc = node([("Items", Value::Object(items)), ("Suffix", Value::from("!"))]);
    let binding = BindingCompiler::new()
        .with_member_manager(manager)
        .compile("Items.Select(x => x.Name + Suffix)[1]")
        .unwrap();
    assert_eq!(binding.evaluate(&source).unwrap(), Value::from("b!"));
}

#[test]
fn binding_definitions() {
    let definitions = compiler()
        .compile_definitions("Text Name, Mode=TwoWay; Visible=IsVisible; Value")
        .unwrap();
    assert_eq!(definitions.len(), 3);
    assert_eq!(definitions[0].target.path(), "Text");
    let text = definitions[0].source.as_ref().unwrap();
    assert_eq!(text.member_paths(), [MemberPath::parse("Name").unwrap()]);
    assert_eq!(definitions[0].parameter("Mode").unwrap().expression().to_string(), "TwoWay");
    assert_eq!(definitions[1].target.path(), "Visible");
    assert!(definitions[2].source.is_none());

    let source: ObjectRc = node([("Name", Value::from("Ann"))]);
    assert_eq!(text.evaluate(&source).unwrap(), Value::from("Ann"));
}
