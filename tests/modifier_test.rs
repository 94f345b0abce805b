mod common;

use common::*;
use frameval::{
    evaluator::{
        error::EvaluateErrorKind,
        modifier::{Target, TargetDescriptor},
        EvaluationResult,
    },
    sandbox::{SandboxClass, SandboxContext},
    syntax::{types::StaticType, Expression, ExpressionKind},
    value::Value,
};
use pretty_assertions::assert_eq;

fn evaluate(expression: Expression, sandbox: &mut SandboxContext) -> EvaluationResult {
    init_test_logging();
    let tree = build_expression_in(&main_table(), MAIN, &expression).expect("builds");
    tree.evaluate(sandbox).expect("evaluates")
}

#[test]
fn locals_widen_on_assignment() {
    let mut sandbox = SandboxContext::new();
    sandbox.declare_local("total", Value::Long(0));
    let result = evaluate(assign(local("total", long(), MAIN), int_lit(5)), &mut sandbox);
    assert_eq!(result.value, Value::Long(5));
    assert_eq!(sandbox.local("total"), Some(&Value::Long(5)));
}

#[test]
fn narrowing_only_keeps_values_that_fit() {
    let mut sandbox = SandboxContext::new();
    sandbox.declare_local("b", Value::Byte(1));
    let result = evaluate(local("b", byte(), MAIN), &mut sandbox);
    let modifier = result.modifier().expect("locals are modifiable");
    assert_eq!(modifier.expected_type(), Some(&byte()));

    assert_eq!(
        modifier.set_value(&mut sandbox, Value::Int(5)).unwrap(),
        Value::Byte(5)
    );
    let error = modifier.set_value(&mut sandbox, Value::Int(500)).unwrap_err();
    assert_eq!(
        error.kind,
        EvaluateErrorKind::TypeMismatch {
            expected: "byte".into(),
            actual: "int".into(),
        }
    );
    assert_eq!(sandbox.local("b"), Some(&Value::Byte(5)));
}

#[test]
fn assignments_box_and_unbox() {
    let mut sandbox = SandboxContext::new();
    let integer = StaticType::class("java.lang.Integer");
    sandbox.declare_local("boxed", Value::Null);
    sandbox.declare_local("total", Value::Long(0));

    let result = evaluate(assign(local("boxed", integer.clone(), MAIN), int_lit(5)), &mut sandbox);
    let Some(Value::Object(boxed)) = sandbox.local("boxed").cloned() else {
        panic!("boxed should hold an Integer");
    };
    assert_eq!(boxed.type_name.as_ref(), "java.lang.Integer");
    assert_eq!(sandbox.field(&boxed, "value"), Some(Value::Int(5)));
    assert_eq!(result.value, Value::Object(boxed));

    evaluate(assign(local("total", long(), MAIN), local("boxed", integer, MAIN)), &mut sandbox);
    assert_eq!(sandbox.local("total"), Some(&Value::Long(5)));
}

#[test]
fn unboxing_null_fails() {
    let mut sandbox = SandboxContext::new();
    sandbox.declare_local("total", Value::Long(0));
    let result = evaluate(local("total", long(), MAIN), &mut sandbox);
    let modifier = result.modifier().expect("locals are modifiable");
    let error = modifier.set_value(&mut sandbox, Value::Null).unwrap_err();
    assert_eq!(error.kind, EvaluateErrorKind::NullPointer("unboxing".into()));
    assert_eq!(sandbox.local("total"), Some(&Value::Long(0)));
}

#[test]
fn array_elements() {
    let mut sandbox = SandboxContext::new();
    let array = sandbox.allocate_array(int(), vec![Value::Int(0), Value::Int(0)]);
    sandbox.declare_local("arr", Value::Object(array.clone()));
    let element = index(local("arr", int_array(), MAIN), int_lit(1), int());
    let result = evaluate(element, &mut sandbox);
    let modifier = result.modifier().unwrap();
    assert_eq!(
        modifier.descriptor(),
        TargetDescriptor::ArrayElement {
            array: array.clone(),
            index: 1,
        }
    );
    modifier.set_value(&mut sandbox, Value::Int(7)).unwrap();
    assert_eq!(
        sandbox.array_elements(&array).unwrap(),
        [Value::Int(0), Value::Int(7)]
    );
}

#[test]
fn synthetic_variables_write_to_their_frame() {
    init_test_logging();
    let fragment = fragment(
        0,
        vec![
            declare("x", int(), Some(int_lit(1))),
            expr(synthetic("x", int(), 0)),
        ],
    );
    let tree = build_in(&main_table(), MAIN, &fragment).unwrap();
    let mut sandbox = SandboxContext::new();
    let result = tree.evaluate(&mut sandbox).unwrap();
    let modifier = result.modifier().unwrap();
    assert_eq!(modifier.descriptor().to_string(), "synthetic variable x");

    modifier.set_value(&mut sandbox, Value::Int(42)).unwrap();
    let Target::Synthetic { frame, .. } = modifier.target() else {
        panic!("expected a synthetic target");
    };
    assert_eq!(frame.access("x"), Some(Value::Int(42)));
}

#[test]
fn descriptors() {
    let mut sandbox = SandboxContext::new();
    sandbox.define_class(SandboxClass::new("demo.Point").with_field("x", int()));
    let point = sandbox.allocate_instance("demo.Point").unwrap();
    sandbox.declare_local("p", Value::Object(point.clone()));
    sandbox.declare_local("n", Value::Int(3));

    let field = qualified(
        local("p", StaticType::class("demo.Point"), MAIN),
        "x",
        Some(int()),
    );
    let result = evaluate(field, &mut sandbox);
    let modifier = result.modifier().unwrap();
    assert_eq!(modifier.descriptor().to_string(), "field demo.Point.x");
    modifier.set_value(&mut sandbox, Value::Int(12)).unwrap();
    assert_eq!(sandbox.field(&point, "x"), Some(Value::Int(12)));

    let result = evaluate(local("n", int(), MAIN), &mut sandbox);
    assert_eq!(
        result.modifier().unwrap().descriptor().to_string(),
        "local variable n"
    );
}

#[test]
fn computed_values_have_no_modifier() {
    let mut sandbox = SandboxContext::new();
    sandbox.declare_local("n", Value::Int(3));
    assert!(evaluate(int_lit(1), &mut sandbox).modifier().is_none());

    let conditional = Expression::new(
        ExpressionKind::Conditional {
            condition: Box::new(bool_lit(true)),
            then_branch: Box::new(local("n", int(), MAIN)),
            else_branch: Box::new(int_lit(0)),
        },
        Some(int()),
    );
    let result = evaluate(conditional, &mut sandbox);
    assert_eq!(result.value, Value::Int(3));
    assert!(result.modifier().is_none());
}

#[test]
fn literals_are_not_assignable() {
    init_test_logging();
    let tree = build_expression_in(&main_table(), MAIN, &assign(int_lit(1), int_lit(2))).unwrap();
    let error = tree.evaluate(&mut SandboxContext::new()).unwrap_err();
    assert_eq!(error.kind, EvaluateErrorKind::NotAssignable);
}
