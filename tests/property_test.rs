mod common;

use common::*;
use frameval::{
    sandbox::{native::NativeConstant, SandboxClass, SandboxContext},
    syntax::{
        types::{PrimitiveType, StaticType},
        BinaryOperator, Expression, ExpressionKind, Literal, PostfixOperator,
    },
    value::Value,
};
use proptest::prelude::*;

fn long_lit(value: i64) -> Expression {
    Expression::new(ExpressionKind::Literal(Literal::Long(value)), Some(long()))
}

fn float_lit(value: f32) -> Expression {
    Expression::new(
        ExpressionKind::Literal(Literal::Float(value)),
        Some(StaticType::Primitive(PrimitiveType::Float)),
    )
}

fn evaluate(expression: Expression) -> Result<Value, TestCaseError> {
    let tree = build_expression_in(&main_table(), MAIN, &expression)
        .map_err(|error| TestCaseError::fail(error.to_string()))?;
    let result = tree
        .evaluate(&mut SandboxContext::new())
        .map_err(|error| TestCaseError::fail(error.to_string()))?;
    Ok(result.value)
}

fn wrapping_operator_strategy() -> impl Strategy<Value = BinaryOperator> {
    prop_oneof![
        Just(BinaryOperator::Add),
        Just(BinaryOperator::Subtract),
        Just(BinaryOperator::Multiply),
        Just(BinaryOperator::BitAnd),
        Just(BinaryOperator::BitOr),
        Just(BinaryOperator::BitXor),
    ]
}

fn int_reference(operator: BinaryOperator, lhs: i32, rhs: i32) -> i32 {
    match operator {
        BinaryOperator::Add => lhs.wrapping_add(rhs),
        BinaryOperator::Subtract => lhs.wrapping_sub(rhs),
        BinaryOperator::Multiply => lhs.wrapping_mul(rhs),
        BinaryOperator::BitAnd => lhs & rhs,
        BinaryOperator::BitOr => lhs | rhs,
        _ => lhs ^ rhs,
    }
}

fn long_reference(operator: BinaryOperator, lhs: i64, rhs: i64) -> i64 {
    match operator {
        BinaryOperator::Add => lhs.wrapping_add(rhs),
        BinaryOperator::Subtract => lhs.wrapping_sub(rhs),
        BinaryOperator::Multiply => lhs.wrapping_mul(rhs),
        BinaryOperator::BitAnd => lhs & rhs,
        BinaryOperator::BitOr => lhs | rhs,
        _ => lhs ^ rhs,
    }
}

proptest! {
    #[test]
    fn int_arithmetic_wraps(operator in wrapping_operator_strategy(), lhs in any::<i32>(), rhs in any::<i32>()) {
        let value = evaluate(binary(operator, int_lit(lhs), int_lit(rhs), int()))?;
        prop_assert_eq!(value, Value::Int(int_reference(operator, lhs, rhs)));
    }

    #[test]
    fn long_arithmetic_wraps(operator in wrapping_operator_strategy(), lhs in any::<i64>(), rhs in any::<i64>()) {
        let value = evaluate(binary(operator, long_lit(lhs), long_lit(rhs), long()))?;
        prop_assert_eq!(value, Value::Long(long_reference(operator, lhs, rhs)));
    }

    #[test]
    fn int_operands_widen_to_long(lhs in any::<i32>(), rhs in any::<i64>()) {
        let value = evaluate(binary(BinaryOperator::Add, int_lit(lhs), long_lit(rhs), long()))?;
        prop_assert_eq!(value, Value::Long((lhs as i64).wrapping_add(rhs)));
    }

    #[test]
    fn division_truncates(lhs in any::<i32>(), rhs in any::<i32>().prop_filter("non-zero", |v| *v != 0)) {
        let quotient = evaluate(binary(BinaryOperator::Divide, int_lit(lhs), int_lit(rhs), int()))?;
        let remainder = evaluate(binary(BinaryOperator::Remainder, int_lit(lhs), int_lit(rhs), int()))?;
        prop_assert_eq!(quotient, Value::Int(lhs.wrapping_div(rhs)));
        prop_assert_eq!(remainder, Value::Int(lhs.wrapping_rem(rhs)));
    }

    #[test]
    fn shift_distances_are_masked(value in any::<i32>(), distance in 0..200i32) {
        let shifted = evaluate(binary(BinaryOperator::ShiftLeft, int_lit(value), int_lit(distance), int()))?;
        prop_assert_eq!(shifted, Value::Int(value.wrapping_shl((distance & 0x1f) as u32)));
        let unsigned = evaluate(binary(BinaryOperator::UnsignedShiftRight, int_lit(value), int_lit(distance), int()))?;
        prop_assert_eq!(unsigned, Value::Int(((value as u32) >> (distance & 0x1f)) as i32));
    }

    #[test]
    fn comparisons_agree(lhs in any::<i32>(), rhs in any::<i32>()) {
        let less = evaluate(binary(BinaryOperator::Less, int_lit(lhs), int_lit(rhs), boolean()))?;
        let equal = evaluate(binary(BinaryOperator::Equal, int_lit(lhs), int_lit(rhs), boolean()))?;
        prop_assert_eq!(less, Value::Boolean(lhs < rhs));
        prop_assert_eq!(equal, Value::Boolean(lhs == rhs));
    }

    #[test]
    fn int_and_float_compare_after_promotion(
        lhs in (1 << 24) - 64..(1 << 24) + 64i32,
        rhs in (1 << 24) - 64..(1 << 24) + 64i32,
    ) {
        let float = rhs as f32;
        let equal = evaluate(binary(BinaryOperator::Equal, int_lit(lhs), float_lit(float), boolean()))?;
        let less = evaluate(binary(BinaryOperator::Less, int_lit(lhs), float_lit(float), boolean()))?;
        prop_assert_eq!(equal, Value::Boolean(lhs as f32 == float));
        prop_assert_eq!(less, Value::Boolean((lhs as f32) < float));
    }

    #[test]
    fn long_and_float_add_in_float(lhs in any::<i64>(), rhs in -1.0e6f32..1.0e6f32) {
        let float = StaticType::Primitive(PrimitiveType::Float);
        let sum = evaluate(binary(BinaryOperator::Add, long_lit(lhs), float_lit(rhs), float))?;
        prop_assert_eq!(sum, Value::Float(lhs as f32 + rhs));
    }

    #[test]
    fn fragments_restart_from_their_initializers(start in any::<i32>(), runs in 1..5usize) {
        let fragment = fragment(
            0,
            vec![
                declare("x", int(), Some(int_lit(start))),
                expr(postfix(PostfixOperator::Increment, synthetic("x", int(), 0))),
                expr(synthetic("x", int(), 0)),
            ],
        );
        let tree = build_in(&main_table(), MAIN, &fragment)
            .map_err(|error| TestCaseError::fail(error.to_string()))?;
        let mut sandbox = SandboxContext::new();
        for _ in 0..runs {
            let result = tree
                .evaluate(&mut sandbox)
                .map_err(|error| TestCaseError::fail(error.to_string()))?;
            prop_assert_eq!(result.value, Value::Int(start.wrapping_add(1)));
        }
    }

    #[test]
    fn calls_run_left_to_right(count in 1..6usize) {
        let mut sandbox = SandboxContext::new();
        sandbox.define_class(SandboxClass::new("demo.Main"));
        let main = sandbox.allocate_instance("demo.Main").unwrap();
        sandbox.set_this(main);

        let names: Vec<String> = (0..count).map(|index| format!("m{index}")).collect();
        let mut expression: Option<Expression> = None;
        for (index, name) in names.iter().enumerate() {
            sandbox.define_method("demo.Main", name, None, NativeConstant(Value::Int(index as i32)));
            let next = call(None, name, vec![], Some(method(name, MAIN, vec![], int())));
            expression = Some(match expression {
                Some(sum) => binary(BinaryOperator::Add, sum, next, int()),
                None => next,
            });
        }
        let expression = expression.expect("at least one call");
        let tree = build_expression_in(&main_table(), MAIN, &expression)
            .map_err(|error| TestCaseError::fail(error.to_string()))?;
        let result = tree
            .evaluate(&mut sandbox)
            .map_err(|error| TestCaseError::fail(error.to_string()))?;

        let expected: Vec<String> = names.iter().map(|name| format!("demo.Main.{name}")).collect();
        let recorded: Vec<String> = sandbox.calls().iter().map(|call| call.to_string()).collect();
        prop_assert_eq!(recorded, expected);
        prop_assert_eq!(result.value, Value::Int((0..count as i32).sum()));
    }
}
