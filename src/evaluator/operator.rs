//! Java operator semantics, driven by the static result type the builder recorded.

use super::error::EvaluateErrorKind;
use crate::{
    syntax::{
        types::{PrimitiveType, StaticType},
        BinaryOperator,
    },
    value::Value,
};
use compact_str::format_compact;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
    BitNot,
}

impl UnaryOperator {
    pub fn sign(&self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::Not => "!",
            UnaryOperator::BitNot => "~",
        }
    }
}

pub fn apply_binary(
    operator: BinaryOperator,
    lhs: &Value,
    rhs: &Value,
    result_type: &StaticType,
) -> Result<Value, EvaluateErrorKind> {
    use BinaryOperator::*;
    match operator {
        Equal => Ok(Value::Boolean(values_equal(lhs, rhs))),
        NotEqual => Ok(Value::Boolean(!values_equal(lhs, rhs))),
        Less | LessEqual | Greater | GreaterEqual => compare(operator, lhs, rhs),
        And | Or => logical(operator, lhs, rhs),
        Add if result_type.is_string() => Ok(Value::String(format_compact!("{lhs}{rhs}"))),
        _ => arithmetic(operator, lhs, rhs, result_type),
    }
}

pub fn apply_unary(
    operator: UnaryOperator,
    operand: &Value,
    result_type: &StaticType,
) -> Result<Value, EvaluateErrorKind> {
    if operator == UnaryOperator::Not {
        return operand
            .as_bool()
            .map(|v| Value::Boolean(!v))
            .ok_or_else(|| EvaluateErrorKind::NonBoolean(operand.clone()));
    }
    let promoted = result_type
        .as_primitive()
        .filter(PrimitiveType::is_numeric)
        .and_then(|result| operand.convert_to(result))
        .ok_or_else(|| EvaluateErrorKind::NonNumeric(operand.clone()))?;
    match (operator, promoted) {
        (UnaryOperator::Plus, value) => Ok(value),
        (UnaryOperator::Minus, Value::Int(v)) => Ok(Value::Int(v.wrapping_neg())),
        (UnaryOperator::Minus, Value::Long(v)) => Ok(Value::Long(v.wrapping_neg())),
        (UnaryOperator::Minus, Value::Float(v)) => Ok(Value::Float(-v)),
        (UnaryOperator::Minus, Value::Double(v)) => Ok(Value::Double(-v)),
        (UnaryOperator::BitNot, Value::Int(v)) => Ok(Value::Int(!v)),
        (UnaryOperator::BitNot, Value::Long(v)) => Ok(Value::Long(!v)),
        (_, value) => Err(EvaluateErrorKind::NonNumeric(value)),
    }
}

/// `==` as the JVM sees it: numeric comparison across primitive types and
/// identity for objects. Strings compare by content since they are mirrored by value.
pub fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Boolean(l), Value::Boolean(r)) => l == r,
        (Value::Null, Value::Null) => true,
        (Value::Object(l), Value::Object(r)) => l.id == r.id,
        (Value::String(l), Value::String(r)) => l == r,
        (Value::Type(l), Value::Type(r)) => l.name == r.name,
        (l, r) => numeric_ordering(l, r)
            .flatten()
            .is_some_and(Ordering::is_eq),
    }
}

/// Binary numeric promotion: the wider of the operands' types, but at least `int`.
fn promoted_type(lhs: &Value, rhs: &Value) -> Option<PrimitiveType> {
    let l = lhs.primitive_type().filter(PrimitiveType::is_numeric)?;
    let r = rhs.primitive_type().filter(PrimitiveType::is_numeric)?;
    let promoted = [PrimitiveType::Double, PrimitiveType::Float, PrimitiveType::Long]
        .into_iter()
        .find(|wide| l == *wide || r == *wide)
        .unwrap_or(PrimitiveType::Int);
    Some(promoted)
}

/// Orders two numeric values after promotion. The inner `None` is an unordered NaN.
fn numeric_ordering(lhs: &Value, rhs: &Value) -> Option<Option<Ordering>> {
    let promoted = promoted_type(lhs, rhs)?;
    let ordering = match (lhs.convert_to(promoted)?, rhs.convert_to(promoted)?) {
        (Value::Int(l), Value::Int(r)) => Some(l.cmp(&r)),
        (Value::Long(l), Value::Long(r)) => Some(l.cmp(&r)),
        (Value::Float(l), Value::Float(r)) => l.partial_cmp(&r),
        (Value::Double(l), Value::Double(r)) => l.partial_cmp(&r),
        _ => return None,
    };
    Some(ordering)
}

fn compare(
    operator: BinaryOperator,
    lhs: &Value,
    rhs: &Value,
) -> Result<Value, EvaluateErrorKind> {
    let ordering = numeric_ordering(lhs, rhs)
        .ok_or_else(|| EvaluateErrorKind::NonNumerics(lhs.clone(), rhs.clone()))?;
    // NaN compares false against everything.
    let result = ordering.is_some_and(|o| match operator {
        BinaryOperator::Less => o.is_lt(),
        BinaryOperator::LessEqual => o.is_le(),
        BinaryOperator::Greater => o.is_gt(),
        _ => o.is_ge(),
    });
    Ok(Value::Boolean(result))
}

fn logical(operator: BinaryOperator, lhs: &Value, rhs: &Value) -> Result<Value, EvaluateErrorKind> {
    let l = lhs
        .as_bool()
        .ok_or_else(|| EvaluateErrorKind::NonBoolean(lhs.clone()))?;
    let r = rhs
        .as_bool()
        .ok_or_else(|| EvaluateErrorKind::NonBoolean(rhs.clone()))?;
    Ok(Value::Boolean(match operator {
        BinaryOperator::And => l && r,
        _ => l || r,
    }))
}

fn arithmetic(
    operator: BinaryOperator,
    lhs: &Value,
    rhs: &Value,
    result_type: &StaticType,
) -> Result<Value, EvaluateErrorKind> {
    let unsupported = || EvaluateErrorKind::UnsupportedOperands {
        operator: operator.sign(),
        lhs: lhs.clone(),
        rhs: rhs.clone(),
    };
    let Some(result) = result_type.as_primitive() else {
        return Err(unsupported());
    };

    if result == PrimitiveType::Boolean {
        let (Some(l), Some(r)) = (lhs.as_bool(), rhs.as_bool()) else {
            return Err(unsupported());
        };
        return match operator {
            BinaryOperator::BitAnd => Ok(Value::Boolean(l & r)),
            BinaryOperator::BitOr => Ok(Value::Boolean(l | r)),
            BinaryOperator::BitXor => Ok(Value::Boolean(l ^ r)),
            _ => Err(unsupported()),
        };
    }

    if result.is_floating() {
        let value = match (lhs.convert_to(result), rhs.convert_to(result)) {
            (Some(Value::Float(l)), Some(Value::Float(r))) => {
                float_op(operator, l, r).map(Value::Float)
            }
            (Some(Value::Double(l)), Some(Value::Double(r))) => {
                double_op(operator, l, r).map(Value::Double)
            }
            _ => return Err(EvaluateErrorKind::NonNumerics(lhs.clone(), rhs.clone())),
        };
        return value.ok_or_else(unsupported);
    }

    let (Some(l), Some(r)) = (lhs.as_i64(), rhs.as_i64()) else {
        return Err(EvaluateErrorKind::NonNumerics(lhs.clone(), rhs.clone()));
    };
    if matches!(
        operator,
        BinaryOperator::Divide | BinaryOperator::Remainder
    ) && r == 0
    {
        return Err(EvaluateErrorKind::DivisionByZero);
    }
    if result == PrimitiveType::Long {
        return long_op(operator, l, r)
            .map(Value::Long)
            .ok_or_else(unsupported);
    }
    // byte, short and char arithmetic happens in int and narrows afterwards.
    int_op(operator, l as i32, r as i32)
        .and_then(|v| Value::Int(v).convert_to(result))
        .ok_or_else(unsupported)
}

fn int_op(operator: BinaryOperator, l: i32, r: i32) -> Option<i32> {
    let distance = (r & 0x1f) as u32;
    let value = match operator {
        BinaryOperator::Add => l.wrapping_add(r),
        BinaryOperator::Subtract => l.wrapping_sub(r),
        BinaryOperator::Multiply => l.wrapping_mul(r),
        BinaryOperator::Divide => l.wrapping_div(r),
        BinaryOperator::Remainder => l.wrapping_rem(r),
        BinaryOperator::ShiftLeft => l.wrapping_shl(distance),
        BinaryOperator::ShiftRight => l.wrapping_shr(distance),
        BinaryOperator::UnsignedShiftRight => (l as u32).wrapping_shr(distance) as i32,
        BinaryOperator::BitAnd => l & r,
        BinaryOperator::BitOr => l | r,
        BinaryOperator::BitXor => l ^ r,
        _ => return None,
    };
    Some(value)
}

fn long_op(operator: BinaryOperator, l: i64, r: i64) -> Option<i64> {
    let distance = (r & 0x3f) as u32;
    let value = match operator {
        BinaryOperator::Add => l.wrapping_add(r),
        BinaryOperator::Subtract => l.wrapping_sub(r),
        BinaryOperator::Multiply => l.wrapping_mul(r),
        BinaryOperator::Divide => l.wrapping_div(r),
        BinaryOperator::Remainder => l.wrapping_rem(r),
        BinaryOperator::ShiftLeft => l.wrapping_shl(distance),
        BinaryOperator::ShiftRight => l.wrapping_shr(distance),
        BinaryOperator::UnsignedShiftRight => (l as u64).wrapping_shr(distance) as i64,
        BinaryOperator::BitAnd => l & r,
        BinaryOperator::BitOr => l | r,
        BinaryOperator::BitXor => l ^ r,
        _ => return None,
    };
    Some(value)
}

fn float_op(operator: BinaryOperator, l: f32, r: f32) -> Option<f32> {
    let value = match operator {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => l / r,
        BinaryOperator::Remainder => l % r,
        _ => return None,
    };
    Some(value)
}

fn double_op(operator: BinaryOperator, l: f64, r: f64) -> Option<f64> {
    let value = match operator {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => l / r,
        BinaryOperator::Remainder => l % r,
        _ => return None,
    };
    Some(value)
}
