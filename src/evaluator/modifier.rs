use super::{
    error::{EvaluateError, EvaluateErrorKind},
    fragment::SyntheticFrame,
};
use crate::{
    context::{EvaluationContext, FieldOwner},
    string::{IdentName, TypeName},
    syntax::types::{PrimitiveType, StaticType},
    value::{ObjectRef, Value},
};
use compact_str::ToCompactString;

/// Storage location an assignable expression evaluated to.
#[derive(Debug, Clone)]
pub enum Target {
    Local {
        name: IdentName,
    },
    Synthetic {
        frame: SyntheticFrame,
        name: IdentName,
    },
    Field {
        owner: FieldOwner,
        declaring: Option<TypeName>,
        name: IdentName,
    },
    ArrayElement {
        array: ObjectRef,
        index: i32,
    },
}

/// What an inspector row would show for a [`Modifier`].
#[derive(Debug, Clone, PartialEq)]
pub enum TargetDescriptor {
    LocalVariable { name: IdentName },
    SyntheticVariable { name: IdentName },
    Field { owner: FieldOwner, name: IdentName },
    ArrayElement { array: ObjectRef, index: i32 },
}

impl std::fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LocalVariable { name } => write!(f, "local variable {name}"),
            Self::SyntheticVariable { name } => write!(f, "synthetic variable {name}"),
            Self::Field { owner, name } => write!(f, "field {}.{name}", owner.type_name()),
            Self::ArrayElement { array, index } => {
                write!(f, "element [{index}] of {}@{}", array.type_name, array.id)
            }
        }
    }
}

/// Write access to the location an expression was read from.
///
/// Only valid for the evaluation that produced it.
#[derive(Debug, Clone)]
pub struct Modifier {
    target: Target,
    expected_type: Option<StaticType>,
}

impl Modifier {
    pub fn new(target: Target, expected_type: Option<StaticType>) -> Self {
        Self {
            target,
            expected_type,
        }
    }

    pub fn can_inspect(&self) -> bool {
        true
    }

    pub fn can_set_value(&self) -> bool {
        true
    }

    pub fn expected_type(&self) -> Option<&StaticType> {
        self.expected_type.as_ref()
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn descriptor(&self) -> TargetDescriptor {
        match &self.target {
            Target::Local { name } => TargetDescriptor::LocalVariable { name: name.clone() },
            Target::Synthetic { name, .. } => {
                TargetDescriptor::SyntheticVariable { name: name.clone() }
            }
            Target::Field { owner, name, .. } => TargetDescriptor::Field {
                owner: owner.clone(),
                name: name.clone(),
            },
            Target::ArrayElement { array, index } => TargetDescriptor::ArrayElement {
                array: array.clone(),
                index: *index,
            },
        }
    }

    /// Stores `value`, converting primitives to the target's type, and returns what was stored.
    pub fn set_value<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
        value: Value,
    ) -> Result<Value, EvaluateError> {
        let value = coerce(context, value, self.expected_type.as_ref())?;
        match &self.target {
            Target::Local { name } => context.write_local(name, value.clone())?,
            Target::Synthetic { frame, name } => frame.assign(name, value.clone())?,
            Target::Field {
                owner,
                declaring,
                name,
            } => context.write_field(owner, declaring.as_deref(), name, value.clone())?,
            Target::ArrayElement { array, index } => {
                context.write_array(array, *index, value.clone())?
            }
        }
        Ok(value)
    }
}

/// Widening always applies. Narrowing applies only when the value survives it.
/// Primitives box on their way into references and unbox on their way out.
pub fn coerce<C: EvaluationContext + ?Sized>(
    context: &mut C,
    value: Value,
    expected: Option<&StaticType>,
) -> Result<Value, EvaluateError> {
    let Some(expected) = expected else {
        return Ok(value);
    };
    let mismatch = |value: &Value| -> EvaluateError {
        EvaluateErrorKind::TypeMismatch {
            expected: expected.to_compact_string(),
            actual: value.type_name(),
        }
        .into()
    };
    match expected {
        StaticType::Primitive(target) => {
            if value == Value::Null {
                return Err(EvaluateErrorKind::NullPointer("unboxing".into()).into());
            }
            let value = unbox(context, value)?;
            convert_losslessly(&value, *target).ok_or_else(|| mismatch(&value))
        }
        StaticType::Class(name) => {
            let Some(source) = value.primitive_type() else {
                return if value.is_reference() {
                    Ok(value)
                } else {
                    Err(mismatch(&value))
                };
            };
            let boxed = match PrimitiveType::from_boxed_name(name) {
                Some(target) => convert_losslessly(&value, target),
                None => source.boxes_to(name).then(|| value.clone()),
            }
            .ok_or_else(|| mismatch(&value))?;
            Ok(Value::Object(context.box_value(&boxed)?))
        }
        StaticType::Array(_) | StaticType::Null => {
            if value.is_reference() {
                Ok(value)
            } else {
                Err(mismatch(&value))
            }
        }
        StaticType::Void => Ok(value),
    }
}

fn convert_losslessly(value: &Value, target: PrimitiveType) -> Option<Value> {
    let source = value.primitive_type()?;
    let lossless = source.widens_to(target)
        || (target.is_integral() && value.as_i64().is_some_and(|v| target.holds_constant(v)));
    if !lossless {
        return None;
    }
    value.convert_to(target)
}

/// The primitive inside a boxed object; any other value comes back unchanged.
pub fn unbox<C: EvaluationContext + ?Sized>(
    context: &mut C,
    value: Value,
) -> Result<Value, EvaluateError> {
    match &value {
        Value::Object(object) => Ok(context.unbox_value(object)?.unwrap_or(value)),
        _ => Ok(value),
    }
}
