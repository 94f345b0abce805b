use super::{SandboxContext, BOXED_VALUE};
use crate::{
    context::Receiver,
    evaluator::{
        error::{EvaluateError, EvaluateErrorKind},
        operator::values_equal,
    },
    string::IdentName,
    value::Value,
};
use compact_str::format_compact;

/// A method body implemented on the host side.
pub trait NativeMethod {
    fn get_name(&self) -> &'static str;

    fn call(
        &self,
        context: &mut SandboxContext,
        receiver: &Receiver,
        arguments: &[Value],
    ) -> Result<Value, EvaluateError>;
}

impl<F> NativeMethod for F
where
    F: Fn(&mut SandboxContext, &Receiver, &[Value]) -> Result<Value, EvaluateError>,
{
    fn get_name(&self) -> &'static str {
        "native closure"
    }

    fn call(
        &self,
        context: &mut SandboxContext,
        receiver: &Receiver,
        arguments: &[Value],
    ) -> Result<Value, EvaluateError> {
        self(context, receiver, arguments)
    }
}

/// Always returns the same value.
#[derive(Debug)]
pub struct NativeConstant(pub Value);

impl NativeMethod for NativeConstant {
    fn get_name(&self) -> &'static str {
        "constant"
    }

    fn call(
        &self,
        _context: &mut SandboxContext,
        _receiver: &Receiver,
        _arguments: &[Value],
    ) -> Result<Value, EvaluateError> {
        Ok(self.0.clone())
    }
}

/// Returns a field of the receiver, like a generated getter.
#[derive(Debug)]
pub struct NativeGetter(pub IdentName);

impl NativeMethod for NativeGetter {
    fn get_name(&self) -> &'static str {
        "getter"
    }

    fn call(
        &self,
        context: &mut SandboxContext,
        receiver: &Receiver,
        _arguments: &[Value],
    ) -> Result<Value, EvaluateError> {
        match receiver {
            Receiver::Instance(Value::Object(object)) => {
                context.field(object, &self.0).ok_or_else(|| {
                    EvaluateErrorKind::FieldNotFound {
                        owner: object.type_name.as_ref().into(),
                        name: self.0.clone(),
                    }
                    .into()
                })
            }
            Receiver::Static(ty) => context.static_field(&ty.name, &self.0).ok_or_else(|| {
                EvaluateErrorKind::FieldNotFound {
                    owner: ty.name.as_ref().into(),
                    name: self.0.clone(),
                }
                .into()
            }),
            Receiver::Instance(other) => Err(EvaluateErrorKind::NotAnObject(other.clone()).into()),
        }
    }
}

/// Returns the argument at the given position.
#[derive(Debug)]
pub struct NativeArgument(pub usize);

impl NativeMethod for NativeArgument {
    fn get_name(&self) -> &'static str {
        "argument"
    }

    fn call(
        &self,
        _context: &mut SandboxContext,
        _receiver: &Receiver,
        arguments: &[Value],
    ) -> Result<Value, EvaluateError> {
        arguments.get(self.0).cloned().ok_or_else(|| {
            EvaluateErrorKind::InvocationFailed(format_compact!(
                "java.lang.IllegalArgumentException: missing argument {}",
                self.0
            ))
            .into()
        })
    }
}

#[derive(Debug)]
pub struct NativeToString;

impl NativeMethod for NativeToString {
    fn get_name(&self) -> &'static str {
        "toString"
    }

    fn call(
        &self,
        context: &mut SandboxContext,
        receiver: &Receiver,
        _arguments: &[Value],
    ) -> Result<Value, EvaluateError> {
        match receiver {
            Receiver::Instance(Value::Object(object)) => match context.field(object, BOXED_VALUE) {
                Some(boxed) if object.type_name.starts_with("java.lang.") => {
                    Ok(Value::String(format_compact!("{boxed}")))
                }
                _ => Ok(Value::String(format_compact!(
                    "{}@{}",
                    object.type_name,
                    object.id
                ))),
            },
            Receiver::Instance(value) => Ok(Value::String(format_compact!("{value}"))),
            Receiver::Static(ty) => Ok(Value::String(format_compact!("class {}", ty.name))),
        }
    }
}

#[derive(Debug)]
pub struct NativeEquals;

impl NativeMethod for NativeEquals {
    fn get_name(&self) -> &'static str {
        "equals"
    }

    fn call(
        &self,
        _context: &mut SandboxContext,
        receiver: &Receiver,
        arguments: &[Value],
    ) -> Result<Value, EvaluateError> {
        let (Receiver::Instance(receiver), Some(other)) = (receiver, arguments.first()) else {
            return Ok(Value::Boolean(false));
        };
        Ok(Value::Boolean(values_equal(receiver, other)))
    }
}

#[derive(Debug)]
pub struct NativeHashCode;

impl NativeMethod for NativeHashCode {
    fn get_name(&self) -> &'static str {
        "hashCode"
    }

    fn call(
        &self,
        _context: &mut SandboxContext,
        receiver: &Receiver,
        _arguments: &[Value],
    ) -> Result<Value, EvaluateError> {
        let hash = match receiver {
            Receiver::Instance(Value::Object(object)) => object.id.0 as i32,
            Receiver::Instance(Value::String(text)) => text
                .encode_utf16()
                .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32)),
            _ => 0,
        };
        Ok(Value::Int(hash))
    }
}

#[derive(Debug)]
pub struct NativeStringLength;

impl NativeMethod for NativeStringLength {
    fn get_name(&self) -> &'static str {
        "length"
    }

    fn call(
        &self,
        _context: &mut SandboxContext,
        receiver: &Receiver,
        _arguments: &[Value],
    ) -> Result<Value, EvaluateError> {
        match receiver {
            Receiver::Instance(Value::String(text)) => {
                Ok(Value::Int(text.encode_utf16().count() as i32))
            }
            Receiver::Instance(other) => Err(EvaluateErrorKind::NotAnObject(other.clone()).into()),
            Receiver::Static(ty) => Err(EvaluateErrorKind::MethodNotFound {
                owner: ty.name.as_ref().into(),
                name: "length".into(),
            }
            .into()),
        }
    }
}

#[derive(Debug)]
pub struct NativeCharAt;

impl NativeMethod for NativeCharAt {
    fn get_name(&self) -> &'static str {
        "charAt"
    }

    fn call(
        &self,
        _context: &mut SandboxContext,
        receiver: &Receiver,
        arguments: &[Value],
    ) -> Result<Value, EvaluateError> {
        let Receiver::Instance(Value::String(text)) = receiver else {
            return Err(EvaluateErrorKind::MethodNotFound {
                owner: "java.lang.Object".into(),
                name: "charAt".into(),
            }
            .into());
        };
        let index = arguments
            .first()
            .and_then(Value::as_i64)
            .ok_or_else(|| EvaluateErrorKind::InvocationFailed("missing index".into()))?;
        let units: Vec<u16> = text.encode_utf16().collect();
        usize::try_from(index)
            .ok()
            .and_then(|index| units.get(index))
            .map(|unit| Value::Char(*unit))
            .ok_or_else(|| {
                EvaluateErrorKind::InvocationFailed(format_compact!(
                    "java.lang.StringIndexOutOfBoundsException: index {index}, length {}",
                    units.len()
                ))
                .into()
            })
    }
}

/// Methods every receiver answers when no user definition matches.
pub fn builtin(name: &str, receiver: &Receiver) -> Option<&'static dyn NativeMethod> {
    let is_string = matches!(receiver, Receiver::Instance(Value::String(_)));
    match name {
        "toString" => Some(&NativeToString),
        "equals" => Some(&NativeEquals),
        "hashCode" => Some(&NativeHashCode),
        "length" if is_string => Some(&NativeStringLength),
        "charAt" if is_string => Some(&NativeCharAt),
        _ => None,
    }
}
