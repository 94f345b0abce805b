pub mod formatter;

use crate::{
    string::TypeName,
    syntax::{
        types::{PrimitiveType, StaticType},
        Literal,
    },
};
use compact_str::CompactString;

/// Identity of an object living in the debuggee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// A handle to a debuggee object together with its runtime type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub id: ObjectId,
    pub type_name: TypeName,
}

impl ObjectRef {
    pub fn new(id: ObjectId, type_name: &str) -> Self {
        Self {
            id,
            type_name: type_name.into(),
        }
    }

    pub fn is_array(&self) -> bool {
        self.type_name.ends_with("[]")
    }
}

/// A class loaded in the debuggee.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub name: TypeName,
}

impl TypeRef {
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Null,
    Boolean(bool),
    Char(u16),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(CompactString),
    Object(ObjectRef),
    Type(TypeRef),
}

impl Value {
    pub fn string(value: &str) -> Self {
        Self::String(value.into())
    }

    pub fn from_literal(literal: &Literal) -> Option<Self> {
        let value = match literal {
            Literal::Null => Self::Null,
            Literal::Boolean(v) => Self::Boolean(*v),
            Literal::Char(c) => Self::Char(u16::try_from(*c as u32).ok()?),
            Literal::Int(v) => Self::Int(*v),
            Literal::Long(v) => Self::Long(*v),
            Literal::Float(v) => Self::Float(*v),
            Literal::Double(v) => Self::Double(*v),
            Literal::String(v) => Self::String(v.clone()),
            Literal::Malformed(_) => return None,
        };
        Some(value)
    }

    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        let primitive = match self {
            Self::Boolean(_) => PrimitiveType::Boolean,
            Self::Char(_) => PrimitiveType::Char,
            Self::Byte(_) => PrimitiveType::Byte,
            Self::Short(_) => PrimitiveType::Short,
            Self::Int(_) => PrimitiveType::Int,
            Self::Long(_) => PrimitiveType::Long,
            Self::Float(_) => PrimitiveType::Float,
            Self::Double(_) => PrimitiveType::Double,
            _ => return None,
        };
        Some(primitive)
    }

    /// Runtime type name, as the debuggee would report it.
    pub fn type_name(&self) -> CompactString {
        match self {
            Self::Void => "void".into(),
            Self::Null => "null".into(),
            Self::String(_) => crate::syntax::types::STRING.into(),
            Self::Object(object) => object.type_name.as_ref().into(),
            Self::Type(_) => "java.lang.Class".into(),
            primitive => primitive
                .primitive_type()
                .map(|p| p.keyword())
                .unwrap_or("?")
                .into(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Integral value widened to `i64`. Chars count as integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Char(v) => Some(*v as i64),
            Self::Byte(v) => Some(*v as i64),
            Self::Short(v) => Some(*v as i64),
            Self::Int(v) => Some(*v as i64),
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Whether the value can stand where a reference is expected.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::String(_) | Self::Object(_) | Self::Type(_)
        )
    }

    /// Primitive conversion with Java cast semantics. `None` for non-primitives
    /// and for boolean to numeric or back.
    pub fn convert_to(&self, target: PrimitiveType) -> Option<Value> {
        let source = self.primitive_type()?;
        if source == PrimitiveType::Boolean || target == PrimitiveType::Boolean {
            return (source == target).then(|| self.clone());
        }
        let value = if let Some(integral) = self.as_i64() {
            match target {
                PrimitiveType::Char => Value::Char(integral as u16),
                PrimitiveType::Byte => Value::Byte(integral as i8),
                PrimitiveType::Short => Value::Short(integral as i16),
                PrimitiveType::Int => Value::Int(integral as i32),
                PrimitiveType::Long => Value::Long(integral),
                PrimitiveType::Float => Value::Float(integral as f32),
                PrimitiveType::Double => Value::Double(integral as f64),
                PrimitiveType::Boolean => return None,
            }
        } else {
            let floating = self.as_f64()?;
            // Float to sub-int types goes through int first.
            match target {
                PrimitiveType::Char => Value::Char(floating as i32 as u16),
                PrimitiveType::Byte => Value::Byte(floating as i32 as i8),
                PrimitiveType::Short => Value::Short(floating as i32 as i16),
                PrimitiveType::Int => Value::Int(floating as i32),
                PrimitiveType::Long => Value::Long(floating as i64),
                PrimitiveType::Float => Value::Float(floating as f32),
                PrimitiveType::Double => Value::Double(floating),
                PrimitiveType::Boolean => return None,
            }
        };
        Some(value)
    }

    /// Whether a slot declared with `ty` can hold this value as is.
    pub fn fits(&self, ty: &StaticType) -> bool {
        match ty {
            StaticType::Primitive(p) => self.primitive_type() == Some(*p),
            StaticType::Void => matches!(self, Self::Void),
            StaticType::Null | StaticType::Class(_) | StaticType::Array(_) => self.is_reference(),
        }
    }
}

fn format_floating(f: &mut std::fmt::Formatter<'_>, value: f64) -> std::fmt::Result {
    if value.is_nan() {
        write!(f, "NaN")
    } else if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        write!(f, "{sign}Infinity")
    } else if value.fract() == 0.0 && value.abs() < 1e7 {
        write!(f, "{value:.1}")
    } else {
        write!(f, "{value}")
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Null => write!(f, "null"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Char(v) => match char::from_u32(*v as u32) {
                Some(c) => write!(f, "{c}"),
                None => write!(f, "\\u{v:04x}"),
            },
            Self::Byte(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => format_floating(f, *v as f64),
            Self::Double(v) => format_floating(f, *v),
            Self::String(v) => write!(f, "{v}"),
            Self::Object(object) => write!(f, "{}@{}", object.type_name, object.id),
            Self::Type(ty) => write!(f, "class {}", ty.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floating_values_render_like_the_jvm() {
        assert_eq!(Value::Double(1.0).to_string(), "1.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Double(f64::NEG_INFINITY).to_string(), "-Infinity");
    }

    #[test]
    fn casts_truncate_and_wrap() {
        assert_eq!(
            Value::Int(300).convert_to(PrimitiveType::Byte),
            Some(Value::Byte(44))
        );
        assert_eq!(
            Value::Double(-2.7).convert_to(PrimitiveType::Int),
            Some(Value::Int(-2))
        );
        assert_eq!(
            Value::Double(f64::NAN).convert_to(PrimitiveType::Long),
            Some(Value::Long(0))
        );
        assert_eq!(
            Value::Char(65).convert_to(PrimitiveType::Int),
            Some(Value::Int(65))
        );
        assert_eq!(Value::Boolean(true).convert_to(PrimitiveType::Int), None);
    }
}
