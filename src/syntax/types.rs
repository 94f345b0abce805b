use super::symbol::ClassTable;
use crate::{string::TypeName, value::Value};
use serde::Deserialize;

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 8] = [
        PrimitiveType::Boolean,
        PrimitiveType::Char,
        PrimitiveType::Byte,
        PrimitiveType::Short,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Char => "char",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    pub fn descriptor(&self) -> char {
        match self {
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Char => 'C',
            PrimitiveType::Byte => 'B',
            PrimitiveType::Short => 'S',
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Float => 'F',
            PrimitiveType::Double => 'D',
        }
    }

    pub fn boxed_name(&self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "java.lang.Boolean",
            PrimitiveType::Char => "java.lang.Character",
            PrimitiveType::Byte => "java.lang.Byte",
            PrimitiveType::Short => "java.lang.Short",
            PrimitiveType::Int => "java.lang.Integer",
            PrimitiveType::Long => "java.lang.Long",
            PrimitiveType::Float => "java.lang.Float",
            PrimitiveType::Double => "java.lang.Double",
        }
    }

    pub fn from_boxed_name(name: &str) -> Option<PrimitiveType> {
        Self::ALL.into_iter().find(|p| p.boxed_name() == name)
    }

    /// Whether a boxed value of this type can be assigned to `class`.
    pub fn boxes_to(&self, class: &str) -> bool {
        class == self.boxed_name()
            || matches!(class, OBJECT | "java.io.Serializable" | "java.lang.Comparable")
            || (class == "java.lang.Number"
                && !matches!(self, PrimitiveType::Boolean | PrimitiveType::Char))
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, PrimitiveType::Boolean)
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            PrimitiveType::Char
                | PrimitiveType::Byte
                | PrimitiveType::Short
                | PrimitiveType::Int
                | PrimitiveType::Long
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }

    /// Identity or widening primitive conversion.
    pub fn widens_to(&self, target: PrimitiveType) -> bool {
        use PrimitiveType::*;
        if *self == target {
            return true;
        }
        match self {
            Byte => matches!(target, Short | Int | Long | Float | Double),
            Short | Char => matches!(target, Int | Long | Float | Double),
            Int => matches!(target, Long | Float | Double),
            Long => matches!(target, Float | Double),
            Float => matches!(target, Double),
            Double | Boolean => false,
        }
    }

    /// Whether an `int` constant may be narrowed into this type on assignment.
    pub fn holds_constant(&self, value: i64) -> bool {
        match self {
            PrimitiveType::Byte => i8::try_from(value).is_ok(),
            PrimitiveType::Short => i16::try_from(value).is_ok(),
            PrimitiveType::Char => u16::try_from(value).is_ok(),
            PrimitiveType::Int => i32::try_from(value).is_ok(),
            PrimitiveType::Long | PrimitiveType::Float | PrimitiveType::Double => true,
            PrimitiveType::Boolean => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub enum StaticType {
    Primitive(PrimitiveType),
    Void,
    Null,
    Class(TypeName),
    Array(Box<StaticType>),
}

impl StaticType {
    pub fn class(name: &str) -> Self {
        Self::Class(name.into())
    }

    pub fn string() -> Self {
        Self::class(STRING)
    }

    pub fn object() -> Self {
        Self::class(OBJECT)
    }

    pub fn array_of(element: StaticType) -> Self {
        Self::Array(Box::new(element))
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            Self::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// The primitive a boxed class unboxes to, or the type itself.
    pub fn unboxed(&self) -> StaticType {
        match self {
            Self::Class(name) => PrimitiveType::from_boxed_name(name)
                .map(Self::Primitive)
                .unwrap_or_else(|| self.clone()),
            other => other.clone(),
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::Class(name) if name.as_ref() == STRING)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Class(_) | Self::Array(_) | Self::Null)
    }

    pub fn element_type(&self) -> Option<&StaticType> {
        match self {
            Self::Array(element) => Some(element),
            _ => None,
        }
    }

    pub fn canonical_text(&self) -> String {
        self.to_string()
    }

    pub fn descriptor(&self) -> String {
        match self {
            Self::Primitive(p) => p.descriptor().to_string(),
            Self::Void => "V".into(),
            Self::Null | Self::Class(_) => {
                let name = match self {
                    Self::Class(name) => name.as_ref(),
                    _ => OBJECT,
                };
                format!("L{};", name.replace('.', "/"))
            }
            Self::Array(element) => format!("[{}", element.descriptor()),
        }
    }

    pub fn default_value(&self) -> Value {
        match self {
            Self::Primitive(p) => match p {
                PrimitiveType::Boolean => Value::Boolean(false),
                PrimitiveType::Char => Value::Char(0),
                PrimitiveType::Byte => Value::Byte(0),
                PrimitiveType::Short => Value::Short(0),
                PrimitiveType::Int => Value::Int(0),
                PrimitiveType::Long => Value::Long(0),
                PrimitiveType::Float => Value::Float(0.0),
                PrimitiveType::Double => Value::Double(0.0),
            },
            Self::Void => Value::Void,
            Self::Null | Self::Class(_) | Self::Array(_) => Value::Null,
        }
    }

    /// Whether a value of static type `source` can be assigned to `self` without a cast.
    ///
    /// Classes unknown to `classes` are assumed compatible, since the type
    /// checker already accepted the expression.
    pub fn is_assignable_from(&self, source: &StaticType, classes: &ClassTable) -> bool {
        match (self, source) {
            (Self::Primitive(target), Self::Primitive(source)) => source.widens_to(*target),
            (Self::Class(_) | Self::Array(_), Self::Null) => true,
            (Self::Class(target), Self::Primitive(source)) => source.boxes_to(target),
            (Self::Primitive(target), Self::Class(source)) => {
                PrimitiveType::from_boxed_name(source).is_some_and(|s| s.widens_to(*target))
            }
            (Self::Class(target), Self::Class(source)) => {
                target.as_ref() == OBJECT
                    || target == source
                    || classes.is_subtype_name(source, target).unwrap_or(true)
            }
            (Self::Class(target), Self::Array(_)) => matches!(
                target.as_ref(),
                OBJECT | "java.lang.Cloneable" | "java.io.Serializable"
            ),
            (Self::Array(target), Self::Array(source)) => match (target.as_ref(), source.as_ref()) {
                (Self::Primitive(t), Self::Primitive(s)) => t == s,
                (t, s) if t.is_reference() && s.is_reference() => t.is_assignable_from(s, classes),
                _ => false,
            },
            _ => false,
        }
    }
}

impl std::fmt::Display for StaticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{}", p.keyword()),
            Self::Void => write!(f, "void"),
            Self::Null => write!(f, "null"),
            Self::Class(name) => write!(f, "{name}"),
            Self::Array(element) => write!(f, "{element}[]"),
        }
    }
}
