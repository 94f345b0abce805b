use super::Value;

pub trait ValueFormatter {
    fn format(&self, value: &Value) -> String;
}

pub struct DebugFormatter;

impl ValueFormatter for DebugFormatter {
    fn format(&self, value: &Value) -> String {
        format!("{value:?}")
    }
}

/// Renders values the way `String.valueOf` would.
pub struct BasicFormatter;

impl ValueFormatter for BasicFormatter {
    fn format(&self, value: &Value) -> String {
        format!("{value}")
    }
}

/// Renders values with their runtime type, as a watch row does.
pub struct TypedFormatter;

impl ValueFormatter for TypedFormatter {
    fn format(&self, value: &Value) -> String {
        match value {
            Value::Void => "void".into(),
            Value::Null => "null".into(),
            Value::String(v) => format!("java.lang.String \"{}\"", v.escape_debug()),
            Value::Char(_) => format!("char '{value}'"),
            Value::Object(object) => format!("{} @{}", object.type_name, object.id),
            Value::Type(ty) => format!("java.lang.Class {}", ty.name),
            primitive => format!("{} {primitive}", primitive.type_name()),
        }
    }
}
