use super::{types::StaticType, Literal};
use crate::string::{IdentName, TypeName};
use compact_str::{format_compact, CompactString};
use serde::Deserialize;

/// Erased JVM method signature, e.g. `(ILjava/lang/String;)V`.
pub type Signature = CompactString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u32);

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassInfo {
    pub name: TypeName,
    /// Lexically enclosing class.
    #[serde(default)]
    pub outer: Option<ClassId>,
    #[serde(default)]
    pub super_class: Option<ClassId>,
    #[serde(default)]
    pub interfaces: Vec<ClassId>,
    #[serde(default)]
    pub anonymous: bool,
}

impl ClassInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            outer: None,
            super_class: None,
            interfaces: Vec::new(),
            anonymous: false,
        }
    }

    pub fn nested_in(mut self, outer: ClassId) -> Self {
        self.outer = Some(outer);
        self
    }

    pub fn extends(mut self, super_class: ClassId) -> Self {
        self.super_class = Some(super_class);
        self
    }

    pub fn implements(mut self, interface: ClassId) -> Self {
        self.interfaces.push(interface);
        self
    }
}

/// The classes visible to the type checker, indexed by [`ClassId`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ClassTable {
    classes: Vec<ClassInfo>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, info: ClassInfo) -> ClassId {
        self.classes.push(info);
        ClassId((self.classes.len() - 1) as u32)
    }

    pub fn get(&self, id: ClassId) -> Option<&ClassInfo> {
        self.classes.get(id.0 as usize)
    }

    pub fn name_of(&self, id: ClassId) -> Option<&TypeName> {
        self.get(id).map(|info| &info.name)
    }

    pub fn outer_of(&self, id: ClassId) -> Option<ClassId> {
        self.get(id).and_then(|info| info.outer)
    }

    pub fn find(&self, name: &str) -> Option<ClassId> {
        self.classes
            .iter()
            .position(|info| info.name.as_ref() == name)
            .map(|index| ClassId(index as u32))
    }

    /// Whether `class` strictly inherits from `base` through superclasses or interfaces.
    pub fn is_inheritor(&self, class: ClassId, base: ClassId) -> bool {
        let mut pending = vec![class];
        let mut seen = Vec::new();
        while let Some(current) = pending.pop() {
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);
            let Some(info) = self.get(current) else {
                continue;
            };
            for parent in info.super_class.iter().chain(info.interfaces.iter()) {
                if *parent == base {
                    return true;
                }
                pending.push(*parent);
            }
        }
        false
    }

    /// `None` when either class is not in the table.
    pub fn is_subtype_name(&self, sub: &str, sup: &str) -> Option<bool> {
        let sub = self.find(sub)?;
        let sup = self.find(sup)?;
        Some(sub == sup || self.is_inheritor(sub, sup))
    }

    /// Walks the lexical nesting chain starting at `start`, returning how many
    /// outer hops it took to reach a class accepted by `found`.
    pub fn count_hops(
        &self,
        start: Option<ClassId>,
        mut found: impl FnMut(ClassId) -> bool,
    ) -> Option<u32> {
        let mut hops = 0;
        let mut current = start;
        while let Some(class) = current {
            if found(class) {
                return Some(hops);
            }
            hops += 1;
            current = self.outer_of(class);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum VariableOwner {
    /// Declared inside a code fragment.
    Fragment(FragmentId),
    /// A local or parameter of a method whose innermost enclosing class is `class`.
    Method { class: ClassId },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VariableSymbol {
    pub name: IdentName,
    pub ty: StaticType,
    pub owner: VariableOwner,
    #[serde(default)]
    pub constant: Option<Literal>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldSymbol {
    pub name: IdentName,
    pub ty: StaticType,
    #[serde(default)]
    pub declaring_class: Option<ClassId>,
    #[serde(default)]
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MethodSymbol {
    pub name: IdentName,
    pub declaring_class: ClassId,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_constructor: bool,
    #[serde(default)]
    pub parameters: Vec<StaticType>,
    #[serde(default)]
    pub return_type: Option<StaticType>,
}

impl MethodSymbol {
    pub fn signature(&self) -> Signature {
        let parameters: String = self.parameters.iter().map(|p| p.descriptor()).collect();
        let return_type = if self.is_constructor {
            "V".to_string()
        } else {
            self.return_type
                .as_ref()
                .map(|ty| ty.descriptor())
                .unwrap_or_else(|| "V".into())
        };
        format_compact!("({parameters}){return_type}")
    }
}

/// What a name resolved to during type checking.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum Symbol {
    Variable(VariableSymbol),
    Field(FieldSymbol),
    Class(ClassId),
}

/// The breakpoint location an evaluation is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    /// Class whose code is executing at `line`.
    #[serde(default)]
    pub class: Option<ClassId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::types::PrimitiveType;

    #[test]
    fn hops_count_outward() {
        let mut classes = ClassTable::new();
        let outer = classes.declare(ClassInfo::new("demo.Outer"));
        let middle = classes.declare(ClassInfo::new("demo.Outer$Middle").nested_in(outer));
        let inner = classes.declare(ClassInfo::new("demo.Outer$Middle$Inner").nested_in(middle));

        assert_eq!(classes.count_hops(Some(inner), |c| c == outer), Some(2));
        assert_eq!(classes.count_hops(Some(inner), |c| c == inner), Some(0));
        assert_eq!(classes.count_hops(Some(outer), |c| c == inner), None);
    }

    #[test]
    fn inheritance_follows_interfaces() {
        let mut classes = ClassTable::new();
        let shape = classes.declare(ClassInfo::new("demo.Shape"));
        let base = classes.declare(ClassInfo::new("demo.Base").implements(shape));
        let derived = classes.declare(ClassInfo::new("demo.Derived").extends(base));

        assert!(classes.is_inheritor(derived, shape));
        assert!(!classes.is_inheritor(shape, derived));
        assert!(!classes.is_inheritor(shape, shape));
        assert_eq!(classes.is_subtype_name("demo.Derived", "demo.Shape"), Some(true));
        assert_eq!(classes.is_subtype_name("demo.Derived", "demo.Missing"), None);
    }

    #[test]
    fn constructor_signatures_return_void() {
        let constructor = MethodSymbol {
            name: "<init>".into(),
            declaring_class: ClassId(0),
            is_static: false,
            is_constructor: true,
            parameters: vec![
                StaticType::Primitive(PrimitiveType::Int),
                StaticType::string(),
            ],
            return_type: None,
        };
        assert_eq!(constructor.signature(), "(ILjava/lang/String;)V");
    }
}
