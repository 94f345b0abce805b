//! An in-process stand-in for a suspended debuggee.
//!
//! Holds a class registry, host-implemented methods, one frame of locals and a
//! collected heap. Enough to run compiled evaluators without a real VM.

mod heap;
pub mod native;

use crate::{
    context::{EvaluationContext, FieldOwner, Invocation, Receiver},
    evaluator::error::{EvaluateError, EvaluateErrorKind},
    string::{IdentName, TypeName},
    syntax::{
        symbol::Signature,
        types::{PrimitiveType, StaticType, OBJECT, STRING},
    },
    value::{ObjectId, ObjectRef, TypeRef, Value},
};
use compact_str::{format_compact, CompactString};
use heap::Heap;
use native::NativeMethod;
use serde::Deserialize;
use std::{
    collections::{HashMap, HashSet},
    rc::Rc,
};

const OUTER_PREFIX: &str = "this$";
const CONSTRUCTOR: &str = "<init>";
/// Field holding the primitive inside a `java.lang` box.
pub const BOXED_VALUE: &str = "value";
/// Guards super chain walks against cyclic class definitions.
const MAX_HIERARCHY_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldDeclaration {
    pub name: IdentName,
    pub ty: StaticType,
    #[serde(default)]
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SandboxClass {
    pub name: TypeName,
    #[serde(default)]
    pub super_class: Option<TypeName>,
    #[serde(default)]
    pub interfaces: Vec<TypeName>,
    #[serde(default)]
    pub fields: Vec<FieldDeclaration>,
}

impl SandboxClass {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            super_class: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn extends(mut self, super_class: &str) -> Self {
        self.super_class = Some(super_class.into());
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_field(mut self, name: &str, ty: StaticType) -> Self {
        self.fields.push(FieldDeclaration {
            name: name.into(),
            ty,
            is_static: false,
        });
        self
    }

    pub fn with_static_field(mut self, name: &str, ty: StaticType) -> Self {
        self.fields.push(FieldDeclaration {
            name: name.into(),
            ty,
            is_static: true,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeapObject {
    Instance {
        class: TypeName,
        fields: HashMap<IdentName, Value>,
    },
    Array {
        element_type: StaticType,
        elements: Vec<Value>,
    },
}

impl HeapObject {
    fn references(&self) -> Vec<ObjectId> {
        let values: Box<dyn Iterator<Item = &Value>> = match self {
            HeapObject::Instance { fields, .. } => Box::new(fields.values()),
            HeapObject::Array { elements, .. } => Box::new(elements.iter()),
        };
        values
            .filter_map(|value| value.as_object().map(|object| object.id))
            .collect()
    }
}

struct MethodEntry {
    signature: Option<Signature>,
    body: Rc<dyn NativeMethod>,
}

#[derive(Default)]
pub struct SandboxContext {
    classes: HashMap<TypeName, SandboxClass>,
    methods: HashMap<(TypeName, CompactString), Vec<MethodEntry>>,
    heap: Heap<HeapObject>,
    locals: HashMap<IdentName, Value>,
    this: Option<ObjectRef>,
    statics: HashMap<TypeName, HashMap<IdentName, Value>>,
    pins: HashSet<ObjectId>,
    calls: Vec<CompactString>,
}

// Setup
impl SandboxContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_class(&mut self, class: SandboxClass) {
        let statics = class
            .fields
            .iter()
            .filter(|field| field.is_static)
            .map(|field| (field.name.clone(), field.ty.default_value()))
            .collect();
        tracing::debug!(class = %class.name, "defined sandbox class");
        self.statics.insert(class.name.clone(), statics);
        self.classes.insert(class.name.clone(), class);
    }

    /// Registers a method body. A `None` signature matches every overload.
    pub fn define_method(
        &mut self,
        class: &str,
        name: &str,
        signature: Option<&str>,
        body: impl NativeMethod + 'static,
    ) {
        self.methods
            .entry((class.into(), name.into()))
            .or_default()
            .push(MethodEntry {
                signature: signature.map(Signature::from),
                body: Rc::new(body),
            });
    }

    pub fn declare_local(&mut self, name: &str, value: Value) {
        self.locals.insert(name.into(), value);
    }

    pub fn set_this(&mut self, object: ObjectRef) {
        self.this = Some(object);
    }

    /// Allocates an instance with default field values, without running a constructor.
    pub fn allocate_instance(&mut self, class: &str) -> Result<ObjectRef, EvaluateError> {
        let fields = self
            .class_chain(class)?
            .into_iter()
            .flat_map(|class| class.fields.iter())
            .filter(|field| !field.is_static)
            .map(|field| (field.name.clone(), field.ty.default_value()))
            .collect();
        let id = self.heap.allocate(HeapObject::Instance {
            class: class.into(),
            fields,
        });
        tracing::trace!(class, %id, "allocated instance");
        Ok(ObjectRef::new(id, class))
    }

    pub fn allocate_array(&mut self, element_type: StaticType, elements: Vec<Value>) -> ObjectRef {
        let type_name = StaticType::array_of(element_type.clone()).canonical_text();
        let id = self.heap.allocate(HeapObject::Array {
            element_type,
            elements,
        });
        ObjectRef::new(id, &type_name)
    }

    pub fn set_field(
        &mut self,
        object: &ObjectRef,
        name: &str,
        value: Value,
    ) -> Result<(), EvaluateError> {
        let owner = FieldOwner::Instance(object.clone());
        self.write_field(&owner, None, name, value)
    }

    pub fn set_static(&mut self, class: &str, name: &str, value: Value) -> Result<(), EvaluateError> {
        let owner = FieldOwner::Static(TypeRef::new(class));
        self.write_field(&owner, None, name, value)
    }
}

// Inspection
impl SandboxContext {
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    /// Frame locals ordered by name.
    pub fn locals(&self) -> Vec<(&IdentName, &Value)> {
        let mut locals: Vec<_> = self.locals.iter().collect();
        locals.sort_by(|(a, _), (b, _)| a.cmp(b));
        locals
    }

    pub fn field(&self, object: &ObjectRef, name: &str) -> Option<Value> {
        match self.heap.get(object.id)? {
            HeapObject::Instance { fields, .. } => fields.get(name).cloned(),
            HeapObject::Array { .. } => None,
        }
    }

    pub fn static_field(&self, class: &str, name: &str) -> Option<Value> {
        self.statics.get(class)?.get(name).cloned()
    }

    pub fn array_elements(&self, array: &ObjectRef) -> Option<&[Value]> {
        match self.heap.get(array.id)? {
            HeapObject::Array { elements, .. } => Some(elements),
            HeapObject::Instance { .. } => None,
        }
    }

    /// Every invocation so far as `Class.method`, in call order.
    pub fn calls(&self) -> &[CompactString] {
        &self.calls
    }

    pub fn is_alive(&self, object: &ObjectRef) -> bool {
        self.heap.is_alive(object.id)
    }

    pub fn live_objects(&self) -> usize {
        self.heap.live_count()
    }

    pub fn pinned(&self) -> &HashSet<ObjectId> {
        &self.pins
    }

    /// Ends the suspend session's pins, making evaluation results collectable.
    pub fn release_pins(&mut self) {
        self.pins.clear();
    }

    /// Frees every object unreachable from locals, `this`, statics and pins.
    pub fn collect_garbage(&mut self) -> usize {
        let roots: Vec<ObjectId> = self
            .locals
            .values()
            .chain(self.statics.values().flat_map(|fields| fields.values()))
            .filter_map(|value| value.as_object().map(|object| object.id))
            .chain(self.this.as_ref().map(|object| object.id))
            .chain(self.pins.iter().copied())
            .collect();
        let freed = self.heap.collect(roots, HeapObject::references);
        tracing::debug!(freed, live = self.heap.live_count(), "collected garbage");
        freed
    }
}

// Hierarchy
impl SandboxContext {
    fn is_known_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
            || name.starts_with("java.")
            || name.ends_with("[]")
            || PrimitiveType::ALL.iter().any(|p| p.keyword() == name)
    }

    /// The class and its registered superclasses, most derived first.
    fn class_chain(&self, name: &str) -> Result<Vec<&SandboxClass>, EvaluateError> {
        if !self.is_known_class(name) {
            return Err(EvaluateErrorKind::ClassNotLoaded(name.into()).into());
        }
        let mut chain = Vec::new();
        let mut current = self.classes.get(name);
        while let Some(class) = current {
            if chain.len() >= MAX_HIERARCHY_DEPTH {
                break;
            }
            chain.push(class);
            current = class
                .super_class
                .as_ref()
                .and_then(|super_class| self.classes.get(super_class));
        }
        Ok(chain)
    }

    fn class_names(&self, name: &str) -> Vec<TypeName> {
        let mut names: Vec<TypeName> = vec![name.into()];
        let mut current = self.classes.get(name);
        while let Some(class) = current {
            let Some(super_class) = &class.super_class else {
                break;
            };
            if names.len() >= MAX_HIERARCHY_DEPTH || names.contains(super_class) {
                break;
            }
            names.push(super_class.clone());
            current = self.classes.get(super_class);
        }
        names
    }

    fn is_subclass(&self, class: &str, ancestor: &str) -> bool {
        if ancestor == OBJECT || class == ancestor {
            return true;
        }
        if let Some(primitive) = PrimitiveType::from_boxed_name(class) {
            return primitive.boxes_to(ancestor);
        }
        let mut pending = vec![TypeName::from(class)];
        let mut seen = HashSet::new();
        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(info) = self.classes.get(&current) else {
                continue;
            };
            for parent in info.super_class.iter().chain(info.interfaces.iter()) {
                if parent.as_ref() == ancestor {
                    return true;
                }
                pending.push(parent.clone());
            }
        }
        false
    }

    fn object(&self, object: &ObjectRef) -> Result<&HeapObject, EvaluateError> {
        self.heap.get(object.id).ok_or_else(|| collected(object))
    }

    fn object_mut(&mut self, object: &ObjectRef) -> Result<&mut HeapObject, EvaluateError> {
        self.heap.get_mut(object.id).ok_or_else(|| collected(object))
    }

    fn array(&self, array: &ObjectRef) -> Result<&Vec<Value>, EvaluateError> {
        match self.object(array)? {
            HeapObject::Array { elements, .. } => Ok(elements),
            HeapObject::Instance { .. } => {
                Err(EvaluateErrorKind::NotAnArray(Value::Object(array.clone())).into())
            }
        }
    }

    /// The class declaring static `name`, searched from `class` upwards.
    fn static_owner(&self, class: &str, name: &str) -> Option<TypeName> {
        self.class_names(class).into_iter().find(|candidate| {
            self.statics
                .get(candidate)
                .is_some_and(|fields| fields.contains_key(name))
        })
    }

    fn find_method(
        &self,
        start: &str,
        name: &str,
        signature: Option<&str>,
    ) -> Option<Rc<dyn NativeMethod>> {
        self.class_names(start).into_iter().find_map(|class| {
            let entries = self.methods.get(&(class, CompactString::from(name)))?;
            entries
                .iter()
                .find(|entry| match (&entry.signature, signature) {
                    (Some(defined), Some(requested)) => defined == requested,
                    _ => true,
                })
                .map(|entry| entry.body.clone())
        })
    }
}

fn collected(object: &ObjectRef) -> EvaluateError {
    EvaluateErrorKind::NullPointer(format_compact!(
        "collected object {}@{}",
        object.type_name,
        object.id
    ))
    .into()
}

fn check_index(index: i32, length: usize) -> Result<usize, EvaluateError> {
    usize::try_from(index)
        .ok()
        .filter(|index| *index < length)
        .ok_or_else(|| {
            EvaluateErrorKind::ArrayIndexOutOfBounds {
                index,
                length: length as i32,
            }
            .into()
        })
}

impl EvaluationContext for SandboxContext {
    fn read_local(&mut self, name: &str) -> Result<Value, EvaluateError> {
        self.locals
            .get(name)
            .cloned()
            .ok_or_else(|| EvaluateErrorKind::VariableNotFound(name.into()).into())
    }

    fn write_local(&mut self, name: &str, value: Value) -> Result<(), EvaluateError> {
        match self.locals.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(EvaluateErrorKind::VariableNotFound(name.into()).into()),
        }
    }

    fn this_object(&mut self) -> Result<Option<ObjectRef>, EvaluateError> {
        Ok(self.this.clone())
    }

    fn outer_instance(&mut self, object: &ObjectRef) -> Result<Option<ObjectRef>, EvaluateError> {
        let HeapObject::Instance { fields, .. } = self.object(object)? else {
            return Ok(None);
        };
        let outer = fields
            .iter()
            .filter(|(name, _)| name.starts_with(OUTER_PREFIX))
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .and_then(|(_, value)| value.as_object().cloned());
        Ok(outer)
    }

    fn resolve_class(&mut self, name: &str) -> Result<TypeRef, EvaluateError> {
        if self.is_known_class(name) {
            Ok(TypeRef::new(name))
        } else {
            Err(EvaluateErrorKind::ClassNotLoaded(name.into()).into())
        }
    }

    fn read_field(
        &mut self,
        owner: &FieldOwner,
        declaring: Option<&str>,
        name: &str,
    ) -> Result<Value, EvaluateError> {
        let not_found = || -> EvaluateError {
            EvaluateErrorKind::FieldNotFound {
                owner: owner.type_name().into(),
                name: name.into(),
            }
            .into()
        };
        match owner {
            FieldOwner::Instance(object) => match self.object(object)? {
                HeapObject::Instance { fields, .. } => {
                    fields.get(name).cloned().ok_or_else(not_found)
                }
                HeapObject::Array { .. } => Err(not_found()),
            },
            FieldOwner::Static(ty) => {
                if name == "TYPE" {
                    let keyword = PrimitiveType::from_boxed_name(&ty.name)
                        .map(|p| p.keyword())
                        .or((ty.name.as_ref() == "java.lang.Void").then_some("void"));
                    if let Some(keyword) = keyword {
                        return Ok(Value::Type(TypeRef::new(keyword)));
                    }
                }
                let start = declaring.unwrap_or(&ty.name);
                let class = self.static_owner(start, name).ok_or_else(not_found)?;
                self.statics
                    .get(&class)
                    .and_then(|fields| fields.get(name))
                    .cloned()
                    .ok_or_else(not_found)
            }
        }
    }

    fn write_field(
        &mut self,
        owner: &FieldOwner,
        declaring: Option<&str>,
        name: &str,
        value: Value,
    ) -> Result<(), EvaluateError> {
        let not_found = || -> EvaluateError {
            EvaluateErrorKind::FieldNotFound {
                owner: owner.type_name().into(),
                name: name.into(),
            }
            .into()
        };
        let slot = match owner {
            FieldOwner::Instance(object) => match self.object_mut(object)? {
                HeapObject::Instance { fields, .. } => fields.get_mut(name),
                HeapObject::Array { .. } => None,
            },
            FieldOwner::Static(ty) => {
                let start = declaring.unwrap_or(&ty.name);
                let class = self.static_owner(start, name).ok_or_else(not_found)?;
                self.statics
                    .get_mut(&class)
                    .and_then(|fields| fields.get_mut(name))
            }
        };
        let slot = slot.ok_or_else(not_found)?;
        *slot = value;
        Ok(())
    }

    fn array_length(&mut self, array: &ObjectRef) -> Result<i32, EvaluateError> {
        Ok(self.array(array)?.len() as i32)
    }

    fn read_array(&mut self, array: &ObjectRef, index: i32) -> Result<Value, EvaluateError> {
        let elements = self.array(array)?;
        let index = check_index(index, elements.len())?;
        Ok(elements[index].clone())
    }

    fn write_array(
        &mut self,
        array: &ObjectRef,
        index: i32,
        value: Value,
    ) -> Result<(), EvaluateError> {
        let HeapObject::Array {
            element_type,
            elements,
        } = self.object_mut(array)?
        else {
            return Err(EvaluateErrorKind::NotAnArray(Value::Object(array.clone())).into());
        };
        if !value.fits(element_type) {
            return Err(EvaluateErrorKind::TypeMismatch {
                expected: element_type.canonical_text().into(),
                actual: value.type_name(),
            }
            .into());
        }
        let index = check_index(index, elements.len())?;
        elements[index] = value;
        Ok(())
    }

    fn new_array(
        &mut self,
        array_type: &StaticType,
        length: i32,
    ) -> Result<ObjectRef, EvaluateError> {
        let element_type = array_type.element_type().ok_or_else(|| {
            EvaluateErrorKind::NotAnArray(Value::Type(TypeRef::new(&array_type.canonical_text())))
        })?;
        let length = usize::try_from(length)
            .map_err(|_| EvaluateErrorKind::NegativeArraySize(length))?;
        let elements = vec![element_type.default_value(); length];
        Ok(self.allocate_array(element_type.clone(), elements))
    }

    fn new_instance(
        &mut self,
        class: &TypeRef,
        signature: &str,
        arguments: Vec<Value>,
    ) -> Result<ObjectRef, EvaluateError> {
        let object = self.allocate_instance(&class.name)?;
        self.calls.push(format_compact!("{}.{CONSTRUCTOR}", class.name));
        match self.find_method(&class.name, CONSTRUCTOR, Some(signature)) {
            Some(constructor) => {
                let receiver = Receiver::Instance(Value::Object(object.clone()));
                constructor.call(self, &receiver, &arguments)?;
            }
            None if !arguments.is_empty() => {
                return Err(EvaluateErrorKind::MethodNotFound {
                    owner: class.name.as_ref().into(),
                    name: format_compact!("{CONSTRUCTOR}{signature}"),
                }
                .into())
            }
            None => {}
        }
        Ok(object)
    }

    fn invoke_method(&mut self, invocation: Invocation<'_>) -> Result<Value, EvaluateError> {
        let runtime_class: CompactString = match &invocation.receiver {
            Receiver::Instance(Value::Object(object)) => object.type_name.as_ref().into(),
            Receiver::Instance(Value::String(_)) => STRING.into(),
            Receiver::Instance(other) => other.type_name(),
            Receiver::Static(ty) => ty.name.as_ref().into(),
        };
        let start = match invocation.declaring {
            Some(declaring) if invocation.non_virtual => declaring,
            _ => runtime_class.as_str(),
        };
        tracing::trace!(class = start, method = invocation.name, "invoking");
        self.calls
            .push(format_compact!("{start}.{}", invocation.name));

        if let Some(method) = self.find_method(start, invocation.name, invocation.signature) {
            tracing::trace!(body = method.get_name(), "dispatching to registered method");
            return method.call(self, &invocation.receiver, &invocation.arguments);
        }
        match native::builtin(invocation.name, &invocation.receiver) {
            Some(method) => {
                tracing::trace!(body = method.get_name(), "dispatching to builtin");
                method.call(self, &invocation.receiver, &invocation.arguments)
            }
            None => Err(EvaluateErrorKind::MethodNotFound {
                owner: start.into(),
                name: invocation.name.into(),
            }
            .into()),
        }
    }

    fn instance_of(&mut self, object: &ObjectRef, class: &TypeRef) -> Result<bool, EvaluateError> {
        if object.is_array() {
            return Ok(object.type_name == class.name || class.name.as_ref() == OBJECT);
        }
        Ok(self.is_subclass(&object.type_name, &class.name))
    }

    fn box_value(&mut self, value: &Value) -> Result<ObjectRef, EvaluateError> {
        let primitive = value
            .primitive_type()
            .ok_or_else(|| EvaluateErrorKind::TypeMismatch {
                expected: "primitive".into(),
                actual: value.type_name(),
            })?;
        let class = primitive.boxed_name();
        let fields = HashMap::from([(IdentName::from(BOXED_VALUE), value.clone())]);
        let id = self.heap.allocate(HeapObject::Instance {
            class: class.into(),
            fields,
        });
        tracing::trace!(class, %id, "boxed primitive");
        Ok(ObjectRef::new(id, class))
    }

    fn unbox_value(&mut self, object: &ObjectRef) -> Result<Option<Value>, EvaluateError> {
        if PrimitiveType::from_boxed_name(&object.type_name).is_none() {
            return Ok(None);
        }
        match self.object(object)? {
            HeapObject::Instance { fields, .. } => Ok(fields.get(BOXED_VALUE).cloned()),
            HeapObject::Array { .. } => Ok(None),
        }
    }

    fn class_object(&mut self, class: &TypeRef) -> Result<Value, EvaluateError> {
        Ok(Value::Type(class.clone()))
    }

    fn pin(&mut self, object: &ObjectRef) {
        self.pins.insert(object.id);
    }
}
