//! The runtime side of an evaluation: everything the tree needs from the suspended debuggee.

use crate::{
    evaluator::error::EvaluateError,
    syntax::types::StaticType,
    value::{ObjectRef, TypeRef, Value},
};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldOwner {
    Instance(ObjectRef),
    Static(TypeRef),
}

impl FieldOwner {
    pub fn type_name(&self) -> &str {
        match self {
            FieldOwner::Instance(object) => &object.type_name,
            FieldOwner::Static(ty) => &ty.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Receiver {
    /// An object or string in the debuggee.
    Instance(Value),
    Static(TypeRef),
}

/// A method dispatch request, with the overload already selected at build time.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation<'a> {
    pub receiver: Receiver,
    /// Class used to look the method up; `None` lets the debuggee pick from the receiver.
    pub declaring: Option<&'a str>,
    pub name: &'a str,
    pub signature: Option<&'a str>,
    pub arguments: Vec<Value>,
    /// Skip virtual dispatch, as `super.m()` does.
    pub non_virtual: bool,
}

/// Access to a suspended thread and the VM it lives in.
///
/// Every accessor may fail, e.g. when the thread was resumed under the evaluation.
pub trait EvaluationContext {
    fn read_local(&mut self, name: &str) -> Result<Value, EvaluateError>;

    fn write_local(&mut self, name: &str, value: Value) -> Result<(), EvaluateError>;

    /// `None` in a static frame.
    fn this_object(&mut self) -> Result<Option<ObjectRef>, EvaluateError>;

    /// The enclosing instance captured by an inner class (its `this$N` field).
    fn outer_instance(&mut self, object: &ObjectRef) -> Result<Option<ObjectRef>, EvaluateError>;

    fn resolve_class(&mut self, name: &str) -> Result<TypeRef, EvaluateError>;

    fn read_field(
        &mut self,
        owner: &FieldOwner,
        declaring: Option<&str>,
        name: &str,
    ) -> Result<Value, EvaluateError>;

    fn write_field(
        &mut self,
        owner: &FieldOwner,
        declaring: Option<&str>,
        name: &str,
        value: Value,
    ) -> Result<(), EvaluateError>;

    fn array_length(&mut self, array: &ObjectRef) -> Result<i32, EvaluateError>;

    fn read_array(&mut self, array: &ObjectRef, index: i32) -> Result<Value, EvaluateError>;

    fn write_array(
        &mut self,
        array: &ObjectRef,
        index: i32,
        value: Value,
    ) -> Result<(), EvaluateError>;

    fn new_array(&mut self, array_type: &StaticType, length: i32)
        -> Result<ObjectRef, EvaluateError>;

    fn new_instance(
        &mut self,
        class: &TypeRef,
        signature: &str,
        arguments: Vec<Value>,
    ) -> Result<ObjectRef, EvaluateError>;

    fn invoke_method(&mut self, invocation: Invocation<'_>) -> Result<Value, EvaluateError>;

    fn instance_of(&mut self, object: &ObjectRef, class: &TypeRef) -> Result<bool, EvaluateError>;

    /// Wraps a primitive in its `java.lang` box, as `Integer.valueOf` would.
    fn box_value(&mut self, value: &Value) -> Result<ObjectRef, EvaluateError>;

    /// The primitive held by a box, or `None` when `object` is not a box.
    fn unbox_value(&mut self, object: &ObjectRef) -> Result<Option<Value>, EvaluateError>;

    /// The `java.lang.Class` mirror of `class`.
    fn class_object(&mut self, class: &TypeRef) -> Result<Value, EvaluateError>;

    /// Keeps `object` from being collected until the suspend session ends.
    fn pin(&mut self, object: &ObjectRef);
}
