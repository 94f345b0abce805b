//! JSON description of one evaluation: the type-checked fragment plus the
//! debuggee state it runs against.

use crate::{
    evaluator::error::EvaluateError,
    sandbox::{
        native::{NativeArgument, NativeConstant, NativeGetter},
        SandboxClass, SandboxContext,
    },
    string::IdentName,
    syntax::{
        symbol::{ClassId, ClassTable, SourcePosition},
        types::StaticType,
        CodeFragment, Literal,
    },
    value::{ObjectRef, Value},
};
use compact_str::CompactString;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Malformed scenario: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown object handle `{0}`")]
    UnknownObject(CompactString),
    #[error("Invalid literal in scenario: {0}")]
    InvalidLiteral(CompactString),
    #[error("Cannot set up the debuggee: {0}")]
    Setup(#[from] EvaluateError),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum InitialValue {
    Literal(Literal),
    /// A handle declared under `objects`.
    Object(CompactString),
    Array {
        element_type: StaticType,
        #[serde(default)]
        elements: Vec<InitialValue>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObjectSetup {
    pub handle: CompactString,
    pub class: CompactString,
    #[serde(default)]
    pub fields: HashMap<IdentName, InitialValue>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum MethodBody {
    Constant(Literal),
    Getter(IdentName),
    Argument(usize),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MethodSetup {
    pub class: CompactString,
    pub name: CompactString,
    #[serde(default)]
    pub signature: Option<CompactString>,
    pub body: MethodBody,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RuntimeSetup {
    #[serde(default)]
    pub classes: Vec<SandboxClass>,
    #[serde(default)]
    pub methods: Vec<MethodSetup>,
    #[serde(default)]
    pub objects: Vec<ObjectSetup>,
    #[serde(default)]
    pub locals: HashMap<IdentName, InitialValue>,
    #[serde(default)]
    pub this: Option<CompactString>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub classes: ClassTable,
    #[serde(default)]
    pub context_class: Option<ClassId>,
    #[serde(default)]
    pub position: Option<SourcePosition>,
    #[serde(default)]
    pub runtime: RuntimeSetup,
    pub fragment: CodeFragment,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds the debuggee. Objects are allocated before any field is set, so
    /// they may refer to each other.
    pub fn sandbox(&self) -> Result<SandboxContext, ScenarioError> {
        let runtime = &self.runtime;
        let mut sandbox = SandboxContext::new();
        for class in &runtime.classes {
            sandbox.define_class(class.clone());
        }
        for method in &runtime.methods {
            let signature = method.signature.as_deref();
            match &method.body {
                MethodBody::Constant(literal) => sandbox.define_method(
                    &method.class,
                    &method.name,
                    signature,
                    NativeConstant(literal_value(literal)?),
                ),
                MethodBody::Getter(field) => sandbox.define_method(
                    &method.class,
                    &method.name,
                    signature,
                    NativeGetter(field.clone()),
                ),
                MethodBody::Argument(index) => sandbox.define_method(
                    &method.class,
                    &method.name,
                    signature,
                    NativeArgument(*index),
                ),
            }
        }

        let mut handles = HashMap::new();
        for object in &runtime.objects {
            let allocated = sandbox.allocate_instance(&object.class)?;
            handles.insert(object.handle.clone(), allocated);
        }
        for object in &runtime.objects {
            let target = lookup(&handles, &object.handle)?;
            for (name, initial) in &object.fields {
                let value = materialize(&mut sandbox, &handles, initial)?;
                sandbox.set_field(&target, name, value)?;
            }
        }
        for (name, initial) in &runtime.locals {
            let value = materialize(&mut sandbox, &handles, initial)?;
            sandbox.declare_local(name, value);
        }
        if let Some(this) = &runtime.this {
            sandbox.set_this(lookup(&handles, this)?);
        }
        tracing::debug!(
            objects = handles.len(),
            locals = runtime.locals.len(),
            "scenario debuggee ready"
        );
        Ok(sandbox)
    }
}

fn literal_value(literal: &Literal) -> Result<Value, ScenarioError> {
    Value::from_literal(literal)
        .ok_or_else(|| ScenarioError::InvalidLiteral(format!("{literal:?}").into()))
}

fn lookup(
    handles: &HashMap<CompactString, ObjectRef>,
    handle: &CompactString,
) -> Result<ObjectRef, ScenarioError> {
    handles
        .get(handle)
        .cloned()
        .ok_or_else(|| ScenarioError::UnknownObject(handle.clone()))
}

fn materialize(
    sandbox: &mut SandboxContext,
    handles: &HashMap<CompactString, ObjectRef>,
    initial: &InitialValue,
) -> Result<Value, ScenarioError> {
    match initial {
        InitialValue::Literal(literal) => literal_value(literal),
        InitialValue::Object(handle) => Ok(Value::Object(lookup(handles, handle)?)),
        InitialValue::Array {
            element_type,
            elements,
        } => {
            let elements = elements
                .iter()
                .map(|element| materialize(sandbox, handles, element))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Object(
                sandbox.allocate_array(element_type.clone(), elements),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_thread_safe<T: Send + Sync + 'static>() {}

    #[test]
    fn errors_can_cross_threads() {
        assert_thread_safe::<ScenarioError>();
        assert_thread_safe::<EvaluateError>();
        assert_thread_safe::<Scenario>();
    }

    #[test]
    fn objects_can_refer_to_each_other() {
        let scenario = Scenario::from_json(
            r#"{
                "runtime": {
                    "classes": [
                        { "name": "Node", "fields": [{ "name": "next", "ty": { "Class": "Node" } }] }
                    ],
                    "objects": [
                        { "handle": "a", "class": "Node", "fields": { "next": { "Object": "b" } } },
                        { "handle": "b", "class": "Node", "fields": { "next": { "Object": "a" } } }
                    ],
                    "locals": { "head": { "Object": "a" } }
                },
                "fragment": { "id": 0 }
            }"#,
        )
        .unwrap();
        let sandbox = scenario.sandbox().unwrap();
        let Some(Value::Object(head)) = sandbox.local("head").cloned() else {
            panic!("head should be an object");
        };
        let Some(Value::Object(next)) = sandbox.field(&head, "next") else {
            panic!("next should be an object");
        };
        assert_eq!(sandbox.field(&next, "next"), Some(Value::Object(head)));
    }

    #[test]
    fn unknown_handles_are_reported() {
        let scenario = Scenario::from_json(
            r#"{ "runtime": { "this": "missing" }, "fragment": { "id": 1 } }"#,
        )
        .unwrap();
        assert!(matches!(
            scenario.sandbox(),
            Err(ScenarioError::UnknownObject(handle)) if handle == "missing"
        ));
    }
}
