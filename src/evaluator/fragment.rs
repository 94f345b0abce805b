use super::error::EvaluateErrorKind;
use crate::{string::IdentName, value::Value};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

/// Synthetic variables a code fragment declares, with the value each starts from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentScope {
    slots: Vec<(IdentName, Value)>,
}

impl FragmentScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: IdentName, initial: Value) {
        self.slots.push((name, initial));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.iter().any(|(slot, _)| slot.as_ref() == name)
    }

    pub fn slots(&self) -> &[(IdentName, Value)] {
        &self.slots
    }

    /// A fresh runtime frame under `parent`, seeded with the initial values.
    pub fn instantiate(&self, parent: &SyntheticFrame) -> SyntheticFrame {
        let frame = parent.new_scope();
        for (name, initial) in self.slots.iter() {
            frame.declare(name.clone(), initial.clone());
        }
        frame
    }
}

/// Runtime storage for synthetic variables, chained to the enclosing fragment's frame.
#[derive(Debug, Clone, Default)]
pub struct SyntheticFrame {
    inner: Rc<RefCell<FrameImpl>>,
}

#[derive(Debug, Default)]
struct FrameImpl {
    values: HashMap<IdentName, Value>,
    parent: Option<SyntheticFrame>,
}

impl SyntheticFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_scope(&self) -> Self {
        Self {
            inner: Rc::new(RefCell::new(FrameImpl {
                values: HashMap::new(),
                parent: Some(self.clone()),
            })),
        }
    }

    pub fn access(&self, name: &str) -> Option<Value> {
        let inner = self.inner.borrow();
        if let Some(value) = inner.values.get(name) {
            Some(value.clone())
        } else if let Some(parent) = inner.parent.as_ref() {
            parent.access(name)
        } else {
            None
        }
    }

    /// The frame in the chain that owns `name`.
    pub fn holder(&self, name: &str) -> Option<SyntheticFrame> {
        let inner = self.inner.borrow();
        if inner.values.contains_key(name) {
            Some(self.clone())
        } else if let Some(parent) = inner.parent.as_ref() {
            parent.holder(name)
        } else {
            None
        }
    }

    /// Fails if no frame in the chain declares `name`.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), EvaluateErrorKind> {
        let mut inner = self.inner.borrow_mut();
        if let Some(slot) = inner.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(parent) = inner.parent.clone() {
            drop(inner);
            parent.assign(name, value)
        } else {
            Err(EvaluateErrorKind::VariableNotDeclared(name.into()))
        }
    }

    pub fn declare(&self, name: IdentName, value: Value) {
        self.inner.borrow_mut().values.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_frames_see_outer_slots() {
        let root = SyntheticFrame::new();
        let mut outer = FragmentScope::new();
        outer.declare("x".into(), Value::Int(0));
        let outer_frame = outer.instantiate(&root);

        let mut inner = FragmentScope::new();
        inner.declare("y".into(), Value::Boolean(false));
        let inner_frame = inner.instantiate(&outer_frame);

        assert_eq!(inner_frame.assign("x", Value::Int(3)), Ok(()));
        assert_eq!(outer_frame.access("x"), Some(Value::Int(3)));
        assert_eq!(outer_frame.access("y"), None);
        assert!(inner_frame.assign("z", Value::Null).is_err());
    }

    #[test]
    fn instantiation_starts_from_initial_values() {
        let mut scope = FragmentScope::new();
        scope.declare("count".into(), Value::Long(0));
        let root = SyntheticFrame::new();

        let first = scope.instantiate(&root);
        first.assign("count", Value::Long(9)).unwrap();
        let second = scope.instantiate(&root);
        assert_eq!(second.access("count"), Some(Value::Long(0)));
    }
}
