pub mod error;
pub mod formatter;
pub mod fragment;
pub mod modifier;
pub mod operator;
mod tree;

use crate::{
    context::EvaluationContext,
    source::Span,
    string::{IdentName, TypeName},
    syntax::{
        symbol::Signature,
        types::StaticType,
        BinaryOperator, PostfixOperator,
    },
    value::Value,
};
use error::{EvaluateError, EvaluateErrorKind};
use fragment::{FragmentScope, SyntheticFrame};
use modifier::Modifier;
use operator::UnaryOperator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvaluatorRef(u32);

impl EvaluatorRef {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// One compiled node. Children are referenced by index into the owning [`ExpressionEvaluator`].
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluator {
    Literal {
        value: Value,
    },
    /// A local or parameter of the suspended frame.
    LocalVariable {
        name: IdentName,
        ty: Option<StaticType>,
    },
    /// A variable declared by a code fragment.
    SyntheticVariable {
        name: IdentName,
        ty: Option<StaticType>,
    },
    Field {
        object: EvaluatorRef,
        declaring: Option<TypeName>,
        name: IdentName,
        ty: Option<StaticType>,
    },
    ArrayAccess {
        array: EvaluatorRef,
        index: EvaluatorRef,
        ty: Option<StaticType>,
    },
    Type {
        name: TypeName,
    },
    This {
        hops: u32,
    },
    Super {
        hops: u32,
    },
    Binary {
        operator: BinaryOperator,
        lhs: EvaluatorRef,
        rhs: EvaluatorRef,
        result_type: StaticType,
    },
    Unary {
        operator: UnaryOperator,
        operand: EvaluatorRef,
        result_type: StaticType,
    },
    Postfix {
        operator: PostfixOperator,
        operand: EvaluatorRef,
        result_type: StaticType,
    },
    Assignment {
        lhs: EvaluatorRef,
        rhs: EvaluatorRef,
    },
    Conditional {
        condition: EvaluatorRef,
        then_branch: EvaluatorRef,
        else_branch: EvaluatorRef,
    },
    InstanceOf {
        operand: EvaluatorRef,
        class: EvaluatorRef,
    },
    TypeCast {
        operand: EvaluatorRef,
        cast_type: StaticType,
    },
    ClassObject {
        class: EvaluatorRef,
    },
    NewInstance {
        class: EvaluatorRef,
        signature: Signature,
        arguments: Vec<EvaluatorRef>,
    },
    NewArray {
        array_type: StaticType,
        dimension: Option<EvaluatorRef>,
        initializer: Option<EvaluatorRef>,
    },
    ArrayInitializer {
        elements: Vec<EvaluatorRef>,
    },
    MethodCall {
        object: EvaluatorRef,
        declaring: Option<TypeName>,
        name: IdentName,
        signature: Option<Signature>,
        arguments: Vec<EvaluatorRef>,
        invoke_super: bool,
    },
    Block {
        statements: Vec<EvaluatorRef>,
    },
    CodeFragment {
        scope: FragmentScope,
        statements: Vec<EvaluatorRef>,
    },
    If {
        condition: EvaluatorRef,
        then_branch: EvaluatorRef,
        else_branch: Option<EvaluatorRef>,
    },
    While {
        condition: EvaluatorRef,
        body: Option<EvaluatorRef>,
        label: Option<IdentName>,
    },
    For {
        initializer: Option<EvaluatorRef>,
        condition: Option<EvaluatorRef>,
        update: Option<EvaluatorRef>,
        body: Option<EvaluatorRef>,
        label: Option<IdentName>,
    },
    Break {
        label: Option<IdentName>,
    },
    Continue {
        label: Option<IdentName>,
    },
    /// Pins an object result against collection in the debuggee.
    DisableGc {
        inner: EvaluatorRef,
    },
}

impl Evaluator {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Literal { .. } => "literal",
            Self::LocalVariable { .. } => "local variable",
            Self::SyntheticVariable { .. } => "synthetic variable",
            Self::Field { .. } => "field",
            Self::ArrayAccess { .. } => "array access",
            Self::Type { .. } => "type",
            Self::This { .. } => "this",
            Self::Super { .. } => "super",
            Self::Binary { .. } => "binary",
            Self::Unary { .. } => "unary",
            Self::Postfix { .. } => "postfix",
            Self::Assignment { .. } => "assignment",
            Self::Conditional { .. } => "conditional",
            Self::InstanceOf { .. } => "instanceof",
            Self::TypeCast { .. } => "cast",
            Self::ClassObject { .. } => "class object",
            Self::NewInstance { .. } => "new instance",
            Self::NewArray { .. } => "new array",
            Self::ArrayInitializer { .. } => "array initializer",
            Self::MethodCall { .. } => "method call",
            Self::Block { .. } => "block",
            Self::CodeFragment { .. } => "code fragment",
            Self::If { .. } => "if",
            Self::While { .. } => "while",
            Self::For { .. } => "for",
            Self::Break { .. } => "break",
            Self::Continue { .. } => "continue",
            Self::DisableGc { .. } => "disable gc",
        }
    }
}

/// A value together with the location it was read from, if assignable.
#[derive(Debug, Clone)]
pub struct Evaluated {
    pub value: Value,
    pub modifier: Option<Modifier>,
}

impl Evaluated {
    pub fn value(value: Value) -> Self {
        Self {
            value,
            modifier: None,
        }
    }

    pub fn void() -> Self {
        Self::value(Value::Void)
    }
}

/// How a node finished: normally, or by raising a loop control signal.
#[derive(Debug, Clone)]
pub enum Completion {
    Normal(Evaluated),
    Break(Option<IdentName>),
    Continue(Option<IdentName>),
}

#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub value: Value,
    pub modifier: Option<Modifier>,
}

impl EvaluationResult {
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn modifier(&self) -> Option<&Modifier> {
        self.modifier.as_ref()
    }
}

/// Nodes under construction; the builder turns this into an [`ExpressionEvaluator`] once the root is known.
#[derive(Debug, Clone, Default)]
pub struct IncompleteEvaluator {
    nodes: Vec<Evaluator>,
    spans: Vec<Span>,
}

impl IncompleteEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Evaluator, span: Span) -> EvaluatorRef {
        self.nodes.push(node);
        self.spans.push(span);
        EvaluatorRef((self.nodes.len() - 1) as u32)
    }

    pub fn get_node(&self, node: EvaluatorRef) -> Option<&Evaluator> {
        self.nodes.get(node.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn finish(self, root: EvaluatorRef) -> ExpressionEvaluator {
        ExpressionEvaluator {
            nodes: self.nodes,
            spans: self.spans,
            root,
        }
    }
}

/// A compiled unit: an immutable evaluator tree that can be evaluated any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionEvaluator {
    nodes: Vec<Evaluator>,
    spans: Vec<Span>,
    root: EvaluatorRef,
}

impl ExpressionEvaluator {
    pub fn root(&self) -> EvaluatorRef {
        self.root
    }

    pub fn get_root(&self) -> &Evaluator {
        self.get_node(self.root)
            .expect("Root ref is created alongside the nodes.")
    }

    pub fn get_node(&self, node: EvaluatorRef) -> Option<&Evaluator> {
        self.nodes.get(node.index())
    }

    pub fn get_span(&self, node: EvaluatorRef) -> Option<Span> {
        self.spans.get(node.index()).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (EvaluatorRef, &Evaluator)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (EvaluatorRef(index as u32), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Runs the tree. A `break` or `continue` escaping the root is reported as an error.
    pub fn evaluate<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
    ) -> Result<EvaluationResult, EvaluateError> {
        match self.evaluate_completion(context)? {
            Completion::Normal(Evaluated { value, modifier }) => {
                Ok(EvaluationResult { value, modifier })
            }
            Completion::Break(label) => Err(self.escaped("break", label)),
            Completion::Continue(label) => Err(self.escaped("continue", label)),
        }
    }

    /// Runs the tree and hands back control signals as data.
    pub fn evaluate_completion<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
    ) -> Result<Completion, EvaluateError> {
        let frame = SyntheticFrame::new();
        tracing::trace!(nodes = self.nodes.len(), "evaluating compiled tree");
        self.evaluate_node(context, &frame, self.root)
    }

    fn escaped(&self, signal: &'static str, label: Option<IdentName>) -> EvaluateError {
        tracing::warn!(signal, ?label, "control signal escaped the evaluator root");
        let error = EvaluateError::from(EvaluateErrorKind::UnhandledControlSignal { signal, label });
        match self.get_span(self.root) {
            Some(span) => error.or_span(span),
            None => error,
        }
    }
}
