use crate::{source::Span, string::IdentName, value::Value};
use compact_str::CompactString;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvaluateErrorKind {
    // Builder
    #[error("Invalid expression: {0}")]
    InvalidExpression(CompactString),
    #[error("Invalid literal: {0}")]
    InvalidLiteral(CompactString),
    #[error("Unknown type for expression: {0}")]
    UnknownExpressionType(CompactString),
    #[error("Operation `{0}` is not supported")]
    OperationNotSupported(&'static str),
    #[error("Incompatible types for `{0}` operation")]
    IncompatibleTypes(&'static str),
    #[error("Incompatible initializer type for variable `{0}`")]
    IncompatibleVariableInitializer(IdentName),
    #[error("Local variable declarations are not supported here")]
    LocalVariableDeclarationsNotSupported,
    #[error("Variable `{0}` is already declared")]
    VariableAlreadyDeclared(IdentName),
    #[error("Unsupported declaration: {0}")]
    UnsupportedDeclaration(CompactString),
    #[error("Statement is not supported: {0}")]
    StatementNotSupported(CompactString),
    #[error("Lambda expressions are not supported")]
    LambdaNotSupported,
    #[error("Anonymous class evaluation is not supported")]
    AnonymousClassNotSupported,
    #[error("Multi-dimensional array creation is not supported")]
    MultiDimensionalArraysNotSupported,
    #[error("Cannot resolve constructor: {0}")]
    CannotResolveConstructor(CompactString),
    #[error("Unknown return type for method `{0}`")]
    UnknownMethodReturnType(IdentName),
    #[error("Local variable `{0}` is missing from the class closure")]
    LocalVariableMissingFromClassClosure(IdentName),
    #[error("Cannot find sources for the class of field `{0}`")]
    CannotFindSourcesForFieldClass(IdentName),
    #[error("Cannot find the class of the evaluation context")]
    CannotFindSourceClass,
    #[error("Type of qualifier is unknown: {0}")]
    QualifierTypeUnknown(CompactString),
    #[error("`break` outside of a loop")]
    BreakOutsideLoop,
    #[error("`continue` outside of a loop")]
    ContinueOutsideLoop,
    #[error("Undefined label `{0}`")]
    UndefinedLabel(IdentName),

    // Evaluation
    #[error("Cannot find local variable `{0}`")]
    VariableNotFound(IdentName),
    #[error("Synthetic variable `{0}` is not declared")]
    VariableNotDeclared(IdentName),
    #[error("`this` is not available in a static context")]
    ThisNotAvailable,
    #[error("Cannot find the outer instance {0} level(s) up")]
    OuterInstanceNotFound(u32),
    #[error("Class `{0}` is not loaded")]
    ClassNotLoaded(CompactString),
    #[error("No field `{name}` in {owner}")]
    FieldNotFound {
        owner: CompactString,
        name: IdentName,
    },
    #[error("No method `{name}` in {owner}")]
    MethodNotFound {
        owner: CompactString,
        name: CompactString,
    },
    #[error("Null pointer on access to {0}")]
    NullPointer(CompactString),
    #[error("Array index {index} out of bounds for length {length}")]
    ArrayIndexOutOfBounds { index: i32, length: i32 },
    #[error("Negative array size: {0}")]
    NegativeArraySize(i32),
    #[error("Expected an array but got {0}")]
    NotAnArray(Value),
    #[error("Expected an object but got {0}")]
    NotAnObject(Value),
    #[error("Expected a boolean but got {0}")]
    NonBoolean(Value),
    #[error("Expected a number but got {0}")]
    NonNumeric(Value),
    #[error("Expected two numbers but got {0} and {1}")]
    NonNumerics(Value, Value),
    #[error("Operator `{operator}` cannot be applied to {lhs} and {rhs}")]
    UnsupportedOperands {
        operator: &'static str,
        lhs: Value,
        rhs: Value,
    },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Cannot cast {from} to {to}")]
    ClassCast {
        from: CompactString,
        to: CompactString,
    },
    #[error("Type mismatch: expected {expected} but got {actual}")]
    TypeMismatch {
        expected: CompactString,
        actual: CompactString,
    },
    #[error("Expression is not assignable")]
    NotAssignable,
    #[error("Method threw {0}")]
    InvocationFailed(CompactString),
    #[error("Unhandled `{signal}` signal{}", describe_label(.label))]
    UnhandledControlSignal {
        signal: &'static str,
        label: Option<IdentName>,
    },
}

fn describe_label(label: &Option<IdentName>) -> String {
    match label {
        Some(label) => format!(" for label `{label}`"),
        None => String::new(),
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{kind}")]
pub struct EvaluateError {
    pub kind: EvaluateErrorKind,
    pub span: Option<Span>,
}

impl EvaluateError {
    pub fn new(kind: EvaluateErrorKind, span: Span) -> Self {
        Self {
            kind,
            span: Some(span),
        }
    }

    /// Attaches `span` unless a more precise one is already known.
    pub fn or_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn is_compile_error(&self) -> bool {
        self.code().starts_with("EB")
    }

    pub fn code(&self) -> &'static str {
        match self.kind {
            EvaluateErrorKind::InvalidExpression(_) => "EB001",
            EvaluateErrorKind::InvalidLiteral(_) => "EB002",
            EvaluateErrorKind::UnknownExpressionType(_) => "EB003",
            EvaluateErrorKind::OperationNotSupported(_) => "EB004",
            EvaluateErrorKind::IncompatibleTypes(_) => "EB005",
            EvaluateErrorKind::IncompatibleVariableInitializer(_) => "EB006",
            EvaluateErrorKind::LocalVariableDeclarationsNotSupported => "EB007",
            EvaluateErrorKind::VariableAlreadyDeclared(_) => "EB008",
            EvaluateErrorKind::UnsupportedDeclaration(_) => "EB009",
            EvaluateErrorKind::StatementNotSupported(_) => "EB010",
            EvaluateErrorKind::LambdaNotSupported => "EB011",
            EvaluateErrorKind::AnonymousClassNotSupported => "EB012",
            EvaluateErrorKind::MultiDimensionalArraysNotSupported => "EB013",
            EvaluateErrorKind::CannotResolveConstructor(_) => "EB014",
            EvaluateErrorKind::UnknownMethodReturnType(_) => "EB015",
            EvaluateErrorKind::LocalVariableMissingFromClassClosure(_) => "EB016",
            EvaluateErrorKind::CannotFindSourcesForFieldClass(_) => "EB017",
            EvaluateErrorKind::CannotFindSourceClass => "EB018",
            EvaluateErrorKind::QualifierTypeUnknown(_) => "EB019",
            EvaluateErrorKind::BreakOutsideLoop => "EB020",
            EvaluateErrorKind::ContinueOutsideLoop => "EB021",
            EvaluateErrorKind::UndefinedLabel(_) => "EB022",
            EvaluateErrorKind::VariableNotFound(_) => "EV001",
            EvaluateErrorKind::VariableNotDeclared(_) => "EV002",
            EvaluateErrorKind::ThisNotAvailable => "EV003",
            EvaluateErrorKind::OuterInstanceNotFound(_) => "EV004",
            EvaluateErrorKind::ClassNotLoaded(_) => "EV005",
            EvaluateErrorKind::FieldNotFound { .. } => "EV006",
            EvaluateErrorKind::MethodNotFound { .. } => "EV007",
            EvaluateErrorKind::NullPointer(_) => "EV008",
            EvaluateErrorKind::ArrayIndexOutOfBounds { .. } => "EV009",
            EvaluateErrorKind::NegativeArraySize(_) => "EV010",
            EvaluateErrorKind::NotAnArray(_) => "EV011",
            EvaluateErrorKind::NotAnObject(_) => "EV012",
            EvaluateErrorKind::NonBoolean(_) => "EV013",
            EvaluateErrorKind::NonNumeric(_) => "EV014",
            EvaluateErrorKind::NonNumerics(_, _) => "EV015",
            EvaluateErrorKind::UnsupportedOperands { .. } => "EV016",
            EvaluateErrorKind::DivisionByZero => "EV017",
            EvaluateErrorKind::ClassCast { .. } => "EV018",
            EvaluateErrorKind::TypeMismatch { .. } => "EV019",
            EvaluateErrorKind::NotAssignable => "EV020",
            EvaluateErrorKind::InvocationFailed(_) => "EV021",
            EvaluateErrorKind::UnhandledControlSignal { .. } => "EV022",
        }
    }
}

impl From<EvaluateErrorKind> for EvaluateError {
    fn from(kind: EvaluateErrorKind) -> Self {
        Self { kind, span: None }
    }
}
