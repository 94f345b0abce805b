//! The typed syntax tree handed over by the parser and type checker.
//!
//! Nodes are plain data: every name is already resolved to a [`Symbol`] (or left
//! unresolved) and every expression carries its static type when known.

pub mod symbol;
pub mod types;

use crate::{source::Span, string::Ident};
use compact_str::CompactString;
use serde::Deserialize;
use symbol::{ClassId, FragmentId, MethodSymbol, Symbol};
use types::{PrimitiveType, StaticType};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(CompactString),
    /// A literal the parser could not read, with the parser's complaint.
    Malformed(CompactString),
}

impl Literal {
    pub fn static_type(&self) -> Option<StaticType> {
        let primitive = match self {
            Literal::Null => return Some(StaticType::Null),
            Literal::String(_) => return Some(StaticType::string()),
            Literal::Malformed(_) => return None,
            Literal::Boolean(_) => PrimitiveType::Boolean,
            Literal::Char(_) => PrimitiveType::Char,
            Literal::Int(_) => PrimitiveType::Int,
            Literal::Long(_) => PrimitiveType::Long,
            Literal::Float(_) => PrimitiveType::Float,
            Literal::Double(_) => PrimitiveType::Double,
        };
        Some(StaticType::Primitive(primitive))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    ShiftLeft,
    ShiftRight,
    UnsignedShiftRight,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
}

impl BinaryOperator {
    pub fn sign(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Remainder => "%",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::UnsignedShiftRight => ">>>",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum PrefixOperator {
    Plus,
    Minus,
    Not,
    BitNot,
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum PostfixOperator {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum AssignmentOperator {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    ShiftLeft,
    ShiftRight,
    UnsignedShiftRight,
    BitAnd,
    BitOr,
    BitXor,
}

impl AssignmentOperator {
    pub fn sign(&self) -> &'static str {
        match self {
            AssignmentOperator::Assign => "=",
            AssignmentOperator::Add => "+=",
            AssignmentOperator::Subtract => "-=",
            AssignmentOperator::Multiply => "*=",
            AssignmentOperator::Divide => "/=",
            AssignmentOperator::Remainder => "%=",
            AssignmentOperator::ShiftLeft => "<<=",
            AssignmentOperator::ShiftRight => ">>=",
            AssignmentOperator::UnsignedShiftRight => ">>>=",
            AssignmentOperator::BitAnd => "&=",
            AssignmentOperator::BitOr => "|=",
            AssignmentOperator::BitXor => "^=",
        }
    }
}

/// The class named by `Outer.this` or `Outer.super`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassQualifier {
    pub name: Ident,
    #[serde(default)]
    pub target: Option<ClassId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Expression {
    pub kind: ExpressionKind,
    #[serde(default)]
    pub ty: Option<StaticType>,
    #[serde(default)]
    pub span: Span,
}

impl Expression {
    pub fn new(kind: ExpressionKind, ty: Option<StaticType>) -> Self {
        Self {
            kind,
            ty,
            span: Span::EMPTY,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The value of an integral constant expression, looking through parentheses and negation.
    pub fn int_constant(&self) -> Option<i64> {
        match &self.kind {
            ExpressionKind::Literal(Literal::Int(v)) => Some(*v as i64),
            ExpressionKind::Literal(Literal::Char(c)) => Some(*c as i64),
            ExpressionKind::Parenthesized(inner) => inner.int_constant(),
            ExpressionKind::Prefix {
                operator: PrefixOperator::Minus,
                operand,
            } => operand.int_constant().map(|v| -v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum ExpressionKind {
    Literal(Literal),
    Reference {
        #[serde(default)]
        qualifier: Option<Box<Expression>>,
        name: Ident,
        #[serde(default)]
        target: Option<Symbol>,
    },
    This {
        #[serde(default)]
        qualifier: Option<ClassQualifier>,
    },
    Super {
        #[serde(default)]
        qualifier: Option<ClassQualifier>,
    },
    Parenthesized(Box<Expression>),
    Binary {
        operator: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Prefix {
        operator: PrefixOperator,
        operand: Box<Expression>,
    },
    Postfix {
        operator: PostfixOperator,
        operand: Box<Expression>,
    },
    Assignment {
        operator: AssignmentOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Conditional {
        condition: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
    },
    InstanceOf {
        operand: Box<Expression>,
        check_type: StaticType,
    },
    TypeCast {
        cast_type: StaticType,
        operand: Box<Expression>,
    },
    ArrayAccess {
        array: Box<Expression>,
        index: Box<Expression>,
    },
    MethodCall {
        #[serde(default)]
        qualifier: Option<Box<Expression>>,
        name: Ident,
        #[serde(default)]
        arguments: Vec<Expression>,
        #[serde(default)]
        target: Option<MethodSymbol>,
        /// Class the call was resolved against, for unqualified calls.
        #[serde(default)]
        scope: Option<ClassId>,
    },
    NewObject {
        class_type: StaticType,
        /// `None` when the argument list is missing entirely.
        #[serde(default)]
        arguments: Option<Vec<Expression>>,
        #[serde(default)]
        constructor: Option<MethodSymbol>,
        #[serde(default)]
        anonymous: bool,
    },
    NewArray {
        array_type: StaticType,
        #[serde(default)]
        dimensions: Vec<Expression>,
        #[serde(default)]
        initializer: Option<Vec<Expression>>,
    },
    ArrayInitializer(Vec<Expression>),
    ClassObject(StaticType),
    Lambda,
    Error(CompactString),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocalVariable {
    pub name: Ident,
    pub ty: StaticType,
    #[serde(default)]
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum Declared {
    Variable(LocalVariable),
    Class(ClassId),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    #[serde(default)]
    pub span: Span,
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            span: Span::EMPTY,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum StatementKind {
    Expression(Expression),
    Declaration(Vec<Declared>),
    Block(Vec<Statement>),
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        #[serde(default)]
        else_branch: Option<Box<Statement>>,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
    },
    For {
        #[serde(default)]
        initializer: Option<Box<Statement>>,
        #[serde(default)]
        condition: Option<Expression>,
        #[serde(default)]
        update: Option<Box<Statement>>,
        body: Box<Statement>,
    },
    Labeled {
        label: Ident,
        body: Box<Statement>,
    },
    Break {
        #[serde(default)]
        label: Option<Ident>,
    },
    Continue {
        #[serde(default)]
        label: Option<Ident>,
    },
    /// A code fragment spliced into another one, with its own synthetic variables.
    Fragment(CodeFragment),
    Empty,
    DoWhile {
        body: Box<Statement>,
        condition: Expression,
    },
    ForEach {
        variable: Ident,
        iterable: Expression,
        body: Box<Statement>,
    },
    Return(Option<Expression>),
    Throw(Expression),
    Switch {
        selector: Expression,
        #[serde(default)]
        body: Vec<Statement>,
    },
    Try {
        body: Box<Statement>,
    },
    Synchronized {
        lock: Expression,
        body: Box<Statement>,
    },
    Error(CompactString),
}

impl StatementKind {
    pub fn name(&self) -> &'static str {
        match self {
            StatementKind::Expression(_) => "expression",
            StatementKind::Declaration(_) => "declaration",
            StatementKind::Block(_) => "block",
            StatementKind::If { .. } => "if",
            StatementKind::While { .. } => "while",
            StatementKind::For { .. } => "for",
            StatementKind::Labeled { .. } => "labeled",
            StatementKind::Break { .. } => "break",
            StatementKind::Continue { .. } => "continue",
            StatementKind::Fragment(_) => "code fragment",
            StatementKind::Empty => "empty",
            StatementKind::DoWhile { .. } => "do-while",
            StatementKind::ForEach { .. } => "for-each",
            StatementKind::Return(_) => "return",
            StatementKind::Throw(_) => "throw",
            StatementKind::Switch { .. } => "switch",
            StatementKind::Try { .. } => "try",
            StatementKind::Synchronized { .. } => "synchronized",
            StatementKind::Error(_) => "error",
        }
    }
}

/// A watch, console entry or condition: statements compiled as one unit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CodeFragment {
    pub id: FragmentId,
    #[serde(default)]
    pub text: CompactString,
    #[serde(default)]
    pub context_class: Option<ClassId>,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum Element {
    Fragment(CodeFragment),
    Statement(Statement),
    Expression(Expression),
}
