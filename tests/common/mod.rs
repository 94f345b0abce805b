#![allow(dead_code)]

use frameval::{
    builder::EvaluatorBuilder,
    evaluator::{
        error::EvaluateError,
        formatter::{EvaluatorFormatter, SExpressionFormatter},
        ExpressionEvaluator,
    },
    string::Ident,
    syntax::{
        symbol::{
            ClassId, ClassTable, FieldSymbol, FragmentId, MethodSymbol, Symbol, VariableOwner,
            VariableSymbol,
        },
        types::{PrimitiveType, StaticType},
        AssignmentOperator, BinaryOperator, CodeFragment, Declared, Expression, ExpressionKind,
        Literal, LocalVariable, PostfixOperator, PrefixOperator, Statement, StatementKind,
    },
};

pub const MAIN: ClassId = ClassId(0);

pub fn init_test_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

// Types

pub fn int() -> StaticType {
    StaticType::Primitive(PrimitiveType::Int)
}

pub fn long() -> StaticType {
    StaticType::Primitive(PrimitiveType::Long)
}

pub fn byte() -> StaticType {
    StaticType::Primitive(PrimitiveType::Byte)
}

pub fn boolean() -> StaticType {
    StaticType::Primitive(PrimitiveType::Boolean)
}

pub fn string() -> StaticType {
    StaticType::string()
}

pub fn int_array() -> StaticType {
    StaticType::array_of(int())
}

/// A single `demo.Main` class, id 0.
pub fn main_table() -> ClassTable {
    let mut classes = ClassTable::new();
    classes.declare(frameval::syntax::symbol::ClassInfo::new("demo.Main"));
    classes
}

// Expressions

pub fn int_lit(value: i32) -> Expression {
    Expression::new(ExpressionKind::Literal(Literal::Int(value)), Some(int()))
}

pub fn bool_lit(value: bool) -> Expression {
    Expression::new(ExpressionKind::Literal(Literal::Boolean(value)), Some(boolean()))
}

pub fn string_lit(value: &str) -> Expression {
    Expression::new(
        ExpressionKind::Literal(Literal::String(value.into())),
        Some(string()),
    )
}

fn reference(name: &str, ty: Option<StaticType>, target: Option<Symbol>) -> Expression {
    Expression::new(
        ExpressionKind::Reference {
            qualifier: None,
            name: Ident::new(name),
            target,
        },
        ty,
    )
}

/// A local or parameter of a method in `class`.
pub fn local(name: &str, ty: StaticType, class: ClassId) -> Expression {
    let symbol = VariableSymbol {
        name: name.into(),
        ty: ty.clone(),
        owner: VariableOwner::Method { class },
        constant: None,
    };
    reference(name, Some(ty), Some(Symbol::Variable(symbol)))
}

/// A variable declared by fragment `fragment`.
pub fn synthetic(name: &str, ty: StaticType, fragment: u32) -> Expression {
    let symbol = VariableSymbol {
        name: name.into(),
        ty: ty.clone(),
        owner: VariableOwner::Fragment(FragmentId(fragment)),
        constant: None,
    };
    reference(name, Some(ty), Some(Symbol::Variable(symbol)))
}

pub fn unresolved(name: &str, ty: Option<StaticType>) -> Expression {
    reference(name, ty, None)
}

pub fn field(name: &str, ty: StaticType, declaring: ClassId, is_static: bool) -> Expression {
    let symbol = FieldSymbol {
        name: name.into(),
        ty: ty.clone(),
        declaring_class: Some(declaring),
        is_static,
    };
    reference(name, Some(ty), Some(Symbol::Field(symbol)))
}

pub fn qualified(qualifier: Expression, name: &str, ty: Option<StaticType>) -> Expression {
    Expression::new(
        ExpressionKind::Reference {
            qualifier: Some(Box::new(qualifier)),
            name: Ident::new(name),
            target: None,
        },
        ty,
    )
}

pub fn binary(operator: BinaryOperator, lhs: Expression, rhs: Expression, ty: StaticType) -> Expression {
    Expression::new(
        ExpressionKind::Binary {
            operator,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        Some(ty),
    )
}

pub fn assign(lhs: Expression, rhs: Expression) -> Expression {
    let ty = lhs.ty.clone();
    Expression::new(
        ExpressionKind::Assignment {
            operator: AssignmentOperator::Assign,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        ty,
    )
}

pub fn postfix(operator: PostfixOperator, operand: Expression) -> Expression {
    let ty = operand.ty.clone();
    Expression::new(
        ExpressionKind::Postfix {
            operator,
            operand: Box::new(operand),
        },
        ty,
    )
}

pub fn prefix(operator: PrefixOperator, operand: Expression) -> Expression {
    let ty = operand.ty.clone();
    Expression::new(
        ExpressionKind::Prefix {
            operator,
            operand: Box::new(operand),
        },
        ty,
    )
}

pub fn index(array: Expression, index: Expression, ty: StaticType) -> Expression {
    Expression::new(
        ExpressionKind::ArrayAccess {
            array: Box::new(array),
            index: Box::new(index),
        },
        Some(ty),
    )
}

pub fn method(name: &str, declaring: ClassId, parameters: Vec<StaticType>, ret: StaticType) -> MethodSymbol {
    MethodSymbol {
        name: name.into(),
        declaring_class: declaring,
        is_static: false,
        is_constructor: false,
        parameters,
        return_type: Some(ret),
    }
}

pub fn call(
    qualifier: Option<Expression>,
    name: &str,
    arguments: Vec<Expression>,
    target: Option<MethodSymbol>,
) -> Expression {
    let ty = target.as_ref().and_then(|method| method.return_type.clone());
    Expression::new(
        ExpressionKind::MethodCall {
            qualifier: qualifier.map(Box::new),
            name: Ident::new(name),
            arguments,
            target,
            scope: None,
        },
        ty,
    )
}

pub fn new_object(class: &str, arguments: Vec<Expression>, constructor: Option<MethodSymbol>) -> Expression {
    Expression::new(
        ExpressionKind::NewObject {
            class_type: StaticType::class(class),
            arguments: Some(arguments),
            constructor,
            anonymous: false,
        },
        Some(StaticType::class(class)),
    )
}

// Statements

pub fn expr(expression: Expression) -> Statement {
    Statement::new(StatementKind::Expression(expression))
}

pub fn declare(name: &str, ty: StaticType, initializer: Option<Expression>) -> Statement {
    Statement::new(StatementKind::Declaration(vec![Declared::Variable(
        LocalVariable {
            name: Ident::new(name),
            ty,
            initializer,
        },
    )]))
}

pub fn block(statements: Vec<Statement>) -> Statement {
    Statement::new(StatementKind::Block(statements))
}

pub fn fragment(id: u32, statements: Vec<Statement>) -> CodeFragment {
    CodeFragment {
        id: FragmentId(id),
        text: Default::default(),
        context_class: None,
        statements,
    }
}

// Building

pub fn build_in(classes: &ClassTable, context: ClassId, fragment: &CodeFragment) -> Result<ExpressionEvaluator, EvaluateError> {
    EvaluatorBuilder::new(classes)
        .with_context_class(context)
        .build_fragment(fragment)
}

pub fn build_expression_in(
    classes: &ClassTable,
    context: ClassId,
    expression: &Expression,
) -> Result<ExpressionEvaluator, EvaluateError> {
    EvaluatorBuilder::new(classes)
        .with_context_class(context)
        .build_expression(expression)
}

pub fn sexpr(tree: &ExpressionEvaluator) -> String {
    SExpressionFormatter.format(tree)
}
