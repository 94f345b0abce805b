mod common;

use common::*;
use frameval::{
    builder::EvaluatorBuilder,
    evaluator::{error::EvaluateErrorKind, Evaluator},
    string::Ident,
    syntax::{
        symbol::{ClassId, ClassInfo, ClassTable, MethodSymbol, Symbol, VariableOwner, VariableSymbol},
        types::StaticType,
        AssignmentOperator, BinaryOperator, ClassQualifier, Expression, ExpressionKind, Literal,
        PrefixOperator, Statement, StatementKind,
    },
};
use pretty_assertions::assert_eq;

const OUTER: ClassId = ClassId(0);
const MIDDLE: ClassId = ClassId(1);
const BASE: ClassId = ClassId(2);
const INNER: ClassId = ClassId(3);

/// `Outer { Middle { Inner extends Base } }`
fn nested_table() -> ClassTable {
    let mut classes = ClassTable::new();
    classes.declare(ClassInfo::new("demo.Outer"));
    classes.declare(ClassInfo::new("demo.Outer$Middle").nested_in(OUTER));
    classes.declare(ClassInfo::new("demo.Base"));
    classes.declare(
        ClassInfo::new("demo.Outer$Middle$Inner")
            .nested_in(MIDDLE)
            .extends(BASE),
    );
    classes
}

fn check_expression(classes: &ClassTable, context: ClassId, expression: Expression, expected: &str) {
    init_test_logging();
    let tree = build_expression_in(classes, context, &expression).expect("builds");
    assert_eq!(sexpr(&tree), expected);
}

fn check_rejected(statements: Vec<Statement>, expected: EvaluateErrorKind) {
    init_test_logging();
    let classes = main_table();
    let error = build_in(&classes, MAIN, &fragment(0, statements)).expect_err("is rejected");
    assert_eq!(error.kind, expected);
    assert!(error.is_compile_error());
}

#[test]
fn smoke_test() {
    check_expression(&main_table(), MAIN, int_lit(1), "1");
}

#[test]
fn fragment_variables_become_synthetic() {
    init_test_logging();
    let classes = main_table();
    let fragment = fragment(
        0,
        vec![
            declare("x", int(), Some(int_lit(1))),
            expr(binary(
                BinaryOperator::Add,
                synthetic("x", int(), 0),
                local("y", int(), MAIN),
                int(),
            )),
        ],
    );
    let tree = build_in(&classes, MAIN, &fragment).unwrap();
    assert_eq!(
        sexpr(&tree),
        "(fragment [x] (block (= (synthetic x) 1)) (+ (synthetic x) (local y)))"
    );
}

#[test]
fn variables_of_unvisited_fragments_are_frame_locals() {
    init_test_logging();
    let classes = main_table();
    let fragment = fragment(0, vec![expr(synthetic("z", int(), 7))]);
    let tree = build_in(&classes, MAIN, &fragment).unwrap();
    assert_eq!(sexpr(&tree), "(fragment [] (local z))");
}

#[test]
fn uninitialized_declarations_only_reserve_a_slot() {
    init_test_logging();
    let classes = main_table();
    let fragment = fragment(
        0,
        vec![declare("flag", boolean(), None), expr(synthetic("flag", boolean(), 0))],
    );
    let tree = build_in(&classes, MAIN, &fragment).unwrap();
    assert_eq!(sexpr(&tree), "(fragment [flag] (synthetic flag))");
}

#[test]
fn instance_fields_count_hops_to_the_declaring_class() {
    let classes = nested_table();
    check_expression(
        &classes,
        INNER,
        field("count", int(), OUTER, false),
        "(field count (this 2))",
    );
    check_expression(
        &classes,
        OUTER,
        field("count", int(), OUTER, false),
        "(field count (this 0))",
    );
    check_expression(
        &classes,
        INNER,
        field("id", int(), BASE, false),
        "(field id (this 0))",
    );
}

#[test]
fn static_fields_read_from_the_type() {
    check_expression(
        &nested_table(),
        INNER,
        field("LIMIT", int(), OUTER, true),
        "(field LIMIT (type demo.Outer))",
    );
}

#[test]
fn unresolved_names_use_the_qualifier() {
    let classes = nested_table();
    let class_qualifier = Expression::new(
        ExpressionKind::Reference {
            qualifier: None,
            name: Ident::new("Outer"),
            target: Some(Symbol::Class(OUTER)),
        },
        None,
    );
    check_expression(
        &classes,
        INNER,
        qualified(class_qualifier, "VERSION", Some(int())),
        "(field VERSION (type demo.Outer))",
    );
    check_expression(
        &classes,
        INNER,
        qualified(local("items", int_array(), INNER), "length", Some(int())),
        "(field length (local items))",
    );
    check_expression(&classes, INNER, unresolved("ghost", None), "(local ghost)");
}

#[test]
fn captured_variables_read_synthetic_fields() {
    let mut classes = ClassTable::new();
    let outer = classes.declare(ClassInfo::new("demo.Outer"));
    let mut anonymous = ClassInfo::new("demo.Outer$1").nested_in(outer);
    anonymous.anonymous = true;
    let anonymous = classes.declare(anonymous);

    check_expression(
        &classes,
        anonymous,
        local("x", int(), outer),
        "(field val$x (this 0))",
    );

    let constant = VariableSymbol {
        name: "limit".into(),
        ty: int(),
        owner: VariableOwner::Method { class: outer },
        constant: Some(Literal::Int(42)),
    };
    let reference = Expression::new(
        ExpressionKind::Reference {
            qualifier: None,
            name: Ident::new("limit"),
            target: Some(Symbol::Variable(constant)),
        },
        Some(int()),
    );
    check_expression(&classes, anonymous, reference, "42");
}

#[test]
fn variables_outside_the_closure_are_rejected() {
    let mut classes = nested_table();
    let unrelated = classes.declare(ClassInfo::new("demo.Elsewhere"));
    let error = build_expression_in(&classes, INNER, &local("x", int(), unrelated)).unwrap_err();
    assert_eq!(
        error.kind,
        EvaluateErrorKind::LocalVariableMissingFromClassClosure("x".into())
    );
}

#[test]
fn qualified_this_counts_lexical_hops() {
    let this = Expression::new(
        ExpressionKind::This {
            qualifier: Some(ClassQualifier {
                name: Ident::new("Outer"),
                target: Some(OUTER),
            }),
        },
        Some(StaticType::class("demo.Outer")),
    );
    check_expression(&nested_table(), INNER, this, "(this 2)");
}

#[test]
fn method_calls_are_pinned_and_target_the_right_instance() {
    let classes = nested_table();
    let super_qualifier = Expression::new(
        ExpressionKind::Super { qualifier: None },
        Some(StaticType::class("demo.Base")),
    );
    check_expression(
        &classes,
        INNER,
        call(
            Some(super_qualifier),
            "describe",
            vec![],
            Some(method("describe", BASE, vec![], string())),
        ),
        "(pin (super-call describe (super 0)))",
    );

    let scoped = Expression::new(
        ExpressionKind::MethodCall {
            qualifier: None,
            name: Ident::new("size"),
            arguments: vec![],
            target: Some(method("size", OUTER, vec![], int())),
            scope: Some(OUTER),
        },
        Some(int()),
    );
    check_expression(&classes, INNER, scoped, "(pin (call size (this 2)))");

    // The resolve scope is a lexical class, never a superclass of one.
    let inherited = Expression::new(
        ExpressionKind::MethodCall {
            qualifier: None,
            name: Ident::new("describe"),
            arguments: vec![],
            target: Some(method("describe", BASE, vec![], string())),
            scope: Some(BASE),
        },
        Some(string()),
    );
    let error = build_expression_in(&classes, INNER, &inherited).expect_err("is rejected");
    assert!(matches!(error.kind, EvaluateErrorKind::InvalidExpression(_)));

    let mut max = method("max", OUTER, vec![int(), int()], int());
    max.is_static = true;
    assert_eq!(max.signature(), "(II)I");
    check_expression(
        &classes,
        INNER,
        call(None, "max", vec![int_lit(1), int_lit(2)], Some(max)),
        "(pin (call max (type demo.Outer) 1 2))",
    );
}

#[test]
fn class_literals() {
    let classes = main_table();
    check_expression(
        &classes,
        MAIN,
        Expression::new(
            ExpressionKind::ClassObject(int()),
            Some(StaticType::class("java.lang.Class")),
        ),
        "(field TYPE (type java.lang.Integer))",
    );
    check_expression(
        &classes,
        MAIN,
        Expression::new(
            ExpressionKind::ClassObject(string()),
            Some(StaticType::class("java.lang.Class")),
        ),
        "(class (type java.lang.String))",
    );
}

#[test]
fn prefix_increment_reuses_the_operand_node() {
    init_test_logging();
    let classes = main_table();
    let expression = prefix(PrefixOperator::Increment, local("x", int(), MAIN));
    let tree = build_expression_in(&classes, MAIN, &expression).unwrap();
    assert_eq!(sexpr(&tree), "(= (local x) (+ (local x) 1))");

    let Evaluator::Assignment { lhs, rhs } = tree.get_root() else {
        panic!("root should be an assignment");
    };
    let Some(Evaluator::Binary { lhs: operand, .. }) = tree.get_node(*rhs) else {
        panic!("value should be a binary node");
    };
    assert_eq!(lhs, operand);
}

#[test]
fn array_initializers_in_declarations_create_arrays() {
    init_test_logging();
    let classes = main_table();
    let initializer = Expression::new(
        ExpressionKind::ArrayInitializer(vec![int_lit(1), int_lit(2)]),
        None,
    );
    let fragment = fragment(0, vec![declare("a", int_array(), Some(initializer))]);
    let tree = build_in(&classes, MAIN, &fragment).unwrap();
    assert_eq!(
        sexpr(&tree),
        "(fragment [a] (block (= (synthetic a) (pin (new-array int[] (array 1 2))))))"
    );
}

#[test]
fn loops_keep_their_labels() {
    init_test_logging();
    let classes = main_table();
    let body = Statement::new(StatementKind::Break {
        label: Some(Ident::new("outer")),
    });
    let labeled = Statement::new(StatementKind::Labeled {
        label: Ident::new("outer"),
        body: Box::new(Statement::new(StatementKind::While {
            condition: bool_lit(true),
            body: Box::new(body),
        })),
    });
    let tree = build_in(&classes, MAIN, &fragment(0, vec![labeled])).unwrap();
    assert_eq!(sexpr(&tree), "(fragment [] (while:outer true (break outer)))");
}

#[test]
fn position_class_is_the_fallback_context() {
    init_test_logging();
    let classes = nested_table();
    let tree = EvaluatorBuilder::new(&classes)
        .with_position(frameval::syntax::symbol::SourcePosition {
            line: 10,
            class: Some(INNER),
        })
        .build_expression(&field("count", int(), OUTER, false))
        .unwrap();
    assert_eq!(sexpr(&tree), "(field count (this 2))");
}

#[test]
fn unsupported_constructs_are_rejected() {
    let compound = Expression::new(
        ExpressionKind::Assignment {
            operator: AssignmentOperator::Add,
            lhs: Box::new(local("x", int(), MAIN)),
            rhs: Box::new(int_lit(1)),
        },
        Some(int()),
    );
    check_rejected(
        vec![expr(compound)],
        EvaluateErrorKind::OperationNotSupported("+="),
    );
    check_rejected(
        vec![expr(Expression::new(ExpressionKind::Lambda, None))],
        EvaluateErrorKind::LambdaNotSupported,
    );

    let anonymous = Expression::new(
        ExpressionKind::NewObject {
            class_type: StaticType::class("java.lang.Runnable"),
            arguments: Some(vec![]),
            constructor: None,
            anonymous: true,
        },
        None,
    );
    check_rejected(
        vec![expr(anonymous)],
        EvaluateErrorKind::AnonymousClassNotSupported,
    );

    let matrix = Expression::new(
        ExpressionKind::NewArray {
            array_type: StaticType::array_of(int_array()),
            dimensions: vec![int_lit(2), int_lit(3)],
            initializer: None,
        },
        None,
    );
    check_rejected(
        vec![expr(matrix)],
        EvaluateErrorKind::MultiDimensionalArraysNotSupported,
    );

    let do_while = Statement::new(StatementKind::DoWhile {
        body: Box::new(block(vec![])),
        condition: bool_lit(false),
    });
    check_rejected(
        vec![do_while],
        EvaluateErrorKind::StatementNotSupported("do-while".into()),
    );

    let labeled_block = Statement::new(StatementKind::Labeled {
        label: Ident::new("here"),
        body: Box::new(block(vec![])),
    });
    check_rejected(
        vec![labeled_block],
        EvaluateErrorKind::StatementNotSupported("labeled block".into()),
    );
}

#[test]
fn declarations_are_checked() {
    init_test_logging();
    let classes = main_table();
    let error = EvaluatorBuilder::new(&classes)
        .build_statement(&declare("x", int(), None))
        .unwrap_err();
    assert_eq!(error.kind, EvaluateErrorKind::LocalVariableDeclarationsNotSupported);

    check_rejected(
        vec![declare("x", int(), None), declare("x", long(), None)],
        EvaluateErrorKind::VariableAlreadyDeclared("x".into()),
    );
    check_rejected(
        vec![declare("x", int(), Some(string_lit("s")))],
        EvaluateErrorKind::IncompatibleVariableInitializer("x".into()),
    );
    check_rejected(
        vec![declare("b", byte(), Some(int_lit(300)))],
        EvaluateErrorKind::IncompatibleVariableInitializer("b".into()),
    );
    let narrowed = build_in(
        &classes,
        MAIN,
        &fragment(0, vec![declare("b", byte(), Some(int_lit(10)))]),
    );
    assert!(narrowed.is_ok());

    check_rejected(
        vec![Statement::new(StatementKind::Declaration(vec![
            frameval::syntax::Declared::Class(MAIN),
        ]))],
        EvaluateErrorKind::UnsupportedDeclaration("local class demo.Main".into()),
    );
}

#[test]
fn declarations_box_and_unbox() {
    init_test_logging();
    let classes = main_table();
    let integer = StaticType::class("java.lang.Integer");
    let accepted = [
        declare("i", integer.clone(), Some(int_lit(5))),
        declare("o", StaticType::object(), Some(int_lit(5))),
        declare("n", StaticType::class("java.lang.Number"), Some(int_lit(5))),
        declare("v", int(), Some(local("boxed", integer.clone(), MAIN))),
        declare("w", long(), Some(local("boxed", integer.clone(), MAIN))),
        declare("b", StaticType::class("java.lang.Byte"), Some(int_lit(10))),
    ];
    for statement in accepted {
        let built = build_in(&classes, MAIN, &fragment(0, vec![statement.clone()]));
        assert!(built.is_ok(), "{statement:?} should build");
    }

    check_rejected(
        vec![declare("l", StaticType::class("java.lang.Long"), Some(int_lit(5)))],
        EvaluateErrorKind::IncompatibleVariableInitializer("l".into()),
    );
    check_rejected(
        vec![declare("b", StaticType::class("java.lang.Byte"), Some(int_lit(300)))],
        EvaluateErrorKind::IncompatibleVariableInitializer("b".into()),
    );
    check_rejected(
        vec![declare("s", byte(), Some(local("boxed", integer, MAIN)))],
        EvaluateErrorKind::IncompatibleVariableInitializer("s".into()),
    );
}

#[test]
fn untyped_literals_are_checked_by_their_kind() {
    let untyped = Expression::new(ExpressionKind::Literal(Literal::String("s".into())), None);
    check_rejected(
        vec![declare("x", int(), Some(untyped))],
        EvaluateErrorKind::IncompatibleVariableInitializer("x".into()),
    );
    let untyped = Expression::new(ExpressionKind::Literal(Literal::Int(3)), None);
    let built = build_in(
        &main_table(),
        MAIN,
        &fragment(0, vec![declare("x", long(), Some(untyped))]),
    );
    assert!(built.is_ok());
}

#[test]
fn jumps_need_an_enclosing_loop() {
    check_rejected(
        vec![Statement::new(StatementKind::Break { label: None })],
        EvaluateErrorKind::BreakOutsideLoop,
    );
    check_rejected(
        vec![Statement::new(StatementKind::Continue { label: None })],
        EvaluateErrorKind::ContinueOutsideLoop,
    );
    let undefined = Statement::new(StatementKind::While {
        condition: bool_lit(true),
        body: Box::new(Statement::new(StatementKind::Break {
            label: Some(Ident::new("missing")),
        })),
    });
    check_rejected(
        vec![undefined],
        EvaluateErrorKind::UndefinedLabel("missing".into()),
    );
}

#[test]
fn unresolvable_expressions_are_rejected() {
    let untyped = Expression::new(
        ExpressionKind::Binary {
            operator: BinaryOperator::Add,
            lhs: Box::new(int_lit(1)),
            rhs: Box::new(int_lit(2)),
        },
        None,
    );
    check_rejected(
        vec![expr(untyped)],
        EvaluateErrorKind::UnknownExpressionType("<unknown>".into()),
    );
    check_rejected(
        vec![expr(new_object("demo.Point", vec![int_lit(1)], None))],
        EvaluateErrorKind::CannotResolveConstructor("<unknown>".into()),
    );

    let untyped_method = MethodSymbol {
        return_type: None,
        ..method("compute", MAIN, vec![], int())
    };
    check_rejected(
        vec![expr(call(None, "compute", vec![], Some(untyped_method)))],
        EvaluateErrorKind::UnknownMethodReturnType("compute".into()),
    );
    check_rejected(
        vec![expr(Expression::new(
            ExpressionKind::Literal(Literal::Malformed("0xZZ".into())),
            None,
        ))],
        EvaluateErrorKind::InvalidLiteral("0xZZ".into()),
    );
}

#[test]
fn error_messages_quote_the_source_text() {
    init_test_logging();
    let classes = main_table();
    let text = "a + b";
    let untyped = Expression::new(
        ExpressionKind::Binary {
            operator: BinaryOperator::Add,
            lhs: Box::new(unresolved("a", Some(int()))),
            rhs: Box::new(unresolved("b", Some(int()))),
        },
        None,
    )
    .at(frameval::source::Span::new(0, text.len()));
    let error = EvaluatorBuilder::new(&classes)
        .with_text(text)
        .build_expression(&untyped)
        .unwrap_err();
    assert_eq!(error.kind, EvaluateErrorKind::UnknownExpressionType("a + b".into()));
    assert_eq!(error.code(), "EB003");
}
