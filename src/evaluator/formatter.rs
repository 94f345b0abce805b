use super::{error::EvaluateError, Evaluator, EvaluatorRef, ExpressionEvaluator};
use crate::{
    source::{LineBreaks, Span},
    string::IdentName,
    syntax::PostfixOperator,
    value::Value,
};
use ariadne::{Color, Label, Report, ReportKind, Source};
use std::path::Path;

const ARIADNE_MSG: &str = "Ariadne produces valid utf-8 strings";
const ARIADNE_WRITE_MSG: &str = "Write into buffer should not fail.";

pub trait EvaluatorFormatter {
    fn format(&self, tree: &ExpressionEvaluator) -> String;
}

pub struct DebugFormatter;

impl EvaluatorFormatter for DebugFormatter {
    fn format(&self, tree: &ExpressionEvaluator) -> String {
        format!("{tree:#?}")
    }
}

/// Dumps the tree as nested s-expressions, one node per parenthesised form.
pub struct SExpressionFormatter;

impl SExpressionFormatter {
    fn format_literal(value: &Value) -> String {
        match value {
            Value::String(v) => format!("\"{}\"", v.escape_debug()),
            Value::Char(_) => format!("'{value}'"),
            Value::Long(v) => format!("{v}L"),
            Value::Float(_) => format!("{value}f"),
            other => format!("{other}"),
        }
    }

    fn format_label(keyword: &str, label: &Option<IdentName>) -> String {
        match label {
            Some(label) => format!("{keyword}:{label}"),
            None => keyword.into(),
        }
    }

    fn format_optional(tree: &ExpressionEvaluator, node: &Option<EvaluatorRef>) -> String {
        match node {
            Some(node) => Self::format_node(tree, *node),
            None => "_".into(),
        }
    }

    fn format_list(head: String, tree: &ExpressionEvaluator, nodes: &[EvaluatorRef]) -> String {
        let mut buffer = format!("({head}");
        for node in nodes {
            buffer.push(' ');
            buffer.push_str(&Self::format_node(tree, *node));
        }
        buffer.push(')');
        buffer
    }

    fn format_node(tree: &ExpressionEvaluator, node: EvaluatorRef) -> String {
        let current = tree
            .get_node(node)
            .expect("Caller should make sure the ref is valid.");
        let fmt = |node: &EvaluatorRef| Self::format_node(tree, *node);

        match current {
            Evaluator::Literal { value } => Self::format_literal(value),
            Evaluator::LocalVariable { name, .. } => format!("(local {name})"),
            Evaluator::SyntheticVariable { name, .. } => format!("(synthetic {name})"),
            Evaluator::Field { object, name, .. } => format!("(field {name} {})", fmt(object)),
            Evaluator::ArrayAccess { array, index, .. } => {
                format!("(index {} {})", fmt(array), fmt(index))
            }
            Evaluator::Type { name } => format!("(type {name})"),
            Evaluator::This { hops } => format!("(this {hops})"),
            Evaluator::Super { hops } => format!("(super {hops})"),
            Evaluator::Binary {
                operator, lhs, rhs, ..
            } => format!("({} {} {})", operator.sign(), fmt(lhs), fmt(rhs)),
            Evaluator::Unary {
                operator, operand, ..
            } => format!("({} {})", operator.sign(), fmt(operand)),
            Evaluator::Postfix {
                operator, operand, ..
            } => {
                let sign = match operator {
                    PostfixOperator::Increment => "post++",
                    PostfixOperator::Decrement => "post--",
                };
                format!("({sign} {})", fmt(operand))
            }
            Evaluator::Assignment { lhs, rhs } => format!("(= {} {})", fmt(lhs), fmt(rhs)),
            Evaluator::Conditional {
                condition,
                then_branch,
                else_branch,
            } => format!(
                "(? {} {} {})",
                fmt(condition),
                fmt(then_branch),
                fmt(else_branch)
            ),
            Evaluator::InstanceOf { operand, class } => {
                format!("(instanceof {} {})", fmt(operand), fmt(class))
            }
            Evaluator::TypeCast { operand, cast_type } => {
                format!("(cast {cast_type} {})", fmt(operand))
            }
            Evaluator::ClassObject { class } => format!("(class {})", fmt(class)),
            Evaluator::NewInstance {
                class, arguments, ..
            } => Self::format_list(format!("new {}", fmt(class)), tree, arguments),
            Evaluator::NewArray {
                array_type,
                dimension,
                initializer,
            } => match (dimension, initializer) {
                (Some(dimension), _) => format!("(new-array {array_type} {})", fmt(dimension)),
                (None, initializer) => format!(
                    "(new-array {array_type} {})",
                    Self::format_optional(tree, initializer)
                ),
            },
            Evaluator::ArrayInitializer { elements } => {
                Self::format_list("array".into(), tree, elements)
            }
            Evaluator::MethodCall {
                object,
                name,
                arguments,
                invoke_super,
                ..
            } => {
                let keyword = if *invoke_super { "super-call" } else { "call" };
                Self::format_list(format!("{keyword} {name} {}", fmt(object)), tree, arguments)
            }
            Evaluator::Block { statements } => Self::format_list("block".into(), tree, statements),
            Evaluator::CodeFragment { scope, statements } => {
                let slots: Vec<&str> = scope.slots().iter().map(|(name, _)| name.as_ref()).collect();
                Self::format_list(format!("fragment [{}]", slots.join(" ")), tree, statements)
            }
            Evaluator::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    fmt(condition),
                    fmt(then_branch),
                    fmt(else_branch)
                ),
                None => format!("(if {} {})", fmt(condition), fmt(then_branch)),
            },
            Evaluator::While {
                condition,
                body,
                label,
            } => format!(
                "({} {} {})",
                Self::format_label("while", label),
                fmt(condition),
                Self::format_optional(tree, body)
            ),
            Evaluator::For {
                initializer,
                condition,
                update,
                body,
                label,
            } => format!(
                "({} {} {} {} {})",
                Self::format_label("for", label),
                Self::format_optional(tree, initializer),
                Self::format_optional(tree, condition),
                Self::format_optional(tree, update),
                Self::format_optional(tree, body)
            ),
            Evaluator::Break { label } => match label {
                Some(label) => format!("(break {label})"),
                None => "(break)".into(),
            },
            Evaluator::Continue { label } => match label {
                Some(label) => format!("(continue {label})"),
                None => "(continue)".into(),
            },
            Evaluator::DisableGc { inner } => format!("(pin {})", fmt(inner)),
        }
    }
}

impl EvaluatorFormatter for SExpressionFormatter {
    fn format(&self, tree: &ExpressionEvaluator) -> String {
        Self::format_node(tree, tree.root())
    }
}

pub trait ErrorFormatter {
    fn format_error(&self, error: &EvaluateError) -> String;
}

impl ErrorFormatter for DebugFormatter {
    fn format_error(&self, error: &EvaluateError) -> String {
        format!("{error:?}")
    }
}

/// `(line) [Stage] message`, the form a watch row shows inline.
pub struct BasicErrorFormatter {
    line_breaks: LineBreaks,
}

impl BasicErrorFormatter {
    pub fn new(text: &str) -> Self {
        Self {
            line_breaks: LineBreaks::new(text),
        }
    }
}

impl ErrorFormatter for BasicErrorFormatter {
    fn format_error(&self, error: &EvaluateError) -> String {
        let stage = if error.is_compile_error() {
            "Compiler"
        } else {
            "Runtime"
        };
        let line = self
            .line_breaks
            .get_line_from_span(error.span.unwrap_or(Span::EMPTY));
        format!("({line}) [{stage}] {}", error.kind)
    }
}

pub struct PrettyErrorFormatter<'src> {
    text: &'src str,
    path: &'src Path,
}

impl<'src> PrettyErrorFormatter<'src> {
    pub fn new(text: &'src str, path: &'src Path) -> Self {
        Self { text, path }
    }
}

impl<'src> ErrorFormatter for PrettyErrorFormatter<'src> {
    fn format_error(&self, error: &EvaluateError) -> String {
        let path = &self.path.to_string_lossy();
        let span = error.span.unwrap_or(Span::EMPTY);
        let (headline, label) = if error.is_compile_error() {
            ("Cannot compile the expression", "no evaluator for this")
        } else {
            ("Evaluation failed", "while evaluating this")
        };
        let mut output = std::io::Cursor::new(Vec::new());
        Report::build(ReportKind::Error, (path, span.range()))
            .with_code(error.code())
            .with_message(format!("{headline}: {}", error.kind))
            .with_label(
                Label::new((path, span.range()))
                    .with_message(label)
                    .with_color(Color::BrightRed),
            )
            .finish()
            .write((path, Source::from(self.text)), &mut output)
            .expect(ARIADNE_WRITE_MSG);
        String::from_utf8(output.into_inner()).expect(ARIADNE_MSG)
    }
}
