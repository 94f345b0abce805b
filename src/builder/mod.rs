//! Compiles typed syntax into an [`ExpressionEvaluator`].
//!
//! Every visit returns the node it built, so nested visits never interfere with
//! each other. All symbol resolution happens here; the resulting tree only
//! talks to the [`EvaluationContext`](crate::context::EvaluationContext).

mod expression;
mod reference;

use crate::{
    evaluator::{
        error::{EvaluateError, EvaluateErrorKind},
        fragment::FragmentScope,
        Evaluator, EvaluatorRef, ExpressionEvaluator, IncompleteEvaluator,
    },
    source::Span,
    string::{Ident, IdentName, TypeName},
    syntax::{
        symbol::{ClassId, ClassTable, FragmentId, SourcePosition},
        types::{PrimitiveType, StaticType},
        CodeFragment, Declared, Element, Expression, ExpressionKind, Statement, StatementKind,
    },
};
use compact_str::{format_compact, CompactString};
use std::collections::HashSet;

pub struct EvaluatorBuilder<'a> {
    classes: &'a ClassTable,
    context_class: Option<ClassId>,
    position: Option<SourcePosition>,
    text: CompactString,
}

impl<'a> EvaluatorBuilder<'a> {
    pub fn new(classes: &'a ClassTable) -> Self {
        Self {
            classes,
            context_class: None,
            position: None,
            text: CompactString::default(),
        }
    }

    /// Class whose members unqualified names refer to.
    pub fn with_context_class(mut self, class: ClassId) -> Self {
        self.context_class = Some(class);
        self
    }

    /// Breakpoint position; its class disambiguates the executing class.
    pub fn with_position(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }

    /// Source text for statement and expression roots, used in error messages.
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.into();
        self
    }

    pub fn build(&self, element: &Element) -> Result<ExpressionEvaluator, EvaluateError> {
        match element {
            Element::Fragment(fragment) => self.build_fragment(fragment),
            Element::Statement(statement) => self.build_statement(statement),
            Element::Expression(expression) => self.build_expression(expression),
        }
    }

    pub fn build_fragment(
        &self,
        fragment: &CodeFragment,
    ) -> Result<ExpressionEvaluator, EvaluateError> {
        let mut compiler = self.compiler(fragment.context_class, fragment.text.clone());
        let root = compiler.compile_fragment(fragment)?;
        Ok(compiler.finish(root))
    }

    pub fn build_statement(
        &self,
        statement: &Statement,
    ) -> Result<ExpressionEvaluator, EvaluateError> {
        let mut compiler = self.compiler(None, self.text.clone());
        match compiler.compile_statement(statement)? {
            Some(root) => Ok(compiler.finish(root)),
            None => Err(compiler.invalid(statement.span)),
        }
    }

    pub fn build_expression(
        &self,
        expression: &Expression,
    ) -> Result<ExpressionEvaluator, EvaluateError> {
        let mut compiler = self.compiler(None, self.text.clone());
        let root = compiler.compile_expression(expression)?;
        Ok(compiler.finish(root))
    }

    fn compiler(&self, own_class: Option<ClassId>, text: CompactString) -> Compiler<'a> {
        let context_class = own_class
            .or(self.context_class)
            .or(self.position.and_then(|position| position.class));
        tracing::debug!(?context_class, position = ?self.position, "building evaluator");
        Compiler {
            classes: self.classes,
            context_class,
            position: self.position,
            text,
            tree: IncompleteEvaluator::new(),
            fragments: Vec::new(),
            visited_fragments: HashSet::new(),
            loops: Vec::new(),
        }
    }
}

/// State of a single build.
struct Compiler<'a> {
    classes: &'a ClassTable,
    context_class: Option<ClassId>,
    position: Option<SourcePosition>,
    text: CompactString,
    tree: IncompleteEvaluator,
    /// Synthetic variable scopes of the fragments being compiled, innermost last.
    fragments: Vec<FragmentScope>,
    visited_fragments: HashSet<FragmentId>,
    /// Labels of the enclosing loops, innermost last.
    loops: Vec<Option<IdentName>>,
}

// Base
impl Compiler<'_> {
    fn finish(self, root: EvaluatorRef) -> ExpressionEvaluator {
        let tree = self.tree.finish(root);
        tracing::debug!(nodes = tree.len(), "built evaluator");
        tree
    }

    fn push(&mut self, node: Evaluator, span: Span) -> EvaluatorRef {
        tracing::debug!(node = node.name(), "compiled");
        self.tree.push(node, span)
    }

    fn error(&self, kind: EvaluateErrorKind, span: Span) -> EvaluateError {
        EvaluateError::new(kind, span)
    }

    fn invalid(&self, span: Span) -> EvaluateError {
        self.error(EvaluateErrorKind::InvalidExpression(self.text_of(span)), span)
    }

    fn text_of(&self, span: Span) -> CompactString {
        span.slice(&self.text)
            .map(CompactString::from)
            .unwrap_or_else(|| "<unknown>".into())
    }

    fn position_class(&self) -> Option<ClassId> {
        self.position.and_then(|position| position.class)
    }

    fn class_name(&self, class: ClassId, span: Span) -> Result<TypeName, EvaluateError> {
        self.classes.name_of(class).cloned().ok_or_else(|| {
            self.error(
                EvaluateErrorKind::InvalidExpression(format_compact!("unknown class #{}", class.0)),
                span,
            )
        })
    }

    /// Assignment conversion check, including narrowing of int constants.
    fn is_assignment_compatible(&self, target: &StaticType, source: &Expression) -> bool {
        let source_type = match (&source.ty, &source.kind) {
            (Some(ty), _) => ty.clone(),
            (None, ExpressionKind::Literal(literal)) => match literal.static_type() {
                Some(ty) => ty,
                None => return true,
            },
            (None, _) => return true,
        };
        if target.is_assignable_from(&source_type, self.classes) {
            return true;
        }
        // Constant narrowing, also into the matching box.
        let narrowed = match target {
            StaticType::Primitive(primitive) => Some(*primitive),
            StaticType::Class(name) => PrimitiveType::from_boxed_name(name),
            _ => None,
        };
        match (narrowed, source.int_constant()) {
            (Some(primitive), Some(value)) => {
                matches!(
                    primitive,
                    PrimitiveType::Byte | PrimitiveType::Short | PrimitiveType::Char
                ) && primitive.holds_constant(value)
            }
            _ => false,
        }
    }
}

// Statements
impl Compiler<'_> {
    fn compile_fragment(&mut self, fragment: &CodeFragment) -> Result<EvaluatorRef, EvaluateError> {
        tracing::debug!(
            fragment = fragment.id.0,
            statements = fragment.statements.len(),
            "compile code fragment"
        );
        self.visited_fragments.insert(fragment.id);
        let outer_text = (!fragment.text.is_empty())
            .then(|| std::mem::replace(&mut self.text, fragment.text.clone()));
        let outer_class = fragment
            .context_class
            .map(|class| std::mem::replace(&mut self.context_class, Some(class)));

        self.fragments.push(FragmentScope::new());
        let statements = self.compile_statements(&fragment.statements);
        let scope = self.fragments.pop().unwrap_or_default();

        let span = Span::new(0, self.text.len());
        if let Some(text) = outer_text {
            self.text = text;
        }
        if let Some(class) = outer_class {
            self.context_class = class;
        }
        let statements = statements?;
        Ok(self.push(Evaluator::CodeFragment { scope, statements }, span))
    }

    fn compile_statements(
        &mut self,
        statements: &[Statement],
    ) -> Result<Vec<EvaluatorRef>, EvaluateError> {
        let mut compiled = Vec::with_capacity(statements.len());
        for statement in statements {
            if let Some(node) = self.compile_statement(statement)? {
                compiled.push(node);
            }
        }
        Ok(compiled)
    }

    fn compile_statement(
        &mut self,
        statement: &Statement,
    ) -> Result<Option<EvaluatorRef>, EvaluateError> {
        tracing::debug!(kind = statement.kind.name(), "compile statement");
        let span = statement.span;
        let node = match &statement.kind {
            StatementKind::Expression(expression) => self.compile_expression(expression)?,
            StatementKind::Declaration(declared) => {
                return self.compile_declaration(declared, span)
            }
            StatementKind::Block(statements) => {
                let statements = self.compile_statements(statements)?;
                self.push(Evaluator::Block { statements }, span)
            }
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.compile_expression(condition)?;
                let then_branch = self.compile_branch(then_branch)?;
                let else_branch = match else_branch {
                    Some(else_branch) => Some(self.compile_branch(else_branch)?),
                    None => None,
                };
                self.push(
                    Evaluator::If {
                        condition,
                        then_branch,
                        else_branch,
                    },
                    span,
                )
            }
            StatementKind::While { .. } | StatementKind::For { .. } => {
                self.compile_loop(statement, None)?
            }
            StatementKind::Labeled { label, body } => match body.kind {
                StatementKind::While { .. } | StatementKind::For { .. } => {
                    self.compile_loop(body, Some(label))?
                }
                ref other => {
                    return Err(self.error(
                        EvaluateErrorKind::StatementNotSupported(format_compact!(
                            "labeled {}",
                            other.name()
                        )),
                        span,
                    ))
                }
            },
            StatementKind::Break { label } => {
                self.check_jump(label.as_ref(), span, EvaluateErrorKind::BreakOutsideLoop)?;
                let label = label.as_ref().map(|label| label.name.clone());
                self.push(Evaluator::Break { label }, span)
            }
            StatementKind::Continue { label } => {
                self.check_jump(label.as_ref(), span, EvaluateErrorKind::ContinueOutsideLoop)?;
                let label = label.as_ref().map(|label| label.name.clone());
                self.push(Evaluator::Continue { label }, span)
            }
            StatementKind::Fragment(fragment) => self.compile_fragment(fragment)?,
            StatementKind::Empty => return Ok(None),
            StatementKind::Error(text) => {
                return Err(self.error(EvaluateErrorKind::InvalidExpression(text.clone()), span))
            }
            unsupported @ (StatementKind::DoWhile { .. }
            | StatementKind::ForEach { .. }
            | StatementKind::Return(_)
            | StatementKind::Throw(_)
            | StatementKind::Switch { .. }
            | StatementKind::Try { .. }
            | StatementKind::Synchronized { .. }) => {
                return Err(self.error(
                    EvaluateErrorKind::StatementNotSupported(unsupported.name().into()),
                    span,
                ))
            }
        };
        Ok(Some(node))
    }

    /// A branch always yields a node, even when the statement itself is empty.
    fn compile_branch(&mut self, statement: &Statement) -> Result<EvaluatorRef, EvaluateError> {
        match self.compile_statement(statement)? {
            Some(node) => Ok(node),
            None => Ok(self.push(
                Evaluator::Block {
                    statements: Vec::new(),
                },
                statement.span,
            )),
        }
    }

    fn compile_loop(
        &mut self,
        statement: &Statement,
        label: Option<&Ident>,
    ) -> Result<EvaluatorRef, EvaluateError> {
        let span = statement.span;
        let label = label.map(|label| label.name.clone());
        match &statement.kind {
            StatementKind::While { condition, body } => {
                let condition = self.compile_expression(condition)?;
                let body = self.compile_loop_body(body, &label)?;
                Ok(self.push(
                    Evaluator::While {
                        condition,
                        body,
                        label,
                    },
                    span,
                ))
            }
            StatementKind::For {
                initializer,
                condition,
                update,
                body,
            } => {
                let initializer = match initializer {
                    Some(initializer) => self.compile_statement(initializer)?,
                    None => None,
                };
                let condition = condition
                    .as_ref()
                    .map(|condition| self.compile_expression(condition))
                    .transpose()?;
                let update = match update {
                    Some(update) => self.compile_statement(update)?,
                    None => None,
                };
                let body = self.compile_loop_body(body, &label)?;
                Ok(self.push(
                    Evaluator::For {
                        initializer,
                        condition,
                        update,
                        body,
                        label,
                    },
                    span,
                ))
            }
            other => Err(self.error(
                EvaluateErrorKind::StatementNotSupported(other.name().into()),
                span,
            )),
        }
    }

    fn compile_loop_body(
        &mut self,
        body: &Statement,
        label: &Option<IdentName>,
    ) -> Result<Option<EvaluatorRef>, EvaluateError> {
        self.loops.push(label.clone());
        let body = self.compile_statement(body);
        self.loops.pop();
        body
    }

    fn check_jump(
        &self,
        label: Option<&Ident>,
        span: Span,
        outside_loop: EvaluateErrorKind,
    ) -> Result<(), EvaluateError> {
        if self.loops.is_empty() {
            return Err(self.error(outside_loop, span));
        }
        if let Some(label) = label {
            let known = self
                .loops
                .iter()
                .any(|enclosing| enclosing.as_ref() == Some(&label.name));
            if !known {
                return Err(self.error(
                    EvaluateErrorKind::UndefinedLabel(label.name.clone()),
                    span,
                ));
            }
        }
        Ok(())
    }

    fn compile_declaration(
        &mut self,
        declared: &[Declared],
        span: Span,
    ) -> Result<Option<EvaluatorRef>, EvaluateError> {
        let mut assignments = Vec::new();
        for item in declared {
            let variable = match item {
                Declared::Variable(variable) => variable,
                Declared::Class(class) => {
                    let name = self
                        .classes
                        .name_of(*class)
                        .map(|name| name.as_ref())
                        .unwrap_or("<anonymous>");
                    return Err(self.error(
                        EvaluateErrorKind::UnsupportedDeclaration(format_compact!(
                            "local class {name}"
                        )),
                        span,
                    ));
                }
            };
            let name = &variable.name;
            if self.fragments.is_empty() {
                return Err(self.error(
                    EvaluateErrorKind::LocalVariableDeclarationsNotSupported,
                    span,
                ));
            }
            if self.fragments.iter().any(|scope| scope.contains(&name.name)) {
                return Err(self.error(
                    EvaluateErrorKind::VariableAlreadyDeclared(name.name.clone()),
                    name.span,
                ));
            }
            if let Some(scope) = self.fragments.last_mut() {
                scope.declare(name.name.clone(), variable.ty.default_value());
            }

            let Some(initializer) = &variable.initializer else {
                continue;
            };
            if !self.is_assignment_compatible(&variable.ty, initializer) {
                return Err(self.error(
                    EvaluateErrorKind::IncompatibleVariableInitializer(name.name.clone()),
                    initializer.span,
                ));
            }
            let rhs = self.compile_assigned(&variable.ty, initializer)?;
            let lhs = self.push(
                Evaluator::SyntheticVariable {
                    name: name.name.clone(),
                    ty: Some(variable.ty.clone()),
                },
                name.span,
            );
            assignments.push(self.push(Evaluator::Assignment { lhs, rhs }, span));
        }

        if assignments.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.push(
            Evaluator::Block {
                statements: assignments,
            },
            span,
        )))
    }

    /// Compiles the value stored into a slot of type `target`; bare `{...}` initializers become array creations.
    fn compile_assigned(
        &mut self,
        target: &StaticType,
        value: &Expression,
    ) -> Result<EvaluatorRef, EvaluateError> {
        match &value.kind {
            ExpressionKind::ArrayInitializer(elements) => {
                self.compile_array_creation(target, None, Some(elements), value.span)
            }
            _ => self.compile_expression(value),
        }
    }
}
