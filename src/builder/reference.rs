//! Names, fields, `this` and method targets.

use super::Compiler;
use crate::{
    evaluator::{
        error::{EvaluateError, EvaluateErrorKind},
        Evaluator, EvaluatorRef,
    },
    source::Span,
    string::{Ident, IdentName, TypeName},
    syntax::{
        symbol::{ClassId, FieldSymbol, MethodSymbol, Symbol, VariableOwner, VariableSymbol},
        ClassQualifier, Expression, ExpressionKind,
    },
    value::Value,
};
use compact_str::format_compact;

const CAPTURED_PREFIX: &str = "val$";

// Names
impl Compiler<'_> {
    pub(super) fn compile_reference(
        &mut self,
        expression: &Expression,
        qualifier: Option<&Expression>,
        name: &Ident,
        target: Option<&Symbol>,
    ) -> Result<EvaluatorRef, EvaluateError> {
        let span = expression.span;
        if name.name.is_empty() {
            return Err(self.error(
                EvaluateErrorKind::InvalidExpression("identifier expected".into()),
                span,
            ));
        }
        match target {
            Some(Symbol::Variable(variable)) => self.compile_variable(variable, span),
            Some(Symbol::Field(field)) => self.compile_field(expression, qualifier, field),
            Some(Symbol::Class(class)) => {
                let name = self.class_name(*class, span)?;
                Ok(self.push(Evaluator::Type { name }, span))
            }
            None => self.compile_unresolved(expression, qualifier, &name.name),
        }
    }

    fn compile_variable(
        &mut self,
        variable: &VariableSymbol,
        span: Span,
    ) -> Result<EvaluatorRef, EvaluateError> {
        let name = variable.name.clone();
        let ty = Some(variable.ty.clone());
        let variable_class = match variable.owner {
            VariableOwner::Fragment(fragment) => {
                if !self.fragments.is_empty() && self.visited_fragments.contains(&fragment) {
                    return Ok(self.push(Evaluator::SyntheticVariable { name, ty }, span));
                }
                self.context_class
            }
            VariableOwner::Method { class } => Some(class),
        };

        let Some(context_class) = self.context_class else {
            return Ok(self.push(Evaluator::LocalVariable { name, ty }, span));
        };
        if variable_class == Some(context_class) {
            return Ok(self.push(Evaluator::LocalVariable { name, ty }, span));
        }

        // Captured by an inner class: read the synthetic copy on the right instance.
        let hops = self
            .classes
            .count_hops(self.classes.outer_of(context_class), |class| {
                Some(class) == variable_class
            })
            .ok_or_else(|| {
                self.error(
                    EvaluateErrorKind::LocalVariableMissingFromClassClosure(name.clone()),
                    span,
                )
            })?;
        if let Some(value) = variable.constant.as_ref().and_then(Value::from_literal) {
            return Ok(self.push(Evaluator::Literal { value }, span));
        }
        let declaring = self
            .position_class()
            .unwrap_or(context_class);
        let declaring = self.classes.name_of(declaring).cloned();
        let object = self.push(Evaluator::This { hops }, span);
        let field: IdentName = format!("{CAPTURED_PREFIX}{name}").into();
        Ok(self.push(
            Evaluator::Field {
                object,
                declaring,
                name: field,
                ty,
            },
            span,
        ))
    }

    fn compile_field(
        &mut self,
        expression: &Expression,
        qualifier: Option<&Expression>,
        field: &FieldSymbol,
    ) -> Result<EvaluatorRef, EvaluateError> {
        let span = expression.span;
        let missing_sources =
            || EvaluateErrorKind::CannotFindSourcesForFieldClass(field.name.clone());
        let Some(field_class) = field.declaring_class else {
            return Err(self.error(missing_sources(), span));
        };
        let declaring = self.class_name(field_class, span)?;

        let object = if field.is_static {
            self.push(
                Evaluator::Type {
                    name: declaring.clone(),
                },
                span,
            )
        } else if let Some(qualifier) = qualifier {
            self.compile_expression(qualifier)?
        } else {
            let Some(context_class) = self.context_class else {
                return Err(self.error(EvaluateErrorKind::CannotFindSourceClass, span));
            };
            let classes = self.classes;
            let hops = classes
                .count_hops(Some(context_class), |class| {
                    class == field_class || classes.is_inheritor(class, field_class)
                })
                .ok_or_else(|| self.error(missing_sources(), span))?;
            self.push(Evaluator::This { hops }, span)
        };

        Ok(self.push(
            Evaluator::Field {
                object,
                declaring: Some(declaring),
                name: field.name.clone(),
                ty: expression.ty.clone().or_else(|| Some(field.ty.clone())),
            },
            span,
        ))
    }

    /// A name the type checker could not bind: a field of the qualifier, or a frame local.
    fn compile_unresolved(
        &mut self,
        expression: &Expression,
        qualifier: Option<&Expression>,
        name: &IdentName,
    ) -> Result<EvaluatorRef, EvaluateError> {
        let span = expression.span;
        let ty = expression.ty.clone();
        let Some(qualifier) = qualifier else {
            return Ok(self.push(
                Evaluator::LocalVariable {
                    name: name.clone(),
                    ty,
                },
                span,
            ));
        };
        let (object, declaring) = self.compile_qualifier(qualifier)?;
        Ok(self.push(
            Evaluator::Field {
                object,
                declaring: Some(declaring),
                name: name.clone(),
                ty,
            },
            span,
        ))
    }

    /// Compiles a member qualifier, returning it with the class to look members up in.
    fn compile_qualifier(
        &mut self,
        qualifier: &Expression,
    ) -> Result<(EvaluatorRef, TypeName), EvaluateError> {
        if let ExpressionKind::Reference {
            target: Some(Symbol::Class(class)),
            ..
        } = &qualifier.kind
        {
            let name = self.class_name(*class, qualifier.span)?;
            let object = self.push(Evaluator::Type { name: name.clone() }, qualifier.span);
            return Ok((object, name));
        }
        let Some(qualifier_type) = &qualifier.ty else {
            return Err(self.error(
                EvaluateErrorKind::QualifierTypeUnknown(self.text_of(qualifier.span)),
                qualifier.span,
            ));
        };
        let declaring: TypeName = qualifier_type.canonical_text().into();
        let object = self.compile_expression(qualifier)?;
        Ok((object, declaring))
    }

    /// Outer hops for `Outer.this` and `Outer.super`.
    pub(super) fn qualifier_hops(
        &self,
        qualifier: Option<&ClassQualifier>,
        span: Span,
    ) -> Result<u32, EvaluateError> {
        let Some(qualifier) = qualifier else {
            return Ok(0);
        };
        let (Some(target), Some(context_class)) = (qualifier.target, self.context_class) else {
            return Err(self.invalid(span));
        };
        self.classes
            .count_hops(Some(context_class), |class| class == target)
            .ok_or_else(|| self.invalid(span))
    }
}

// Calls
impl Compiler<'_> {
    pub(super) fn compile_method_call(
        &mut self,
        expression: &Expression,
        qualifier: Option<&Expression>,
        name: &Ident,
        arguments: &[Expression],
        target: Option<&MethodSymbol>,
        scope: Option<ClassId>,
    ) -> Result<EvaluatorRef, EvaluateError> {
        let span = expression.span;
        if let Some(method) = target {
            if !method.is_constructor && method.return_type.is_none() {
                return Err(self.error(
                    EvaluateErrorKind::UnknownMethodReturnType(name.name.clone()),
                    span,
                ));
            }
        }
        let invoke_super =
            qualifier.is_some_and(|qualifier| matches!(qualifier.kind, ExpressionKind::Super { .. }));

        let (object, declaring) = match (target, qualifier) {
            (Some(method), _) if method.is_static => {
                let declaring = self.class_name(method.declaring_class, span)?;
                let object = self.push(
                    Evaluator::Type {
                        name: declaring.clone(),
                    },
                    span,
                );
                (object, Some(declaring))
            }
            (Some(method), Some(qualifier)) => {
                let declaring = self.class_name(method.declaring_class, span)?;
                (self.compile_expression(qualifier)?, Some(declaring))
            }
            (Some(method), None) => {
                let declaring = self.class_name(method.declaring_class, span)?;
                let hops = self.scope_hops(scope, span)?;
                (self.push(Evaluator::This { hops }, span), Some(declaring))
            }
            (None, Some(qualifier)) => {
                let (object, declaring) = self.compile_qualifier(qualifier)?;
                (object, Some(declaring))
            }
            (None, None) => {
                let declaring = self
                    .position_class()
                    .or(self.context_class)
                    .and_then(|class| self.classes.name_of(class).cloned());
                (self.push(Evaluator::This { hops: 0 }, span), declaring)
            }
        };

        let arguments = self.compile_arguments(arguments)?;
        let call = self.push(
            Evaluator::MethodCall {
                object,
                declaring,
                name: name.name.clone(),
                signature: target.map(MethodSymbol::signature),
                arguments,
                invoke_super,
            },
            span,
        );
        Ok(self.push(Evaluator::DisableGc { inner: call }, span))
    }

    /// Hops from the context class to the class an unqualified call was resolved in.
    fn scope_hops(&self, scope: Option<ClassId>, span: Span) -> Result<u32, EvaluateError> {
        let (Some(scope), Some(context_class)) = (scope, self.context_class) else {
            return Ok(0);
        };
        self.classes
            .count_hops(Some(context_class), |class| class == scope)
            .ok_or_else(|| {
                self.error(
                    EvaluateErrorKind::InvalidExpression(format_compact!(
                        "{} is not reachable from the evaluation context",
                        self.text_of(span)
                    )),
                    span,
                )
            })
    }
}
