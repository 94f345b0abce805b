use super::Compiler;
use crate::{
    evaluator::{
        error::{EvaluateError, EvaluateErrorKind},
        operator::UnaryOperator,
        Evaluator, EvaluatorRef,
    },
    source::Span,
    string::TypeName,
    syntax::{
        symbol::MethodSymbol, types::StaticType, AssignmentOperator, BinaryOperator, Expression,
        ExpressionKind, Literal, PrefixOperator,
    },
    value::Value,
};

const DEFAULT_CONSTRUCTOR: &str = "()V";

impl Compiler<'_> {
    pub(super) fn compile_expression(
        &mut self,
        expression: &Expression,
    ) -> Result<EvaluatorRef, EvaluateError> {
        let span = expression.span;
        match &expression.kind {
            ExpressionKind::Literal(literal) => self.compile_literal(literal, span),
            ExpressionKind::Reference {
                qualifier,
                name,
                target,
            } => self.compile_reference(expression, qualifier.as_deref(), name, target.as_ref()),
            ExpressionKind::This { qualifier } => {
                let hops = self.qualifier_hops(qualifier.as_ref(), span)?;
                Ok(self.push(Evaluator::This { hops }, span))
            }
            ExpressionKind::Super { qualifier } => {
                let hops = self.qualifier_hops(qualifier.as_ref(), span)?;
                Ok(self.push(Evaluator::Super { hops }, span))
            }
            ExpressionKind::Parenthesized(inner) => self.compile_expression(inner),
            ExpressionKind::Binary { operator, lhs, rhs } => {
                let result_type = self.require_type(expression)?;
                let lhs = self.compile_expression(lhs)?;
                let rhs = self.compile_expression(rhs)?;
                Ok(self.push(
                    Evaluator::Binary {
                        operator: *operator,
                        lhs,
                        rhs,
                        result_type,
                    },
                    span,
                ))
            }
            ExpressionKind::Prefix { operator, operand } => {
                self.compile_prefix(expression, *operator, operand)
            }
            ExpressionKind::Postfix { operator, operand } => {
                let result_type = self.require_type(expression)?;
                let operand = self.compile_expression(operand)?;
                Ok(self.push(
                    Evaluator::Postfix {
                        operator: *operator,
                        operand,
                        result_type,
                    },
                    span,
                ))
            }
            ExpressionKind::Assignment { operator, lhs, rhs } => {
                self.compile_assignment(*operator, lhs, rhs, span)
            }
            ExpressionKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.compile_expression(condition)?;
                let then_branch = self.compile_expression(then_branch)?;
                let else_branch = self.compile_expression(else_branch)?;
                Ok(self.push(
                    Evaluator::Conditional {
                        condition,
                        then_branch,
                        else_branch,
                    },
                    span,
                ))
            }
            ExpressionKind::InstanceOf {
                operand,
                check_type,
            } => {
                let operand = self.compile_expression(operand)?;
                let class = self.compile_type(check_type, span);
                Ok(self.push(Evaluator::InstanceOf { operand, class }, span))
            }
            ExpressionKind::TypeCast { cast_type, operand } => {
                let operand = self.compile_expression(operand)?;
                Ok(self.push(
                    Evaluator::TypeCast {
                        operand,
                        cast_type: cast_type.clone(),
                    },
                    span,
                ))
            }
            ExpressionKind::ArrayAccess { array, index } => {
                let array = self.compile_expression(array)?;
                let index = self.compile_expression(index)?;
                Ok(self.push(
                    Evaluator::ArrayAccess {
                        array,
                        index,
                        ty: expression.ty.clone(),
                    },
                    span,
                ))
            }
            ExpressionKind::MethodCall {
                qualifier,
                name,
                arguments,
                target,
                scope,
            } => self.compile_method_call(
                expression,
                qualifier.as_deref(),
                name,
                arguments,
                target.as_ref(),
                *scope,
            ),
            ExpressionKind::NewObject {
                class_type,
                arguments,
                constructor,
                anonymous,
            } => self.compile_new_object(
                expression,
                class_type,
                arguments.as_deref(),
                constructor.as_ref(),
                *anonymous,
            ),
            ExpressionKind::NewArray {
                array_type,
                dimensions,
                initializer,
            } => self.compile_new_array(array_type, dimensions, initializer.as_deref(), span),
            ExpressionKind::ArrayInitializer(elements) => match &expression.ty {
                Some(array_type @ StaticType::Array(_)) => {
                    self.compile_array_creation(array_type, None, Some(elements), span)
                }
                _ => Err(self.invalid(span)),
            },
            ExpressionKind::ClassObject(ty) => Ok(self.compile_class_object(ty, span)),
            ExpressionKind::Lambda => {
                Err(self.error(EvaluateErrorKind::LambdaNotSupported, span))
            }
            ExpressionKind::Error(text) => {
                Err(self.error(EvaluateErrorKind::InvalidExpression(text.clone()), span))
            }
        }
    }

    fn require_type(&self, expression: &Expression) -> Result<StaticType, EvaluateError> {
        expression.ty.clone().ok_or_else(|| {
            self.error(
                EvaluateErrorKind::UnknownExpressionType(self.text_of(expression.span)),
                expression.span,
            )
        })
    }

    pub(super) fn compile_type(&mut self, ty: &StaticType, span: Span) -> EvaluatorRef {
        let name: TypeName = ty.canonical_text().into();
        self.push(Evaluator::Type { name }, span)
    }

    pub(super) fn compile_arguments(
        &mut self,
        arguments: &[Expression],
    ) -> Result<Vec<EvaluatorRef>, EvaluateError> {
        arguments
            .iter()
            .map(|argument| self.compile_expression(argument))
            .collect()
    }

    fn compile_literal(&mut self, literal: &Literal, span: Span) -> Result<EvaluatorRef, EvaluateError> {
        match Value::from_literal(literal) {
            Some(value) => Ok(self.push(Evaluator::Literal { value }, span)),
            None => {
                let text = match literal {
                    Literal::Malformed(text) => text.clone(),
                    _ => self.text_of(span),
                };
                Err(self.error(EvaluateErrorKind::InvalidLiteral(text), span))
            }
        }
    }

    fn compile_prefix(
        &mut self,
        expression: &Expression,
        operator: PrefixOperator,
        operand: &Expression,
    ) -> Result<EvaluatorRef, EvaluateError> {
        let span = expression.span;
        // Arithmetic on a box happens on its primitive.
        let result_type = self.require_type(expression)?.unboxed();
        let operand = self.compile_expression(operand)?;
        let operator = match operator {
            PrefixOperator::Plus => UnaryOperator::Plus,
            PrefixOperator::Minus => UnaryOperator::Minus,
            PrefixOperator::Not => UnaryOperator::Not,
            PrefixOperator::BitNot => UnaryOperator::BitNot,
            PrefixOperator::Increment | PrefixOperator::Decrement => {
                // ++x is x = x + 1 over the same operand node.
                let step = if operator == PrefixOperator::Increment {
                    BinaryOperator::Add
                } else {
                    BinaryOperator::Subtract
                };
                let one = self.push(
                    Evaluator::Literal {
                        value: Value::Int(1),
                    },
                    span,
                );
                let updated = self.push(
                    Evaluator::Binary {
                        operator: step,
                        lhs: operand,
                        rhs: one,
                        result_type,
                    },
                    span,
                );
                return Ok(self.push(
                    Evaluator::Assignment {
                        lhs: operand,
                        rhs: updated,
                    },
                    span,
                ));
            }
        };
        Ok(self.push(
            Evaluator::Unary {
                operator,
                operand,
                result_type,
            },
            span,
        ))
    }

    fn compile_assignment(
        &mut self,
        operator: AssignmentOperator,
        lhs: &Expression,
        rhs: &Expression,
        span: Span,
    ) -> Result<EvaluatorRef, EvaluateError> {
        if operator != AssignmentOperator::Assign {
            return Err(self.error(
                EvaluateErrorKind::OperationNotSupported(operator.sign()),
                span,
            ));
        }
        let lhs_type = self.require_type(lhs)?;
        if !self.is_assignment_compatible(&lhs_type, rhs) {
            return Err(self.error(
                EvaluateErrorKind::IncompatibleTypes(operator.sign()),
                span,
            ));
        }
        let rhs = self.compile_assigned(&lhs_type, rhs)?;
        let lhs = self.compile_expression(lhs)?;
        Ok(self.push(Evaluator::Assignment { lhs, rhs }, span))
    }

    fn compile_new_object(
        &mut self,
        expression: &Expression,
        class_type: &StaticType,
        arguments: Option<&[Expression]>,
        constructor: Option<&MethodSymbol>,
        anonymous: bool,
    ) -> Result<EvaluatorRef, EvaluateError> {
        let span = expression.span;
        if anonymous {
            return Err(self.error(EvaluateErrorKind::AnonymousClassNotSupported, span));
        }
        let (StaticType::Class(_), Some(arguments)) = (class_type, arguments) else {
            return Err(self.invalid(span));
        };
        if constructor.is_none() && !arguments.is_empty() {
            return Err(self.error(
                EvaluateErrorKind::CannotResolveConstructor(self.text_of(span)),
                span,
            ));
        }

        let class = self.compile_type(class_type, span);
        let arguments = self.compile_arguments(arguments)?;
        let signature = constructor
            .map(MethodSymbol::signature)
            .unwrap_or_else(|| DEFAULT_CONSTRUCTOR.into());
        let node = self.push(
            Evaluator::NewInstance {
                class,
                signature,
                arguments,
            },
            span,
        );
        Ok(self.push(Evaluator::DisableGc { inner: node }, span))
    }

    fn compile_new_array(
        &mut self,
        array_type: &StaticType,
        dimensions: &[Expression],
        initializer: Option<&[Expression]>,
        span: Span,
    ) -> Result<EvaluatorRef, EvaluateError> {
        if dimensions.len() > 1 {
            return Err(self.error(EvaluateErrorKind::MultiDimensionalArraysNotSupported, span));
        }
        let dimension = dimensions.first();
        if dimension.is_some() == initializer.is_some() {
            return Err(self.invalid(span));
        }
        self.compile_array_creation(array_type, dimension, initializer, span)
    }

    pub(super) fn compile_array_creation(
        &mut self,
        array_type: &StaticType,
        dimension: Option<&Expression>,
        initializer: Option<&[Expression]>,
        span: Span,
    ) -> Result<EvaluatorRef, EvaluateError> {
        if array_type.element_type().is_none() {
            return Err(self.invalid(span));
        }
        let dimension = dimension
            .map(|dimension| self.compile_expression(dimension))
            .transpose()?;
        let initializer = match initializer {
            Some(elements) => {
                let nested = elements
                    .iter()
                    .find(|element| matches!(element.kind, ExpressionKind::ArrayInitializer(_)));
                if let Some(nested) = nested {
                    return Err(self.error(
                        EvaluateErrorKind::MultiDimensionalArraysNotSupported,
                        nested.span,
                    ));
                }
                let elements = self.compile_arguments(elements)?;
                Some(self.push(Evaluator::ArrayInitializer { elements }, span))
            }
            None => None,
        };
        let node = self.push(
            Evaluator::NewArray {
                array_type: array_type.clone(),
                dimension,
                initializer,
            },
            span,
        );
        Ok(self.push(Evaluator::DisableGc { inner: node }, span))
    }

    /// `T.class`; primitive class literals read the `TYPE` constant of their wrapper.
    fn compile_class_object(&mut self, ty: &StaticType, span: Span) -> EvaluatorRef {
        let boxed = match ty {
            StaticType::Primitive(primitive) => Some(primitive.boxed_name()),
            StaticType::Void => Some("java.lang.Void"),
            _ => None,
        };
        match boxed {
            Some(boxed) => {
                let name: TypeName = boxed.into();
                let object = self.push(Evaluator::Type { name: name.clone() }, span);
                self.push(
                    Evaluator::Field {
                        object,
                        declaring: Some(name),
                        name: "TYPE".into(),
                        ty: Some(StaticType::class("java.lang.Class")),
                    },
                    span,
                )
            }
            None => {
                let class = self.compile_type(ty, span);
                self.push(Evaluator::ClassObject { class }, span)
            }
        }
    }
}
