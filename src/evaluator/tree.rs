use super::{
    error::{EvaluateError, EvaluateErrorKind},
    fragment::SyntheticFrame,
    modifier::{self, Modifier, Target},
    operator, Completion, Evaluated, Evaluator, EvaluatorRef, ExpressionEvaluator,
};
use crate::{
    context::{EvaluationContext, FieldOwner, Invocation, Receiver},
    string::{IdentName, TypeName},
    syntax::{
        types::{StaticType, OBJECT, STRING},
        BinaryOperator, PostfixOperator,
    },
    value::{ObjectRef, TypeRef, Value},
};
use compact_str::{format_compact, ToCompactString};

fn consumes(loop_label: &Option<IdentName>, signal: &Option<IdentName>) -> bool {
    match signal {
        None => true,
        Some(label) => loop_label.as_ref() == Some(label),
    }
}

fn is_string_supertype(name: &str) -> bool {
    matches!(
        name,
        STRING | OBJECT | "java.lang.CharSequence" | "java.lang.Comparable" | "java.io.Serializable"
    )
}

impl ExpressionEvaluator {
    pub(super) fn evaluate_node<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
        frame: &SyntheticFrame,
        node: EvaluatorRef,
    ) -> Result<Completion, EvaluateError> {
        let current = self
            .get_node(node)
            .expect("Node refs are only handed out by the arena that owns them.");
        tracing::trace!(node = node.index(), "evaluate");
        let result = self.evaluate_kind(context, frame, current);
        match self.get_span(node) {
            Some(span) => result.map_err(|e| e.or_span(span)),
            None => result,
        }
    }

    /// Evaluates a node in expression position, where control signals cannot occur.
    fn evaluate_value<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
        frame: &SyntheticFrame,
        node: EvaluatorRef,
    ) -> Result<Evaluated, EvaluateError> {
        match self.evaluate_node(context, frame, node)? {
            Completion::Normal(evaluated) => Ok(evaluated),
            Completion::Break(label) => Err(EvaluateErrorKind::UnhandledControlSignal {
                signal: "break",
                label,
            }
            .into()),
            Completion::Continue(label) => Err(EvaluateErrorKind::UnhandledControlSignal {
                signal: "continue",
                label,
            }
            .into()),
        }
    }

    fn evaluate_kind<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
        frame: &SyntheticFrame,
        node: &Evaluator,
    ) -> Result<Completion, EvaluateError> {
        let evaluated = match node {
            Evaluator::Literal { value } => Evaluated::value(value.clone()),
            Evaluator::LocalVariable { name, ty } => {
                let value = context.read_local(name)?;
                let target = Target::Local { name: name.clone() };
                Evaluated {
                    value,
                    modifier: Some(Modifier::new(target, ty.clone())),
                }
            }
            Evaluator::SyntheticVariable { name, ty } => {
                let not_declared = || EvaluateErrorKind::VariableNotDeclared(name.clone());
                let holder = frame.holder(name).ok_or_else(not_declared)?;
                let value = holder.access(name).ok_or_else(not_declared)?;
                let target = Target::Synthetic {
                    frame: holder,
                    name: name.clone(),
                };
                Evaluated {
                    value,
                    modifier: Some(Modifier::new(target, ty.clone())),
                }
            }
            Evaluator::Field {
                object,
                declaring,
                name,
                ty,
            } => self.evaluate_field(context, frame, *object, declaring.as_ref(), name, ty.as_ref())?,
            Evaluator::ArrayAccess { array, index, ty } => {
                self.evaluate_array_access(context, frame, *array, *index, ty.as_ref())?
            }
            Evaluator::Type { name } => Evaluated::value(Value::Type(context.resolve_class(name)?)),
            Evaluator::This { hops } | Evaluator::Super { hops } => {
                Evaluated::value(Value::Object(self.this_chain(context, *hops)?))
            }
            Evaluator::Binary {
                operator,
                lhs,
                rhs,
                result_type,
            } => self.evaluate_binary(context, frame, *operator, *lhs, *rhs, result_type)?,
            Evaluator::Unary {
                operator,
                operand,
                result_type,
            } => {
                let value = self.evaluate_value(context, frame, *operand)?.value;
                let value = modifier::unbox(context, value)?;
                Evaluated::value(operator::apply_unary(*operator, &value, result_type)?)
            }
            Evaluator::Postfix {
                operator,
                operand,
                result_type,
            } => {
                let Evaluated { value, modifier } = self.evaluate_value(context, frame, *operand)?;
                let modifier = modifier.ok_or(EvaluateErrorKind::NotAssignable)?;
                let step = match operator {
                    PostfixOperator::Increment => BinaryOperator::Add,
                    PostfixOperator::Decrement => BinaryOperator::Subtract,
                };
                let current = modifier::unbox(context, value.clone())?;
                let updated =
                    operator::apply_binary(step, &current, &Value::Int(1), &result_type.unboxed())?;
                modifier.set_value(context, updated)?;
                Evaluated::value(value)
            }
            Evaluator::Assignment { lhs, rhs } => {
                let value = self.evaluate_value(context, frame, *rhs)?.value;
                let target = self.evaluate_value(context, frame, *lhs)?;
                let modifier = target.modifier.ok_or(EvaluateErrorKind::NotAssignable)?;
                Evaluated::value(modifier.set_value(context, value)?)
            }
            Evaluator::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let branch = if self.evaluate_condition(context, frame, *condition)? {
                    *then_branch
                } else {
                    *else_branch
                };
                Evaluated::value(self.evaluate_value(context, frame, branch)?.value)
            }
            Evaluator::InstanceOf { operand, class } => {
                let value = self.evaluate_value(context, frame, *operand)?.value;
                let class = self.evaluate_type(context, frame, *class)?;
                let result = match &value {
                    Value::Null => false,
                    Value::Object(object) => context.instance_of(object, &class)?,
                    Value::String(_) => is_string_supertype(&class.name),
                    Value::Type(_) => matches!(class.name.as_ref(), OBJECT | "java.lang.Class"),
                    _ => return Err(EvaluateErrorKind::NotAnObject(value.clone()).into()),
                };
                Evaluated::value(Value::Boolean(result))
            }
            Evaluator::TypeCast { operand, cast_type } => {
                let value = self.evaluate_value(context, frame, *operand)?.value;
                Evaluated::value(self.cast(context, value, cast_type)?)
            }
            Evaluator::ClassObject { class } => {
                let class = self.evaluate_type(context, frame, *class)?;
                Evaluated::value(context.class_object(&class)?)
            }
            Evaluator::NewInstance {
                class,
                signature,
                arguments,
            } => {
                let class = self.evaluate_type(context, frame, *class)?;
                let arguments = self.evaluate_arguments(context, frame, arguments)?;
                Evaluated::value(Value::Object(context.new_instance(
                    &class, signature, arguments,
                )?))
            }
            Evaluator::NewArray {
                array_type,
                dimension,
                initializer,
            } => Evaluated::value(Value::Object(self.new_array(
                context,
                frame,
                array_type,
                *dimension,
                *initializer,
            )?)),
            Evaluator::ArrayInitializer { .. } => {
                return Err(EvaluateErrorKind::InvalidExpression(
                    "array initializer outside of an array creation".into(),
                )
                .into())
            }
            Evaluator::MethodCall {
                object,
                declaring,
                name,
                signature,
                arguments,
                invoke_super,
            } => {
                let receiver = match self.evaluate_value(context, frame, *object)?.value {
                    Value::Type(ty) => Receiver::Static(ty),
                    Value::Null => {
                        return Err(
                            EvaluateErrorKind::NullPointer(format_compact!("method `{name}`")).into(),
                        )
                    }
                    value @ (Value::Object(_) | Value::String(_)) => Receiver::Instance(value),
                    value => return Err(EvaluateErrorKind::NotAnObject(value).into()),
                };
                let arguments = self.evaluate_arguments(context, frame, arguments)?;
                let value = context.invoke_method(Invocation {
                    receiver,
                    declaring: declaring.as_deref(),
                    name,
                    signature: signature.as_deref(),
                    arguments,
                    non_virtual: *invoke_super,
                })?;
                Evaluated::value(value)
            }
            Evaluator::Block { statements } => {
                return self.evaluate_sequence(context, frame, statements)
            }
            Evaluator::CodeFragment { scope, statements } => {
                let inner = scope.instantiate(frame);
                return self.evaluate_sequence(context, &inner, statements);
            }
            Evaluator::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate_condition(context, frame, *condition)? {
                    return self.evaluate_node(context, frame, *then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.evaluate_node(context, frame, *else_branch);
                }
                Evaluated::void()
            }
            Evaluator::While {
                condition,
                body,
                label,
            } => {
                while self.evaluate_condition(context, frame, *condition)? {
                    let Some(body) = body else {
                        continue;
                    };
                    match self.evaluate_node(context, frame, *body)? {
                        Completion::Normal(_) => {}
                        Completion::Break(signal) if consumes(label, &signal) => break,
                        Completion::Continue(signal) if consumes(label, &signal) => continue,
                        signal => return Ok(signal),
                    }
                }
                Evaluated::void()
            }
            Evaluator::For {
                initializer,
                condition,
                update,
                body,
                label,
            } => {
                if let Some(initializer) = initializer {
                    self.evaluate_value(context, frame, *initializer)?;
                }
                loop {
                    if let Some(condition) = condition {
                        if !self.evaluate_condition(context, frame, *condition)? {
                            break;
                        }
                    }
                    if let Some(body) = body {
                        match self.evaluate_node(context, frame, *body)? {
                            Completion::Normal(_) => {}
                            Completion::Break(signal) if consumes(label, &signal) => break,
                            Completion::Continue(signal) if consumes(label, &signal) => {}
                            signal => return Ok(signal),
                        }
                    }
                    if let Some(update) = update {
                        self.evaluate_value(context, frame, *update)?;
                    }
                }
                Evaluated::void()
            }
            Evaluator::Break { label } => return Ok(Completion::Break(label.clone())),
            Evaluator::Continue { label } => return Ok(Completion::Continue(label.clone())),
            Evaluator::DisableGc { inner } => {
                let completion = self.evaluate_node(context, frame, *inner)?;
                if let Completion::Normal(Evaluated {
                    value: Value::Object(object),
                    ..
                }) = &completion
                {
                    context.pin(object);
                }
                return Ok(completion);
            }
        };
        Ok(Completion::Normal(evaluated))
    }

    fn evaluate_condition<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
        frame: &SyntheticFrame,
        node: EvaluatorRef,
    ) -> Result<bool, EvaluateError> {
        let value = self.evaluate_value(context, frame, node)?.value;
        let value = modifier::unbox(context, value)?;
        match value.as_bool() {
            Some(condition) => Ok(condition),
            None => Err(EvaluateErrorKind::NonBoolean(value).into()),
        }
    }

    fn evaluate_type<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
        frame: &SyntheticFrame,
        node: EvaluatorRef,
    ) -> Result<TypeRef, EvaluateError> {
        match self.evaluate_value(context, frame, node)?.value {
            Value::Type(ty) => Ok(ty),
            other => Err(EvaluateErrorKind::TypeMismatch {
                expected: "java.lang.Class".into(),
                actual: other.type_name(),
            }
            .into()),
        }
    }

    fn evaluate_arguments<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
        frame: &SyntheticFrame,
        arguments: &[EvaluatorRef],
    ) -> Result<Vec<Value>, EvaluateError> {
        arguments
            .iter()
            .map(|argument| {
                self.evaluate_value(context, frame, *argument)
                    .map(|evaluated| evaluated.value)
            })
            .collect()
    }

    fn evaluate_sequence<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
        frame: &SyntheticFrame,
        statements: &[EvaluatorRef],
    ) -> Result<Completion, EvaluateError> {
        let mut last = Evaluated::void();
        for statement in statements {
            match self.evaluate_node(context, frame, *statement)? {
                Completion::Normal(evaluated) => last = evaluated,
                signal => return Ok(signal),
            }
        }
        Ok(Completion::Normal(last))
    }

    fn this_chain<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
        hops: u32,
    ) -> Result<ObjectRef, EvaluateError> {
        let mut object = context
            .this_object()?
            .ok_or(EvaluateErrorKind::ThisNotAvailable)?;
        for _ in 0..hops {
            object = context
                .outer_instance(&object)?
                .ok_or(EvaluateErrorKind::OuterInstanceNotFound(hops))?;
        }
        Ok(object)
    }

    fn evaluate_field<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
        frame: &SyntheticFrame,
        object: EvaluatorRef,
        declaring: Option<&TypeName>,
        name: &IdentName,
        ty: Option<&StaticType>,
    ) -> Result<Evaluated, EvaluateError> {
        let owner = match self.evaluate_value(context, frame, object)?.value {
            Value::Object(object) if object.is_array() && name.as_ref() == "length" => {
                let length = context.array_length(&object)?;
                return Ok(Evaluated::value(Value::Int(length)));
            }
            Value::Object(object) => FieldOwner::Instance(object),
            Value::Type(ty) => FieldOwner::Static(ty),
            Value::Null => {
                return Err(EvaluateErrorKind::NullPointer(format_compact!("field `{name}`")).into())
            }
            other => return Err(EvaluateErrorKind::NotAnObject(other).into()),
        };
        let value = context.read_field(&owner, declaring.map(|d| &**d), name)?;
        let target = Target::Field {
            owner,
            declaring: declaring.cloned(),
            name: name.clone(),
        };
        Ok(Evaluated {
            value,
            modifier: Some(Modifier::new(target, ty.cloned())),
        })
    }

    fn evaluate_array_access<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
        frame: &SyntheticFrame,
        array: EvaluatorRef,
        index: EvaluatorRef,
        ty: Option<&StaticType>,
    ) -> Result<Evaluated, EvaluateError> {
        let array = self.evaluate_value(context, frame, array)?.value;
        let index = self.evaluate_value(context, frame, index)?.value;
        let index = modifier::unbox(context, index)?;
        let array = match array {
            Value::Object(object) if object.is_array() => object,
            Value::Null => {
                return Err(EvaluateErrorKind::NullPointer("array element".into()).into())
            }
            other => return Err(EvaluateErrorKind::NotAnArray(other).into()),
        };
        let index = array_index(&index)?;
        let value = context.read_array(&array, index)?;
        Ok(Evaluated {
            value,
            modifier: Some(Modifier::new(
                Target::ArrayElement { array, index },
                ty.cloned(),
            )),
        })
    }

    fn evaluate_binary<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
        frame: &SyntheticFrame,
        operator: BinaryOperator,
        lhs: EvaluatorRef,
        rhs: EvaluatorRef,
        result_type: &StaticType,
    ) -> Result<Evaluated, EvaluateError> {
        let lhs = self.evaluate_value(context, frame, lhs)?.value;
        if matches!(operator, BinaryOperator::And | BinaryOperator::Or) {
            let lhs = modifier::unbox(context, lhs)?;
            match (operator, lhs.as_bool()) {
                (BinaryOperator::And, Some(false)) => {
                    return Ok(Evaluated::value(Value::Boolean(false)))
                }
                (BinaryOperator::Or, Some(true)) => return Ok(Evaluated::value(Value::Boolean(true))),
                _ => {}
            }
            let rhs = self.evaluate_value(context, frame, rhs)?.value;
            let rhs = modifier::unbox(context, rhs)?;
            return Ok(Evaluated::value(operator::apply_binary(
                operator,
                &lhs,
                &rhs,
                result_type,
            )?));
        }
        let rhs = self.evaluate_value(context, frame, rhs)?.value;
        let (lhs, rhs) = match operator {
            BinaryOperator::Add if result_type.is_string() => {
                (stringify(context, lhs)?, stringify(context, rhs)?)
            }
            // Two references compare by identity, boxes included.
            BinaryOperator::Equal | BinaryOperator::NotEqual
                if lhs.primitive_type().is_none() && rhs.primitive_type().is_none() =>
            {
                (lhs, rhs)
            }
            _ => (modifier::unbox(context, lhs)?, modifier::unbox(context, rhs)?),
        };
        Ok(Evaluated::value(operator::apply_binary(
            operator,
            &lhs,
            &rhs,
            result_type,
        )?))
    }

    fn cast<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
        value: Value,
        cast_type: &StaticType,
    ) -> Result<Value, EvaluateError> {
        let class_cast = |value: &Value| -> EvaluateError {
            EvaluateErrorKind::ClassCast {
                from: value.type_name(),
                to: cast_type.to_compact_string(),
            }
            .into()
        };
        match cast_type {
            StaticType::Primitive(target) => {
                let value = modifier::unbox(context, value)?;
                value.convert_to(*target).ok_or_else(|| class_cast(&value))
            }
            StaticType::Void => Err(class_cast(&value)),
            StaticType::Null | StaticType::Class(_) | StaticType::Array(_) => {
                let name = cast_type.canonical_text();
                let accepted = match &value {
                    Value::Null => true,
                    Value::String(_) => is_string_supertype(&name),
                    Value::Type(_) => matches!(name.as_str(), OBJECT | "java.lang.Class"),
                    Value::Object(object) => {
                        let class = context.resolve_class(&name)?;
                        context.instance_of(object, &class)?
                    }
                    primitive => {
                        if primitive
                            .primitive_type()
                            .is_some_and(|source| source.boxes_to(&name))
                        {
                            return Ok(Value::Object(context.box_value(primitive)?));
                        }
                        false
                    }
                };
                if accepted {
                    Ok(value)
                } else {
                    Err(class_cast(&value))
                }
            }
        }
    }

    fn new_array<C: EvaluationContext + ?Sized>(
        &self,
        context: &mut C,
        frame: &SyntheticFrame,
        array_type: &StaticType,
        dimension: Option<EvaluatorRef>,
        initializer: Option<EvaluatorRef>,
    ) -> Result<ObjectRef, EvaluateError> {
        if let Some(dimension) = dimension {
            let length = array_index(&self.evaluate_value(context, frame, dimension)?.value)?;
            if length < 0 {
                return Err(EvaluateErrorKind::NegativeArraySize(length).into());
            }
            return context.new_array(array_type, length);
        }
        let Some(Evaluator::ArrayInitializer { elements }) =
            initializer.and_then(|node| self.get_node(node))
        else {
            return Err(EvaluateErrorKind::InvalidExpression(
                "array creation needs a dimension or an initializer".into(),
            )
            .into());
        };
        let values = self.evaluate_arguments(context, frame, elements)?;
        let array = context.new_array(array_type, values.len() as i32)?;
        let element_type = array_type.element_type();
        for (index, value) in values.into_iter().enumerate() {
            let value = modifier::coerce(context, value, element_type)?;
            context.write_array(&array, index as i32, value)?;
        }
        Ok(array)
    }
}

fn array_index(value: &Value) -> Result<i32, EvaluateError> {
    match value {
        Value::Char(_) | Value::Byte(_) | Value::Short(_) | Value::Int(_) => value
            .as_i64()
            .map(|v| v as i32)
            .ok_or_else(|| EvaluateErrorKind::NonNumeric(value.clone()).into()),
        _ => Err(EvaluateErrorKind::NonNumeric(value.clone()).into()),
    }
}

/// String conversion for concatenation; objects render through their own `toString`.
fn stringify<C: EvaluationContext + ?Sized>(
    context: &mut C,
    value: Value,
) -> Result<Value, EvaluateError> {
    let value = modifier::unbox(context, value)?;
    if !matches!(value, Value::Object(_)) {
        return Ok(value);
    }
    context.invoke_method(Invocation {
        receiver: Receiver::Instance(value),
        declaring: None,
        name: "toString",
        signature: Some("()Ljava/lang/String;"),
        arguments: Vec::new(),
        non_virtual: false,
    })
}
