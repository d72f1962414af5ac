use super::{Bindings, Evaluator};
use crate::ast::{Expression, FunctionDefinition, MatchExpression, Pattern, RangeLiteral};
use crate::error::EvaluationError;
use crate::scope::{Definition, Scope, binary_arithmetic, unary_arithmetic};
use crate::types::{Bound, EnumType, NumericSet, StructType, Type, union_all};

/// Per-evaluation state: the current call depth and the definitions whose
/// types are being computed, to catch self-referential definitions.
#[derive(Debug, Default)]
pub(super) struct Frame {
    depth: usize,
    resolving: Vec<String>,
}

type EvalResult = Result<Type, EvaluationError>;

impl Evaluator<'_> {
    pub(super) fn eval(
        &self,
        scope: &Scope,
        expression: &Expression,
        bindings: &Bindings,
        frame: &mut Frame,
    ) -> EvalResult {
        match expression {
            Expression::Number(n) => Ok(Type::literal(*n)),
            Expression::String(s) => Ok(Type::string_literal(s.clone())),
            Expression::Range(range) => Ok(range_type(range)),
            Expression::Name(name) => self.eval_name(scope, name, bindings, frame),
            Expression::Path { owner, member } => self.eval_path(scope, owner, member, frame),
            Expression::FieldAccess { target, field } => {
                let target = self.eval(scope, target, bindings, frame)?;
                field_type(&target, field)
            }
            Expression::Call { function, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(scope, arg, bindings, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                self.eval_call(scope, function, args, frame)
            }
            Expression::StructLiteral { name, fields } => {
                self.eval_struct_literal(scope, name, fields, bindings, frame)
            }
            Expression::Union(l, r) => {
                let l = self.eval(scope, l, bindings, frame)?;
                Ok(l.union(&self.eval(scope, r, bindings, frame)?))
            }
            Expression::Intersection(l, r) => {
                let l = self.eval(scope, l, bindings, frame)?;
                Ok(l.intersect(&self.eval(scope, r, bindings, frame)?))
            }
            Expression::Add(l, r) => {
                let l = self.eval(scope, l, bindings, frame)?;
                let r = self.eval(scope, r, bindings, frame)?;
                binary_arithmetic("+", &l, &r, NumericSet::add)
            }
            Expression::Subtract(l, r) => {
                let l = self.eval(scope, l, bindings, frame)?;
                let r = self.eval(scope, r, bindings, frame)?;
                binary_arithmetic("-", &l, &r, NumericSet::subtract)
            }
            Expression::Multiply(l, r) => {
                let l = self.eval(scope, l, bindings, frame)?;
                let r = self.eval(scope, r, bindings, frame)?;
                binary_arithmetic("*", &l, &r, NumericSet::multiply)
            }
            Expression::Negate(v) => {
                let v = self.eval(scope, v, bindings, frame)?;
                unary_arithmetic("negation", &v, NumericSet::negate)
            }
            Expression::Match(m) => self.eval_match(scope, m, bindings, frame),
        }
    }

    /// Bindings shadow scope definitions.
    pub(super) fn eval_name(
        &self,
        scope: &Scope,
        name: &str,
        bindings: &Bindings,
        frame: &mut Frame,
    ) -> EvalResult {
        if let Some(bound) = bindings.get(name) {
            return Ok(bound.clone());
        }
        let (definition, defining) = scope.resolve(name)?;
        self.eval_definition(definition, defining, frame)
    }

    fn eval_definition(&self, definition: &Definition, defining: &Scope, frame: &mut Frame) -> EvalResult {
        match definition {
            Definition::Struct(s) => self.cached_or(defining, &s.name, frame, |this, frame| {
                let fields = s
                    .fields
                    .iter()
                    .map(|field| {
                        let ty = this.eval(defining, &field.ty, &Bindings::default(), frame)?;
                        Ok((field.name.clone(), ty))
                    })
                    .collect::<Result<Vec<_>, EvaluationError>>()?;
                Ok(Type::Struct(StructType::new(s.name.clone(), fields)))
            }),
            Definition::Enum(e) => self.cached_or(defining, &e.name, frame, |this, frame| {
                let variants = e
                    .variants
                    .iter()
                    .map(|variant| {
                        let payload = match &variant.payload {
                            Some(payload) => {
                                Some(this.eval(defining, payload, &Bindings::default(), frame)?)
                            }
                            None => None,
                        };
                        Ok((variant.name.clone(), payload))
                    })
                    .collect::<Result<Vec<_>, EvaluationError>>()?;
                Ok(Type::Enum(EnumType::new(e.name.clone(), variants)))
            }),
            Definition::Alias(a) => self.cached_or(defining, &a.name, frame, |this, frame| {
                this.eval(defining, &a.value, &Bindings::default(), frame)
            }),
            Definition::Function(f) => self.call_function(defining, f, Vec::new(), frame),
            Definition::Builtin(b) => b.call(&[]),
        }
    }

    fn cached_or(
        &self,
        defining: &Scope,
        name: &str,
        frame: &mut Frame,
        resolve: impl FnOnce(&Self, &mut Frame) -> EvalResult,
    ) -> EvalResult {
        if let Some(ty) = defining.resolved_type(name) {
            return Ok(ty.clone());
        }
        if frame.resolving.iter().any(|n| n == name) {
            return Err(EvaluationError::RecursionLimit {
                function: name.to_string(),
                depth: frame.resolving.len(),
            });
        }
        frame.resolving.push(name.to_string());
        let result = resolve(self, frame);
        frame.resolving.pop();
        result
    }

    fn eval_path(&self, scope: &Scope, owner: &str, member: &str, frame: &mut Frame) -> EvalResult {
        let full = format!("{}::{}", owner, member);
        if let Some((definition, defining)) = scope.lookup(&full) {
            return self.eval_definition(definition, defining, frame);
        }
        let enum_type = self.enum_type(scope, owner, &full, frame)?;
        let variant = enum_type
            .variants()
            .find(|(variant, _)| *variant == member)
            .map(|(variant, payload)| EnumType::new(owner, [(variant, payload.cloned())]));
        variant
            .map(Type::Enum)
            .ok_or(EvaluationError::UndefinedReference(full))
    }

    fn enum_type(
        &self,
        scope: &Scope,
        owner: &str,
        path: &str,
        frame: &mut Frame,
    ) -> Result<EnumType, EvaluationError> {
        match scope.lookup(owner) {
            Some((definition @ Definition::Enum(_), defining)) => {
                match self.eval_definition(definition, defining, frame)? {
                    Type::Enum(e) => Ok(e),
                    other => Err(EvaluationError::TypeMismatch {
                        operation: format!("path '{}'", path),
                        expected: "an enum".to_string(),
                        found: other,
                    }),
                }
            }
            _ => Err(EvaluationError::UndefinedReference(path.to_string())),
        }
    }

    fn eval_call(&self, scope: &Scope, function: &str, args: Vec<Type>, frame: &mut Frame) -> EvalResult {
        if let Some((definition, defining)) = scope.lookup(function) {
            return match definition {
                Definition::Function(f) => self.call_function(defining, f, args, frame),
                Definition::Builtin(b) => b.call(&args),
                other => Err(EvaluationError::TypeMismatch {
                    operation: format!("call to '{}'", function),
                    expected: "a function".to_string(),
                    found: self.eval_definition(other, defining, frame)?,
                }),
            };
        }

        // `Enum::Variant(payload)`
        let Some((owner, member)) = function.split_once("::") else {
            return Err(EvaluationError::UndefinedReference(function.to_string()));
        };
        let enum_type = self.enum_type(scope, owner, function, frame)?;
        let Some((_, declared)) = enum_type.variants().find(|(variant, _)| *variant == member) else {
            return Err(EvaluationError::UndefinedReference(function.to_string()));
        };
        let arity_error = |expected: &str| EvaluationError::Arity {
            function: function.to_string(),
            expected: expected.to_string(),
            found: args.len(),
        };
        let Some(declared) = declared else {
            return Err(arity_error("0"));
        };
        let [argument] = args.as_slice() else {
            return Err(arity_error("1"));
        };
        if argument.is_never() {
            return Ok(Type::Never);
        }
        let narrowed = argument.intersect(declared);
        if narrowed.is_never() {
            return Err(EvaluationError::TypeMismatch {
                operation: format!("variant '{}'", function),
                expected: declared.to_string(),
                found: argument.clone(),
            });
        }
        Ok(Type::Enum(EnumType::new(owner, [(member, Some(narrowed))])))
    }

    fn call_function(
        &self,
        defining: &Scope,
        function: &FunctionDefinition,
        args: Vec<Type>,
        frame: &mut Frame,
    ) -> EvalResult {
        if args.len() != function.params.len() {
            return Err(EvaluationError::Arity {
                function: function.name.clone(),
                expected: function.params.len().to_string(),
                found: args.len(),
            });
        }
        if frame.depth >= self.max_call_depth {
            return Err(EvaluationError::RecursionLimit {
                function: function.name.clone(),
                depth: self.max_call_depth,
            });
        }

        frame.depth += 1;
        let result = self.run_function(defining, function, args, frame);
        frame.depth -= 1;
        result
    }

    fn run_function(
        &self,
        defining: &Scope,
        function: &FunctionDefinition,
        args: Vec<Type>,
        frame: &mut Frame,
    ) -> EvalResult {
        let mut locals = Bindings::default();
        for (param, argument) in function.params.iter().zip(args) {
            let declared = self.eval(defining, &param.ty, &Bindings::default(), frame)?;
            let narrowed = argument.intersect(&declared);
            if narrowed.is_never() && !argument.is_never() {
                return Err(EvaluationError::TypeMismatch {
                    operation: format!("argument '{}' of '{}'", param.name, function.name),
                    expected: declared.to_string(),
                    found: argument,
                });
            }
            locals.insert(param.name.clone(), narrowed);
        }
        // The body sees its parameters and the defining scope, never the caller's locals.
        self.eval(defining, &function.body, &locals, frame)
    }

    fn eval_struct_literal(
        &self,
        scope: &Scope,
        name: &str,
        fields: &[(String, Expression)],
        bindings: &Bindings,
        frame: &mut Frame,
    ) -> EvalResult {
        let declared = match self.eval_name(scope, name, &Bindings::default(), frame)? {
            Type::Struct(s) => s,
            other => {
                return Err(EvaluationError::TypeMismatch {
                    operation: format!("struct literal '{}'", name),
                    expected: "a struct".to_string(),
                    found: other,
                });
            }
        };

        let mut narrowed: Vec<(String, Type)> = declared.fields().to_vec();
        for (field, value) in fields {
            let value = self.eval(scope, value, bindings, frame)?;
            let Some((_, slot)) = narrowed.iter_mut().find(|(n, _)| n == field) else {
                return Err(EvaluationError::TypeMismatch {
                    operation: format!("field '{}' of struct literal '{}'", field, name),
                    expected: format!("a field of {}", declared),
                    found: value,
                });
            };
            let refined = slot.intersect(&value);
            if refined.is_never() {
                return Err(EvaluationError::TypeMismatch {
                    operation: format!("field '{}' of struct literal '{}'", field, name),
                    expected: slot.to_string(),
                    found: value,
                });
            }
            *slot = refined;
        }
        Ok(Type::Struct(StructType::new(declared.name(), narrowed)))
    }

    fn eval_match(
        &self,
        scope: &Scope,
        m: &MatchExpression,
        bindings: &Bindings,
        frame: &mut Frame,
    ) -> EvalResult {
        let scrutinee = self.eval(scope, &m.scrutinee, bindings, frame)?;
        if scrutinee.is_never() {
            return Ok(Type::Never);
        }

        for arm in &m.arms {
            let narrowed = match &arm.pattern {
                Pattern::Wildcard => scrutinee.clone(),
                Pattern::Type(pattern) => {
                    scrutinee.intersect(&self.eval(scope, pattern, bindings, frame)?)
                }
            };
            if narrowed.is_never() {
                continue;
            }
            return match &arm.binding {
                Some(binding) => {
                    let mut locals = bindings.clone();
                    locals.insert(binding.clone(), narrowed);
                    self.eval(scope, &arm.body, &locals, frame)
                }
                None => self.eval(scope, &arm.body, bindings, frame),
            };
        }
        Err(EvaluationError::IncompleteMatch { scrutinee })
    }
}

fn range_type(range: &RangeLiteral) -> Type {
    let min = range
        .min
        .map_or(Bound::NEG_INFINITY, |v| Bound::new(v, range.min_inclusive));
    let max = range
        .max
        .map_or(Bound::INFINITY, |v| Bound::new(v, range.max_inclusive));
    Type::interval(min, max)
}

/// Field access distributes over the members of a union of structs.
fn field_type(target: &Type, field: &str) -> EvalResult {
    match target {
        Type::Any => Ok(Type::Any),
        Type::Never => Ok(Type::Never),
        _ => target
            .members()
            .iter()
            .map(|member| match member {
                Type::Struct(s) => s.field(field).cloned().ok_or_else(|| missing_field(target, field)),
                _ => Err(missing_field(target, field)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(union_all),
    }
}

fn missing_field(target: &Type, field: &str) -> EvaluationError {
    EvaluationError::TypeMismatch {
        operation: format!("field access '.{}'", field),
        expected: format!("a struct with field '{}'", field),
        found: target.clone(),
    }
}
