use crate::error::EvaluationError;
use crate::types::{BOOL, NumericSet, Type};
use std::fmt;
use std::sync::Arc;

/// The number of arguments a built-in accepts, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: usize,
}

impl Arity {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub const fn exactly(count: usize) -> Self {
        Self::new(count, count)
    }

    pub fn accepts(&self, count: usize) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{} to {}", self.min, self.max)
        }
    }
}

/// Defines the contract for a function implemented natively rather than in
/// definition source. Arguments are checked against `arity` before `call`.
pub trait BuiltinFunction: Send + Sync {
    fn name(&self) -> &str;
    fn arity(&self) -> Arity;
    fn call(&self, args: &[Type]) -> Result<Type, EvaluationError>;
}

/// Master macro to define the native built-ins, their registration, and their creation.
macro_rules! define_builtins {
    ( $( ($struct_name:ident, $name:literal, $min:expr, $max:expr, $body:path) ),* $(,)? ) => {
        $(
            struct $struct_name;
            impl BuiltinFunction for $struct_name {
                fn name(&self) -> &str { $name }
                fn arity(&self) -> Arity { Arity::new($min, $max) }
                fn call(&self, args: &[Type]) -> Result<Type, EvaluationError> {
                    require_args(self, args)?;
                    $body(args)
                }
            }
        )*

        /// Every native built-in of the prelude.
        pub(super) fn default_builtins() -> Vec<Arc<dyn BuiltinFunction>> {
            vec![ $( Arc::new($struct_name) as Arc<dyn BuiltinFunction> ),* ]
        }

        /// Creates a native built-in by its name, e.g. to register it under another scope.
        pub fn create_builtin_by_name(name: &str) -> Option<Arc<dyn BuiltinFunction>> {
            match name {
                $( $name => Some(Arc::new($struct_name)), )*
                _ => None,
            }
        }
    };
}

define_builtins! {
    // Type constructors
    (AnyBuiltin, "any", 0, 0, builtin_any),
    (NeverBuiltin, "never", 0, 0, builtin_never),
    (NumberBuiltin, "number", 0, 0, builtin_number),
    (StringBuiltin, "string", 0, 0, builtin_string),
    (IntBuiltin, "int", 0, 1, builtin_int),

    // Arithmetic
    (AddBuiltin, "add", 2, 2, builtin_add),
    (SubBuiltin, "sub", 2, 2, builtin_sub),
    (MulBuiltin, "mul", 2, 2, builtin_mul),
    (NegBuiltin, "neg", 1, 1, builtin_neg),
    (AbsBuiltin, "abs", 1, 1, builtin_abs),
    (MinBuiltin, "min", 2, 2, builtin_min),
    (MaxBuiltin, "max", 2, 2, builtin_max),

    // Logic
    (NotBuiltin, "not", 1, 1, builtin_not),
    (AndBuiltin, "and", 2, 2, builtin_and),
    (OrBuiltin, "or", 2, 2, builtin_or),

    // Strings
    (ConcatBuiltin, "concat", 2, 2, builtin_concat),
}

/// Helper to check for the correct number of arguments.
fn require_args(builtin: &dyn BuiltinFunction, args: &[Type]) -> Result<(), EvaluationError> {
    let arity = builtin.arity();
    if arity.accepts(args.len()) {
        Ok(())
    } else {
        Err(EvaluationError::Arity {
            function: builtin.name().to_string(),
            expected: arity.to_string(),
            found: args.len(),
        })
    }
}

fn builtin_any(_: &[Type]) -> Result<Type, EvaluationError> {
    Ok(Type::Any)
}

fn builtin_never(_: &[Type]) -> Result<Type, EvaluationError> {
    Ok(Type::Never)
}

fn builtin_number(_: &[Type]) -> Result<Type, EvaluationError> {
    Ok(Type::Number)
}

fn builtin_string(_: &[Type]) -> Result<Type, EvaluationError> {
    Ok(Type::String)
}

fn builtin_int(args: &[Type]) -> Result<Type, EvaluationError> {
    match args.first() {
        None | Some(Type::Any) => Ok(Type::int()),
        Some(Type::Never) => Ok(Type::Never),
        Some(arg) => {
            let set = numeric_operand("int", arg)?;
            Ok(Type::numeric(set.intersect(&NumericSet::all_integers())))
        }
    }
}

fn builtin_add(args: &[Type]) -> Result<Type, EvaluationError> {
    binary_arithmetic("add", &args[0], &args[1], NumericSet::add)
}

fn builtin_sub(args: &[Type]) -> Result<Type, EvaluationError> {
    binary_arithmetic("sub", &args[0], &args[1], NumericSet::subtract)
}

fn builtin_mul(args: &[Type]) -> Result<Type, EvaluationError> {
    binary_arithmetic("mul", &args[0], &args[1], NumericSet::multiply)
}

fn builtin_neg(args: &[Type]) -> Result<Type, EvaluationError> {
    unary_arithmetic("neg", &args[0], NumericSet::negate)
}

fn builtin_abs(args: &[Type]) -> Result<Type, EvaluationError> {
    unary_arithmetic("abs", &args[0], NumericSet::abs)
}

fn builtin_min(args: &[Type]) -> Result<Type, EvaluationError> {
    binary_arithmetic("min", &args[0], &args[1], NumericSet::minimum)
}

fn builtin_max(args: &[Type]) -> Result<Type, EvaluationError> {
    binary_arithmetic("max", &args[0], &args[1], NumericSet::maximum)
}

fn builtin_not(args: &[Type]) -> Result<Type, EvaluationError> {
    logic("not", args, |values| !values[0])
}

fn builtin_and(args: &[Type]) -> Result<Type, EvaluationError> {
    logic("and", args, |values| values[0] && values[1])
}

fn builtin_or(args: &[Type]) -> Result<Type, EvaluationError> {
    logic("or", args, |values| values[0] || values[1])
}

fn builtin_concat(args: &[Type]) -> Result<Type, EvaluationError> {
    let (left, right) = (&args[0], &args[1]);
    if left.is_never() || right.is_never() {
        return Ok(Type::Never);
    }
    for arg in [left, right] {
        if !arg.is_any() && !arg.is_subtype_of(&Type::String) {
            return Err(EvaluationError::TypeMismatch {
                operation: "concat".to_string(),
                expected: "string".to_string(),
                found: arg.clone(),
            });
        }
    }
    match (left, right) {
        (Type::StringLiteral(a), Type::StringLiteral(b)) => Ok(Type::string_literal(format!("{}{}", a, b))),
        _ => Ok(Type::String),
    }
}

fn numeric_operand(operation: &str, arg: &Type) -> Result<NumericSet, EvaluationError> {
    arg.as_numeric().ok_or_else(|| EvaluationError::TypeMismatch {
        operation: operation.to_string(),
        expected: "number".to_string(),
        found: arg.clone(),
    })
}

/// Applies interval arithmetic to two numeric operands. `any` operands yield
/// `any` and `never` operands yield `never`.
pub(crate) fn binary_arithmetic(
    operation: &str,
    left: &Type,
    right: &Type,
    op: impl Fn(&NumericSet, &NumericSet) -> NumericSet,
) -> Result<Type, EvaluationError> {
    if left.is_never() || right.is_never() {
        return Ok(Type::Never);
    }
    if left.is_any() || right.is_any() {
        return Ok(Type::Any);
    }
    let left = numeric_operand(operation, left)?;
    let right = numeric_operand(operation, right)?;
    Ok(Type::numeric(op(&left, &right)))
}

pub(crate) fn unary_arithmetic(
    operation: &str,
    operand: &Type,
    op: impl Fn(&NumericSet) -> NumericSet,
) -> Result<Type, EvaluationError> {
    match operand {
        Type::Never => Ok(Type::Never),
        Type::Any => Ok(Type::Any),
        other => Ok(Type::numeric(op(&numeric_operand(operation, other)?))),
    }
}

/// The boolean values a `bool`-typed argument may take.
fn bool_values(operation: &str, arg: &Type) -> Result<Vec<bool>, EvaluationError> {
    if arg.is_any() {
        return Ok(vec![true, false]);
    }
    match arg {
        Type::Enum(e) if e.name() == BOOL => Ok([true, false]
            .into_iter()
            .filter(|value| e.has_variant(if *value { "true" } else { "false" }))
            .collect()),
        other => Err(EvaluationError::TypeMismatch {
            operation: operation.to_string(),
            expected: BOOL.to_string(),
            found: other.clone(),
        }),
    }
}

/// Evaluates a boolean function over every combination of possible argument values.
fn logic(
    operation: &str,
    args: &[Type],
    op: impl Fn(&[bool]) -> bool,
) -> Result<Type, EvaluationError> {
    let mut combinations: Vec<Vec<bool>> = vec![Vec::new()];
    for arg in args {
        let values = bool_values(operation, arg)?;
        combinations = combinations
            .into_iter()
            .flat_map(|prefix| {
                values.iter().map(move |value| {
                    let mut next = prefix.clone();
                    next.push(*value);
                    next
                })
            })
            .collect();
    }
    let results: Vec<bool> = combinations.iter().map(|values| op(values)).collect();
    let can_be_true = results.contains(&true);
    let can_be_false = results.contains(&false);
    Ok(match (can_be_true, can_be_false) {
        (true, true) => Type::bool(),
        (true, false) => Type::bool_literal(true),
        (false, true) => Type::bool_literal(false),
        (false, false) => Type::Never,
    })
}
