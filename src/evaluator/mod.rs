//! Evaluates type expressions to [`Type`]s against a [`Scope`].
//!
//! Evaluation is pure: it reads the scope and a set of local bindings and
//! never mutates either. A failure aborts only the expression being evaluated.

mod engine;

use crate::ast::Expression;
use crate::error::EvaluationError;
use crate::parser;
use crate::scope::Scope;
use crate::types::Type;
use ahash::AHashMap;
use engine::Frame;

/// Local names visible to an expression, such as function parameters or a
/// node's `Input0`.
pub type Bindings = AHashMap<String, Type>;

/// Call depth used when none is configured.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

pub struct Evaluator<'a> {
    scope: &'a Scope,
    max_call_depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(scope: &'a Scope) -> Self {
        Self {
            scope,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    pub fn scope(&self) -> &'a Scope {
        self.scope
    }

    pub fn evaluate(
        &self,
        expression: &Expression,
        bindings: &Bindings,
    ) -> Result<Type, EvaluationError> {
        let mut frame = Frame::default();
        self.eval(self.scope, expression, bindings, &mut frame)
    }

    /// Parses `source` as a type expression and evaluates it.
    pub fn evaluate_str(&self, source: &str, bindings: &Bindings) -> Result<Type, EvaluationError> {
        let expression = parser::parse_expression(source)?;
        self.evaluate(&expression, bindings)
    }

    /// Resolves a named definition to its type, computing struct and enum
    /// types that are not cached yet.
    pub(crate) fn resolve_definition(&self, name: &str) -> Result<Type, EvaluationError> {
        let mut frame = Frame::default();
        self.eval_name(self.scope, name, &Bindings::default(), &mut frame)
    }
}
