//! Parent-linked, immutable name → definition maps.
//!
//! A [`Scope`] is built once through a [`ScopeBuilder`] and then shared via
//! `Arc`. Child scopes layer on top of a parent without touching it, so one
//! prelude can back any number of editing sessions.

mod builtins;
mod prelude;

pub use builtins::{Arity, BuiltinFunction, create_builtin_by_name};
pub use prelude::prelude;

use crate::ast::{
    AliasDefinition, Declaration, EnumDefinition, Expression, FunctionDefinition, StructDefinition,
};
use crate::error::{DefinitionError, EvaluationError};
use crate::evaluator::Evaluator;
use crate::parser;
use crate::types::Type;
use ahash::AHashMap;
use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;

pub(crate) use builtins::{binary_arithmetic, unary_arithmetic};

/// Anything a name can be bound to in a scope.
#[derive(Clone)]
pub enum Definition {
    Struct(StructDefinition),
    Enum(EnumDefinition),
    Function(FunctionDefinition),
    Alias(AliasDefinition),
    Builtin(Arc<dyn BuiltinFunction>),
}

impl Definition {
    pub fn name(&self) -> &str {
        match self {
            Definition::Struct(s) => &s.name,
            Definition::Enum(e) => &e.name,
            Definition::Function(f) => &f.name,
            Definition::Alias(a) => &a.name,
            Definition::Builtin(b) => b.name(),
        }
    }
}

impl From<Declaration> for Definition {
    fn from(declaration: Declaration) -> Self {
        match declaration {
            Declaration::Struct(s) => Definition::Struct(s),
            Declaration::Enum(e) => Definition::Enum(e),
            Declaration::Function(f) => Definition::Function(f),
            Declaration::Alias(a) => Definition::Alias(a),
        }
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Struct(s) => f.debug_tuple("Struct").field(s).finish(),
            Definition::Enum(e) => f.debug_tuple("Enum").field(e).finish(),
            Definition::Function(func) => f.debug_tuple("Function").field(func).finish(),
            Definition::Alias(a) => f.debug_tuple("Alias").field(a).finish(),
            Definition::Builtin(b) => write!(f, "Builtin({})", b.name()),
        }
    }
}

#[derive(Debug)]
pub struct Scope {
    name: String,
    definitions: AHashMap<String, Definition>,
    resolved: AHashMap<String, Type>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }

    /// The definition declared under `name` in this scope only.
    pub fn get_local(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    /// Finds `name` in this scope or the nearest ancestor declaring it, and
    /// returns the definition together with the scope that holds it.
    pub fn lookup(&self, name: &str) -> Option<(&Definition, &Scope)> {
        let mut scope = self;
        loop {
            if let Some(definition) = scope.definitions.get(name) {
                return Some((definition, scope));
            }
            scope = scope.parent.as_deref()?;
        }
    }

    pub fn resolve(&self, name: &str) -> Result<(&Definition, &Scope), EvaluationError> {
        self.lookup(name)
            .ok_or_else(|| EvaluationError::UndefinedReference(name.to_string()))
    }

    /// The cached type of a struct or enum declared in this scope.
    pub fn resolved_type(&self, name: &str) -> Option<&Type> {
        self.resolved.get(name)
    }

    /// Whether `name` resolves here, counting `Enum::Variant` paths of visible enums.
    pub fn is_defined(&self, name: &str) -> bool {
        if self.lookup(name).is_some() {
            return true;
        }
        match name.split_once("::") {
            Some((owner, member)) => match self.lookup(owner) {
                Some((Definition::Enum(e), _)) => e.variants.iter().any(|v| v.name == member),
                _ => false,
            },
            None => false,
        }
    }

    /// The first name `expression` references that resolves neither to one of
    /// `bound` nor to a definition visible from this scope.
    pub fn first_undefined(&self, expression: &Expression, bound: &[&str]) -> Option<String> {
        let mut locals: Vec<String> = bound.iter().map(|b| b.to_string()).collect();
        let mut missing = None;
        expression.visit_references(&mut locals, &mut |name| {
            if missing.is_none() && !self.is_defined(name) {
                missing = Some(name.to_string());
            }
        });
        missing
    }
}

/// Collects definitions for a new scope, then validates and resolves them in `create_scope`.
pub struct ScopeBuilder {
    name: String,
    parent: Option<Arc<Scope>>,
    definitions: AHashMap<String, Definition>,
}

impl ScopeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            definitions: AHashMap::new(),
        }
    }

    pub fn with_parent(mut self, parent: Arc<Scope>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Registers a native built-in, replacing any definition of the same name in this scope.
    pub fn with_builtin(mut self, builtin: Arc<dyn BuiltinFunction>) -> Self {
        self.definitions
            .insert(builtin.name().to_string(), Definition::Builtin(builtin));
        self
    }

    /// Adds a definition. Names must be unique within this scope but may
    /// shadow names of enclosing scopes.
    pub fn add(&mut self, definition: impl Into<Definition>) -> Result<&mut Self, DefinitionError> {
        let definition = definition.into();
        let name = definition.name().to_string();
        if self.definitions.contains_key(&name) {
            return Err(DefinitionError::Duplicate {
                name,
                scope: self.name.clone(),
            });
        }
        self.definitions.insert(name, definition);
        Ok(self)
    }

    /// Parses definition source and adds every declaration in it.
    pub fn add_source(&mut self, source: &str) -> Result<&mut Self, DefinitionError> {
        for declaration in parser::parse_definitions(source)? {
            self.add(declaration)?;
        }
        Ok(self)
    }

    /// Validates every definition and resolves struct and enum types.
    pub fn create_scope(self) -> Result<Arc<Scope>, DefinitionError> {
        let mut scope = Scope {
            name: self.name,
            definitions: self.definitions,
            resolved: AHashMap::new(),
            parent: self.parent,
        };

        let mut names: Vec<String> = scope.definitions.keys().cloned().collect();
        names.sort();

        for name in &names {
            check_references(&scope, name)?;
        }

        let mut resolved = AHashMap::new();
        {
            let evaluator = Evaluator::new(&scope);
            for name in &names {
                let cached = match scope.definitions.get(name) {
                    Some(Definition::Struct(_) | Definition::Enum(_)) => true,
                    Some(Definition::Alias(_)) => false,
                    _ => continue,
                };
                match evaluator.resolve_definition(name) {
                    Ok(ty) if cached => {
                        resolved.insert(name.clone(), ty);
                    }
                    Ok(_) => {}
                    Err(EvaluationError::UndefinedReference(missing)) => {
                        return Err(DefinitionError::UndefinedReference {
                            name: missing,
                            definition: name.clone(),
                        });
                    }
                    Err(EvaluationError::RecursionLimit { .. }) => {
                        return Err(DefinitionError::Recursive(name.clone()));
                    }
                    Err(e) => {
                        warn!(
                            "Definition '{}' in scope '{}' did not evaluate, using any: {}",
                            name, scope.name, e
                        );
                        if cached {
                            resolved.insert(name.clone(), Type::Any);
                        }
                    }
                }
            }
        }
        scope.resolved = resolved;

        info!(
            "Created scope '{}' with {} definition(s)",
            scope.name,
            scope.definitions.len()
        );
        for (name, ty) in &scope.resolved {
            debug!("  {} = {}", name, ty);
        }
        Ok(Arc::new(scope))
    }
}

fn check_references(scope: &Scope, name: &str) -> Result<(), DefinitionError> {
    let undefined = |missing: String| DefinitionError::UndefinedReference {
        name: missing,
        definition: name.to_string(),
    };
    let Some(definition) = scope.definitions.get(name) else {
        return Ok(());
    };
    let missing = match definition {
        Definition::Struct(s) => s
            .fields
            .iter()
            .find_map(|field| scope.first_undefined(&field.ty, &[])),
        Definition::Enum(e) => e
            .variants
            .iter()
            .filter_map(|variant| variant.payload.as_ref())
            .find_map(|payload| scope.first_undefined(payload, &[])),
        Definition::Function(function) => {
            let params: Vec<&str> = function.params.iter().map(|p| p.name.as_str()).collect();
            function
                .params
                .iter()
                .find_map(|param| scope.first_undefined(&param.ty, &[]))
                .or_else(|| scope.first_undefined(&function.body, &params))
        }
        Definition::Alias(alias) => scope.first_undefined(&alias.value, &[]),
        Definition::Builtin(_) => None,
    };
    match missing {
        Some(missing) => Err(undefined(missing)),
        None => Ok(()),
    }
}
