//! The closed set of types that flow through pipeline sockets, and the pure
//! algebra over them (union, intersection, difference, disjointness, subtyping).
//!
//! Every [`Type`] is an immutable value with structural equality. Unions are
//! only ever built through [`union_all`], which keeps them flat and minimal,
//! and numeric members are stored as normalized [`NumericSet`]s.

mod algebra;
mod display;
pub mod numeric;

pub use algebra::union_all;
pub use numeric::{Bound, Interval, NumericSet};

use std::collections::BTreeMap;

/// The name of the built-in boolean enum.
pub const BOOL: &str = "bool";

/// A type describing the set of values a socket may carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Any,
    Never,
    Number,
    String,
    Numeric(NumericSet),
    StringLiteral(String),
    Struct(StructType),
    Enum(EnumType),
    Union(UnionType),
}

/// A named record type with ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    name: String,
    fields: Vec<(String, Type)>,
}

impl StructType {
    pub fn new(name: impl Into<String>, fields: Vec<(String, Type)>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[(String, Type)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Type> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    fn has_same_shape(&self, other: &StructType) -> bool {
        self.name == other.name
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .all(|(name, _)| other.field(name).is_some())
    }
}

/// A named enum restricted to a subset of its variants.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    name: String,
    variants: BTreeMap<String, Option<Type>>,
}

impl EnumType {
    pub fn new<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<Type>)>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(|(v, p)| (v.into(), p)).collect(),
        }
    }

    /// An enum type holding exactly one payload-less variant.
    pub fn variant(name: impl Into<String>, variant: impl Into<String>) -> Self {
        let variant: String = variant.into();
        Self::new(name, [(variant, None)])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> impl Iterator<Item = (&str, Option<&Type>)> {
        self.variants.iter().map(|(v, p)| (v.as_str(), p.as_ref()))
    }

    pub fn has_variant(&self, variant: &str) -> bool {
        self.variants.contains_key(variant)
    }

    pub fn payload(&self, variant: &str) -> Option<&Type> {
        self.variants.get(variant).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// A flattened set of at least two member types.
#[derive(Debug, Clone)]
pub struct UnionType {
    members: Vec<Type>,
}

impl UnionType {
    pub fn members(&self) -> &[Type] {
        &self.members
    }
}

impl PartialEq for UnionType {
    fn eq(&self, other: &Self) -> bool {
        self.members.len() == other.members.len()
            && self.members.iter().all(|m| other.members.contains(m))
    }
}

impl Type {
    /// A single numeric value. `NaN` has no values and yields `Never`.
    pub fn literal(value: f64) -> Type {
        if value.is_nan() {
            Type::Never
        } else {
            Type::numeric(NumericSet::literal(value))
        }
    }

    pub fn interval(min: Bound, max: Bound) -> Type {
        Type::numeric(NumericSet::interval(Interval::new(min, max)))
    }

    /// The integers between `min` and `max`.
    pub fn int_interval(min: Bound, max: Bound) -> Type {
        Type::numeric(NumericSet::integers(Interval::new(min, max)))
    }

    /// Every integer.
    pub fn int() -> Type {
        Type::numeric(NumericSet::all_integers())
    }

    /// Wraps a numeric set, collapsing the empty set and the whole real line.
    pub fn numeric(set: NumericSet) -> Type {
        if set.is_empty() {
            Type::Never
        } else if set.is_all_reals() {
            Type::Number
        } else {
            Type::Numeric(set)
        }
    }

    pub fn string_literal(value: impl Into<String>) -> Type {
        Type::StringLiteral(value.into())
    }

    pub fn structure(name: impl Into<String>, fields: Vec<(String, Type)>) -> Type {
        Type::Struct(StructType::new(name, fields))
    }

    pub fn bool() -> Type {
        Type::Enum(EnumType::new(BOOL, [("true", None), ("false", None)]))
    }

    pub fn bool_literal(value: bool) -> Type {
        Type::Enum(EnumType::variant(BOOL, if value { "true" } else { "false" }))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Type::Never)
    }

    /// The members of a union, or the type itself as a one-element slice.
    pub fn members(&self) -> &[Type] {
        match self {
            Type::Union(union) => union.members(),
            other => std::slice::from_ref(other),
        }
    }

    /// The numbers this type admits, if it is purely numeric.
    pub fn as_numeric(&self) -> Option<NumericSet> {
        match self {
            Type::Number => Some(NumericSet::all_reals()),
            Type::Numeric(set) => Some(set.clone()),
            _ => None,
        }
    }

    /// `Some(true)`/`Some(false)` for a single `bool` variant, `None` otherwise.
    pub fn as_bool_literal(&self) -> Option<bool> {
        match self {
            Type::Enum(e) if e.name() == BOOL && e.len() == 1 => {
                Some(e.has_variant("true"))
            }
            _ => None,
        }
    }
}
