use super::{EnumType, NumericSet, StructType, Type, UnionType};
use std::collections::BTreeMap;

/// Builds the union of any number of types.
///
/// Nested unions are flattened, `Never` members are dropped, numeric members
/// are merged into one normalized set, variants of the same enum are merged,
/// and members already covered by another member are removed. A single
/// remaining member is returned as-is; no members yields `Never`.
pub fn union_all<I>(types: I) -> Type
where
    I: IntoIterator<Item = Type>,
{
    let mut builder = UnionBuilder::default();
    for ty in types {
        builder.add(ty);
    }
    builder.build()
}

#[derive(Default)]
struct UnionBuilder {
    any: bool,
    number: bool,
    string: bool,
    numeric: Option<NumericSet>,
    literals: Vec<String>,
    enums: Vec<EnumType>,
    structs: Vec<StructType>,
}

impl UnionBuilder {
    fn add(&mut self, ty: Type) {
        match ty {
            Type::Any => self.any = true,
            Type::Never => {}
            Type::Number => self.number = true,
            Type::String => self.string = true,
            Type::Numeric(set) => {
                self.numeric = Some(match self.numeric.take() {
                    Some(acc) => acc.union(&set),
                    None => set,
                });
            }
            Type::StringLiteral(value) => {
                if !self.literals.contains(&value) {
                    self.literals.push(value);
                }
            }
            Type::Enum(e) => match self.enums.iter_mut().find(|x| x.name == e.name) {
                Some(existing) => *existing = merge_enums(existing, &e),
                None => self.enums.push(e),
            },
            Type::Struct(s) => {
                if self.structs.iter().any(|kept| struct_subtype(&s, kept)) {
                    return;
                }
                self.structs.retain(|kept| !struct_subtype(kept, &s));
                self.structs.push(s);
            }
            Type::Union(union) => {
                for member in union.members {
                    self.add(member);
                }
            }
        }
    }

    fn build(self) -> Type {
        if self.any {
            return Type::Any;
        }

        let mut members = Vec::new();
        if self.number {
            members.push(Type::Number);
        } else if let Some(set) = self.numeric {
            match Type::numeric(set) {
                Type::Never => {}
                numeric => members.push(numeric),
            }
        }
        if self.string {
            members.push(Type::String);
        } else {
            members.extend(self.literals.into_iter().map(Type::StringLiteral));
        }
        members.extend(
            self.enums
                .into_iter()
                .filter(|e| !e.is_empty())
                .map(Type::Enum),
        );
        members.extend(self.structs.into_iter().map(Type::Struct));

        match members.len() {
            0 => Type::Never,
            1 => members.remove(0),
            _ => Type::Union(UnionType { members }),
        }
    }
}

fn merge_enums(a: &EnumType, b: &EnumType) -> EnumType {
    let mut variants = a.variants.clone();
    for (variant, payload) in &b.variants {
        // A variant without a payload restriction accepts every payload.
        let merged = match (variants.remove(variant), payload) {
            (Some(Some(x)), Some(y)) => Some(x.union(y)),
            (Some(_), _) => None,
            (None, payload) => payload.clone(),
        };
        variants.insert(variant.clone(), merged);
    }
    EnumType {
        name: a.name.clone(),
        variants,
    }
}

fn intersect_structs(a: &StructType, b: &StructType) -> Type {
    if !a.has_same_shape(b) {
        return Type::Never;
    }
    let mut fields = Vec::with_capacity(a.fields.len());
    for (name, ty) in &a.fields {
        let Some(other) = b.field(name) else {
            return Type::Never;
        };
        let field = ty.intersect(other);
        if field.is_never() {
            return Type::Never;
        }
        fields.push((name.clone(), field));
    }
    Type::Struct(StructType::new(a.name.clone(), fields))
}

fn intersect_enums(a: &EnumType, b: &EnumType) -> Type {
    if a.name != b.name {
        return Type::Never;
    }
    let mut variants = BTreeMap::new();
    for (variant, payload) in &a.variants {
        let Some(other) = b.variants.get(variant) else {
            continue;
        };
        let payload = match (payload, other) {
            (Some(x), Some(y)) => {
                let narrowed = x.intersect(y);
                if narrowed.is_never() {
                    continue;
                }
                Some(narrowed)
            }
            (Some(x), None) | (None, Some(x)) => Some(x.clone()),
            (None, None) => None,
        };
        variants.insert(variant.clone(), payload);
    }
    if variants.is_empty() {
        Type::Never
    } else {
        Type::Enum(EnumType {
            name: a.name.clone(),
            variants,
        })
    }
}

fn struct_subtype(a: &StructType, b: &StructType) -> bool {
    a.has_same_shape(b)
        && a
            .fields
            .iter()
            .all(|(name, ty)| b.field(name).is_some_and(|other| ty.is_subtype_of(other)))
}

fn enum_subtype(a: &EnumType, b: &EnumType) -> bool {
    a.name == b.name
        && a.variants.iter().all(|(variant, payload)| {
            match (payload, b.variants.get(variant)) {
                (_, None) => false,
                (_, Some(None)) => true,
                (Some(x), Some(Some(y))) => x.is_subtype_of(y),
                (None, Some(Some(_))) => false,
            }
        })
}

impl Type {
    pub fn union(&self, other: &Type) -> Type {
        union_all([self.clone(), other.clone()])
    }

    /// The values common to both types. Mismatched kinds intersect to `Never`.
    pub fn intersect(&self, other: &Type) -> Type {
        match (self, other) {
            (Type::Never, _) | (_, Type::Never) => Type::Never,
            (Type::Any, x) | (x, Type::Any) => x.clone(),
            (Type::Union(u), x) | (x, Type::Union(u)) => {
                union_all(u.members().iter().map(|m| m.intersect(x)))
            }
            (Type::Number, Type::Number) => Type::Number,
            (Type::Number, Type::Numeric(set)) | (Type::Numeric(set), Type::Number) => {
                Type::Numeric(set.clone())
            }
            (Type::Numeric(a), Type::Numeric(b)) => Type::numeric(a.intersect(b)),
            (Type::String, Type::String) => Type::String,
            (Type::String, Type::StringLiteral(s)) | (Type::StringLiteral(s), Type::String) => {
                Type::StringLiteral(s.clone())
            }
            (Type::StringLiteral(a), Type::StringLiteral(b)) => {
                if a == b {
                    Type::StringLiteral(a.clone())
                } else {
                    Type::Never
                }
            }
            (Type::Struct(a), Type::Struct(b)) => intersect_structs(a, b),
            (Type::Enum(a), Type::Enum(b)) => intersect_enums(a, b),
            _ => Type::Never,
        }
    }

    /// Removes the members of `self` that are covered by `other`.
    ///
    /// Enum members lose the individual variants `other` covers. Numeric sets
    /// and strings are only removed when fully covered.
    pub fn without(&self, other: &Type) -> Type {
        union_all(self.members().iter().filter_map(|member| {
            if member.is_subtype_of(other) {
                return None;
            }
            match member {
                Type::Enum(e) => {
                    let remaining: BTreeMap<String, Option<Type>> = e
                        .variants
                        .iter()
                        .filter(|(variant, payload)| {
                            let single = Type::Enum(EnumType {
                                name: e.name.clone(),
                                variants: BTreeMap::from([(
                                    (*variant).clone(),
                                    (*payload).clone(),
                                )]),
                            });
                            !single.is_subtype_of(other)
                        })
                        .map(|(variant, payload)| (variant.clone(), payload.clone()))
                        .collect();
                    Some(Type::Enum(EnumType {
                        name: e.name.clone(),
                        variants: remaining,
                    }))
                }
                _ => Some(member.clone()),
            }
        }))
    }

    pub fn is_disjoint_with(&self, other: &Type) -> bool {
        self.intersect(other).is_never()
    }

    /// True when every value of `self` is also a value of `target`.
    pub fn is_subtype_of(&self, target: &Type) -> bool {
        match (self, target) {
            (Type::Never, _) => true,
            (_, Type::Any) => true,
            (Type::Any, _) | (_, Type::Never) => false,
            (Type::Union(u), _) => u.members().iter().all(|m| m.is_subtype_of(target)),
            (_, Type::Union(u)) => u.members().iter().any(|m| self.is_subtype_of(m)),
            (Type::Number, Type::Number) => true,
            (Type::Numeric(_), Type::Number) => true,
            (Type::Numeric(a), Type::Numeric(b)) => b.contains(a),
            (Type::String, Type::String) => true,
            (Type::StringLiteral(_), Type::String) => true,
            (Type::StringLiteral(a), Type::StringLiteral(b)) => a == b,
            (Type::Struct(a), Type::Struct(b)) => struct_subtype(a, b),
            (Type::Enum(a), Type::Enum(b)) => enum_subtype(a, b),
            _ => false,
        }
    }
}
