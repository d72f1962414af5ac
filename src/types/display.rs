use super::{EnumType, StructType, Type};
use itertools::Itertools;
use std::fmt;

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "any"),
            Type::Never => write!(f, "never"),
            Type::Number => write!(f, "number"),
            Type::String => write!(f, "string"),
            Type::Numeric(set) => write!(f, "{}", set),
            Type::StringLiteral(value) => write!(f, "{:?}", value),
            Type::Struct(s) => write!(f, "{}", s),
            Type::Enum(e) => write!(f, "{}", e),
            Type::Union(u) => write!(f, "{}", u.members().iter().join(" | ")),
        }
    }
}

impl fmt::Display for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return write!(f, "{}", self.name);
        }
        let fields = self
            .fields
            .iter()
            .map(|(name, ty)| format!("{}: {}", name, ty))
            .join(", ");
        write!(f, "{} {{ {} }}", self.name, fields)
    }
}

impl fmt::Display for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variants = self
            .variants
            .iter()
            .map(|(variant, payload)| match payload {
                Some(payload) => format!("{}::{}({})", self.name, variant, payload),
                None => format!("{}::{}", self.name, variant),
            })
            .join(" | ");
        write!(f, "{}", variants)
    }
}
