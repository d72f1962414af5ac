use super::Expression;

/// A top-level item of definition source.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Struct(StructDefinition),
    Enum(EnumDefinition),
    Function(FunctionDefinition),
    Alias(AliasDefinition),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Struct(s) => &s.name,
            Declaration::Enum(e) => &e.name,
            Declaration::Function(f) => &f.name,
            Declaration::Alias(a) => &a.name,
        }
    }
}

/// `struct Name { field: Type, ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct StructDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: Expression,
}

/// `enum Name { Variant, Variant(Type), ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDefinition {
    pub name: String,
    pub variants: Vec<VariantDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantDefinition {
    pub name: String,
    pub payload: Option<Expression>,
}

/// `def Name(param: Type, ...) { body }`. Namespaced functions are named `Owner::name`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub params: Vec<Parameter>,
    pub body: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: Expression,
}

/// `let name = expr;`
#[derive(Debug, Clone, PartialEq)]
pub struct AliasDefinition {
    pub name: String,
    pub value: Expression,
}
