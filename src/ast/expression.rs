use crate::types::numeric::format_number;
use itertools::Itertools;
use std::fmt;

/// A parsed type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    // Literals
    Number(f64),
    String(String),
    Range(RangeLiteral),

    // References
    Name(String),
    /// `Owner::member`, an enum variant or a namespaced definition.
    Path { owner: String, member: String },
    FieldAccess {
        target: Box<Expression>,
        field: String,
    },
    Call {
        function: String,
        args: Vec<Expression>,
    },
    StructLiteral {
        name: String,
        fields: Vec<(String, Expression)>,
    },

    // Set operators
    Union(Box<Expression>, Box<Expression>),
    Intersection(Box<Expression>, Box<Expression>),

    // Arithmetic
    Add(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
    Negate(Box<Expression>),

    Match(MatchExpression),
}

/// `min..max` with optional ends; omitted ends are unbounded.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeLiteral {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_inclusive: bool,
    pub max_inclusive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchExpression {
    pub scrutinee: Box<Expression>,
    pub arms: Vec<MatchArm>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub binding: Option<String>,
    pub body: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Wildcard,
    Type(Expression),
}

impl Expression {
    pub fn name(name: impl Into<String>) -> Self {
        Expression::Name(name.into())
    }

    /// Calls `visit` with every name this expression refers to that is not bound
    /// locally. Paths and namespaced calls are reported as `Owner::member`.
    pub fn visit_references(&self, bound: &mut Vec<String>, visit: &mut impl FnMut(&str)) {
        match self {
            Expression::Number(_) | Expression::String(_) | Expression::Range(_) => {}
            Expression::Name(name) => {
                if !bound.contains(name) {
                    visit(name);
                }
            }
            Expression::Path { owner, member } => visit(&format!("{}::{}", owner, member)),
            Expression::FieldAccess { target, .. } => target.visit_references(bound, visit),
            Expression::Call { function, args } => {
                visit(function);
                for arg in args {
                    arg.visit_references(bound, visit);
                }
            }
            Expression::StructLiteral { name, fields } => {
                visit(name);
                for (_, value) in fields {
                    value.visit_references(bound, visit);
                }
            }
            Expression::Union(l, r)
            | Expression::Intersection(l, r)
            | Expression::Add(l, r)
            | Expression::Subtract(l, r)
            | Expression::Multiply(l, r) => {
                l.visit_references(bound, visit);
                r.visit_references(bound, visit);
            }
            Expression::Negate(v) => v.visit_references(bound, visit),
            Expression::Match(m) => {
                m.scrutinee.visit_references(bound, visit);
                for arm in &m.arms {
                    if let Pattern::Type(pattern) = &arm.pattern {
                        pattern.visit_references(bound, visit);
                    }
                    let pushed = arm.binding.is_some();
                    if let Some(binding) = &arm.binding {
                        bound.push(binding.clone());
                    }
                    arm.body.visit_references(bound, visit);
                    if pushed {
                        bound.pop();
                    }
                }
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expression::Union(..) => 1,
            Expression::Intersection(..) => 2,
            Expression::Add(..) | Expression::Subtract(..) => 3,
            Expression::Multiply(..) => 4,
            Expression::Negate(..) => 5,
            Expression::Match(..) => 0,
            _ => 6,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        if self.precedence() < parent {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }

    fn fmt_binary(
        &self,
        f: &mut fmt::Formatter<'_>,
        symbol: &str,
        l: &Expression,
        r: &Expression,
    ) -> fmt::Result {
        let precedence = self.precedence();
        l.fmt_operand(f, precedence)?;
        write!(f, " {} ", symbol)?;
        // Right operands of left-associative operators need parentheses at equal precedence.
        r.fmt_operand(f, precedence + 1)
    }
}

impl fmt::Display for RangeLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(min) = self.min {
            write!(f, "{}", format_number(min))?;
            if !self.min_inclusive {
                write!(f, "<")?;
            }
        }
        write!(f, "..")?;
        if let Some(max) = self.max {
            if !self.max_inclusive {
                write!(f, "<")?;
            }
            write!(f, "{}", format_number(max))?;
        }
        Ok(())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Number(n) => write!(f, "{}", format_number(*n)),
            Expression::String(s) => write!(f, "{:?}", s),
            Expression::Range(range) => write!(f, "{}", range),
            Expression::Name(name) => write!(f, "{}", name),
            Expression::Path { owner, member } => write!(f, "{}::{}", owner, member),
            Expression::FieldAccess { target, field } => {
                target.fmt_operand(f, 6)?;
                write!(f, ".{}", field)
            }
            Expression::Call { function, args } => {
                write!(f, "{}({})", function, args.iter().join(", "))
            }
            Expression::StructLiteral { name, fields } => {
                let fields = fields
                    .iter()
                    .map(|(field, value)| format!("{}: {}", field, value))
                    .join(", ");
                write!(f, "{} {{ {} }}", name, fields)
            }
            Expression::Union(l, r) => self.fmt_binary(f, "|", l, r),
            Expression::Intersection(l, r) => self.fmt_binary(f, "&", l, r),
            Expression::Add(l, r) => self.fmt_binary(f, "+", l, r),
            Expression::Subtract(l, r) => self.fmt_binary(f, "-", l, r),
            Expression::Multiply(l, r) => self.fmt_binary(f, "*", l, r),
            Expression::Negate(v) => {
                write!(f, "-")?;
                v.fmt_operand(f, 5)
            }
            Expression::Match(m) => {
                write!(f, "match ")?;
                m.scrutinee.fmt_operand(f, 1)?;
                let arms = m
                    .arms
                    .iter()
                    .map(|arm| {
                        let pattern = match &arm.pattern {
                            Pattern::Wildcard => "_".to_string(),
                            Pattern::Type(p) => p.to_string(),
                        };
                        match &arm.binding {
                            Some(binding) => format!("{} as {} => {}", pattern, binding, arm.body),
                            None => format!("{} => {}", pattern, arm.body),
                        }
                    })
                    .join(", ");
                write!(f, " {{ {} }}", arms)
            }
        }
    }
}
