//! Recursive-descent parser for type expressions and definition source.
//!
//! Expression precedence, lowest first: `|`, `&`, `+ -`, `*`, unary `-`,
//! postfix `.field`, then primaries.

mod lexer;

use crate::ast::{
    AliasDefinition, Declaration, EnumDefinition, Expression, FieldDefinition, FunctionDefinition,
    MatchArm, MatchExpression, Parameter, Pattern, RangeLiteral, StructDefinition,
    VariantDefinition,
};
use crate::error::ParseError;
use lexer::{RangeOp, Spanned, Token};

const KEYWORDS: &[&str] = &["match", "as", "struct", "enum", "def", "let", "_"];

/// Deepest expression tree the parser builds. Parsing and evaluation both
/// recurse over the tree, so this bounds their stack use.
pub const MAX_NESTING: usize = 128;

/// Parses a single type expression, e.g. `int(0..) & Dataset.shape`.
pub fn parse_expression(source: &str) -> Result<Expression, ParseError> {
    let mut parser = Parser::new(source)?;
    let expression = parser.expression()?;
    parser.expect(&Token::Eof)?;
    Ok(expression)
}

/// Parses definition source: any sequence of `struct`, `enum`, `def` and `let` items.
pub fn parse_definitions(source: &str) -> Result<Vec<Declaration>, ParseError> {
    let mut parser = Parser::new(source)?;
    let mut declarations = Vec::new();
    while parser.peek() != &Token::Eof {
        if parser.eat(&Token::Semi) {
            continue;
        }
        declarations.push(parser.declaration()?);
    }
    Ok(declarations)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    // Cleared while parsing a match scrutinee, where `{` opens the arm block.
    struct_literals: bool,
    depth: usize,
}

impl Parser {
    fn new(source: &str) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: lexer::tokenize(source)?,
            pos: 0,
            struct_literals: true,
            depth: 0,
        })
    }

    fn current(&self) -> &Spanned {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + offset).min(last)].token
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token != Token::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let current = self.current();
        ParseError {
            line: current.line,
            column: current.column,
            message: message.into(),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        self.error(format!(
            "Expected {}, found {}",
            expected,
            self.peek().describe()
        ))
    }

    fn expect(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(&token.describe()))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            Token::Ident(name) if !KEYWORDS.contains(&name.as_str()) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Ident(name) if name == keyword)
    }

    fn with_struct_literals<T>(
        &mut self,
        allowed: bool,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = std::mem::replace(&mut self.struct_literals, allowed);
        let result = parse(self);
        self.struct_literals = saved;
        result
    }

    /// Parses `item (, item)* ,?` up to and including `close`.
    fn delimited<T>(
        &mut self,
        close: &Token,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut items = Vec::new();
        while self.peek() != close {
            items.push(item(self)?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    // Definitions

    fn declaration(&mut self) -> Result<Declaration, ParseError> {
        let keyword = match self.peek() {
            Token::Ident(keyword) => keyword.clone(),
            _ => return Err(self.unexpected("'struct', 'enum', 'def' or 'let'")),
        };
        match keyword.as_str() {
            "struct" => {
                self.advance();
                self.struct_definition().map(Declaration::Struct)
            }
            "enum" => {
                self.advance();
                self.enum_definition().map(Declaration::Enum)
            }
            "def" => {
                self.advance();
                self.function_definition().map(Declaration::Function)
            }
            "let" => {
                self.advance();
                self.alias_definition().map(Declaration::Alias)
            }
            _ => Err(self.unexpected("'struct', 'enum', 'def' or 'let'")),
        }
    }

    fn struct_definition(&mut self) -> Result<StructDefinition, ParseError> {
        let name = self.expect_ident("struct name")?;
        if self.eat(&Token::Semi) {
            return Ok(StructDefinition {
                name,
                fields: Vec::new(),
            });
        }
        self.expect(&Token::LBrace)?;
        let fields = self.delimited(&Token::RBrace, |p| {
            let name = p.expect_ident("field name")?;
            p.expect(&Token::Colon)?;
            let ty = p.expression()?;
            Ok(FieldDefinition { name, ty })
        })?;
        Ok(StructDefinition { name, fields })
    }

    fn enum_definition(&mut self) -> Result<EnumDefinition, ParseError> {
        let name = self.expect_ident("enum name")?;
        self.expect(&Token::LBrace)?;
        let variants = self.delimited(&Token::RBrace, |p| {
            let name = p.expect_ident("variant name")?;
            let payload = if p.eat(&Token::LParen) {
                let payload = p.with_struct_literals(true, Self::expression)?;
                p.expect(&Token::RParen)?;
                Some(payload)
            } else {
                None
            };
            Ok(VariantDefinition { name, payload })
        })?;
        if variants.is_empty() {
            return Err(self.error(format!("Enum '{}' declares no variants", name)));
        }
        Ok(EnumDefinition { name, variants })
    }

    fn function_definition(&mut self) -> Result<FunctionDefinition, ParseError> {
        let mut name = self.expect_ident("function name")?;
        if self.eat(&Token::PathSep) {
            let member = self.expect_ident("function name")?;
            name = format!("{}::{}", name, member);
        }
        self.expect(&Token::LParen)?;
        let params = self.delimited(&Token::RParen, |p| {
            let name = p.expect_ident("parameter name")?;
            p.expect(&Token::Colon)?;
            let ty = p.expression()?;
            Ok(Parameter { name, ty })
        })?;
        self.expect(&Token::LBrace)?;
        let body = self.with_struct_literals(true, Self::expression)?;
        self.expect(&Token::RBrace)?;
        Ok(FunctionDefinition { name, params, body })
    }

    fn alias_definition(&mut self) -> Result<AliasDefinition, ParseError> {
        let name = self.expect_ident("alias name")?;
        self.expect(&Token::Assign)?;
        let value = self.expression()?;
        self.expect(&Token::Semi)?;
        Ok(AliasDefinition { name, value })
    }

    /// Counts one more level of tree depth. Levels taken inside an
    /// expression are given back when it ends.
    fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(format!(
                "Expression nests deeper than {} levels",
                MAX_NESTING
            )));
        }
        self.depth += 1;
        Ok(())
    }

    // Expressions

    fn expression(&mut self) -> Result<Expression, ParseError> {
        let start = self.depth;
        self.descend()?;
        let result = self.union();
        self.depth = start;
        result
    }

    fn union(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.intersection()?;
        while self.eat(&Token::Pipe) {
            self.descend()?;
            let right = self.intersection()?;
            left = Expression::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn intersection(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.additive()?;
        while self.eat(&Token::Amp) {
            self.descend()?;
            let right = self.additive()?;
            left = Expression::Intersection(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.multiplicative()?;
        loop {
            if self.eat(&Token::Plus) {
                self.descend()?;
                let right = self.multiplicative()?;
                left = Expression::Add(Box::new(left), Box::new(right));
            } else if self.eat(&Token::Minus) {
                self.descend()?;
                let right = self.multiplicative()?;
                left = Expression::Subtract(Box::new(left), Box::new(right));
            } else {
                return Ok(left);
            }
        }
    }

    fn multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.unary()?;
        while self.eat(&Token::Star) {
            self.descend()?;
            let right = self.unary()?;
            left = Expression::Multiply(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expression, ParseError> {
        if self.peek() != &Token::Minus {
            return self.postfix();
        }
        self.advance();
        // `-3` is a literal so that `-3..3` parses as a range.
        if let Token::Number(n) = *self.peek() {
            self.advance();
            return self.number_or_range(-n);
        }
        self.descend()?;
        let operand = self.unary()?;
        Ok(Expression::Negate(Box::new(operand)))
    }

    fn postfix(&mut self) -> Result<Expression, ParseError> {
        let mut expression = self.primary()?;
        while self.eat(&Token::Dot) {
            self.descend()?;
            let field = self.expect_ident("field name")?;
            expression = Expression::FieldAccess {
                target: Box::new(expression),
                field,
            };
        }
        Ok(expression)
    }

    fn primary(&mut self) -> Result<Expression, ParseError> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                self.number_or_range(n)
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expression::String(s))
            }
            Token::Range(op) => {
                if !op.min_inclusive() {
                    return Err(self.error("A range without a lower bound cannot exclude it"));
                }
                self.advance();
                self.range(None, op)
            }
            Token::LParen => {
                self.advance();
                let inner = self.with_struct_literals(true, Self::expression)?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) if name == "match" => {
                self.advance();
                self.match_expression()
            }
            Token::Ident(_) => self.reference(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn number_or_range(&mut self, value: f64) -> Result<Expression, ParseError> {
        if let Token::Range(op) = *self.peek() {
            self.advance();
            self.range(Some(value), op)
        } else {
            Ok(Expression::Number(value))
        }
    }

    fn range(&mut self, min: Option<f64>, op: RangeOp) -> Result<Expression, ParseError> {
        let max = match (self.peek().clone(), self.peek_at(1).clone()) {
            (Token::Number(n), _) => {
                self.advance();
                Some(n)
            }
            (Token::Minus, Token::Number(n)) => {
                self.advance();
                self.advance();
                Some(-n)
            }
            _ => None,
        };
        if max.is_none() && !op.max_inclusive() {
            return Err(self.error("A range without an upper bound cannot exclude it"));
        }
        Ok(Expression::Range(RangeLiteral {
            min,
            max,
            min_inclusive: op.min_inclusive(),
            max_inclusive: op.max_inclusive(),
        }))
    }

    fn reference(&mut self) -> Result<Expression, ParseError> {
        let name = self.expect_ident("a name")?;
        if self.eat(&Token::PathSep) {
            let member = self.expect_ident("a member name")?;
            if self.peek() == &Token::LParen {
                return self.call(format!("{}::{}", name, member));
            }
            return Ok(Expression::Path {
                owner: name,
                member,
            });
        }
        match self.peek() {
            Token::LParen => self.call(name),
            Token::LBrace if self.struct_literals => self.struct_literal(name),
            _ => Ok(Expression::Name(name)),
        }
    }

    fn call(&mut self, function: String) -> Result<Expression, ParseError> {
        self.expect(&Token::LParen)?;
        let args = self.with_struct_literals(true, |p| {
            p.delimited(&Token::RParen, Self::expression)
        })?;
        Ok(Expression::Call { function, args })
    }

    fn struct_literal(&mut self, name: String) -> Result<Expression, ParseError> {
        self.expect(&Token::LBrace)?;
        let fields = self.with_struct_literals(true, |p| {
            p.delimited(&Token::RBrace, |p| {
                let field = p.expect_ident("field name")?;
                p.expect(&Token::Colon)?;
                Ok((field, p.expression()?))
            })
        })?;
        Ok(Expression::StructLiteral { name, fields })
    }

    fn match_expression(&mut self) -> Result<Expression, ParseError> {
        let scrutinee = self.with_struct_literals(false, Self::expression)?;
        self.expect(&Token::LBrace)?;
        let arms = self.with_struct_literals(true, |p| p.delimited(&Token::RBrace, Self::match_arm))?;
        if arms.is_empty() {
            return Err(self.error("A match needs at least one arm"));
        }
        Ok(Expression::Match(MatchExpression {
            scrutinee: Box::new(scrutinee),
            arms,
        }))
    }

    fn match_arm(&mut self) -> Result<MatchArm, ParseError> {
        let pattern = if self.is_keyword("_") {
            self.advance();
            Pattern::Wildcard
        } else {
            Pattern::Type(self.expression()?)
        };
        let binding = if self.is_keyword("as") {
            self.advance();
            Some(self.expect_ident("binding name")?)
        } else {
            None
        };
        self.expect(&Token::FatArrow)?;
        let body = self.expression()?;
        Ok(MatchArm {
            pattern,
            binding,
            body,
        })
    }
}
