use crate::error::ParseError;

/// The four spellings of a range operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RangeOp {
    /// `..`
    Closed,
    /// `..<`
    OpenMax,
    /// `<..`
    OpenMin,
    /// `<..<`
    Open,
}

impl RangeOp {
    pub(crate) fn min_inclusive(self) -> bool {
        matches!(self, RangeOp::Closed | RangeOp::OpenMax)
    }

    pub(crate) fn max_inclusive(self) -> bool {
        matches!(self, RangeOp::Closed | RangeOp::OpenMin)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Range(RangeOp),
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Colon,
    PathSep,
    Dot,
    Semi,
    Assign,
    FatArrow,
    Pipe,
    Amp,
    Plus,
    Minus,
    Star,
    Eof,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("'{}'", name),
            Token::Number(n) => format!("number {}", n),
            Token::Str(s) => format!("string {:?}", s),
            Token::Range(_) => "range operator".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Colon => "':'".to_string(),
            Token::PathSep => "'::'".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::Semi => "';'".to_string(),
            Token::Assign => "'='".to_string(),
            Token::FatArrow => "'=>'".to_string(),
            Token::Pipe => "'|'".to_string(),
            Token::Amp => "'&'".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Spanned {
    pub(crate) token: Token,
    pub(crate) line: usize,
    pub(crate) column: usize,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek(0) {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' || (c == '/' && self.peek(1) == Some('/')) {
                while let Some(c) = self.peek(0) {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn number(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;
        while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        // A '.' only continues the number when a digit follows, so `0..5` stays a range.
        if self.peek(0) == Some('.') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|e| self.error(format!("Invalid number '{}': {}", text, e)))
    }

    fn string(&mut self) -> Result<Token, ParseError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Token::Str(value)),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c @ ('"' | '\\')) => value.push(c),
                    Some(c) => return Err(self.error(format!("Unknown escape '\\{}'", c))),
                    None => return Err(self.error("Unterminated string")),
                },
                Some(c) => value.push(c),
                None => return Err(self.error("Unterminated string")),
            }
        }
    }

    fn ident(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek(0)
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.bump();
        }
        Token::Ident(self.chars[start..self.pos].iter().collect())
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        let Some(c) = self.peek(0) else {
            return Ok(Token::Eof);
        };
        if c.is_ascii_digit() {
            return self.number();
        }
        if c == '"' {
            return self.string();
        }
        if c.is_alphabetic() || c == '_' {
            return Ok(self.ident());
        }

        let (token, width) = match (c, self.peek(1), self.peek(2), self.peek(3)) {
            ('<', Some('.'), Some('.'), Some('<')) => (Token::Range(RangeOp::Open), 4),
            ('<', Some('.'), Some('.'), _) => (Token::Range(RangeOp::OpenMin), 3),
            ('.', Some('.'), Some('<'), _) => (Token::Range(RangeOp::OpenMax), 3),
            ('.', Some('.'), _, _) => (Token::Range(RangeOp::Closed), 2),
            ('.', _, _, _) => (Token::Dot, 1),
            (':', Some(':'), _, _) => (Token::PathSep, 2),
            (':', _, _, _) => (Token::Colon, 1),
            ('=', Some('>'), _, _) => (Token::FatArrow, 2),
            ('=', _, _, _) => (Token::Assign, 1),
            ('{', _, _, _) => (Token::LBrace, 1),
            ('}', _, _, _) => (Token::RBrace, 1),
            ('(', _, _, _) => (Token::LParen, 1),
            (')', _, _, _) => (Token::RParen, 1),
            (',', _, _, _) => (Token::Comma, 1),
            (';', _, _, _) => (Token::Semi, 1),
            ('|', _, _, _) => (Token::Pipe, 1),
            ('&', _, _, _) => (Token::Amp, 1),
            ('+', _, _, _) => (Token::Plus, 1),
            ('-', _, _, _) => (Token::Minus, 1),
            ('*', _, _, _) => (Token::Star, 1),
            _ => return Err(self.error(format!("Unexpected character '{}'", c))),
        };
        self.bump_n(width);
        Ok(token)
    }
}

/// Splits source text into tokens, ending with a single `Token::Eof`.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
    };
    let mut tokens = Vec::new();
    loop {
        lexer.skip_trivia();
        let (line, column) = (lexer.line, lexer.column);
        let token = lexer.next_token()?;
        let done = token == Token::Eof;
        tokens.push(Spanned {
            token,
            line,
            column,
        });
        if done {
            return Ok(tokens);
        }
    }
}
