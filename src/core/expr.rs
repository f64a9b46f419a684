//! Constraint expressions.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! constraint := expr comparator expr
//! expr       := term (('+' | '-') term)*
//! term       := unary (('*' | '/') unary)*
//! unary      := ('-' | '+') unary | power
//! power      := primary ('**' unary)?
//! primary    := number | 'x' '[' integer ']' | '(' expr ')'
//! ```
//!
//! `**` is right-associative and binds tighter than a unary minus on its left,
//! so `-x[0]**2` is `-(x[0]**2)`.

use crate::utils::error::DomainError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "**",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(f64),
    Var(usize),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn eval(&self, coords: &[f64]) -> Result<f64, DomainError> {
        match self {
            Expr::Literal(value) => Ok(*value),
            Expr::Var(index) => coords
                .get(*index)
                .copied()
                .ok_or(DomainError::IndexOutOfRange {
                    index: *index,
                    len: coords.len(),
                }),
            Expr::Neg(inner) => Ok(-inner.eval(coords)?),
            Expr::Binary { op, lhs, rhs } => {
                let a = lhs.eval(coords)?;
                let b = rhs.eval(coords)?;
                let value = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => {
                        if b == 0.0 {
                            return Err(DomainError::DivisionByZero);
                        }
                        a / b
                    }
                    BinaryOp::Pow => {
                        if a == 0.0 && b < 0.0 {
                            return Err(DomainError::DivisionByZero);
                        }
                        a.powf(b)
                    }
                };
                if value.is_nan() {
                    Err(DomainError::Undefined {
                        operation: op.symbol(),
                    })
                } else {
                    Ok(value)
                }
            }
        }
    }

    /// Value of an expression that references no variables.
    pub fn constant_value(&self) -> Option<f64> {
        if self.max_index().is_some() {
            return None;
        }
        self.eval(&[]).ok()
    }

    /// Largest variable index referenced, if any.
    pub fn max_index(&self) -> Option<usize> {
        match self {
            Expr::Literal(_) => None,
            Expr::Var(index) => Some(*index),
            Expr::Neg(inner) => inner.max_index(),
            Expr::Binary { lhs, rhs, .. } => match (lhs.max_index(), rhs.max_index()) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Eq => "==",
        };
        f.write_str(symbol)
    }
}

impl Comparator {
    fn flipped(self) -> Self {
        match self {
            Comparator::Ge => Comparator::Le,
            Comparator::Le => Comparator::Ge,
            Comparator::Gt => Comparator::Lt,
            Comparator::Lt => Comparator::Gt,
            Comparator::Eq => Comparator::Eq,
        }
    }
}

/// Result of testing one constraint at one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub satisfied: bool,
    /// Positive when satisfied, negative when violated.
    pub margin: f64,
}

impl Evaluation {
    fn violated() -> Self {
        Self {
            satisfied: false,
            margin: f64::NEG_INFINITY,
        }
    }
}

/// A bound on a single coordinate, read off a constraint like `x[2] <= 4`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundDecl {
    Lower { index: usize, value: f64 },
    Upper { index: usize, value: f64 },
    Fixed { index: usize, value: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// 1-based character column.
    pub column: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column {}: {}", self.column, self.message)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone)]
pub struct Constraint {
    source: String,
    lhs: Expr,
    comparator: Comparator,
    rhs: Expr,
}

impl Constraint {
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            end_column: source.chars().count() + 1,
        };
        if tokens.is_empty() {
            return Err(parser.error_here("empty constraint"));
        }

        let lhs = parser.parse_expr()?;
        let comparator = match parser.peek() {
            Some(Token::Cmp(cmp)) => {
                let cmp = *cmp;
                parser.pos += 1;
                cmp
            }
            _ => {
                return Err(parser.error_here(
                    "expected a comparison operator (>=, <=, >, <, ==)",
                ))
            }
        };
        let rhs = parser.parse_expr()?;
        if parser.peek().is_some() {
            return Err(parser.error_here("unexpected trailing input"));
        }

        Ok(Self {
            source: source.trim().to_string(),
            lhs,
            comparator,
            rhs,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn evaluate(&self, coords: &[f64]) -> Evaluation {
        let (a, b) = match (self.lhs.eval(coords), self.rhs.eval(coords)) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => {
                tracing::trace!("'{}' undefined at {:?}: {}", self.source, coords, e);
                return Evaluation::violated();
            }
        };

        let (satisfied, margin) = match self.comparator {
            Comparator::Ge => (a >= b, a - b),
            Comparator::Gt => (a > b, a - b),
            Comparator::Le => (a <= b, b - a),
            Comparator::Lt => (a < b, b - a),
            Comparator::Eq => (a == b, -(a - b).abs()),
        };

        let margin = if margin.is_nan() {
            if satisfied {
                0.0
            } else {
                f64::NEG_INFINITY
            }
        } else {
            margin
        };

        Evaluation { satisfied, margin }
    }

    pub fn is_satisfied(&self, coords: &[f64]) -> bool {
        self.evaluate(coords).satisfied
    }

    pub fn max_index(&self) -> Option<usize> {
        match (self.lhs.max_index(), self.rhs.max_index()) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Coordinate bound declared by this constraint, if it has the shape
    /// `x[i] cmp constant` or `constant cmp x[i]`.
    pub fn bound(&self) -> Option<BoundDecl> {
        let (index, comparator, value) = match (&self.lhs, &self.rhs) {
            (Expr::Var(i), rhs) => (*i, self.comparator, rhs.constant_value()?),
            (lhs, Expr::Var(i)) => (*i, self.comparator.flipped(), lhs.constant_value()?),
            _ => return None,
        };

        Some(match comparator {
            Comparator::Ge | Comparator::Gt => BoundDecl::Lower { index, value },
            Comparator::Le | Comparator::Lt => BoundDecl::Upper { index, value },
            Comparator::Eq => BoundDecl::Fixed { index, value },
        })
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number { value: f64, text: String },
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Plus,
    Minus,
    Star,
    Slash,
    Pow,
    Cmp(Comparator),
}

#[derive(Debug, Clone)]
struct Lexed {
    token: Token,
    column: usize,
}

fn tokenize(source: &str) -> Result<Vec<Lexed>, ParseError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let column = i + 1;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i < chars.len() && chars[i] == '.' {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    while j < chars.len() && chars[j].is_ascii_digit() {
                        j += 1;
                    }
                    i = j;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text.parse::<f64>().map_err(|_| ParseError {
                column,
                message: format!("invalid number '{}'", text),
            })?;
            tokens.push(Lexed {
                token: Token::Number { value, text },
                column,
            });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Lexed {
                token: Token::Ident(chars[start..i].iter().collect()),
                column,
            });
            continue;
        }

        let next = chars.get(i + 1).copied();
        let (token, width) = match (c, next) {
            ('*', Some('*')) => (Token::Pow, 2),
            ('>', Some('=')) => (Token::Cmp(Comparator::Ge), 2),
            ('<', Some('=')) => (Token::Cmp(Comparator::Le), 2),
            ('=', Some('=')) => (Token::Cmp(Comparator::Eq), 2),
            ('>', _) => (Token::Cmp(Comparator::Gt), 1),
            ('<', _) => (Token::Cmp(Comparator::Lt), 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            ('=', _) => {
                return Err(ParseError {
                    column,
                    message: "use '==' for equality".to_string(),
                })
            }
            (other, _) => {
                return Err(ParseError {
                    column,
                    message: format!("unexpected character '{}'", other),
                })
            }
        };
        tokens.push(Lexed { token, column });
        i += width;
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Lexed],
    pos: usize,
    end_column: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).map(|lexed| &lexed.token)
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        let column = self
            .tokens
            .get(self.pos)
            .map_or(self.end_column, |lexed| lexed.column);
        ParseError {
            column,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ParseError> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error_here(format!("expected {}", what)))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_primary()?;
        if self.peek() == Some(&Token::Pow) {
            self.pos += 1;
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary {
                op: BinaryOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Number { value, .. }) => {
                self.pos += 1;
                Ok(Expr::Literal(*value))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) if name == "x" => {
                self.pos += 1;
                self.expect(Token::LBracket, "'[' after x")?;
                let index = match self.peek() {
                    Some(Token::Number { text, .. }) if text.chars().all(|c| c.is_ascii_digit()) => {
                        text.parse::<usize>()
                            .map_err(|_| self.error_here("variable index is too large"))?
                    }
                    _ => return Err(self.error_here("variable index must be a non-negative integer")),
                };
                self.pos += 1;
                self.expect(Token::RBracket, "']'")?;
                Ok(Expr::Var(index))
            }
            Some(Token::Ident(name)) => Err(self.error_here(format!(
                "unknown name '{}', variables are written x[i]",
                name
            ))),
            Some(_) => Err(self.error_here("expected a number, x[i] or '('")),
            None => Err(self.error_here("unexpected end of constraint")),
        }
    }
}
