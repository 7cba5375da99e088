//! Item count expressions
//!
//! The count field accepts a small arithmetic expression (`12`, `2+3*4`,
//! `(10-4)/4`) so stock can be adjusted in place. Anything other than
//! digits, `+ - * / ( ) .` is stripped before parsing; the value is rounded
//! up to the next whole number.

use thiserror::Error;

/// Longest expression (after stripping) that will be evaluated
pub const MAX_EXPRESSION_LEN: usize = 128;

/// Deepest parenthesis / unary-sign nesting accepted
const MAX_DEPTH: usize = 32;

#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("expression is empty")]
    Empty,
    #[error("expression longer than {} characters", MAX_EXPRESSION_LEN)]
    TooLong,
    #[error("expression nested too deeply")]
    TooDeep,
    #[error("unexpected {found:?} at offset {offset}")]
    Unexpected { found: Option<char>, offset: usize },
    #[error("malformed number {0:?}")]
    BadNumber(String),
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | '-' | '*' | '/' | '(' | ')' | '.')
}

/// Compute the count to store for `expression`.
///
/// A result that is not a positive finite number (including a parse
/// failure) keeps `current` when it is positive and yields 0 otherwise.
pub fn evaluate(expression: &str, current: i64) -> i64 {
    match parse_expression(expression) {
        Ok(value) if value.is_finite() && value > 0.0 => value.ceil() as i64,
        _ => current.max(0),
    }
}

/// Strip disallowed characters and evaluate what remains
pub fn parse_expression(expression: &str) -> Result<f64, ExprError> {
    let cleaned: Vec<char> = expression.chars().filter(|&c| is_allowed(c)).collect();
    if cleaned.is_empty() {
        return Err(ExprError::Empty);
    }
    if cleaned.len() > MAX_EXPRESSION_LEN {
        return Err(ExprError::TooLong);
    }

    let mut parser = Parser {
        chars: &cleaned,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    match parser.peek() {
        None => Ok(value),
        found => Err(ExprError::Unexpected {
            found,
            offset: parser.pos,
        }),
    }
}

/// Recursive descent over: expr := term (('+'|'-') term)*
///                         term := factor (('*'|'/') factor)*
///                       factor := ('+'|'-') factor | number | '(' expr ')'
struct Parser<'a> {
    chars: &'a [char],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn expr(&mut self) -> Result<f64, ExprError> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, ExprError> {
        let mut value = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = if op == '*' { value * rhs } else { value / rhs };
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }

        let value = match self.peek() {
            Some('+') => {
                self.pos += 1;
                self.factor()?
            }
            Some('-') => {
                self.pos += 1;
                -self.factor()?
            }
            Some('(') => {
                self.pos += 1;
                let inner = self.expr()?;
                let offset = self.pos;
                match self.bump() {
                    Some(')') => inner,
                    found => return Err(ExprError::Unexpected { found, offset }),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number()?,
            found => {
                return Err(ExprError::Unexpected {
                    found,
                    offset: self.pos,
                })
            }
        };

        self.depth -= 1;
        Ok(value)
    }

    fn number(&mut self) -> Result<f64, ExprError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>().map_err(|_| ExprError::BadNumber(text))
    }
}
