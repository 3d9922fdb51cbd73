//! Arithmetic Expressions
//!
//! Tokenizer and evaluator for the expressions players guess.
//!
//! Grammar: `number (op number)*` with `op` one of `+ - * /` and
//! `number` a run of ASCII digits without a leading zero (a lone `0` is
//! fine). Multiplication and division bind tighter than addition and
//! subtraction; evaluation uses checked `i64` arithmetic and division
//! must be exact.

use thiserror::Error;

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl Op {
    fn from_char(c: char) -> Option<Op> {
        match c {
            '+' => Some(Op::Add),
            '-' => Some(Op::Sub),
            '*' => Some(Op::Mul),
            '/' => Some(Op::Div),
            _ => None,
        }
    }

    fn apply(self, lhs: i64, rhs: i64) -> Result<i64, ExpressionError> {
        match self {
            Op::Add => lhs.checked_add(rhs).ok_or(ExpressionError::Overflow),
            Op::Sub => lhs.checked_sub(rhs).ok_or(ExpressionError::Overflow),
            Op::Mul => lhs.checked_mul(rhs).ok_or(ExpressionError::Overflow),
            Op::Div => {
                if rhs == 0 {
                    return Err(ExpressionError::DivisionByZero);
                }
                if lhs.checked_rem(rhs).ok_or(ExpressionError::Overflow)? != 0 {
                    return Err(ExpressionError::InexactDivision);
                }
                lhs.checked_div(rhs).ok_or(ExpressionError::Overflow)
            }
        }
    }
}

/// Expression token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token {
    /// Integer literal.
    Number(i64),
    /// Binary operator.
    Op(Op),
}

/// Expression errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    /// Empty input.
    #[error("empty expression")]
    Empty,
    /// Character outside the expression alphabet.
    #[error("unexpected character {0:?} at position {1}")]
    UnexpectedChar(char, usize),
    /// Multi-digit number starting with zero.
    #[error("leading zero at position {0}")]
    LeadingZero(usize),
    /// Operator where a number was expected, or vice versa.
    #[error("malformed expression at position {0}")]
    Malformed(usize),
    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Division with a remainder.
    #[error("inexact division")]
    InexactDivision,
    /// Arithmetic overflow.
    #[error("arithmetic overflow")]
    Overflow,
}

/// Split an expression into alternating number and operator tokens.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    if input.is_empty() {
        return Err(ExpressionError::Empty);
    }

    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    let mut expect_number = true;

    while let Some((pos, c)) = chars.next() {
        if c.is_ascii_digit() {
            if !expect_number {
                return Err(ExpressionError::Malformed(pos));
            }
            let mut value = i64::from(c as u8 - b'0');
            let mut digits = 1;
            while let Some(&(_, d)) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                if digits == 1 && value == 0 {
                    return Err(ExpressionError::LeadingZero(pos));
                }
                value = value
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(i64::from(d as u8 - b'0')))
                    .ok_or(ExpressionError::Overflow)?;
                digits += 1;
                chars.next();
            }
            tokens.push(Token::Number(value));
            expect_number = false;
        } else if let Some(op) = Op::from_char(c) {
            if expect_number {
                return Err(ExpressionError::Malformed(pos));
            }
            tokens.push(Token::Op(op));
            expect_number = true;
        } else {
            return Err(ExpressionError::UnexpectedChar(c, pos));
        }
    }

    if expect_number {
        return Err(ExpressionError::Malformed(input.len()));
    }

    Ok(tokens)
}

/// Evaluate an expression.
///
/// ```
/// use exprdle::core::expression::evaluate;
///
/// assert_eq!(evaluate("12+34*56").unwrap(), 1916);
/// assert!(evaluate("7/2").is_err());
/// ```
pub fn evaluate(input: &str) -> Result<i64, ExpressionError> {
    let tokens = tokenize(input)?;

    // Sum of finished terms, plus the pending term and the sign it joins with
    let mut sum: i64 = 0;
    let mut term: i64 = 0;
    let mut pending = Op::Add;
    let mut term_op: Option<Op> = None;

    for token in tokens {
        match token {
            Token::Number(n) => {
                term = match term_op.take() {
                    Some(op) => op.apply(term, n)?,
                    None => n,
                };
            }
            Token::Op(op @ (Op::Mul | Op::Div)) => term_op = Some(op),
            Token::Op(op) => {
                sum = pending.apply(sum, term)?;
                pending = op;
            }
        }
    }

    pending.apply(sum, term)
}

/// Check whether an expression parses and evaluates cleanly.
pub fn is_well_formed(input: &str) -> bool {
    evaluate(input).is_ok()
}
