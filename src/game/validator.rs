//! Guess validation applied at the request boundary.

use crate::core::expression;

/// Decides whether a candidate guess is a syntactically valid expression.
pub trait ExpressionValidator: Send + Sync {
    /// Whether `candidate` is well formed.
    fn is_well_formed(&self, candidate: &str) -> bool;
}

/// Accepts expressions that parse and evaluate to an exact integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArithmeticValidator;

impl ExpressionValidator for ArithmeticValidator {
    fn is_well_formed(&self, candidate: &str) -> bool {
        expression::is_well_formed(candidate)
    }
}
