//! Guess Feedback
//!
//! Compares one guess against one target, position by position, and
//! classifies every guess character as correct, present or absent.
//!
//! Exact matches are resolved first and consume their target position.
//! Remaining guess characters then claim the leftmost unconsumed target
//! occurrence of the same character, so a character is never reported
//! more often than the target actually contains it.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Classification of one guess character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Mark {
    /// Character has no unconsumed occurrence in the target.
    Absent = 0,
    /// Character occurs in the target at another position.
    Present = 1,
    /// Character matches the target at this position.
    Correct = 2,
}

impl Mark {
    /// Single-digit code used in compact renderings.
    #[inline]
    pub fn code(self) -> char {
        match self {
            Mark::Absent => '0',
            Mark::Present => '1',
            Mark::Correct => '2',
        }
    }
}

/// Feedback for a single guess position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// The guessed character.
    pub ch: char,
    /// Its classification.
    pub mark: Mark,
}

impl Verdict {
    /// Create a verdict.
    pub const fn new(ch: char, mark: Mark) -> Self {
        Self { ch, mark }
    }
}

/// Feedback errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedbackError {
    /// Guess and target differ in length.
    #[error("guess has {guess} characters, target has {target}")]
    LengthMismatch {
        /// Target length in characters.
        target: usize,
        /// Guess length in characters.
        guess: usize,
    },
}

/// Evaluate a guess against a target.
///
/// Both strings must have the same number of characters; alphabet checks
/// are the caller's job. The result has one verdict per guess character,
/// in guess order.
///
/// # Example
///
/// ```
/// use exprdle::core::feedback::{evaluate, Mark};
///
/// let verdicts = evaluate("86-4", "87-6").unwrap();
/// let marks: Vec<Mark> = verdicts.iter().map(|v| v.mark).collect();
/// assert_eq!(marks, [Mark::Correct, Mark::Absent, Mark::Correct, Mark::Present]);
/// ```
pub fn evaluate(target: &str, guess: &str) -> Result<Vec<Verdict>, FeedbackError> {
    let target: Vec<char> = target.chars().collect();
    let guess: Vec<char> = guess.chars().collect();

    if target.len() != guess.len() {
        return Err(FeedbackError::LengthMismatch {
            target: target.len(),
            guess: guess.len(),
        });
    }

    let mut verdicts: Vec<Verdict> = guess
        .iter()
        .map(|&ch| Verdict::new(ch, Mark::Absent))
        .collect();
    let mut consumed = vec![false; target.len()];

    // Pass 1: exact matches
    for (i, (&g, &t)) in guess.iter().zip(target.iter()).enumerate() {
        if g == t {
            verdicts[i].mark = Mark::Correct;
            consumed[i] = true;
        }
    }

    // Pass 2: misplaced matches, leftmost unconsumed occurrence wins
    for (i, &g) in guess.iter().enumerate() {
        if verdicts[i].mark != Mark::Absent {
            continue;
        }
        let claim = target
            .iter()
            .enumerate()
            .position(|(j, &t)| !consumed[j] && t == g);
        if let Some(j) = claim {
            verdicts[i].mark = Mark::Present;
            consumed[j] = true;
        }
    }

    Ok(verdicts)
}

/// Check whether every position is correct.
pub fn is_solved(verdicts: &[Verdict]) -> bool {
    !verdicts.is_empty() && verdicts.iter().all(|v| v.mark == Mark::Correct)
}

/// Render marks as a digit string (`2` correct, `1` present, `0` absent).
pub fn render_marks(verdicts: &[Verdict]) -> String {
    verdicts.iter().map(|v| v.mark.code()).collect()
}

// =============================================================================
// TESTS
// =============================================================================
