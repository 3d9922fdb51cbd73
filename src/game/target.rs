//! Target Selection
//!
//! Supplies fresh hidden expressions for new sessions. The session core
//! treats whatever a provider returns as already validated.

use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;
use tracing::info;

use crate::core::expression;
use crate::core::rng::SelectionRng;

/// Corpus compiled into the binary.
pub const BUILTIN_CORPUS: &str = include_str!("../../data/expressions.txt");

/// A freshly selected target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Provider-specific reference (corpus index).
    pub reference: u64,
    /// The expression itself.
    pub expression: String,
}

/// Target provider errors.
#[derive(Debug, Error)]
pub enum TargetError {
    /// Corpus file could not be read.
    #[error("failed to read corpus: {0}")]
    Io(#[from] std::io::Error),

    /// Corpus entry has the wrong length or does not evaluate.
    #[error("invalid corpus entry {entry:?} on line {line}: {reason}")]
    InvalidEntry {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        entry: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Corpus has no entries.
    #[error("corpus is empty")]
    EmptyCorpus,

    /// Selection state was poisoned by a panicking thread.
    #[error("target selection unavailable")]
    Unavailable,
}

/// Source of new targets.
pub trait TargetProvider: Send + Sync {
    /// Pick the target for a new session.
    fn next_target(&self) -> Result<Target, TargetError>;
}

/// Picks targets uniformly from a fixed list of expressions.
pub struct CorpusTargetProvider {
    entries: Vec<String>,
    rng: Mutex<SelectionRng>,
}

impl CorpusTargetProvider {
    /// Build from corpus text: one expression per line, blank lines and
    /// `#` comments ignored. Every entry must be exactly `length`
    /// characters and evaluate cleanly.
    pub fn from_text(text: &str, length: usize, rng: SelectionRng) -> Result<Self, TargetError> {
        let mut entries = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let entry = line.trim();
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }

            let chars = entry.chars().count();
            if chars != length {
                return Err(TargetError::InvalidEntry {
                    line: idx + 1,
                    entry: entry.to_string(),
                    reason: format!("expected {} characters, found {}", length, chars),
                });
            }

            if let Err(e) = expression::evaluate(entry) {
                return Err(TargetError::InvalidEntry {
                    line: idx + 1,
                    entry: entry.to_string(),
                    reason: e.to_string(),
                });
            }

            entries.push(entry.to_string());
        }

        if entries.is_empty() {
            return Err(TargetError::EmptyCorpus);
        }

        Ok(Self {
            entries,
            rng: Mutex::new(rng),
        })
    }

    /// Load a corpus file.
    pub fn from_file(path: &Path, length: usize) -> Result<Self, TargetError> {
        let text = std::fs::read_to_string(path)?;
        let provider = Self::from_text(&text, length, SelectionRng::from_entropy())?;
        info!("Loaded {} expressions from {}", provider.len(), path.display());
        Ok(provider)
    }

    /// The corpus compiled into the binary.
    pub fn builtin(length: usize) -> Result<Self, TargetError> {
        Self::from_text(BUILTIN_CORPUS, length, SelectionRng::from_entropy())
    }

    /// Number of corpus entries.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl TargetProvider for CorpusTargetProvider {
    fn next_target(&self) -> Result<Target, TargetError> {
        let mut rng = self.rng.lock().map_err(|_| TargetError::Unavailable)?;
        let (idx, expression) = rng
            .choose(&self.entries)
            .ok_or(TargetError::EmptyCorpus)?;

        Ok(Target {
            reference: idx as u64,
            expression: expression.clone(),
        })
    }
}
