//! Enrolled gesture patterns and the in-order matcher that walks them.

use serde::Serialize;
use thiserror::Error;

use crate::symbol::{GestureSymbol, UnknownSymbol};

#[derive(Error, Debug, PartialEq)]
pub enum PatternError {
    #[error("pattern has {actual} symbols, expected {expected}")]
    WrongLength { expected: usize, actual: usize },
    #[error("pattern is empty")]
    Empty,
    #[error("pattern step {step}: {source}")]
    UnknownSymbol {
        step: usize,
        #[source]
        source: UnknownSymbol,
    },
    #[error("pattern step {step} is 'none', which can never be performed")]
    NoneStep { step: usize },
}

/// A validated, immutable gesture sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrolledPattern {
    symbols: Vec<GestureSymbol>,
}

impl EnrolledPattern {
    pub fn new(symbols: Vec<GestureSymbol>, expected_len: usize) -> Result<Self, PatternError> {
        if symbols.is_empty() {
            return Err(PatternError::Empty);
        }
        if symbols.len() != expected_len {
            return Err(PatternError::WrongLength {
                expected: expected_len,
                actual: symbols.len(),
            });
        }
        if let Some(step) = symbols.iter().position(GestureSymbol::is_none) {
            return Err(PatternError::NoneStep { step });
        }
        Ok(Self { symbols })
    }

    /// Parse stored tokens such as `["left", "center", "right", "blink"]`.
    pub fn parse<S: AsRef<str>>(tokens: &[S], expected_len: usize) -> Result<Self, PatternError> {
        let symbols = tokens
            .iter()
            .enumerate()
            .map(|(step, t)| {
                t.as_ref()
                    .parse::<GestureSymbol>()
                    .map_err(|source| PatternError::UnknownSymbol { step, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(symbols, expected_len)
    }

    pub fn symbols(&self) -> &[GestureSymbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// What one symbol did to the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchProgress {
    /// `None` symbol; state untouched.
    Ignored,
    /// Expected symbol seen; now waiting on `step`.
    Advanced { step: usize },
    /// Wrong symbol; progress discarded.
    Reset,
    /// Final symbol seen.
    Complete,
}

/// Strict in-order matcher: a wrong symbol discards all progress.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: EnrolledPattern,
    step: usize,
}

impl PatternMatcher {
    pub fn new(pattern: EnrolledPattern) -> Self {
        Self { pattern, step: 0 }
    }

    pub fn pattern(&self) -> &EnrolledPattern {
        &self.pattern
    }

    /// Number of pattern symbols matched so far.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn is_complete(&self) -> bool {
        self.step == self.pattern.len()
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }

    pub fn advance(&mut self, symbol: GestureSymbol) -> MatchProgress {
        if self.is_complete() {
            return MatchProgress::Complete;
        }
        if symbol.is_none() {
            return MatchProgress::Ignored;
        }

        if symbol == self.pattern.symbols[self.step] {
            self.step += 1;
            if self.is_complete() {
                MatchProgress::Complete
            } else {
                MatchProgress::Advanced { step: self.step }
            }
        } else {
            self.step = 0;
            MatchProgress::Reset
        }
    }
}
