//! Soft diagnostics for query parsing.
//!
//! User-typed queries are frequently malformed, so every error condition in
//! the pipeline is modeled as an accumulated [`Issue`] rather than a returned
//! error: the caller always gets a best-effort expression plus the list of
//! problems found along the way.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed taxonomy of diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCode {
    /// The input produced more tokens than allowed; tokenization stopped.
    MaxTokensExceeded,

    /// Grouping or negation nested too deep; the subtree was dropped.
    MaxNestingDepthExceeded,

    /// A `(` was never closed; the inner expression was kept.
    UnmatchedOpeningParenthesis,

    /// A stray `)` was found and discarded.
    UnmatchedClosingParenthesis,

    /// A `"` was never closed; the partial text was kept.
    UnclosedQuotedString,

    /// A `NOT` had no operand and contributed nothing.
    MissingOperandForNot,
}

impl IssueCode {
    /// Returns the stable kebab-case identifier of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MaxTokensExceeded => "max-tokens-exceeded",
            Self::MaxNestingDepthExceeded => "max-nesting-depth-exceeded",
            Self::UnmatchedOpeningParenthesis => "unmatched-opening-parenthesis",
            Self::UnmatchedClosingParenthesis => "unmatched-closing-parenthesis",
            Self::UnclosedQuotedString => "unclosed-quoted-string",
            Self::MissingOperandForNot => "missing-operand-for-not",
        }
    }

    /// Returns the canonical human-readable message for the code.
    fn message(self) -> &'static str {
        match self {
            Self::MaxTokensExceeded => "query is too long, the remainder was ignored",
            Self::MaxNestingDepthExceeded => {
                "query is nested too deeply, a subexpression was dropped"
            }
            Self::UnmatchedOpeningParenthesis => {
                "unmatched opening parenthesis, the group was kept unclosed"
            }
            Self::UnmatchedClosingParenthesis => "unmatched closing parenthesis was ignored",
            Self::UnclosedQuotedString => "unclosed quoted string, the partial text was kept",
            Self::MissingOperandForNot => "NOT is missing an operand and was ignored",
        }
    }

    /// Returns a remediation hint for the code, when a useful one exists.
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Self::UnmatchedOpeningParenthesis => {
                Some("add a closing parenthesis ) to match the opening one")
            }
            Self::UnmatchedClosingParenthesis => {
                Some("remove the stray ) or add a matching ( before it")
            }
            Self::UnclosedQuotedString => Some("add a closing quote (\") to complete the phrase"),
            Self::MissingOperandForNot => {
                Some("NOT must be followed by a term, filter, or group, e.g. 'NOT tag:archived'")
            }
            Self::MaxTokensExceeded | Self::MaxNestingDepthExceeded => None,
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single non-fatal diagnostic.
///
/// Issues accumulate in discovery order, tokenizer first, then parser. They
/// implement [`std::error::Error`] so callers can hand them to generic error
/// plumbing, but the pipeline itself never returns them through `Result`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct Issue {
    /// Stable machine-readable code.
    pub code: IssueCode,
    /// Human-readable description.
    pub message: String,
}

impl Issue {
    /// Creates an issue with the canonical message for its code.
    pub fn new(code: IssueCode) -> Self {
        Self {
            code,
            message: code.message().to_string(),
        }
    }
}
